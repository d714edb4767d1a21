//! Frame rendering
//!
//! [`render_frame`] turns `(anchors, edges, live pulses, now)` into a flat
//! display list. It keeps no state between calls, so the same inputs always
//! produce the same [`Scene`]. Drawing the list onto an actual output goes
//! through the [`Surface`] trait.
//!
//! Every edge and pulse is computed independently: an unresolved anchor or a
//! bad coordinate drops that one item and is counted in the [`FrameReport`],
//! nothing else in the frame is affected.

use crate::geometry::{lane_offset, lerp};
use crate::{AnchorId, AnchorMap, EdgeId, FlowEdge, Millis, Point, Pulse, PulseId};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use thiserror::Error;
use tracing::{trace, warn};

/// Size of an arrowhead marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowSize {
    pub length: f64,
    pub width: f64,
}

/// Dash pattern bounds for highlighted edges
///
/// Dash and gap lengths scale with the edge length and are clamped to
/// `[min, max]`. The pattern travels `travel` units every `cycle_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashStyle {
    pub dash_divisor: f64,
    pub dash_min: f64,
    pub dash_max: f64,
    pub gap_divisor: f64,
    pub gap_min: f64,
    pub gap_max: f64,
    pub cycle_ms: Millis,
    pub travel: f64,
}

impl Default for DashStyle {
    fn default() -> Self {
        Self {
            dash_divisor: 12.0,
            dash_min: 8.0,
            dash_max: 16.0,
            gap_divisor: 18.0,
            gap_min: 6.0,
            gap_max: 14.0,
            cycle_ms: 900.0,
            travel: 40.0,
        }
    }
}

/// Visual parameters of the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Distance between a kinded pulse and the edge centerline
    pub lane_offset: f64,
    pub edge_width: f64,
    pub highlight_width: f64,
    pub arrowhead: ArrowSize,
    pub highlight_arrowhead: ArrowSize,
    pub dash: DashStyle,
    pub head_radius: f64,
    /// Trail marker `i` sits at `t - trail_step / trail_back[i]`
    pub trail_back: Vec<f64>,
    pub trail_step: f64,
    pub trail_radius: f64,
    pub trail_radius_decay: f64,
    pub trail_opacity: f64,
    pub trail_opacity_decay: f64,
    /// Vertical offset of the quantity label from the pulse head
    pub label_offset_y: f64,
    /// Fraction of the pulse life over which the label fades out
    pub label_fade: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            lane_offset: 6.0,
            edge_width: 2.0,
            highlight_width: 3.0,
            arrowhead: ArrowSize {
                length: 10.0,
                width: 7.0,
            },
            highlight_arrowhead: ArrowSize {
                length: 12.0,
                width: 8.0,
            },
            dash: DashStyle::default(),
            head_radius: 3.5,
            trail_back: vec![0.72, 0.5, 0.28],
            trail_step: 0.06,
            trail_radius: 3.0,
            trail_radius_decay: 0.6,
            trail_opacity: 0.25,
            trail_opacity_decay: 0.06,
            label_offset_y: -12.0,
            label_fade: 0.9,
        }
    }
}

/// Dash pattern of a highlighted edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub on: f64,
    pub off: f64,
    /// Phase of the pattern along the edge
    pub offset: f64,
}

/// A directed segment with an arrowhead at `to`
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeStroke {
    pub id: EdgeId,
    pub from: Point,
    pub to: Point,
    pub width: f64,
    pub arrow: ArrowSize,
    /// Present while the edge is highlighted
    pub dash: Option<Dash>,
}

/// A filled circle belonging to a pulse
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub pulse: PulseId,
    pub center: Point,
    pub radius: f64,
    pub opacity: f64,
    /// `None` for the head, `Some(i)` for the i-th trail marker
    pub trail: Option<usize>,
}

impl Marker {
    pub fn is_head(&self) -> bool {
        self.trail.is_none()
    }
}

/// Floating quantity label
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub pulse: PulseId,
    pub position: Point,
    pub text: String,
    pub opacity: f64,
}

/// One entry of the display list
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    Edge(EdgeStroke),
    Marker(Marker),
    Label(Label),
}

/// Per-frame tally of drawn and skipped items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub edges_drawn: usize,
    /// Edges with an endpoint missing from the anchor map
    pub edges_unresolved: usize,
    pub pulses_drawn: usize,
    /// Live pulses outside their `[start, start + duration]` window
    pub pulses_idle: usize,
    /// Pulses with an endpoint missing from the anchor map
    pub pulses_unresolved: usize,
    /// Items whose geometry could not be computed
    pub item_failures: usize,
    /// Items the surface failed to draw
    pub surface_failures: usize,
}

/// Why a single item was dropped from the frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    #[error("non-finite geometry for edge {0}")]
    EdgeGeometry(EdgeId),

    #[error("non-finite geometry for {0}")]
    PulseGeometry(PulseId),
}

/// Everything the renderer reads for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub anchors: &'a AnchorMap,
    pub edges: &'a [FlowEdge],
    pub pulses: &'a [Pulse],
    pub now: Millis,
}

/// Display list of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub items: Vec<DrawItem>,
    pub report: FrameReport,
}

impl Scene {
    pub fn edges(&self) -> impl Iterator<Item = &EdgeStroke> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Edge(edge) => Some(edge),
            _ => None,
        })
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Marker(marker) => Some(marker),
            _ => None,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Label(label) => Some(label),
            _ => None,
        })
    }

    /// Head marker of a pulse, if it was drawn
    pub fn head_of(&self, pulse: PulseId) -> Option<&Marker> {
        self.markers().find(|m| m.pulse == pulse && m.is_head())
    }

    /// Whether anything at all was drawn for a pulse
    pub fn contains_pulse(&self, pulse: PulseId) -> bool {
        self.items.iter().any(|item| match item {
            DrawItem::Marker(m) => m.pulse == pulse,
            DrawItem::Label(l) => l.pulse == pulse,
            DrawItem::Edge(_) => false,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

enum PulseDraw {
    Drawn(Vec<DrawItem>),
    Idle,
    Unresolved,
}

/// Build the display list for one frame
pub fn render_frame(input: &FrameInput<'_>, style: &RenderStyle) -> Scene {
    let mut scene = Scene::default();

    for edge in input.edges {
        match edge_stroke(edge, input, style) {
            Ok(Some(stroke)) => {
                scene.items.push(DrawItem::Edge(stroke));
                scene.report.edges_drawn += 1;
            }
            Ok(None) => scene.report.edges_unresolved += 1,
            Err(err) => {
                scene.report.item_failures += 1;
                trace!(error = %err, "edge dropped from frame");
            }
        }
    }

    for pulse in input.pulses {
        match pulse_items(pulse, input, style) {
            Ok(PulseDraw::Drawn(items)) => {
                scene.items.extend(items);
                scene.report.pulses_drawn += 1;
            }
            Ok(PulseDraw::Idle) => scene.report.pulses_idle += 1,
            Ok(PulseDraw::Unresolved) => scene.report.pulses_unresolved += 1,
            Err(err) => {
                scene.report.item_failures += 1;
                trace!(error = %err, "pulse dropped from frame");
            }
        }
    }

    scene
}

fn endpoints(anchors: &AnchorMap, from: &AnchorId, to: &AnchorId) -> Option<(Point, Point)> {
    Some((*anchors.get(from)?, *anchors.get(to)?))
}

fn edge_stroke(
    edge: &FlowEdge,
    input: &FrameInput<'_>,
    style: &RenderStyle,
) -> Result<Option<EdgeStroke>, ItemError> {
    let Some((from, to)) = endpoints(input.anchors, &edge.from, &edge.to) else {
        return Ok(None);
    };
    if !from.is_finite() || !to.is_finite() {
        return Err(ItemError::EdgeGeometry(edge.id.clone()));
    }

    let (width, arrow, dash) = if edge.highlight {
        let len = from.distance(&to);
        let d = &style.dash;
        let phase = if d.cycle_ms > 0.0 {
            (input.now.rem_euclid(d.cycle_ms)) / d.cycle_ms
        } else {
            0.0
        };
        let dash = Dash {
            on: (len / d.dash_divisor).clamp(d.dash_min, d.dash_max),
            off: (len / d.gap_divisor).clamp(d.gap_min, d.gap_max),
            offset: -d.travel * phase,
        };
        (style.highlight_width, style.highlight_arrowhead, Some(dash))
    } else {
        (style.edge_width, style.arrowhead, None)
    };

    Ok(Some(EdgeStroke {
        id: edge.id.clone(),
        from,
        to,
        width,
        arrow,
        dash,
    }))
}

fn pulse_items(
    pulse: &Pulse,
    input: &FrameInput<'_>,
    style: &RenderStyle,
) -> Result<PulseDraw, ItemError> {
    let Some(t) = pulse.progress(input.now) else {
        return Ok(PulseDraw::Idle);
    };
    let Some((from, to)) = endpoints(input.anchors, &pulse.from, &pulse.to) else {
        return Ok(PulseDraw::Unresolved);
    };

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let lane = |tt: f64| {
        let base = lerp(from, to, tt);
        match pulse.kind {
            Some(kind) => lane_offset(base, dx, dy, style.lane_offset * kind.lane_sign()),
            None => base,
        }
    };

    let mut items = Vec::with_capacity(style.trail_back.len() + 2);

    for (i, back) in style.trail_back.iter().enumerate() {
        let tt = (t - style.trail_step / back).max(0.0);
        let step = i as f64;
        items.push(DrawItem::Marker(Marker {
            pulse: pulse.id,
            center: lane(tt),
            radius: (style.trail_radius - step * style.trail_radius_decay).max(0.0),
            opacity: (style.trail_opacity - step * style.trail_opacity_decay).max(0.0),
            trail: Some(i),
        }));
    }

    let head = lane(t);
    items.push(DrawItem::Marker(Marker {
        pulse: pulse.id,
        center: head,
        radius: style.head_radius,
        opacity: 1.0,
        trail: None,
    }));

    if let Some(quantity) = pulse.quantity {
        let elapsed = pulse.elapsed(input.now);
        let opacity = 1.0 - (elapsed / (pulse.duration * style.label_fade)).min(1.0);
        items.push(DrawItem::Label(Label {
            pulse: pulse.id,
            position: head.offset(0.0, style.label_offset_y),
            text: quantity_text(quantity),
            opacity,
        }));
    }

    let finite = items.iter().all(|item| match item {
        DrawItem::Marker(m) => m.center.is_finite(),
        DrawItem::Label(l) => l.position.is_finite() && l.opacity.is_finite(),
        DrawItem::Edge(e) => e.from.is_finite() && e.to.is_finite(),
    });
    if !finite {
        return Err(ItemError::PulseGeometry(pulse.id));
    }

    Ok(PulseDraw::Drawn(items))
}

/// Label text for a quantity: `+12`, `-3`
pub fn quantity_text(quantity: i64) -> String {
    if quantity >= 0 {
        format!("+{}", quantity)
    } else {
        quantity.to_string()
    }
}

/// An output the display list can be drawn onto
pub trait Surface {
    type Error: fmt::Display;

    /// Prepare a new frame
    fn begin_frame(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Draw a single item
    fn draw(&mut self, item: &DrawItem) -> Result<(), Self::Error>;

    /// Present the frame
    fn end_frame(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Draw a scene; returns the number of items the surface rejected
///
/// Item failures are logged and skipped. Only a failure to begin or end the
/// frame is returned as an error.
pub fn paint<S: Surface + ?Sized>(scene: &Scene, surface: &mut S) -> Result<usize, S::Error> {
    surface.begin_frame()?;
    let mut failures = 0;
    for item in &scene.items {
        if let Err(err) = surface.draw(item) {
            failures += 1;
            warn!(error = %err, "surface failed to draw item");
        }
    }
    surface.end_frame()?;
    Ok(failures)
}

/// Surface that keeps the last frame's display list
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub items: Vec<DrawItem>,
    pub frames: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for RecordingSurface {
    type Error = Infallible;

    fn begin_frame(&mut self) -> Result<(), Self::Error> {
        self.items.clear();
        Ok(())
    }

    fn draw(&mut self, item: &DrawItem) -> Result<(), Self::Error> {
        self.items.push(item.clone());
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), Self::Error> {
        self.frames += 1;
        Ok(())
    }
}
