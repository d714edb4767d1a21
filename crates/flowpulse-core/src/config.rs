//! Overlay configuration
//!
//! An [`OverlayConfig`] bundles everything an overlay needs besides its
//! layout: the edge list, pulse defaults, flash decay and render style.
//! Every field has a default, so a RON file only lists what it changes:
//!
//! ```ron
//! (
//!     collision: LastMatch,
//!     edges: [
//!         (from: "SUP", to: "WH"),
//!         (id: Some("returns"), from: "CUST", to: "WH"),
//!     ],
//!     pulse_defaults: (duration_ms: 800.0),
//! )
//! ```

use crate::{
    AnchorId, CollisionPolicy, EdgeId, Error, FlowEdge, Millis, PulseDefaults, RenderStyle,
    Result, ScopeId, Topology, DEFAULT_FLASH_DECAY_MS, MAX_TRAIN_LEN,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// One configured edge; the id defaults to `from->to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    #[serde(default)]
    pub id: Option<EdgeId>,
    pub from: AnchorId,
    pub to: AnchorId,
}

impl EdgeConfig {
    pub fn new(from: impl Into<AnchorId>, to: impl Into<AnchorId>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Effective edge id
    pub fn edge_id(&self) -> EdgeId {
        self.id
            .clone()
            .unwrap_or_else(|| EdgeId::between(&self.from, &self.to))
    }

    pub fn to_edge(&self) -> FlowEdge {
        FlowEdge::new(self.from.clone(), self.to.clone()).with_id(self.edge_id())
    }
}

/// Complete overlay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Restrict anchor discovery to regions inside this scope
    pub scope: Option<ScopeId>,
    pub collision: CollisionPolicy,
    pub edges: Vec<EdgeConfig>,
    pub pulse_defaults: PulseDefaults,
    pub flash_decay_ms: Millis,
    pub style: RenderStyle,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            scope: None,
            collision: CollisionPolicy::default(),
            edges: Vec::new(),
            pulse_defaults: PulseDefaults::default(),
            flash_decay_ms: DEFAULT_FLASH_DECAY_MS,
            style: RenderStyle::default(),
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: impl Into<ScopeId>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_edge(mut self, from: impl Into<AnchorId>, to: impl Into<AnchorId>) -> Self {
        self.edges.push(EdgeConfig::new(from, to));
        self
    }

    pub fn with_pulse_defaults(mut self, defaults: PulseDefaults) -> Self {
        self.pulse_defaults = defaults;
        self
    }

    pub fn with_flash_decay(mut self, decay_ms: Millis) -> Self {
        self.flash_decay_ms = decay_ms;
        self
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Parse and validate a RON document
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let config: OverlayConfig = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&content)?;
        debug!(path = %path.display(), edges = config.edges.len(), "loaded overlay config");
        Ok(config)
    }

    /// Check numeric settings
    ///
    /// Duplicate edge ids are allowed but logged.
    pub fn validate(&self) -> Result<()> {
        let d = &self.pulse_defaults;
        if !(d.duration_ms.is_finite() && d.duration_ms > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "pulse_defaults.duration_ms must be positive, got {}",
                d.duration_ms
            )));
        }
        if !(d.gap_ms.is_finite() && d.gap_ms >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "pulse_defaults.gap_ms must be non-negative, got {}",
                d.gap_ms
            )));
        }
        if d.count == 0 || d.count > MAX_TRAIN_LEN {
            return Err(Error::InvalidConfig(format!(
                "pulse_defaults.count must be between 1 and {MAX_TRAIN_LEN}, got {}",
                d.count
            )));
        }
        if !(self.flash_decay_ms.is_finite() && self.flash_decay_ms > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "flash_decay_ms must be positive, got {}",
                self.flash_decay_ms
            )));
        }

        let s = &self.style;
        if !(s.label_fade.is_finite() && s.label_fade > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "style.label_fade must be positive, got {}",
                s.label_fade
            )));
        }
        if s.trail_back.iter().any(|b| !(b.is_finite() && *b > 0.0)) {
            return Err(Error::InvalidConfig(
                "style.trail_back factors must be positive".to_string(),
            ));
        }
        if s.dash.dash_min > s.dash.dash_max || s.dash.gap_min > s.dash.gap_max {
            return Err(Error::InvalidConfig(
                "style.dash bounds must satisfy min <= max".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for edge in &self.edges {
            let id = edge.edge_id();
            if !seen.insert(id.clone()) {
                warn!(edge = %id, "duplicate edge id in config");
            }
        }

        Ok(())
    }

    /// Build the topology described by `edges`
    pub fn topology(&self) -> Topology {
        Topology::new(self.edges.iter().map(EdgeConfig::to_edge).collect())
    }
}
