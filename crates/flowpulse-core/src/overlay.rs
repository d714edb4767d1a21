//! Overlay controller
//!
//! [`OverlayController`] ties the engine together for one overlay instance:
//! it owns the anchor registry and the pulse scheduler, subscribes to the
//! bus, watches the layout and drives one animation frame per [`tick`].
//!
//! Lifecycle: `new` (detached) → [`attach`] → any number of ticks →
//! [`dispose`]. Disposal cancels the pending frame, every timer, both bus
//! subscriptions and the layout watch; it also runs on drop. Several
//! controllers can share one bus and one layout without interfering.
//!
//! [`tick`]: OverlayController::tick
//! [`attach`]: OverlayController::attach
//! [`dispose`]: OverlayController::dispose

use crate::render::{paint, render_frame, FrameInput, FrameReport, Surface};
use crate::{
    AnchorMap, AnchorRegistry, Clock, Error, EventBus, FlashEvent, FlowEdge, FlowEmitter,
    LayoutChange, LayoutSignal, LayoutWatch, Millis, OverlayConfig, Pulse, PulseEvent,
    PulseScheduler, RegionProvider, Result, Subscription,
};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// The frame counter wraps at this value
const FRAME_WRAP: u64 = 1_000_000;

/// Lifecycle state of an overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Detached,
    Attached,
    Disposed,
}

/// One live flow overlay
pub struct OverlayController<P: RegionProvider> {
    config: OverlayConfig,
    provider: P,
    bus: EventBus,
    clock: Rc<dyn Clock>,
    registry: AnchorRegistry,
    scheduler: Rc<RefCell<PulseScheduler>>,
    signal: LayoutSignal,
    watch: Option<LayoutWatch>,
    subscriptions: Vec<Subscription>,
    frame_pending: bool,
    frame: u64,
    state: OverlayState,
}

impl<P: RegionProvider> OverlayController<P> {
    /// Create a detached overlay
    pub fn new(config: OverlayConfig, provider: P, bus: EventBus, clock: impl Clock + 'static) -> Self {
        let registry = AnchorRegistry::new(config.collision).scoped(config.scope.clone());
        let scheduler = PulseScheduler::new(
            config.topology(),
            config.pulse_defaults,
            config.flash_decay_ms,
        );
        Self {
            config,
            provider,
            bus,
            clock: Rc::new(clock),
            registry,
            scheduler: Rc::new(RefCell::new(scheduler)),
            signal: LayoutSignal::new(),
            watch: None,
            subscriptions: Vec::new(),
            frame_pending: false,
            frame: 0,
            state: OverlayState::Detached,
        }
    }

    /// Start listening and arm the first frame
    ///
    /// On failure everything acquired so far is released and the overlay
    /// stays detached.
    pub fn attach(&mut self) -> Result<()> {
        match self.state {
            OverlayState::Disposed => return Err(Error::Disposed),
            OverlayState::Attached => return Err(Error::AlreadyAttached),
            OverlayState::Detached => {}
        }

        if let Err(err) = self.acquire() {
            warn!(error = %err, "overlay attach failed");
            self.release();
            return Err(err);
        }

        self.state = OverlayState::Attached;
        self.frame_pending = true;
        debug!(
            anchors = self.registry.anchors().len(),
            edges = self.config.edges.len(),
            scope = ?self.config.scope,
            "overlay attached"
        );
        Ok(())
    }

    fn acquire(&mut self) -> Result<()> {
        let scheduler = Rc::downgrade(&self.scheduler);
        let clock = Rc::clone(&self.clock);
        self.subscriptions
            .push(self.bus.subscribe::<PulseEvent>(move |event| {
                on_pulse(&scheduler, clock.now(), event);
            }));

        let scheduler = Rc::downgrade(&self.scheduler);
        let clock = Rc::clone(&self.clock);
        self.subscriptions
            .push(self.bus.subscribe::<FlashEvent>(move |event| {
                on_flash(&scheduler, clock.now(), event);
            }));

        self.watch = Some(self.provider.watch(self.signal.clone())?);
        self.recompute(&[LayoutChange::Attached])?;
        Ok(())
    }

    fn release(&mut self) {
        self.subscriptions.clear();
        if let Some(watch) = self.watch.take() {
            watch.release();
        }
        self.signal.take();
        self.frame_pending = false;
    }

    fn recompute(&mut self, changes: &[LayoutChange]) -> Result<()> {
        let anchors = self.registry.recompute(&self.provider)?;
        trace!(changes = ?changes, anchors = anchors.len(), "layout recomputed");

        let missing = self.scheduler.borrow().topology().missing_anchors(&anchors);
        for miss in &missing {
            trace!(edge = %miss.edge, anchor = %miss.anchor, "edge endpoint unresolved");
        }
        Ok(())
    }

    /// Recompute anchors right away after a layout change
    pub fn notify_layout(&mut self, change: LayoutChange) -> Result<()> {
        match self.state {
            OverlayState::Disposed => Err(Error::Disposed),
            OverlayState::Detached => Ok(()),
            OverlayState::Attached => {
                self.signal.take();
                self.recompute(&[change])
            }
        }
    }

    /// Run one animation frame
    ///
    /// Applies pending layout changes, runs due timers, renders the current
    /// edges and the pulses live at frame start onto `surface` and re-arms
    /// the frame. A pulse is drawn through `t == end` inclusive. A failed layout pass
    /// keeps the previous anchors; a failed item is skipped. Only a surface
    /// that cannot begin or end a frame turns into an error.
    pub fn tick<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<FrameReport> {
        match self.state {
            OverlayState::Disposed => return Err(Error::Disposed),
            OverlayState::Detached => return Ok(FrameReport::default()),
            OverlayState::Attached => {}
        }
        self.frame_pending = false;

        if self.signal.is_raised() {
            let changes = self.signal.take();
            if let Err(err) = self.recompute(&changes) {
                warn!(error = %err, "layout recompute failed, keeping previous anchors");
            }
        }

        let now = self.clock.now();
        let (edges, pulses) = {
            let mut scheduler = self.scheduler.borrow_mut();
            // Pulses retired by this pass still get their final frame
            let pulses = scheduler.live_pulses();
            let ran = scheduler.run_due(now);
            if ran > 0 {
                trace!(ran, now, "timers fired");
            }
            (scheduler.edges(), pulses)
        };

        let anchors = self.registry.anchors();
        let input = FrameInput {
            anchors: &anchors,
            edges: &edges,
            pulses: &pulses,
            now,
        };
        let mut scene = render_frame(&input, &self.config.style);

        self.frame = (self.frame + 1) % FRAME_WRAP;
        self.frame_pending = true;

        let painted = paint(&scene, surface);
        match painted {
            Ok(failures) => {
                scene.report.surface_failures = failures;
                trace!(frame = self.frame, report = ?scene.report, "frame drawn");
                Ok(scene.report)
            }
            Err(err) => {
                warn!(frame = self.frame, error = %err, "surface failed");
                Err(Error::Surface(err.to_string()))
            }
        }
    }

    /// Tear down the overlay; safe to call repeatedly
    pub fn dispose(&mut self) {
        if self.state == OverlayState::Disposed {
            return;
        }
        self.release();
        self.scheduler.borrow_mut().cancel_all();
        self.state = OverlayState::Disposed;
        debug!(frames = self.frame, "overlay disposed");
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn anchors(&self) -> Rc<AnchorMap> {
        self.registry.anchors()
    }

    pub fn edges(&self) -> Rc<[FlowEdge]> {
        self.scheduler.borrow().edges()
    }

    pub fn live_pulses(&self) -> Rc<[Pulse]> {
        self.scheduler.borrow().live_pulses()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.borrow().pending_timers()
    }

    /// Earliest pending timer deadline
    pub fn next_wake(&self) -> Option<Millis> {
        self.scheduler.borrow_mut().next_wake()
    }

    /// Whether a frame callback is armed
    pub fn has_pending_frame(&self) -> bool {
        self.frame_pending
    }

    /// Frame counter, wrapping at one million
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Producer handle on this overlay's bus
    pub fn emitter(&self) -> FlowEmitter {
        FlowEmitter::new(self.bus.clone())
    }
}

impl<P: RegionProvider> Drop for OverlayController<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn on_pulse(scheduler: &Weak<RefCell<PulseScheduler>>, now: Millis, event: &PulseEvent) {
    let Some(scheduler) = scheduler.upgrade() else {
        return;
    };
    let Ok(mut scheduler) = scheduler.try_borrow_mut() else {
        warn!(from = %event.from, to = %event.to, "pulse request dropped, scheduler busy");
        return;
    };
    if let Err(err) = scheduler.on_pulse_request(event, now) {
        warn!(from = %event.from, to = %event.to, error = %err, "pulse request rejected");
    }
}

fn on_flash(scheduler: &Weak<RefCell<PulseScheduler>>, now: Millis, event: &FlashEvent) {
    let Some(scheduler) = scheduler.upgrade() else {
        return;
    };
    let Ok(mut scheduler) = scheduler.try_borrow_mut() else {
        warn!(from = %event.from, to = %event.to, "flash request dropped, scheduler busy");
        return;
    };
    scheduler.on_flash_request(event, now);
}
