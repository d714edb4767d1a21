//! Flowpulse Core - Live flow overlay engine
//!
//! This crate draws directed "flow" edges between named anchors of a dynamic
//! layout and animates pulses travelling along them:
//! - Anchor registry fed by any provider of named rectangles (`RegionProvider`)
//! - Synchronous event bus for pulse and flash requests (`EventBus`, `FlowEmitter`)
//! - Pulse scheduler with a single cleanup wake per overlay (`PulseScheduler`)
//! - Pure frame renderer producing a display list (`render_frame`, `Surface`)
//! - Overlay controller owning the whole lifecycle (`OverlayController`)
//!
//! ## Threading
//!
//! Everything is single-threaded and cooperative. Shared collections (anchor
//! map, edge list, live pulses) are published as `Rc` snapshots that are
//! replaced on write, so a frame in progress never sees a partial update.
//!
//! ## Example
//!
//! ```
//! use flowpulse_core::{
//!     EventBus, ManualClock, OverlayConfig, OverlayController, PulseOptions, Rect, Region,
//!     StaticRegions, render::RecordingSurface,
//! };
//!
//! let layout = StaticRegions::new(Rect::new(0.0, 0.0, 200.0, 100.0))
//!     .with_region(Region::new("SUP", Rect::new(0.0, 40.0, 20.0, 20.0)))
//!     .with_region(Region::new("WH", Rect::new(90.0, 40.0, 20.0, 20.0)));
//! let clock = ManualClock::new(0.0);
//! let bus = EventBus::new();
//!
//! let config = OverlayConfig::new().with_edge("SUP", "WH");
//! let mut overlay = OverlayController::new(config, layout, bus.clone(), clock.clone());
//! overlay.attach().unwrap();
//!
//! overlay.emitter().request_pulse("SUP", "WH", PulseOptions::default().quantity(12));
//! clock.advance(450.0);
//!
//! let mut surface = RecordingSurface::new();
//! let report = overlay.tick(&mut surface).unwrap();
//! assert_eq!(report.pulses_drawn, 1);
//! ```

mod bus;
mod config;
mod error;
pub mod geometry;
mod identity;
mod layout;
mod overlay;
mod pulse;
mod registry;
pub mod render;
mod scheduler;
pub mod time;
mod timer;
mod topology;

pub use bus::{BusEvent, EventBus, EventKind, FlashEvent, FlowEmitter, PulseEvent, Subscription};
pub use config::{EdgeConfig, OverlayConfig};
pub use error::{Error, PulseRequestError, Result};
pub use geometry::{Point, Rect};
pub use identity::{AnchorId, EdgeId, PulseId, ScopeId};
pub use layout::{LayoutChange, LayoutSignal, LayoutWatch, Region, RegionProvider, StaticRegions};
pub use overlay::{OverlayController, OverlayState};
pub use pulse::{
    Pulse, PulseDefaults, PulseKind, PulseOptions, PulsePhase, PulseRequest, MAX_TRAIN_LEN,
};
pub use registry::{AnchorMap, AnchorRegistry, CollisionPolicy};
pub use render::{DrawItem, FrameReport, RenderStyle, Scene, Surface};
pub use scheduler::{PulseScheduler, SchedulerSnapshot, DEFAULT_FLASH_DECAY_MS};
pub use time::{Clock, ManualClock, Millis, SystemClock};
pub use timer::{TimerId, TimerQueue};
pub use topology::{FlowEdge, MissingAnchor, Topology};
