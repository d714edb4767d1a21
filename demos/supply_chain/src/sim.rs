//! Simulated day ticks
//!
//! Every day the simulation ships goods along the chain and emits one pulse
//! train per configured route. Days advance on demand or, with auto mode
//! on, on a fixed interval.

use crate::error::{Error, Result};
use flowpulse_core::{AnchorId, FlowEmitter, Millis, OverlayConfig, PulseKind, PulseOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One pulse train emitted per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    pub from: AnchorId,
    pub to: AnchorId,
    #[serde(default)]
    pub options: PulseOptions,
}

impl Train {
    fn order(from: &str, to: &str) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            options: PulseOptions::default()
                .kind(PulseKind::Order)
                .quantity(12)
                .count(3)
                .gap_ms(90.0)
                .duration_ms(800.0),
        }
    }
}

/// What happens on each day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayConfig {
    pub auto_interval_ms: Millis,
    pub trains: Vec<Train>,
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            auto_interval_ms: 1200.0,
            trains: vec![
                Train::order("SUP", "WH"),
                Train::order("WH", "CUST"),
                Train::order("CUST", "WH"),
                Train::order("WH", "SUP"),
            ],
        }
    }
}

/// Contents of `data/overlay.ron`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub overlay: OverlayConfig,
    pub day: DayConfig,
}

impl DemoConfig {
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let config: DemoConfig = ron::from_str(content)?;
        config.overlay.validate()?;
        Ok(config)
    }

    /// Load the first config file that exists
    pub fn load() -> Result<Self> {
        let paths = [
            "demos/supply_chain/data/overlay.ron",
            "data/overlay.ron",
            "../data/overlay.ron",
        ];

        for path in &paths {
            if Path::new(path).exists() {
                let content = std::fs::read_to_string(path)?;
                let config = Self::from_ron_str(&content)?;
                debug!(path, "demo config loaded");
                return Ok(config);
            }
        }

        Err(Error::ConfigNotFound("data/overlay.ron".to_string()))
    }
}

/// Day counter and auto-advance timer
#[derive(Debug)]
pub struct Simulation {
    config: DayConfig,
    day: u32,
    auto: bool,
    last_day: Millis,
}

impl Simulation {
    pub fn new(config: DayConfig) -> Self {
        Self {
            config,
            day: 1,
            auto: false,
            last_day: 0.0,
        }
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    /// Toggle auto mode; the first automatic day follows one interval later
    pub fn toggle_auto(&mut self, now: Millis) {
        self.auto = !self.auto;
        self.last_day = now;
        info!(auto = self.auto, "auto mode toggled");
    }

    /// Advance one day and emit its trains; returns the number of trains
    pub fn step(&mut self, now: Millis, emitter: &FlowEmitter) -> usize {
        self.day += 1;
        self.last_day = now;

        let mut delivered = 0;
        for train in &self.config.trains {
            delivered += emitter.request_pulse(train.from.clone(), train.to.clone(), train.options.clone());
        }
        debug!(day = self.day, trains = self.config.trains.len(), delivered, "day ticked");
        self.config.trains.len()
    }

    /// Advance if auto mode is on and the interval has passed
    pub fn update(&mut self, now: Millis, emitter: &FlowEmitter) -> bool {
        if self.auto && now - self.last_day >= self.config.auto_interval_ms {
            self.step(now, emitter);
            true
        } else {
            false
        }
    }
}
