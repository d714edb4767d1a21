//! Pulse records and pulse-train requests

use crate::{AnchorId, Millis, PulseId, PulseRequestError};
use serde::{Deserialize, Serialize};

/// Most pulses a single request may start
pub const MAX_TRAIN_LEN: u32 = 10_000;

/// Lane a pulse travels in
///
/// Opposite kinds on the same edge are drawn on opposite sides of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseKind {
    /// Demand flowing upstream
    Order,
    /// Goods flowing downstream
    Ship,
}

impl PulseKind {
    /// Sign of the perpendicular lane offset
    pub fn lane_sign(&self) -> f64 {
        match self {
            PulseKind::Order => 1.0,
            PulseKind::Ship => -1.0,
        }
    }
}

/// Optional parameters of a pulse-train request
///
/// Unset fields fall back to [`PulseDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseOptions {
    #[serde(default)]
    pub duration_ms: Option<Millis>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub gap_ms: Option<Millis>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub kind: Option<PulseKind>,
}

impl PulseOptions {
    pub fn duration_ms(mut self, duration_ms: Millis) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn gap_ms(mut self, gap_ms: Millis) -> Self {
        self.gap_ms = Some(gap_ms);
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn kind(mut self, kind: PulseKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Fallback values for unset [`PulseOptions`] fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseDefaults {
    pub duration_ms: Millis,
    pub count: u32,
    pub gap_ms: Millis,
}

impl Default for PulseDefaults {
    fn default() -> Self {
        Self {
            duration_ms: 900.0,
            count: 1,
            gap_ms: 120.0,
        }
    }
}

/// A pulse-train request with every parameter resolved
#[derive(Debug, Clone, PartialEq)]
pub struct PulseRequest {
    pub from: AnchorId,
    pub to: AnchorId,
    pub duration_ms: Millis,
    pub count: u32,
    pub gap_ms: Millis,
    pub quantity: Option<i64>,
    pub kind: Option<PulseKind>,
}

impl PulseRequest {
    /// Fill unset options from `defaults`
    pub fn resolve(from: AnchorId, to: AnchorId, options: &PulseOptions, defaults: &PulseDefaults) -> Self {
        Self {
            from,
            to,
            duration_ms: options.duration_ms.unwrap_or(defaults.duration_ms),
            count: options.count.unwrap_or(defaults.count),
            gap_ms: options.gap_ms.unwrap_or(defaults.gap_ms),
            quantity: options.quantity,
            kind: options.kind,
        }
    }

    /// Reject requests that cannot produce well-formed pulses
    pub fn validate(&self) -> Result<(), PulseRequestError> {
        if !self.duration_ms.is_finite() || self.duration_ms <= 0.0 {
            return Err(PulseRequestError::NonPositiveDuration(self.duration_ms));
        }
        if !self.gap_ms.is_finite() || self.gap_ms < 0.0 {
            return Err(PulseRequestError::InvalidGap(self.gap_ms));
        }
        if self.count > MAX_TRAIN_LEN {
            return Err(PulseRequestError::TrainTooLong {
                count: self.count,
                max: MAX_TRAIN_LEN,
            });
        }
        Ok(())
    }

    /// Start offset of pulse `index` from the receipt instant
    pub fn offset_of(&self, index: u32) -> Millis {
        index as Millis * self.gap_ms
    }

    /// Time from receipt until the last pulse ends
    pub fn span(&self) -> Millis {
        if self.count == 0 {
            0.0
        } else {
            self.offset_of(self.count - 1) + self.duration_ms
        }
    }
}

/// Where a pulse is in its life at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePhase {
    /// Materialized, start time not reached
    Scheduled,
    /// Travelling, `t` within `[0, 1]`
    Active,
    /// Past its end, awaiting cleanup
    Finished,
}

/// One animated marker travelling along an edge
///
/// Immutable once created by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    pub id: PulseId,
    pub from: AnchorId,
    pub to: AnchorId,
    pub start: Millis,
    pub duration: Millis,
    pub quantity: Option<i64>,
    pub kind: Option<PulseKind>,
}

impl Pulse {
    /// Instant the pulse arrives at its destination
    pub fn end(&self) -> Millis {
        self.start + self.duration
    }

    /// Elapsed time since start (negative before start)
    pub fn elapsed(&self, now: Millis) -> Millis {
        now - self.start
    }

    /// Fraction of the path covered at `now`, or `None` outside `[0, 1]`
    pub fn progress(&self, now: Millis) -> Option<f64> {
        let t = self.elapsed(now) / self.duration;
        (0.0..=1.0).contains(&t).then_some(t)
    }

    pub fn phase(&self, now: Millis) -> PulsePhase {
        if now < self.start {
            PulsePhase::Scheduled
        } else if now <= self.end() {
            PulsePhase::Active
        } else {
            PulsePhase::Finished
        }
    }

    /// Whether cleanup at `now` retires this pulse
    pub fn is_expired(&self, now: Millis) -> bool {
        self.end() <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: PulseOptions) -> PulseRequest {
        PulseRequest::resolve("A".into(), "B".into(), &options, &PulseDefaults::default())
    }

    #[test]
    fn test_defaults_fill_unset_options() {
        let req = request(PulseOptions::default().quantity(12));
        assert_eq!(req.duration_ms, 900.0);
        assert_eq!(req.count, 1);
        assert_eq!(req.gap_ms, 120.0);
        assert_eq!(req.quantity, Some(12));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_duration() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let req = request(PulseOptions::default().duration_ms(bad));
            assert!(matches!(
                req.validate(),
                Err(PulseRequestError::NonPositiveDuration(_))
            ));
        }
    }

    #[test]
    fn test_validate_rejects_bad_gap() {
        let req = request(PulseOptions::default().gap_ms(-1.0));
        assert_eq!(req.validate(), Err(PulseRequestError::InvalidGap(-1.0)));

        let req = request(PulseOptions::default().gap_ms(f64::INFINITY));
        assert!(matches!(req.validate(), Err(PulseRequestError::InvalidGap(_))));

        let req = request(PulseOptions::default().gap_ms(0.0).count(3));
        assert!(req.validate().is_ok());
        assert_eq!(req.offset_of(2), 0.0);

        let req = request(PulseOptions::default().gap_ms(0.0).count(1));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_caps_train_length() {
        let req = request(PulseOptions::default().count(MAX_TRAIN_LEN));
        assert!(req.validate().is_ok());

        let req = request(PulseOptions::default().count(u32::MAX));
        assert_eq!(
            req.validate(),
            Err(PulseRequestError::TrainTooLong {
                count: u32::MAX,
                max: MAX_TRAIN_LEN
            })
        );
    }

    #[test]
    fn test_span() {
        let req = request(PulseOptions::default().count(3).gap_ms(100.0).duration_ms(800.0));
        assert_eq!(req.offset_of(2), 200.0);
        assert_eq!(req.span(), 1000.0);
        assert_eq!(request(PulseOptions::default().count(0)).span(), 0.0);
    }

    #[test]
    fn test_pulse_progress_and_phase() {
        let pulse = Pulse {
            id: PulseId::new(1),
            from: "A".into(),
            to: "B".into(),
            start: 100.0,
            duration: 1000.0,
            quantity: None,
            kind: None,
        };

        assert_eq!(pulse.progress(99.0), None);
        assert_eq!(pulse.progress(100.0), Some(0.0));
        assert_eq!(pulse.progress(600.0), Some(0.5));
        assert_eq!(pulse.progress(1100.0), Some(1.0));
        assert_eq!(pulse.progress(1101.0), None);

        assert_eq!(pulse.phase(50.0), PulsePhase::Scheduled);
        assert_eq!(pulse.phase(500.0), PulsePhase::Active);
        assert_eq!(pulse.phase(1200.0), PulsePhase::Finished);
        assert!(pulse.is_expired(1100.0));
        assert!(!pulse.is_expired(1099.0));
    }

    #[test]
    fn test_lane_signs_oppose() {
        assert_eq!(PulseKind::Order.lane_sign(), -PulseKind::Ship.lane_sign());
    }

    #[test]
    fn test_options_from_ron() {
        let options: PulseOptions =
            ron::from_str("(count: Some(3), gap_ms: Some(90.0), kind: Some(order))").unwrap();
        assert_eq!(options.count, Some(3));
        assert_eq!(options.kind, Some(PulseKind::Order));
        assert_eq!(options.duration_ms, None);
    }
}
