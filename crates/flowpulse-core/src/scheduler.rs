//! Pulse scheduler
//!
//! Materializes pulse trains and flash highlights from bus events and
//! retires them later. All deferred work goes through one [`TimerQueue`]:
//! - a single cleanup wake, always at the latest end time among live pulses
//! - one revert wake per highlighted edge (re-flashing re-arms it)
//!
//! Live pulses and edges are held as shared slices that are replaced, never
//! edited, so a renderer holding a snapshot sees a consistent frame.

use crate::{
    EdgeId, FlashEvent, FlowEdge, Millis, Pulse, PulseDefaults, PulseEvent, PulseId,
    PulseRequest, Result, TimerId, TimerQueue, Topology,
};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Default decay window of a flash highlight
pub const DEFAULT_FLASH_DECAY_MS: Millis = 800.0;

#[derive(Debug, Clone, PartialEq)]
enum Wake {
    Cleanup,
    RevertFlash(EdgeId),
}

/// Consistent view of the scheduler's published state
#[derive(Debug, Clone)]
pub struct SchedulerSnapshot {
    pub edges: Rc<[FlowEdge]>,
    pub pulses: Rc<[Pulse]>,
}

/// Owner of live pulses and edge highlights
#[derive(Debug)]
pub struct PulseScheduler {
    topology: Topology,
    pulses: Rc<[Pulse]>,
    defaults: PulseDefaults,
    flash_decay_ms: Millis,
    timers: TimerQueue<Wake>,
    cleanup: Option<TimerId>,
    flash_reverts: HashMap<EdgeId, TimerId>,
    next_pulse: u64,
}

impl PulseScheduler {
    /// Create a scheduler over a fixed topology
    pub fn new(topology: Topology, defaults: PulseDefaults, flash_decay_ms: Millis) -> Self {
        Self {
            topology,
            pulses: Rc::from(Vec::new()),
            defaults,
            flash_decay_ms,
            timers: TimerQueue::new(),
            cleanup: None,
            flash_reverts: HashMap::new(),
            next_pulse: 0,
        }
    }

    /// Materialize a pulse train received at `now`
    ///
    /// Pulse `i` starts at `now + i * gap`. Invalid requests are rejected
    /// before any pulse is created; a count of zero creates nothing.
    pub fn on_pulse_request(&mut self, event: &PulseEvent, now: Millis) -> Result<Vec<PulseId>> {
        let request = PulseRequest::resolve(
            event.from.clone(),
            event.to.clone(),
            &event.options,
            &self.defaults,
        );
        request.validate()?;

        if request.count == 0 {
            trace!(from = %request.from, to = %request.to, "empty pulse train ignored");
            return Ok(Vec::new());
        }

        let mut next: Vec<Pulse> = Vec::with_capacity(self.pulses.len() + request.count as usize);
        next.extend(self.pulses.iter().cloned());

        let mut ids = Vec::with_capacity(request.count as usize);
        for index in 0..request.count {
            let id = PulseId::new(self.next_pulse);
            self.next_pulse += 1;
            next.push(Pulse {
                id,
                from: request.from.clone(),
                to: request.to.clone(),
                start: now + request.offset_of(index),
                duration: request.duration_ms,
                quantity: request.quantity,
                kind: request.kind,
            });
            ids.push(id);
        }
        self.pulses = Rc::from(next);
        self.arm_cleanup(now + request.span());

        debug!(
            from = %request.from,
            to = %request.to,
            count = request.count,
            gap_ms = request.gap_ms,
            duration_ms = request.duration_ms,
            live = self.pulses.len(),
            "pulse train scheduled"
        );
        Ok(ids)
    }

    /// Highlight every edge `from -> to` and schedule its revert
    ///
    /// Returns the number of edges highlighted.
    pub fn on_flash_request(&mut self, event: &FlashEvent, now: Millis) -> usize {
        let mut ids = self.topology.matching(&event.from, &event.to);
        ids.dedup();
        if ids.is_empty() {
            debug!(from = %event.from, to = %event.to, "flash for unknown edge ignored");
            return 0;
        }

        for id in &ids {
            self.topology.set_highlight(id, true);
            if let Some(previous) = self.flash_reverts.remove(id) {
                self.timers.cancel(previous);
            }
            let timer = self
                .timers
                .schedule(now + self.flash_decay_ms, Wake::RevertFlash(id.clone()));
            self.flash_reverts.insert(id.clone(), timer);
        }
        trace!(from = %event.from, to = %event.to, edges = ids.len(), "edge flashed");
        ids.len()
    }

    /// Run every wake due at `now`; returns how many ran
    pub fn run_due(&mut self, now: Millis) -> usize {
        let due = self.timers.pop_due(now);
        let ran = due.len();
        for wake in due {
            match wake {
                Wake::Cleanup => {
                    self.cleanup = None;
                    self.retire_expired(now);
                }
                Wake::RevertFlash(id) => {
                    self.flash_reverts.remove(&id);
                    if self.topology.set_highlight(&id, false) {
                        trace!(edge = %id, "flash reverted");
                    }
                }
            }
        }
        ran
    }

    /// Earliest pending wake
    pub fn next_wake(&mut self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    /// Number of pending timers (cleanup plus flash reverts)
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Cancel every pending timer and clear highlights
    pub fn cancel_all(&mut self) {
        self.timers.clear();
        self.cleanup = None;
        self.flash_reverts.clear();
        self.topology.clear_highlights();
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            edges: self.topology.edges(),
            pulses: self.live_pulses(),
        }
    }

    pub fn live_pulses(&self) -> Rc<[Pulse]> {
        Rc::clone(&self.pulses)
    }

    pub fn edges(&self) -> Rc<[FlowEdge]> {
        self.topology.edges()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn defaults(&self) -> &PulseDefaults {
        &self.defaults
    }

    /// Keep exactly one cleanup wake, at the latest end seen so far
    fn arm_cleanup(&mut self, at: Millis) {
        if let Some(current) = self.cleanup {
            match self.timers.deadline(current) {
                Some(deadline) if deadline >= at => return,
                _ => {
                    self.timers.cancel(current);
                }
            }
        }
        self.cleanup = Some(self.timers.schedule(at, Wake::Cleanup));
    }

    fn retire_expired(&mut self, now: Millis) {
        let before = self.pulses.len();
        if self.pulses.iter().any(|p| p.is_expired(now)) {
            let remaining: Vec<Pulse> = self
                .pulses
                .iter()
                .filter(|p| !p.is_expired(now))
                .cloned()
                .collect();
            self.pulses = Rc::from(remaining);
        }

        let latest_end = self.pulses.iter().map(Pulse::end).reduce(Millis::max);
        if let Some(end) = latest_end {
            self.arm_cleanup(end);
        }
        debug!(
            retired = before - self.pulses.len(),
            live = self.pulses.len(),
            "expired pulses cleaned up"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, PulseKind, PulseOptions, PulseRequestError};

    fn scheduler() -> PulseScheduler {
        PulseScheduler::new(
            Topology::new(vec![FlowEdge::new("A", "B"), FlowEdge::new("B", "A")]),
            PulseDefaults::default(),
            DEFAULT_FLASH_DECAY_MS,
        )
    }

    fn train(options: PulseOptions) -> PulseEvent {
        PulseEvent::new("A", "B", options)
    }

    #[test]
    fn test_train_start_times_staggered() {
        let mut sched = scheduler();
        let t = 5_000.0;
        let ids = sched
            .on_pulse_request(
                &train(PulseOptions::default().count(3).gap_ms(100.0).duration_ms(800.0)),
                t,
            )
            .unwrap();

        assert_eq!(ids.len(), 3);
        let pulses = sched.live_pulses();
        let starts: Vec<Millis> = pulses.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![t, t + 100.0, t + 200.0]);
        assert!(pulses.iter().all(|p| p.duration == 800.0));

        assert_eq!(sched.pending_timers(), 1);
        assert_eq!(sched.next_wake(), Some(t + 1000.0));

        sched.run_due(t + 999.0);
        assert_eq!(sched.live_pulses().len(), 3);

        sched.run_due(t + 1000.0);
        assert!(sched.live_pulses().is_empty());
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_zero_gap_train_starts_together() {
        let mut sched = scheduler();
        let ids = sched
            .on_pulse_request(&train(PulseOptions::default().count(3).gap_ms(0.0).duration_ms(400.0)), 50.0)
            .unwrap();

        assert_eq!(ids.len(), 3);
        let pulses = sched.live_pulses();
        assert_eq!(pulses.len(), 3);
        assert!(pulses.iter().all(|p| p.start == 50.0));
        assert_eq!(sched.pending_timers(), 1);
        assert_eq!(sched.next_wake(), Some(450.0));
    }

    #[test]
    fn test_overlong_train_creates_nothing() {
        let mut sched = scheduler();
        let err = sched
            .on_pulse_request(&train(PulseOptions::default().count(u32::MAX)), 0.0)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPulseRequest(PulseRequestError::TrainTooLong { .. })
        ));
        assert!(sched.live_pulses().is_empty());
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_pulse_ids_unique() {
        let mut sched = scheduler();
        let a = sched.on_pulse_request(&train(PulseOptions::default().count(2)), 0.0).unwrap();
        let b = sched.on_pulse_request(&train(PulseOptions::default().count(2)), 0.0).unwrap();
        let mut all: Vec<PulseId> = a.into_iter().chain(b).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_zero_count_is_noop() {
        let mut sched = scheduler();
        let ids = sched.on_pulse_request(&train(PulseOptions::default().count(0)), 0.0).unwrap();
        assert!(ids.is_empty());
        assert!(sched.live_pulses().is_empty());
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_invalid_request_creates_nothing() {
        let mut sched = scheduler();
        let err = sched
            .on_pulse_request(&train(PulseOptions::default().duration_ms(0.0).count(3)), 0.0)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPulseRequest(PulseRequestError::NonPositiveDuration(_))
        ));
        assert!(sched.live_pulses().is_empty());
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_single_cleanup_timer_across_trains() {
        let mut sched = scheduler();
        for i in 0..10 {
            sched
                .on_pulse_request(&train(PulseOptions::default().duration_ms(500.0)), i as f64 * 10.0)
                .unwrap();
        }
        assert_eq!(sched.pending_timers(), 1);
        assert_eq!(sched.next_wake(), Some(590.0));

        // An earlier-ending train does not pull the wake forward
        sched
            .on_pulse_request(&train(PulseOptions::default().duration_ms(100.0)), 100.0)
            .unwrap();
        assert_eq!(sched.pending_timers(), 1);
        assert_eq!(sched.next_wake(), Some(590.0));

        sched.run_due(590.0);
        assert!(sched.live_pulses().is_empty());
    }

    #[test]
    fn test_cleanup_wake_extends_for_longer_train() {
        let mut sched = scheduler();
        sched
            .on_pulse_request(&train(PulseOptions::default().duration_ms(100.0)), 0.0)
            .unwrap();
        assert_eq!(sched.next_wake(), Some(100.0));
        sched.run_due(50.0);
        sched
            .on_pulse_request(&train(PulseOptions::default().duration_ms(1000.0)), 60.0)
            .unwrap();
        assert_eq!(sched.next_wake(), Some(1060.0));

        sched.run_due(1060.0);
        assert!(sched.live_pulses().is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_writes() {
        let mut sched = scheduler();
        sched.on_pulse_request(&train(PulseOptions::default()), 0.0).unwrap();
        let snapshot = sched.snapshot();

        sched.on_pulse_request(&train(PulseOptions::default()), 10.0).unwrap();
        sched.on_flash_request(&FlashEvent::new("A", "B"), 10.0);

        assert_eq!(snapshot.pulses.len(), 1);
        assert!(!snapshot.edges[0].highlight);
        assert_eq!(sched.live_pulses().len(), 2);
        assert!(sched.edges()[0].highlight);
    }

    #[test]
    fn test_flash_reverts_after_decay() {
        let mut sched = scheduler();
        assert_eq!(sched.on_flash_request(&FlashEvent::new("A", "B"), 1000.0), 1);
        assert!(sched.edges()[0].highlight);
        assert!(!sched.edges()[1].highlight);

        sched.run_due(1799.0);
        assert!(sched.edges()[0].highlight);

        sched.run_due(1800.0);
        assert!(!sched.edges()[0].highlight);
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_reflash_rearms_single_revert() {
        let mut sched = scheduler();
        sched.on_flash_request(&FlashEvent::new("A", "B"), 0.0);
        sched.on_flash_request(&FlashEvent::new("A", "B"), 500.0);
        assert_eq!(sched.pending_timers(), 1);

        sched.run_due(800.0);
        assert!(sched.edges()[0].highlight);
        sched.run_due(1300.0);
        assert!(!sched.edges()[0].highlight);
    }

    #[test]
    fn test_flash_unknown_edge() {
        let mut sched = scheduler();
        assert_eq!(sched.on_flash_request(&FlashEvent::new("A", "Z"), 0.0), 0);
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_flash_and_pulses_coexist() {
        let mut sched = scheduler();
        sched
            .on_pulse_request(
                &train(PulseOptions::default().kind(PulseKind::Ship).duration_ms(2000.0)),
                0.0,
            )
            .unwrap();
        sched.on_flash_request(&FlashEvent::new("A", "B"), 0.0);
        assert_eq!(sched.pending_timers(), 2);

        sched.run_due(800.0);
        assert!(!sched.edges()[0].highlight);
        assert_eq!(sched.live_pulses().len(), 1);
    }

    #[test]
    fn test_cancel_all() {
        let mut sched = scheduler();
        sched.on_pulse_request(&train(PulseOptions::default()), 0.0).unwrap();
        sched.on_flash_request(&FlashEvent::new("B", "A"), 0.0);
        sched.cancel_all();
        assert_eq!(sched.pending_timers(), 0);
        assert_eq!(sched.next_wake(), None);
        assert!(sched.edges().iter().all(|e| !e.highlight));
    }
}
