//! Time sources for the overlay
//!
//! All timestamps are milliseconds on a monotonic timeline:
//! - `Millis` - Fractional milliseconds, the unit of every start and duration
//! - `Clock` - Source of the current instant
//! - `SystemClock` - Monotonic wall clock
//! - `ManualClock` - Externally driven clock for tests and replays

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Milliseconds on the overlay timeline
pub type Millis = f64;

/// Source of the current instant
pub trait Clock {
    /// Current time in milliseconds
    fn now(&self) -> Millis;
}

/// Monotonic clock measured from its creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose zero is the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Settable clock
///
/// Clones share the same instant, so a test can keep one handle while the
/// overlay reads another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    /// Create a clock starting at `start`
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Jump to an absolute instant
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// Move forward by `delta` milliseconds
    pub fn advance(&self, delta: Millis) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(10.0);
        let other = clock.clone();
        clock.advance(5.0);
        assert_eq!(other.now(), 15.0);

        other.set(100.0);
        assert_eq!(clock.now(), 100.0);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(a >= 0.0);
        assert!(b >= a);
    }
}
