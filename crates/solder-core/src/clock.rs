//! Externally advanced clock for the deterministic runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic clock that only moves when told to.
///
/// [`now()`](Self::now) is a fixed origin `Instant` plus the accumulated
/// [`advance()`](Self::advance) calls, so timestamps compare and subtract like
/// real instants. Ticks and time are independent: a harness may tick many
/// times without advancing, or advance far between two ticks.
#[derive(Debug)]
pub struct SimulatedClock {
    origin: Instant,
    elapsed_nanos: AtomicU64,
}

impl SimulatedClock {
    /// Creates a clock at elapsed zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_nanos: AtomicU64::new(0),
        }
    }

    /// Current simulated instant.
    pub fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    /// Time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Acquire))
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(nanos))
            })
            .ok();
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = SimulatedClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn advance_accumulates() {
        let clock = SimulatedClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(10));
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.elapsed(), Duration::from_millis(15));
        assert_eq!(clock.now() - start, Duration::from_millis(15));
    }

    #[test]
    fn does_not_follow_wall_time() {
        let clock = SimulatedClock::new();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
