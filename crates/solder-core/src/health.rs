//! Scheduler health monitoring.
//!
//! Every scheduler built with a health threshold is registered here. On each
//! heartbeat the monitor compares unprocessed task counts against thresholds
//! and reports how long the system has been unhealthy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::scheduler::TaskCounter;

struct MonitoredUnit {
    name: String,
    counter: Arc<TaskCounter>,
    threshold: usize,
    unhealthy_since: Option<Instant>,
    last_logged: Option<Instant>,
}

impl MonitoredUnit {
    fn may_log(&self, now: Instant, interval: Duration) -> bool {
        self.last_logged
            .is_none_or(|last| now.saturating_duration_since(last) >= interval)
    }
}

/// Tracks monitored schedulers and the latest system health value.
pub struct HealthMonitor {
    units: Mutex<Vec<MonitoredUnit>>,
    log_interval: Duration,
    latest_nanos: AtomicU64,
}

impl HealthMonitor {
    /// Creates a monitor that logs each unit at most once per `log_interval`.
    pub fn new(log_interval: Duration) -> Self {
        Self {
            units: Mutex::new(Vec::new()),
            log_interval,
            latest_nanos: AtomicU64::new(0),
        }
    }

    pub(crate) fn register(&self, name: &str, counter: Arc<TaskCounter>, threshold: usize) {
        self.units.lock().push(MonitoredUnit {
            name: name.to_string(),
            counter,
            threshold,
            unhealthy_since: None,
            last_logged: None,
        });
    }

    /// Number of monitored schedulers.
    pub fn monitored_units(&self) -> usize {
        self.units.lock().len()
    }

    /// Samples every unit at `now`.
    ///
    /// A unit is unhealthy while its unprocessed count exceeds its threshold.
    /// Returns the longest time any unit has been continuously unhealthy, or
    /// [`Duration::ZERO`] if all are healthy.
    pub fn check_system_health(&self, now: Instant) -> Duration {
        let mut worst = Duration::ZERO;
        let mut units = self.units.lock();

        for unit in units.iter_mut() {
            let count = unit.counter.count();
            if count > unit.threshold {
                let since = *unit.unhealthy_since.get_or_insert(now);
                let duration = now.saturating_duration_since(since);
                worst = worst.max(duration);
                if unit.may_log(now, self.log_interval) {
                    tracing::warn!(
                        "scheduler {} is unhealthy: {} unprocessed tasks (threshold {}) for {:?}",
                        unit.name,
                        count,
                        unit.threshold,
                        duration
                    );
                    unit.last_logged = Some(now);
                }
            } else if let Some(since) = unit.unhealthy_since.take() {
                if unit.may_log(now, self.log_interval) {
                    tracing::info!(
                        "scheduler {} is healthy again after {:?}",
                        unit.name,
                        now.saturating_duration_since(since)
                    );
                    unit.last_logged = Some(now);
                }
            }
        }
        drop(units);

        let nanos = u64::try_from(worst.as_nanos()).unwrap_or(u64::MAX);
        self.latest_nanos.store(nanos, Ordering::Release);
        worst
    }

    /// Value returned by the most recent [`check_system_health`](Self::check_system_health).
    pub fn unhealthy_duration(&self) -> Duration {
        Duration::from_nanos(self.latest_nanos.load(Ordering::Acquire))
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("monitored_units", &self.monitored_units())
            .field("log_interval", &self.log_interval)
            .field("unhealthy_duration", &self.unhealthy_duration())
            .finish()
    }
}
