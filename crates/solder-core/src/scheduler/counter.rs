//! Unprocessed-task accounting with optional blocking admission.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Longest a pool worker sleeps between capacity checks when it has nothing
/// else to run.
const IDLE_RECHECK: Duration = Duration::from_millis(1);

/// Counts tasks a scheduler has accepted but not finished.
///
/// `on_ramp*` is called on acceptance, [`off_ramp`](Self::off_ramp) after the
/// handler returns. Blocking admission waits on a condition variable that
/// every off-ramp signals. Pool workers never park on it: they run other
/// pool jobs while they wait, so the job that would free capacity can still
/// get a thread.
#[derive(Debug, Default)]
pub(crate) struct TaskCounter {
    count: Mutex<usize>,
    drained: Condvar,
}

impl TaskCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until fewer than `capacity` tasks are outstanding, then counts one more.
    pub(crate) fn on_ramp(&self, capacity: usize) {
        if rayon::current_thread_index().is_some() {
            self.on_ramp_in_pool(capacity);
            return;
        }
        let mut count = self.count.lock();
        while *count >= capacity {
            self.drained.wait(&mut count);
        }
        *count += 1;
    }

    fn on_ramp_in_pool(&self, capacity: usize) {
        while !self.attempt_on_ramp(Some(capacity)) {
            if matches!(rayon::yield_now(), Some(rayon::Yield::Executed)) {
                continue;
            }
            let mut count = self.count.lock();
            if *count >= capacity {
                let _ = self.drained.wait_for(&mut count, IDLE_RECHECK);
            }
        }
    }

    /// Counts one more task unless `capacity` is already reached.
    pub(crate) fn attempt_on_ramp(&self, capacity: Option<usize>) -> bool {
        let mut count = self.count.lock();
        if let Some(capacity) = capacity
            && *count >= capacity
        {
            return false;
        }
        *count += 1;
        true
    }

    /// Counts one more task regardless of capacity.
    pub(crate) fn force_on_ramp(&self) {
        *self.count.lock() += 1;
    }

    pub(crate) fn off_ramp(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        drop(count);
        self.drained.notify_one();
    }

    pub(crate) fn count(&self) -> usize {
        *self.count.lock()
    }
}
