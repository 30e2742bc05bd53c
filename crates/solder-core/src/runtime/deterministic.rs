//! Single-threaded, tick-driven runtime.
//!
//! Work accepted during cycle `n` runs during cycle `n + 1`. One
//! [`tick`](DeterministicRuntime::tick) runs the current buffer in insertion
//! order, steps every heartbeat against the [`SimulatedClock`], and swaps the
//! buffers. Given the same inputs, ticks and clock advances, two runs execute
//! the same handlers in the same order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::SimulatedClock;
use crate::scheduler::dispatch::Task;
use crate::wire::OutputWire;

use super::heartbeat::DeterministicHeartbeat;

/// The two ordered work buffers.
#[derive(Default)]
pub(crate) struct WorkBuffers {
    current: Mutex<VecDeque<Task>>,
    next: Mutex<VecDeque<Task>>,
}

impl WorkBuffers {
    /// Queues `task` for the next cycle.
    pub(crate) fn submit_work(&self, task: Task) {
        self.next.lock().push_back(task);
    }

    fn take_current(&self) -> VecDeque<Task> {
        std::mem::take(&mut *self.current.lock())
    }

    fn swap(&self) {
        let next = std::mem::take(&mut *self.next.lock());
        *self.current.lock() = next;
    }

    fn len(&self) -> usize {
        self.current.lock().len() + self.next.lock().len()
    }
}

pub(crate) struct DeterministicRuntime {
    clock: Arc<SimulatedClock>,
    buffers: Arc<WorkBuffers>,
    heartbeats: Mutex<Vec<DeterministicHeartbeat>>,
}

impl DeterministicRuntime {
    pub(crate) fn new(clock: Arc<SimulatedClock>) -> Self {
        Self {
            clock,
            buffers: Arc::new(WorkBuffers::default()),
            heartbeats: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn clock(&self) -> &Arc<SimulatedClock> {
        &self.clock
    }

    pub(crate) fn buffers(&self) -> &Arc<WorkBuffers> {
        &self.buffers
    }

    pub(crate) fn register_heartbeat(&self, period: Duration, wire: OutputWire<Instant>) {
        let now = self.clock.now();
        self.heartbeats
            .lock()
            .push(DeterministicHeartbeat::new(period, now, wire));
    }

    /// Restarts every heartbeat's cadence from the current simulated time.
    pub(crate) fn start(&self) {
        let now = self.clock.now();
        for heartbeat in self.heartbeats.lock().iter_mut() {
            heartbeat.reset(now);
        }
    }

    pub(crate) fn tick(&self) {
        for task in self.buffers.take_current() {
            task();
        }

        let now = self.clock.now();
        let emissions: Vec<(OutputWire<Instant>, Vec<Instant>)> = self
            .heartbeats
            .lock()
            .iter_mut()
            .map(|h| {
                let beats = h.due(now);
                (h.wire().clone(), beats)
            })
            .filter(|(_, beats)| !beats.is_empty())
            .collect();
        for (wire, beats) in emissions {
            for beat in beats {
                wire.forward(beat);
            }
        }

        self.buffers.swap();
    }

    pub(crate) fn pending_work(&self) -> usize {
        self.buffers.len()
    }
}
