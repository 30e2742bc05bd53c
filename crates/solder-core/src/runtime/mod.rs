//! Execution runtimes behind a [`WiringModel`](crate::WiringModel).
//!
//! Both runtimes share the same graph semantics. They differ in where tasks
//! run and how time passes:
//!
//! - [`concurrent`]: real threads, wall-clock heartbeats, blocking PUT
//! - [`deterministic`]: one thread, explicit ticks, simulated-clock heartbeats

pub mod concurrent;
pub(crate) mod deterministic;
pub(crate) mod heartbeat;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::ThreadPool;

use crate::error::Result;
use crate::graph::SchedulerType;
use crate::scheduler::dispatch::{DedicatedWorker, Dispatcher, SequentialQueue};
use crate::wire::OutputWire;

pub use concurrent::ConcurrentSettings;
use concurrent::ConcurrentRuntime;
use deterministic::DeterministicRuntime;

pub(crate) enum Runtime {
    Concurrent(ConcurrentRuntime),
    Deterministic(DeterministicRuntime),
}

impl Runtime {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Concurrent(_) => "concurrent",
            Self::Deterministic(_) => "deterministic",
        }
    }

    pub(crate) fn dispatcher(
        &self,
        name: &str,
        scheduler_type: SchedulerType,
        pool: Option<Arc<ThreadPool>>,
    ) -> Dispatcher {
        match (scheduler_type, self) {
            (SchedulerType::Direct | SchedulerType::DirectThreadsafe, _) => Dispatcher::Inline,
            (SchedulerType::NoOp, _) => Dispatcher::Discard,
            (_, Self::Deterministic(runtime)) => Dispatcher::Deferred(Arc::clone(runtime.buffers())),
            (SchedulerType::Concurrent, Self::Concurrent(runtime)) => {
                Dispatcher::Pool(pool.unwrap_or_else(|| Arc::clone(runtime.pool())))
            }
            (SchedulerType::Sequential, Self::Concurrent(runtime)) => {
                let pool = pool.unwrap_or_else(|| Arc::clone(runtime.pool()));
                Dispatcher::Sequential(Arc::new(SequentialQueue::new(pool)))
            }
            (SchedulerType::DedicatedThread, Self::Concurrent(runtime)) => {
                let worker = Arc::new(DedicatedWorker::new(name));
                runtime.register_dedicated(Arc::clone(&worker));
                Dispatcher::Dedicated(worker)
            }
        }
    }

    pub(crate) fn register_heartbeat(&self, period: Duration, wire: OutputWire<Instant>) {
        match self {
            Self::Concurrent(runtime) => runtime.register_heartbeat(period, wire),
            Self::Deterministic(runtime) => runtime.register_heartbeat(period, wire),
        }
    }

    pub(crate) fn monitors_health(&self) -> bool {
        matches!(self, Self::Concurrent(_))
    }

    pub(crate) fn default_health_threshold(&self) -> Option<usize> {
        match self {
            Self::Concurrent(runtime) => runtime.settings().default_health_threshold,
            Self::Deterministic(_) => None,
        }
    }

    pub(crate) fn start(&self) -> Result<()> {
        match self {
            Self::Concurrent(runtime) => runtime.start(),
            Self::Deterministic(runtime) => {
                runtime.start();
                Ok(())
            }
        }
    }

    pub(crate) fn stop(&self) {
        match self {
            Self::Concurrent(runtime) => runtime.stop(),
            Self::Deterministic(_) => {}
        }
    }

    pub(crate) fn join_keep_alive(&self) {
        if let Self::Concurrent(runtime) = self {
            runtime.join_keep_alive();
        }
    }
}
