//! Multi-threaded runtime: a shared worker pool, dedicated threads, a
//! heartbeat thread, and an optional keep-alive thread.

use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rayon::ThreadPool;

use crate::error::{Result, WiringError};
use crate::scheduler::dispatch::DedicatedWorker;
use crate::wire::OutputWire;

use super::heartbeat::HeartbeatEngine;

/// Settings for [`WiringModel::concurrent`](crate::WiringModel::concurrent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrentSettings {
    /// Shared pool size. 0 uses the available parallelism.
    pub worker_threads: usize,
    /// Period of the heartbeat feeding the health monitor.
    pub health_monitor_period: Duration,
    /// Minimum time between health log lines for one scheduler.
    pub health_log_interval: Duration,
    /// Start a keep-alive thread with the model.
    pub keep_alive: bool,
    /// Health threshold for schedulers that set neither a threshold nor a capacity.
    pub default_health_threshold: Option<usize>,
}

impl Default for ConcurrentSettings {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            health_monitor_period: Duration::from_millis(100),
            health_log_interval: Duration::from_secs(10),
            keep_alive: false,
            default_health_threshold: None,
        }
    }
}

impl ConcurrentSettings {
    /// Builds the shared worker pool.
    pub fn build_pool(&self) -> Result<ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(|i| format!("solder-worker-{i}"))
            .build()
            .map_err(|e| WiringError::WorkerPool(e.to_string()))
    }
}

struct KeepAlive {
    stop: Sender<()>,
    // Disconnects when the keep-alive thread exits.
    exited: Receiver<()>,
    handle: JoinHandle<()>,
}

pub(crate) struct ConcurrentRuntime {
    settings: ConcurrentSettings,
    pool: Arc<ThreadPool>,
    dedicated: Mutex<Vec<Arc<DedicatedWorker>>>,
    heartbeat: OnceLock<HeartbeatEngine>,
    keep_alive: Mutex<Option<KeepAlive>>,
}

impl ConcurrentRuntime {
    pub(crate) fn new(settings: ConcurrentSettings, pool: Arc<ThreadPool>) -> Self {
        Self {
            settings,
            pool,
            dedicated: Mutex::new(Vec::new()),
            heartbeat: OnceLock::new(),
            keep_alive: Mutex::new(None),
        }
    }

    pub(crate) fn settings(&self) -> &ConcurrentSettings {
        &self.settings
    }

    pub(crate) fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }

    pub(crate) fn register_dedicated(&self, worker: Arc<DedicatedWorker>) {
        self.dedicated.lock().push(worker);
    }

    pub(crate) fn register_heartbeat(&self, period: Duration, wire: OutputWire<Instant>) {
        self.heartbeat
            .get_or_init(HeartbeatEngine::new)
            .register(period, wire);
    }

    /// Starts dedicated threads in registration order, then the heartbeat
    /// and keep-alive threads.
    ///
    /// If any thread fails to spawn, the ones already running are stopped
    /// before the error is returned.
    pub(crate) fn start(&self) -> Result<()> {
        if let Err(e) = self.start_threads() {
            tracing::error!("concurrent runtime failed to start: {e}");
            self.stop();
            return Err(e);
        }
        tracing::info!(
            "concurrent runtime started: {} pool threads, {} dedicated",
            self.pool.current_num_threads(),
            self.dedicated.lock().len()
        );
        Ok(())
    }

    fn start_threads(&self) -> Result<()> {
        for worker in self.dedicated.lock().iter() {
            worker.start()?;
        }
        if let Some(heartbeat) = self.heartbeat.get() {
            heartbeat.start()?;
        }
        if self.settings.keep_alive {
            let (stop, stopped) = crossbeam_channel::bounded::<()>(1);
            let (exiting, exited) = crossbeam_channel::bounded::<()>(0);
            let handle = std::thread::Builder::new()
                .name("keep_alive".to_string())
                .spawn(move || {
                    let _exiting = exiting;
                    let _ = stopped.recv();
                })
                .map_err(|e| WiringError::ThreadSpawn {
                    name: "keep_alive".to_string(),
                    reason: e.to_string(),
                })?;
            *self.keep_alive.lock() = Some(KeepAlive {
                stop,
                exited,
                handle,
            });
        }
        Ok(())
    }

    /// Blocks until the keep-alive thread exits. Returns at once when there
    /// is none.
    pub(crate) fn join_keep_alive(&self) {
        let exited = self
            .keep_alive
            .lock()
            .as_ref()
            .map(|keep_alive| keep_alive.exited.clone());
        if let Some(exited) = exited {
            let _ = exited.recv();
        }
    }

    /// Stops the heartbeat first so no new work arrives, then dedicated
    /// threads in registration order, then the keep-alive thread.
    pub(crate) fn stop(&self) {
        if let Some(heartbeat) = self.heartbeat.get() {
            heartbeat.stop();
        }
        for worker in self.dedicated.lock().iter() {
            tracing::debug!("stopping dedicated scheduler {}", worker.name());
            worker.stop();
        }
        if let Some(keep_alive) = self.keep_alive.lock().take() {
            drop(keep_alive.stop);
            if keep_alive.handle.join().is_err() {
                tracing::error!("keep-alive thread panicked");
            }
        }
        tracing::info!("concurrent runtime stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = ConcurrentSettings::default();
        assert_eq!(settings.worker_threads, 0);
        assert_eq!(settings.health_monitor_period, Duration::from_millis(100));
        assert!(!settings.keep_alive);
    }

    #[test]
    fn pool_honors_thread_count() {
        let settings = ConcurrentSettings {
            worker_threads: 3,
            ..ConcurrentSettings::default()
        };
        assert_eq!(settings.build_pool().unwrap().current_num_threads(), 3);
    }

    #[test]
    fn keep_alive_thread_stops_with_runtime() {
        let settings = ConcurrentSettings {
            worker_threads: 1,
            keep_alive: true,
            ..ConcurrentSettings::default()
        };
        let pool = Arc::new(settings.build_pool().unwrap());
        let runtime = ConcurrentRuntime::new(settings, pool);
        runtime.start().unwrap();
        assert!(runtime.keep_alive.lock().is_some());
        runtime.stop();
        assert!(runtime.keep_alive.lock().is_none());
    }

    fn runtime_with_workers(names: &[&str]) -> (ConcurrentRuntime, Vec<Arc<DedicatedWorker>>) {
        let settings = ConcurrentSettings {
            worker_threads: 1,
            ..ConcurrentSettings::default()
        };
        let pool = Arc::new(settings.build_pool().unwrap());
        let runtime = ConcurrentRuntime::new(settings, pool);
        let workers: Vec<_> = names
            .iter()
            .map(|name| Arc::new(DedicatedWorker::new(name)))
            .collect();
        for worker in &workers {
            runtime.register_dedicated(Arc::clone(worker));
        }
        (runtime, workers)
    }

    #[test]
    fn dedicated_threads_start_in_registration_order() {
        let (runtime, workers) = runtime_with_workers(&["first", "second"]);
        let (tx, rx) = std::sync::mpsc::channel();
        let first = Arc::clone(&workers[0]);
        // Buffered until `second` starts; by then `first` must be running.
        assert!(workers[1].submit(Box::new(move || {
            tx.send(first.is_started()).unwrap();
        })));

        runtime.start().unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        runtime.stop();
    }

    #[test]
    fn dedicated_threads_stop_in_registration_order() {
        let (runtime, workers) = runtime_with_workers(&["first", "second"]);
        runtime.start().unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let first = Arc::clone(&workers[0]);
        // Keeps `second` busy until `first` has been stopped, or gives up.
        assert!(workers[1].submit(Box::new(move || {
            let deadline = Instant::now() + Duration::from_secs(2);
            while !first.is_closed() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(1));
            }
            tx.send(first.is_closed() && !first.is_started()).unwrap();
        })));

        runtime.stop();
        assert_eq!(rx.try_recv(), Ok(true));
        assert!(workers.iter().all(|w| w.is_closed() && !w.is_started()));
    }

    #[test]
    fn stop_after_partial_start_closes_every_worker() {
        let (runtime, workers) = runtime_with_workers(&["running", "pending"]);
        workers[0].start().unwrap();
        assert!(!workers[1].is_started());

        runtime.stop();
        assert!(workers.iter().all(|w| w.is_closed() && !w.is_started()));
        assert!(!workers[1].submit(Box::new(|| {})));
    }

    #[test]
    fn keep_alive_join_returns_once_stopped() {
        let settings = ConcurrentSettings {
            worker_threads: 1,
            keep_alive: true,
            ..ConcurrentSettings::default()
        };
        let pool = Arc::new(settings.build_pool().unwrap());
        let runtime = Arc::new(ConcurrentRuntime::new(settings, pool));
        runtime.start().unwrap();

        let started = Instant::now();
        let stopper = Arc::clone(&runtime);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            stopper.stop();
        });
        runtime.join_keep_alive();
        assert!(started.elapsed() >= Duration::from_millis(50));
        handle.join().unwrap();

        // Nothing left to wait for.
        runtime.join_keep_alive();
    }
}
