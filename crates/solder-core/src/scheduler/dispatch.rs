//! Task execution strategies, one per scheduler type and runtime.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rayon::ThreadPool;

use crate::error::{Result, WiringError};
use crate::runtime::deterministic::WorkBuffers;

/// A unit of scheduled work.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Where a scheduler's accepted tasks run.
pub(crate) enum Dispatcher {
    /// On the inserting thread.
    Inline,
    /// Nowhere. Data is dropped before it is counted.
    Discard,
    /// Unordered, on a worker pool.
    Pool(Arc<ThreadPool>),
    /// FIFO, one at a time, on a worker pool.
    Sequential(Arc<SequentialQueue>),
    /// FIFO, on a thread owned by this scheduler.
    Dedicated(Arc<DedicatedWorker>),
    /// Into the next deterministic cycle.
    Deferred(Arc<WorkBuffers>),
}

impl Dispatcher {
    /// Hands `task` off. Returns false, dropping the task, when the
    /// dispatcher is closed.
    pub(crate) fn dispatch(&self, task: Task) -> bool {
        match self {
            Self::Inline => task(),
            Self::Discard => drop(task),
            Self::Pool(pool) => pool.spawn(task),
            Self::Sequential(queue) => queue.submit(task),
            Self::Dedicated(worker) => return worker.submit(task),
            Self::Deferred(buffers) => buffers.submit_work(task),
        }
        true
    }

    /// Whether the thread behind this dispatcher has been stopped.
    pub(crate) fn is_closed(&self) -> bool {
        matches!(self, Self::Dedicated(worker) if worker.is_closed())
    }

    /// Whether a PUT may wait for capacity.
    pub(crate) fn may_block(&self) -> bool {
        !matches!(self, Self::Deferred(_) | Self::Discard)
    }

    pub(crate) fn discards(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

// --- Sequential ---

#[derive(Default)]
struct SequentialState {
    tasks: VecDeque<Task>,
    draining: bool,
}

/// A FIFO queue drained by at most one pool thread at a time.
pub(crate) struct SequentialQueue {
    pool: Arc<ThreadPool>,
    state: Mutex<SequentialState>,
}

impl SequentialQueue {
    pub(crate) fn new(pool: Arc<ThreadPool>) -> Self {
        Self {
            pool,
            state: Mutex::new(SequentialState::default()),
        }
    }

    fn submit(self: &Arc<Self>, task: Task) {
        let mut state = self.state.lock();
        state.tasks.push_back(task);
        if state.draining {
            return;
        }
        state.draining = true;
        drop(state);

        let queue = Arc::clone(self);
        self.pool.spawn(move || queue.drain());
    }

    fn drain(&self) {
        loop {
            let task = {
                let mut state = self.state.lock();
                match state.tasks.pop_front() {
                    Some(task) => task,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            task();
        }
    }
}

// --- Dedicated thread ---

enum WorkerMessage {
    Task(Task),
    Shutdown,
}

/// A scheduler-owned thread fed through an unbounded channel.
///
/// Tasks submitted before [`start`](Self::start) are buffered in the channel.
/// Once [`stop`](Self::stop) begins the worker is closed and rejects tasks.
pub(crate) struct DedicatedWorker {
    name: String,
    sender: Sender<WorkerMessage>,
    receiver: Receiver<WorkerMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
    // Guards the send so no task lands behind the shutdown message.
    closed: Mutex<bool>,
}

impl DedicatedWorker {
    pub(crate) fn new(name: &str) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            name: name.to_string(),
            sender,
            receiver,
            handle: Mutex::new(None),
            closed: Mutex::new(false),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub(crate) fn is_started(&self) -> bool {
        self.handle.lock().is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    pub(crate) fn submit(&self, task: Task) -> bool {
        let closed = self.closed.lock();
        if *closed {
            return false;
        }
        // Unbounded, so only fails once the receiver is gone.
        self.sender.send(WorkerMessage::Task(task)).is_ok()
    }

    pub(crate) fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock();
        if handle.is_some() || self.is_closed() {
            return Ok(());
        }
        let receiver = self.receiver.clone();
        let spawned = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                while let Ok(WorkerMessage::Task(task)) = receiver.recv() {
                    task();
                }
            })
            .map_err(|e| WiringError::ThreadSpawn {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;
        *handle = Some(spawned);
        tracing::debug!("dedicated scheduler {} started", self.name);
        Ok(())
    }

    /// Closes the worker, finishes queued tasks, then joins the thread.
    ///
    /// Tasks buffered by a worker that never started are dropped.
    pub(crate) fn stop(&self) {
        {
            let mut closed = self.closed.lock();
            if *closed {
                return;
            }
            *closed = true;
            let _ = self.sender.send(WorkerMessage::Shutdown);
        }
        let Some(handle) = self.handle.lock().take() else {
            let dropped = self.receiver.try_iter().count().saturating_sub(1);
            if dropped > 0 {
                tracing::warn!(
                    "dedicated scheduler {} never started, {} tasks dropped",
                    self.name,
                    dropped
                );
            }
            return;
        };
        if handle.join().is_err() {
            tracing::error!("dedicated scheduler {} panicked", self.name);
        }
        tracing::debug!("dedicated scheduler {} stopped", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn pool(threads: usize) -> Arc<ThreadPool> {
        Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn sequential_queue_preserves_order() {
        let queue = Arc::new(SequentialQueue::new(pool(4)));
        let (tx, rx) = mpsc::channel();
        for i in 0..200 {
            let tx = tx.clone();
            queue.submit(Box::new(move || tx.send(i).unwrap()));
        }
        drop(tx);
        let seen: Vec<i32> = rx.iter().collect();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn dedicated_worker_buffers_until_started() {
        let worker = DedicatedWorker::new("worker");
        let (tx, rx) = mpsc::channel();
        for i in 0..10 {
            let tx = tx.clone();
            worker.submit(Box::new(move || tx.send(i).unwrap()));
        }
        assert!(rx.try_recv().is_err());

        worker.start().unwrap();
        worker.stop();
        drop(tx);
        let seen: Vec<i32> = rx.iter().collect();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn dedicated_worker_runs_on_named_thread() {
        let worker = DedicatedWorker::new("named_worker");
        let (tx, rx) = mpsc::channel();
        worker.submit(Box::new(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }));
        worker.start().unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("named_worker"));
        worker.stop();
    }

    #[test]
    fn stopped_worker_rejects_tasks() {
        let worker = Arc::new(DedicatedWorker::new("closing"));
        worker.start().unwrap();
        assert!(worker.submit(Box::new(|| {})));
        worker.stop();
        assert!(worker.is_closed());
        assert!(!worker.is_started());
        assert!(!worker.submit(Box::new(|| {})));

        let dispatcher = Dispatcher::Dedicated(Arc::clone(&worker));
        assert!(dispatcher.is_closed());
        assert!(!dispatcher.dispatch(Box::new(|| {})));
    }

    #[test]
    fn stopped_worker_does_not_restart() {
        let worker = DedicatedWorker::new("once");
        worker.stop();
        worker.start().unwrap();
        assert!(!worker.is_started());
    }

    #[test]
    fn inline_runs_immediately() {
        let (tx, rx) = mpsc::channel();
        assert!(Dispatcher::Inline.dispatch(Box::new(move || tx.send(1).unwrap())));
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(!Dispatcher::Inline.is_closed());
    }
}
