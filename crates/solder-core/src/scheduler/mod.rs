//! Scheduling units.
//!
//! A [`TaskScheduler`] is one vertex of the wiring graph. It owns input
//! wires, an [`OutputWire`] for whatever its handlers return, a counter of
//! unprocessed tasks, and a dispatcher chosen from its [`SchedulerType`] and
//! the model's runtime:
//!
//! | Type | Concurrent runtime | Deterministic runtime |
//! |------|--------------------|-----------------------|
//! | `SEQUENTIAL` | FIFO drained on a pool | next cycle |
//! | `DEDICATED_THREAD` | FIFO on its own thread | next cycle |
//! | `CONCURRENT` | unordered on a pool | next cycle |
//! | `DIRECT`, `DIRECT_THREADSAFE` | inline on the caller | inline on the caller |
//! | `NO_OP` | discarded | discarded |
//!
//! Build one with [`WiringModel::new_scheduler_builder`](crate::WiringModel::new_scheduler_builder).

mod counter;
pub(crate) mod dispatch;

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use rayon::ThreadPool;

use crate::error::{Result, WiringError};
use crate::graph::{SchedulerType, is_valid_name};
use crate::model::{ModelInner, upgrade};
use crate::wire::{InputWire, OutputWire};

pub(crate) use counter::TaskCounter;
use dispatch::Dispatcher;

/// How an insertion treats the destination's capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Wait for capacity.
    Put,
    /// Reject at capacity.
    Offer,
    /// Ignore capacity.
    Inject,
}

/// Runtime side of a scheduler, shared by its wires and tasks.
pub(crate) struct SchedulerCore<OUT> {
    name: String,
    scheduler_type: SchedulerType,
    insertion_blocking: bool,
    capacity: Option<usize>,
    counter: Arc<TaskCounter>,
    dispatcher: Dispatcher,
    output: OutputWire<OUT>,
}

impl<OUT: Clone + Send + 'static> SchedulerCore<OUT> {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Counts and dispatches `work`, forwarding its result to the output wire.
    ///
    /// Returns false when an OFFER found the scheduler full or the scheduler's
    /// thread has stopped.
    pub(crate) fn accept<F>(self: &Arc<Self>, admission: Admission, work: F) -> bool
    where
        F: FnOnce() -> Option<OUT> + Send + 'static,
    {
        if self.dispatcher.discards() {
            return true;
        }
        if self.dispatcher.is_closed() {
            self.warn_closed();
            return false;
        }

        match (admission, self.capacity) {
            (Admission::Put, Some(capacity)) if self.dispatcher.may_block() => {
                self.counter.on_ramp(capacity);
            }
            (Admission::Offer, capacity) => {
                if !self.counter.attempt_on_ramp(capacity) {
                    return false;
                }
            }
            _ => self.counter.force_on_ramp(),
        }

        let core = Arc::clone(self);
        let dispatched = self.dispatcher.dispatch(Box::new(move || {
            if let Some(result) = work() {
                core.output.forward(result);
            }
            core.counter.off_ramp();
        }));
        if !dispatched {
            // Closed while this insertion waited for capacity.
            self.counter.off_ramp();
            self.warn_closed();
        }
        dispatched
    }

    fn warn_closed(&self) {
        tracing::warn!("data arrived at stopped scheduler {}, dropped", self.name);
    }
}

/// A scheduling unit whose handlers produce `OUT`.
pub struct TaskScheduler<OUT> {
    core: Arc<SchedulerCore<OUT>>,
    model: Weak<ModelInner>,
}

impl<OUT> Clone for TaskScheduler<OUT> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            model: self.model.clone(),
        }
    }
}

impl<OUT: Clone + Send + 'static> TaskScheduler<OUT> {
    /// Vertex name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Execution strategy.
    pub fn scheduler_type(&self) -> SchedulerType {
        self.core.scheduler_type
    }

    /// Whether a PUT into this scheduler can wait.
    pub fn is_insertion_blocking(&self) -> bool {
        self.core.insertion_blocking
    }

    /// Accepted tasks whose handler has not returned yet.
    pub fn unprocessed_task_count(&self) -> usize {
        self.core.counter.count()
    }

    /// Wire carrying every non-`None` handler result.
    pub fn output_wire(&self) -> OutputWire<OUT> {
        self.core.output.clone()
    }

    /// Declares an input named `name` that accepts `I`.
    ///
    /// The input must be bound with [`InputWire::bind`] or
    /// [`InputWire::bind_consumer`] before the model starts, or the
    /// unbound-input check reports it.
    pub fn build_input_wire<I: Send + 'static>(&self, name: &str) -> Result<InputWire<I, OUT>> {
        if !is_valid_name(name) {
            return Err(WiringError::InvalidName(name.to_string()));
        }
        let model = upgrade(&self.model, "build an input wire")?;
        model.mutate_graph("build an input wire", |graph| {
            graph.register_input_wire_created(&self.core.name, name)
        })?;
        Ok(InputWire::new(
            Arc::clone(&self.core),
            name,
            self.model.clone(),
        ))
    }
}

/// Configures and registers a [`TaskScheduler`].
///
/// ```ignore
/// let scheduler: TaskScheduler<u64> = model
///     .new_scheduler_builder("event_hasher")?
///     .with_type(SchedulerType::Concurrent)
///     .with_unhandled_task_capacity(500)
///     .build()?;
/// ```
#[must_use]
pub struct SchedulerBuilder<OUT> {
    model: Arc<ModelInner>,
    name: String,
    scheduler_type: SchedulerType,
    capacity: Option<usize>,
    external_back_pressure: bool,
    health_threshold: Option<usize>,
    pool: Option<Arc<ThreadPool>>,
    _output: PhantomData<fn() -> OUT>,
}

impl<OUT> std::fmt::Debug for SchedulerBuilder<OUT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("name", &self.name)
            .field("scheduler_type", &self.scheduler_type)
            .field("capacity", &self.capacity)
            .field("external_back_pressure", &self.external_back_pressure)
            .field("health_threshold", &self.health_threshold)
            .finish_non_exhaustive()
    }
}

impl<OUT: Clone + Send + 'static> SchedulerBuilder<OUT> {
    pub(crate) fn new(model: Arc<ModelInner>, name: &str) -> Self {
        Self {
            model,
            name: name.to_string(),
            scheduler_type: SchedulerType::Sequential,
            capacity: None,
            external_back_pressure: false,
            health_threshold: None,
            pool: None,
            _output: PhantomData,
        }
    }

    /// Sets the execution strategy. Defaults to `SEQUENTIAL`.
    pub fn with_type(mut self, scheduler_type: SchedulerType) -> Self {
        self.scheduler_type = scheduler_type;
        self
    }

    /// Bounds the number of unprocessed tasks. Values below 1 are treated as 1.
    ///
    /// A bounded scheduler is insertion-blocking: PUT waits for room.
    pub fn with_unhandled_task_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    /// Marks insertion as blocking even without a capacity.
    pub fn with_external_back_pressure(mut self, enabled: bool) -> Self {
        self.external_back_pressure = enabled;
        self
    }

    /// Unprocessed count above which the health monitor considers this unit
    /// unhealthy. Defaults to the capacity.
    pub fn with_health_threshold(mut self, threshold: usize) -> Self {
        self.health_threshold = Some(threshold);
        self
    }

    /// Runs this unit on `pool` instead of the model's shared pool.
    ///
    /// Only `SEQUENTIAL` and `CONCURRENT` units use a pool.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Registers the vertex and returns the scheduler.
    pub fn build(self) -> Result<TaskScheduler<OUT>> {
        let output = OutputWire::new(&self.name, Arc::downgrade(&self.model));
        self.build_with_output(output)
    }

    pub(crate) fn build_with_output(self, output: OutputWire<OUT>) -> Result<TaskScheduler<OUT>> {
        let insertion_blocking = self.capacity.is_some() || self.external_back_pressure;
        self.model.mutate_graph("build a scheduler", |graph| {
            graph.register_vertex(&self.name, self.scheduler_type, insertion_blocking)
        })?;

        let dispatcher = self
            .model
            .runtime
            .dispatcher(&self.name, self.scheduler_type, self.pool);
        let counter = Arc::new(TaskCounter::new());

        let threshold = self
            .health_threshold
            .or(self.capacity)
            .or(self.model.runtime.default_health_threshold());
        if let Some(threshold) = threshold
            && self.model.runtime.monitors_health()
        {
            self.model
                .health
                .register(&self.name, Arc::clone(&counter), threshold);
        }

        tracing::debug!(
            "scheduler {} built: {} capacity={:?} blocking={}",
            self.name,
            self.scheduler_type,
            self.capacity,
            insertion_blocking
        );

        Ok(TaskScheduler {
            core: Arc::new(SchedulerCore {
                name: self.name,
                scheduler_type: self.scheduler_type,
                insertion_blocking,
                capacity: self.capacity,
                counter,
                dispatcher,
                output,
            }),
            model: Arc::downgrade(&self.model),
        })
    }
}
