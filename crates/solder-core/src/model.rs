//! The wiring model: topology registration, lifecycle, and runtime selection.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rayon::ThreadPool;

use crate::analysis::{self, TopologyReport};
use crate::clock::SimulatedClock;
use crate::error::{Result, WiringError};
use crate::graph::{GraphModel, SchedulerType, SolderType, VertexOrigin, is_valid_name};
use crate::health::HealthMonitor;
use crate::runtime::concurrent::ConcurrentRuntime;
use crate::runtime::deterministic::DeterministicRuntime;
use crate::runtime::heartbeat::HEARTBEAT_VERTEX;
use crate::runtime::{ConcurrentSettings, Runtime};
use crate::scheduler::{SchedulerBuilder, TaskScheduler};
use crate::wire::OutputWire;

/// Name of the health monitor vertex.
pub const HEALTH_MONITOR_VERTEX: &str = "health_monitor";

/// Lifecycle state of a [`WiringModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelState {
    /// Topology may be registered.
    Configuring,
    /// Frozen and running.
    Started,
    /// Shut down. Terminal.
    Stopped,
}

impl ModelState {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuring => "configuring",
            Self::Started => "started",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Lifecycle {
    Configuring(Box<GraphModel>),
    Started,
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> ModelState {
        match self {
            Self::Configuring(_) => ModelState::Configuring,
            Self::Started => ModelState::Started,
            Self::Stopped => ModelState::Stopped,
        }
    }
}

/// Shared state behind every handle to one model.
pub(crate) struct ModelInner {
    lifecycle: Mutex<Lifecycle>,
    state_changed: Condvar,
    frozen: OnceLock<Arc<GraphModel>>,
    pub(crate) runtime: Runtime,
    pub(crate) health: Arc<HealthMonitor>,
    health_wire: OutputWire<Duration>,
}

impl ModelInner {
    fn new(weak: &Weak<Self>, graph: GraphModel, runtime: Runtime, log_interval: Duration) -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle::Configuring(Box::new(graph))),
            state_changed: Condvar::new(),
            frozen: OnceLock::new(),
            runtime,
            health: Arc::new(HealthMonitor::new(log_interval)),
            health_wire: OutputWire::new(HEALTH_MONITOR_VERTEX, weak.clone()),
        }
    }

    /// Runs `mutate` against the graph if the model is still configuring.
    pub(crate) fn mutate_graph<R>(
        &self,
        operation: &'static str,
        mutate: impl FnOnce(&mut GraphModel) -> Result<R>,
    ) -> Result<R> {
        let mut lifecycle = self.lifecycle.lock();
        match &mut *lifecycle {
            Lifecycle::Configuring(graph) => mutate(graph),
            other => Err(WiringError::IllegalState {
                operation,
                state: other.state(),
            }),
        }
    }

    fn state(&self) -> ModelState {
        self.lifecycle.lock().state()
    }
}

/// Resolves a wire's back-reference to its model.
pub(crate) fn upgrade(model: &Weak<ModelInner>, operation: &'static str) -> Result<Arc<ModelInner>> {
    model.upgrade().ok_or(WiringError::IllegalState {
        operation,
        state: ModelState::Stopped,
    })
}

/// Builds, verifies and runs a graph of scheduling units.
///
/// Cloning yields another handle to the same model.
///
/// # Lifecycle
///
/// 1. **Configuring**: build schedulers, input wires, heartbeats; solder wires
/// 2. [`start()`](Self::start): the graph is frozen and the topology checks
///    run once, logging every finding
/// 3. **Started**: data flows; the deterministic runtime needs [`tick()`](Self::tick)
/// 4. [`stop()`](Self::stop): threads are joined
///
/// Every topology mutation outside **Configuring** fails with
/// [`WiringError::IllegalState`].
#[derive(Clone)]
pub struct WiringModel {
    inner: Arc<ModelInner>,
}

impl WiringModel {
    /// Creates a concurrent model with its own worker pool.
    pub fn concurrent(settings: ConcurrentSettings) -> Result<Self> {
        let pool = Arc::new(settings.build_pool()?);
        Self::concurrent_with_pool(settings, pool)
    }

    /// Creates a concurrent model on an existing worker pool.
    ///
    /// A sequential `health_monitor` scheduler is wired to a heartbeat of
    /// `settings.health_monitor_period`; its output is
    /// [`health_monitor_wire()`](Self::health_monitor_wire).
    pub fn concurrent_with_pool(settings: ConcurrentSettings, pool: Arc<ThreadPool>) -> Result<Self> {
        let period = settings.health_monitor_period;
        let log_interval = settings.health_log_interval;
        let runtime = Runtime::Concurrent(ConcurrentRuntime::new(settings, pool));
        let model = Self {
            inner: Arc::new_cyclic(|weak| {
                ModelInner::new(weak, GraphModel::new(), runtime, log_interval)
            }),
        };
        model.wire_health_monitor(period)?;
        tracing::info!("concurrent wiring model created");
        Ok(model)
    }

    /// Creates a deterministic model driven by [`tick()`](Self::tick) and `clock`.
    pub fn deterministic(clock: Arc<SimulatedClock>) -> Self {
        let mut graph = GraphModel::new();
        graph.insert_vertex(
            HEALTH_MONITOR_VERTEX,
            SchedulerType::NoOp,
            false,
            VertexOrigin::Declared,
        );
        let runtime = Runtime::Deterministic(DeterministicRuntime::new(clock));
        tracing::info!("deterministic wiring model created");
        Self {
            inner: Arc::new_cyclic(|weak| ModelInner::new(weak, graph, runtime, Duration::MAX)),
        }
    }

    fn wire_health_monitor(&self, period: Duration) -> Result<()> {
        let monitor = Arc::clone(&self.inner.health);
        let scheduler: TaskScheduler<Duration> = self
            .new_scheduler_builder(HEALTH_MONITOR_VERTEX)?
            .with_type(SchedulerType::Sequential)
            .build_with_output(self.inner.health_wire.clone())?;
        let input = scheduler.build_input_wire::<Instant>("heartbeat")?;
        input.bind(move |now| Some(monitor.check_system_health(now)))?;
        self.build_heartbeat_wire(period)?
            .solder_to(&input, SolderType::Put)
    }

    // --- Topology building ---

    /// Starts configuring a scheduler named `name`.
    pub fn new_scheduler_builder<OUT: Clone + Send + 'static>(
        &self,
        name: &str,
    ) -> Result<SchedulerBuilder<OUT>> {
        let state = self.state();
        if state != ModelState::Configuring {
            return Err(WiringError::IllegalState {
                operation: "build a scheduler",
                state,
            });
        }
        if !is_valid_name(name) {
            return Err(WiringError::InvalidName(name.to_string()));
        }
        Ok(SchedulerBuilder::new(Arc::clone(&self.inner), name))
    }

    /// A wire carrying a timestamp every `period`.
    ///
    /// Concurrent heartbeats use wall time from one shared thread;
    /// deterministic heartbeats use the simulated clock and fire from
    /// [`tick()`](Self::tick).
    pub fn build_heartbeat_wire(&self, period: Duration) -> Result<OutputWire<Instant>> {
        if period.is_zero() {
            return Err(WiringError::InvalidHeartbeat(
                "period must be greater than zero".to_string(),
            ));
        }
        self.inner.mutate_graph("build a heartbeat", |graph| {
            if graph.vertex_by_name(HEARTBEAT_VERTEX).is_none() {
                graph.register_vertex(HEARTBEAT_VERTEX, SchedulerType::Sequential, false)?;
            }
            Ok(())
        })?;
        let wire = OutputWire::new(HEARTBEAT_VERTEX, Arc::downgrade(&self.inner));
        self.inner.runtime.register_heartbeat(period, wire.clone());
        tracing::debug!("heartbeat registered with period {period:?}");
        Ok(wire)
    }

    /// A wire carrying a timestamp `frequency` times per second.
    pub fn build_heartbeat_wire_frequency(&self, frequency: f64) -> Result<OutputWire<Instant>> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(WiringError::InvalidHeartbeat(format!(
                "frequency must be positive and finite, got {frequency}"
            )));
        }
        let period = Duration::try_from_secs_f64(1.0 / frequency)
            .map_err(|e| WiringError::InvalidHeartbeat(e.to_string()))?;
        self.build_heartbeat_wire(period)
    }

    /// The health monitor's output.
    ///
    /// Carries [`Duration::ZERO`] while all monitored schedulers are within
    /// their thresholds, otherwise how long the worst has been over. Never
    /// emits under the deterministic runtime.
    pub fn health_monitor_wire(&self) -> OutputWire<Duration> {
        self.inner.health_wire.clone()
    }

    /// Latest value the health monitor produced.
    pub fn unhealthy_duration(&self) -> Duration {
        self.inner.health.unhealthy_duration()
    }

    /// The health monitor itself.
    pub fn health_monitor(&self) -> Arc<HealthMonitor> {
        Arc::clone(&self.inner.health)
    }

    // --- Lifecycle ---

    /// Current lifecycle state.
    pub fn state(&self) -> ModelState {
        self.inner.state()
    }

    /// Which runtime this model was built with.
    pub fn runtime_name(&self) -> &'static str {
        self.inner.runtime.name()
    }

    /// Freezes the graph, runs the topology checks, and starts the runtime.
    ///
    /// Findings are logged, never fatal. Returns the report so callers can
    /// decide otherwise. If a runtime thread fails to spawn, the threads
    /// already running are stopped and the model is left
    /// [`Stopped`](ModelState::Stopped).
    pub fn start(&self) -> Result<TopologyReport> {
        let graph = {
            let mut lifecycle = self.inner.lifecycle.lock();
            let graph = match std::mem::replace(&mut *lifecycle, Lifecycle::Started) {
                Lifecycle::Configuring(graph) => Arc::new(*graph),
                previous => {
                    let state = previous.state();
                    *lifecycle = previous;
                    return Err(WiringError::IllegalState {
                        operation: "start",
                        state,
                    });
                }
            };
            let _ = self.inner.frozen.set(Arc::clone(&graph));
            self.inner.state_changed.notify_all();
            graph
        };

        tracing::info!(
            "wiring model starting: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        let report = analysis::run_checks(&graph);
        if let Err(e) = self.inner.runtime.start() {
            *self.inner.lifecycle.lock() = Lifecycle::Stopped;
            self.inner.state_changed.notify_all();
            return Err(e);
        }
        Ok(report)
    }

    /// Stops the runtime and joins its threads.
    pub fn stop(&self) -> Result<()> {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Started) {
                return Err(WiringError::IllegalState {
                    operation: "stop",
                    state: lifecycle.state(),
                });
            }
            *lifecycle = Lifecycle::Stopped;
        }
        self.inner.runtime.stop();
        self.inner.state_changed.notify_all();
        tracing::info!("wiring model stopped");
        Ok(())
    }

    /// Blocks until another handle calls [`stop()`](Self::stop).
    ///
    /// With `keep_alive` set this joins the keep-alive thread, so it returns
    /// only after the runtime's threads have been stopped.
    pub fn wait_for_stop(&self) {
        self.inner.runtime.join_keep_alive();
        let mut lifecycle = self.inner.lifecycle.lock();
        while !matches!(*lifecycle, Lifecycle::Stopped) {
            self.inner.state_changed.wait(&mut lifecycle);
        }
    }

    // --- Deterministic driving ---

    /// Runs one deterministic cycle.
    pub fn tick(&self) -> Result<()> {
        let Runtime::Deterministic(runtime) = &self.inner.runtime else {
            return Err(WiringError::UnsupportedOperation {
                operation: "tick",
                runtime: self.inner.runtime.name(),
            });
        };
        let state = self.state();
        if state != ModelState::Started {
            return Err(WiringError::IllegalState {
                operation: "tick",
                state,
            });
        }
        runtime.tick();
        Ok(())
    }

    /// Tasks waiting in the deterministic cycle buffers. Always 0 when concurrent.
    pub fn pending_work(&self) -> usize {
        match &self.inner.runtime {
            Runtime::Deterministic(runtime) => runtime.pending_work(),
            Runtime::Concurrent(_) => 0,
        }
    }

    /// The simulated clock of a deterministic model.
    pub fn clock(&self) -> Option<Arc<SimulatedClock>> {
        match &self.inner.runtime {
            Runtime::Deterministic(runtime) => Some(Arc::clone(runtime.clock())),
            Runtime::Concurrent(_) => None,
        }
    }

    // --- Inspection ---

    /// The frozen graph, once started.
    pub fn graph(&self) -> Option<Arc<GraphModel>> {
        self.inner.frozen.get().cloned()
    }

    /// Runs `inspect` against the graph in any state.
    ///
    /// While configuring this holds the model lock; `inspect` must not call
    /// back into the model.
    pub fn with_graph<R>(&self, inspect: impl FnOnce(&GraphModel) -> R) -> R {
        if let Some(graph) = self.inner.frozen.get() {
            return inspect(graph);
        }
        let lifecycle = self.inner.lifecycle.lock();
        match (&*lifecycle, self.inner.frozen.get()) {
            (Lifecycle::Configuring(graph), _) => inspect(graph),
            (_, Some(graph)) => inspect(graph),
            (_, None) => inspect(&GraphModel::new()),
        }
    }

    /// See [`analysis::check_for_cyclical_backpressure`].
    pub fn check_for_cyclical_backpressure(&self) -> bool {
        self.with_graph(analysis::check_for_cyclical_backpressure)
    }

    /// See [`analysis::check_for_illegal_direct_scheduler_usage`].
    pub fn check_for_illegal_direct_scheduler_usage(&self) -> bool {
        self.with_graph(analysis::check_for_illegal_direct_scheduler_usage)
    }

    /// See [`analysis::check_for_unbound_input_wires`].
    pub fn check_for_unbound_input_wires(&self) -> bool {
        self.with_graph(analysis::check_for_unbound_input_wires)
    }

    /// All findings, without logging.
    pub fn analyze(&self) -> TopologyReport {
        self.with_graph(analysis::analyze)
    }
}

impl fmt::Debug for WiringModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WiringModel")
            .field("runtime", &self.runtime_name())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> WiringModel {
        WiringModel::deterministic(Arc::new(SimulatedClock::new()))
    }

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(ModelState::Configuring.to_string(), "configuring");
        assert_eq!(ModelState::Started.to_string(), "started");
    }

    #[test]
    fn lifecycle_moves_forward_once() {
        let model = model();
        assert_eq!(model.state(), ModelState::Configuring);
        assert!(model.stop().unwrap_err().is_state_error());
        model.start().unwrap();
        assert_eq!(model.state(), ModelState::Started);
        assert!(model.start().unwrap_err().is_state_error());
        model.stop().unwrap();
        assert_eq!(model.state(), ModelState::Stopped);
        assert!(model.stop().unwrap_err().is_state_error());
    }

    #[test]
    fn graph_frozen_at_start() {
        let model = model();
        assert!(model.graph().is_none());
        model.start().unwrap();
        let graph = model.graph().unwrap();
        assert!(graph.vertex_by_name(HEALTH_MONITOR_VERTEX).is_some());
    }

    #[test]
    fn heartbeat_rejects_bad_periods() {
        let model = model();
        assert!(matches!(
            model.build_heartbeat_wire(Duration::ZERO),
            Err(WiringError::InvalidHeartbeat(_))
        ));
        for hz in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                model.build_heartbeat_wire_frequency(hz),
                Err(WiringError::InvalidHeartbeat(_))
            ));
        }
        assert!(model.build_heartbeat_wire_frequency(50.0).is_ok());
    }

    #[test]
    fn heartbeat_vertex_registered_once() {
        let model = model();
        model.build_heartbeat_wire(Duration::from_millis(1)).unwrap();
        model.build_heartbeat_wire(Duration::from_millis(2)).unwrap();
        let count = model.with_graph(|g| {
            g.vertices()
                .iter()
                .filter(|v| v.name() == HEARTBEAT_VERTEX)
                .count()
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn builder_rejects_invalid_names() {
        let model = model();
        assert!(matches!(
            model.new_scheduler_builder::<()>("bad name"),
            Err(WiringError::InvalidName(_))
        ));
    }

    #[test]
    fn tick_requires_started() {
        let model = model();
        assert!(model.tick().unwrap_err().is_state_error());
        model.start().unwrap();
        model.tick().unwrap();
        model.stop().unwrap();
        assert!(model.tick().unwrap_err().is_state_error());
    }
}
