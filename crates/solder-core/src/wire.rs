//! Typed wires between scheduling units.
//!
//! An [`OutputWire<T>`] fans a value out to every consumer soldered to it.
//! An [`InputWire<I, OUT>`] turns an inserted `I` into a task on its
//! scheduler, whose handler may produce an `OUT` for the scheduler's own
//! output wire. Payload types are checked by the compiler when soldering, so
//! the graph only ever records names.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use crate::error::Result;
use crate::graph::SolderType;
use crate::model::{ModelInner, upgrade};
use crate::scheduler::{Admission, SchedulerCore};

type Consumer<T> = Arc<dyn Fn(T) + Send + Sync>;
type Handler<I, OUT> = Arc<dyn Fn(I) -> Option<OUT> + Send + Sync>;

/// Label used for edges into terminal consumers.
const CONSUMER_LABEL: &str = "consume";

/// A fan-out point owned by one vertex.
pub struct OutputWire<T> {
    origin: Arc<str>,
    consumers: Arc<RwLock<Vec<Consumer<T>>>>,
    model: Weak<ModelInner>,
}

impl<T> Clone for OutputWire<T> {
    fn clone(&self) -> Self {
        Self {
            origin: Arc::clone(&self.origin),
            consumers: Arc::clone(&self.consumers),
            model: self.model.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> OutputWire<T> {
    pub(crate) fn new(origin: &str, model: Weak<ModelInner>) -> Self {
        Self {
            origin: Arc::from(origin),
            consumers: Arc::new(RwLock::new(Vec::new())),
            model,
        }
    }

    /// Name of the vertex this wire leaves.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Number of soldered consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumers.read().len()
    }

    /// Connects this wire to `input` and records the edge.
    ///
    /// Several solders from one wire into one input are rejected as a
    /// duplicate edge.
    pub fn solder_to<OUT>(&self, input: &InputWire<T, OUT>, solder_type: SolderType) -> Result<()>
    where
        OUT: Clone + Send + 'static,
    {
        let model = upgrade(&self.model, "solder a wire")?;
        model.mutate_graph("solder a wire", |graph| {
            graph.register_edge(&self.origin, input.scheduler_name(), input.name(), solder_type)
        })?;

        let input = input.clone();
        let admission = match solder_type {
            SolderType::Put => Admission::Put,
            SolderType::Offer => Admission::Offer,
            SolderType::Inject => Admission::Inject,
        };
        self.consumers.write().push(Arc::new(move |data: T| {
            input.insert(admission, data);
        }));
        Ok(())
    }

    /// Connects this wire to a terminal consumer called on the forwarding thread.
    ///
    /// The consumer appears in the graph as a synthesized DIRECT vertex named
    /// `name`.
    pub fn solder_consumer<F>(&self, name: &str, consumer: F) -> Result<()>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let model = upgrade(&self.model, "solder a consumer")?;
        model.mutate_graph("solder a consumer", |graph| {
            graph.register_edge(&self.origin, name, CONSUMER_LABEL, SolderType::Put)
        })?;
        self.consumers.write().push(Arc::new(consumer));
        Ok(())
    }

    /// Sends `data` to every consumer in solder order.
    pub fn forward(&self, data: T) {
        let consumers = self.consumers.read().clone();
        let Some((last, rest)) = consumers.split_last() else {
            return;
        };
        for consumer in rest {
            consumer(data.clone());
        }
        last(data);
    }
}

/// A named input on a scheduler, accepting `I`.
pub struct InputWire<I, OUT> {
    scheduler: Arc<SchedulerCore<OUT>>,
    name: Arc<str>,
    handler: Arc<OnceLock<Handler<I, OUT>>>,
    model: Weak<ModelInner>,
}

impl<T> std::fmt::Debug for OutputWire<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputWire")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl<I, OUT> std::fmt::Debug for InputWire<I, OUT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputWire")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<I, OUT> Clone for InputWire<I, OUT> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            name: Arc::clone(&self.name),
            handler: Arc::clone(&self.handler),
            model: self.model.clone(),
        }
    }
}

impl<I: Send + 'static, OUT: Clone + Send + 'static> InputWire<I, OUT> {
    pub(crate) fn new(
        scheduler: Arc<SchedulerCore<OUT>>,
        name: &str,
        model: Weak<ModelInner>,
    ) -> Self {
        Self {
            scheduler,
            name: Arc::from(name),
            handler: Arc::new(OnceLock::new()),
            model,
        }
    }

    /// Input name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning scheduler.
    pub fn scheduler_name(&self) -> &str {
        self.scheduler.name()
    }

    /// Whether a handler has been bound.
    pub fn is_bound(&self) -> bool {
        self.handler.get().is_some()
    }

    /// Binds a handler whose `Some` results go to the scheduler's output wire.
    pub fn bind<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(I) -> Option<OUT> + Send + Sync + 'static,
    {
        let model = upgrade(&self.model, "bind an input wire")?;
        model.mutate_graph("bind an input wire", |graph| {
            graph.register_input_wire_bound(self.scheduler.name(), &self.name)
        })?;
        // The registry rejects a second bind, so the cell is still empty.
        let _ = self.handler.set(Arc::new(handler));
        Ok(())
    }

    /// Binds a handler that produces no output.
    pub fn bind_consumer<F>(&self, consumer: F) -> Result<()>
    where
        F: Fn(I) + Send + Sync + 'static,
    {
        self.bind(move |data| {
            consumer(data);
            None
        })
    }

    /// Inserts `data`, waiting while the scheduler is at capacity.
    ///
    /// Only the concurrent runtime waits; the deterministic runtime accepts
    /// immediately.
    pub fn put(&self, data: I) {
        self.insert(Admission::Put, data);
    }

    /// Inserts `data` unless the scheduler is at capacity.
    pub fn offer(&self, data: I) -> bool {
        self.insert(Admission::Offer, data)
    }

    /// Inserts `data` regardless of capacity.
    pub fn inject(&self, data: I) {
        self.insert(Admission::Inject, data);
    }

    fn insert(&self, admission: Admission, data: I) -> bool {
        let Some(handler) = self.handler.get() else {
            tracing::warn!(
                "data arrived at unbound input wire {}.{}, dropped",
                self.scheduler.name(),
                self.name
            );
            return false;
        };
        let handler = Arc::clone(handler);
        self.scheduler.accept(admission, move || handler(data))
    }
}
