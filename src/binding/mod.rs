//! Prototypes and the live root bindings cloned from them.
//!
//! A [`Prototype`] owns a compiled graph and is never mutated. Each call to
//! [`Prototype::clone_binding`] produces an independent [`RootBinding`] with
//! its own copy of every node (shared subexpressions stay shared within the
//! copy). A root binding is `Unbound` until [`RootBinding::bind`], reports
//! result changes to its observers while bound, and returns to `Unbound` on
//! [`RootBinding::unbind`].

use crate::analysis::telemetry::TelemetryReport;
use crate::compute::compiler::{CompiledGraph, Compiler};
use crate::compute::engine::{GraphState, MemberSink};
use crate::compute::ledger::{MaybeResult, ResultChange};
use crate::display::{dot, trace};
use crate::error::CompileError;
use crate::expr::Lambda;
use crate::store::{BindingMode, NodeId, Value, ValueType};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// An immutable compiled graph from which live bindings are cloned.
#[derive(Clone)]
pub struct Prototype {
    graph: Rc<CompiledGraph>,
    lambda: Lambda,
}

impl Prototype {
    pub fn compile(lambda: &Lambda) -> Result<Self, CompileError> {
        let graph = Compiler::new(lambda).compile()?;
        Ok(Self { graph: Rc::new(graph), lambda: lambda.clone() })
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    pub fn result_type(&self) -> &ValueType {
        self.lambda.result_type()
    }

    /// A new, unbound live instance of this graph.
    pub fn clone_binding(&self, mode: BindingMode) -> RootBinding {
        let cell = Rc::new_cyclic(|weak: &Weak<BindingCell>| {
            let sink: Weak<dyn MemberSink> = weak.clone();
            BindingCell {
                state: RefCell::new(GraphState::adopt(&self.graph, mode, sink)),
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(0),
                outbox: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
            }
        });
        RootBinding { cell }
    }

    /// Binds a one-time instance to `graph`, reads the result, and unbinds.
    pub fn evaluate_once(&self, graph: impl Into<Value>) -> MaybeResult {
        self.evaluator()(graph.into())
    }

    /// A reusable single-shot evaluator backed by one one-time binding.
    pub fn evaluator(&self) -> impl Fn(Value) -> MaybeResult {
        let binding = self.clone_binding(BindingMode::OneTime);
        move |graph: Value| {
            binding.bind(graph);
            let result = binding.result();
            binding.unbind();
            result
        }
    }

    pub fn telemetry(&self) -> TelemetryReport {
        TelemetryReport::analyze(&self.graph.registry, self.graph.parameter, self.graph.body)
    }

    /// Graphviz rendering of the node graph.
    pub fn to_dot(&self) -> String {
        dot::to_dot(&self.graph.registry)
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("lambda", &self.lambda)
            .field("nodes", &self.graph.registry.count())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

pub type ResultHandler = Rc<dyn Fn(&ResultChange)>;

struct BindingCell {
    state: RefCell<GraphState>,
    observers: RefCell<Vec<(ObserverId, ResultHandler)>>,
    next_observer: Cell<u64>,

    // Root changes awaiting delivery, oldest first
    outbox: RefCell<VecDeque<ResultChange>>,
    delivering: Cell<bool>,
}

impl BindingCell {
    /// Runs `f` against the graph state, then delivers the root changes it
    /// produced. Observers run after the state borrow is released, so they
    /// may call back into the binding; changes raised by such a call are
    /// queued behind the ones still being delivered.
    fn with_state(&self, what: &str, f: impl FnOnce(&mut GraphState)) {
        match self.state.try_borrow_mut() {
            Ok(mut state) => {
                f(&mut *state);
                self.outbox.borrow_mut().extend(state.take_pending());
            }
            Err(_) => {
                log::warn!("{} ignored: binding is mid-propagation", what);
                return;
            }
        }
        if !self.delivering.replace(true) {
            self.deliver();
            self.delivering.set(false);
        }
    }

    fn deliver(&self) {
        loop {
            // The outbox borrow ends with this statement, before any handler runs.
            let Some(change) = self.outbox.borrow_mut().pop_front() else { break };
            let observers: Vec<ResultHandler> = self.observers.borrow().iter().map(|(_, h)| Rc::clone(h)).collect();
            for handler in observers {
                handler(&change);
            }
        }
    }
}

impl MemberSink for BindingCell {
    fn member_changed(&self, node: NodeId) {
        self.with_state("member notification", |state| state.member_changed(node));
    }
}

/// A bindable, live instance of a compiled expression.
pub struct RootBinding {
    cell: Rc<BindingCell>,
}

impl RootBinding {
    /// Attaches `graph`, recomputes everything, and emits at most one change.
    /// Binding while bound rebinds: subscriptions move to the new graph.
    pub fn bind(&self, graph: impl Into<Value>) {
        let graph = graph.into();
        self.cell.with_state("bind", |state| state.bind(graph));
    }

    /// Detaches the bound graph and every subscription. Safe to call
    /// repeatedly and from inside a result-change handler.
    pub fn unbind(&self) {
        self.cell.with_state("unbind", GraphState::unbind);
    }

    pub fn result(&self) -> MaybeResult {
        self.cell.state.borrow().result().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.cell.state.borrow().is_bound()
    }

    pub fn mode(&self) -> BindingMode {
        self.cell.state.borrow().mode()
    }

    /// Number of change subscriptions currently held on bound objects.
    pub fn watch_count(&self) -> usize {
        self.cell.state.borrow().watch_count()
    }

    pub fn subscribe(&self, handler: impl Fn(&ResultChange) + 'static) -> ObserverId {
        let id = ObserverId(self.cell.next_observer.get());
        self.cell.next_observer.set(id.0 + 1);
        self.cell.observers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.cell.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(k, _)| *k != id);
        observers.len() != before
    }

    /// Tree rendering of the live graph with every node's current result.
    pub fn trace(&self) -> String {
        let state = self.cell.state.borrow();
        trace::format_trace(state.registry(), state.ledger(), state.body())
    }

    pub fn telemetry(&self) -> TelemetryReport {
        let state = self.cell.state.borrow();
        TelemetryReport::analyze(state.registry(), state.parameter(), state.body())
    }

    pub fn node_count(&self) -> usize {
        self.cell.state.borrow().registry().count()
    }
}

impl fmt::Debug for RootBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.state.try_borrow() {
            Ok(state) => f
                .debug_struct("RootBinding")
                .field("bound", &state.is_bound())
                .field("result", state.result())
                .field("watches", &state.watch_count())
                .finish(),
            Err(_) => f.write_str("RootBinding { <propagating> }"),
        }
    }
}
