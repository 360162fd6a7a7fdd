//! Live evaluation state of one bound graph.
//!
//! Propagation is eager: a node whose result changes marks its subscribers
//! dirty, and each of those passes the change on only if its own result
//! changed under its equality policy. Dirty nodes are recomputed in id
//! order, so a diamond settles without intermediate results.

use super::compiler::CompiledGraph;
use super::ledger::{logical_and, logical_or, Ledger, MaybeResult, ResultChange};
use crate::store::object::concerns;
use crate::store::{BindingMode, CloneContext, NodeId, NodeKind, ObjectRef, Registry, Subscription, Value};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};

/// Receives member-change notifications routed from bound objects.
pub trait MemberSink {
    fn member_changed(&self, node: NodeId);
}

pub struct GraphState {
    registry: Registry,
    ledger: Ledger,
    parameter: NodeId,
    body: NodeId,
    mode: BindingMode,
    bound: bool,

    // Root result, settled separately from the body during bind/unbind
    root: MaybeResult,
    in_transition: bool,
    pending: Vec<ResultChange>,

    watches: HashMap<NodeId, Subscription>,
    sink: Weak<dyn MemberSink>,
}

impl GraphState {
    /// Clones `prototype` into a fresh, unbound state and evaluates it once.
    pub fn adopt(prototype: &CompiledGraph, mode: BindingMode, sink: Weak<dyn MemberSink>) -> Self {
        let mut registry = Registry::new();
        let mut ctx = CloneContext::new(mode);
        let parameter = ctx.clone_node(&prototype.registry, &mut registry, prototype.parameter);
        let body = ctx.clone_node(&prototype.registry, &mut registry, prototype.body);
        log::debug!("cloned {} nodes ({:?} mode)", ctx.len(), mode);

        let mut state = Self {
            ledger: Ledger::new(),
            registry,
            parameter,
            body,
            mode,
            bound: false,
            root: MaybeResult::none(),
            in_transition: false,
            pending: Vec::new(),
            watches: HashMap::new(),
            sink,
        };

        // Ids ascend children-first, so one pass settles every node.
        state.ledger.ensure_capacity(state.registry.count());
        for id in state.registry.ids() {
            let value = state.evaluate(id);
            state.ledger.insert(id, value);
        }
        state
    }

    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn ledger(&self) -> &Ledger { &self.ledger }
    pub fn parameter(&self) -> NodeId { self.parameter }
    pub fn body(&self) -> NodeId { self.body }
    pub fn mode(&self) -> BindingMode { self.mode }
    pub fn is_bound(&self) -> bool { self.bound }
    pub fn result(&self) -> &MaybeResult { &self.root }

    /// Number of live subscriptions on external objects.
    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    pub fn bind(&mut self, graph: Value) {
        log::debug!("binding to {}", graph);
        self.bound = true;
        self.in_transition = true;
        self.ledger.insert(self.parameter, MaybeResult::some(graph));

        // Every observing member is re-read so that members rooted at
        // constants pick up their subscriptions too.
        let mut dirty: BTreeSet<NodeId> = self.registry.get_subscribers(self.parameter).iter().copied().collect();
        dirty.extend(self.registry.ids().filter(|&id| self.registry.kind(id).observes()));
        self.propagate(dirty);

        self.in_transition = false;
        let body = self.ledger.get(self.body).clone();
        self.settle_root(body);
    }

    /// Idempotent. Severs every subscription before clearing the parameter.
    pub fn unbind(&mut self) {
        if self.bound {
            log::debug!("unbinding ({} subscriptions)", self.watches.len());
        }
        self.bound = false;
        self.watches.clear();
        self.in_transition = true;
        self.ledger.insert(self.parameter, MaybeResult::none());
        self.propagate(self.registry.get_subscribers(self.parameter).iter().copied().collect());
        self.in_transition = false;
        self.settle_root(MaybeResult::none());
    }

    /// A bound object reported a change to the member read by `node`.
    pub fn member_changed(&mut self, node: NodeId) {
        if !self.bound {
            return;
        }
        self.propagate(BTreeSet::from([node]));
    }

    /// Root changes accumulated since the last call.
    pub fn take_pending(&mut self) -> Vec<ResultChange> {
        std::mem::take(&mut self.pending)
    }

    fn settle_root(&mut self, target: MaybeResult) {
        let policy = self.registry.policy(self.body);
        if self.root.same_as(&target, policy) {
            return;
        }
        let old = std::mem::replace(&mut self.root, target);
        self.pending.push(ResultChange { old, new: self.root.clone() });
    }

    /// Recomputes `dirty` and everything downstream of an accepted change.
    ///
    /// Ids ascend children-first, so taking the smallest dirty id each time
    /// evaluates every node once, after all of its inputs have settled.
    fn propagate(&mut self, mut dirty: BTreeSet<NodeId>) {
        while let Some(id) = dirty.pop_first() {
            // A member access follows its target before re-reading it.
            self.rewatch(id);
            let value = self.evaluate(id);
            if self.accept(id, value) {
                dirty.extend(self.registry.get_subscribers(id).iter().copied());
            }
        }
        if !self.in_transition {
            let body = self.ledger.get(self.body).clone();
            self.settle_root(body);
        }
    }

    /// Stores `value` if it differs from the current result under the node's
    /// policy.
    fn accept(&mut self, id: NodeId, value: MaybeResult) -> bool {
        let policy = self.registry.policy(id);
        if self.ledger.get(id).same_as(&value, policy) {
            log::trace!("{} `{}`: unchanged", id.0, self.registry.meta[id.index()].source);
            return false;
        }
        let old = self.ledger.insert(id, value);
        log::trace!("{} `{}`: {} -> {}", id.0, self.registry.meta[id.index()].source, old, self.ledger.get(id));
        true
    }

    /// Moves the subscription of member access `id` onto its target's
    /// current value. No-op for other nodes, for unchanged targets, and
    /// while unbound.
    fn rewatch(&mut self, id: NodeId) {
        let NodeKind::MemberAccess { member, observe: true, .. } = self.registry.kind(id) else {
            return;
        };
        let target: Option<ObjectRef> = match self.ledger.get(self.registry.get_inputs(id)[0]).object() {
            Some(Value::Object(o)) if self.bound => Some(Rc::clone(o)),
            _ => None,
        };

        if let (Some(current), Some(t)) = (self.watches.get(&id), &target) {
            if current.is_on(t) {
                return;
            }
        }
        self.watches.remove(&id);

        let Some(target) = target else { return };
        let sink = self.sink.clone();
        let member = member.clone();
        let handler = Rc::new(move |changed: Option<&str>| {
            if concerns(changed, &member) {
                if let Some(sink) = sink.upgrade() {
                    sink.member_changed(id);
                }
            }
        });
        if let Some(subscription) = Subscription::watch(&target, handler) {
            self.watches.insert(id, subscription);
        }
    }

    fn evaluate(&self, id: NodeId) -> MaybeResult {
        let inputs = self.registry.get_inputs(id);
        let input = |i: usize| self.ledger.get(inputs[i]);

        match self.registry.kind(id) {
            NodeKind::Parameter => self.ledger.get(id).clone(),
            NodeKind::Constant(value) => MaybeResult::some(value.clone()),
            NodeKind::MemberAccess { accessor, .. } => match input(0).object() {
                Some(target) => MaybeResult::some(accessor(target)),
                None => MaybeResult::none(),
            },
            NodeKind::UnaryOp { kernel, .. } => match input(0).as_option() {
                Some(operand) => MaybeResult::some(kernel(operand)),
                None => MaybeResult::none(),
            },
            NodeKind::BinaryDefault { kernel, .. } => match (input(0).as_option(), input(1).as_option()) {
                (Some(l), Some(r)) => MaybeResult::some(kernel(l, r)),
                _ => MaybeResult::none(),
            },
            NodeKind::BinaryEqual { kernel } => equality(input(0), input(1), kernel, false),
            NodeKind::BinaryNotEqual { kernel } => equality(input(0), input(1), kernel, true),
            NodeKind::BinaryRelational { kernel, .. } => match (input(0).as_option(), input(1).as_option()) {
                (Some(l), Some(r)) => MaybeResult::some(kernel(l, r)),
                _ => MaybeResult::some(false),
            },
            NodeKind::BinaryLogicalAnd { kernel } => logical_and(input(0), input(1), |l, r| kernel(l, r)),
            NodeKind::BinaryLogicalOr { kernel } => logical_or(input(0), input(1), |l, r| kernel(l, r)),
        }
    }
}

/// Both present: the operator decides. Exactly one present: they differ.
/// Both absent: absent.
fn equality(
    l: &MaybeResult,
    r: &MaybeResult,
    kernel: &super::kernel::BinaryFn,
    negate: bool,
) -> MaybeResult {
    match (l.as_option(), r.as_option()) {
        (Some(a), Some(b)) => MaybeResult::some(kernel(a, b)),
        (None, None) => MaybeResult::none(),
        _ => MaybeResult::some(negate),
    }
}
