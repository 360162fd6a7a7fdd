//! clone.rs
//! Structure-preserving duplication of a node arena.

use super::registry::Registry;
use super::types::{BindingMode, NodeId};
use std::collections::HashMap;

/// One cloning session: maps original node ids to their clones so every
/// distinct node is copied exactly once and shared subexpressions stay shared.
#[derive(Debug, Default)]
pub struct CloneContext {
    mode: BindingMode,
    memo: HashMap<NodeId, NodeId>,
}

impl CloneContext {
    pub fn new(mode: BindingMode) -> Self {
        Self { mode, memo: HashMap::new() }
    }

    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    pub fn lookup(&self, original: NodeId) -> Option<NodeId> {
        self.memo.get(&original).copied()
    }

    pub fn record(&mut self, original: NodeId, clone: NodeId) {
        self.memo.insert(original, clone);
    }

    /// Number of distinct nodes cloned so far.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    /// Clones `id` and everything it reads from `source` into `target`,
    /// returning the clone's id. Idempotent within this context.
    pub fn clone_node(&mut self, source: &Registry, target: &mut Registry, id: NodeId) -> NodeId {
        if let Some(existing) = self.lookup(id) {
            return existing;
        }

        let inputs: Vec<NodeId> = source
            .get_inputs(id)
            .iter()
            .map(|&input| self.clone_node(source, target, input))
            .collect();

        let mut kind = source.kind(id).clone();
        if self.mode == BindingMode::OneTime {
            kind = kind.one_time();
        }

        let clone = target.add_node(
            kind,
            source.value_type(id).clone(),
            source.policy(id),
            &inputs,
            source.meta[id.index()].clone(),
        );
        self.record(id, clone);
        clone
    }
}
