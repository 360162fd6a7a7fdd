use super::types::*;
use super::value::{EqualityPolicy, ValueType};
use smallvec::SmallVec;

/// Columnar arena holding every node of one graph.
///
/// Nodes are appended children-first, so ascending `NodeId` order is always a
/// valid evaluation order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Columnar Arrays
    pub kinds: Vec<NodeKind>,
    pub types: Vec<ValueType>,
    pub policies: Vec<EqualityPolicy>,
    pub meta: Vec<NodeMetadata>,

    // Topology (CSR) for upstream reads
    pub inputs_flat: Vec<NodeId>,
    pub inputs_ranges: Vec<(u32, u32)>, // (start, count)

    // Downstream notification lists, in subscription order
    pub subscribers: Vec<SmallVec<[NodeId; 2]>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        ty: ValueType,
        policy: EqualityPolicy,
        inputs: &[NodeId],
        meta: NodeMetadata,
    ) -> NodeId {
        let id = NodeId::new(self.kinds.len());

        // 1. Register Inputs
        let start = self.inputs_flat.len() as u32;
        self.inputs_flat.extend_from_slice(inputs);
        self.inputs_ranges.push((start, inputs.len() as u32));

        // 2. Subscribe to each distinct input once (`x == x` recomputes once)
        for (i, &input) in inputs.iter().enumerate() {
            if !inputs[..i].contains(&input) {
                self.subscribers[input.index()].push(id);
            }
        }

        // 3. Columns
        self.kinds.push(kind);
        self.types.push(ty);
        self.policies.push(policy);
        self.meta.push(meta);
        self.subscribers.push(SmallVec::new());

        id
    }

    #[inline(always)]
    pub fn get_inputs(&self, id: NodeId) -> &[NodeId] {
        let (start, count) = self.inputs_ranges[id.index()];
        &self.inputs_flat[start as usize..(start + count) as usize]
    }

    #[inline(always)]
    pub fn get_subscribers(&self, id: NodeId) -> &[NodeId] {
        &self.subscribers[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.kinds[id.index()]
    }

    pub fn value_type(&self, id: NodeId) -> &ValueType {
        &self.types[id.index()]
    }

    pub fn policy(&self, id: NodeId) -> EqualityPolicy {
        self.policies[id.index()]
    }

    /// Nodes read by more than one subscriber (diamond joins).
    pub fn shared_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.subscribers
            .iter()
            .enumerate()
            .filter(|(_, subs)| subs.len() > 1)
            .map(|(i, _)| NodeId::new(i))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.count()).map(NodeId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::value::Value;

    fn constant(reg: &mut Registry, v: i32) -> NodeId {
        reg.add_node(
            NodeKind::Constant(Value::I32(v)),
            ValueType::I32,
            EqualityPolicy::Standard,
            &[],
            NodeMetadata::default(),
        )
    }

    #[test]
    fn test_add_node_wires_both_directions() {
        let mut reg = Registry::new();
        let a = constant(&mut reg, 1);
        let b = constant(&mut reg, 2);
        let p = reg.add_node(NodeKind::Parameter, ValueType::I32, EqualityPolicy::Standard, &[a, b], NodeMetadata::default());

        assert_eq!(reg.get_inputs(p), &[a, b]);
        assert_eq!(reg.get_subscribers(a), &[p]);
        assert_eq!(reg.get_subscribers(b), &[p]);
        assert!(reg.get_inputs(a).is_empty());
    }

    #[test]
    fn test_repeated_input_subscribes_once() {
        let mut reg = Registry::new();
        let a = constant(&mut reg, 1);
        let p = reg.add_node(NodeKind::Parameter, ValueType::I32, EqualityPolicy::Standard, &[a, a], NodeMetadata::default());

        assert_eq!(reg.get_inputs(p), &[a, a]);
        assert_eq!(reg.get_subscribers(a), &[p]);
        assert_eq!(reg.shared_nodes().count(), 0);
    }
}
