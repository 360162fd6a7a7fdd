use crate::store::{NodeId, Registry};
use std::collections::{HashSet, VecDeque};

/// Every node a change at `start_nodes` can reach, the start nodes included.
pub fn downstream_from(registry: &Registry, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start_nodes.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(registry.get_subscribers(node).iter().copied());
        }
    }
    visited
}

/// Longest input chain below each node, leaves at depth 1.
///
/// Ids ascend children-first, so one forward pass sees every input's depth
/// before the nodes that read it.
pub fn depths(registry: &Registry) -> Vec<usize> {
    let mut depth = vec![0usize; registry.count()];
    for id in registry.ids() {
        let below = registry.get_inputs(id).iter().map(|i| depth[i.index()]).max().unwrap_or(0);
        depth[id.index()] = below + 1;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EqualityPolicy, NodeKind, NodeMetadata, Value, ValueType};

    fn node(reg: &mut Registry, inputs: &[NodeId], label: &str) -> NodeId {
        let meta = NodeMetadata { label: label.into(), ..Default::default() };
        reg.add_node(NodeKind::Constant(Value::I32(0)), ValueType::I32, EqualityPolicy::Standard, inputs, meta)
    }

    #[test]
    fn test_depth_of_diamond() {
        // Shape: A -> B, A -> C, B+C -> D
        let mut reg = Registry::new();
        let a = node(&mut reg, &[], "A");
        let b = node(&mut reg, &[a], "B");
        let c = node(&mut reg, &[a], "C");
        let d = node(&mut reg, &[b, c], "D");

        assert_eq!(depths(&reg), vec![1, 2, 2, 3]);
        assert_eq!(depths(&reg)[d.index()], 3);
    }

    #[test]
    fn test_downstream_of_shared_node() {
        let mut reg = Registry::new();
        let a = node(&mut reg, &[], "A");
        let b = node(&mut reg, &[a], "B");
        let c = node(&mut reg, &[a], "C");
        let unrelated = node(&mut reg, &[], "E");

        let down = downstream_from(&reg, &[a]);
        assert_eq!(down, HashSet::from([a, b, c]));
        assert!(!down.contains(&unrelated));
    }
}
