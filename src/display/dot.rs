use crate::store::Registry;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

/// Graphviz rendering of the arena, edges pointing from input to reader.
pub fn to_dot(registry: &Registry) -> String {
    let mut graph: DiGraph<String, &'static str> = DiGraph::with_capacity(registry.count(), registry.inputs_flat.len());

    let nodes: Vec<NodeIndex> = registry
        .ids()
        .map(|id| {
            let meta = &registry.meta[id.index()];
            graph.add_node(format!("{} {} : {}", registry.kind(id).tag(), meta.label, registry.value_type(id)))
        })
        .collect();

    for id in registry.ids() {
        for input in registry.get_inputs(id) {
            graph.add_edge(nodes[input.index()], nodes[id.index()], "");
        }
    }

    format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}
