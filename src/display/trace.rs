use crate::compute::ledger::Ledger;
use crate::store::{NodeId, NodeKind, Registry};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the graph below `target` as a tree, one node per line with its
/// static type and current result. A node reached a second time is printed
/// as a reference to the level it first appeared at.
pub fn format_trace(registry: &Registry, ledger: &Ledger, target: NodeId) -> String {
    let mut tracer = Tracer { registry, ledger, visited_at_level: HashMap::new(), output: String::new() };

    if target.index() < registry.count() {
        let source = &registry.meta[target.index()].source;
        let _ = writeln!(tracer.output, "TRACE for `{}`:", source);
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_node(target, 1, "");
    } else {
        let _ = writeln!(tracer.output, "Error: Invalid Node ID {:?}", target);
    }
    tracer.output
}

struct Tracer<'a> {
    registry: &'a Registry,
    ledger: &'a Ledger,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node_id: NodeId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&node_id) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(node_id, level);

        let idx = node_id.index();
        let label = &self.registry.meta[idx].label;
        let ty = self.registry.value_type(node_id);
        let value = self.format_value(node_id);
        let line_header = format!("[L{}] {} : {} {}", level, label, ty, value);

        match self.registry.kind(node_id) {
            NodeKind::Parameter => {
                let _ = writeln!(self.output, "{}{} (parameter)", prefix, line_header);
            }
            NodeKind::Constant(_) => {
                let _ = writeln!(self.output, "{}{} (constant)", prefix, line_header);
            }
            kind => {
                let watch = if kind.observes() { " (observed)" } else { "" };
                let _ = writeln!(self.output, "{}{}{}", prefix, line_header, watch);
                let inputs = self.registry.get_inputs(node_id);
                self.recurse_children(prefix, inputs, level);
            }
        }
    }

    fn recurse_children(&mut self, prefix: &str, children: &[NodeId], level: usize) {
        let stem = self.build_child_stem(prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_node(child, level + 1, &full_prefix);
        }
    }

    fn format_value(&self, id: NodeId) -> String {
        if id.index() < self.ledger.len() {
            format!("[{}]", self.ledger.get(id))
        } else {
            "[?]".to_string()
        }
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        current_prefix.replace("`--", "   ").replace("|--", "|  ")
    }
}
