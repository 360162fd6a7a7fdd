use super::topology;
use crate::store::{NodeId, Registry};
use serde::Serialize;
use std::collections::BTreeMap;

/// Structural summary of one compiled graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryReport {
    pub node_count: usize,
    /// Node count per variant, keyed by variant name.
    pub kind_counts: BTreeMap<String, usize>,
    /// Nodes read by more than one subscriber.
    pub shared_nodes: usize,
    /// Member accesses that subscribe to change notifications while bound.
    pub observed_members: usize,
    /// Longest input chain ending at the body.
    pub depth: usize,
    /// Nodes recomputed when the bound graph changes, parameter included.
    pub parameter_dependent: usize,
}

impl TelemetryReport {
    pub fn analyze(registry: &Registry, parameter: NodeId, body: NodeId) -> Self {
        let mut kind_counts = BTreeMap::new();
        let mut observed_members = 0;
        for id in registry.ids() {
            let kind = registry.kind(id);
            *kind_counts.entry(kind.tag().to_string()).or_insert(0) += 1;
            if kind.observes() {
                observed_members += 1;
            }
        }

        let depth = topology::depths(registry).get(body.index()).copied().unwrap_or(0);

        Self {
            node_count: registry.count(),
            kind_counts,
            shared_nodes: registry.shared_nodes().count(),
            observed_members,
            depth,
            parameter_dependent: topology::downstream_from(registry, &[parameter]).len(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::compiler::Compiler;
    use crate::expr::{Expr, Lambda};
    use crate::store::ValueType;

    #[test]
    fn test_report_for_diamond() {
        let p = Expr::parameter("p", ValueType::object("Person"));
        let name = p.member("name", ValueType::object("Name"));
        let body = name.member("first", ValueType::Str).eq(name.member("last", ValueType::Str)).or(Expr::constant(false));
        let graph = Compiler::new(&Lambda::new(p, body)).compile().unwrap();

        let report = TelemetryReport::analyze(&graph.registry, graph.parameter, graph.body);
        // p, p.name, .first, .last, ==, false, |
        assert_eq!(report.node_count, 7);
        assert_eq!(report.kind_counts["MemberAccess"], 3);
        assert_eq!(report.kind_counts["BinaryLogicalOr"], 1);
        assert_eq!(report.shared_nodes, 1);
        assert_eq!(report.observed_members, 3);
        assert_eq!(report.depth, 5);
        assert_eq!(report.parameter_dependent, 6);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"shared_nodes\": 1"));
    }
}
