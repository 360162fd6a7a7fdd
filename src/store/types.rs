use super::value::Value;
use crate::compute::kernel::{BinaryFn, UnaryFn};
use crate::expr::{Accessor, BinaryOp, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Whether a cloned binding observes its bound objects for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BindingMode {
    /// Live: member accesses subscribe to change notifications.
    #[default]
    Default,
    /// Evaluate once on bind; no subscriptions are ever made.
    OneTime,
}

/// The closed set of node variants, without their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKindTag {
    Parameter,
    Constant,
    MemberAccess,
    UnaryOp,
    BinaryDefault,
    BinaryEqual,
    BinaryNotEqual,
    BinaryRelational,
    BinaryLogicalAnd,
    BinaryLogicalOr,
}

impl NodeKindTag {
    /// Number of static type arguments the variant is specialized over.
    pub fn arity(&self) -> usize {
        match self {
            NodeKindTag::Parameter | NodeKindTag::Constant => 1,
            NodeKindTag::MemberAccess | NodeKindTag::UnaryOp => 2,
            NodeKindTag::BinaryEqual | NodeKindTag::BinaryNotEqual | NodeKindTag::BinaryRelational => 2,
            NodeKindTag::BinaryDefault | NodeKindTag::BinaryLogicalAnd | NodeKindTag::BinaryLogicalOr => 3,
        }
    }
}

impl fmt::Display for NodeKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A node's behaviour. Children live in the registry's input lists; the
/// kind only carries the compiled scalar function or accessor.
#[derive(Clone)]
pub enum NodeKind {
    Parameter,
    Constant(Value),
    MemberAccess { member: Arc<str>, accessor: Accessor, observe: bool },
    UnaryOp { op: UnaryOp, kernel: UnaryFn },
    BinaryDefault { op: BinaryOp, kernel: BinaryFn },
    BinaryEqual { kernel: BinaryFn },
    BinaryNotEqual { kernel: BinaryFn },
    BinaryRelational { op: BinaryOp, kernel: BinaryFn },
    BinaryLogicalAnd { kernel: BinaryFn },
    BinaryLogicalOr { kernel: BinaryFn },
}

impl NodeKind {
    pub fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::Parameter => NodeKindTag::Parameter,
            NodeKind::Constant(_) => NodeKindTag::Constant,
            NodeKind::MemberAccess { .. } => NodeKindTag::MemberAccess,
            NodeKind::UnaryOp { .. } => NodeKindTag::UnaryOp,
            NodeKind::BinaryDefault { .. } => NodeKindTag::BinaryDefault,
            NodeKind::BinaryEqual { .. } => NodeKindTag::BinaryEqual,
            NodeKind::BinaryNotEqual { .. } => NodeKindTag::BinaryNotEqual,
            NodeKind::BinaryRelational { .. } => NodeKindTag::BinaryRelational,
            NodeKind::BinaryLogicalAnd { .. } => NodeKindTag::BinaryLogicalAnd,
            NodeKind::BinaryLogicalOr { .. } => NodeKindTag::BinaryLogicalOr,
        }
    }

    /// `true` for member accesses that subscribe to their target.
    pub fn observes(&self) -> bool {
        matches!(self, NodeKind::MemberAccess { observe: true, .. })
    }

    /// The same node with change observation turned off.
    pub fn one_time(self) -> Self {
        match self {
            NodeKind::MemberAccess { member, accessor, .. } => {
                NodeKind::MemberAccess { member, accessor, observe: false }
            }
            other => other,
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Constant(v) => write!(f, "Constant({:?})", v),
            NodeKind::MemberAccess { member, observe, .. } => {
                write!(f, "MemberAccess({}, observe: {})", member, observe)
            }
            NodeKind::UnaryOp { op, .. } => write!(f, "UnaryOp({:?})", op),
            NodeKind::BinaryDefault { op, .. } => write!(f, "BinaryDefault({:?})", op),
            NodeKind::BinaryRelational { op, .. } => write!(f, "BinaryRelational({:?})", op),
            other => write!(f, "{}", other.tag()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Short rendering of the node's own operation, e.g. `.age` or `>`.
    pub label: String,
    /// The source sub-expression the node was compiled from.
    pub source: String,
}
