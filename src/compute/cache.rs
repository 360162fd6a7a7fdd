//! Process-wide specialization caches.
//!
//! Two caches are shared by every compilation in the process: node
//! constructors keyed by (variant, static type arguments) and scalar kernels
//! keyed by (operator, operand types). A miss builds the entry outside the
//! lock; when two threads race on one key the first insert wins and both
//! callers get that entry. Failed builds are not cached.

use super::kernel::{self, BinaryFn, UnaryFn};
use crate::expr::{Accessor, BinaryOp, UnaryOp};
use crate::store::{EqualityPolicy, NodeKind, NodeKindTag, Value, ValueType};
use crate::type_system::TypeError;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

pub struct SpecializationCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
    builds: AtomicUsize,
}

impl<K: Eq + Hash + Clone, V: Clone> SpecializationCache<K, V> {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()), builds: AtomicUsize::new(0) }
    }

    pub fn get_or_try_build<E>(&self, key: &K, build: impl FnOnce(&K) -> Result<V, E>) -> Result<V, E> {
        if let Some(hit) = self.entries.read().get(key) {
            return Ok(hit.clone());
        }

        let built = build(key)?;
        self.builds.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.write().entry(key.clone()).or_insert(built).clone())
    }

    pub fn get_or_build(&self, key: &K, build: impl FnOnce(&K) -> V) -> V {
        match self.get_or_try_build(key, |k| Ok::<V, std::convert::Infallible>(build(k))) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times an entry was built, including builds that lost a race.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for SpecializationCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-instance payload a constructor is applied to.
pub enum NodeArgs {
    Parameter,
    Constant(Value),
    Member { member: Arc<str>, accessor: Accessor },
    Unary { op: UnaryOp, kernel: UnaryFn },
    Binary { op: BinaryOp, kernel: BinaryFn },
}

/// A node constructor specialized on its static type arguments: the variant
/// it builds, how its results are compared and, for member accesses,
/// whether the target type can notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCtor {
    pub tag: NodeKindTag,
    pub result_type: ValueType,
    pub policy: EqualityPolicy,
    pub observe: bool,
}

impl NodeCtor {
    fn build(tag: NodeKindTag, type_args: &[ValueType]) -> Self {
        let result_type = match tag {
            NodeKindTag::BinaryEqual | NodeKindTag::BinaryNotEqual | NodeKindTag::BinaryRelational => ValueType::Bool,
            _ => type_args.last().cloned().unwrap_or(ValueType::Bool),
        };
        let observe = tag == NodeKindTag::MemberAccess
            && matches!(type_args.first(), Some(ValueType::Object(o)) if o.observable);
        Self { tag, policy: EqualityPolicy::for_type(&result_type), result_type, observe }
    }

    /// Builds the node. The payload shape selects the variant family; for
    /// binary payloads the specialized tag picks the variant.
    pub fn instantiate(&self, args: NodeArgs) -> NodeKind {
        match args {
            NodeArgs::Parameter => NodeKind::Parameter,
            NodeArgs::Constant(value) => NodeKind::Constant(value),
            NodeArgs::Member { member, accessor } => NodeKind::MemberAccess { member, accessor, observe: self.observe },
            NodeArgs::Unary { op, kernel } => NodeKind::UnaryOp { op, kernel },
            NodeArgs::Binary { op, kernel } => match self.tag {
                NodeKindTag::BinaryEqual => NodeKind::BinaryEqual { kernel },
                NodeKindTag::BinaryNotEqual => NodeKind::BinaryNotEqual { kernel },
                NodeKindTag::BinaryRelational => NodeKind::BinaryRelational { op, kernel },
                NodeKindTag::BinaryLogicalAnd => NodeKind::BinaryLogicalAnd { kernel },
                NodeKindTag::BinaryLogicalOr => NodeKind::BinaryLogicalOr { kernel },
                _ => NodeKind::BinaryDefault { op, kernel },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CtorKey {
    pub tag: NodeKindTag,
    pub type_args: Vec<ValueType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnaryKey {
    pub op: UnaryOp,
    pub operand: ValueType,
    pub result: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryKey {
    pub op: BinaryOp,
    pub left: ValueType,
    pub right: ValueType,
}

static CONSTRUCTORS: LazyLock<SpecializationCache<CtorKey, NodeCtor>> = LazyLock::new(SpecializationCache::new);
static UNARY_OPERATORS: LazyLock<SpecializationCache<UnaryKey, UnaryFn>> = LazyLock::new(SpecializationCache::new);
static BINARY_OPERATORS: LazyLock<SpecializationCache<BinaryKey, BinaryFn>> = LazyLock::new(SpecializationCache::new);

/// The constructor for `tag` over `type_args` (operand types, then result
/// type, as many as the variant's arity).
pub fn constructor(tag: NodeKindTag, type_args: &[ValueType]) -> NodeCtor {
    let key = CtorKey { tag, type_args: type_args.to_vec() };
    CONSTRUCTORS.get_or_build(&key, |k| NodeCtor::build(k.tag, &k.type_args))
}

pub fn unary_operator(op: UnaryOp, operand: &ValueType, result: &ValueType) -> Result<UnaryFn, TypeError> {
    let key = UnaryKey { op, operand: operand.clone(), result: result.clone() };
    UNARY_OPERATORS.get_or_try_build(&key, |k| kernel::build_unary(k.op, &k.operand, &k.result))
}

pub fn binary_operator(op: BinaryOp, left: &ValueType, right: &ValueType) -> Result<BinaryFn, TypeError> {
    let key = BinaryKey { op, left: left.clone(), right: right.clone() };
    BINARY_OPERATORS.get_or_try_build(&key, |k| kernel::build_binary(k.op, &k.left, &k.right))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub constructors: usize,
    pub operators: usize,
    pub builds: usize,
}

pub fn stats() -> CacheStats {
    CacheStats {
        constructors: CONSTRUCTORS.len(),
        operators: UNARY_OPERATORS.len() + BINARY_OPERATORS.len(),
        builds: CONSTRUCTORS.builds() + UNARY_OPERATORS.builds() + BINARY_OPERATORS.builds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_lost_race_returns_winner() {
        let cache: SpecializationCache<u32, Arc<str>> = SpecializationCache::new();
        let first: Result<_, ()> = cache.get_or_try_build(&1, |_| Ok(Arc::from("first")));
        let second: Result<_, ()> = cache.get_or_try_build(&1, |_| Ok(Arc::from("second")));
        assert_eq!(&*first.unwrap(), "first");
        assert_eq!(&*second.unwrap(), "first");
        assert_eq!(cache.builds(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: SpecializationCache<u32, u32> = SpecializationCache::new();
        assert!(cache.get_or_try_build(&7, |_| Err("nope")).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_try_build(&7, |_| Ok::<_, ()>(70)), Ok(70));
    }

    #[test]
    fn test_concurrent_first_use_converges() {
        let cache: Arc<SpecializationCache<u32, Arc<u32>>> = Arc::new(SpecializationCache::new());
        let results: Vec<Arc<u32>> = (0..256u32)
            .into_par_iter()
            .map(|i| cache.get_or_try_build(&(i % 4), |k| Ok::<_, ()>(Arc::new(*k))).unwrap())
            .collect();

        assert_eq!(cache.len(), 4);
        for (i, r) in results.iter().enumerate() {
            let canonical = cache.get_or_try_build(&(i as u32 % 4), |_| Err(())).unwrap();
            assert!(Arc::ptr_eq(r, &canonical));
        }
    }

    #[test]
    fn test_global_operator_cache_is_thread_safe() {
        let t = ValueType::nullable(ValueType::I32);
        let kernels: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| binary_operator(BinaryOp::GreaterThan, &t, &t).unwrap())
            .collect();
        assert_eq!(kernels.len(), 64);
        assert!(stats().operators >= 1);
    }

    #[test]
    fn test_constructor_specialization() {
        let member = constructor(NodeKindTag::MemberAccess, &[ValueType::object("Person"), ValueType::I32]);
        assert!(member.observe);
        assert_eq!(member.policy, EqualityPolicy::Standard);

        let sealed = constructor(NodeKindTag::MemberAccess, &[ValueType::sealed_object("Point"), ValueType::object("X")]);
        assert!(!sealed.observe);
        assert_eq!(sealed.policy, EqualityPolicy::Identity);

        let eq = constructor(NodeKindTag::BinaryEqual, &[ValueType::Str, ValueType::Str]);
        assert_eq!(eq.result_type, ValueType::Bool);
        assert_eq!(constructor(NodeKindTag::BinaryEqual, &[ValueType::Str, ValueType::Str]), eq);
    }

    #[test]
    fn test_constructor_builds_its_variant() {
        let t = ValueType::I32;
        let kernel = binary_operator(BinaryOp::LessThan, &t, &t).unwrap();
        let lt = constructor(NodeKindTag::BinaryRelational, &[t.clone(), t.clone()]);
        let kind = lt.instantiate(NodeArgs::Binary { op: BinaryOp::LessThan, kernel });
        assert_eq!(kind.tag(), NodeKindTag::BinaryRelational);

        let accessor = crate::expr::default_accessor("age");
        let live = constructor(NodeKindTag::MemberAccess, &[ValueType::object("Person"), t.clone()]);
        let member = live.instantiate(NodeArgs::Member { member: "age".into(), accessor: accessor.clone() });
        assert!(member.observes());

        let sealed = constructor(NodeKindTag::MemberAccess, &[ValueType::sealed_object("Point"), t]);
        let member = sealed.instantiate(NodeArgs::Member { member: "x".into(), accessor });
        assert_eq!(member.tag(), NodeKindTag::MemberAccess);
        assert!(!member.observes());
    }
}
