use crate::error::InvalidResultAccess;
use crate::store::{EqualityPolicy, NodeId, Value};
use std::fmt;

/// Either absent, or a present value (which may itself be `null`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaybeResult(Option<Value>);

impl MaybeResult {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn some(value: impl Into<Value>) -> Self {
        Self(Some(value.into()))
    }

    /// Absent when `value` is `null`, otherwise present.
    pub fn from_optional(value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Self::none(),
            v => Self(Some(v)),
        }
    }

    pub fn has_value(&self) -> bool {
        self.0.is_some()
    }

    pub fn value(&self) -> Result<&Value, InvalidResultAccess> {
        self.0.as_ref().ok_or(InvalidResultAccess)
    }

    pub fn get_or(&self, default: impl Into<Value>) -> Value {
        self.0.clone().unwrap_or_else(|| default.into())
    }

    pub fn as_option(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    /// Present and holding a non-null value.
    pub fn object(&self) -> Option<&Value> {
        self.0.as_ref().filter(|v| !v.is_null())
    }

    /// Equality for change suppression: both absent, or both present and
    /// equal under `policy`.
    pub fn same_as(&self, other: &MaybeResult, policy: EqualityPolicy) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => policy.values_equal(a, b),
            _ => false,
        }
    }

    pub fn tri_state(&self) -> TriState {
        match &self.0 {
            Some(Value::Bool(true)) => TriState::True,
            Some(Value::Bool(false)) => TriState::False,
            _ => TriState::Absent,
        }
    }
}

impl From<TriState> for MaybeResult {
    fn from(t: TriState) -> Self {
        match t {
            TriState::Absent => Self::none(),
            TriState::True => Self::some(true),
            TriState::False => Self::some(false),
        }
    }
}

impl fmt::Display for MaybeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "{:?}", v),
            None => f.write_str("(None)"),
        }
    }
}

/// A boolean that may be undetermined. A present `null` counts as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriState {
    Absent,
    True,
    False,
}

/// Three-valued conjunction over the presence of each operand.
///
/// | l \ r  | Absent | True   | False |
/// |--------|--------|--------|-------|
/// | Absent | Absent | Absent | False |
/// | True   | Absent | *op*   | *op*  |
/// | False  | False  | *op*   | *op*  |
///
/// *op* cells are decided by the compiled operator; the others never call it.
pub fn logical_and(l: &MaybeResult, r: &MaybeResult, op: impl FnOnce(&Value, &Value) -> Value) -> MaybeResult {
    match (l.as_option(), r.as_option()) {
        (Some(a), Some(b)) => MaybeResult::some(op(a, b)),
        (None, None) => MaybeResult::none(),
        _ if l.tri_state() == TriState::False || r.tri_state() == TriState::False => TriState::False.into(),
        _ => MaybeResult::none(),
    }
}

/// Three-valued disjunction; the dual of [`logical_and`] with `True` absorbing.
pub fn logical_or(l: &MaybeResult, r: &MaybeResult, op: impl FnOnce(&Value, &Value) -> Value) -> MaybeResult {
    match (l.as_option(), r.as_option()) {
        (Some(a), Some(b)) => MaybeResult::some(op(a, b)),
        (None, None) => MaybeResult::none(),
        _ if l.tri_state() == TriState::True || r.tri_state() == TriState::True => TriState::True.into(),
        _ => MaybeResult::none(),
    }
}

/// An accepted transition of one node's result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultChange {
    pub old: MaybeResult,
    pub new: MaybeResult,
}

impl fmt::Display for ResultChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.old, self.new)
    }
}

/// Current result of every node in one live graph.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    values: Vec<MaybeResult>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn ensure_capacity(&mut self, size: usize) {
        if self.values.len() < size {
            self.values.resize(size, MaybeResult::none());
        }
    }

    #[inline(always)]
    pub fn get(&self, node_id: NodeId) -> &MaybeResult {
        &self.values[node_id.index()]
    }

    /// Stores `value`, returning the previous result.
    pub fn insert(&mut self, node_id: NodeId, value: MaybeResult) -> MaybeResult {
        let idx = node_id.index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, MaybeResult::none());
        }
        std::mem::replace(&mut self.values[idx], value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tri(t: TriState) -> MaybeResult {
        t.into()
    }

    fn and_op(a: &Value, b: &Value) -> Value {
        Value::Bool(a.as_bool() == Some(true) && b.as_bool() == Some(true))
    }

    fn or_op(a: &Value, b: &Value) -> Value {
        Value::Bool(a.as_bool() == Some(true) || b.as_bool() == Some(true))
    }

    #[rstest]
    #[case(TriState::Absent, TriState::Absent, TriState::Absent)]
    #[case(TriState::Absent, TriState::True, TriState::Absent)]
    #[case(TriState::Absent, TriState::False, TriState::False)]
    #[case(TriState::True, TriState::Absent, TriState::Absent)]
    #[case(TriState::False, TriState::Absent, TriState::False)]
    #[case(TriState::True, TriState::True, TriState::True)]
    #[case(TriState::True, TriState::False, TriState::False)]
    #[case(TriState::False, TriState::False, TriState::False)]
    fn test_and_truth_table(#[case] l: TriState, #[case] r: TriState, #[case] expected: TriState) {
        assert_eq!(logical_and(&tri(l), &tri(r), and_op).tri_state(), expected);
    }

    #[rstest]
    #[case(TriState::Absent, TriState::Absent, TriState::Absent)]
    #[case(TriState::Absent, TriState::True, TriState::True)]
    #[case(TriState::Absent, TriState::False, TriState::Absent)]
    #[case(TriState::True, TriState::Absent, TriState::True)]
    #[case(TriState::False, TriState::Absent, TriState::Absent)]
    #[case(TriState::True, TriState::False, TriState::True)]
    #[case(TriState::False, TriState::False, TriState::False)]
    fn test_or_truth_table(#[case] l: TriState, #[case] r: TriState, #[case] expected: TriState) {
        assert_eq!(logical_or(&tri(l), &tri(r), or_op).tri_state(), expected);
    }

    #[test]
    fn test_present_null_is_not_absorbing() {
        let null = MaybeResult::some(Value::Null);
        assert_eq!(logical_and(&null, &MaybeResult::none(), and_op), MaybeResult::none());
        assert_eq!(logical_or(&MaybeResult::none(), &null, or_op), MaybeResult::none());
    }

    #[test]
    fn test_result_accessors() {
        assert_eq!(MaybeResult::none().value(), Err(InvalidResultAccess));
        assert_eq!(MaybeResult::some(3).value(), Ok(&Value::I32(3)));
        assert!(!MaybeResult::from_optional(Value::Null).has_value());
        assert!(MaybeResult::some(Value::Null).has_value());
        assert_eq!(MaybeResult::none().get_or(7), Value::I32(7));
        assert_eq!(MaybeResult::none().to_string(), "(None)");
        assert_eq!(MaybeResult::some("x").to_string(), "\"x\"");
    }

    #[test]
    fn test_same_as_uses_policy() {
        let a = MaybeResult::some(1);
        assert!(a.same_as(&MaybeResult::some(1), EqualityPolicy::Standard));
        assert!(!a.same_as(&MaybeResult::none(), EqualityPolicy::Standard));
        assert!(MaybeResult::none().same_as(&MaybeResult::none(), EqualityPolicy::Identity));
        assert!(!MaybeResult::some(Value::Null).same_as(&MaybeResult::none(), EqualityPolicy::Identity));
    }

    #[test]
    fn test_ledger_insert_returns_previous() {
        let mut ledger = Ledger::new();
        let id = NodeId(3);
        ledger.ensure_capacity(2);
        assert!(!ledger.get(NodeId(1)).has_value());
        assert_eq!(ledger.insert(id, MaybeResult::some(true)), MaybeResult::none());
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.insert(id, MaybeResult::some(false)), MaybeResult::some(true));
    }
}
