//! value.rs
//! Dynamic values carried through a binding graph, their static type
//! descriptors, and the equality policy used for change suppression.

use super::object::ObjectRef;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// A member of an enumeration: the enum's name plus its discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: Rc<str>,
    pub discriminant: i64,
}

/// The atomic unit of data flowing between nodes.
///
/// Primitive variants compare structurally. `Array` and `Object` are
/// reference types and compare by identity. `Struct` is an opaque value
/// type whose members are read through the [`Object`](super::object::Object)
/// trait but which is never observed for changes.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(Rc<str>),
    Timestamp(DateTime<Utc>),
    Duration(TimeDelta),
    Uuid(Uuid),
    Enum(EnumValue),
    Array(Rc<[Value]>),
    Object(ObjectRef),
    Struct(ObjectRef),
}

impl Value {
    pub fn object<T: super::object::Object + 'static>(object: Rc<T>) -> Self {
        Value::Object(object)
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect::<Vec<_>>().into())
    }

    pub fn enumeration(type_name: &str, discriminant: i64) -> Self {
        Value::Enum(EnumValue { type_name: type_name.into(), discriminant })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload widened to `i128`; `None` for non-integers.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Value::I8(v) => *v as i128,
            Value::I16(v) => *v as i128,
            Value::I32(v) => *v as i128,
            Value::I64(v) => *v as i128,
            Value::U8(v) => *v as i128,
            Value::U16(v) => *v as i128,
            Value::U32(v) => *v as i128,
            Value::U64(v) => *v as i128,
            Value::Char(c) => *c as i128,
            Value::Enum(e) => e.discriminant as i128,
            _ => return None,
        })
    }

    /// Numeric payload as `f64`; `None` for non-numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            other => other.as_i128().map(|n| n as f64),
        }
    }

    /// Builds an integer value of type `ty`, wrapping `n` to its width.
    /// Returns `Null` when `ty` is not an integral type.
    pub fn from_i128(ty: &ValueType, n: i128) -> Self {
        match ty.non_nullable() {
            ValueType::I8 => Value::I8(n as i8),
            ValueType::I16 => Value::I16(n as i16),
            ValueType::I32 => Value::I32(n as i32),
            ValueType::I64 => Value::I64(n as i64),
            ValueType::U8 => Value::U8(n as u8),
            ValueType::U16 => Value::U16(n as u16),
            ValueType::U32 => Value::U32(n as u32),
            ValueType::U64 => Value::U64(n as u64),
            ValueType::F32 => Value::F32(n as f32),
            ValueType::F64 => Value::F64(n as f64),
            ValueType::Char => char::from_u32(n as u32).map_or(Value::Null, Value::Char),
            ValueType::Enum(name) => Value::enumeration(name, n as i64),
            _ => Value::Null,
        }
    }

    /// Built-in members available on every value, used by the default accessor
    /// when the target is not an object.
    pub fn builtin_member(&self, name: &str) -> Value {
        match (self, name) {
            (Value::Object(o) | Value::Struct(o), _) => o.member(name).unwrap_or(Value::Null),
            (Value::Str(s), "length") => Value::I32(s.chars().count() as i32),
            (Value::Array(items), "length") => Value::I32(items.len() as i32),
            (Value::Null, _) => Value::Null,
            (other, "value") => other.clone(),
            (_, "has_value") => Value::Bool(true),
            _ => Value::Null,
        }
    }

    /// Identity comparison for reference types; `Null` is identical to `Null`.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Object(a), Value::Object(b)) | (Value::Struct(a), Value::Struct(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (Value::Array(a), Value::Array(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The natural static type of a non-null primitive value.
    pub fn natural_type(&self) -> Option<ValueType> {
        Some(match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Char(_) => ValueType::Char,
            Value::I8(_) => ValueType::I8,
            Value::I16(_) => ValueType::I16,
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::U8(_) => ValueType::U8,
            Value::U16(_) => ValueType::U16,
            Value::U32(_) => ValueType::U32,
            Value::U64(_) => ValueType::U64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::Str(_) => ValueType::Str,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Duration(_) => ValueType::Duration,
            Value::Uuid(_) => ValueType::Uuid,
            Value::Enum(e) => ValueType::Enum(e.type_name.to_string()),
            Value::Object(o) => ValueType::object(o.type_name()),
            Value::Struct(o) => ValueType::Struct(o.type_name().to_string()),
            Value::Null | Value::Array(_) => return None,
        })
    }
}

/// Structural for primitives (NaN equals NaN, matching `Equals` semantics
/// rather than `==`), identity for arrays, objects and structs.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (F32(a), F32(b)) => a == b || (a.is_nan() && b.is_nan()),
            (F64(a), F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Str(a), Str(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Duration(a), Duration(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Array(_), Array(_)) | (Object(_), Object(_)) | (Struct(_), Struct(_)) => self.same(other),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Char(c) => write!(f, "{:?}", c),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Duration(v) => write!(f, "{}", v),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Enum(e) => write!(f, "{}({})", e.type_name, e.discriminant),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(o) | Value::Struct(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self { Value::$variant(v) }
        })*
    };
}

value_from! {
    bool => Bool, char => Char,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
    DateTime<Utc> => Timestamp, TimeDelta => Duration, Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Static descriptor of a reference type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    /// `false` for types known never to carry a change notification
    /// capability; member accesses on them skip subscription entirely.
    pub observable: bool,
}

/// The static type of an expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Timestamp,
    Duration,
    Uuid,
    Enum(String),
    Nullable(Box<ValueType>),
    Array(Box<ValueType>),
    Object(ObjectType),
    Struct(String),
}

impl ValueType {
    pub fn object(name: &str) -> Self {
        ValueType::Object(ObjectType { name: name.to_string(), observable: true })
    }

    /// A reference type that never notifies (e.g. a sealed plain record).
    pub fn sealed_object(name: &str) -> Self {
        ValueType::Object(ObjectType { name: name.to_string(), observable: false })
    }

    /// Wraps a value type as nullable. Reference types and already nullable
    /// types are returned unchanged.
    pub fn nullable(inner: ValueType) -> Self {
        if inner.is_value_type() && !inner.is_nullable() {
            ValueType::Nullable(Box::new(inner))
        } else {
            inner
        }
    }

    pub fn array(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Nullable(_))
    }

    pub fn non_nullable(&self) -> &ValueType {
        match self {
            ValueType::Nullable(inner) => inner,
            other => other,
        }
    }

    /// `bool` or `bool?`.
    pub fn is_boolean(&self) -> bool {
        matches!(self.non_nullable(), ValueType::Bool)
    }

    /// Value types have no identity and no shared ownership.
    pub fn is_value_type(&self) -> bool {
        !matches!(self, ValueType::Str | ValueType::Array(_) | ValueType::Object(_))
    }

    pub fn is_reference_type(&self) -> bool {
        !self.is_value_type()
    }

    /// Lifts `self` to nullable when `lift` is set.
    pub fn lifted(self, lift: bool) -> Self {
        if lift {
            ValueType::nullable(self)
        } else {
            self
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::Char => f.write_str("char"),
            ValueType::I8 => f.write_str("i8"),
            ValueType::I16 => f.write_str("i16"),
            ValueType::I32 => f.write_str("i32"),
            ValueType::I64 => f.write_str("i64"),
            ValueType::U8 => f.write_str("u8"),
            ValueType::U16 => f.write_str("u16"),
            ValueType::U32 => f.write_str("u32"),
            ValueType::U64 => f.write_str("u64"),
            ValueType::F32 => f.write_str("f32"),
            ValueType::F64 => f.write_str("f64"),
            ValueType::Str => f.write_str("string"),
            ValueType::Timestamp => f.write_str("timestamp"),
            ValueType::Duration => f.write_str("duration"),
            ValueType::Uuid => f.write_str("uuid"),
            ValueType::Enum(name) | ValueType::Struct(name) => f.write_str(name),
            ValueType::Nullable(inner) => write!(f, "{}?", inner),
            ValueType::Array(element) => write!(f, "{}[]", element),
            ValueType::Object(o) => f.write_str(&o.name),
        }
    }
}

/// How two results of one node are compared to decide whether a change is
/// worth propagating.
///
/// Chosen once per node from its static result type:
/// - well-known immutable types use their own equality;
/// - other value types are equal only when both are null;
/// - reference types are equal only when they are the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqualityPolicy {
    Standard,
    EmptyOnly,
    Identity,
}

impl EqualityPolicy {
    pub fn for_type(ty: &ValueType) -> Self {
        match ty.non_nullable() {
            ValueType::Bool
            | ValueType::Char
            | ValueType::I8
            | ValueType::I16
            | ValueType::I32
            | ValueType::I64
            | ValueType::U8
            | ValueType::U16
            | ValueType::U32
            | ValueType::U64
            | ValueType::F32
            | ValueType::F64
            | ValueType::Str
            | ValueType::Timestamp
            | ValueType::Duration
            | ValueType::Uuid
            | ValueType::Enum(_) => EqualityPolicy::Standard,
            ValueType::Struct(_) => EqualityPolicy::EmptyOnly,
            ValueType::Array(_) | ValueType::Object(_) | ValueType::Nullable(_) => EqualityPolicy::Identity,
        }
    }

    pub fn values_equal(self, a: &Value, b: &Value) -> bool {
        match self {
            EqualityPolicy::Standard => a == b,
            EqualityPolicy::EmptyOnly => a.is_null() && b.is_null(),
            EqualityPolicy::Identity => a.same(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object::PropertyBag;
    use rstest::rstest;

    #[rstest]
    #[case(ValueType::I32, EqualityPolicy::Standard)]
    #[case(ValueType::nullable(ValueType::F64), EqualityPolicy::Standard)]
    #[case(ValueType::Str, EqualityPolicy::Standard)]
    #[case(ValueType::Uuid, EqualityPolicy::Standard)]
    #[case(ValueType::Enum("Color".into()), EqualityPolicy::Standard)]
    #[case(ValueType::Struct("Point".into()), EqualityPolicy::EmptyOnly)]
    #[case(ValueType::nullable(ValueType::Struct("Point".into())), EqualityPolicy::EmptyOnly)]
    #[case(ValueType::object("Person"), EqualityPolicy::Identity)]
    #[case(ValueType::array(ValueType::I32), EqualityPolicy::Identity)]
    fn test_policy_follows_static_type(#[case] ty: ValueType, #[case] expected: EqualityPolicy) {
        assert_eq!(EqualityPolicy::for_type(&ty), expected);
    }

    #[test]
    fn test_identity_policy_ignores_domain_equality() {
        let a = Value::object(Rc::new(PropertyBag::new("Person").with("id", 42)));
        let b = Value::object(Rc::new(PropertyBag::new("Person").with("id", 42)));
        assert!(EqualityPolicy::Identity.values_equal(&a, &a.clone()));
        assert!(!EqualityPolicy::Identity.values_equal(&a, &b));
        assert!(EqualityPolicy::Identity.values_equal(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_empty_only_policy_never_equates_present_values() {
        let p = Value::Struct(Rc::new(PropertyBag::non_observable("Point")));
        assert!(!EqualityPolicy::EmptyOnly.values_equal(&p, &p.clone()));
        assert!(EqualityPolicy::EmptyOnly.values_equal(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_nan_is_equal_to_itself_for_change_suppression() {
        assert!(EqualityPolicy::Standard.values_equal(&Value::F64(f64::NAN), &Value::F64(f64::NAN)));
    }

    #[test]
    fn test_nullable_wrapping_is_idempotent_and_skips_references() {
        let t = ValueType::nullable(ValueType::nullable(ValueType::I32));
        assert_eq!(t, ValueType::Nullable(Box::new(ValueType::I32)));
        assert_eq!(ValueType::nullable(ValueType::Str), ValueType::Str);
        assert_eq!(t.to_string(), "i32?");
    }

    #[test]
    fn test_integer_wrapping() {
        assert_eq!(Value::from_i128(&ValueType::U8, 256 + 7), Value::U8(7));
        assert_eq!(Value::from_i128(&ValueType::nullable(ValueType::I8), -129), Value::I8(127));
        assert!(Value::from_i128(&ValueType::Str, 1).is_null());
    }

    #[test]
    fn test_builtin_members() {
        assert_eq!(Value::from("FooBar").builtin_member("length"), Value::I32(6));
        assert_eq!(Value::I32(42).builtin_member("value"), Value::I32(42));
        assert!(Value::Null.builtin_member("length").is_null());
    }
}
