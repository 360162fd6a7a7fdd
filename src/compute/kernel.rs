//! Scalar operator functions specialized per operand type.
//!
//! Every kernel is total: `null` operands follow lifted-operator rules
//! (propagate `null`, or compare as `false`) and out-of-range reads yield
//! `null`, so a compiled graph can never fail while recomputing.

use crate::expr::{BinaryOp, UnaryOp};
use crate::store::{Value, ValueType};
use crate::type_system::{self, rules::numeric, TypeError};
use std::cmp::Ordering;
use std::sync::Arc;

pub type UnaryFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;
pub type BinaryFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Builds the function for `op operand` producing a value of type `result`.
pub fn build_unary(op: UnaryOp, operand: &ValueType, result: &ValueType) -> Result<UnaryFn, TypeError> {
    let target = result.clone();
    match op {
        UnaryOp::Convert | UnaryOp::TypeAs => {
            type_system::check_conversion(operand, result)?;
            Ok(Arc::new(move |v: &Value| convert(v, &target)))
        }
        UnaryOp::UnaryPlus => {
            type_system::unary_result(op, operand)?;
            Ok(Arc::new(move |v: &Value| convert(v, &target)))
        }
        UnaryOp::Not => {
            type_system::unary_result(op, operand)?;
            Ok(Arc::new(move |v: &Value| match v {
                Value::Bool(b) => Value::Bool(!b),
                Value::Null => Value::Null,
                other => other.as_i128().map_or(Value::Null, |n| Value::from_i128(&target, !n)),
            }))
        }
        UnaryOp::Negate => {
            type_system::unary_result(op, operand)?;
            Ok(Arc::new(move |v: &Value| match v {
                Value::F32(f) => Value::F32(-f),
                Value::F64(f) => Value::F64(-f),
                other => other.as_i128().map_or(Value::Null, |n| Value::from_i128(&target, -n)),
            }))
        }
        UnaryOp::ArrayLength => {
            type_system::unary_result(op, operand)?;
            Ok(Arc::new(|v: &Value| match v {
                Value::Array(items) => Value::I32(items.len() as i32),
                _ => Value::Null,
            }))
        }
    }
}

/// Builds the function for `left op right`.
pub fn build_binary(op: BinaryOp, left: &ValueType, right: &ValueType) -> Result<BinaryFn, TypeError> {
    let result = type_system::binary_result(op, left, right)?;
    let f: BinaryFn = match op {
        BinaryOp::Equal => Arc::new(|a: &Value, b: &Value| Value::Bool(values_equal(a, b))),
        BinaryOp::NotEqual => Arc::new(|a: &Value, b: &Value| Value::Bool(!values_equal(a, b))),
        BinaryOp::LessThan => relational(Ordering::is_lt),
        BinaryOp::LessThanOrEqual => relational(Ordering::is_le),
        BinaryOp::GreaterThan => relational(Ordering::is_gt),
        BinaryOp::GreaterThanOrEqual => relational(Ordering::is_ge),
        BinaryOp::And => bitwise(result, |a, b| a & b, three_valued_and),
        BinaryOp::Or => bitwise(result, |a, b| a | b, three_valued_or),
        BinaryOp::ExclusiveOr => bitwise(result, |a, b| a ^ b, |a, b| match (a, b) {
            (Some(a), Some(b)) => Value::Bool(a ^ b),
            _ => Value::Null,
        }),
        BinaryOp::ArrayIndex => Arc::new(|a: &Value, i: &Value| match (a, i.as_i128()) {
            (Value::Array(items), Some(i)) => usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        _ => {
            return Err(TypeError::UndefinedOperator {
                op: op.symbol(),
                operands: vec![left.clone(), right.clone()],
            })
        }
    };
    Ok(f)
}

/// Lifted equality: `null == null`, `null` differs from any value, floats
/// compare by IEEE rules, reference types by identity.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::F32(_) | Value::F64(_), _) | (_, Value::F32(_) | Value::F64(_)) => a.as_f64() == b.as_f64(),
        _ => match (a.as_i128(), b.as_i128()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

/// Ordering of two non-null values of an ordered type.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        (Value::Duration(x), Value::Duration(y)) => Some(x.cmp(y)),
        (Value::F32(_) | Value::F64(_), _) | (_, Value::F32(_) | Value::F64(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        _ => Some(a.as_i128()?.cmp(&b.as_i128()?)),
    }
}

fn relational(test: fn(Ordering) -> bool) -> BinaryFn {
    Arc::new(move |a: &Value, b: &Value| Value::Bool(compare(a, b).is_some_and(test)))
}

fn bitwise(
    result: ValueType,
    int_op: fn(i128, i128) -> i128,
    bool_op: fn(Option<bool>, Option<bool>) -> Value,
) -> BinaryFn {
    if result.is_boolean() {
        return Arc::new(move |a: &Value, b: &Value| bool_op(a.as_bool(), b.as_bool()));
    }
    Arc::new(move |a: &Value, b: &Value| match (a.as_i128(), b.as_i128()) {
        (Some(x), Some(y)) => Value::from_i128(&result, int_op(x, y)),
        _ => Value::Null,
    })
}

fn three_valued_and(a: Option<bool>, b: Option<bool>) -> Value {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Value::Bool(false),
        (Some(true), Some(true)) => Value::Bool(true),
        _ => Value::Null,
    }
}

fn three_valued_or(a: Option<bool>, b: Option<bool>) -> Value {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Value::Bool(true),
        (Some(false), Some(false)) => Value::Bool(false),
        _ => Value::Null,
    }
}

/// Explicit conversion to `target`. Integers wrap to the target width,
/// floats truncate toward zero, `null` stays `null`.
pub fn convert(value: &Value, target: &ValueType) -> Value {
    if value.is_null() || target.is_reference_type() {
        return value.clone();
    }
    let t = target.non_nullable();
    match t {
        ValueType::F32 => value.as_f64().map_or(Value::Null, |f| Value::F32(f as f32)),
        ValueType::F64 => value.as_f64().map_or(Value::Null, Value::F64),
        _ if numeric::is_integral(t) || matches!(t, ValueType::Enum(_)) => {
            let n = match value {
                Value::F32(_) | Value::F64(_) => value.as_f64().map(|f| f.trunc() as i128),
                other => other.as_i128(),
            };
            n.map_or(Value::Null, |n| Value::from_i128(t, n))
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn opt_bool() -> ValueType {
        ValueType::nullable(ValueType::Bool)
    }

    #[rstest]
    #[case(Value::Null, Value::Null, true)]
    #[case(Value::Null, Value::I32(0), false)]
    #[case(Value::I32(4), Value::I32(4), true)]
    #[case(Value::F64(f64::NAN), Value::F64(f64::NAN), false)]
    #[case(Value::from("ab"), Value::from("ab"), true)]
    fn test_lifted_equality(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        let eq = build_binary(BinaryOp::Equal, &ValueType::I32, &ValueType::I32).unwrap();
        let ne = build_binary(BinaryOp::NotEqual, &ValueType::I32, &ValueType::I32).unwrap();
        assert_eq!(eq(&a, &b), Value::Bool(expected));
        assert_eq!(ne(&a, &b), Value::Bool(!expected));
    }

    #[rstest]
    #[case(BinaryOp::LessThan, Value::I32(1), Value::I32(2), true)]
    #[case(BinaryOp::GreaterThanOrEqual, Value::I32(2), Value::I32(2), true)]
    #[case(BinaryOp::GreaterThan, Value::Null, Value::I32(2), false)]
    #[case(BinaryOp::LessThanOrEqual, Value::I32(2), Value::Null, false)]
    #[case(BinaryOp::LessThan, Value::F64(f64::NAN), Value::F64(1.0), false)]
    fn test_relational_kernels(#[case] op: BinaryOp, #[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        let t = ValueType::nullable(ValueType::F64);
        let f = build_binary(op, &t, &t).unwrap();
        assert_eq!(f(&a, &b), Value::Bool(expected));
    }

    #[rstest]
    #[case(Value::Bool(false), Value::Null, Value::Bool(false))]
    #[case(Value::Bool(true), Value::Null, Value::Null)]
    #[case(Value::Bool(true), Value::Bool(true), Value::Bool(true))]
    fn test_nullable_boolean_and(#[case] a: Value, #[case] b: Value, #[case] expected: Value) {
        let f = build_binary(BinaryOp::And, &opt_bool(), &opt_bool()).unwrap();
        assert_eq!(f(&a, &b), expected);
        assert_eq!(f(&b, &a), expected);
    }

    #[test]
    fn test_integer_bitwise_wraps_to_result_type() {
        let f = build_binary(BinaryOp::ExclusiveOr, &ValueType::I64, &ValueType::I64).unwrap();
        assert_eq!(f(&Value::I64(0b1100), &Value::I64(0b1010)), Value::I64(0b0110));
        let f = build_binary(BinaryOp::Or, &ValueType::U8, &ValueType::U8).unwrap();
        assert_eq!(f(&Value::U8(1), &Value::U8(2)), Value::I32(3));
    }

    #[test]
    fn test_array_index_is_total() {
        let t = ValueType::array(ValueType::Str);
        let f = build_binary(BinaryOp::ArrayIndex, &t, &ValueType::I32).unwrap();
        let arr = Value::array([Value::from("a"), Value::from("b")]);
        assert_eq!(f(&arr, &Value::I32(1)), Value::from("b"));
        assert!(f(&arr, &Value::I32(2)).is_null());
        assert!(f(&arr, &Value::I32(-1)).is_null());
        assert!(f(&Value::Null, &Value::I32(0)).is_null());
    }

    #[test]
    fn test_unary_kernels() {
        let not = build_unary(UnaryOp::Not, &opt_bool(), &opt_bool()).unwrap();
        assert_eq!(not(&Value::Bool(true)), Value::Bool(false));
        assert!(not(&Value::Null).is_null());

        let neg = build_unary(UnaryOp::Negate, &ValueType::I32, &ValueType::I32).unwrap();
        assert_eq!(neg(&Value::I32(i32::MIN)), Value::I32(i32::MIN));

        let len = build_unary(UnaryOp::ArrayLength, &ValueType::array(ValueType::I32), &ValueType::I32).unwrap();
        assert_eq!(len(&Value::array([Value::I32(1), Value::I32(2)])), Value::I32(2));
    }

    #[test]
    fn test_conversion_kernel() {
        let to_i64 = build_unary(UnaryOp::Convert, &ValueType::I32, &ValueType::nullable(ValueType::I64)).unwrap();
        assert_eq!(to_i64(&Value::I32(-3)), Value::I64(-3));
        assert!(to_i64(&Value::Null).is_null());
        assert_eq!(convert(&Value::F64(2.9), &ValueType::I32), Value::I32(2));
        assert_eq!(convert(&Value::I32(300), &ValueType::U8), Value::U8(44));
        assert!(build_unary(UnaryOp::Convert, &ValueType::Str, &ValueType::I32).is_err());
    }

    #[test]
    fn test_unsupported_binary_kernel_is_an_error() {
        assert!(build_binary(BinaryOp::LessThan, &ValueType::Str, &ValueType::Str).is_err());
        assert!(build_binary(BinaryOp::Add, &ValueType::I32, &ValueType::I32).is_err());
    }
}
