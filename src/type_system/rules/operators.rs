//! Rule for operator result-type inference.
use super::numeric::{is_integral, promote, promote_negate, promote_unary};
use crate::expr::{BinaryOp, UnaryOp};
use crate::store::ValueType;
use crate::type_system::error::TypeError;

/// Types with a total order under the relational operators.
pub fn is_ordered(ty: &ValueType) -> bool {
    let t = ty.non_nullable();
    super::numeric::is_numeric(t)
        || matches!(t, ValueType::Timestamp | ValueType::Duration | ValueType::Enum(_))
}

fn undefined(op: &'static str, operands: &[&ValueType]) -> TypeError {
    TypeError::UndefinedOperator {
        op,
        operands: operands.iter().map(|t| (*t).clone()).collect(),
    }
}

pub fn unary_result(op: UnaryOp, operand: &ValueType) -> Result<ValueType, TypeError> {
    let lift = operand.is_nullable();
    let inner = operand.non_nullable();
    let result = match op {
        UnaryOp::Not if *inner == ValueType::Bool => Some(ValueType::Bool),
        UnaryOp::Not if is_integral(inner) && *inner != ValueType::Char => promote_unary(inner),
        UnaryOp::Not => None,
        UnaryOp::Negate => promote_negate(inner),
        UnaryOp::UnaryPlus => promote_unary(inner),
        UnaryOp::ArrayLength => match inner {
            ValueType::Array(_) => return Ok(ValueType::I32),
            _ => None,
        },
        UnaryOp::Convert | UnaryOp::TypeAs => None,
    };
    result.map(|t| t.lifted(lift)).ok_or_else(|| undefined(op.symbol(), &[operand]))
}

/// Validates an explicit conversion.
pub fn check_conversion(from: &ValueType, to: &ValueType) -> Result<(), TypeError> {
    let (f, t) = (from.non_nullable(), to.non_nullable());
    let numeric_like = |ty: &ValueType| super::numeric::is_numeric(ty) || matches!(ty, ValueType::Enum(_));
    let ok = f == t
        || (numeric_like(f) && numeric_like(t))
        || (from.is_reference_type() && to.is_reference_type());
    if ok {
        Ok(())
    } else {
        Err(TypeError::InvalidConversion { from: from.clone(), to: to.clone() })
    }
}

/// Result type of `left op right`. Numeric operands are expected to be
/// promoted to a common type already (the expression builders do this).
pub fn binary_result(op: BinaryOp, left: &ValueType, right: &ValueType) -> Result<ValueType, TypeError> {
    let lift = left.is_nullable() || right.is_nullable();
    let (l, r) = (left.non_nullable(), right.non_nullable());
    let same = l == r;

    let result = match op {
        BinaryOp::Equal | BinaryOp::NotEqual => {
            (same || (left.is_reference_type() && right.is_reference_type())).then_some(ValueType::Bool)
        }
        BinaryOp::LessThan | BinaryOp::LessThanOrEqual | BinaryOp::GreaterThan | BinaryOp::GreaterThanOrEqual => {
            (same && is_ordered(l)).then_some(ValueType::Bool)
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::ExclusiveOr => match l {
            _ if !same => None,
            ValueType::Bool | ValueType::Enum(_) => Some(l.clone().lifted(lift)),
            ValueType::Char => None,
            _ if is_integral(l) => promote(l, r).map(|t| t.lifted(lift)),
            _ => None,
        },
        BinaryOp::AndAlso | BinaryOp::OrElse => {
            (*left == ValueType::Bool && *right == ValueType::Bool).then_some(ValueType::Bool)
        }
        BinaryOp::ArrayIndex => match (left, right) {
            (ValueType::Array(element), ValueType::I32 | ValueType::I64) => Some((**element).clone()),
            _ => None,
        },
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
            match (l, r) {
                (ValueType::Str, _) | (_, ValueType::Str) if op == BinaryOp::Add => Some(ValueType::Str),
                (ValueType::Timestamp, ValueType::Duration) if matches!(op, BinaryOp::Add | BinaryOp::Subtract) => {
                    Some(ValueType::Timestamp.lifted(lift))
                }
                (ValueType::Timestamp, ValueType::Timestamp) if op == BinaryOp::Subtract => {
                    Some(ValueType::Duration.lifted(lift))
                }
                (ValueType::Duration, ValueType::Duration) if matches!(op, BinaryOp::Add | BinaryOp::Subtract) => {
                    Some(ValueType::Duration.lifted(lift))
                }
                _ => promote(l, r).map(|t| t.lifted(lift)),
            }
        }
        BinaryOp::LeftShift | BinaryOp::RightShift => match r {
            ValueType::I32 if is_integral(l) => promote_unary(l).map(|t| t.lifted(lift)),
            _ => None,
        },
        BinaryOp::Coalesce => {
            (left.is_nullable() || left.is_reference_type()).then(|| right.clone())
        }
    };

    result.ok_or_else(|| undefined(op.symbol(), &[left, right]))
}
