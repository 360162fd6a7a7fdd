//! Rule for numeric promotion of operands.
use crate::store::ValueType;

/// Integer types, including `char` (which promotes like `u16`).
pub fn is_integral(ty: &ValueType) -> bool {
    matches!(
        ty.non_nullable(),
        ValueType::I8
            | ValueType::I16
            | ValueType::I32
            | ValueType::I64
            | ValueType::U8
            | ValueType::U16
            | ValueType::U32
            | ValueType::U64
            | ValueType::Char
    )
}

pub fn is_float(ty: &ValueType) -> bool {
    matches!(ty.non_nullable(), ValueType::F32 | ValueType::F64)
}

pub fn is_numeric(ty: &ValueType) -> bool {
    is_integral(ty) || is_float(ty)
}

fn is_signed(ty: &ValueType) -> bool {
    matches!(ty, ValueType::I8 | ValueType::I16 | ValueType::I32 | ValueType::I64)
}

/// Binary numeric promotion over the non-nullable parts of `left` and `right`.
///
/// Floats win (`f64` over `f32`). Among integers, `u64` cannot be mixed with a
/// signed type, `u32` mixed with a signed type widens to `i64`, and anything
/// narrower than 32 bits widens to `i32`.
pub fn promote(left: &ValueType, right: &ValueType) -> Option<ValueType> {
    let (l, r) = (left.non_nullable(), right.non_nullable());
    if !is_numeric(l) || !is_numeric(r) {
        return None;
    }

    let either = |t: ValueType| *l == t || *r == t;
    let signed = is_signed(l) || is_signed(r);

    Some(if either(ValueType::F64) {
        ValueType::F64
    } else if either(ValueType::F32) {
        ValueType::F32
    } else if either(ValueType::U64) {
        if signed {
            return None;
        }
        ValueType::U64
    } else if either(ValueType::I64) {
        ValueType::I64
    } else if either(ValueType::U32) {
        if signed { ValueType::I64 } else { ValueType::U32 }
    } else {
        ValueType::I32
    })
}

/// Unary promotion for `~` and unary `+`: sub-32-bit integers widen to `i32`.
pub fn promote_unary(operand: &ValueType) -> Option<ValueType> {
    let t = operand.non_nullable();
    match t {
        ValueType::I8 | ValueType::I16 | ValueType::U8 | ValueType::U16 | ValueType::Char => Some(ValueType::I32),
        _ if is_numeric(t) => Some(t.clone()),
        _ => None,
    }
}

/// Promotion for negation: `u32` widens to `i64`, `u64` has no negation.
pub fn promote_negate(operand: &ValueType) -> Option<ValueType> {
    match operand.non_nullable() {
        ValueType::U32 => Some(ValueType::I64),
        ValueType::U64 => None,
        _ => promote_unary(operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ValueType::I32, ValueType::I32, Some(ValueType::I32))]
    #[case(ValueType::U8, ValueType::I16, Some(ValueType::I32))]
    #[case(ValueType::I32, ValueType::I64, Some(ValueType::I64))]
    #[case(ValueType::U32, ValueType::I32, Some(ValueType::I64))]
    #[case(ValueType::U32, ValueType::U16, Some(ValueType::U32))]
    #[case(ValueType::U64, ValueType::U8, Some(ValueType::U64))]
    #[case(ValueType::U64, ValueType::I8, None)]
    #[case(ValueType::I64, ValueType::F32, Some(ValueType::F32))]
    #[case(ValueType::F32, ValueType::F64, Some(ValueType::F64))]
    #[case(ValueType::Char, ValueType::Char, Some(ValueType::I32))]
    #[case(ValueType::nullable(ValueType::I32), ValueType::I64, Some(ValueType::I64))]
    #[case(ValueType::Str, ValueType::I32, None)]
    #[case(ValueType::Bool, ValueType::Bool, None)]
    fn test_binary_promotion(#[case] l: ValueType, #[case] r: ValueType, #[case] expected: Option<ValueType>) {
        assert_eq!(promote(&l, &r), expected);
        assert_eq!(promote(&r, &l), expected);
    }

    #[rstest]
    #[case(ValueType::U8, Some(ValueType::I32))]
    #[case(ValueType::I64, Some(ValueType::I64))]
    #[case(ValueType::U32, Some(ValueType::I64))]
    #[case(ValueType::U64, None)]
    #[case(ValueType::Bool, None)]
    fn test_negate_promotion(#[case] t: ValueType, #[case] expected: Option<ValueType>) {
        assert_eq!(promote_negate(&t), expected);
    }
}
