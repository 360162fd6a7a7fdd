//! Defines the error types for the type system module.
use crate::store::ValueType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("operator `{op}` is not defined for ({})", list(.operands))]
    UndefinedOperator { op: &'static str, operands: Vec<ValueType> },
    #[error("cannot convert {from} to {to}")]
    InvalidConversion { from: ValueType, to: ValueType },
}

fn list(types: &[ValueType]) -> String {
    types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
