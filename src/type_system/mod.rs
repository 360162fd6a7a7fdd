//! Static typing for compiled expressions.
//!
//! Expression builders use these rules to promote numeric operands and infer
//! result types; the compiler uses them again to reject operators that are
//! not defined for their operand types.

pub use self::error::TypeError;
pub use self::rules::numeric::{is_float, is_integral, is_numeric, promote};
pub use self::rules::operators::{binary_result, check_conversion, is_ordered, unary_result};

// --- MODULE DECLARATIONS ---
mod error;
pub mod rules {
    pub mod numeric;
    pub mod operators;
}
