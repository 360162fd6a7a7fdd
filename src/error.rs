use crate::expr::Expr;
use crate::type_system::TypeError;
use thiserror::Error;

/// Raised while compiling an expression; carries the first offending
/// sub-expression.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("unsupported expression: {expr}")]
    Unsupported { expr: Expr },
    #[error("static member access cannot be observed for changes: {expr}")]
    StaticMember { expr: Expr },
    #[error("short-circuiting operators cannot combine absent operands: {expr}")]
    ShortCircuit { expr: Expr },
    #[error("{source}: {expr}")]
    UndefinedOperator { expr: Expr, source: TypeError },
    #[error("parameter is not the compiled lambda's own: {expr}")]
    UnboundParameter { expr: Expr },
}

impl CompileError {
    /// The sub-expression the compiler stopped at.
    pub fn expr(&self) -> &Expr {
        match self {
            CompileError::Unsupported { expr }
            | CompileError::StaticMember { expr }
            | CompileError::ShortCircuit { expr }
            | CompileError::UndefinedOperator { expr, .. }
            | CompileError::UnboundParameter { expr } => expr,
        }
    }
}

/// Reading the value of an absent result.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("the result is absent")]
pub struct InvalidResultAccess;
