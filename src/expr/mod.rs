//! The restricted expression tree a binding is compiled from.
//!
//! An [`Expr`] is reference counted: cloning it shares the node, and the
//! compiler treats two uses of the same `Expr` as one shared subexpression.
//! Builders infer each node's static type and insert the conversions needed
//! to bring numeric operands to a common type.

mod display;

use crate::store::{Value, ValueType};
use crate::type_system::{self, rules::numeric};
use std::rc::Rc;
use std::sync::Arc;

/// Reads a member from an already-evaluated target value.
pub type Accessor = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Reads `name` through [`Value::builtin_member`]: object members first, then
/// the `length` of strings and arrays and the `value` of a nullable.
pub fn default_accessor(name: &str) -> Accessor {
    let name: Arc<str> = name.into();
    Arc::new(move |target: &Value| target.builtin_member(&name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Not,
    Negate,
    ArrayLength,
    Convert,
    UnaryPlus,
    TypeAs,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::ArrayLength => "len",
            UnaryOp::Convert => "convert",
            UnaryOp::UnaryPlus => "+",
            UnaryOp::TypeAs => "as",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    ExclusiveOr,
    AndAlso,
    OrElse,
    ArrayIndex,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Coalesce,
    LeftShift,
    RightShift,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::ExclusiveOr => "^",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::ArrayIndex => "[]",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Coalesce => "??",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan | BinaryOp::LessThanOrEqual | BinaryOp::GreaterThan | BinaryOp::GreaterThanOrEqual
        )
    }

    /// Operators whose numeric operands are brought to a common type.
    fn promotes_operands(&self) -> bool {
        !matches!(
            self,
            BinaryOp::AndAlso
                | BinaryOp::OrElse
                | BinaryOp::ArrayIndex
                | BinaryOp::Coalesce
                | BinaryOp::LeftShift
                | BinaryOp::RightShift
        )
    }
}

/// The owner of a member access.
#[derive(Clone)]
pub enum MemberTarget {
    Instance(Expr),
    /// A static member of the named type. Never compilable.
    Static(Rc<str>),
}

#[derive(Clone)]
pub enum ExprKind {
    Parameter { name: Rc<str> },
    Constant(Value),
    Member { target: MemberTarget, name: Rc<str>, accessor: Accessor },
    Unary { op: UnaryOp, operand: Expr },
    Binary { op: BinaryOp, left: Expr, right: Expr },
    Conditional { test: Expr, if_true: Expr, if_false: Expr },
    Call { target: Option<Expr>, method: Rc<str>, args: Vec<Expr> },
}

pub struct ExprNode {
    kind: ExprKind,
    ty: ValueType,
}

#[derive(Clone)]
pub struct Expr(Rc<ExprNode>);

impl Expr {
    fn make(kind: ExprKind, ty: ValueType) -> Self {
        Expr(Rc::new(ExprNode { kind, ty }))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// The static type of the value this expression produces.
    pub fn ty(&self) -> &ValueType {
        &self.0.ty
    }

    /// Identity of the underlying node; equal for clones of one `Expr`.
    pub fn id(&self) -> *const ExprNode {
        Rc::as_ptr(&self.0)
    }

    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(self.kind(), ExprKind::Constant(Value::Null))
    }

    // --- Leaves ---

    pub fn parameter(name: &str, ty: ValueType) -> Self {
        Self::make(ExprKind::Parameter { name: name.into() }, ty)
    }

    /// A constant typed by its value. `null` is typed as a plain object
    /// reference; comparison builders retype it to the other operand.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = match &value {
            Value::Array(items) => ValueType::array(
                items.iter().find_map(Value::natural_type).unwrap_or_else(|| ValueType::object("object")),
            ),
            v => v.natural_type().unwrap_or_else(|| ValueType::object("object")),
        };
        Self::make(ExprKind::Constant(value), ty)
    }

    pub fn constant_of(value: impl Into<Value>, ty: ValueType) -> Self {
        Self::make(ExprKind::Constant(value.into()), ty)
    }

    pub fn null() -> Self {
        Self::constant(Value::Null)
    }

    // --- Member access ---

    pub fn member(&self, name: &str, ty: ValueType) -> Self {
        self.member_with(name, ty, default_accessor(name))
    }

    pub fn member_with(&self, name: &str, ty: ValueType, accessor: Accessor) -> Self {
        Self::make(
            ExprKind::Member { target: MemberTarget::Instance(self.clone()), name: name.into(), accessor },
            ty,
        )
    }

    pub fn static_member(owner: &str, name: &str, ty: ValueType) -> Self {
        Self::make(
            ExprKind::Member {
                target: MemberTarget::Static(owner.into()),
                name: name.into(),
                accessor: Arc::new(|_: &Value| Value::Null),
            },
            ty,
        )
    }

    // --- Unary ---

    /// Builds `op operand`. When the operator is not defined for the operand
    /// type the operand type is kept; compiling the result reports the error.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let ty = type_system::unary_result(op, operand.ty()).unwrap_or_else(|_| operand.ty().clone());
        Self::make(ExprKind::Unary { op, operand }, ty)
    }

    pub fn convert(operand: Expr, ty: ValueType) -> Self {
        Self::make(ExprKind::Unary { op: UnaryOp::Convert, operand }, ty)
    }

    pub fn type_as(operand: Expr, ty: ValueType) -> Self {
        Self::make(ExprKind::Unary { op: UnaryOp::TypeAs, operand }, ty)
    }

    pub fn not(self) -> Self {
        Self::unary(UnaryOp::Not, self)
    }

    pub fn negate(self) -> Self {
        Self::unary(UnaryOp::Negate, self)
    }

    pub fn array_length(self) -> Self {
        Self::unary(UnaryOp::ArrayLength, self)
    }

    // --- Binary ---

    /// Builds `left op right`, retyping `null` constants and converting
    /// numeric operands to their promoted common type first.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let (left, right) = coerce_operands(op, left, right);
        let ty = type_system::binary_result(op, left.ty(), right.ty()).unwrap_or_else(|_| {
            if op.is_relational() || matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) {
                ValueType::Bool
            } else {
                left.ty().clone()
            }
        });
        Self::make(ExprKind::Binary { op, left, right }, ty)
    }

    pub fn eq(self, right: Expr) -> Self { Self::binary(BinaryOp::Equal, self, right) }
    pub fn ne(self, right: Expr) -> Self { Self::binary(BinaryOp::NotEqual, self, right) }
    pub fn lt(self, right: Expr) -> Self { Self::binary(BinaryOp::LessThan, self, right) }
    pub fn le(self, right: Expr) -> Self { Self::binary(BinaryOp::LessThanOrEqual, self, right) }
    pub fn gt(self, right: Expr) -> Self { Self::binary(BinaryOp::GreaterThan, self, right) }
    pub fn ge(self, right: Expr) -> Self { Self::binary(BinaryOp::GreaterThanOrEqual, self, right) }
    pub fn and(self, right: Expr) -> Self { Self::binary(BinaryOp::And, self, right) }
    pub fn or(self, right: Expr) -> Self { Self::binary(BinaryOp::Or, self, right) }
    pub fn xor(self, right: Expr) -> Self { Self::binary(BinaryOp::ExclusiveOr, self, right) }
    pub fn and_also(self, right: Expr) -> Self { Self::binary(BinaryOp::AndAlso, self, right) }
    pub fn or_else(self, right: Expr) -> Self { Self::binary(BinaryOp::OrElse, self, right) }
    pub fn index(self, right: Expr) -> Self { Self::binary(BinaryOp::ArrayIndex, self, right) }

    // --- Shapes outside the bindable grammar ---

    pub fn conditional(test: Expr, if_true: Expr, if_false: Expr) -> Self {
        let ty = if_true.ty().clone();
        Self::make(ExprKind::Conditional { test, if_true, if_false }, ty)
    }

    pub fn call(target: Option<Expr>, method: &str, args: Vec<Expr>, ty: ValueType) -> Self {
        Self::make(ExprKind::Call { target, method: method.into(), args }, ty)
    }
}

fn coerce_operands(op: BinaryOp, mut left: Expr, mut right: Expr) -> (Expr, Expr) {
    // 1. `null` adopts the type of the other side
    if left.is_null_constant() && !right.is_null_constant() {
        left = Expr::constant_of(Value::Null, ValueType::nullable(right.ty().clone()));
    } else if right.is_null_constant() && !left.is_null_constant() {
        right = Expr::constant_of(Value::Null, ValueType::nullable(left.ty().clone()));
    }

    // 2. Numeric promotion, lifted when either side is nullable
    if !op.promotes_operands() {
        return (left, right);
    }
    let Some(common) = numeric::promote(left.ty(), right.ty()) else {
        return (left, right);
    };
    let target = common.lifted(left.ty().is_nullable() || right.ty().is_nullable());
    let widen = |e: Expr| if *e.ty() == target { e } else { Expr::convert(e, target.clone()) };
    (widen(left), widen(right))
}

/// A one-parameter function expression: the unit of compilation.
#[derive(Clone)]
pub struct Lambda {
    pub parameter: Expr,
    pub body: Expr,
}

impl Lambda {
    pub fn new(parameter: Expr, body: Expr) -> Self {
        Self { parameter, body }
    }

    pub fn result_type(&self) -> &ValueType {
        self.body.ty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Expr {
        Expr::parameter("p", ValueType::object("Person"))
    }

    #[test]
    fn test_numeric_operands_are_promoted() {
        let age = person().member("age", ValueType::nullable(ValueType::I32));
        let e = age.gt(Expr::constant(33i64));
        let ExprKind::Binary { left, right, .. } = e.kind() else { panic!("binary") };
        assert_eq!(left.ty(), &ValueType::nullable(ValueType::I64));
        assert_eq!(right.ty(), &ValueType::nullable(ValueType::I64));
        assert!(matches!(left.kind(), ExprKind::Unary { op: UnaryOp::Convert, .. }));
        assert_eq!(e.ty(), &ValueType::Bool);
    }

    #[test]
    fn test_null_adopts_other_operand_type() {
        let name = person().member("name", ValueType::object("Name"));
        let e = name.eq(Expr::null());
        let ExprKind::Binary { right, .. } = e.kind() else { panic!("binary") };
        assert_eq!(right.ty(), &ValueType::object("Name"));

        let age = person().member("age", ValueType::I32);
        let e = Expr::null().ne(age);
        let ExprKind::Binary { left, .. } = e.kind() else { panic!("binary") };
        assert_eq!(left.ty(), &ValueType::nullable(ValueType::I32));
    }

    #[test]
    fn test_shared_expr_identity() {
        let a = person().member("a", ValueType::object("A"));
        let shared = a.clone();
        assert!(a.ptr_eq(&shared));
        assert_eq!(a.id(), shared.id());
        assert!(!person().ptr_eq(&person()));
    }

    #[test]
    fn test_logical_operators_keep_boolean_type() {
        let flag = person().member("flag", ValueType::nullable(ValueType::Bool));
        let e = flag.clone().and(Expr::constant(true));
        assert_eq!(e.ty(), &ValueType::nullable(ValueType::Bool));
        assert_eq!(flag.not().ty(), &ValueType::nullable(ValueType::Bool));
    }
}
