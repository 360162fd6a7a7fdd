//! Live, incrementally evaluated bindings over object graphs.
//!
//! A [`Lambda`] over a restricted expression tree (member paths, constants,
//! unary and binary operators) is compiled once into a [`Prototype`]. Each
//! [`RootBinding`] cloned from it owns an independent node graph that
//! recomputes only what changed when a bound object reports a member change,
//! and tells its observers whenever the final result changes.

pub mod analysis;
pub mod binding;
pub mod compute;
pub mod display;
pub mod error;
pub mod expr;
pub mod store;
pub mod type_system;

pub use binding::{ObserverId, Prototype, RootBinding};
pub use compute::ledger::{MaybeResult, ResultChange, TriState};
pub use error::{CompileError, InvalidResultAccess};
pub use expr::{BinaryOp, Expr, Lambda, UnaryOp};
pub use store::{BindingMode, ChangeNotifier, NotifyChanged, Object, ObjectRef, PropertyBag, Value, ValueType};

/// Compiles `lambda` into a prototype, or reports the first sub-expression
/// outside the supported grammar.
pub fn compile(lambda: &Lambda) -> Result<Prototype, CompileError> {
    Prototype::compile(lambda)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_rejections_name_the_offending_expression() {
        let p = Expr::parameter("p", ValueType::object("Person"));
        let adult = p.member("adult", ValueType::Bool);

        let err = compile(&Lambda::new(p.clone(), adult.clone().and_also(Expr::constant(true)))).unwrap_err();
        assert!(matches!(err, CompileError::ShortCircuit { .. }));
        let err = compile(&Lambda::new(p.clone(), adult.clone().or_else(Expr::constant(false)))).unwrap_err();
        assert!(matches!(err, CompileError::ShortCircuit { .. }));

        let limit = Expr::static_member("Limits", "Max", ValueType::I32);
        let err = compile(&Lambda::new(p.clone(), p.member("age", ValueType::I32).lt(limit.clone()))).unwrap_err();
        assert!(matches!(err, CompileError::StaticMember { .. }));
        assert!(err.expr().ptr_eq(&limit));
        assert_eq!(err.to_string(), "static member access cannot be observed for changes: Limits::Max");
    }

    #[test]
    fn test_compile_bind_and_observe() {
        let p = Expr::parameter("p", ValueType::object("Person"));
        let proto = compile(&Lambda::new(p.clone(), p.member("adult", ValueType::Bool).not())).unwrap();
        let binding = proto.clone_binding(BindingMode::default());

        let alice = Rc::new(PropertyBag::new("Person").with("adult", true));
        binding.bind(Value::object(alice.clone()));
        assert_eq!(binding.result(), MaybeResult::some(false));
        alice.set("adult", false);
        assert_eq!(binding.result().value(), Ok(&Value::Bool(true)));
    }
}
