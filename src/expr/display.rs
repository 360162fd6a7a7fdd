use super::{BinaryOp, Expr, ExprKind, Lambda, MemberTarget, UnaryOp};
use std::fmt;

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Parameter { name } => f.write_str(name),
            ExprKind::Constant(value) => write!(f, "{:?}", value),
            ExprKind::Member { target: MemberTarget::Instance(target), name, .. } => write!(f, "{}.{}", target, name),
            ExprKind::Member { target: MemberTarget::Static(owner), name, .. } => write!(f, "{}::{}", owner, name),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not | UnaryOp::Negate | UnaryOp::UnaryPlus => write!(f, "{}{}", op.symbol(), operand),
                UnaryOp::ArrayLength => write!(f, "{}.len()", operand),
                UnaryOp::Convert => write!(f, "({} as {})", operand, self.ty()),
                UnaryOp::TypeAs => write!(f, "({} as? {})", operand, self.ty()),
            },
            ExprKind::Binary { op: BinaryOp::ArrayIndex, left, right } => write!(f, "{}[{}]", left, right),
            ExprKind::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            ExprKind::Conditional { test, if_true, if_false } => {
                write!(f, "({} ? {} : {})", test, if_true, if_false)
            }
            ExprKind::Call { target, method, args } => {
                if let Some(t) = target {
                    write!(f, "{}.", t)?;
                }
                write!(f, "{}(", method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({}: {})", self, self.ty())
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.parameter, self.body)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lambda({})", self)
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::Expr;
    use crate::store::ValueType;

    #[test]
    fn test_rendering() {
        let p = Expr::parameter("p", ValueType::object("Person"));
        let name = p.member("name", ValueType::object("Name"));
        let first_len = name.member("first", ValueType::Str).member("length", ValueType::I32);
        let body = name.clone().eq(Expr::null()).or(first_len.le(Expr::constant(3)));
        let lambda = crate::expr::Lambda::new(p, body);
        assert_eq!(
            lambda.to_string(),
            "p => ((p.name == null) | (p.name.first.length <= 3))"
        );
    }

    #[test]
    fn test_static_and_conversion_rendering() {
        let s = Expr::static_member("Clock", "now", ValueType::Timestamp);
        assert_eq!(s.to_string(), "Clock::now");
        let c = Expr::convert(Expr::constant(3), ValueType::I64);
        assert_eq!(c.to_string(), "(3 as i64)");
    }
}
