use super::cache::{self, NodeArgs, NodeCtor};
use crate::error::CompileError;
use crate::expr::{BinaryOp, Expr, ExprKind, ExprNode, Lambda, MemberTarget, UnaryOp};
use crate::store::{NodeId, NodeKindTag, NodeMetadata, Registry, ValueType};
use std::collections::HashMap;

/// A compiled node graph: the arena plus its two distinguished nodes.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub registry: Registry,
    pub parameter: NodeId,
    pub body: NodeId,
}

/// Translates one lambda into a node graph.
///
/// Sub-expressions are memoized by identity, so an `Expr` reachable along
/// several paths becomes one shared node. Each expression's kind is checked
/// before its children are visited; the first unsupported shape found in
/// depth-first order is the one reported.
pub struct Compiler<'a> {
    lambda: &'a Lambda,
    registry: Registry,
    memo: HashMap<*const ExprNode, NodeId>,
}

impl<'a> Compiler<'a> {
    pub fn new(lambda: &'a Lambda) -> Self {
        Self { lambda, registry: Registry::new(), memo: HashMap::new() }
    }

    pub fn compile(mut self) -> Result<CompiledGraph, CompileError> {
        let lambda = self.lambda;

        // 1. The parameter node always comes first (NodeId 0)
        let param_expr = &lambda.parameter;
        let ExprKind::Parameter { name } = param_expr.kind() else {
            return Err(CompileError::Unsupported { expr: param_expr.clone() });
        };
        let ctor = cache::constructor(NodeKindTag::Parameter, &[param_expr.ty().clone()]);
        let parameter = self.add(&ctor, NodeArgs::Parameter, &[], name.to_string(), param_expr);
        self.memo.insert(param_expr.id(), parameter);

        // 2. Body, depth-first
        let body = self.visit(&lambda.body)?;

        log::debug!(
            "compiled `{}` into {} nodes ({} shared)",
            lambda,
            self.registry.count(),
            self.registry.shared_nodes().count()
        );
        Ok(CompiledGraph { registry: self.registry, parameter, body })
    }

    fn visit(&mut self, expr: &Expr) -> Result<NodeId, CompileError> {
        if let Some(&id) = self.memo.get(&expr.id()) {
            return Ok(id);
        }

        let id = match expr.kind() {
            ExprKind::Parameter { .. } => {
                // The lambda's own parameter is memoized up front.
                return Err(CompileError::UnboundParameter { expr: expr.clone() });
            }
            ExprKind::Constant(value) => {
                let ctor = cache::constructor(NodeKindTag::Constant, &[expr.ty().clone()]);
                self.add(&ctor, NodeArgs::Constant(value.clone()), &[], format!("{:?}", value), expr)
            }
            ExprKind::Member { target: MemberTarget::Static(_), .. } => {
                return Err(CompileError::StaticMember { expr: expr.clone() });
            }
            ExprKind::Member { target: MemberTarget::Instance(target), name, accessor } => {
                let object = self.visit(target)?;
                let ctor = cache::constructor(NodeKindTag::MemberAccess, &[target.ty().clone(), expr.ty().clone()]);
                let args = NodeArgs::Member { member: name.as_ref().into(), accessor: accessor.clone() };
                self.add(&ctor, args, &[object], format!(".{}", name), expr)
            }
            ExprKind::Unary { op, operand } => {
                if !matches!(op, UnaryOp::Not | UnaryOp::Negate | UnaryOp::ArrayLength | UnaryOp::Convert) {
                    return Err(CompileError::Unsupported { expr: expr.clone() });
                }
                let input = self.visit(operand)?;
                let kernel = cache::unary_operator(*op, operand.ty(), expr.ty())
                    .map_err(|source| CompileError::UndefinedOperator { expr: expr.clone(), source })?;
                let ctor = cache::constructor(NodeKindTag::UnaryOp, &[operand.ty().clone(), expr.ty().clone()]);
                let label = match op {
                    UnaryOp::Convert => format!("as {}", expr.ty()),
                    other => other.symbol().to_string(),
                };
                self.add(&ctor, NodeArgs::Unary { op: *op, kernel }, &[input], label, expr)
            }
            ExprKind::Binary { op, left, right } => {
                let tag = binary_tag(*op, left.ty(), right.ty()).map_err(|reject| reject(expr.clone()))?;
                let l = self.visit(left)?;
                let r = self.visit(right)?;
                let kernel = cache::binary_operator(*op, left.ty(), right.ty())
                    .map_err(|source| CompileError::UndefinedOperator { expr: expr.clone(), source })?;

                let mut type_args = vec![left.ty().clone(), right.ty().clone()];
                if tag.arity() == 3 {
                    type_args.push(expr.ty().clone());
                }
                let ctor = cache::constructor(tag, &type_args);
                self.add(&ctor, NodeArgs::Binary { op: *op, kernel }, &[l, r], op.symbol().to_string(), expr)
            }
            ExprKind::Conditional { .. } | ExprKind::Call { .. } => {
                return Err(CompileError::Unsupported { expr: expr.clone() });
            }
        };

        self.memo.insert(expr.id(), id);
        Ok(id)
    }

    fn add(&mut self, ctor: &NodeCtor, args: NodeArgs, inputs: &[NodeId], label: String, expr: &Expr) -> NodeId {
        let meta = NodeMetadata { label, source: expr.to_string() };
        self.registry.add_node(ctor.instantiate(args), expr.ty().clone(), ctor.policy, inputs, meta)
    }
}

type Rejection = fn(Expr) -> CompileError;

/// The binary dispatch table.
fn binary_tag(op: BinaryOp, left: &ValueType, right: &ValueType) -> Result<NodeKindTag, Rejection> {
    let logical = left.is_boolean() && right.is_boolean();
    Ok(match op {
        BinaryOp::Equal => NodeKindTag::BinaryEqual,
        BinaryOp::NotEqual => NodeKindTag::BinaryNotEqual,
        BinaryOp::LessThan | BinaryOp::LessThanOrEqual | BinaryOp::GreaterThan | BinaryOp::GreaterThanOrEqual => {
            NodeKindTag::BinaryRelational
        }
        BinaryOp::And if logical => NodeKindTag::BinaryLogicalAnd,
        BinaryOp::Or if logical => NodeKindTag::BinaryLogicalOr,
        BinaryOp::And | BinaryOp::Or | BinaryOp::ExclusiveOr | BinaryOp::ArrayIndex => NodeKindTag::BinaryDefault,
        BinaryOp::AndAlso | BinaryOp::OrElse => return Err(|expr| CompileError::ShortCircuit { expr }),
        _ => return Err(|expr| CompileError::Unsupported { expr }),
    })
}
