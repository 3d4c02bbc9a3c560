//! Direct evaluation of a predicate AST against a semi-structured record.
//!
//! Records stay as `serde_json::Value`; nothing is deserialized into a
//! concrete type. Results match what the compiled `$filter` selects on the
//! server, apart from the collation and null-ordering differences listed in
//! the crate's design notes.

mod compare;

use crate::compile::BooleanFormat;
use crate::error::QueryError;
use crate::predicate::{CallKind, CompareOp, Expr, FieldPath, Literal, LogicalOp};
use compare::{values_equal, values_order, Operand};
use serde_json::Value;
use std::cmp::Ordering;

/// Resolve a member path against the current scope. The empty path is the
/// scope itself; a missing member resolves to `None` (read as null).
#[inline]
pub fn resolve_path<'a>(scope: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = Some(scope);
    for part in path.segments() {
        match current {
            Some(Value::Object(map)) => current = map.get(part.as_str()),
            _ => return None,
        }
    }
    current
}

#[derive(Clone, Debug, Default)]
pub struct RecordEvaluator {
    booleans: BooleanFormat,
}

impl RecordEvaluator {
    pub fn new(booleans: BooleanFormat) -> Self {
        Self { booleans }
    }

    pub fn evaluate(&self, expr: &Expr, record: &Value) -> Result<bool, QueryError> {
        self.eval_bool(expr, record)
    }

    fn eval_bool(&self, expr: &Expr, scope: &Value) -> Result<bool, QueryError> {
        match expr {
            Expr::Literal { value } => match value {
                Literal::Boolean(b) => Ok(*b),
                _ => Err(QueryError::EvaluationUnsupported {
                    node_kind: "literal",
                }),
            },
            Expr::Field { path } => match resolve_path(scope, path) {
                Some(Value::Bool(b)) => Ok(*b),
                Some(Value::String(s)) => {
                    self.booleans
                        .parse_label(s)
                        .ok_or(QueryError::EvaluationUnsupported { node_kind: "field" })
                }
                None | Some(Value::Null) => Ok(false),
                Some(_) => Err(QueryError::EvaluationUnsupported { node_kind: "field" }),
            },
            Expr::Compare { op, left, right } => {
                let left = self.operand(left, scope)?;
                let right = self.operand(right, scope)?;
                Ok(self.compare(*op, left, right))
            }
            Expr::Logical { op, left, right } => match op {
                LogicalOp::And => Ok(self.eval_bool(left, scope)? && self.eval_bool(right, scope)?),
                LogicalOp::Or => Ok(self.eval_bool(left, scope)? || self.eval_bool(right, scope)?),
            },
            Expr::Not { operand } => Ok(!self.eval_bool(operand, scope)?),
            Expr::Call { kind, target, args } => self.eval_call(*kind, target, args, scope),
        }
    }

    fn operand<'a>(&self, expr: &'a Expr, scope: &'a Value) -> Result<Operand<'a>, QueryError> {
        match expr {
            Expr::Literal { value } => Ok(Operand::Literal(value)),
            Expr::Field { path } => Ok(resolve_path(scope, path).map_or(Operand::Missing, Operand::Json)),
            other => Err(QueryError::EvaluationUnsupported {
                node_kind: other.node_kind(),
            }),
        }
    }

    fn compare(&self, op: CompareOp, left: Operand<'_>, right: Operand<'_>) -> bool {
        match op {
            CompareOp::Eq => values_equal(left, right, &self.booleans),
            CompareOp::Ne => !values_equal(left, right, &self.booleans),
            CompareOp::Gt => values_order(left, right, &self.booleans) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(
                values_order(left, right, &self.booleans),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CompareOp::Lt => values_order(left, right, &self.booleans) == Some(Ordering::Less),
            CompareOp::Le => matches!(
                values_order(left, right, &self.booleans),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }

    fn eval_call(
        &self,
        kind: CallKind,
        target: &Expr,
        args: &[Expr],
        scope: &Value,
    ) -> Result<bool, QueryError> {
        let unsupported = || QueryError::EvaluationUnsupported {
            node_kind: kind.name(),
        };
        let Expr::Field { path } = target else {
            return Err(unsupported());
        };
        let value = resolve_path(scope, path);

        match kind {
            CallKind::Contains | CallKind::StartsWith | CallKind::EndsWith => {
                let needle = match args {
                    [Expr::Literal {
                        value: Literal::String(s),
                    }] => s.to_lowercase(),
                    _ => return Err(unsupported()),
                };
                let Some(Value::String(haystack)) = value else {
                    return Ok(false);
                };
                let haystack = haystack.to_lowercase();
                Ok(match kind {
                    CallKind::Contains => haystack.contains(&needle),
                    CallKind::StartsWith => haystack.starts_with(&needle),
                    _ => haystack.ends_with(&needle),
                })
            }
            CallKind::Any => {
                let Some(Value::Array(items)) = value else {
                    return Ok(false);
                };
                match args {
                    [] => Ok(!items.is_empty()),
                    [predicate] => {
                        for item in items {
                            if self.eval_bool(predicate, item)? {
                                return Ok(true);
                            }
                        }
                        Ok(false)
                    }
                    _ => Err(unsupported()),
                }
            }
            CallKind::AnyMatch => {
                let wanted = match args {
                    [Expr::Literal { value }] => value,
                    _ => return Err(unsupported()),
                };
                let Some(Value::Array(items)) = value else {
                    return Ok(false);
                };
                Ok(items.iter().any(|item| {
                    values_equal(Operand::Json(item), Operand::Literal(wanted), &self.booleans)
                }))
            }
            CallKind::InList => {
                let candidates = args
                    .iter()
                    .map(|arg| match arg {
                        Expr::Literal { value } => Some(value),
                        _ => None,
                    })
                    .collect::<Option<Vec<&Literal>>>()
                    .ok_or_else(unsupported)?;
                let actual = value.map_or(Operand::Missing, Operand::Json);
                Ok(candidates.into_iter().any(|candidate| {
                    values_equal(actual, Operand::Literal(candidate), &self.booleans)
                }))
            }
        }
    }
}
