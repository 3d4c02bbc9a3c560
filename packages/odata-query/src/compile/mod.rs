//! Renders a predicate AST into a `$filter` clause.
//!
//! Output is the raw clause text; percent-encoding is left to whoever places
//! it in a URL.

mod literal;

pub use literal::{
    format_datetime, format_literal, format_real, quote_string, BooleanFormat, NO_YES_TYPE,
};

use crate::error::QueryError;
use crate::predicate::{CallKind, Expr, FieldPath, Literal, LogicalOp};

/// Clause rendered for an empty membership list.
pub const ALWAYS_FALSE: &str = "false";

/// Lambda variable used when rendering `any-match`.
const LAMBDA_VAR: &str = "x";

#[derive(Clone, Debug, Default)]
pub struct FilterCompiler {
    booleans: BooleanFormat,
}

impl FilterCompiler {
    pub fn new(booleans: BooleanFormat) -> Self {
        Self { booleans }
    }

    pub fn compile(&self, expr: &Expr) -> Result<String, QueryError> {
        let mut out = String::new();
        self.write_expr(expr, None, &mut out)?;
        Ok(out)
    }

    fn write_expr(
        &self,
        expr: &Expr,
        parent: Option<LogicalOp>,
        out: &mut String,
    ) -> Result<(), QueryError> {
        match expr {
            Expr::Literal { value } => {
                out.push_str(&format_literal(value, &self.booleans));
            }
            Expr::Field { path } => out.push_str(&render_path(path)?),
            Expr::Compare { op, left, right } => {
                self.write_operand(left, out)?;
                out.push(' ');
                out.push_str(op.token());
                out.push(' ');
                self.write_operand(right, out)?;
            }
            Expr::Logical { op, left, right } => {
                // Mixing operators needs grouping; a same-operator chain is
                // left-associative on the server and stays flat.
                let grouped = parent.is_some_and(|p| p != *op);
                if grouped {
                    out.push('(');
                }
                self.write_expr(left, Some(*op), out)?;
                out.push(' ');
                out.push_str(op.token());
                out.push(' ');
                self.write_expr(right, Some(*op), out)?;
                if grouped {
                    out.push(')');
                }
            }
            Expr::Not { operand } => {
                out.push_str("not ");
                if is_self_delimited(operand) {
                    self.write_expr(operand, None, out)?;
                } else {
                    out.push('(');
                    self.write_expr(operand, None, out)?;
                    out.push(')');
                }
            }
            Expr::Call { kind, target, args } => self.write_call(*kind, target, args, out)?,
        }
        Ok(())
    }

    fn write_operand(&self, expr: &Expr, out: &mut String) -> Result<(), QueryError> {
        match expr {
            Expr::Literal { value } => out.push_str(&format_literal(value, &self.booleans)),
            Expr::Field { path } => out.push_str(&render_path(path)?),
            other => {
                return Err(QueryError::CompileUnsupported {
                    node_kind: other.node_kind(),
                })
            }
        }
        Ok(())
    }

    fn write_call(
        &self,
        kind: CallKind,
        target: &Expr,
        args: &[Expr],
        out: &mut String,
    ) -> Result<(), QueryError> {
        let unsupported = || QueryError::CompileUnsupported {
            node_kind: kind.name(),
        };
        let path = match target {
            Expr::Field { path } => render_path(path)?,
            _ => return Err(unsupported()),
        };

        match kind {
            CallKind::Contains | CallKind::StartsWith | CallKind::EndsWith => {
                let needle = match args {
                    [Expr::Literal {
                        value: Literal::String(s),
                    }] => s,
                    _ => return Err(unsupported()),
                };
                let function = match kind {
                    CallKind::Contains => "contains",
                    CallKind::StartsWith => "startswith",
                    _ => "endswith",
                };
                out.push_str(&format!("{}({},{})", function, path, quote_string(needle)));
            }
            CallKind::Any => {
                if !args.is_empty() {
                    // No wire form for nested predicates over collections.
                    return Err(QueryError::CompileUnsupported {
                        node_kind: "any-lambda",
                    });
                }
                out.push_str(&format!("{}/any()", path));
            }
            CallKind::AnyMatch => {
                let value = match args {
                    [Expr::Literal { value }] => value,
                    _ => return Err(unsupported()),
                };
                out.push_str(&format!(
                    "{path}/any({var}: {var} eq {value})",
                    var = LAMBDA_VAR,
                    value = format_literal(value, &self.booleans)
                ));
            }
            CallKind::InList => {
                let values = distinct_literals(args).ok_or_else(unsupported)?;
                match values.as_slice() {
                    [] => out.push_str(ALWAYS_FALSE),
                    [single] => out.push_str(&format!(
                        "{} eq {}",
                        path,
                        format_literal(single, &self.booleans)
                    )),
                    many => {
                        let terms: Vec<String> = many
                            .iter()
                            .map(|v| format!("{} eq {}", path, format_literal(v, &self.booleans)))
                            .collect();
                        out.push_str(&format!("({})", terms.join(" or ")));
                    }
                }
            }
        }
        Ok(())
    }
}

fn render_path(path: &FieldPath) -> Result<String, QueryError> {
    // The bare lambda element only has meaning inside the evaluator.
    if path.is_empty() {
        return Err(QueryError::CompileUnsupported {
            node_kind: "lambda-element",
        });
    }
    Ok(path.as_str())
}

/// Literal arguments deduplicated in first-seen order; `None` if any argument
/// is not a literal.
fn distinct_literals(args: &[Expr]) -> Option<Vec<&Literal>> {
    let mut seen: Vec<&Literal> = Vec::with_capacity(args.len());
    for arg in args {
        let Expr::Literal { value } = arg else {
            return None;
        };
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    Some(seen)
}

/// Whether `not <expr>` parses without extra parentheses.
fn is_self_delimited(expr: &Expr) -> bool {
    match expr {
        Expr::Literal { .. } | Expr::Field { .. } => true,
        Expr::Call {
            kind: CallKind::InList,
            args,
            ..
        } => distinct_literals(args).map_or(true, |v| v.len() != 1),
        Expr::Call { .. } => true,
        Expr::Compare { .. } | Expr::Logical { .. } | Expr::Not { .. } => false,
    }
}
