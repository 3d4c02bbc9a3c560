use super::field_map::FieldMap;
use super::literal::Literal;
use super::path::FieldPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Wire mnemonic.
    pub fn token(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn token(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CallKind {
    Contains,
    StartsWith,
    EndsWith,
    Any,
    AnyMatch,
    InList,
}

impl CallKind {
    pub fn name(self) -> &'static str {
        match self {
            CallKind::Contains => "contains",
            CallKind::StartsWith => "starts-with",
            CallKind::EndsWith => "ends-with",
            CallKind::Any => "any",
            CallKind::AnyMatch => "any-match",
            CallKind::InList => "in-list",
        }
    }
}

/// Predicate AST shared by the filter compiler and the record evaluator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expr {
    Literal {
        value: Literal,
    },
    Field {
        path: FieldPath,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        operand: Box<Expr>,
    },
    Call {
        kind: CallKind,
        target: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

/// Field reference by wire name (`/` separates navigation segments).
pub fn field(name: &str) -> Expr {
    Expr::Field {
        path: FieldPath::new(name),
    }
}

pub fn lit(value: impl Into<Literal>) -> Expr {
    Expr::Literal {
        value: value.into(),
    }
}

impl Expr {
    /// The current scope: the element inside an `any` lambda.
    pub fn element() -> Expr {
        Expr::Field {
            path: FieldPath::current(),
        }
    }

    pub fn node_kind(&self) -> &'static str {
        match self {
            Expr::Literal { .. } => "literal",
            Expr::Field { .. } => "field",
            Expr::Compare { .. } => "compare",
            Expr::Logical { .. } => "logical",
            Expr::Not { .. } => "not",
            Expr::Call { kind, .. } => kind.name(),
        }
    }

    fn compare(self, op: CompareOp, rhs: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(rhs.into()),
        }
    }

    pub fn equals(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn not_equals(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn greater_than(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn greater_or_equal(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ge, rhs)
    }

    pub fn less_than(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn less_or_equal(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Le, rhs)
    }

    pub fn is_null(self) -> Expr {
        self.compare(CompareOp::Eq, Literal::Null)
    }

    pub fn and(self, rhs: Expr) -> Expr {
        Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(rhs),
        }
    }

    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(rhs),
        }
    }

    pub fn negate(self) -> Expr {
        Expr::Not {
            operand: Box::new(self),
        }
    }

    fn call(self, kind: CallKind, args: Vec<Expr>) -> Expr {
        Expr::Call {
            kind,
            target: Box::new(self),
            args,
        }
    }

    pub fn contains(self, needle: impl Into<String>) -> Expr {
        self.call(CallKind::Contains, vec![lit(needle.into())])
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Expr {
        self.call(CallKind::StartsWith, vec![lit(prefix.into())])
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Expr {
        self.call(CallKind::EndsWith, vec![lit(suffix.into())])
    }

    pub fn in_list<I, L>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        let args = values.into_iter().map(lit).collect();
        self.call(CallKind::InList, args)
    }

    /// Collection is non-empty.
    pub fn any(self) -> Expr {
        self.call(CallKind::Any, vec![])
    }

    /// Some element satisfies `predicate`; inside it, fields resolve against
    /// the element and [`Expr::element`] is the element itself.
    pub fn any_where(self, predicate: Expr) -> Expr {
        self.call(CallKind::Any, vec![predicate])
    }

    /// Some element equals `value`.
    pub fn any_match(self, value: impl Into<Literal>) -> Expr {
        self.call(CallKind::AnyMatch, vec![lit(value)])
    }

    /// Rewrites every field path from logical names to wire names.
    pub fn remap(self, map: &FieldMap) -> Expr {
        match self {
            Expr::Field { path } => Expr::Field {
                path: map.resolve_path(&path),
            },
            Expr::Literal { .. } => self,
            Expr::Compare { op, left, right } => Expr::Compare {
                op,
                left: Box::new(left.remap(map)),
                right: Box::new(right.remap(map)),
            },
            Expr::Logical { op, left, right } => Expr::Logical {
                op,
                left: Box::new(left.remap(map)),
                right: Box::new(right.remap(map)),
            },
            Expr::Not { operand } => Expr::Not {
                operand: Box::new(operand.remap(map)),
            },
            Expr::Call { kind, target, args } => Expr::Call {
                kind,
                target: Box::new(target.remap(map)),
                args: args.into_iter().map(|a| a.remap(map)).collect(),
            },
        }
    }

    /// Folds boolean constants through `not`, `and` and `or`.
    pub fn fold(self) -> Expr {
        match self {
            Expr::Not { operand } => match operand.fold() {
                Expr::Literal {
                    value: Literal::Boolean(b),
                } => lit(!b),
                other => other.negate(),
            },
            Expr::Logical { op, left, right } => {
                let left = left.fold();
                let right = right.fold();
                match (op, as_const(&left), as_const(&right)) {
                    (LogicalOp::And, Some(false), _) | (LogicalOp::And, _, Some(false)) => {
                        lit(false)
                    }
                    (LogicalOp::Or, Some(true), _) | (LogicalOp::Or, _, Some(true)) => lit(true),
                    (LogicalOp::And, Some(true), _) | (LogicalOp::Or, Some(false), _) => right,
                    (LogicalOp::And, _, Some(true)) | (LogicalOp::Or, _, Some(false)) => left,
                    _ => Expr::Logical {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                }
            }
            other => other,
        }
    }
}

fn as_const(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::Literal { value } => value.as_bool(),
        _ => None,
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        self.negate()
    }
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Expr::Literal { value }
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        lit(v)
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        lit(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        lit(v)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        lit(v)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        lit(v)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        lit(v)
    }
}

impl From<DateTime<Utc>> for Expr {
    fn from(v: DateTime<Utc>) -> Self {
        lit(v)
    }
}
