use crate::compile::BooleanFormat;
use crate::predicate::Literal;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparable view of either side of a comparison: a record value, a literal,
/// or a field absent from the record (which reads as null).
#[derive(Debug, Clone, Copy)]
pub(crate) enum Operand<'a> {
    Json(&'a Value),
    Literal(&'a Literal),
    Missing,
}

#[derive(Debug, Clone, Copy)]
enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(&'a str),
    Time(DateTime<Utc>),
    Label(&'a str),
    Structured(&'a Value),
}

impl<'a> Operand<'a> {
    fn scalar(self) -> Scalar<'a> {
        match self {
            Operand::Missing => Scalar::Null,
            Operand::Json(v) => match v {
                Value::Null => Scalar::Null,
                Value::Bool(b) => Scalar::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => Scalar::Int(i),
                    None => Scalar::Num(n.as_f64().unwrap_or(f64::NAN)),
                },
                Value::String(s) => Scalar::Str(s),
                Value::Array(_) | Value::Object(_) => Scalar::Structured(v),
            },
            Operand::Literal(l) => match l {
                Literal::String(s) => Scalar::Str(s),
                Literal::Integer(i) => Scalar::Int(*i),
                Literal::Real(r) => Scalar::Num(*r),
                Literal::Boolean(b) => Scalar::Bool(*b),
                Literal::DateTime(dt) => Scalar::Time(*dt),
                Literal::Null => Scalar::Null,
                Literal::Enum { label, .. } => Scalar::Label(label),
            },
        }
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn as_f64(s: Scalar<'_>) -> Option<f64> {
    match s {
        Scalar::Int(i) => Some(i as f64),
        Scalar::Num(n) => Some(n),
        _ => None,
    }
}

/// Typed equality. Numbers compare numerically across integer/real, strings
/// exactly, and anything against a structured value is unequal (two
/// structured record values compare deeply).
pub(crate) fn values_equal(a: Operand<'_>, b: Operand<'_>, booleans: &BooleanFormat) -> bool {
    match (a.scalar(), b.scalar()) {
        (Scalar::Null, Scalar::Null) => true,
        (Scalar::Null, _) | (_, Scalar::Null) => false,
        (Scalar::Structured(x), Scalar::Structured(y)) => x == y,
        (Scalar::Structured(_), _) | (_, Scalar::Structured(_)) => false,
        (Scalar::Int(x), Scalar::Int(y)) => x == y,
        (x, y) => match order_scalars(x, y, booleans) {
            Some(ord) => ord == Ordering::Equal,
            None => false,
        },
    }
}

/// Ordering for `gt/ge/lt/le`. Null sorts before every non-null value;
/// `None` means the pair is incomparable and the comparison is false.
pub(crate) fn values_order(
    a: Operand<'_>,
    b: Operand<'_>,
    booleans: &BooleanFormat,
) -> Option<Ordering> {
    match (a.scalar(), b.scalar()) {
        (Scalar::Null, Scalar::Null) => Some(Ordering::Equal),
        (Scalar::Null, _) => Some(Ordering::Less),
        (_, Scalar::Null) => Some(Ordering::Greater),
        (Scalar::Structured(_), _) | (_, Scalar::Structured(_)) => None,
        (x, y) => order_scalars(x, y, booleans),
    }
}

fn order_scalars(a: Scalar<'_>, b: Scalar<'_>, booleans: &BooleanFormat) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Int(x), Scalar::Int(y)) => Some(x.cmp(&y)),
        (x @ (Scalar::Int(_) | Scalar::Num(_)), y @ (Scalar::Int(_) | Scalar::Num(_))) => {
            as_f64(x)?.partial_cmp(&as_f64(y)?)
        }
        (Scalar::Str(x), Scalar::Str(y)) => Some(x.cmp(y)),
        (Scalar::Bool(x), Scalar::Bool(y)) => Some(x.cmp(&y)),
        (Scalar::Bool(x), Scalar::Str(s)) => booleans.parse_label(s).map(|y| x.cmp(&y)),
        (Scalar::Str(s), Scalar::Bool(y)) => booleans.parse_label(s).map(|x| x.cmp(&y)),
        (Scalar::Time(x), Scalar::Time(y)) => Some(x.cmp(&y)),
        (Scalar::Time(x), Scalar::Str(s)) => parse_time(s).map(|y| x.cmp(&y)),
        (Scalar::Str(s), Scalar::Time(y)) => parse_time(s).map(|x| x.cmp(&y)),
        (Scalar::Label(x), Scalar::Str(y) | Scalar::Label(y)) => Some(x.cmp(y)),
        (Scalar::Str(x), Scalar::Label(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
