use crate::predicate::Literal;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const NO_YES_TYPE: &str = "Microsoft.Dynamics.DataEntities.NoYes";

/// How boolean literals are written on the wire. The remote schema decides
/// this, so it is configuration rather than something the AST can carry.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BooleanFormat {
    /// Bare `true` / `false`.
    #[default]
    Native,
    /// Enumeration members standing in for booleans, e.g. `NoYes'Yes'`.
    Sentinel {
        type_name: String,
        true_label: String,
        false_label: String,
    },
}

impl BooleanFormat {
    /// The `NoYes` enumeration used by Dynamics data entities.
    pub fn no_yes() -> Self {
        BooleanFormat::Sentinel {
            type_name: NO_YES_TYPE.to_string(),
            true_label: "Yes".to_string(),
            false_label: "No".to_string(),
        }
    }

    pub fn render(&self, value: bool) -> String {
        match self {
            BooleanFormat::Native => value.to_string(),
            BooleanFormat::Sentinel {
                type_name,
                true_label,
                false_label,
            } => {
                let label = if value { true_label } else { false_label };
                format_enum(type_name, label)
            }
        }
    }

    /// Maps a sentinel label read back from a record to its boolean.
    pub fn parse_label(&self, label: &str) -> Option<bool> {
        match self {
            BooleanFormat::Native => None,
            BooleanFormat::Sentinel {
                true_label,
                false_label,
                ..
            } => {
                if label == true_label.as_str() {
                    Some(true)
                } else if label == false_label.as_str() {
                    Some(false)
                } else {
                    None
                }
            }
        }
    }
}

/// Single-quotes `value`, doubling any embedded quote.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn format_enum(type_name: &str, label: &str) -> String {
    format!("{}{}", type_name, quote_string(label))
}

/// Sortable UTC form; fractional seconds only when present.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        let fraction = format!("{:09}", value.nanosecond() % 1_000_000_000);
        format!(
            "{}.{}Z",
            value.format("%Y-%m-%dT%H:%M:%S"),
            fraction.trim_end_matches('0')
        )
    }
}

pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let token = if value > 0.0 { "INF" } else { "-INF" };
        token.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

pub fn format_literal(value: &Literal, booleans: &BooleanFormat) -> String {
    match value {
        Literal::String(s) => quote_string(s),
        Literal::Integer(i) => i.to_string(),
        Literal::Real(r) => format_real(*r),
        Literal::Boolean(b) => booleans.render(*b),
        Literal::DateTime(dt) => format_datetime(dt),
        Literal::Null => "null".to_string(),
        Literal::Enum { type_name, label } => format_enum(type_name, label),
    }
}
