use crate::compile::{format_literal, BooleanFormat};
use crate::predicate::Literal;

/// `(k1=v1,k2=v2)` with each value formatted as a filter literal.
///
/// The segment lands in the URL path, so characters that would end the path
/// or split it into segments are percent-encoded inside each value.
pub fn format_key_segment(keys: &[(String, Literal)], booleans: &BooleanFormat) -> String {
    let parts: Vec<String> = keys
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                name,
                escape_path_value(&format_literal(value, booleans))
            )
        })
        .collect();
    format!("({})", parts.join(","))
}

fn escape_path_value(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '#' => escaped.push_str("%23"),
            '?' => escaped.push_str("%3F"),
            '/' => escaped.push_str("%2F"),
            '\\' => escaped.push_str("%5C"),
            _ => escaped.push(c),
        }
    }
    escaped
}
