use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// CPF format rule: exactly 11 ASCII digits, and not a run of a single
/// repeated digit ("11111111111" is syntactically shaped like a CPF but is
/// never a valid document).
pub fn is_valid_cpf(value: &str) -> bool {
    if value.len() != 11 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let first = value.as_bytes()[0];
    !value.bytes().all(|b| b == first)
}

/// Distinguishes an absent JSON field from an explicit `null` and from a
/// wrongly-typed value, so handlers can report each with its own message.
pub enum FieldValue {
    Omitted,
    Null,
    String(String),
    Other,
}

pub fn classify_field(optional_value: Option<&Value>) -> FieldValue {
    match optional_value {
        None => FieldValue::Omitted,
        Some(Value::Null) => FieldValue::Null,
        Some(Value::String(s)) => FieldValue::String(s.to_owned()),
        Some(_) => FieldValue::Other,
    }
}
