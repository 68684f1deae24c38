//! Field deserializers that never fail.
//!
//! Producers are loosely coordinated: a field may be absent, `null`, a number
//! sent as a string or a string sent as a number. Every typed payload field
//! goes through one of these so a sloppy producer degrades a prompt instead
//! of poisoning the queue.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A JSON number kept in its original representation.
///
/// Integer amounts print exactly as sent; `as_f64` is only
/// used where an approximate value is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct Numeric(serde_json::Number);

impl Numeric {
    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }
}

impl From<serde_json::Number> for Numeric {
    fn from(value: serde_json::Number) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Accepts a number or a numeric string; anything else becomes `None`.
pub fn number<'de, D>(deserializer: D) -> Result<Option<Numeric>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => Some(Numeric(n)),
        Value::String(s) => s.trim().parse::<serde_json::Number>().ok().map(Numeric),
        _ => None,
    }))
}

/// Accepts a string, number or bool; anything else becomes `None`.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}
