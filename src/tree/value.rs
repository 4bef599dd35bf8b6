//! Leaf values stored per language in a translation entry.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A single language's value for one translation key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslationValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl TranslationValue {
    /// Converts a JSON primitive. Objects and arrays yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(TranslationValue::Null),
            Value::Bool(b) => Some(TranslationValue::Bool(*b)),
            Value::Number(n) => Some(TranslationValue::Number(n.clone())),
            Value::String(s) => Some(TranslationValue::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            TranslationValue::Null => Value::Null,
            TranslationValue::Bool(b) => Value::Bool(*b),
            TranslationValue::Number(n) => Value::Number(n.clone()),
            TranslationValue::String(s) => Value::String(s.clone()),
        }
    }

    /// The zero value of the same kind, used to back-fill languages an
    /// import did not provide: `""`, `0`, `false` or `null`.
    pub fn zero_like(&self) -> Self {
        match self {
            TranslationValue::Null => TranslationValue::Null,
            TranslationValue::Bool(_) => TranslationValue::Bool(false),
            TranslationValue::Number(_) => TranslationValue::Number(Number::from(0)),
            TranslationValue::String(_) => TranslationValue::empty(),
        }
    }

    pub fn empty() -> Self {
        TranslationValue::String(String::new())
    }

    /// Falsy in the sense exported JSON has always used: `""`, `0`, `false`
    /// and `null`.
    pub fn is_falsy(&self) -> bool {
        match self {
            TranslationValue::Null => true,
            TranslationValue::Bool(b) => !b,
            TranslationValue::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
            TranslationValue::String(s) => s.is_empty(),
        }
    }

    /// Text used when matching search queries; falsy values render empty.
    pub fn display_text(&self) -> String {
        if self.is_falsy() {
            return String::new();
        }
        match self {
            TranslationValue::String(s) => s.clone(),
            TranslationValue::Number(n) => n.to_string(),
            TranslationValue::Bool(b) => b.to_string(),
            TranslationValue::Null => String::new(),
        }
    }
}

impl From<&str> for TranslationValue {
    fn from(s: &str) -> Self {
        TranslationValue::String(s.to_string())
    }
}

impl From<String> for TranslationValue {
    fn from(s: String) -> Self {
        TranslationValue::String(s)
    }
}

impl From<bool> for TranslationValue {
    fn from(b: bool) -> Self {
        TranslationValue::Bool(b)
    }
}

impl From<i64> for TranslationValue {
    fn from(n: i64) -> Self {
        TranslationValue::Number(Number::from(n))
    }
}
