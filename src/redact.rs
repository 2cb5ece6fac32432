//! PII redaction for request logging.
//!
//! Request bodies are logged after passing through [`PiiRedactor`], which
//! masks email addresses and card-number-like digit runs in every string, and
//! blanks out credential fields entirely.

use regex::Regex;
use serde_json::Value;

const SECRET_KEYS: &[&str] = &["password", "password_hash", "code_verifier"];

pub struct PiiRedactor {
    patterns: Vec<(Regex, &'static str)>,
}

impl PiiRedactor {
    pub fn new() -> Self {
        let patterns = vec![
            (
                Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
                    .expect("email pattern compiles"),
                "[REDACTED_EMAIL]",
            ),
            (
                Regex::new(r"\b(?:\d[ -]*?){13,16}\b").expect("card pattern compiles"),
                "[REDACTED_CC]",
            ),
        ];
        Self { patterns }
    }

    pub fn redact_str(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, marker) in &self.patterns {
            result = pattern.replace_all(&result, *marker).into_owned();
        }
        result
    }

    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.redact_str(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let v = if SECRET_KEYS.contains(&k.as_str()) {
                            Value::String("[REDACTED]".to_string())
                        } else {
                            self.redact(v)
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new()
    }
}
