use crate::error::ValidationError;
use serde_json::Value;

/// Counted in Unicode scalar values, so an emoji is one character.
pub const PROMPT_MAX_LENGTH: usize = 2000;

/// A user prompt that passed validation: a trimmed, non-empty string of at
/// most [`PROMPT_MAX_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        if raw.chars().count() > PROMPT_MAX_LENGTH {
            return Err(ValidationError::PromptTooLong {
                max: PROMPT_MAX_LENGTH,
            });
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingPrompt);
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Pulls `prompt` out of a request body.
    pub fn from_body(body: &Value) -> Result<Self, ValidationError> {
        match body.get("prompt") {
            Some(Value::String(raw)) => Self::new(raw),
            _ => Err(ValidationError::MissingPrompt),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trims_surrounding_whitespace() {
        let prompt = Prompt::from_body(&json!({ "prompt": "  plan my day \n" })).unwrap();
        assert_eq!(prompt.as_str(), "plan my day");
    }

    #[test]
    fn rejects_missing_and_non_string_prompts() {
        for body in [
            json!({}),
            json!({ "prompt": null }),
            json!({ "prompt": 42 }),
            json!({ "prompt": ["a"] }),
            json!({ "prompt": "" }),
            json!({ "prompt": "   " }),
            json!("prompt"),
        ] {
            assert_eq!(
                Prompt::from_body(&body),
                Err(ValidationError::MissingPrompt),
                "body: {body}"
            );
        }
    }

    #[test]
    fn length_limit_counts_characters() {
        let at_limit = "é".repeat(PROMPT_MAX_LENGTH);
        assert!(Prompt::new(&at_limit).is_ok());

        let over = "a".repeat(PROMPT_MAX_LENGTH + 1);
        assert_eq!(
            Prompt::new(&over),
            Err(ValidationError::PromptTooLong { max: 2000 })
        );
    }
}
