use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde_json::Value;

use crate::error::{AppError, ValidationError};
use crate::rag::Prompt;

/// A JSON request body. An empty body reads as `{}`; anything unparsable is a
/// client error.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(Value::Object(Default::default())));
        }

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ValidationError::MalformedBody(e.to_string()).into())
    }
}

impl JsonBody {
    /// Returns the field if it is present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// The validated `prompt` field of a JSON body.
#[derive(Debug, Clone)]
pub struct ValidPrompt(pub Prompt);

impl<S> FromRequest<S> for ValidPrompt
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(body) = JsonBody::from_request(req, state).await?;
        Ok(ValidPrompt(Prompt::from_body(&body)?))
    }
}
