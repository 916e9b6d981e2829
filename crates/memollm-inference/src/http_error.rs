//! Mapping of non-2xx backend responses onto the error taxonomy.

use memollm_core::Error;
use serde::Deserialize;

/// Classification of a failed HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Gateway or upstream unavailable (502/503/504).
    Unavailable,
    /// Model not found or not available.
    ModelNotFound,
    /// Prompt exceeds the context window.
    ContextLengthExceeded,
    /// Other 5xx.
    ServerError,
    /// Any other status.
    Other,
}

impl HttpErrorCode {
    /// Determine error code from HTTP status and the provider's error type hint.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match status {
            401 => Self::AuthenticationError,
            429 => Self::RateLimitExceeded,
            502..=504 => Self::Unavailable,
            404 => Self::ModelNotFound,
            _ if error_type.contains("model_not_found") => Self::ModelNotFound,
            400 if error_type.contains("context_length") => Self::ContextLengthExceeded,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Convert into the shared error type.
    pub fn into_error(self, status: u16, message: String) -> Error {
        match self {
            Self::AuthenticationError => Error::InvalidApiKey,
            Self::RateLimitExceeded => Error::RateLimited,
            Self::Unavailable => Error::ProviderUnavailable(format!("HTTP {}", status)),
            Self::ModelNotFound => Error::ModelNotFound(message),
            Self::ContextLengthExceeded => Error::ContextTooLong(message),
            Self::ServerError | Self::Other => Error::Api { status, message },
        }
    }
}

// Error bodies vary by backend:
//   OpenAI/Anthropic  {"error": {"message", "type", "code"}}
//   Gemini            {"error": {"code": 400, "message", "status"}}
//   Ollama            {"error": "model 'x' not found"}
//   misc              {"message": "..."}
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detail(ErrorDetail),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<String>,
}

/// Build the error for a failed response from its status and raw body.
pub fn error_from_response(status: u16, body: &[u8]) -> Error {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).unwrap_or_default();

    let (message, hint) = match envelope.error {
        Some(ErrorField::Detail(detail)) => {
            let code = match detail.code {
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let message = detail.message.unwrap_or_default();
            let hint = [
                detail.error_type.unwrap_or_default(),
                code,
                detail.status.unwrap_or_default(),
                message.clone(),
            ]
            .join(" ");
            (message, hint)
        }
        Some(ErrorField::Text(text)) => (text.clone(), text),
        None => (String::new(), String::new()),
    };

    let message = if !message.is_empty() {
        message
    } else if let Some(top) = envelope.message.filter(|m| !m.is_empty()) {
        top
    } else {
        String::from_utf8_lossy(body).into_owned()
    };

    HttpErrorCode::from_response(status, &hint).into_error(status, message)
}
