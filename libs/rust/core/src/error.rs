//! Error taxonomy for registry calls.
//!
//! Server-side failures are classified from the MLflow error body
//! (`{"error_code": ..., "message": ...}`), falling back to the HTTP status
//! when the body carries no recognised code.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Rejected locally; no request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("tracking endpoint {endpoint} unreachable: {source}")]
    Connectivity {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    #[error("{code}: {message}")]
    InvalidParameter { code: String, message: String },

    #[error("RESOURCE_ALREADY_EXISTS: {message}")]
    AlreadyExists { message: String },

    #[error("registry returned HTTP {status} ({code}): {message}")]
    Server { status: u16, code: String, message: String },

    #[error("failed to decode registry response: {0}")]
    Decode(String),

    #[error("model version {name}/{version} failed registration: {message}")]
    RegistrationFailed { name: String, version: String, message: String },

    #[error("timed out waiting for model version {name}/{version} to become READY")]
    Timeout { name: String, version: String },

    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RegistryError {
    /// Classify a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .unwrap_or_else(|| body.trim().to_string());
        let code = parsed.error_code.unwrap_or_default();
        match code.as_str() {
            "RESOURCE_DOES_NOT_EXIST" => Self::NotFound { code, message },
            "INVALID_PARAMETER_VALUE" | "MALFORMED_REQUEST" | "BAD_REQUEST" => Self::InvalidParameter { code, message },
            "RESOURCE_ALREADY_EXISTS" => Self::AlreadyExists { message },
            _ => match status {
                404 => Self::NotFound { code: fallback_code(code, "NOT_FOUND"), message },
                400 => Self::InvalidParameter { code: fallback_code(code, "BAD_REQUEST"), message },
                _ => Self::Server { status, code: fallback_code(code, "INTERNAL_ERROR"), message },
            },
        }
    }

    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }
    pub fn is_connectivity(&self) -> bool { matches!(self, Self::Connectivity { .. }) }
}

fn fallback_code(code: String, default: &str) -> String {
    if code.is_empty() { default.to_string() } else { code }
}
