//! Error types for the relay API client.
//!
//! # Design
//! The platform reports failures as a JSON `error` object carrying a `code`
//! and a `message`. Two codes get dedicated variants because callers
//! routinely branch on them (`invalid_param`, `not_found`); every other code
//! lands in `Api`. Responses that fail without that envelope keep the raw
//! status and body in `HttpError`. Network failures are boxed unmodified in
//! `Transport` so callers can downcast to the transport's own error type.

use thiserror::Error;

/// Error code the server uses for rejected request parameters.
pub const INVALID_PARAM_CODE: &str = "invalid_param";

/// Error code the server uses for missing resources.
pub const NOT_FOUND_CODE: &str = "not_found";

/// Errors returned by `ApiClient` and the entities it produces.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected one of the request parameters.
    #[error("invalid parameter{}: {message}", param_suffix(.param))]
    InvalidParameter {
        code: String,
        message: String,
        param: Option<String>,
    },

    /// The referenced resource does not exist.
    #[error("not found: {message}")]
    NotFound { code: String, message: String },

    /// Any other error reported by the server.
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },

    /// The server returned a non-2xx status without an error payload.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A response lacked a field required to address the entity.
    #[error("missing field `{0}` in API response")]
    MissingField(String),

    /// The caller passed arguments the client refuses before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Build the error matching a server-side error code.
    pub fn from_server(code: &str, message: &str, param: Option<&str>) -> Self {
        match code {
            INVALID_PARAM_CODE => ApiError::InvalidParameter {
                code: code.to_string(),
                message: message.to_string(),
                param: param.map(str::to_string),
            },
            NOT_FOUND_CODE => ApiError::NotFound {
                code: code.to_string(),
                message: message.to_string(),
            },
            _ => ApiError::Api {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }

    /// The server error code, for errors reported by the server.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::InvalidParameter { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

fn param_suffix(param: &Option<String>) -> String {
    param.as_deref().map(|p| format!(" `{p}`")).unwrap_or_default()
}
