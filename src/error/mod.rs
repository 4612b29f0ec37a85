// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hetzner Cloud client.
//!
//! API failures are reported as [`ApiError`] values carrying a typed
//! [`ErrorCode`]. Use [`is_error`] (or [`HcloudError::is_error`]) to make
//! control-flow decisions based on the code instead of the message text.

mod argument;
mod code;

pub use argument::{
    empty_value, invalid_argument, invalid_field_value, invalid_value, missing_field,
    missing_one_of_fields, missing_required_together_fields, mutually_exclusive_fields,
    ArgumentError,
};
pub use code::ErrorCode;

use crate::client::Response;
use http::StatusCode;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[allow(clippy::result_large_err)]
#[derive(Debug, Error)]
pub enum HcloudError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("server responded with status code {status}")]
    Status {
        status: StatusCode,
        response: Box<Response>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        response: Option<Box<Response>>,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("request cancelled")]
    Cancelled { last_error: Option<Box<HcloudError>> },

    #[error("request deadline exceeded")]
    DeadlineExceeded { last_error: Option<Box<HcloudError>> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl HcloudError {
    /// Returns the response envelope attached to this error, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            HcloudError::Api(err) => err.response(),
            HcloudError::Status { response, .. } => Some(response),
            HcloudError::Decode { response, .. } => response.as_deref(),
            HcloudError::Cancelled { last_error } | HcloudError::DeadlineExceeded { last_error } => {
                last_error.as_deref().and_then(HcloudError::response)
            }
            _ => None,
        }
    }

    /// Returns the typed API error, if this is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            HcloudError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns whether this is an API error with one of the given codes.
    pub fn is_error(&self, codes: &[ErrorCode]) -> bool {
        self.as_api_error()
            .is_some_and(|err| codes.contains(&err.code))
    }

    /// Returns whether this is the generic status code error, raised when
    /// the server answered 4xx/5xx without a decodable error body.
    pub fn is_status_code_error(&self) -> bool {
        matches!(self, HcloudError::Status { .. })
    }

    /// Returns whether the caller's context ended the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            HcloudError::Cancelled { .. } | HcloudError::DeadlineExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HcloudError>;

/// Returns whether `err`, or any error in its source chain, is an API error
/// with one of the given codes.
///
/// ```
/// use hcloud::error::{is_error, ApiError, ErrorCode, HcloudError};
///
/// let err = HcloudError::from(ApiError::new(ErrorCode::NotFound, "nope"));
/// assert!(is_error(&err, &[ErrorCode::NotFound, ErrorCode::Forbidden]));
/// assert!(!is_error(&err, &[ErrorCode::Conflict]));
/// ```
pub fn is_error(err: &(dyn std::error::Error + 'static), codes: &[ErrorCode]) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(api) = err.downcast_ref::<ApiError>() {
            return codes.contains(&api.code);
        }
        if let Some(HcloudError::Api(api)) = err.downcast_ref::<HcloudError>() {
            return codes.contains(&api.code);
        }
        current = err.source();
    }
    false
}

/// An error returned by the API.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<ErrorDetails>,
    response: Option<Box<Response>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            response: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// The response that carried the error, if available.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    pub fn into_response(self) -> Option<Response> {
        self.response.map(|r| *r)
    }

    /// Builds an error from a decoded error body. Returns `None` when the
    /// body carries neither a code nor a message.
    pub(crate) fn from_body(body: ErrorBody, response: &Response) -> Option<Self> {
        if body.code.is_empty() && body.message.is_empty() {
            return None;
        }
        let code = ErrorCode::from(body.code.as_str());
        let details = body
            .details
            .and_then(|raw| ErrorDetails::from_raw(&code, raw));
        Some(Self {
            code,
            message: body.message,
            details,
            response: Some(Box::new(response.clone())),
        })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.response().and_then(Response::correlation_id) {
            Some(correlation_id) => {
                write!(f, "{} ({}, {})", self.message, self.code, correlation_id)
            }
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

impl std::error::Error for ApiError {}

/// Structured details attached to some API errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetails {
    InvalidInput { fields: Vec<InvalidInputField> },
    DeprecatedApiEndpoint { announcement: String },
}

/// Validation messages reported for a single request field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvalidInputField {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl ErrorDetails {
    fn from_raw(code: &ErrorCode, raw: serde_json::Value) -> Option<Self> {
        #[derive(Deserialize)]
        struct InvalidInput {
            #[serde(default)]
            fields: Vec<InvalidInputField>,
        }

        #[derive(Deserialize)]
        struct DeprecatedApiEndpoint {
            #[serde(default)]
            announcement: String,
        }

        match code {
            ErrorCode::InvalidInput => serde_json::from_value::<InvalidInput>(raw)
                .ok()
                .map(|d| ErrorDetails::InvalidInput { fields: d.fields }),
            ErrorCode::DeprecatedApiEndpoint => {
                serde_json::from_value::<DeprecatedApiEndpoint>(raw)
                    .ok()
                    .map(|d| ErrorDetails::DeprecatedApiEndpoint {
                        announcement: d.announcement,
                    })
            }
            _ => None,
        }
    }
}

/// Wire shape of an error response: `{"error": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// An action that finished with status `error`.
#[derive(Debug, Clone, Error)]
#[error("action {action_id} failed: {message} ({code})")]
pub struct ActionError {
    pub action_id: i64,
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_without_response() {
        let err = ApiError::new(ErrorCode::Conflict, "resource changed");
        assert_eq!(err.to_string(), "resource changed (conflict)");
    }

    #[test]
    fn test_is_error_direct() {
        let err = HcloudError::from(ApiError::new(ErrorCode::Locked, "busy"));
        assert!(err.is_error(&[ErrorCode::Locked]));
        assert!(!err.is_error(&[ErrorCode::NotFound]));
        assert!(is_error(&err, &[ErrorCode::Forbidden, ErrorCode::Locked]));
    }

    #[test]
    fn test_is_error_through_wrapping() {
        #[derive(Debug, Error)]
        #[error("layer: {0}")]
        struct Layer(#[source] Box<dyn std::error::Error + Send + Sync + 'static>);

        let mut err: Box<dyn std::error::Error + Send + Sync + 'static> = Box::new(
            HcloudError::from(ApiError::new(ErrorCode::ServerNotStopped, "stop first")),
        );
        for _ in 0..5 {
            err = Box::new(Layer(err));
        }

        assert!(is_error(&*err, &[ErrorCode::ServerNotStopped]));
        assert!(!is_error(&*err, &[ErrorCode::Conflict]));
    }

    #[test]
    fn test_is_error_through_anyhow_context() {
        use anyhow::Context;

        let result: Result<()> = Err(ApiError::new(ErrorCode::NotFound, "nope").into());
        let err = result
            .context("loading server")
            .context("reconciling cluster")
            .unwrap_err();

        assert!(is_error(&*err, &[ErrorCode::NotFound]));
    }

    #[test]
    fn test_is_error_on_non_api_errors() {
        let err = HcloudError::Config("bad".to_string());
        assert!(!is_error(&err, &[ErrorCode::ServiceError]));

        let io = std::io::Error::other("disk");
        assert!(!is_error(&io, &[ErrorCode::ServiceError]));
    }

    #[test]
    fn test_error_details_invalid_input() {
        let raw = serde_json::json!({
            "fields": [{"name": "broken_field", "messages": ["is required"]}]
        });
        let details = ErrorDetails::from_raw(&ErrorCode::InvalidInput, raw).unwrap();
        assert_eq!(
            details,
            ErrorDetails::InvalidInput {
                fields: vec![InvalidInputField {
                    name: "broken_field".to_string(),
                    messages: vec!["is required".to_string()],
                }]
            }
        );
    }

    #[test]
    fn test_error_details_deprecated_endpoint() {
        let raw = serde_json::json!({"announcement": "https://docs.hetzner.cloud/changelog"});
        let details = ErrorDetails::from_raw(&ErrorCode::DeprecatedApiEndpoint, raw).unwrap();
        assert_eq!(
            details,
            ErrorDetails::DeprecatedApiEndpoint {
                announcement: "https://docs.hetzner.cloud/changelog".to_string()
            }
        );
    }

    #[test]
    fn test_error_details_ignored_for_other_codes() {
        let raw = serde_json::json!({"fields": []});
        assert!(ErrorDetails::from_raw(&ErrorCode::NotFound, raw).is_none());
    }
}
