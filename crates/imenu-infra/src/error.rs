//! HTTP error response envelope
//!
//! The `IntoResponse` implementation for `AppError` lives in the api crate
//! because of the orphan rule.

use serde::Serialize;
use utoipa::ToSchema;

/// Failure body returned by every endpoint: `{ success: false, error, code, details? }`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
            details: None,
            error_type: None,
            suggested_action: None,
        }
    }
}
