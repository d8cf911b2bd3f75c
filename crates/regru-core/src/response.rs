//! Normalized call outcome
//!
//! Both protocol generations decode into an [`ApiResponse`]. Facade methods
//! wrap it in an [`Outcome`] together with the domain-level value they
//! extracted from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code reported when a failed V2 response carries none
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";

/// Decoded outcome of one call
///
/// Either `success` with an `answer`, or failure with an `error_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the registrar accepted the request
    pub success: bool,
    /// Operation payload (present on success)
    pub answer: Option<Value>,
    /// Registrar error code (present on failure)
    pub error_code: Option<String>,
    /// Optional human-readable error detail
    pub error_detail: Option<String>,
}

impl ApiResponse {
    /// Successful response carrying `answer`
    pub fn success(answer: Value) -> Self {
        Self {
            success: true,
            answer: Some(answer),
            error_code: None,
            error_detail: None,
        }
    }

    /// Failed response carrying `error_code` as given
    pub fn failure(error_code: impl Into<String>, error_detail: Option<String>) -> Self {
        Self {
            success: false,
            answer: None,
            error_code: Some(error_code.into()),
            error_detail,
        }
    }

    /// Whether the registrar accepted the request
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Registrar error code, if the call failed
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// Registrar error detail, if any
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// Field of the answer object, only on success
    pub fn answer_field(&self, key: &str) -> Option<&Value> {
        if !self.success {
            return None;
        }
        self.answer.as_ref().and_then(|answer| answer.get(key))
    }
}

/// Domain-level value extracted from a response, plus the response itself
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    /// Value the operation produced
    pub value: T,
    /// The decoded response it was extracted from
    pub response: ApiResponse,
}

impl<T> Outcome<T> {
    /// Pair a value with its response
    pub fn new(value: T, response: ApiResponse) -> Self {
        Self { value, response }
    }

    /// Whether the registrar accepted the request
    pub fn is_success(&self) -> bool {
        self.response.success
    }

    /// Registrar error code, if the call failed
    pub fn error_code(&self) -> Option<&str> {
        self.response.error_code()
    }

    /// Registrar error detail, if any
    pub fn error_detail(&self) -> Option<&str> {
        self.response.error_detail()
    }

    /// Drop the response and keep the value
    pub fn into_value(self) -> T {
        self.value
    }
}
