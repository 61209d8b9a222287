//! Function trait and error type.

use crate::context::Context;
use crate::error::ContextError;
use crate::http::{ContextResponse, ResponseOptions, ResponseOutput};
use async_trait::async_trait;

/// A function invoked once per request with a fresh [`Context`].
#[async_trait]
pub trait ContextFunction: Send + Sync {
    /// Handle one invocation.
    async fn handle(&self, ctx: &mut Context) -> Result<ResponseOutput, FunctionError>;

    /// Get the function name.
    fn name(&self) -> &str;
}

/// Error returned by function code.
#[derive(Debug, Clone)]
pub struct FunctionError {
    /// Error message.
    pub message: String,
    /// Status code of the resulting response.
    pub code: u16,
}

impl FunctionError {
    /// Create a new FunctionError with status 500.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 500,
        }
    }

    /// Create a FunctionError with a specific code.
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(404, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(400, message)
    }
}

impl std::fmt::Display for FunctionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for FunctionError {}

impl From<FunctionError> for ResponseOutput {
    fn from(err: FunctionError) -> Self {
        ContextResponse::new().text(
            err.message,
            ResponseOptions::new()
                .status_code(err.code)
                .header("content-type", "text/plain"),
        )
    }
}

impl From<std::io::Error> for FunctionError {
    fn from(err: std::io::Error) -> Self {
        FunctionError::new(err.to_string())
    }
}

impl From<serde_json::Error> for FunctionError {
    fn from(err: serde_json::Error) -> Self {
        FunctionError::bad_request(err.to_string())
    }
}

impl From<ContextError> for FunctionError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::InvalidJsonBody(_) => FunctionError::bad_request(err.to_string()),
            other => FunctionError::new(other.to_string()),
        }
    }
}
