//! Gateway failure taxonomy and diagnostics

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Body sent when the handler module or export cannot be resolved
pub const HANDLER_NOT_FOUND_MESSAGE: &str = "Function Handler does not exist, check that you provided the right HANDLER parameter (path to your module with exported function to use)";

/// Body sent when the resolved export cannot be invoked
pub const INVALID_EXPORT_MESSAGE: &str =
    "Provided Handler does not exist, or does not export methods properly.";

/// Kinds of failure the gateway converts into an HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Handler module or export could not be loaded
    Resolution,
    /// Resolved export is not a callable handler
    Invocability,
    /// Handler reported an error through its completion callback
    Callback,
    /// Handler failed while executing
    Invocation,
    /// Request body could not be parsed
    MalformedRequest,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolution => "ResolutionError",
            Self::Invocability => "InvocabilityError",
            Self::Callback => "CallbackError",
            Self::Invocation => "InvocationException",
            Self::MalformedRequest => "MalformedRequest",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::MalformedRequest => 400,
            Self::Resolution | Self::Invocability | Self::Callback | Self::Invocation => 500,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure committed as the response of a request
///
/// `body` is sent verbatim: a fixed diagnostic string for resolution and
/// invocability failures, the handler's own error value for callback
/// failures, and the error message for invocation failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {body}")]
pub struct GatewayFailure {
    pub kind: FailureKind,
    pub body: Value,
}

impl GatewayFailure {
    pub fn new(kind: FailureKind, body: impl Into<Value>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    pub fn resolution() -> Self {
        Self::new(FailureKind::Resolution, HANDLER_NOT_FOUND_MESSAGE)
    }

    pub fn invocability() -> Self {
        Self::new(FailureKind::Invocability, INVALID_EXPORT_MESSAGE)
    }

    pub fn callback(error: Value) -> Self {
        Self::new(FailureKind::Callback, error)
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Invocation, message.into())
    }

    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedRequest, message.into())
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}
