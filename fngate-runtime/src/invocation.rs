//! Invocation inputs and outcomes

use fngate_core::GatewayFailure;
use serde_json::Value;

/// Inputs of a single invocation, extracted from the inbound request body
///
/// `event` and `context` are opaque and forwarded unmodified; an absent
/// field is forwarded as `null`. `handler_path` and `handler_name` are only
/// consulted while no handler has been resolved yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationRequest {
    pub handler_path: Option<String>,
    pub handler_name: Option<String>,
    pub event: Value,
    pub context: Value,
}

impl InvocationRequest {
    pub fn new(event: Value, context: Value) -> Self {
        Self {
            event,
            context,
            ..Default::default()
        }
    }

    pub fn with_handler(mut self, path: impl Into<String>, name: impl Into<String>) -> Self {
        self.handler_path = Some(path.into());
        self.handler_name = Some(name.into());
        self
    }

    /// Build a request from a raw body and its `Content-Type`
    ///
    /// Only JSON bodies (`application/json` or any `+json` type) carry
    /// fields. Text and raw bodies parse to a request with every field
    /// absent. An empty JSON body is treated as `{}`; anything that is not
    /// a JSON object or array is rejected.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self, GatewayFailure> {
        if !content_type.is_some_and(is_json_content_type) {
            return Ok(Self::default());
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| GatewayFailure::malformed_request(format!("Invalid JSON body: {e}")))?;

        match value {
            Value::Object(_) => Ok(Self::from_value(&value)),
            Value::Array(_) => Ok(Self::default()),
            _ => Err(GatewayFailure::malformed_request(
                "JSON body must be an object or an array",
            )),
        }
    }

    fn from_value(body: &Value) -> Self {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            handler_path: text("handlerPath"),
            handler_name: text("handlerName"),
            event: body.get("event").cloned().unwrap_or(Value::Null),
            context: body.get("context").cloned().unwrap_or(Value::Null),
        }
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Outcome of a single invocation
///
/// Leaves `Pending` at most once; see [`crate::latch::CompletionLatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    /// Neither completion channel has committed yet
    Pending,
    /// The handler completed; the payload is sent with status 200
    Success(Value),
    /// The invocation failed; the failure body is sent with its status
    Failure(GatewayFailure),
}

impl CompletionResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// HTTP status of a committed result
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Pending => None,
            Self::Success(_) => Some(200),
            Self::Failure(failure) => Some(failure.http_status()),
        }
    }
}

/// Whether a returned value counts as present
///
/// `null`, `false`, numeric zero and the empty string are absent; every
/// other value, including empty objects and arrays, is present.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
