//! Handler model
//!
//! A handler receives the invocation event, the invocation context and a
//! [`Callback`]. It completes either by calling the callback or by returning
//! a value; whichever reaches the invocation's latch first wins.

use async_trait::async_trait;
use fngate_core::GatewayFailure;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::invocation::{is_truthy, CompletionResult};
use crate::latch::CompletionLatch;

/// Failure raised by a handler while executing
///
/// The `Display` text becomes the body of the 500 response.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result of awaiting a handler: `Ok(None)` means it returned nothing
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// A function the gateway can invoke
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, event: Value, context: Value, callback: Callback) -> HandlerResult;
}

/// Completion callback handed to a handler
///
/// Cloneable and `Send`, so a handler may move it into a spawned task and
/// complete after it has returned.
#[derive(Clone)]
pub struct Callback {
    latch: Arc<CompletionLatch>,
}

impl Callback {
    pub fn new(latch: Arc<CompletionLatch>) -> Self {
        Self { latch }
    }

    /// Node-style completion: a truthy `error` fails the invocation,
    /// otherwise `result` is sent with status 200
    ///
    /// Returns `true` if this call committed the response.
    pub fn call(&self, error: Option<Value>, result: Option<Value>) -> bool {
        match error.filter(is_truthy) {
            Some(err) => {
                error!(error = %err, "Handler reported an error through its callback");
                self.latch
                    .commit(CompletionResult::Failure(GatewayFailure::callback(err)))
            }
            None => self
                .latch
                .commit(CompletionResult::Success(result.unwrap_or(Value::Null))),
        }
    }

    pub fn succeed(&self, result: impl Into<Value>) -> bool {
        self.call(None, Some(result.into()))
    }

    pub fn fail(&self, error: impl Into<Value>) -> bool {
        self.call(Some(error.into()), None)
    }
}

/// Handler backed by an async closure
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Value, Value, Callback) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Value, Value, Callback) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn invoke(&self, event: Value, context: Value, callback: Callback) -> HandlerResult {
        (self.f)(event, context, callback).await
    }
}
