//! Invocation coordination
//!
//! Drives one request through handler resolution, the invocability check
//! and the handler call, and decides which completion channel produces the
//! response.

use fngate_core::GatewayFailure;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

use crate::handler::{Callback, Handler};
use crate::invocation::{is_truthy, CompletionResult, InvocationRequest};
use crate::latch::CompletionLatch;
use crate::module::ModuleLoader;
use crate::resolver::HandlerResolver;

/// Handler location used when a request body does not name one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerDefaults {
    pub module_path: Option<String>,
    pub export_name: Option<String>,
}

/// Turns inbound requests into exactly one committed result each
pub struct InvocationCoordinator {
    resolver: HandlerResolver,
    defaults: HandlerDefaults,
}

impl InvocationCoordinator {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            resolver: HandlerResolver::new(loader),
            defaults: HandlerDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: HandlerDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn resolver(&self) -> &HandlerResolver {
        &self.resolver
    }

    /// Run an invocation and wait for its committed result
    ///
    /// Returns as soon as either completion channel commits, even while the
    /// handler keeps running. Does not return while neither channel commits:
    /// a handler that returns nothing and never calls its callback keeps the
    /// request open indefinitely.
    pub async fn handle(&self, request: InvocationRequest) -> CompletionResult {
        let (latch, _running) = self.start(request).await;
        latch.committed().await
    }

    /// Run an invocation until the handler itself settles
    ///
    /// The returned latch may still be pending if the handler returned
    /// nothing; its callback can commit later.
    pub async fn dispatch(&self, request: InvocationRequest) -> Arc<CompletionLatch> {
        let (latch, running) = self.start(request).await;
        if let Some(running) = running {
            if let Err(e) = running.await {
                warn!(error = %e, "Handler task did not finish");
            }
        }
        latch
    }

    /// Resolve the handler and spawn its invocation
    ///
    /// Resolution failures are committed before returning, in which case no
    /// task is spawned.
    async fn start(&self, request: InvocationRequest) -> (Arc<CompletionLatch>, Option<JoinHandle<()>>) {
        let latch = Arc::new(CompletionLatch::new());

        let handler = match self.resolve_handler(&request).await {
            Ok(handler) => handler,
            Err(failure) => {
                latch.commit(CompletionResult::Failure(failure));
                return (latch, None);
            }
        };

        let running = tokio::spawn(
            Self::run(handler, request.event, request.context, latch.clone()).in_current_span(),
        );

        (latch, Some(running))
    }

    async fn run(handler: Arc<dyn Handler>, event: Value, context: Value, latch: Arc<CompletionLatch>) {
        let callback = Callback::new(latch.clone());
        let call = handler.invoke(event, context, callback);

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(returned)) => Self::settle(&latch, returned),
            Ok(Err(err)) => {
                warn!(error = %err, "Handler failed");
                latch.commit(CompletionResult::Failure(GatewayFailure::invocation(
                    err.to_string(),
                )));
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(error = %message, "Handler panicked");
                latch.commit(CompletionResult::Failure(GatewayFailure::invocation(
                    message,
                )));
            }
        }
    }

    /// Apply the return channel after the handler settled
    fn settle(latch: &CompletionLatch, returned: Option<Value>) {
        if latch.is_committed() {
            debug!("Callback already committed, discarding returned value");
            return;
        }

        match returned.filter(is_truthy) {
            Some(value) => {
                latch.commit(CompletionResult::Success(value));
            }
            None => debug!("Handler returned no value, response left to the callback"),
        }
    }

    async fn resolve_handler(
        &self,
        request: &InvocationRequest,
    ) -> Result<Arc<dyn Handler>, GatewayFailure> {
        let module_path = request
            .handler_path
            .as_deref()
            .or(self.defaults.module_path.as_deref());
        let export_name = request
            .handler_name
            .as_deref()
            .or(self.defaults.export_name.as_deref());

        let resolved = self
            .resolver
            .resolve(module_path, export_name)
            .await
            .map_err(|err| {
                warn!(error = %err, "Handler resolution failed");
                GatewayFailure::resolution()
            })?;

        resolved.export.as_handler().cloned().ok_or_else(|| {
            warn!(
                module_path = %resolved.identity.module_path,
                export_name = %resolved.identity.export_name,
                "Resolved export is not callable"
            );
            GatewayFailure::invocability()
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Handler panicked".to_string()
    }
}
