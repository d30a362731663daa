//! Function gateway runtime for fngate
//!
//! Adapts a single user-supplied handler into an HTTP service. The handler
//! is resolved lazily from a module path and export name on the first
//! request, then every request invokes it with the body's `event` and
//! `context`. A handler completes through its callback or its returned
//! value; the first of the two commits the response.

pub mod coordinator;
pub mod handler;
pub mod handlers;
pub mod invocation;
pub mod latch;
pub mod module;
pub mod process;
pub mod resolver;

pub use coordinator::{HandlerDefaults, InvocationCoordinator};
pub use handler::{handler_fn, Callback, Handler, HandlerError, HandlerResult};
pub use handlers::{gateway_router, GatewayState};
pub use invocation::{CompletionResult, InvocationRequest};
pub use latch::CompletionLatch;
pub use module::{Export, HandlerModule, Module, ModuleLoader, ModuleRegistry};
pub use process::ProcessLoader;
pub use resolver::{HandlerIdentity, HandlerResolver, ResolutionError, ResolvedHandler};
