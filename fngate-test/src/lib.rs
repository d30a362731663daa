//! Test utilities for fngate
//!
//! Provides utilities for integration testing against a live gateway:
//! - Serve a gateway on a random local port
//! - Send invocations and read back status and body
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fngate_runtime::{handler_fn, HandlerModule, ModuleRegistry};
//! use fngate_test::TestServer;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_echo() {
//!     let registry = ModuleRegistry::new().with_module(
//!         "fn/echo",
//!         HandlerModule::new().with_handler(
//!             "handle",
//!             handler_fn(|event, _context, _callback| async move { Ok(Some(event)) }),
//!         ),
//!     );
//!     let server = TestServer::start(Arc::new(registry)).await.unwrap();
//!
//!     let response = server
//!         .client()
//!         .invoke("fn/echo", "handle", json!("hi"), json!(null))
//!         .await
//!         .unwrap();
//!     assert_eq!(response.text, "hi");
//! }
//! ```

pub mod client;
pub mod server;

pub use client::{ClientError, GatewayClient, GatewayResponse};
pub use server::{TestError, TestServer};

/// Per-request timeout used by [`GatewayClient`]
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
