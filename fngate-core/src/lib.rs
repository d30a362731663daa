//! Core types for fngate
//!
//! This crate provides the types shared by the gateway runtime and the
//! `fngate` binary: the failure taxonomy with its fixed diagnostics, and
//! per-invocation request ids.

pub mod error;
pub mod request_id;

pub use error::{FailureKind, GatewayFailure, HANDLER_NOT_FOUND_MESSAGE, INVALID_EXPORT_MESSAGE};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
