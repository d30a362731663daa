//! Lazy handler resolution
//!
//! The resolver owns a single process-wide slot. The first successful
//! resolution fills it and every later call returns that same export,
//! whatever module path and export name are passed. A process serves exactly
//! one handler; changing the handler means restarting the gateway.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::module::{Export, ModuleLoader};

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Handler path was not provided")]
    MissingPath,

    #[error("Handler name was not provided")]
    MissingName,

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module {path} does not export {name}")]
    ExportNotFound { path: String, name: String },

    #[error("Failed to load module {path}: {reason}")]
    LoadFailed { path: String, reason: String },
}

/// Module path and export name a handler was resolved from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerIdentity {
    pub module_path: String,
    pub export_name: String,
}

/// The cached result of resolution
#[derive(Debug, Clone)]
pub struct ResolvedHandler {
    pub identity: HandlerIdentity,
    pub export: Export,
}

/// Resolves the gateway's handler once and caches it for the process lifetime
pub struct HandlerResolver {
    loader: Arc<dyn ModuleLoader>,
    slot: OnceCell<ResolvedHandler>,
}

impl HandlerResolver {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            slot: OnceCell::new(),
        }
    }

    /// The cached handler, if resolution already succeeded
    pub fn cached(&self) -> Option<&ResolvedHandler> {
        self.slot.get()
    }

    /// Resolve `export_name` from `module_path`, or return the cached handler
    ///
    /// Arguments are ignored once the slot is filled, so they may be absent
    /// on every request after the first. Concurrent first calls are
    /// serialized: one loads, the others wait and observe its result. A
    /// failed resolution leaves the slot empty for the next request.
    pub async fn resolve(
        &self,
        module_path: Option<&str>,
        export_name: Option<&str>,
    ) -> Result<&ResolvedHandler, ResolutionError> {
        if let Some(resolved) = self.slot.get() {
            debug!(module_path = %resolved.identity.module_path, "Using cached handler");
            return Ok(resolved);
        }

        self.slot
            .get_or_try_init(|| async {
                let module_path = module_path.ok_or(ResolutionError::MissingPath)?;
                let export_name = export_name.ok_or(ResolutionError::MissingName)?;
                self.load(module_path, export_name).await
            })
            .await
    }

    async fn load(
        &self,
        module_path: &str,
        export_name: &str,
    ) -> Result<ResolvedHandler, ResolutionError> {
        let module = self.loader.load(module_path).await?;
        let export = module
            .export(export_name)
            .ok_or_else(|| ResolutionError::ExportNotFound {
                path: module_path.to_string(),
                name: export_name.to_string(),
            })?;

        info!(
            module_path = %module_path,
            export_name = %export_name,
            callable = export.is_callable(),
            "Resolved handler"
        );

        Ok(ResolvedHandler {
            identity: HandlerIdentity {
                module_path: module_path.to_string(),
                export_name: export_name.to_string(),
            },
            export,
        })
    }
}
