//! Handler modules and loaders
//!
//! A module path names a [`Module`]; a module exposes named [`Export`]s.
//! Loaders turn a module path into a module: [`ModuleRegistry`] serves
//! modules registered in-process, [`crate::process::ProcessLoader`] serves
//! executables on disk.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::handler::Handler;
use crate::resolver::ResolutionError;

/// A value exported by a module
#[derive(Clone)]
pub enum Export {
    /// A callable handler
    Function(Arc<dyn Handler>),
    /// Any other exported value; fails the invocability check
    Value(Value),
}

impl Export {
    pub fn as_handler(&self) -> Option<&Arc<dyn Handler>> {
        match self {
            Self::Function(handler) => Some(handler),
            Self::Value(_) => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Export::Function(..)"),
            Self::Value(value) => write!(f, "Export::Value({value})"),
        }
    }
}

/// A loaded module
pub trait Module: Send + Sync {
    /// Look up an export by name
    fn export(&self, name: &str) -> Option<Export>;
}

/// Loads modules by path
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, module_path: &str) -> Result<Arc<dyn Module>, ResolutionError>;
}

/// Module assembled in code from named exports
#[derive(Clone, Default)]
pub struct HandlerModule {
    exports: HashMap<String, Export>,
}

impl HandlerModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export a callable handler under `name`
    pub fn with_handler(mut self, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.exports
            .insert(name.into(), Export::Function(Arc::new(handler)));
        self
    }

    /// Export a plain value under `name`
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.exports.insert(name.into(), Export::Value(value.into()));
        self
    }

    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Module for HandlerModule {
    fn export(&self, name: &str) -> Option<Export> {
        self.exports.get(name).cloned()
    }
}

/// In-process modules keyed by module path
#[derive(Default)]
pub struct ModuleRegistry {
    modules: DashMap<String, Arc<HandlerModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any module already at `path`
    pub fn register(&self, path: impl Into<String>, module: HandlerModule) {
        let path = path.into();
        info!(module_path = %path, exports = ?module.export_names(), "Registered module");
        self.modules.insert(path, Arc::new(module));
    }

    pub fn with_module(self, path: impl Into<String>, module: HandlerModule) -> Self {
        self.register(path, module);
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(&self, module_path: &str) -> Result<Arc<dyn Module>, ResolutionError> {
        let module = self
            .modules
            .get(module_path)
            .map(|m| m.value().clone())
            .ok_or_else(|| ResolutionError::ModuleNotFound(module_path.to_string()))?;
        Ok(module)
    }
}
