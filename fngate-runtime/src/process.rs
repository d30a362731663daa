//! Executable handler modules
//!
//! A module path names an executable file, relative to the loader's root
//! unless absolute. Every export name of an executable module is callable:
//! invoking it runs the file with the export name as its only argument,
//! writes `{"event": .., "context": ..}` to stdin and reads the returned
//! value from stdout. Files without an execute bit load fine but export
//! plain values, so they fail the invocability check.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

use crate::handler::{Callback, Handler, HandlerError, HandlerResult};
use crate::module::{Export, Module, ModuleLoader};
use crate::resolver::ResolutionError;

/// Loads executables below a root directory
#[derive(Debug, Clone)]
pub struct ProcessLoader {
    root: PathBuf,
}

impl ProcessLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, module_path: &str) -> PathBuf {
        let path = Path::new(module_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl ModuleLoader for ProcessLoader {
    async fn load(&self, module_path: &str) -> Result<Arc<dyn Module>, ResolutionError> {
        let path = self.locate(module_path);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            debug!(path = %path.display(), error = %e, "Handler module not readable");
            ResolutionError::ModuleNotFound(module_path.to_string())
        })?;

        if !metadata.is_file() {
            return Err(ResolutionError::LoadFailed {
                path: module_path.to_string(),
                reason: "not a regular file".to_string(),
            });
        }

        let executable = is_executable(&metadata);
        if !executable {
            warn!(path = %path.display(), "Handler module is not executable");
        }

        Ok(Arc::new(ProcessModule { path, executable }))
    }
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    true
}

/// An executable file loaded as a module
#[derive(Debug)]
pub struct ProcessModule {
    path: PathBuf,
    executable: bool,
}

impl Module for ProcessModule {
    fn export(&self, name: &str) -> Option<Export> {
        if name.is_empty() {
            return None;
        }

        if self.executable {
            Some(Export::Function(Arc::new(ProcessHandler {
                program: self.path.clone(),
                export_name: name.to_string(),
            })))
        } else {
            Some(Export::Value(Value::String(self.path.display().to_string())))
        }
    }
}

/// Runs one export of an executable module per invocation
///
/// Only the return channel is available to a process; its callback is
/// never called.
#[derive(Debug)]
pub struct ProcessHandler {
    program: PathBuf,
    export_name: String,
}

#[async_trait]
impl Handler for ProcessHandler {
    async fn invoke(&self, event: Value, context: Value, _callback: Callback) -> HandlerResult {
        let input = serde_json::to_vec(&json!({ "event": event, "context": context }))?;

        debug!(program = %self.program.display(), export = %self.export_name, "Spawning handler process");

        let mut child = Command::new(&self.program)
            .arg(&self.export_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let (written, output) = tokio::join!(write_input(stdin, input), child.wait_with_output());
        let output = output?;
        written?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("Handler process exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(HandlerError::Failed(message));
        }

        Ok(parse_output(&output.stdout))
    }
}

async fn write_input(stdin: Option<ChildStdin>, input: Vec<u8>) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    // A handler that exits without reading its input is not an error
    match stdin.write_all(&input).await {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Empty output means the handler returned nothing; JSON output is the
/// returned value; anything else is returned as text
fn parse_output(stdout: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
