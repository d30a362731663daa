//! fngate - function handler gateway
//!
//! Accepts HTTP requests on any path and method, runs the configured
//! handler with the request's event and context, and responds with
//! whatever the handler completes with.

mod config;
mod router;

use clap::Parser;
use fngate_runtime::{GatewayState, InvocationCoordinator, ProcessLoader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "fngate")]
#[command(about = "HTTP gateway that runs a function handler per request", long_about = None)]
struct Args {
    /// Port to listen on [default: 8081]
    #[arg(short, long, env = "SCW_UPSTREAM_PORT")]
    port: Option<u16>,

    /// Host to bind to [default: 0.0.0.0]
    #[arg(long, env = "SCW_UPSTREAM_HOST")]
    host: Option<String>,

    /// Directory that handler module paths are relative to
    #[arg(long, env = "SCW_HANDLER_ROOT")]
    handler_root: Option<PathBuf>,

    /// Handler module used when a request body has no handlerPath
    #[arg(long, env = "SCW_HANDLER_PATH")]
    handler_path: Option<String>,

    /// Handler export used when a request body has no handlerName
    #[arg(long, env = "SCW_HANDLER_NAME")]
    handler_name: Option<String>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "FNGATE_MAX_BODY_BYTES")]
    max_body_bytes: Option<usize>,

    /// Configuration file name, extension optional
    #[arg(long, default_value = "fngate", env = "FNGATE_CONFIG")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "FNGATE_LOG_LEVEL")]
    log_level: String,
}

impl Args {
    /// Flags win over file and `FNGATE_*` values
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(max_body_bytes) = self.max_body_bytes {
            config.server.max_body_bytes = max_body_bytes;
        }
        if let Some(root) = self.handler_root {
            config.handler.root = root;
        }
        if self.handler_path.is_some() {
            config.handler.path = self.handler_path;
        }
        if self.handler_name.is_some() {
            config.handler.name = self.handler_name;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("fngate={},tower_http=debug", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load(&args.config)?;
    args.apply(&mut config);

    info!("Starting fngate...");
    info!("  Handler root: {}", config.handler.root.display());
    info!(
        "  Default handler: {} / {}",
        config.handler.path.as_deref().unwrap_or("-"),
        config.handler.name.as_deref().unwrap_or("-")
    );

    let loader = Arc::new(ProcessLoader::new(config.handler.root.clone()));
    let coordinator = InvocationCoordinator::new(loader).with_defaults(config.handler.defaults());
    let state = GatewayState::new(coordinator).with_max_body_bytes(config.server.max_body_bytes);

    let app = router::create_router(state);

    // Start server
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening on port {}", addr.port());

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "fngate",
            "--port",
            "9000",
            "--handler-path",
            "orders",
            "--handler-root",
            "/srv/fn",
        ]);
        let mut config = Config::default();
        config.handler.name = Some("handle".to_string());

        args.apply(&mut config);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.handler.root, PathBuf::from("/srv/fn"));
        assert_eq!(config.handler.path.as_deref(), Some("orders"));
        assert_eq!(config.handler.name.as_deref(), Some("handle"));
    }
}
