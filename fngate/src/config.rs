//! Configuration management

use fngate_runtime::handlers::DEFAULT_MAX_BODY_BYTES;
use fngate_runtime::HandlerDefaults;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub handler: HandlerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Where handler modules live and which one to use when a request names none
#[derive(Debug, Deserialize)]
pub struct HandlerConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            path: None,
            name: None,
        }
    }
}

impl HandlerConfig {
    pub fn defaults(&self) -> HandlerDefaults {
        HandlerDefaults {
            module_path: self.path.clone(),
            export_name: self.name.clone(),
        }
    }
}

fn default_port() -> u16 {
    8081
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Load configuration from an optional file and `FNGATE_*` environment variables
    ///
    /// Nested keys use a double underscore, e.g. `FNGATE_SERVER__PORT`.
    pub fn load(file: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("FNGATE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }

    /// Address the server binds to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_body_bytes, 6 * 1024 * 1024);
        assert_eq!(config.handler.root, PathBuf::from("."));
        assert_eq!(config.handler.defaults(), HandlerDefaults::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[handler]
root = "/srv/functions"
path = "orders"
name = "handle"
"#
        )
        .unwrap();

        let name = file.path().to_str().unwrap();
        let config = Config::load(name).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.handler.root, PathBuf::from("/srv/functions"));
        assert_eq!(
            config.handler.defaults(),
            HandlerDefaults {
                module_path: Some("orders".to_string()),
                export_name: Some("handle".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("absent");
        let config = Config::load(name.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 3000;
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");

        config.server.host = "not a host".to_string();
        assert!(config.socket_addr().is_err());
    }
}
