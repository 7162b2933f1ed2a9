//! HTTP Server Configuration
//!
//! Loaded from an optional JSON file, then overridden by `MARKETGATE_*`
//! environment variables. Every field has a default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{ServerError, ServerResult};
use crate::observability::LogFormat;
use crate::ratelimit::{ForwardedHeaderPolicy, DEFAULT_SWEEP_INTERVAL_MS};

pub const ENV_HOST: &str = "MARKETGATE_HOST";
pub const ENV_PORT: &str = "MARKETGATE_PORT";
pub const ENV_JWT_SECRET: &str = "MARKETGATE_JWT_SECRET";
pub const ENV_LOG: &str = "MARKETGATE_LOG";

/// Admin account created at startup. The hash comes from
/// `marketgate hash-password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// HS256 signing secret for admin tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// `tracing` filter directive, e.g. `marketgate=debug`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Which forwarding headers identify the client for rate limiting
    #[serde(default)]
    pub forwarded_headers: ForwardedHeaderPolicy,

    /// How often expired rate limit entries are dropped
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_jwt_secret() -> String {
    "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string()
}

fn default_log_filter() -> String {
    "marketgate=info,tower_http=info".to_string()
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            jwt_secret: default_jwt_secret(),
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
            forwarded_headers: ForwardedHeaderPolicy::default(),
            sweep_interval_ms: default_sweep_interval_ms(),
            bootstrap_admin: None,
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ServerError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// File (if given) plus environment overrides
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Applies `MARKETGATE_*` overrides looked up through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ServerResult<()> {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| ServerError::InvalidEnv {
                var: ENV_PORT,
                value: port,
            })?;
        }
        if let Some(secret) = lookup(ENV_JWT_SECRET) {
            self.jwt_secret = secret;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == default_jwt_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::net::IpAddr;

    #[test]
    fn test_default_config() {
        let config = HttpServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(!config.cors_origins.is_empty());
        assert_eq!(config.sweep_interval_ms, 300_000);
        assert_eq!(config.forwarded_headers, ForwardedHeaderPolicy::TrustAll);
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_socket_addr() {
        let config = HttpServerConfig::with_port(8080);
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "port": 4100,
                "jwt_secret": "s3cret",
                "forwarded_headers": {{"mode": "trusted_proxies", "proxies": ["10.0.0.1"]}}
            }}"#
        )
        .unwrap();

        let config = HttpServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(
            config.forwarded_headers,
            ForwardedHeaderPolicy::TrustedProxies {
                proxies: vec!["10.0.0.1".parse::<IpAddr>().unwrap()]
            }
        );
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            HttpServerConfig::from_file(&missing),
            Err(ServerError::ConfigRead { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ port: ").unwrap();
        assert!(matches!(
            HttpServerConfig::from_file(&broken),
            Err(ServerError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_HOST, "127.0.0.1"),
            (ENV_PORT, "9000"),
            (ENV_JWT_SECRET, "from-env"),
            (ENV_LOG, "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = HttpServerConfig::default();
        config
            .apply_overrides(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.socket_addr(), "127.0.0.1:9000");
        assert_eq!(config.jwt_secret, "from-env");
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = HttpServerConfig::default();
        let err = config
            .apply_overrides(|var| (var == ENV_PORT).then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidEnv { var: ENV_PORT, .. }));
        assert_eq!(config.port, 3000);
    }
}
