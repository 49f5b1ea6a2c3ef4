//! Server configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// The protocol version advertised in the banner.
pub const RWHOIS_VERSION: &str = "V-1.5";

const SERVER_IMPL: &str = "rwhoisd-rs";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server options, loadable from a TOML file. Every field has a
/// default, so a partial (or absent) file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Interface address to bind; empty means all interfaces
    pub server_address: String,
    /// Hostname advertised in the banner; the machine hostname when
    /// unset
    pub server_hostname: Option<String>,
    /// Default per-session response limit; 0 means no limit
    pub default_limit: u32,
    /// Smallest value `-limit` may set; 0 lets clients disable limits
    pub min_limit: u32,
    /// Largest value `-limit` may set
    pub max_limit: u32,
    /// Log at debug level
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4321,
            server_address: String::new(),
            server_hostname: None,
            default_limit: 0,
            min_limit: 0,
            max_limit: 256,
            verbose: false,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The hostname the banner advertises.
    pub fn hostname(&self) -> String {
        match &self.server_hostname {
            Some(name) => name.clone(),
            None => gethostname::gethostname().to_string_lossy().into_owned(),
        }
    }

    /// The connect banner, without line terminator.
    pub fn banner_string(&self) -> String {
        format!(
            "%rwhois {RWHOIS_VERSION} {} ({SERVER_IMPL} {SERVER_VERSION})",
            self.hostname()
        )
    }

    /// The socket address to bind.
    pub fn bind_addr(&self) -> String {
        let host = if self.server_address.is_empty() {
            "0.0.0.0"
        } else {
            &self.server_address
        };
        format!("{host}:{}", self.port)
    }

    /// Clamp a requested session limit into `[min_limit, max_limit]`.
    pub fn clamp_limit(&self, requested: i64) -> u32 {
        if requested > self.max_limit as i64 {
            self.max_limit
        } else if requested < self.min_limit as i64 {
            self.min_limit
        } else {
            requested as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4321);
        assert_eq!(config.max_limit, 256);
        assert_eq!(config.min_limit, 0);
        assert_eq!(config.default_limit, 0);
        assert_eq!(config.bind_addr(), "0.0.0.0:4321");
    }

    #[test]
    fn test_banner() {
        let config = ServerConfig {
            server_hostname: Some("rwhois.example.net".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.banner_string(),
            format!("%rwhois V-1.5 rwhois.example.net (rwhoisd-rs {SERVER_VERSION})")
        );
    }

    #[test]
    fn test_bind_addr_with_interface() {
        let config = ServerConfig {
            server_address: "127.0.0.1".to_string(),
            port: 4343,
            ..Default::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:4343");
    }

    #[test]
    fn test_clamp_limit() {
        let config = ServerConfig {
            min_limit: 5,
            max_limit: 100,
            ..Default::default()
        };
        assert_eq!(config.clamp_limit(50), 50);
        assert_eq!(config.clamp_limit(0), 5);
        assert_eq!(config.clamp_limit(-3), 5);
        assert_eq!(config.clamp_limit(5000), 100);
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rwhoisd.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "port = 4343\nmax_limit = 64").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 4343);
        assert_eq!(config.max_limit, 64);
        // untouched fields keep their defaults
        assert_eq!(config.min_limit, 0);
        assert!(!config.verbose);
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rwhoisd.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "port = \"not a port\"").unwrap();
        assert!(matches!(
            ServerConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
