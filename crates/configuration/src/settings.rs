use crate::error::ConfigError;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section has built-in defaults, so an empty configuration is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub import: ImportSettings,
    pub logging: LoggingSettings,
}

/// Connection parameters for the PostgreSQL database.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// The database name.
    pub name: String,
    /// Upper bound on open connections. Defaults to a single shared connection.
    pub max_connections: u32,
    /// How long a request waits for the connection before failing.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            name: "billing".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        }
    }
}

/// Where the HTTP API listens and where the frontend assets live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Must be an IP address, e.g. `0.0.0.0` or `127.0.0.1`.
    pub host: String,
    pub port: u16,
    /// Directory served for every path outside `/api`.
    pub static_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("frontend"),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "server.host '{}' is not an IP address",
                self.host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// How `POST /api/import-data` launches the CSV importer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Executable to run. When unset, the `billing-import` binary next to the
    /// running server executable is used.
    pub command: Option<PathBuf>,
    /// Extra arguments. When empty, `--data-dir <data_dir>` is passed.
    pub args: Vec<String>,
    /// Directory holding `platforms.csv`, `customers.csv`, `invoices.csv` and `transactions.csv`.
    pub data_dir: PathBuf,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Log verbosity and optional file output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "billing.log".to_string(),
        }
    }
}

impl Settings {
    /// Rejects values that would only fail later at bind or connect time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must be non-zero".to_string()));
        }
        if self.database.port == 0 {
            return Err(ConfigError::ValidationError("database.port must be non-zero".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
