//! # Billing Configuration
//!
//! Loads the strongly-typed `Settings` for every binary in the workspace and
//! installs the shared tracing subscriber.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults (see the `Default` impls in `settings`).
//! 2. An optional TOML file, `billing.toml` unless `BILLING_CONFIG` names another path.
//! 3. `BILLING__SECTION__KEY` environment variables, e.g. `BILLING__SERVER__PORT=8080`.
//! 4. The short legacy variables `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`,
//!    `DB_NAME` and `PORT`.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{DatabaseSettings, ImportSettings, LoggingSettings, ServerSettings, Settings};

/// The file read when `BILLING_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "billing.toml";
/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_VAR: &str = "BILLING_CONFIG";

/// Legacy environment variables and the setting each one overrides.
const LEGACY_ENV_VARS: [(&str, &str); 6] = [
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("PORT", "server.port"),
];

/// Loads the application configuration from the process environment and the
/// configuration file, if one exists.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let path = std::env::var(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    let env: config::Map<String, String> = std::env::vars().collect();
    load_settings_from(&path, &env)
}

/// Loads configuration from an explicit file path and environment snapshot.
///
/// A missing file is not an error.
pub fn load_settings_from(
    path: &Path,
    env: &config::Map<String, String>,
) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("BILLING")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

    let builder = LEGACY_ENV_VARS
        .iter()
        .try_fold(builder, |builder, (var, key)| {
            builder.set_override_option(*key, env.get(*var).cloned())
        })?;

    // Attempt to deserialize the entire configuration into our `Settings` struct
    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn missing_file() -> PathBuf {
        PathBuf::from("does-not-exist/billing.toml")
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let settings = load_settings_from(&missing_file(), &env(&[])).unwrap();
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.database.max_connections, 1);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.static_dir, PathBuf::from("frontend"));
        assert_eq!(settings.import.data_dir, PathBuf::from("data"));
        assert!(settings.import.command.is_none());
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn legacy_variables_override_the_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[database]\nhost = \"db.internal\"\nname = \"from_file\"\n\n[server]\nport = 4000"
        )
        .unwrap();

        let settings = load_settings_from(
            file.path(),
            &env(&[("DB_NAME", "from_env"), ("PORT", "8080"), ("DB_PASSWORD", "s3cret")]),
        )
        .unwrap();

        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.name, "from_env");
        assert_eq!(settings.database.password, "s3cret");
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn prefixed_variables_reach_nested_keys() {
        let settings = load_settings_from(
            &missing_file(),
            &env(&[
                ("BILLING__DATABASE__MAX_CONNECTIONS", "4"),
                ("BILLING__IMPORT__DATA_DIR", "/srv/csv"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.database.max_connections, 4);
        assert_eq!(settings.import.data_dir, PathBuf::from("/srv/csv"));
    }

    #[test]
    fn zero_connections_is_rejected() {
        let err = load_settings_from(
            &missing_file(),
            &env(&[("BILLING__DATABASE__MAX_CONNECTIONS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn non_ip_server_host_is_rejected() {
        let err = load_settings_from(
            &missing_file(),
            &env(&[("BILLING__SERVER__HOST", "localhost")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not an IP address"));
    }
}
