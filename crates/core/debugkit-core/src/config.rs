//! Runtime settings for debugkit.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional settings file (TOML, YAML or JSON, detected by extension), then
//! `DEBUGKIT_*` environment variables. Nested keys use `__` in variable
//! names, e.g. `DEBUGKIT_DISPATCH__MAX_CONCURRENCY=4`.

use crate::{traits::Validatable, DebugKitError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for one external call, in seconds
pub const DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS: u64 = 90;

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the credentials YAML file
    pub credentials_path: PathBuf,
    /// Dispatch and fan-out tuning
    pub dispatch: DispatchSettings,
    /// Logging output
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.yaml"),
            dispatch: DispatchSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Environment variable prefix
    pub const ENV_PREFIX: &'static str = "DEBUGKIT";

    /// Load settings from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }
}

impl Validatable for Settings {
    fn validate(&self) -> Result<()> {
        if self.credentials_path.as_os_str().is_empty() {
            return Err(DebugKitError::config("credentials_path must not be empty"));
        }
        self.dispatch.validate()
    }
}

/// Dispatch and fan-out tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Upper bound on fan-out units executing at the same time
    pub max_concurrency: usize,
    /// Timeout for one task call (single task or one fan-out unit)
    pub task_timeout_secs: u64,
    /// Timeout for one liveness probe
    pub connection_timeout_secs: u64,
    /// Duration used when a call gives neither a range nor a duration
    pub default_duration_minutes: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            task_timeout_secs: DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS,
            connection_timeout_secs: DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS,
            default_duration_minutes: 60,
        }
    }
}

impl DispatchSettings {
    /// Task timeout as a [`Duration`]
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Connection probe timeout as a [`Duration`]
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

impl Validatable for DispatchSettings {
    fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(DebugKitError::config("dispatch.max_concurrency must be at least 1"));
        }
        if self.task_timeout_secs == 0 {
            return Err(DebugKitError::config("dispatch.task_timeout_secs must be positive"));
        }
        if self.connection_timeout_secs == 0 {
            return Err(DebugKitError::config(
                "dispatch.connection_timeout_secs must be positive",
            ));
        }
        if self.default_duration_minutes == 0 {
            return Err(DebugKitError::config(
                "dispatch.default_duration_minutes must be positive",
            ));
        }
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.is_valid());
        assert_eq!(settings.dispatch.task_timeout(), Duration::from_secs(90));
        assert_eq!(settings.dispatch.default_duration_minutes, 60);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut settings = Settings::default();
        settings.dispatch.max_concurrency = 0;
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("max_concurrency")));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debugkit.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "credentials_path = \"/etc/debugkit/creds.yaml\"\n\n[dispatch]\nmax_concurrency = 3\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.credentials_path, PathBuf::from("/etc/debugkit/creds.yaml"));
        assert_eq!(settings.dispatch.max_concurrency, 3);
        assert_eq!(settings.dispatch.task_timeout_secs, 90);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("DEBUGKIT_DISPATCH__TASK_TIMEOUT_SECS", Some("15")),
                ("DEBUGKIT_CREDENTIALS_PATH", Some("/tmp/creds.yaml")),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(settings.dispatch.task_timeout_secs, 15);
                assert_eq!(settings.credentials_path, PathBuf::from("/tmp/creds.yaml"));
            },
        );
    }

    #[test]
    fn test_missing_settings_file_is_configuration_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/debugkit.toml"))).unwrap_err();
        assert!(matches!(err, DebugKitError::Configuration(_)));
    }
}
