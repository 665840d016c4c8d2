use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment variable overrides (e.g. `PREPULL_INTERVAL_SECS`)
const ENV_PREFIX: &str = "PREPULL";

/// Environment variable naming an optional configuration file
const CONFIG_FILE_VAR: &str = "PREPULL_CONFIG_FILE";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Path of the mounted credential store (Docker config.json or a raw auth token)
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Seconds to sleep between the end of one pull cycle and the start of the next
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("/root/.docker/config.json")
}

fn default_interval_secs() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Settings {
    /// Load settings from `PREPULL_CONFIG_FILE` (if set) and `PREPULL_*` environment variables
    pub fn new() -> Result<Self, ConfigError> {
        let config_file = env::var(CONFIG_FILE_VAR)
            .ok()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Self::load(config_file.as_deref(), ENV_PREFIX)
    }

    /// Layered loader: defaults, then the optional file, then prefixed environment variables
    pub fn load(config_file: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::Message(format!(
                    "Config file {} set via {} does not exist",
                    path.display(),
                    CONFIG_FILE_VAR
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(env_prefix).try_parsing(true));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Message(
                "interval_secs must be greater than zero".to_string(),
            ));
        }

        if self.credentials_path.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "credentials_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
