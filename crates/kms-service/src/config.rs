//! Service configuration.
//!
//! Loaded from `KMS_*` environment variables, from a YAML document, or
//! built explicitly. Every loader validates through the same path, so a
//! configuration that exists is a usable one.
//!
//! ```yaml
//! default_timeout_ms: 30000
//! lock_wait_ms: 5000
//! generate_initial_key: false
//! allowed_providers: [Internal]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use kms_core::{Provider, ValidationError};

/// Default bound on the per-pool lock wait.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Runtime configuration for [`crate::KeyPoolService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Deadline applied to requests whose context carries none.
    pub default_timeout: Option<Duration>,
    /// Maximum wait for the per-pool lock.
    pub lock_wait: Duration,
    /// Generate the first material key when a non-import pool is created.
    pub generate_initial_key: bool,
    /// Providers that pools may be created with.
    pub allowed_providers: Vec<Provider>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            lock_wait: DEFAULT_LOCK_WAIT,
            generate_initial_key: false,
            allowed_providers: Provider::all().to_vec(),
        }
    }
}

/// On-disk shape of [`ServiceConfig`]. Durations are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    default_timeout_ms: Option<u64>,
    lock_wait_ms: u64,
    generate_initial_key: bool,
    allowed_providers: Vec<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

impl From<&ServiceConfig> for ConfigFile {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            default_timeout_ms: config.default_timeout.map(duration_millis),
            lock_wait_ms: duration_millis(config.lock_wait),
            generate_initial_key: config.generate_initial_key,
            allowed_providers: config
                .allowed_providers
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
        }
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl ConfigFile {
    fn into_config(self) -> Result<ServiceConfig, ConfigError> {
        let allowed_providers = self
            .allowed_providers
            .iter()
            .map(|p| p.trim().parse::<Provider>())
            .collect::<Result<Vec<_>, _>>()?;
        ServiceConfig {
            default_timeout: self
                .default_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            lock_wait: Duration::from_millis(self.lock_wait_ms),
            generate_initial_key: self.generate_initial_key,
            allowed_providers,
        }
        .validated()
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `KMS_DEFAULT_TIMEOUT_MS` (default: none; `0` also means none)
    /// - `KMS_LOCK_WAIT_MS` (default: 5000)
    /// - `KMS_GENERATE_INITIAL_KEY` (default: false)
    /// - `KMS_ALLOWED_PROVIDERS`, comma-separated (default: every provider)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ConfigFile::default();
        ConfigFile {
            default_timeout_ms: env_parse("KMS_DEFAULT_TIMEOUT_MS")?,
            lock_wait_ms: env_parse("KMS_LOCK_WAIT_MS")?.unwrap_or(defaults.lock_wait_ms),
            generate_initial_key: env_parse("KMS_GENERATE_INITIAL_KEY")?
                .unwrap_or(defaults.generate_initial_key),
            allowed_providers: std::env::var("KMS_ALLOWED_PROVIDERS")
                .ok()
                .map(|raw| raw.split(',').map(str::to_string).collect())
                .unwrap_or(defaults.allowed_providers),
        }
        .into_config()
    }

    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str::<ConfigFile>(text)?.into_config()
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Render as YAML in the same shape [`ServiceConfig::from_yaml_str`]
    /// accepts.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(&ConfigFile::from(self))?)
    }

    /// Check ranges and consistency.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] if `lock_wait` is zero or no provider
    /// is allowed.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.lock_wait.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "lock_wait",
                reason: "must be greater than zero".into(),
            });
        }
        if self.allowed_providers.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "allowed_providers",
                reason: "at least one provider must be allowed".into(),
            });
        }
        Ok(self)
    }

    /// Whether pools may be created with `provider`.
    pub fn allows(&self, provider: Provider) -> bool {
        self.allowed_providers.contains(&provider)
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: var,
                reason: format!("cannot parse {raw:?}"),
            }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value is malformed or out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// The field or environment variable.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A provider name is not recognised.
    #[error(transparent)]
    Provider(#[from] ValidationError),

    /// The configuration file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The YAML document is malformed or has unknown fields.
    #[error("malformed configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ConfigError> for kms_core::KmsError {
    fn from(err: ConfigError) -> Self {
        ValidationError::InvalidConfiguration(err.to_string()).into()
    }
}
