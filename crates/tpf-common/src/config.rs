//! ---
//! tpf_section: "01-core-functionality"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Shared primitives and utilities for the provisioning runtime."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

/// Environment variable overriding the server URL from the config file.
pub const ENV_SERVER_URL: &str = "TPF_SERVER_URL";
/// Environment variable overriding the configuration database connection string.
pub const ENV_CONFIG_DB: &str = "TPF_CONFIG_DB";

fn default_api_version() -> String {
    "6.0".to_owned()
}

fn default_collection() -> String {
    "DefaultCollection".to_owned()
}

fn default_include_all_projects() -> bool {
    true
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Errors raised while locating, parsing, or validating configuration.
///
/// Every variant is fatal: configuration problems must surface before any
/// remote call is attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file could be found among the candidates.
    #[error("no configuration files found. inspected: {searched}")]
    NotFound { searched: String },
    /// The configuration file exists but could not be read.
    #[error("unable to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`AppConfig`].
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// A required setting is absent or empty.
    #[error("required configuration key '{key}' is missing or empty")]
    MissingKey { key: &'static str },
    /// The server URL does not parse as an absolute URL.
    #[error("server.url '{value}' is not a valid URL")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Primary configuration object for the provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    /// Environment variable pointing at an explicit configuration file.
    pub const ENV_CONFIG_PATH: &str = "TPF_CONFIG";

    /// Load configuration from disk, respecting the `TPF_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, ConfigError> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from an explicit path, failing if the file is
    /// absent. Takes precedence over both the `TPF_CONFIG` override and
    /// the candidate search; used for the CLI `--config` flag.
    pub fn load_path(path: impl AsRef<Path>) -> Result<LoadedAppConfig, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = Self::from_path(path.clone())?;
        Ok(LoadedAppConfig {
            config,
            source: path,
        })
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(
        candidates: &[P],
    ) -> Result<LoadedAppConfig, ConfigError> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(ConfigError::NotFound {
            searched: candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    fn from_path(path: PathBuf) -> Result<Self, ConfigError> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut config =
            toml::from_str::<AppConfig>(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides for deployment-sensitive settings.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(ENV_SERVER_URL) {
            if !value.trim().is_empty() {
                self.server.url = value;
            }
        }
        if let Ok(value) = std::env::var(ENV_CONFIG_DB) {
            if !value.trim().is_empty() {
                self.server.config_db = value;
            }
        }
    }

    /// Validate structural invariants; called on every load path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.run.validate()?;
        Ok(())
    }

    /// Parse the configured server URL.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.server.url).map_err(|source| ConfigError::InvalidUrl {
            value: self.server.url.clone(),
            source,
        })
    }
}

impl std::str::FromStr for AppConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut config =
            toml::from_str::<AppConfig>(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Connection settings for the project-management server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Base URL of the server, e.g. `https://tfs.example.com/tfs`.
    #[serde(default)]
    pub url: String,
    /// API version sent with every request.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Connection string used to resolve the deployment service host.
    /// Opaque to this tool; forwarded during context acquisition.
    #[serde(default)]
    pub config_db: String,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingKey { key: "server.url" });
        }
        if let Err(source) = Url::parse(&self.url) {
            return Err(ConfigError::InvalidUrl {
                value: self.url.clone(),
                source,
            });
        }
        if self.config_db.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                key: "server.config_db",
            });
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                key: "server.api_version",
            });
        }
        Ok(())
    }
}

/// Settings steering a provisioning sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Exact, case-sensitive name of the collection to process.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Enumerate all projects, including those marked for deletion.
    #[serde(default = "default_include_all_projects")]
    pub include_all_projects: bool,
    /// What to do when a single project's decision fails.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl RunConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                key: "run.collection",
            });
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            include_all_projects: default_include_all_projects(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Behavior when a remote call fails while deciding one project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Propagate the failure and terminate the run (historical behavior).
    #[default]
    Abort,
    /// Report the failure, continue with the next project, and exit
    /// non-zero once the run completes.
    Isolate,
}

/// Logging sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
