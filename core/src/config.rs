//! Configuration
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. `stopify.toml` in the working directory, or the file passed with `--config`
//! 3. `STOPIFY__<SECTION>__<KEY>` environment variables (a `.env` file is loaded first)
//!
//! ```toml
//! [compiler]
//! strategy = "jumper"
//! optimize = true
//!
//! [scheduler]
//! default_interval = 100
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{Options, Strategy};

const DEFAULT_CONFIG_FILE: &str = "stopify.toml";
const ENV_PREFIX: &str = "STOPIFY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub strategy: Strategy,
    pub debug: bool,
    pub optimize: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Cps,
            debug: false,
            optimize: false,
        }
    }
}

impl CompilerConfig {
    pub fn options(&self) -> Options {
        Options::new().debug(self.debug).optimize(self.optimize)
    }
}

/// Slice sizing for the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Boundaries per slice (fixed) or milliseconds per slice (flexible) when the run
    /// options leave it open
    pub default_interval: u64,
    pub min_interval: u64,
    pub max_interval: u64,
    /// Largest factor a flexible slice may grow by from one slice to the next
    pub max_growth: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interval: 100,
            min_interval: 1,
            max_interval: 1_000_000,
            max_growth: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load with the default search path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.default_interval == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.default_interval must be positive".to_string(),
            ));
        }
        if s.min_interval == 0 || s.min_interval > s.max_interval {
            return Err(ConfigError::Invalid(format!(
                "scheduler.min_interval ({}) must be positive and at most max_interval ({})",
                s.min_interval, s.max_interval
            )));
        }
        if s.max_growth.is_nan() || s.max_growth <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "scheduler.max_growth must be greater than 1, got {}",
                s.max_growth
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
    strategy: Option<Strategy>,
}

impl ConfigBuilder {
    /// Read this file instead of `stopify.toml`; it must exist.
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `.env` and `STOPIFY__*` variables
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Override the compiler strategy after every other layer
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        match &self.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()));
                }
                builder = builder.add_source(file_source(path).required(true));
            }
            None => {
                builder =
                    builder.add_source(file_source(Path::new(DEFAULT_CONFIG_FILE)).required(false));
            }
        }

        if !self.skip_env {
            // a missing .env file is fine
            let _ = dotenvy::dotenv();
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: Config = builder.build()?.try_deserialize()?;
        if let Some(strategy) = self.strategy {
            config.compiler.strategy = strategy;
        }
        config.validate()?;

        debug!(
            strategy = %config.compiler.strategy,
            default_interval = config.scheduler.default_interval,
            "configuration loaded"
        );
        Ok(config)
    }
}

fn file_source(path: &Path) -> config::File<config::FileSourceFile, config::FileFormat> {
    config::File::from(path).format(config::FileFormat::Toml)
}
