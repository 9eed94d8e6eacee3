use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catchup::{FetchFailurePolicy, PollSettings};
use crate::verify::MatrixDimensions;

pub const DEFAULT_RPC_URL: &str = "http://localhost:9933";
/// Environment variable overriding `rpc.url`.
pub const RPC_URL_ENV: &str = "DA_RPC_URL";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node connection settings.
    pub rpc: RpcConfig,

    /// How many cells are challenged per block.
    pub sampling: SamplingConfig,

    /// Data matrix shape. Must agree with the node's encoding.
    pub matrix: MatrixConfig,

    /// Cell verification worker settings.
    pub verifier: VerifierConfig,

    /// Polling cadence and catch-up behavior.
    pub poll: PollConfig,

    pub startup: StartupConfig,
}

impl Config {
    /// The default service home directory.
    pub const APP_HOME: &str = ".da-light-client";
    /// The default configuration directory.
    pub const CONFIG_DIR: &str = "config";
    /// The default configuration file in YAML format.
    pub const CONFIG_FILE: &str = "config.yaml";

    /// Initializes the local configuration directory and writes the default config if missing.
    pub fn init() -> Result<PathBuf> {
        Self::init_in(&Self::home_dir()?)
    }

    /// Writes the default config below `home` unless one already exists.
    pub fn init_in(home: &Path) -> Result<PathBuf> {
        let config_dir = home.join(Self::CONFIG_DIR);
        fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join(Self::CONFIG_FILE);
        if !config_path.exists() {
            info!("Creating default config at {config_path:?}");
            let yaml = serde_yaml::to_string(&Config::default())?;
            fs::write(&config_path, yaml)?;
        } else {
            info!("Config file already exists at {config_path:?}");
        }

        Ok(config_path)
    }

    pub fn home_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow!("cannot find home directory"))?
            .join(Self::APP_HOME))
    }

    /// Returns the default application config path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(Self::CONFIG_DIR).join(Self::CONFIG_FILE))
    }

    /// Loads the application config from the service home directory.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = env::var(RPC_URL_ENV) {
            info!("Using {RPC_URL_ENV}={url}");
            config.rpc.url = url;
        }
        config.validate()?;

        Ok(config)
    }

    /// Reads a config file without applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("config file not found at {}", path.display()));
        }

        info!("Reading config file at {}", path.display());
        let config_yaml = fs::read_to_string(path).context("Failed to read config file from path")?;
        let config = serde_yaml::from_str(&config_yaml)?;

        Ok(config)
    }

    /// Rejects settings the sampler or the verifier pool cannot work with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.sampling.sample_count > 0, "sampling.sample_count must be positive");
        ensure!(
            self.matrix.rows > 0 && self.matrix.cols > 0,
            "matrix dimensions must be positive, got {}x{}",
            self.matrix.cols,
            self.matrix.rows
        );
        ensure!(self.verifier.workers > 0, "verifier.workers must be positive");
        ensure!(self.startup.max_attempts > 0, "startup.max_attempts must be positive");
        if self.sampling.distinct {
            ensure!(
                self.sampling.sample_count as u64 <= self.dimensions().cells(),
                "cannot draw {} distinct cells from a {}x{} matrix",
                self.sampling.sample_count,
                self.matrix.cols,
                self.matrix.rows
            );
        }
        Ok(())
    }

    pub fn dimensions(&self) -> MatrixDimensions {
        MatrixDimensions::new(self.matrix.rows, self.matrix.cols)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            no_header_backoff: Duration::from_millis(self.poll.no_header_backoff_ms),
            idle_backoff: Duration::from_millis(self.poll.idle_backoff_ms),
            fetch_failure: self.poll.fetch_failure,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// HTTP JSON-RPC endpoint of the chain node.
    pub url: String,

    /// Timeout for a single RPC round-trip.
    pub request_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.into(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Cells challenged per block.
    pub sample_count: usize,

    /// Draw cells without replacement.
    pub distinct: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_count: 3,
            distinct: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub cols: u32,
    pub rows: u32,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self { cols: 256, rows: 256 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Maximum concurrent cell checks.
    pub workers: usize,

    /// A check still running after this long counts as a failed sample.
    pub sample_timeout_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            sample_timeout_ms: 10_000,
        }
    }
}

impl VerifierConfig {
    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub no_header_backoff_ms: u64,
    pub idle_backoff_ms: u64,
    pub fetch_failure: FetchFailurePolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            no_header_backoff_ms: 3000,
            idle_backoff_ms: 6000,
            fetch_failure: FetchFailurePolicy::Skip,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Connection attempts before the process gives up.
    pub max_attempts: u32,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = Config::default();

        assert_eq!(config.rpc.url, "http://localhost:9933");
        assert_eq!(config.sampling.sample_count, 3);
        assert_eq!(config.dimensions(), MatrixDimensions::new(256, 256));
        assert_eq!(config.poll_settings().no_header_backoff, Duration::from_secs(3));
        assert_eq!(config.poll_settings().idle_backoff, Duration::from_secs(6));
        assert_eq!(config.poll.fetch_failure, FetchFailurePolicy::Skip);
        config.validate().unwrap();
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let home = TempDir::new().unwrap();

        let path = Config::init_in(home.path()).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let home = TempDir::new().unwrap();
        let path = Config::init_in(home.path()).unwrap();
        fs::write(&path, "sampling:\n  sample_count: 9\n").unwrap();

        Config::init_in(home.path()).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().sampling.sample_count, 9);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("config.yaml");
        fs::write(&path, "poll:\n  fetch_failure: halt\nmatrix:\n  cols: 128\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.poll.fetch_failure, FetchFailurePolicy::Halt);
        assert_eq!(config.matrix.cols, 128);
        assert_eq!(config.matrix.rows, 256);
        assert_eq!(config.poll.idle_backoff_ms, 6000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let home = TempDir::new().unwrap();
        assert!(Config::load_from(&home.path().join("nope.yaml")).is_err());
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        let mut config = Config::default();
        config.sampling.sample_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.matrix.cols = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.matrix = MatrixConfig { cols: 2, rows: 2 };
        config.sampling = SamplingConfig {
            sample_count: 5,
            distinct: true,
        };
        assert!(config.validate().is_err());

        config.sampling.distinct = false;
        config.validate().unwrap();
    }
}
