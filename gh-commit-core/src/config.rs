// layered configuration: defaults < config file < environment / command line
//
// everything is resolved once at startup into `CommitConfig` or `BenchConfig`
// and passed down by reference.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::bench::cost::DEFAULT_UNIT_PRICE;
use crate::error::ConfigError;
use crate::git::DEFAULT_MAX_DIFF_BYTES;

pub const CONFIG_FILE_NAME: &str = ".gh-commit.toml";
pub const DEFAULT_GH_BIN: &str = "gh";
pub const DEFAULT_COMMIT_MODEL: &str = "openai/gpt-4.1-mini";
pub const DEFAULT_BENCH_MODELS: &[&str] = &[
    "openai/gpt-4.1-nano",
    "openai/gpt-4.1-mini",
    "openai/gpt-4o-mini",
    "mistral-ai/mistral-small-2503",
    "meta/llama-4-scout-17b-16e-instruct",
];
pub const DEFAULT_RUNS: u32 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_PAUSE_MS: u64 = 500;

/// contents of `.gh-commit.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub gh_bin: Option<String>,
    pub commit: CommitSection,
    pub bench: BenchSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitSection {
    pub model: Option<String>,
    pub max_diff_bytes: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchSection {
    pub models: Option<Vec<String>>,
    pub runs: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub pause_ms: Option<u64>,
    pub unit_price: Option<f64>,
    pub provider_pricing: Option<PathBuf>,
    pub multiplier_pricing: Option<PathBuf>,
}

impl FileConfig {
    /// an explicit path must exist; otherwise `.gh-commit.toml` is used when present
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE_NAME);
                if !default.is_file() {
                    debug!("no {CONFIG_FILE_NAME} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config = Self::from_toml(&contents, &path)?;

        // rate tables named in the file are relative to the file
        if let Some(base) = path.parent() {
            config.bench.provider_pricing = config.bench.provider_pricing.map(|p| base.join(p));
            config.bench.multiplier_pricing = config.bench.multiplier_pricing.map(|p| base.join(p));
        }

        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    // zero disables the timeout
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// settings for one `gh-commit` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CommitConfig {
    pub gh_bin: String,
    pub model: String,
    pub max_diff_bytes: usize,
    pub timeout: Option<Duration>,
}

/// values that came from the environment or the command line
#[derive(Debug, Clone, Default)]
pub struct CommitOverrides {
    pub gh_bin: Option<String>,
    pub model: Option<String>,
    pub max_diff_bytes: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl CommitConfig {
    pub fn resolve(file: &FileConfig, overrides: CommitOverrides) -> Result<Self, ConfigError> {
        let config = Self {
            gh_bin: overrides
                .gh_bin
                .or_else(|| file.gh_bin.clone())
                .unwrap_or_else(|| DEFAULT_GH_BIN.to_string()),
            model: overrides
                .model
                .or_else(|| file.commit.model.clone())
                .unwrap_or_else(|| DEFAULT_COMMIT_MODEL.to_string()),
            max_diff_bytes: overrides
                .max_diff_bytes
                .or(file.commit.max_diff_bytes)
                .unwrap_or(DEFAULT_MAX_DIFF_BYTES),
            timeout: timeout_from_secs(
                overrides
                    .timeout_secs
                    .or(file.commit.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        if config.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        if config.max_diff_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_diff_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}

/// settings for one benchmark run, fixed before the first trial
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub gh_bin: String,
    pub models: Vec<String>,
    pub runs: u32,
    pub timeout: Option<Duration>,
    pub pause: Duration,
    pub unit_price: f64,
    pub provider_pricing: Option<PathBuf>,
    pub multiplier_pricing: Option<PathBuf>,
    pub progress: bool,
}

/// values that came from the environment or the command line
#[derive(Debug, Clone, Default)]
pub struct BenchOverrides {
    pub gh_bin: Option<String>,
    /// empty means "not given"
    pub models: Vec<String>,
    pub runs: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub pause_ms: Option<u64>,
    pub unit_price: Option<f64>,
    pub provider_pricing: Option<PathBuf>,
    pub multiplier_pricing: Option<PathBuf>,
    pub progress: bool,
}

impl BenchConfig {
    pub fn resolve(file: &FileConfig, overrides: BenchOverrides) -> Result<Self, ConfigError> {
        let models = if !overrides.models.is_empty() {
            overrides.models
        } else if let Some(models) = &file.bench.models {
            models.clone()
        } else {
            DEFAULT_BENCH_MODELS.iter().map(|m| m.to_string()).collect()
        };

        let config = Self {
            gh_bin: overrides
                .gh_bin
                .or_else(|| file.gh_bin.clone())
                .unwrap_or_else(|| DEFAULT_GH_BIN.to_string()),
            models: models.into_iter().map(|m| m.trim().to_string()).collect(),
            runs: overrides.runs.or(file.bench.runs).unwrap_or(DEFAULT_RUNS),
            timeout: timeout_from_secs(
                overrides
                    .timeout_secs
                    .or(file.bench.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            pause: Duration::from_millis(
                overrides
                    .pause_ms
                    .or(file.bench.pause_ms)
                    .unwrap_or(DEFAULT_PAUSE_MS),
            ),
            unit_price: overrides
                .unit_price
                .or(file.bench.unit_price)
                .unwrap_or(DEFAULT_UNIT_PRICE),
            provider_pricing: overrides
                .provider_pricing
                .or_else(|| file.bench.provider_pricing.clone()),
            multiplier_pricing: overrides
                .multiplier_pricing
                .or_else(|| file.bench.multiplier_pricing.clone()),
            progress: overrides.progress,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runs == 0 {
            return Err(ConfigError::Invalid("runs must be at least 1".to_string()));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "unit price must be a non-negative number, got {}",
                self.unit_price
            )));
        }
        if self.models.is_empty() {
            return Err(ConfigError::Invalid("no models to benchmark".to_string()));
        }
        // rows are written without quoting
        if let Some(bad) = self
            .models
            .iter()
            .find(|m| m.is_empty() || m.contains(',') || m.contains('\n'))
        {
            return Err(ConfigError::Invalid(format!(
                "model identifier '{bad}' must be non-empty and contain no commas or newlines"
            )));
        }
        Ok(())
    }

    /// total trials for this run
    pub fn trial_count(&self) -> u64 {
        self.models.len() as u64 * u64::from(self.runs)
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            gh_bin: DEFAULT_GH_BIN.to_string(),
            models: DEFAULT_BENCH_MODELS.iter().map(|m| m.to_string()).collect(),
            runs: DEFAULT_RUNS,
            timeout: timeout_from_secs(DEFAULT_TIMEOUT_SECS),
            pause: Duration::from_millis(DEFAULT_PAUSE_MS),
            unit_price: DEFAULT_UNIT_PRICE,
            provider_pricing: None,
            multiplier_pricing: None,
            progress: false,
        }
    }
}
