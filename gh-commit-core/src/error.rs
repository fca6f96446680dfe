// typed errors for the places where callers branch on the failure kind

use std::path::PathBuf;

use thiserror::Error;

/// problems reading or validating configuration at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// problems loading a rate table
#[derive(Error, Debug)]
pub enum PricingError {
    #[error("failed to read rate table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode rate table {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate table {path}: model '{model}' has invalid {field} value '{value}'")]
    InvalidValue {
        path: PathBuf,
        model: String,
        field: &'static str,
        value: String,
    },
}

/// failures of the external model command that never produced any output
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error talking to the model command: {0}")]
    Io(#[from] std::io::Error),
}
