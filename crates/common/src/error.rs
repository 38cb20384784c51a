//! Error types for edgecheck configuration

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the configuration error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling the test environment configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Could not determine the app domain for registry {registry}: set the {env_var} env var"
    )]
    MissingAppDomain { registry: String, env_var: &'static str },

    #[error(
        "Could not find a token for registry {registry} in {path}: specify the token with the {env_var} env var"
    )]
    MissingToken {
        registry: String,
        path: PathBuf,
        env_var: &'static str,
    },

    #[error(
        "Failed to load config at {path} (specify the WASMER_TOKEN env var to run without a config): {reason}"
    )]
    ConfigLoad { path: PathBuf, reason: String },
}
