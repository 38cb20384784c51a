//! Test environment configuration
//!
//! Every setting comes from the process environment. The backend token may
//! also be taken from the deploy tool's own config file
//! (`~/.wasmer/wasmer.toml`), looked up by registry URL.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

pub const ENV_VAR_REGISTRY: &str = "WASMER_REGISTRY";
pub const ENV_VAR_NAMESPACE: &str = "WASMER_NAMESPACE";
pub const ENV_VAR_TOKEN: &str = "WASMER_TOKEN";
pub const ENV_VAR_APP_DOMAIN: &str = "WASMER_APP_DOMAIN";
pub const ENV_VAR_EDGE_SERVER: &str = "EDGE_SERVER";
pub const ENV_VAR_WASMER_PATH: &str = "WASMER_PATH";
pub const ENV_VAR_WASMOPTICON_DIR: &str = "WASMOPTICON_DIR";

pub const REGISTRY_PROD: &str = "https://registry.wasmer.io/graphql";
pub const REGISTRY_DEV: &str = "https://registry.wasmer.wtf/graphql";

pub const DEFAULT_NAMESPACE: &str = "falconmfm";
pub const DEFAULT_WASMER_BINARY: &str = "wasmer";

/// App domain served for apps deployed through a well-known registry
pub fn known_app_domain(registry: &str) -> Option<&'static str> {
    match registry {
        REGISTRY_PROD => Some("wasmer.app"),
        REGISTRY_DEV => Some("wasmer.dev"),
        _ => None,
    }
}

/// Location of the deploy tool's config file below a home directory
pub fn wasmer_config_path(home: &Path) -> PathBuf {
    home.join(".wasmer").join("wasmer.toml")
}

/// Process-wide test configuration.
///
/// Built once per test run and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// GraphQL endpoint of the registry backend
    pub registry: String,

    /// Namespace apps are deployed into
    pub namespace: String,

    /// Domain suffix apps are served under (`<name>.<app_domain>`)
    pub app_domain: String,

    /// Backend token, passed to the deploy tool and the GraphQL client
    pub token: String,

    /// IP or hostname of a specific Edge server to test
    pub edge_server: Option<String>,

    /// Name or path of the deploy tool binary
    pub wasmer_binary: PathBuf,

    /// Pre-existing checkout of the shared fixture repository
    pub wasmopticon_dir: Option<PathBuf>,
}

impl EnvConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::from_lookup(|key| std::env::var(key).ok(), home)
    }

    /// Load the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F, home: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let registry = var(ENV_VAR_REGISTRY).unwrap_or_else(|| REGISTRY_PROD.to_string());
        let namespace = var(ENV_VAR_NAMESPACE).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let app_domain = match (known_app_domain(&registry), var(ENV_VAR_APP_DOMAIN)) {
            (Some(domain), _) => domain.to_string(),
            (None, Some(domain)) => domain,
            (None, None) => {
                return Err(Error::MissingAppDomain {
                    registry,
                    env_var: ENV_VAR_APP_DOMAIN,
                })
            }
        };

        let token = match var(ENV_VAR_TOKEN) {
            Some(token) => token,
            None => {
                let path = match home {
                    Some(home) => wasmer_config_path(&home),
                    None => {
                        return Err(Error::ConfigLoad {
                            path: PathBuf::from("~/.wasmer/wasmer.toml"),
                            reason: "home directory is not set".to_string(),
                        })
                    }
                };
                let config = WasmerConfig::load(&path)?;
                match config.token_for(&registry) {
                    Some(token) => token.to_string(),
                    None => {
                        return Err(Error::MissingToken {
                            registry,
                            path,
                            env_var: ENV_VAR_TOKEN,
                        })
                    }
                }
            }
        };

        let config = Self {
            registry,
            namespace,
            app_domain,
            token,
            edge_server: var(ENV_VAR_EDGE_SERVER),
            wasmer_binary: var(ENV_VAR_WASMER_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WASMER_BINARY)),
            wasmopticon_dir: var(ENV_VAR_WASMOPTICON_DIR).map(PathBuf::from),
        };

        debug!(
            registry = %config.registry,
            namespace = %config.namespace,
            app_domain = %config.app_domain,
            edge_server = ?config.edge_server,
            "Loaded test environment configuration"
        );

        Ok(config)
    }
}

/// The subset of the deploy tool's global config file we read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WasmerConfig {
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub active_registry: Option<String>,

    #[serde(default)]
    pub tokens: Vec<RegistryToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryToken {
    pub registry: String,
    pub token: String,
}

impl WasmerConfig {
    /// Load the config file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|reason| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Token stored for `registry`, if any
    pub fn token_for(&self, registry: &str) -> Option<&str> {
        self.registry
            .as_ref()?
            .tokens
            .iter()
            .find(|t| t.registry == registry)
            .map(|t| t.token.as_str())
    }
}
