//! Parsing the JSON printed by `deploy --format json`
//!
//! The tool's output is not trusted: each field is checked on its own and
//! the first problem aborts with an error naming the field and echoing the
//! raw text.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use edgecheck_common::DeployOutput;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployOutputError {
    #[error("could not parse output as JSON: '{reason}': '{raw}'")]
    InvalidJson { reason: String, raw: String },

    #[error("expected JSON object, got '{raw}'")]
    NotAnObject { raw: String },

    #[error("could not parse JSON config: '{reason}': '{raw}'")]
    InvalidEmbeddedConfig { reason: String, raw: String },

    #[error("could not extract meta.name from JSON config: '{raw}'")]
    MissingPackageName { raw: String },

    #[error("expected package name 'owner/name', got '{name}'")]
    InvalidPackageName { name: String },

    #[error("could not extract version id from '{raw}'")]
    MissingVersionId { raw: String },

    #[error("could not extract app.id from '{raw}'")]
    MissingAppId { raw: String },

    #[error("could not extract URL from '{raw}'")]
    InvalidUrl { raw: String },
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http")
        && reqwest::Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false)
}

/// Parse the deploy tool's stdout into a [`DeployOutput`].
pub fn parse_deploy_output(raw: &str, source_dir: &Path) -> Result<DeployOutput, DeployOutputError> {
    let info: Value = serde_json::from_str(raw).map_err(|e| DeployOutputError::InvalidJson {
        reason: e.to_string(),
        raw: raw.to_string(),
    })?;
    if !info.is_object() {
        return Err(DeployOutputError::NotAnObject {
            raw: raw.to_string(),
        });
    }

    let embedded = info.get("json_config");
    let config: Value = embedded
        .and_then(Value::as_str)
        .ok_or_else(|| "json_config is not a string".to_string())
        .and_then(|s| serde_json::from_str(s).map_err(|e| e.to_string()))
        .map_err(|reason| DeployOutputError::InvalidEmbeddedConfig {
            reason,
            raw: embedded.map(Value::to_string).unwrap_or_default(),
        })?;

    let full_name = config
        .pointer("/meta/name")
        .and_then(Value::as_str)
        .ok_or_else(|| DeployOutputError::MissingPackageName {
            raw: config.to_string(),
        })?;
    let (owner, name) = match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            (owner, name)
        }
        _ => {
            return Err(DeployOutputError::InvalidPackageName {
                name: full_name.to_string(),
            })
        }
    };

    let app_version_id = non_empty_str(info.get("id")).ok_or_else(|| {
        DeployOutputError::MissingVersionId {
            raw: raw.to_string(),
        }
    })?;

    let app_id = non_empty_str(info.pointer("/app/id")).ok_or_else(|| {
        DeployOutputError::MissingAppId {
            raw: raw.to_string(),
        }
    })?;

    let url = non_empty_str(info.get("url"))
        .filter(|u| is_http_url(u))
        .ok_or_else(|| DeployOutputError::InvalidUrl {
            raw: raw.to_string(),
        })?;

    Ok(DeployOutput {
        owner: owner.to_string(),
        name: name.to_string(),
        app_id: app_id.to_string(),
        app_version_id: app_version_id.to_string(),
        url: url.to_string(),
        source_dir: source_dir.to_path_buf(),
    })
}
