//! Error types for the deployment harness

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy_output::DeployOutputError;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Config(#[from] edgecheck_common::Error),

    #[error("Failed to spawn {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {args:?} exited with code {code}\n\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}")]
    CommandFailed {
        args: Vec<String>,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Invalid deploy output: {0}")]
    DeployOutput(#[from] DeployOutputError),

    #[error("Failed to send GraphQL query: {status}\nBODY:\n{body}")]
    GraphQlStatus { status: u16, body: String },

    #[error("Failed to parse GraphQL JSON response: {source}\nBODY:\n{body}")]
    GraphQlParse {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("GraphQL query failed: no data returned")]
    GraphQlNoData,

    #[error("Unexpected GraphQL data: {0}")]
    GraphQlDecode(String),

    #[error("App not found: {0}")]
    AppNotFound(String),

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Failed to delete app: {0}")]
    DeleteFailed(String),

    #[error("Failed to fetch URL '{url}': {status}\n\nBODY:\n{}", .body.as_deref().unwrap_or("<unavailable>"))]
    FetchFailed {
        url: String,
        status: u16,
        body: Option<String>,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid directory entry name '{name}': {reason}")]
    InvalidEntryName { name: String, reason: &'static str },

    #[error("Invalid app config: {0}")]
    InvalidAppConfig(String),

    #[error("Invalid package manifest at {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type E2eResult<T> = Result<T, E2eError>;
