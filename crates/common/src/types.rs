//! Records describing deployed applications

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Validated output of a `deploy --format json` run.
///
/// Only constructed by the deploy output parser; every string is non-empty
/// and `url` is an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOutput {
    /// Owner part of the package name
    pub owner: String,

    /// App name (package name without the owner)
    pub name: String,

    pub app_id: String,
    pub app_version_id: String,
    pub url: String,

    /// Directory the app was deployed from
    pub source_dir: PathBuf,
}

/// App record as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDeployApp {
    pub id: String,
    pub url: String,
}

/// A deployed app, reconciled against the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfo {
    /// What the deploy tool reported
    pub version: DeployOutput,

    /// What the backend reports
    pub app: ApiDeployApp,

    /// Backend app id
    pub id: String,

    /// Backend app URL
    pub url: String,

    /// Directory holding the app
    pub dir: PathBuf,
}

impl AppInfo {
    /// Combine a deploy result with its backend record
    pub fn new(version: DeployOutput, app: ApiDeployApp) -> Self {
        Self {
            id: app.id.clone(),
            url: app.url.clone(),
            dir: version.source_dir.clone(),
            version,
            app,
        }
    }
}

/// Entry of a namespace app listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub id: String,

    #[serde(default)]
    pub deleted: bool,

    pub created_at: String,
}

/// One page of a namespace app listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppPage {
    pub apps: Vec<AppSummary>,

    /// Cursor to pass as `after` for the next page
    pub last_cursor: Option<String>,
}
