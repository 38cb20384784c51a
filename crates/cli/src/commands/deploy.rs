//! Deploy Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use edgecheck_common::AppInfo;
use edgecheck_e2e::{DeployOptions, TestEnv};

use crate::output::{print_item, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct DeployArgs {
    /// App directory containing app.yaml
    pub dir: PathBuf,

    /// Do not wait for the deployment to become ready
    #[arg(long)]
    pub no_wait: bool,

    /// Extra argument passed to the deploy tool (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

/// Deployed app display wrapper
#[derive(Serialize)]
pub struct DeployedAppDisplay {
    pub id: String,
    pub package: String,
    pub version_id: String,
    pub url: String,
    pub dir: String,
}

impl From<&AppInfo> for DeployedAppDisplay {
    fn from(app: &AppInfo) -> Self {
        Self {
            id: app.id.clone(),
            package: format!("{}/{}", app.version.owner, app.version.name),
            version_id: app.version.app_version_id.clone(),
            url: app.url.clone(),
            dir: app.dir.display().to_string(),
        }
    }
}

impl TableDisplay for DeployedAppDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Package", "Version", "URL", "Directory"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.package.clone(),
            self.version_id.clone(),
            self.url.clone(),
            self.dir.clone(),
        ]
    }
}

pub async fn execute(args: DeployArgs, format: OutputFormat) -> Result<()> {
    let dir = args
        .dir
        .canonicalize()
        .with_context(|| format!("App directory not found: {}", args.dir.display()))?;

    let env = TestEnv::from_env()?;
    let options = DeployOptions {
        extra_cli_args: args.extra,
        no_wait: args.no_wait,
    };

    let app = env.deploy_app_dir(&dir, options).await?;

    if matches!(format, OutputFormat::Table) {
        print_success(&format!("Deployed {}", app.url));
    }
    print_item(&DeployedAppDisplay::from(&app), format)
}
