//! Test environment: deploys apps and verifies them
//!
//! ```text
//! AppDefinition ──materialize──▶ temp dir ──deploy──▶ stdout
//!      stdout ──parse──▶ DeployOutput ──backend──▶ AppInfo ──fetch──▶ HttpResponse
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use edgecheck_common::{AppInfo, DeployOutput, EnvConfig};

use crate::app::{AppDefinition, PACKAGE_MANIFEST_FILE};
use crate::backend::BackendClient;
use crate::command::{CommandOptions, CommandOutput, CommandRunner};
use crate::deploy_output::parse_deploy_output;
use crate::error::{E2eError, E2eResult};
use crate::fixtures;
use crate::fs_tree::build_temp_dir;
use crate::transport::{FetchOptions, HttpClient, HttpResponse, TransportConfig};

/// Options for a deployment
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Extra flags appended to the deploy command line
    pub extra_cli_args: Vec<String>,

    /// Do not wait for the platform to report the deployment as ready
    pub no_wait: bool,
}

impl DeployOptions {
    pub fn no_wait() -> Self {
        Self {
            no_wait: true,
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_cli_args.push(arg.into());
        self
    }
}

/// Orchestrates deployments against one registry and namespace
#[derive(Debug, Clone)]
pub struct TestEnv {
    config: EnvConfig,
    http: HttpClient,
    backend: BackendClient,
    runner: CommandRunner,
}

impl TestEnv {
    /// Build an environment from the process environment
    pub fn from_env() -> E2eResult<Self> {
        Self::new(EnvConfig::from_env()?)
    }

    pub fn new(config: EnvConfig) -> E2eResult<Self> {
        let http = HttpClient::new(TransportConfig {
            target_server: config.edge_server.clone(),
            accept_invalid_certs: config.edge_server.is_some(),
        })?;
        let backend = BackendClient::new(config.registry.clone(), Some(config.token.clone()));
        let runner = CommandRunner::new(
            config.wasmer_binary.clone(),
            config.registry.clone(),
            config.token.clone(),
        );

        info!(
            registry = %config.registry,
            namespace = %config.namespace,
            edge_server = ?config.edge_server,
            "Test environment ready"
        );

        Ok(Self {
            config,
            http,
            backend,
            runner,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Shared fixture repository checkout
    pub async fn wasmopticon_dir(&self) -> E2eResult<PathBuf> {
        fixtures::wasmopticon_dir(self.config.wasmopticon_dir.as_deref()).await
    }

    /// Run the deploy tool with registry credentials
    pub async fn run_wasmer_command(&self, options: CommandOptions) -> E2eResult<CommandOutput> {
        self.runner.run(options).await
    }

    /// Deploy an app definition from a fresh temp dir.
    ///
    /// Owner, name and domains are filled in when unset. The temp dir is
    /// left on disk.
    pub async fn deploy_app(
        &self,
        mut app: AppDefinition,
        options: DeployOptions,
    ) -> E2eResult<AppInfo> {
        app.fill_defaults(&self.config.namespace, &self.config.app_domain);

        let tree = app.to_tree()?;
        let dir = tokio::task::spawn_blocking(move || build_temp_dir(&tree)).await??;
        debug!("Wrote app definition to {}", dir.display());

        self.deploy_app_dir(&dir, options).await
    }

    /// Deploy the app in `dir`
    pub async fn deploy_app_dir(&self, dir: &Path, options: DeployOptions) -> E2eResult<AppInfo> {
        let args = self.deploy_args(&options);

        let output = self
            .run_wasmer_command(CommandOptions::new(args).cwd(dir))
            .await?;

        let version = parse_deploy_output(&output.stdout, dir)?;
        let info = self.resolve_app_info(version).await?;

        if self.config.edge_server.is_some() && !options.no_wait {
            // The tool's own wait does not go through the pinned server.
            self.fetch_app(&info, "/", FetchOptions::default()).await?;
        }

        info!(app_id = %info.id, url = %info.url, "App deployed");
        Ok(info)
    }

    fn deploy_args(&self, options: &DeployOptions) -> Vec<String> {
        let mut args: Vec<String> = ["deploy", "--non-interactive", "--format", "json"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(options.extra_cli_args.iter().cloned());

        if options.no_wait || self.config.edge_server.is_some() {
            args.push("--no-wait".to_string());
        }
        args
    }

    /// Cross-check a deploy result against the backend
    pub async fn resolve_app_info(&self, version: DeployOutput) -> E2eResult<AppInfo> {
        let app = self.backend.get_app_by_id(&version.app_id).await?;
        if app.id != version.app_id {
            warn!(
                "Backend app id {} differs from deploy output {}",
                app.id, version.app_id
            );
        }
        Ok(AppInfo::new(version, app))
    }

    /// Absolute URL for a path or URL relative to the app
    pub fn app_url(app: &AppInfo, url_or_path: &str) -> String {
        if url_or_path.starts_with("http") {
            return url_or_path.to_string();
        }
        let base = app.url.trim_end_matches('/');
        let path = url_or_path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Request a path of a deployed app.
    ///
    /// Non-2xx responses fail unless `options.allow_failure` is set; the
    /// error carries the body when it can be read.
    pub async fn fetch_app(
        &self,
        app: &AppInfo,
        url_or_path: &str,
        options: FetchOptions,
    ) -> E2eResult<HttpResponse> {
        let url = Self::app_url(app, url_or_path);
        let response = self.http.fetch(&url, &options).await?;

        if !options.allow_failure && !response.is_success() {
            let body = match response.text() {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!("Could not read body of failed response from {}: {}", url, e);
                    None
                }
            };
            return Err(E2eError::FetchFailed {
                url,
                status: response.status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Delete an app with the deploy tool
    pub async fn delete_app(&self, app: &AppInfo) -> E2eResult<()> {
        self.delete_app_by_id(&app.id).await
    }

    pub async fn delete_app_by_id(&self, app_id: &str) -> E2eResult<()> {
        info!("Deleting app {}", app_id);
        self.run_wasmer_command(CommandOptions::new(["app", "delete", app_id]))
            .await?;
        Ok(())
    }

    /// Publish the named package in `dir`, bumping its version.
    ///
    /// Returns the package name (`owner/name`).
    pub async fn ensure_package_published(&self, dir: &Path) -> E2eResult<String> {
        let manifest_path = dir.join(PACKAGE_MANIFEST_FILE);
        let raw = tokio::fs::read_to_string(&manifest_path).await?;
        let name = package_name(&raw).map_err(|reason| E2eError::InvalidManifest {
            path: manifest_path.clone(),
            reason,
        })?;

        debug!("Publishing package at '{}'...", dir.display());
        self.run_wasmer_command(CommandOptions::new([
            "publish".to_string(),
            "--bump".to_string(),
            dir.display().to_string(),
        ]))
        .await?;

        Ok(name)
    }
}

/// `package.name` of a manifest, validated as `owner/name`
fn package_name(manifest: &str) -> Result<String, String> {
    let table: toml::Table = toml::from_str(manifest).map_err(|e| e.to_string())?;
    let name = table
        .get("package")
        .and_then(|p| p.get("name"))
        .and_then(toml::Value::as_str)
        .ok_or_else(|| format!("missing package name: {}", manifest))?;

    match name.split('/').collect::<Vec<_>>().as_slice() {
        [owner, pkg] if !owner.is_empty() && !pkg.is_empty() => Ok(name.to_string()),
        _ => Err(format!("expected 'owner/name', got '{}'", name)),
    }
}
