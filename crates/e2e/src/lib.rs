//! edgecheck E2E deployment harness
//!
//! Deploys throwaway apps with the `wasmer` CLI, reconciles them against the
//! registry backend and verifies the live app over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TestEnv (orchestrator)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  deploy_app(AppDefinition) -> AppInfo                       │
//! │    ├── fs_tree::materialize()     app files -> temp dir     │
//! │    ├── CommandRunner::run()       wasmer deploy --format json│
//! │    ├── parse_deploy_output()      stdout -> DeployOutput    │
//! │    └── BackendClient              DeployOutput -> AppInfo   │
//! │  fetch_app(AppInfo, path) -> HttpResponse                   │
//! │    └── HttpClient                 pinned Edge server,       │
//! │                                   manual redirects          │
//! │  delete_app(AppInfo)              wasmer app delete         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod backend;
pub mod command;
pub mod deploy_output;
pub mod env;
pub mod error;
pub mod fixtures;
pub mod fs_tree;
pub mod transport;

pub use app::AppDefinition;
pub use backend::{BackendClient, GraphQlResponse};
pub use command::{CommandOptions, CommandOutput, CommandRunner};
pub use deploy_output::{parse_deploy_output, DeployOutputError};
pub use env::{DeployOptions, TestEnv};
pub use error::{E2eError, E2eResult};
pub use fs_tree::{materialize, DirEntry, DirectoryTree};
pub use transport::{FetchOptions, HttpClient, HttpResponse, RedirectMode, TransportConfig};

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG` (default `info`); calling it more than once is harmless.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
