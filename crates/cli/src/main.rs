//! edgecheck CLI - Main Entry Point
//!
//! Deploys apps, inspects them through the registry backend and requests
//! them through a (optionally pinned) Edge server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{app, deploy, fetch};

/// edgecheck - Wasmer Edge deployment checks
#[derive(Parser)]
#[command(name = "edgecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy an app directory and verify it against the backend
    Deploy(deploy::DeployArgs),

    /// Inspect and delete apps
    #[command(subcommand)]
    App(app::AppCommands),

    /// Request a URL through the Edge transport
    Fetch(fetch::FetchArgs),

    /// Print the fixture repository path, cloning it if needed
    Fixtures {
        /// Existing checkout to use instead of cloning
        #[arg(long, env = "WASMOPTICON_DIR")]
        dir: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Deploy(args) => deploy::execute(args, cli.format).await?,
        Commands::App(cmd) => app::execute(cmd, cli.format).await?,
        Commands::Fetch(args) => fetch::execute(args, cli.format).await?,
        Commands::Fixtures { dir } => {
            let path = edgecheck_e2e::fixtures::wasmopticon_dir(dir.as_deref()).await?;
            println!("{}", path.display());
        }
        Commands::Version => {
            println!("edgecheck v{}", env!("CARGO_PKG_VERSION"));
            println!("core v{}", edgecheck_common::VERSION);
        }
    }

    Ok(())
}
