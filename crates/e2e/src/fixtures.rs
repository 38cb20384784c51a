//! Shared fixture repository (`wasmopticon`)
//!
//! Test processes running in parallel share one checkout. The clone step is
//! guarded by an advisory lock file created exclusively; readers of an
//! existing checkout do not take the lock after the clone.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

pub const WASMOPTICON_GIT_URL: &str = "https://github.com/wasix-org/wasmopticon.git";

const LOCK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Exclusive lock file, removed on drop
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Create `path` exclusively, waiting while another process holds it
    pub async fn acquire(path: &Path) -> E2eResult<Self> {
        let mut announced = false;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if !announced {
                        warn!("Waiting for lock {}", path.display());
                        announced = true;
                    }
                    sleep(LOCK_RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}

/// Path of the fixture repository, cloning it below the current directory
/// if needed
pub async fn wasmopticon_dir(override_dir: Option<&Path>) -> E2eResult<PathBuf> {
    let cwd = std::env::current_dir()?;
    resolve_fixture_repo(
        override_dir,
        &cwd,
        "wasmopticon",
        WASMOPTICON_GIT_URL,
    )
    .await
}

/// Locate or clone a fixture repository.
///
/// An explicit `override_dir` must exist. Otherwise `<base>/<name>` is used,
/// cloned from `git_url` under `<base>/<name>-clone.lock` if missing.
pub async fn resolve_fixture_repo(
    override_dir: Option<&Path>,
    base: &Path,
    name: &str,
    git_url: &str,
) -> E2eResult<PathBuf> {
    if let Some(dir) = override_dir {
        if !dir.is_dir() {
            return Err(E2eError::Fixture(format!(
                "fixture directory is set, but does not exist: {}",
                dir.display()
            )));
        }
        return Ok(dir.to_path_buf());
    }

    let local_dir = base.join(name);
    let lock_path = base.join(format!("{}-clone.lock", name));
    let _lock = LockFile::acquire(&lock_path).await?;

    if local_dir.exists() {
        return Ok(local_dir);
    }

    info!("Cloning {} to {}...", git_url, local_dir.display());
    let output = Command::new("git")
        .arg("clone")
        .arg(git_url)
        .arg(&local_dir)
        .output()
        .await
        .map_err(|source| E2eError::CommandSpawn {
            program: "git".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(E2eError::Fixture(format!(
            "failed to clone {}: {}\n{}",
            git_url,
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(local_dir)
}
