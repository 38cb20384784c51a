//! Running the deploy tool as a subprocess

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Options for a single deploy tool invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub args: Vec<String>,

    /// Working directory (inherited when unset)
    pub cwd: Option<PathBuf>,

    /// Extra environment variables, on top of the inherited environment
    pub env: HashMap<String, String>,

    /// Data written to stdin, which is then closed
    pub stdin: Option<String>,

    /// Return non-zero exits instead of failing
    pub allow_failure: bool,
}

impl CommandOptions {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }
}

/// Result of a finished invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit code, -1 if the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs the deploy tool with registry credentials injected
#[derive(Debug, Clone)]
pub struct CommandRunner {
    binary: PathBuf,
    registry: String,
    token: String,
}

impl CommandRunner {
    pub fn new(binary: impl Into<PathBuf>, registry: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            registry: registry.into(),
            token: token.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Environment for an invocation.
    ///
    /// Registry and token are only injected when not passed as flags;
    /// explicit entries in `options.env` are kept.
    fn environment(&self, options: &CommandOptions) -> HashMap<String, String> {
        let mut env = options.env.clone();
        if !options.args.iter().any(|a| a == "--registry") {
            env.entry("WASMER_REGISTRY".to_string())
                .or_insert_with(|| self.registry.clone());
        }
        if !options.args.iter().any(|a| a == "--token") {
            env.entry("WASMER_TOKEN".to_string())
                .or_insert_with(|| self.token.clone());
        }
        env
    }

    /// Run the tool to completion.
    ///
    /// stdout and stderr are drained concurrently, echoed live and buffered.
    /// The output is returned only after the process exited and both
    /// streams hit EOF.
    pub async fn run(&self, options: CommandOptions) -> E2eResult<CommandOutput> {
        let env = self.environment(&options);

        let mut cmd = Command::new(&self.binary);
        cmd.args(&options.args)
            .envs(&env)
            .stdin(if options.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        debug!(
            binary = %self.binary.display(),
            args = ?options.args,
            cwd = ?options.cwd,
            "Running command"
        );

        let mut child = cmd.spawn().map_err(|source| E2eError::CommandSpawn {
            program: self.binary.display().to_string(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let stdout_task = tokio::spawn(collect_and_echo(stdout, tokio::io::stdout()));
        let stderr_task = tokio::spawn(collect_and_echo(stderr, tokio::io::stderr()));

        let stdin_task = match (options.stdin.clone(), child.stdin.take()) {
            (Some(input), Some(pipe)) => Some(tokio::spawn(feed_stdin(pipe, input))),
            _ => None,
        };

        info!("command output >>>");
        // Reap the child and join every task before looking at any result.
        let status = child.wait().await;
        let stdin_result = match stdin_task {
            Some(task) => task.await,
            None => Ok(Ok(())),
        };
        let stdout = stdout_task.await;
        let stderr = stderr_task.await;

        let status = status?;
        stdin_result??;
        let stdout = stdout??;
        let stderr = stderr??;

        let code = status.code().unwrap_or(-1);
        info!("<<< command finished with code {}", code);

        let output = CommandOutput {
            code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };

        if !output.success() && !options.allow_failure {
            return Err(E2eError::CommandFailed {
                args: options.args,
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        Ok(output)
    }
}

fn missing_pipe(name: &str) -> E2eError {
    E2eError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("child {} was not captured", name),
    ))
}

/// Write `input` to the child's stdin, then close it.
///
/// A child that exits without reading all of its input closes the pipe;
/// that is not an error.
async fn feed_stdin<W>(mut pipe: W, input: String) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = async {
        pipe.write_all(input.as_bytes()).await?;
        pipe.shutdown().await
    }
    .await;

    match result {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("Child closed stdin before reading all input");
            Ok(())
        }
        other => other,
    }
}

/// Read `reader` to EOF, echoing every chunk to `echo`
async fn collect_and_echo<R, W>(mut reader: R, mut echo: W) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut collected = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        // Echo failures (closed console) must not stop draining.
        let _ = echo.write_all(&chunk[..n]).await;
        collected.extend_from_slice(&chunk[..n]);
    }
    let _ = echo.flush().await;
    Ok(collected)
}
