//! External extraction/search tool invoker
//!
//! Runs the out-of-process song tool for one-off lookups outside the batch
//! scan. Each call selects exactly one sub-operation:
//!
//! - `<tool> export <id>`: fetch a single song, stdout is a JSON object
//! - `<tool> search <query>`: free-text search, stdout is a JSON list
//!
//! Exit code 0 means success. Every attempt is bounded by a wall-clock
//! timeout; on expiry the process is killed and the attempt fails with
//! `ToolError::Timeout`. Attempts are retried with a fixed delay and never
//! overlap.
//!
//! Output that cannot be parsed after a successful exit is returned as
//! `ToolOutput::Unparsed` with the raw payload so callers can keep it.

use crate::models::song::deserialize_external_id;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// Default executable name looked up on PATH
pub const DEFAULT_TOOL_NAME: &str = "songbook-tool";

/// Delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Tool invocation errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool executable could not be resolved
    #[error("Tool binary not found: {0}")]
    BinaryNotFound(String),

    /// Process could not be started
    #[error("Failed to spawn tool: {0}")]
    Spawn(String),

    /// Attempt exceeded its wall-clock budget and was killed
    #[error("Tool timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Process exited nonzero (or was killed by a signal)
    #[error("Tool exited with code {code:?}: {stderr}")]
    Process { code: Option<i32>, stderr: String },

    /// I/O error while collecting output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sub-operation selected by the argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOperation {
    Export { id: String },
    Search { query: String },
}

impl ToolOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            ToolOperation::Export { .. } => OperationKind::Export,
            ToolOperation::Search { .. } => OperationKind::Search,
        }
    }

    /// Fixed, minimal argument vector
    pub fn args(&self) -> [&str; 2] {
        match self {
            ToolOperation::Export { id } => ["export", id.as_str()],
            ToolOperation::Search { query } => ["search", query.as_str()],
        }
    }
}

/// Operation tag carried by degraded results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Export,
    Search,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Export => "export",
            OperationKind::Search => "search",
        }
    }
}

/// Song exported by `export <id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedSong {
    #[serde(deserialize_with = "deserialize_external_id")]
    pub id: String,
    #[serde(alias = "song_name")]
    pub title: String,
    #[serde(alias = "artist_name")]
    pub artist: String,
    #[serde(default, alias = "tab_url")]
    pub url: Option<String>,
    #[serde(default)]
    pub tuning: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// One hit returned by `search <query>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(deserialize_with = "deserialize_external_id")]
    pub id: String,
    #[serde(alias = "song_name")]
    pub title: String,
    #[serde(alias = "artist_name")]
    pub artist: String,
    #[serde(default, alias = "tab_url")]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Search output is either a bare list or `{ "results": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    List(Vec<SearchHit>),
    Wrapped { results: Vec<SearchHit> },
}

/// Result of a successful invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ToolOutput {
    Exported(ExportedSong),
    SearchResults(Vec<SearchHit>),
    /// Exit code 0 but stdout did not parse; raw payload kept for reprocessing
    Unparsed {
        operation: OperationKind,
        raw: String,
        reason: String,
    },
}

impl ToolOutput {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ToolOutput::Unparsed { .. })
    }
}

/// Captured output of one finished process
#[derive(Debug)]
struct RawOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// External tool invoker
pub struct ToolInvoker {
    binary_path: PathBuf,
    retry_delay: Duration,
}

impl ToolInvoker {
    /// Invoker for an already-resolved executable
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Resolve the executable: explicit path first, then PATH lookup of `name`
    pub fn resolve(configured: Option<&Path>, name: &str) -> Result<Self, ToolError> {
        if let Some(path) = configured {
            if path.is_file() {
                return Ok(Self::new(path));
            }
            // A bare name in config is looked up on PATH like the default
            return which::which(path)
                .map(Self::new)
                .map_err(|_| ToolError::BinaryNotFound(path.display().to_string()));
        }

        which::which(name)
            .map(Self::new)
            .map_err(|_| ToolError::BinaryNotFound(name.to_string()))
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Fetch one song by id
    pub async fn fetch(
        &self,
        id: &str,
        timeout: Duration,
        retries: u32,
    ) -> Result<ToolOutput, ToolError> {
        self.invoke(&ToolOperation::Export { id: id.to_string() }, timeout, retries)
            .await
    }

    /// Free-text search
    pub async fn search(
        &self,
        query: &str,
        timeout: Duration,
        retries: u32,
    ) -> Result<ToolOutput, ToolError> {
        self.invoke(
            &ToolOperation::Search {
                query: query.to_string(),
            },
            timeout,
            retries,
        )
        .await
    }

    /// Run `operation` up to `retries` times (at least once)
    ///
    /// Returns the first successful result; when every attempt fails the last
    /// error is returned.
    pub async fn invoke(
        &self,
        operation: &ToolOperation,
        timeout: Duration,
        retries: u32,
    ) -> Result<ToolOutput, ToolError> {
        let max_attempts = retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();

            tracing::debug!(
                operation = operation.kind().as_str(),
                attempt,
                max_attempts,
                timeout_ms = timeout.as_millis() as u64,
                "Invoking external tool"
            );

            let error = match self.run_once(operation, timeout).await {
                Ok(raw) if raw.status.success() => {
                    let output = parse_output(operation.kind(), &raw.stdout);
                    if let ToolOutput::Unparsed { reason, .. } = &output {
                        tracing::warn!(
                            operation = operation.kind().as_str(),
                            reason = %reason,
                            "Tool output did not parse, returning raw payload"
                        );
                    } else {
                        tracing::info!(
                            operation = operation.kind().as_str(),
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "External tool succeeded"
                        );
                    }
                    return Ok(output);
                }
                Ok(raw) => ToolError::Process {
                    code: raw.status.code(),
                    stderr: String::from_utf8_lossy(&raw.stderr).trim().to_string(),
                },
                Err(e) => e,
            };

            if attempt >= max_attempts {
                tracing::error!(
                    operation = operation.kind().as_str(),
                    attempts = attempt,
                    error = %error,
                    "External tool failed, attempts exhausted"
                );
                return Err(error);
            }

            tracing::warn!(
                operation = operation.kind().as_str(),
                attempt,
                error = %error,
                retry_delay_ms = self.retry_delay.as_millis() as u64,
                "External tool attempt failed, retrying"
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// One bounded attempt
    ///
    /// A timer task cancels the token when `timeout` elapses; cancellation
    /// kills the process and resolves the attempt as `Timeout`. Output of a
    /// killed process is discarded.
    async fn run_once(
        &self,
        operation: &ToolOperation,
        timeout: Duration,
    ) -> Result<RawOutput, ToolError> {
        let mut child = Command::new(&self.binary_path)
            .args(operation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ToolError::BinaryNotFound(self.binary_path.display().to_string())
                }
                _ => ToolError::Spawn(e.to_string()),
            })?;

        let cancel = CancellationToken::new();
        let timer = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            }
        });

        let finished = tokio::select! {
            result = collect_output(&mut child) => Some(result),
            _ = cancel.cancelled() => None,
        };
        timer.abort();

        match finished {
            Some(result) => result,
            None => {
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "Failed to kill timed-out tool process");
                }
                // Reap the killed process; its output is not salvaged
                let _ = child.wait().await;

                tracing::warn!(
                    operation = operation.kind().as_str(),
                    timeout_ms = timeout.as_millis() as u64,
                    "External tool timed out and was killed"
                );
                Err(ToolError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// Wait for exit while draining both pipes
async fn collect_output(child: &mut Child) -> Result<RawOutput, ToolError> {
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let read_stdout = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };
    let read_stderr = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };

    let (status, stdout, stderr) = tokio::try_join!(child.wait(), read_stdout, read_stderr)?;

    Ok(RawOutput {
        status,
        stdout,
        stderr,
    })
}

/// Parser matching the sub-operation; failures degrade to `Unparsed`
fn parse_output(kind: OperationKind, stdout: &[u8]) -> ToolOutput {
    let text = String::from_utf8_lossy(stdout).to_string();

    let parsed = match kind {
        OperationKind::Export => {
            serde_json::from_str::<ExportedSong>(&text).map(ToolOutput::Exported)
        }
        OperationKind::Search => serde_json::from_str::<SearchPayload>(&text).map(|payload| {
            ToolOutput::SearchResults(match payload {
                SearchPayload::List(hits) => hits,
                SearchPayload::Wrapped { results } => results,
            })
        }),
    };

    parsed.unwrap_or_else(|e| ToolOutput::Unparsed {
        operation: kind,
        raw: text,
        reason: e.to_string(),
    })
}
