//! # External Tool Execution
//!
//! The orchestrators treat `pg_dump`, `pg_restore`, and `psql` as
//! opaque subprocesses described by an argv vector plus environment.
//! This module owns spawning, output capture, and the wall-clock
//! timeout. A trait seam lets tests script tool behavior without any
//! real PostgreSQL installation.

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

/// Bytes of stdout/stderr retained per stream unless configured
pub const DEFAULT_OUTPUT_CAP: usize = 256 * 1024;

/// Errors from running an external tool
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout_secs}s and was killed")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("i/o error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// One tool invocation: program, argv, and extra environment.
///
/// Environment entries carry credentials (`PGPASSWORD`), so the
/// `Debug` impl masks every value.
#[derive(Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs(mut self, entries: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(entries);
        self
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked: Vec<String> = self.env.iter().map(|(k, _)| format!("{}=***", k)).collect();
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &masked)
            .finish()
    }
}

/// Captured output of a tool that exited successfully
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Seam for launching external tools.
///
/// `run` resolves to `Ok` only on a zero exit within the timeout.
/// Non-zero exit, spawn failure, and timeout are all `ProcessError`.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: CommandSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError>;
}

/// Real runner backed by `tokio::process`
pub struct SystemRunner {
    output_cap: usize,
}

impl SystemRunner {
    pub fn new(output_cap: usize) -> Self {
        Self { output_cap }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_CAP)
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, spec: CommandSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        debug!(command = ?spec, timeout_secs = timeout.as_secs(), "launching external tool");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the child on timeout must not leave an orphaned
            // tool still writing to the artifact.
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = self.output_cap;

        // Drain both pipes while waiting, so a chatty tool can never
        // block on a full pipe buffer.
        let wait_all = async {
            tokio::join!(
                read_capped(stdout, cap),
                read_capped(stderr, cap),
                child.wait()
            )
        };

        let (out_buf, err_buf, status) = match tokio::time::timeout(timeout, wait_all).await {
            Err(_) => {
                return Err(ProcessError::Timeout {
                    program: spec.program.clone(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            Ok(results) => results,
        };

        let wrap_io = |source| ProcessError::Io {
            program: spec.program.clone(),
            source,
        };
        let stdout = String::from_utf8_lossy(&out_buf.map_err(wrap_io)?).to_string();
        let stderr = String::from_utf8_lossy(&err_buf.map_err(wrap_io)?).to_string();
        let status = status.map_err(wrap_io)?;

        if status.success() {
            Ok(ProcessOutput { stdout, stderr })
        } else {
            Err(ProcessError::Failed {
                program: spec.program.clone(),
                code: status.code(),
                stderr,
            })
        }
    }
}

/// Read a pipe to EOF, retaining at most `cap` bytes.
///
/// Bytes past the cap are consumed and discarded, never buffered, so
/// memory stays bounded and the child is never blocked on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    stream: Option<R>,
    cap: usize,
) -> std::io::Result<Vec<u8>> {
    let Some(mut stream) = stream else {
        return Ok(Vec::new());
    };

    let mut retained = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if retained.len() < cap {
            let room = cap - retained.len();
            retained.extend_from_slice(&buf[..n.min(room)]);
        }
    }
    Ok(retained)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_env_values() {
        let spec = CommandSpec::new("pg_dump")
            .arg("-h")
            .arg("localhost")
            .env("PGPASSWORD", "hunter2");

        let rendered = format!("{:?}", spec);
        assert!(rendered.contains("PGPASSWORD=***"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_read_capped_discards_overflow() {
        let data = vec![b'x'; 10_000];
        let retained = read_capped(Some(&data[..]), 1024).await.unwrap();
        assert_eq!(retained.len(), 1024);
    }

    #[tokio::test]
    async fn test_system_runner_zero_exit() {
        let spec = CommandSpec::new("true");
        let result = SystemRunner::default().run(spec, Duration::from_secs(5)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let spec = CommandSpec::new("echo").arg("42");
        let output = SystemRunner::default()
            .run(spec, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "42");
    }

    #[tokio::test]
    async fn test_system_runner_nonzero_exit() {
        let spec = CommandSpec::new("false");
        let err = SystemRunner::default()
            .run(spec, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_system_runner_spawn_failure() {
        let spec = CommandSpec::new("definitely-not-a-real-binary-7d1c");
        let err = SystemRunner::default()
            .run(spec, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_system_runner_timeout_kills() {
        let spec = CommandSpec::new("sleep").arg("30");
        let start = std::time::Instant::now();
        let err = SystemRunner::default()
            .run(spec, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_scripted_runner_records_calls() {
        use testing::ScriptedRunner;

        let runner = ScriptedRunner::new();
        runner.push_failure("boom");

        let spec = CommandSpec::new("pg_dump").arg("-h").arg("db");
        let err = runner.run(spec, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProcessError::Failed { .. }));
        assert_eq!(runner.programs(), vec!["pg_dump".to_string()]);
    }
}
