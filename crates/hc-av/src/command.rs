//! Running external tools with a deadline.
//!
//! ffmpeg writes its banner and per-stream chatter to stderr, so a failure
//! report keeps only the last few stderr lines; the useful diagnostic is
//! almost always at the end.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Default deadline when none is set.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Stderr lines kept in a failure message.
const STDERR_TAIL_LINES: usize = 20;

/// What a finished process wrote.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// One invocation of an external tool.
///
/// ```no_run
/// use hc_av::ToolCommand;
///
/// # async fn example() -> hc_core::Result<()> {
/// let out = ToolCommand::new("ffmpeg".into())
///     .arg("-version")
///     .execute()
///     .await?;
/// println!("{}", out.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            current_dir: None,
        }
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Kill the process if it has not exited after `d`.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Run to completion and capture both output streams.
    ///
    /// # Errors
    ///
    /// [`hc_core::Error::Tool`] when the process cannot be spawned, exits
    /// non-zero (message carries the stderr tail), or outlives the timeout
    /// (the child is killed).
    pub async fn execute(&self) -> hc_core::Result<ToolOutput> {
        let tool = tool_name(&self.program);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(tool = %tool, args = ?self.args, "Spawning tool");

        let child = cmd
            .spawn()
            .map_err(|e| hc_core::Error::tool(&tool, format!("failed to spawn: {e}")))?;

        // On timeout the wait future is dropped, and kill_on_drop reaps the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| hc_core::Error::tool(&tool, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| hc_core::Error::tool(&tool, format!("failed waiting for exit: {e}")))?;

        let out = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !out.status.success() {
            return Err(hc_core::Error::tool(
                tool,
                format!(
                    "exited with {}: {}",
                    out.status,
                    stderr_tail(&out.stderr, STDERR_TAIL_LINES)
                ),
            ));
        }

        Ok(out)
    }
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// The last `max_lines` non-blank lines of `stderr`, newline-joined.
fn stderr_tail(stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
