//! Tool process spawning and merged-output streaming.
//!
//! A [`ProcessDescriptor`] is the immutable launch spec handed to the
//! supervisor; [`ToolProcess`] wraps the running child and exposes its
//! merged stdout/stderr as a channel of raw byte chunks.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, Receiver, Sender};

/// Buffer size for the merged output channel.
const OUTPUT_CHANNEL_BUFFER: usize = 64;

/// Read buffer size for the pipe forwarding tasks.
const READ_BUFFER_SIZE: usize = 4096;

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The executable was not found.
    #[error("executable not found: {0}")]
    NotFound(PathBuf),
    /// Permission denied when spawning.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Classify common spawn failures by I/O error kind.
    fn from_io(err: std::io::Error, executable: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(executable.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(executable.to_path_buf())
            }
            _ => Self::Io(err),
        }
    }
}

/// Immutable launch spec for one external tool invocation.
#[derive(Debug, Clone)]
pub struct ProcessDescriptor {
    executable: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    merge_stderr: bool,
}

impl ProcessDescriptor {
    /// Create a descriptor for the given executable. Stderr is merged into
    /// the parsed stream by default.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            merge_stderr: true,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the tool process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Leave stderr out of the parsed stream; it passes through to the
    /// parent's stderr instead.
    #[must_use]
    pub fn separate_stderr(mut self) -> Self {
        self.merge_stderr = false;
        self
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn get_working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    #[must_use]
    pub fn merges_stderr(&self) -> bool {
        self.merge_stderr
    }

    /// The full command line, for logging.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.executable.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A running external tool process.
#[derive(Debug)]
pub struct ToolProcess {
    child: Child,
}

impl ToolProcess {
    /// Spawn the process described by `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] if the process fails to spawn; no child handle
    /// is retained in that case.
    pub fn spawn(descriptor: &ProcessDescriptor) -> Result<Self, SpawnError> {
        let mut cmd = Command::new(descriptor.executable());
        cmd.args(descriptor.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if descriptor.merges_stderr() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);

        if let Some(dir) = descriptor.get_working_dir() {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| SpawnError::from_io(e, descriptor.executable()))?;

        Ok(Self { child })
    }

    /// Take the merged output channel.
    ///
    /// Stdout chunks (and stderr chunks, when merged) arrive in read order;
    /// the channel closes once every captured pipe reaches end of stream.
    /// Can only be called once; subsequent calls return `None`.
    pub fn take_output(&mut self) -> Option<Receiver<std::io::Result<Vec<u8>>>> {
        let stdout = self.child.stdout.take()?;
        let stderr = self.child.stderr.take();

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_BUFFER);
        match stderr {
            Some(stderr) => {
                tokio::spawn(forward(stdout, tx.clone()));
                tokio::spawn(forward(stderr, tx));
            }
            None => {
                tokio::spawn(forward(stdout, tx));
            }
        }
        Some(rx)
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process has exited without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Kill the process unconditionally. No grace period, no signal
    /// escalation. A kill racing a natural exit is absorbed.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        if matches!(self.try_wait(), Ok(Some(_))) {
            return Ok(());
        }
        self.child.kill().await
    }
}

/// Forward raw chunks from a pipe into the merged output channel until end
/// of stream or channel closure.
async fn forward<R>(mut reader: R, tx: Sender<std::io::Result<Vec<u8>>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Ok(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}
