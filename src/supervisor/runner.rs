//! Lifecycle controller for one external tool run.
//!
//! [`ToolSupervisor`] owns the whole run: it spawns the process, drives the
//! classifier-selected parser over the merged output stream with a single
//! reader, observes cooperative cancellation, kills or waits on the process,
//! and emits the timed completion summary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

use crate::config::MarkerConfig;
use crate::parser::{OutputParser, Segmenter, ToolKind};
use crate::process::{ProcessDescriptor, SpawnError, ToolProcess};
use crate::report::{ProgressEvent, ReportSink};

use super::{RunState, RunStateMachine};

/// Error type for supervised runs. Either variant leaves the run `Failed`.
#[derive(thiserror::Error, Debug)]
pub enum SuperviseError {
    /// The process could not be spawned.
    #[error("failed to start process: {0}")]
    Spawn(#[from] SpawnError),
    /// I/O failure while reading the output stream.
    #[error("failed to read process output: {0}")]
    Stream(#[from] std::io::Error),
    /// The process output stream was not available.
    #[error("process output stream not available")]
    NoOutput,
}

/// Non-error outcome of a supervised run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stream ended and the process exited; elapsed wall-clock time.
    Completed { elapsed: Duration },
    /// Cancellation was observed; the process was killed, not waited on.
    Cancelled,
}

/// Clonable handle that cancels a running supervisor from another task.
#[derive(Clone)]
pub struct CancelHandle {
    token: CancellationToken,
    sink: Arc<dyn ReportSink>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent, safe to call at any time.
    ///
    /// Sets the sink's cancellation flag and wakes the reader if it is
    /// blocked on process output; the reader then kills the process.
    pub fn cancel(&self) {
        self.sink.cancel();
        self.token.cancel();
    }
}

/// Supervises one external tool process from spawn to terminal state.
pub struct ToolSupervisor {
    descriptor: ProcessDescriptor,
    kind: ToolKind,
    tool: String,
    file_label: String,
    markers: MarkerConfig,
    sink: Arc<dyn ReportSink>,
    state: RunStateMachine,
    cancel: CancellationToken,
}

impl ToolSupervisor {
    /// Create a supervisor for one tool invocation.
    ///
    /// `tool` both selects the parsing strategy (case-insensitive) and names
    /// the tool in the completion summary; `file_label` names the processed
    /// input there.
    #[must_use]
    pub fn new(
        descriptor: ProcessDescriptor,
        tool: impl Into<String>,
        file_label: impl Into<String>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let tool = tool.into();
        let kind = ToolKind::from_tool_name(&tool);
        Self {
            descriptor,
            kind,
            tool,
            file_label: file_label.into(),
            markers: MarkerConfig::default(),
            sink,
            state: RunStateMachine::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the marker phrases used by the multi-task strategy.
    #[must_use]
    pub fn with_markers(mut self, markers: MarkerConfig) -> Self {
        self.markers = markers;
        self
    }

    /// The strategy selected for this run.
    #[must_use]
    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state.state()
    }

    /// Handle for cancelling this run from another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.cancel.clone(),
            sink: Arc::clone(&self.sink),
        }
    }

    /// Request cancellation. Idempotent, safe to call at any time.
    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    /// Run the process to a terminal state.
    ///
    /// Returns the run outcome, or an error when the process could not be
    /// spawned or its output stream failed; either error leaves the run
    /// `Failed`. Cancelled and Failed runs never receive the summary event.
    ///
    /// # Errors
    ///
    /// Returns [`SuperviseError::Spawn`] or [`SuperviseError::Stream`].
    pub async fn run(&mut self) -> Result<RunOutcome, SuperviseError> {
        if self.sink.is_cancelled() {
            tracing::info!(tool = %self.tool, "run cancelled before start");
            self.state.transition(RunState::Cancelled);
            return Ok(RunOutcome::Cancelled);
        }

        let mut process = match ToolProcess::spawn(&self.descriptor) {
            Ok(process) => process,
            Err(e) => {
                tracing::error!(
                    tool = %self.tool,
                    command = %self.descriptor.command_line(),
                    error = %e,
                    "process failed to start"
                );
                self.state.transition(RunState::Failed);
                return Err(e.into());
            }
        };
        self.state.transition(RunState::Running);
        let started = Instant::now();
        tracing::info!(
            tool = %self.tool,
            pid = ?process.id(),
            command = %self.descriptor.command_line(),
            "process started"
        );

        let Some(output) = process.take_output() else {
            self.state.transition(RunState::Failed);
            return Err(SuperviseError::NoOutput);
        };

        let read = self.read_output(output).await;

        if let Err(e) = read {
            tracing::error!(tool = %self.tool, error = %e, "output stream failed");
            if let Err(kill_err) = process.kill().await {
                tracing::debug!(error = %kill_err, "kill after stream failure failed");
            }
            self.state.transition(RunState::Failed);
            return Err(SuperviseError::Stream(e));
        }

        if self.sink.is_cancelled() {
            tracing::info!(tool = %self.tool, "run cancelled, killing process");
            if let Err(e) = process.kill().await {
                tracing::debug!(error = %e, "kill after cancellation failed");
            }
            self.state.transition(RunState::Cancelled);
            return Ok(RunOutcome::Cancelled);
        }

        // Wait errors are best-effort cleanup races, never re-raised.
        match process.wait().await {
            Ok(status) => {
                tracing::info!(tool = %self.tool, status = ?status.code(), "process exited");
            }
            Err(e) => {
                tracing::debug!(tool = %self.tool, error = %e, "wait for process exit failed");
            }
        }

        let elapsed = started.elapsed();
        self.sink.append(ProgressEvent::end_of_line());
        self.sink.append(ProgressEvent::end_of_line());
        self.sink.append(ProgressEvent::important(format!(
            "{} finished for {} ({}).",
            self.tool,
            self.file_label,
            format_duration(elapsed)
        )));
        self.sink.append(ProgressEvent::end_of_line());

        self.state.transition(RunState::Completed);
        Ok(RunOutcome::Completed { elapsed })
    }

    /// Single reader loop: segment incoming chunks and feed the parser.
    ///
    /// Exits at end of stream, on I/O failure, or once cancellation is
    /// observed; the cancellation flag is polled before each token and after
    /// each batch, so at most one in-flight token lags a cancel request. The
    /// cancellation token only wakes a reader blocked on the channel.
    async fn read_output(
        &self,
        mut output: Receiver<std::io::Result<Vec<u8>>>,
    ) -> Result<(), std::io::Error> {
        let mut parser = self.kind.parser(&self.markers);
        let mut segmenter = Segmenter::new(self.kind.segmentation());
        parser.start(self.sink.as_ref());

        loop {
            let chunk = tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    tracing::debug!(tool = %self.tool, "reader woken by cancellation");
                    return Ok(());
                }
                chunk = output.recv() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;

            if self.feed_tokens(segmenter.push(&chunk), parser.as_mut()) {
                return Ok(());
            }
        }

        if let Some(tail) = segmenter.finish() {
            self.feed_tokens(vec![tail], parser.as_mut());
        }
        Ok(())
    }

    /// Feed a batch of tokens; returns true once cancellation is observed.
    fn feed_tokens(&self, tokens: Vec<String>, parser: &mut dyn OutputParser) -> bool {
        for token in tokens {
            if self.sink.is_cancelled() {
                return true;
            }
            parser.feed(&token, self.sink.as_ref());
        }
        self.sink.is_cancelled()
    }
}

/// Human-readable elapsed rendering for the summary line.
fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        return format!("{millis} ms");
    }
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        return format!("{secs:.1} s");
    }
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours} h {minutes} min")
    } else {
        format!("{minutes} min {seconds} s")
    }
}
