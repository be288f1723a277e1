//! Terminal rendering of progress events.
//!
//! [`ConsoleReport`] is the CLI's report sink: events are rendered as they
//! arrive, either as colored text or as JSON lines. Library code never
//! prints; it only appends to a sink.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::report::{CounterMode, CounterState, CounterUpdate, ProgressEvent, ReportSink};

/// Output format for the console sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored, timestamped text.
    Plain,
    /// One JSON object per event or counter update.
    Json,
}

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// JSON-lines record wrapper.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Record<'a> {
    Event(&'a ProgressEvent),
    Counter(&'a CounterUpdate),
}

/// Rendering state carried between events.
#[derive(Debug, Default)]
struct RenderState {
    counter: CounterState,
    at_line_start: bool,
}

/// Report sink that renders events to the terminal as they arrive.
pub struct ConsoleReport {
    format: OutputFormat,
    state: Mutex<RenderState>,
    cancelled: AtomicBool,
}

impl ConsoleReport {
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            state: Mutex::new(RenderState {
                at_line_start: true,
                counter: CounterState::default(),
            }),
            cancelled: AtomicBool::new(false),
        }
    }

    fn print_plain(&self, event: &ProgressEvent) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if event.is_error {
            let mut err = io::stderr().lock();
            let _ = writeln!(
                err,
                "{} {} {}",
                timestamp().dimmed(),
                "[ERROR]".red().bold(),
                event.text.red()
            );
            state.at_line_start = true;
            return;
        }

        let mut out = io::stdout().lock();
        if state.at_line_start && !event.text.is_empty() {
            let _ = write!(out, "{} ", timestamp().dimmed());
        }
        if event.is_important {
            let _ = write!(out, "{}", event.text.bold());
        } else {
            let _ = write!(out, "{}", event.text);
        }
        if event.ends_line {
            let _ = writeln!(out);
        }
        let _ = out.flush();
        state.at_line_start = event.ends_line;
    }

    fn print_gauge(&self, update: CounterUpdate) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.counter.apply(update);

        // Redrawn in place; the next event's newline moves past it.
        let gauge = match state.counter.mode {
            CounterMode::Determinate => {
                format!("[{:>3}/{}]", state.counter.value, state.counter.max)
            }
            CounterMode::Indeterminate => "[ ... ]".to_string(),
        };
        let mut out = io::stdout().lock();
        let _ = write!(out, "\r{}", gauge.cyan());
        let _ = out.flush();
        state.at_line_start = false;
    }

    fn print_json<T: Serialize>(record: &T) {
        if let Ok(line) = serde_json::to_string(record) {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{line}");
        }
    }
}

impl ReportSink for ConsoleReport {
    fn append(&self, event: ProgressEvent) {
        match self.format {
            OutputFormat::Plain => self.print_plain(&event),
            OutputFormat::Json => Self::print_json(&Record::Event(&event)),
        }
    }

    fn update_counter(&self, update: CounterUpdate) {
        match self.format {
            OutputFormat::Plain => self.print_gauge(update),
            OutputFormat::Json => Self::print_json(&Record::Counter(&update)),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
