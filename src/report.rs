//! Progress reporting primitives shared by the parsers and the supervisor.
//!
//! Parsers translate raw tool output into [`ProgressEvent`]s and
//! [`CounterUpdate`]s and append them to a [`ReportSink`]. The sink also owns
//! the shared cancellation flag that the reader loop polls between tokens.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// A unit of structured feedback derived from raw tool output.
///
/// Events have no identity beyond emission order; the sink appends them in
/// the order the single reader produces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Text to append to the report. May be empty for bare line terminators.
    pub text: String,
    /// Whether the event reports a tool error.
    pub is_error: bool,
    /// Whether the event should be highlighted by the display layer.
    pub is_important: bool,
    /// Whether the report line ends after this event.
    pub ends_line: bool,
}

impl ProgressEvent {
    /// A plain log event.
    #[must_use]
    pub fn log(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            is_important: false,
            ends_line: false,
        }
    }

    /// A highlighted log event.
    #[must_use]
    pub fn important(text: impl Into<String>) -> Self {
        Self {
            is_important: true,
            ..Self::log(text)
        }
    }

    /// An error event. Errors are always highlighted.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            is_important: true,
            ..Self::log(text)
        }
    }

    /// A log event whose importance is decided by the caller.
    #[must_use]
    pub fn with_importance(text: impl Into<String>, is_important: bool) -> Self {
        Self {
            is_important,
            ..Self::log(text)
        }
    }

    /// A bare line terminator.
    #[must_use]
    pub fn end_of_line() -> Self {
        Self {
            text: String::new(),
            is_error: false,
            is_important: false,
            ends_line: true,
        }
    }

    /// Mark this event as ending its report line.
    #[must_use]
    pub fn ends_line(mut self) -> Self {
        self.ends_line = true;
        self
    }
}

/// Mode of the secondary progress counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterMode {
    /// Progress toward a known maximum.
    Determinate,
    /// Activity without a known endpoint.
    Indeterminate,
}

/// A change to the secondary progress counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterUpdate {
    /// Switch the counter mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<CounterMode>,
    /// Reset the current value to zero.
    #[serde(default)]
    pub reset: bool,
    /// Set the counter maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    /// Advance the current value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<u64>,
}

impl CounterUpdate {
    /// Switch to determinate mode, reset the value and set the maximum.
    #[must_use]
    pub fn determinate(max: u64) -> Self {
        Self {
            mode: Some(CounterMode::Determinate),
            reset: true,
            max: Some(max),
            delta: None,
        }
    }

    /// Switch to indeterminate mode.
    #[must_use]
    pub fn indeterminate() -> Self {
        Self {
            mode: Some(CounterMode::Indeterminate),
            ..Self::default()
        }
    }

    /// Advance the current value by `delta`.
    #[must_use]
    pub fn increment(delta: u64) -> Self {
        Self {
            delta: Some(delta),
            ..Self::default()
        }
    }

    /// Raise the maximum without resetting the current value.
    #[must_use]
    pub fn raise_max(max: u64) -> Self {
        Self {
            max: Some(max),
            ..Self::default()
        }
    }
}

/// Snapshot of the secondary progress counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterState {
    pub mode: CounterMode,
    pub value: u64,
    pub max: u64,
}

impl Default for CounterState {
    fn default() -> Self {
        Self {
            mode: CounterMode::Indeterminate,
            value: 0,
            max: 0,
        }
    }
}

impl CounterState {
    /// Apply an update in place.
    pub fn apply(&mut self, update: CounterUpdate) {
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if update.reset {
            self.value = 0;
        }
        if let Some(max) = update.max {
            self.max = max;
        }
        if let Some(delta) = update.delta {
            self.value = self.value.saturating_add(delta);
        }
    }
}

/// Consumer of progress events produced by one supervised run.
///
/// Appends arrive in strict emission order from a single reader; the
/// implementation only has to serialize external [`cancel`](Self::cancel)
/// calls against in-flight appends, never appends against each other.
pub trait ReportSink: Send + Sync {
    /// Append a progress event to the report.
    fn append(&self, event: ProgressEvent);

    /// Apply an update to the secondary progress counter.
    fn update_counter(&self, update: CounterUpdate);

    /// Whether the run has been cancelled.
    fn is_cancelled(&self) -> bool;

    /// Request cancellation of the run. Idempotent.
    fn cancel(&self);
}

/// In-memory report: buffers events and counter updates, owns the
/// cancellation flag.
///
/// Used by the tests and by callers that want to inspect a run after the
/// fact; the CLI uses [`crate::display::ConsoleReport`] instead.
#[derive(Debug, Default)]
pub struct ProgressReport {
    events: Mutex<Vec<ProgressEvent>>,
    updates: Mutex<Vec<CounterUpdate>>,
    counter: Mutex<CounterState>,
    cancelled: AtomicBool,
}

impl ProgressReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events appended so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All counter updates applied so far, in emission order.
    #[must_use]
    pub fn counter_updates(&self) -> Vec<CounterUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current counter snapshot.
    #[must_use]
    pub fn counter(&self) -> CounterState {
        *self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The textual report: event texts concatenated, line flags rendered as
    /// newlines.
    #[must_use]
    pub fn text(&self) -> String {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();
        for event in events.iter() {
            out.push_str(&event.text);
            if event.ends_line {
                out.push('\n');
            }
        }
        out
    }
}

impl ReportSink for ProgressReport {
    fn append(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn update_counter(&self, update: CounterUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
        self.counter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(update);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
