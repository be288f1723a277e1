//! Multi-task parser: phase-aware, task-scoped progress counting.
//!
//! The wrapped tool prints each task's progress as a stream of bare numeral
//! tokens between 0 and 100, bounded by named task markers that span several
//! whitespace-separated tokens. There is no explicit progress tagging, so
//! the parser reassembles the marker phrases in a small buffer and infers
//! phase from them. The marker literals are configuration, not code; an
//! upstream rename breaks progress tracking silently otherwise.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::MarkerConfig;
use crate::report::{CounterUpdate, ProgressEvent, ReportSink};

use super::OutputParser;

/// Bare numerals 0-100, no leading zeros.
static NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[1-9]?\d|100)$").expect("valid numeral pattern"));

/// Empty-token runs are rendered as at most this many line breaks.
const MAX_BLANK_RUN: u32 = 3;

/// Parser for multi-task tool output.
pub struct MultiTaskParser {
    markers: MarkerConfig,
    /// Reassembly buffer for multi-token marker phrases. Cleared on every
    /// match and trimmed to `marker_window` otherwise.
    marker_buf: String,
    marker_window: usize,
    /// Output between a task's 99/100 numeral and the next finish marker is
    /// dropped.
    ignore_output: bool,
    /// Inside a run of counted numerals; marker scanning is off.
    counting_progress: bool,
    /// A search-task start was seen; the next completed count is the last.
    boosted_progress: bool,
    empty_tokens: u32,
}

impl MultiTaskParser {
    #[must_use]
    pub fn new(markers: MarkerConfig) -> Self {
        let marker_window = (markers.longest_marker() * 4).max(192);
        Self {
            markers,
            marker_buf: String::new(),
            marker_window,
            ignore_output: false,
            counting_progress: false,
            boosted_progress: false,
            empty_tokens: 0,
        }
    }

    /// Accumulate the token and test the buffer for marker phrases.
    ///
    /// Returns the replacement token when the finish phrase completes, so
    /// the clean label is logged instead of its final fragment.
    fn scan_markers(&mut self, token: &str, sink: &dyn ReportSink) -> Option<String> {
        self.marker_buf.push_str(token);
        self.marker_buf.push(' ');

        if self.marker_buf.contains(&self.markers.gptmd_start) {
            self.marker_buf.clear();
            sink.update_counter(CounterUpdate::raise_max(self.markers.max_boost));
        } else if self.marker_buf.contains(&self.markers.gptmd_finish) {
            self.marker_buf.clear();
            self.ignore_output = false;
            return Some(self.markers.gptmd_finish.clone());
        } else if self
            .markers
            .search_starts
            .iter()
            .any(|phrase| self.marker_buf.contains(phrase))
        {
            self.marker_buf.clear();
            self.boosted_progress = true;
        } else {
            self.trim_marker_buf();
        }
        None
    }

    /// Keep only a tail window of the buffer, at a character boundary. The
    /// window is several times the longest phrase, so a phrase completing
    /// with a later token is never cut.
    fn trim_marker_buf(&mut self) {
        if self.marker_buf.len() <= self.marker_window {
            return;
        }
        let mut cut = self.marker_buf.len() - self.marker_window;
        while !self.marker_buf.is_char_boundary(cut) {
            cut += 1;
        }
        self.marker_buf.drain(..cut);
    }
}

impl OutputParser for MultiTaskParser {
    fn start(&mut self, sink: &dyn ReportSink) {
        sink.update_counter(CounterUpdate::determinate(100));
    }

    fn feed(&mut self, token: &str, sink: &dyn ReportSink) {
        let substituted = if self.counting_progress {
            None
        } else {
            self.scan_markers(token, sink)
        };
        let token = substituted.as_deref().unwrap_or(token);

        if self.ignore_output {
            return;
        }

        if token.is_empty() {
            self.empty_tokens += 1;
            if self.empty_tokens < MAX_BLANK_RUN {
                sink.append(ProgressEvent::end_of_line());
            }
            return;
        }

        if NUMERAL.is_match(token) {
            sink.update_counter(CounterUpdate::increment(1));
            self.counting_progress = true;

            let value: u32 = token.parse().unwrap_or(0);
            if value >= 99 {
                // End of this task's numeral run, whatever came before.
                self.counting_progress = false;
                self.ignore_output = true;

                if self.boosted_progress {
                    sink.update_counter(CounterUpdate::indeterminate());
                    sink.append(ProgressEvent::important(&self.markers.writing_output));
                }
            }
        } else {
            sink.append(ProgressEvent::log(format!("{token} ")));
        }
        self.empty_tokens = 0;
    }
}
