//! Converter-style two-phase progress parser.
//!
//! The converter prints a few setup lines, then one `current/max` fraction
//! per processed spectrum. Emitting a counter tick per raw line would flood
//! the sink, so progress is bucketed: the floored percentage of the current
//! value is compared against the value one stride earlier, and a tick is
//! emitted only when the bucket changed.

use std::sync::LazyLock;

use regex::Regex;

use crate::report::{CounterUpdate, ProgressEvent, ReportSink};

use super::OutputParser;

/// Line prefix announcing the input file.
const PROCESSING_PREFIX: &str = "processing file:";
/// Line prefix announcing the output file; switches to the progress phase.
const WRITING_PREFIX: &str = "writing output file:";

/// Stride for the percentage-bucket comparison.
const PROGRESS_STRIDE: i64 = 100;

/// `current/max` integer pairs.
static FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*/\s*(\d+)\s*$").expect("valid fraction pattern"));

/// Parser for converter output: setup lines, then fractional progress.
#[derive(Debug, Default)]
pub struct ConverterParser {
    progress_started: bool,
}

impl ConverterParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputParser for ConverterParser {
    fn feed(&mut self, line: &str, sink: &dyn ReportSink) {
        if line.starts_with(PROCESSING_PREFIX) || line.starts_with(WRITING_PREFIX) {
            sink.append(ProgressEvent::important(line));

            if line.starts_with(WRITING_PREFIX) {
                self.progress_started = true;
                sink.update_counter(CounterUpdate::determinate(100));
            }
        } else if self.progress_started {
            // Non-fraction lines in the progress phase carry nothing useful;
            // malformed numerals are an expected condition, not an error.
            if let Some((current, max)) = parse_fraction(line) {
                let previous_pct = floor_percentage(current - PROGRESS_STRIDE, max);
                let current_pct = floor_percentage(current, max);

                if current != 1 && previous_pct != current_pct {
                    sink.update_counter(CounterUpdate::increment(1));
                }
            }
        }
    }
}

/// Parse a `current/max` integer pair. Returns `None` for anything else,
/// including a zero maximum.
fn parse_fraction(line: &str) -> Option<(i64, i64)> {
    let captures = FRACTION.captures(line)?;
    let current = captures[1].parse().ok()?;
    let max: i64 = captures[2].parse().ok()?;
    if max == 0 {
        return None;
    }
    Some((current, max))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn floor_percentage(value: i64, max: i64) -> i64 {
    (value as f64 / max as f64 * 100.0).floor() as i64
}
