//! Raw-file-parser-style token parser.

use crate::report::{CounterUpdate, ProgressEvent, ReportSink};

use super::OutputParser;

/// Fixed counter step for each percentage token the tool prints.
const PERCENT_STEP: u64 = 10;
/// Suffix marking a token as a unit-of-work summary.
const SCANS_SUFFIX: &str = "scans";

/// Parser for tools that print a percentage token per decile and
/// whitespace-separated log words.
#[derive(Debug, Default)]
pub struct RawFileParser;

impl RawFileParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl OutputParser for RawFileParser {
    fn start(&mut self, sink: &dyn ReportSink) {
        sink.update_counter(CounterUpdate::determinate(100));
    }

    fn feed(&mut self, token: &str, sink: &dyn ReportSink) {
        if token.is_empty() {
            sink.append(ProgressEvent::end_of_line());
        } else if token.ends_with('%') {
            sink.update_counter(CounterUpdate::increment(PERCENT_STEP));
        } else {
            sink.append(ProgressEvent::with_importance(
                format!("{token} "),
                token.ends_with(SCANS_SUFFIX),
            ));
        }
    }
}
