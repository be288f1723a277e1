//! Fallback line parser with embedded error-tag detection.

use crate::report::{ProgressEvent, ReportSink};

use super::OutputParser;

/// Opening tag of the single-line error wrapper Compomics-based tools emit.
const ERROR_OPEN: &str = "<CompomicsError>";
/// Closing tag of the error wrapper.
const ERROR_CLOSE: &str = "</CompomicsError>";

/// Echoes every line verbatim and watches for the embedded error wrapper.
///
/// A matched wrapper emits the inner text as an error event and cancels the
/// run, so the supervisor stops reading and destroys the process.
#[derive(Debug, Default)]
pub struct GenericParser;

impl GenericParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl OutputParser for GenericParser {
    fn feed(&mut self, line: &str, sink: &dyn ReportSink) {
        if let Some(message) = extract_error(line) {
            sink.append(ProgressEvent::end_of_line());
            sink.append(ProgressEvent::error(message));
            sink.cancel();
        } else {
            sink.append(ProgressEvent::log(line).ends_line());
        }
    }
}

/// Extract the inner text of a single-line error wrapper, if present.
fn extract_error(line: &str) -> Option<&str> {
    let start = line.find(ERROR_OPEN)? + ERROR_OPEN.len();
    let end = line[start..].find(ERROR_CLOSE)? + start;
    Some(&line[start..end])
}
