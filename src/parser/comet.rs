//! Comet-style token parser with redraw duplicate suppression.

use crate::report::{ProgressEvent, ReportSink};

use super::OutputParser;

/// Suppresses repeated in-place redraw tokens and demotes intermediate
/// percentages.
///
/// Comet redraws its progress line, so consecutive tokens often repeat or
/// extend the previous one. A token is emitted only when the last token does
/// not already contain it; intermediate percentages are kept out of the
/// highlighted report, while `100%` and non-percentage tokens stay
/// important.
#[derive(Debug, Default)]
pub struct CometParser {
    last_token: String,
}

impl CometParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputParser for CometParser {
    fn feed(&mut self, token: &str, sink: &dyn ReportSink) {
        if !self.last_token.contains(token) {
            let is_important = !token.contains('%') || token.contains("100%");
            sink.append(ProgressEvent::with_importance(
                format!("{token} "),
                is_important,
            ));
        }
        // Updated even when suppressed, so exact-repeat redraws stay quiet.
        self.last_token = token.to_string();
    }
}
