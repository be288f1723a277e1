//! Tool output classification and parsing strategies.
//!
//! Every wrapped tool reports progress in its own ad-hoc textual format.
//! [`ToolKind`] maps a tool-identifying string to one of a closed set of
//! strategies; each strategy is a small state machine implementing
//! [`OutputParser`], fed one token at a time by the supervisor's reader loop.

mod comet;
mod converter;
mod generic;
mod multitask;
mod rawfile;
mod tokenize;

pub use comet::CometParser;
pub use converter::ConverterParser;
pub use generic::GenericParser;
pub use multitask::MultiTaskParser;
pub use rawfile::RawFileParser;
pub use tokenize::{Segmentation, Segmenter};

use serde::{Deserialize, Serialize};

use crate::config::MarkerConfig;
use crate::report::ReportSink;

/// Output-parsing strategy for a wrapped tool.
///
/// Adding support for a new tool's output format means adding a variant
/// here and an arm to the strategy table, not another string comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Line-oriented pass-through with embedded error-tag detection. The
    /// fallback for every tool without a dedicated strategy.
    #[default]
    Generic,
    /// Comet: in-place redraw tokens with duplicate suppression.
    Comet,
    /// msconvert: setup lines followed by `current/max` progress fractions.
    ConverterProgress,
    /// ThermoRawFileParser: percentage tokens stepping a fixed-stride
    /// counter.
    RawFileParser,
    /// MetaMorpheus: bare-numeral progress bounded by named task markers.
    MultiTask,
}

impl ToolKind {
    /// Map a tool-identifying string to its parsing strategy.
    ///
    /// Total and deterministic; unrecognized names fall back to
    /// [`ToolKind::Generic`] so every tool gets at least error-tag
    /// detection and pass-through logging.
    #[must_use]
    pub fn from_tool_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "comet" => Self::Comet,
            "msconvert" => Self::ConverterProgress,
            "thermorawfileparser" => Self::RawFileParser,
            "metamorpheus" => Self::MultiTask,
            _ => Self::Generic,
        }
    }

    /// The delimiter family this strategy tokenizes on.
    #[must_use]
    pub fn segmentation(self) -> Segmentation {
        match self {
            Self::Generic | Self::ConverterProgress => Segmentation::Lines,
            Self::Comet => Segmentation::InPlaceRedraw,
            Self::RawFileParser | Self::MultiTask => Segmentation::Whitespace,
        }
    }

    /// Build a fresh parser instance for one run.
    #[must_use]
    pub fn parser(self, markers: &MarkerConfig) -> Box<dyn OutputParser> {
        match self {
            Self::Generic => Box::new(GenericParser::new()),
            Self::Comet => Box::new(CometParser::new()),
            Self::ConverterProgress => Box::new(ConverterParser::new()),
            Self::RawFileParser => Box::new(RawFileParser::new()),
            Self::MultiTask => Box::new(MultiTaskParser::new(markers.clone())),
        }
    }
}

/// A per-run output parser state machine.
///
/// Instances live for exactly one run; state is never shared across runs or
/// parser instances.
pub trait OutputParser: Send {
    /// Called once before the first token.
    fn start(&mut self, sink: &dyn ReportSink) {
        let _ = sink;
    }

    /// Consume one token (or line) of tool output, emitting zero or more
    /// events to the sink.
    fn feed(&mut self, token: &str, sink: &dyn ReportSink);
}
