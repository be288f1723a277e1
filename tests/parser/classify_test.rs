//! Classifier and full-stream parsing tests.
//!
//! These drive raw byte streams through the segmenter and a parser the way
//! the supervisor's reader loop does, without a live process.

use search_supervisor::config::MarkerConfig;
use search_supervisor::parser::{Segmenter, ToolKind};
use search_supervisor::report::{CounterMode, ProgressReport, ReportSink};

/// Segment `bytes` per the strategy and feed every token to its parser.
fn drive(kind: ToolKind, bytes: &[u8]) -> ProgressReport {
    let markers = MarkerConfig::default();
    let mut parser = kind.parser(&markers);
    let mut segmenter = Segmenter::new(kind.segmentation());
    let report = ProgressReport::new();

    parser.start(&report);
    for token in segmenter.push(bytes) {
        parser.feed(&token, &report);
    }
    if let Some(tail) = segmenter.finish() {
        parser.feed(&tail, &report);
    }
    report
}

#[test]
fn classify_is_total_over_arbitrary_names() {
    for name in [
        "Comet",
        "msconvert",
        "ThermoRawFileParser",
        "MetaMorpheus",
        "MS-GF+",
        "Tide",
        "",
        "with spaces and ünïcode",
    ] {
        // No name panics and every name gets a strategy.
        let _ = ToolKind::from_tool_name(name);
    }
}

#[test]
fn generic_stream_with_error_tag_cancels_once() {
    let report = drive(
        ToolKind::Generic,
        b"indexing database\n<CompomicsError>FASTA file missing.</CompomicsError>\nshutting down\n",
    );

    assert!(report.is_cancelled());
    let errors: Vec<_> = report.events().into_iter().filter(|e| e.is_error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].text, "FASTA file missing.");
}

#[test]
fn comet_redraw_stream_collapses_duplicates() {
    let report = drive(
        ToolKind::Comet,
        b"Search progress\n10%\x08 10%\x08 100%\x08 Done\n",
    );

    let texts: Vec<_> = report.events().into_iter().map(|e| e.text).collect();
    assert_eq!(texts, ["Search progress ", "10% ", "100% ", "Done "]);
}

#[test]
fn converter_stream_counts_buckets() {
    let report = drive(
        ToolKind::ConverterProgress,
        b"format: mzML\nprocessing file: a.raw\nwriting output file: a.mzML\n1/2\n2/2\n",
    );

    let important: Vec<_> = report
        .events()
        .into_iter()
        .filter(|e| e.is_important)
        .map(|e| e.text)
        .collect();
    assert_eq!(
        important,
        ["processing file: a.raw", "writing output file: a.mzML"]
    );

    let counter = report.counter();
    assert_eq!(counter.mode, CounterMode::Determinate);
    assert_eq!(counter.max, 100);
    assert_eq!(counter.value, 1);
}

#[test]
fn rawfile_stream_steps_counter_per_percentage() {
    let report = drive(
        ToolKind::RawFileParser,
        b"Processing 1000 scans\n10% 20% 30%\n",
    );

    assert_eq!(report.counter().value, 30);
    let important: Vec<_> = report
        .events()
        .into_iter()
        .filter(|e| e.is_important)
        .map(|e| e.text)
        .collect();
    assert_eq!(important, ["scans "]);
}

#[test]
fn multitask_stream_counts_between_markers() {
    let report = drive(
        ToolKind::MultiTask,
        b"Starting task: Task1SearchTask\n1 2 3 99\nchatter after completion\n",
    );

    // 1, 2, 3, 99 each tick once.
    assert_eq!(report.counter().value, 4);
    assert_eq!(report.counter().mode, CounterMode::Indeterminate);

    let last = report.events().into_iter().next_back().unwrap();
    assert_eq!(last.text, "Writing MetaMorpheus output.");
    assert!(last.is_important);
}

#[test]
fn multitask_gptmd_then_search_doubles_maximum() {
    let report = drive(
        ToolKind::MultiTask,
        b"Starting task: Task1GptmdTask\n1 2 100\nFinished task: Task1GptmdTask\nStarting task: Task2SearchTask\n",
    );

    // Maximum raised to 200 by the first task; the value keeps the ticks
    // counted before the terminal numeral.
    assert_eq!(report.counter().max, 200);
    assert_eq!(report.counter().value, 3);
    assert!(report
        .events()
        .iter()
        .any(|e| e.text == "Finished task: Task1GptmdTask "));
}
