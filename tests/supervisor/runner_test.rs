//! End-to-end supervisor tests against real processes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use search_supervisor::process::ProcessDescriptor;
use search_supervisor::report::{CounterMode, ProgressReport, ReportSink};
use search_supervisor::supervisor::{RunOutcome, RunState, SuperviseError, ToolSupervisor};

fn shell(script: &str) -> ProcessDescriptor {
    ProcessDescriptor::new("sh").arg("-c").arg(script)
}

#[tokio::test]
async fn generic_tool_completes_with_timed_summary() {
    let sink = Arc::new(ProgressReport::new());
    let mut supervisor = ToolSupervisor::new(
        shell("echo indexing; echo searching"),
        "MS-GF+",
        "sample.mgf",
        sink.clone(),
    );

    let outcome = supervisor.run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(supervisor.state(), RunState::Completed);

    let text = sink.text();
    assert!(text.contains("indexing\n"));
    assert!(text.contains("searching\n"));

    let summary = sink
        .events()
        .into_iter()
        .rev()
        .find(|e| e.is_important)
        .unwrap();
    assert!(summary.text.starts_with("MS-GF+ finished for sample.mgf ("));
    assert!(summary.text.ends_with(")."));
    assert!(!summary.is_error);
}

#[tokio::test]
async fn converter_run_yields_ordered_events_and_one_tick() {
    let sink = Arc::new(ProgressReport::new());
    let script = "echo 'processing file: a.raw'; echo 'writing output file: a.mzML'; echo 1/2; echo 2/2";
    let mut supervisor =
        ToolSupervisor::new(shell(script), "msconvert", "a.raw", sink.clone());

    let outcome = supervisor.run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let important: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.is_important)
        .map(|e| e.text)
        .collect();
    assert_eq!(important[0], "processing file: a.raw");
    assert_eq!(important[1], "writing output file: a.mzML");
    assert!(important[2].starts_with("msconvert finished for a.raw ("));

    let updates = sink.counter_updates();
    let resets = updates.iter().filter(|u| u.reset).count();
    let ticks = updates.iter().filter(|u| u.delta.is_some()).count();
    assert_eq!(resets, 1);
    assert_eq!(ticks, 1);
    assert_eq!(sink.counter().max, 100);
    assert_eq!(sink.counter().mode, CounterMode::Determinate);
}

#[tokio::test]
async fn rawfile_run_advances_counter_by_percent_tokens() {
    let sink = Arc::new(ProgressReport::new());
    let script = "echo 'Started scan processing'; echo '10% 20% 30%'; echo '1000 scans'";
    let mut supervisor = ToolSupervisor::new(
        shell(script),
        "ThermoRawFileParser",
        "a.raw",
        sink.clone(),
    );

    supervisor.run().await.unwrap();

    assert_eq!(sink.counter().value, 30);
    assert!(sink.events().iter().any(|e| e.text == "scans " && e.is_important));
}

#[tokio::test]
async fn multitask_run_finishes_with_writing_event() {
    let sink = Arc::new(ProgressReport::new());
    let script = "echo 'Starting task: Task1SearchTask'; echo '1 2 99'";
    let mut supervisor =
        ToolSupervisor::new(shell(script), "MetaMorpheus", "a.mzML", sink.clone());

    supervisor.run().await.unwrap();

    assert_eq!(sink.counter().mode, CounterMode::Indeterminate);
    assert!(sink
        .events()
        .iter()
        .any(|e| e.text == "Writing MetaMorpheus output." && e.is_important));
}

#[tokio::test]
async fn tool_reported_error_cancels_without_waiting() {
    let sink = Arc::new(ProgressReport::new());
    let script = "echo '<CompomicsError>fatal: bad database</CompomicsError>'; sleep 10";
    let mut supervisor = ToolSupervisor::new(shell(script), "OMSSA", "a.mgf", sink.clone());

    let started = Instant::now();
    let outcome = supervisor.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(supervisor.state(), RunState::Cancelled);
    // Killed, not waited for: nowhere near the sleep.
    assert!(started.elapsed() < Duration::from_secs(5));

    let errors: Vec<_> = sink.events().into_iter().filter(|e| e.is_error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].text, "fatal: bad database");
    // No success claim on a cancelled run.
    assert!(!sink.text().contains("finished for"));
}

#[tokio::test]
async fn external_cancel_wakes_blocked_reader() {
    let sink = Arc::new(ProgressReport::new());
    let mut supervisor = ToolSupervisor::new(
        shell("echo started; sleep 30"),
        "Tide",
        "a.mgf",
        sink.clone(),
    );
    let handle = supervisor.cancel_handle();

    let started = Instant::now();
    let task = tokio::spawn(async move { supervisor.run().await });

    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.cancel();

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));

    let text = sink.text();
    assert!(text.contains("started"));
    assert!(!text.contains("finished for"));
}

#[tokio::test]
async fn no_events_after_cancellation_observed() {
    let sink = Arc::new(ProgressReport::new());
    let mut supervisor = ToolSupervisor::new(
        shell("echo one; sleep 30; echo two"),
        "Tide",
        "a.mgf",
        sink.clone(),
    );
    let handle = supervisor.cancel_handle();

    let task = tokio::spawn(async move { supervisor.run().await });
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.cancel();
    task.await.unwrap().unwrap();

    let count = sink.events().len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.events().len(), count);
    assert!(!sink.text().contains("two"));
}

#[tokio::test]
async fn cancel_twice_has_single_cancel_effect() {
    let sink = Arc::new(ProgressReport::new());
    let mut supervisor =
        ToolSupervisor::new(shell("sleep 30"), "Comet", "a.mgf", sink.clone());

    supervisor.cancel();
    supervisor.cancel();

    let outcome = supervisor.run().await.unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn cancel_after_completion_is_absorbed() {
    let sink = Arc::new(ProgressReport::new());
    let mut supervisor = ToolSupervisor::new(shell("echo done"), "Comet", "a.mgf", sink.clone());
    let handle = supervisor.cancel_handle();

    let outcome = supervisor.run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(supervisor.state(), RunState::Completed);

    // Late cancellation is best-effort cleanup, not an error.
    handle.cancel();
    handle.cancel();
    assert!(sink.is_cancelled());
}

#[tokio::test]
async fn spawn_failure_surfaces_without_stream_handling() {
    let sink = Arc::new(ProgressReport::new());
    let mut supervisor = ToolSupervisor::new(
        ProcessDescriptor::new("/no/such/search-engine"),
        "Comet",
        "a.mgf",
        sink.clone(),
    );

    let err = supervisor.run().await.unwrap_err();
    assert!(matches!(err, SuperviseError::Spawn(_)));
    assert_eq!(supervisor.state(), RunState::Failed);
    assert!(sink.events().is_empty());
    assert!(sink.counter_updates().is_empty());
}

#[tokio::test]
async fn working_directory_reaches_the_tool() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let temp_path = temp_dir.path().canonicalize().unwrap();

    let sink = Arc::new(ProgressReport::new());
    let descriptor = ProcessDescriptor::new("pwd").working_dir(&temp_path);
    let mut supervisor = ToolSupervisor::new(descriptor, "X!Tandem", "a.mgf", sink.clone());

    supervisor.run().await.unwrap();

    assert!(sink.text().contains(temp_path.to_str().unwrap()));
}
