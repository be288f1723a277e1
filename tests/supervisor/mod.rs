//! Supervisor module tests.

mod runner_test;

/// Verify all public supervisor types are exported from the library.
#[test]
fn all_supervisor_types_exported() {
    use std::sync::Arc;

    use search_supervisor::process::ProcessDescriptor;
    use search_supervisor::report::ProgressReport;
    use search_supervisor::supervisor::{
        CancelHandle, RunOutcome, RunState, RunStateMachine, SuperviseError, ToolSupervisor,
    };

    // Verify types are constructible
    let _ = RunStateMachine::new();
    let supervisor = ToolSupervisor::new(
        ProcessDescriptor::new("echo"),
        "Comet",
        "a.mgf",
        Arc::new(ProgressReport::new()),
    );
    let _: CancelHandle = supervisor.cancel_handle();

    // Verify enum variants
    let _ = RunState::Pending;
    let _ = RunOutcome::Cancelled;
    let _: fn() -> SuperviseError = || SuperviseError::NoOutput;
}
