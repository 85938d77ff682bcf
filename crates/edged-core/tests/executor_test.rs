#![allow(clippy::unwrap_used)]
// Single-flight executor tests with scripted runners.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use common::{GatedRunner, RecordingSink};
use edged_core::{CommandRunner, CoreError, ExecutorCoordinator, OutputSink, OutputStream};

// ── Helpers ─────────────────────────────────────────────────────────

struct FailingRunner;

impl CommandRunner for FailingRunner {
    fn run(
        &self,
        args: Vec<String>,
        _sink: Arc<dyn OutputSink>,
    ) -> BoxFuture<'static, Result<(), CoreError>> {
        Box::pin(async move {
            Err(CoreError::CommandFailed {
                command: args.join(" "),
                reason: "exited with exit status: 1".into(),
            })
        })
    }
}

struct PanickingRunner;

impl CommandRunner for PanickingRunner {
    fn run(
        &self,
        _args: Vec<String>,
        _sink: Arc<dyn OutputSink>,
    ) -> BoxFuture<'static, Result<(), CoreError>> {
        Box::pin(async move { panic!("runner exploded") })
    }
}

fn gated() -> (ExecutorCoordinator, Arc<GatedRunner>) {
    let runner = Arc::new(GatedRunner::new());
    let executor = ExecutorCoordinator::with_runner(
        Arc::clone(&runner) as Arc<dyn CommandRunner>,
        Arc::new(RecordingSink::default()),
    );
    (executor, runner)
}

// ── Exclusivity ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_launch_conflicts_while_running() {
    let (executor, runner) = gated();

    executor.run(["up"]).unwrap();
    assert!(executor.is_running());
    assert_eq!(executor.in_flight(), 1);

    let err = executor.clone().run(["up"]).unwrap_err();
    assert!(matches!(err, CoreError::ExecutionConflict));
    assert!(!err.is_fatal());

    runner.release();
    executor.wait_for_all().await;
    assert!(!executor.is_running());
    assert_eq!(executor.in_flight(), 0);
    assert_eq!(runner.launches(), vec![vec!["up".to_owned()]]);
}

#[tokio::test]
async fn test_slot_is_reusable_after_completion() {
    let (executor, runner) = gated();

    executor.run(["up"]).unwrap();
    runner.release();
    executor.wait_for_all().await;

    executor.run(["up", "--reset"]).unwrap();
    runner.release();
    executor.wait_for_all().await;

    assert_eq!(runner.launches().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_launches_admit_exactly_one() {
    let (executor, runner) = gated();

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run(["up"]).is_ok() })
        })
        .collect();

    let mut admitted = 0;
    for attempt in attempts {
        if attempt.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);

    runner.release();
    executor.wait_for_all().await;
    assert_eq!(runner.launches().len(), 1);
}

// ── Drain ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_wait_for_all_blocks_until_command_finishes() {
    let (executor, runner) = gated();
    executor.run(["up"]).unwrap();

    let pending = tokio::time::timeout(Duration::from_millis(50), executor.wait_for_all()).await;
    assert!(pending.is_err(), "drain must wait for the running command");

    runner.release();
    tokio::time::timeout(Duration::from_secs(5), executor.wait_for_all())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wait_for_all_is_immediate_when_idle() {
    let (executor, _runner) = gated();
    tokio::time::timeout(Duration::from_millis(50), executor.wait_for_all())
        .await
        .unwrap();
}

// ── Failure handling ────────────────────────────────────────────────

#[tokio::test]
async fn test_command_failure_goes_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let executor = ExecutorCoordinator::with_runner(
        Arc::new(FailingRunner),
        Arc::clone(&sink) as Arc<dyn OutputSink>,
    );

    executor.run(["up"]).unwrap();
    executor.wait_for_all().await;

    assert!(!executor.is_running());
    assert!(sink.text(OutputStream::Stderr).contains("exited with exit status: 1"));
}

#[tokio::test]
async fn test_panicking_runner_releases_slot() {
    let executor = ExecutorCoordinator::with_runner(
        Arc::new(PanickingRunner),
        Arc::new(RecordingSink::default()),
    );

    executor.run(["up"]).unwrap();
    tokio::time::timeout(Duration::from_secs(5), executor.wait_for_all())
        .await
        .unwrap();

    assert!(!executor.is_running());
    assert!(executor.run(["up"]).is_ok());
}

// ── Process runner ──────────────────────────────────────────────────

#[cfg(unix)]
mod process {
    use super::*;
    use edged_core::ProcessRunner;

    #[tokio::test]
    async fn test_process_output_is_forwarded() {
        let sink = Arc::new(RecordingSink::default());
        let runner = ProcessRunner::new("sh");

        runner
            .run(
                vec!["-c".into(), "echo hello; echo world >&2".into()],
                Arc::clone(&sink) as Arc<dyn OutputSink>,
            )
            .await
            .unwrap();

        assert_eq!(sink.text(OutputStream::Stdout), "hello\n");
        assert_eq!(sink.text(OutputStream::Stderr), "world\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_command_failed() {
        let runner = ProcessRunner::new("sh");
        let err = runner
            .run(
                vec!["-c".into(), "exit 3".into()],
                Arc::new(RecordingSink::default()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::CommandFailed { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_missing_binary_is_command_failed() {
        let runner = ProcessRunner::new("/nonexistent/edged-test-binary");
        let err = runner
            .run(vec!["up".into()], Arc::new(RecordingSink::default()))
            .await
            .unwrap_err();

        match err {
            CoreError::CommandFailed { reason, .. } => assert!(reason.starts_with("spawn failed")),
            other => panic!("expected CommandFailed, got: {other:?}"),
        }
    }
}
