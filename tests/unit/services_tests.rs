//! Unit tests for the service context and its inner services.

use agent_conduit::config::ServicesConfig;
use agent_conduit::services::{AuditWriter, ServiceContext, TaskRegistry};
use agent_conduit::AppError;

#[tokio::test]
async fn create_without_an_audit_log_succeeds() {
    let context = ServiceContext::create(&ServicesConfig::default())
        .await
        .expect("create");
    assert!(context.tasks().is_some());
}

#[tokio::test]
async fn close_is_idempotent() {
    let mut context = ServiceContext::create(&ServicesConfig::default())
        .await
        .expect("create");

    context.close().await.expect("first close");
    assert!(context.tasks().is_none());
    context.close().await.expect("second close is a no-op");
}

#[tokio::test]
async fn audit_log_records_lifecycle_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("audit.log");
    let config = ServicesConfig {
        audit_log: Some(path.clone()),
    };

    let mut context = ServiceContext::create(&config).await.expect("create");
    context.record("custom event").await;
    context.close().await.expect("close");

    let text = std::fs::read_to_string(&path).expect("audit file");
    assert!(text.contains("services started"));
    assert!(text.contains("custom event"));
    assert!(text.contains("services closing"));
}

#[tokio::test]
async fn audit_open_failure_is_a_bootstrap_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"plain file").expect("fixture");

    let config = ServicesConfig {
        audit_log: Some(blocker.join("audit.log")),
    };
    let err = ServiceContext::create(&config).await.expect_err("open fails");
    assert!(matches!(err, AppError::Bootstrap(_)));
}

#[tokio::test]
async fn audit_writer_appends_across_reopens() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("audit.log");

    let mut first = AuditWriter::open(&path).await.expect("open");
    first.record("first run").await.expect("record");
    first.close().await.expect("close");

    let mut second = AuditWriter::open(&path).await.expect("reopen");
    second.record("second run").await.expect("record");
    second.close().await.expect("close");

    let text = std::fs::read_to_string(&path).expect("audit file");
    assert!(text.contains("first run"));
    assert!(text.contains("second run"));
}

#[tokio::test]
async fn failed_background_task_does_not_escalate() {
    let mut registry = TaskRegistry::new();
    registry.spawn("doomed", async { Err(AppError::Io("disk gone".into())) });

    // Close completes: the failure was logged and swallowed, not raised.
    registry.close().await;
}

#[tokio::test]
async fn registry_close_releases_cancellation_aware_tasks() {
    let mut registry = TaskRegistry::new();
    let cancel = registry.cancellation();
    registry.spawn("long-lived", async move {
        cancel.cancelled().await;
        Ok(())
    });

    assert!(!registry.is_empty());
    registry.close().await;
}
