//! Poll scheduler behavior with a scripted source

use chrono::Utc;
use pretty_assertions::assert_eq;
use rstest::*;
use server_room_monitor::client::TableName;
use server_room_monitor::monitoring::{
    CycleOutcome, MonitorSession, MonitorStatus, Pipeline, PollScheduler, SchedulerConfig,
};
use server_room_monitor::services::{AlertKind, AlertSeverity};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{access_row, payload, telemetry_row, ts, FakeSource, MockSheetServer, Reply};

fn session() -> MonitorSession {
    MonitorSession {
        dataset_id: "dataset".to_string(),
        notifications_enabled: true,
        telemetry_page: 1,
        access_page: 1,
        page_size: 10,
    }
}

fn scheduler_with(source: Arc<FakeSource>, session: MonitorSession) -> Arc<PollScheduler> {
    Arc::new(PollScheduler::new(
        source,
        Pipeline::default(),
        SchedulerConfig {
            interval: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(2),
        },
        session,
    ))
}

fn healthy_source(temperature: f64) -> FakeSource {
    let now = Utc::now();
    FakeSource::tables(
        payload(vec![telemetry_row(ts(now), temperature, 50.0, Some(30.0))]),
        payload(vec![access_row(ts(now), "u1", "GRANTED", "")]),
    )
}

#[tokio::test]
async fn test_idle_before_first_cycle() {
    let scheduler = scheduler_with(Arc::new(healthy_source(22.0)), session());
    assert_eq!(scheduler.status().await, MonitorStatus::Idle);
    assert!(scheduler.latest_report().await.is_none());
    assert!(scheduler.last_update().await.is_none());
}

#[tokio::test]
async fn test_successful_cycle_commits_report() {
    let source = Arc::new(healthy_source(22.0));
    let scheduler = scheduler_with(Arc::clone(&source), session());
    let mut updates = scheduler.subscribe();

    let outcome = scheduler.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::Committed(_)));
    assert_eq!(scheduler.status().await, MonitorStatus::Connected);
    assert_eq!(source.calls(), 2);

    let report = scheduler.latest_report().await.unwrap();
    assert_eq!(report.dataset_id, "dataset");
    assert_eq!(report.summary.temperature_label(), "22.0");
    assert_eq!(report.summary.access_24h.granted, 1);
    assert_eq!(scheduler.last_update().await, Some(report.completed_at));

    let update = updates.recv().await.unwrap();
    assert_eq!(update.sequence, 1);
    assert_eq!(update.status, MonitorStatus::Connected);
    assert_eq!(update.report.as_deref(), Some(report.as_ref()));
}

#[rstest]
#[case::transport(Reply::Transport, MonitorStatus::Offline)]
#[case::format(Reply::Format, MonitorStatus::Error)]
#[tokio::test]
async fn test_failed_cycle_keeps_previous_report(
    #[case] failure: Reply,
    #[case] expected: MonitorStatus,
) {
    let source = Arc::new(healthy_source(22.0));
    let scheduler = scheduler_with(Arc::clone(&source), session());

    scheduler.run_cycle().await;
    let committed = scheduler.latest_report().await.unwrap();

    source.set_access(failure);
    let outcome = scheduler.run_cycle().await;

    assert_eq!(outcome.status(), expected);
    assert_eq!(scheduler.status().await, expected);
    assert!(scheduler.last_error().await.is_some());
    let kept = scheduler.latest_report().await.unwrap();
    assert!(Arc::ptr_eq(&kept, &committed));
}

#[tokio::test]
async fn test_recovery_clears_error() {
    let source = Arc::new(healthy_source(22.0));
    source.set_telemetry(Reply::Transport);
    let scheduler = scheduler_with(Arc::clone(&source), session());

    scheduler.run_cycle().await;
    assert_eq!(scheduler.status().await, MonitorStatus::Offline);
    assert!(scheduler.latest_report().await.is_none());

    source.set_telemetry(Reply::Table(payload(vec![telemetry_row(
        ts(Utc::now()),
        23.0,
        40.0,
        None,
    )])));
    scheduler.run_cycle().await;
    assert_eq!(scheduler.status().await, MonitorStatus::Connected);
    assert!(scheduler.last_error().await.is_none());
}

#[tokio::test]
async fn test_empty_telemetry_reports_no_data() {
    let source = Arc::new(healthy_source(22.0));
    let scheduler = scheduler_with(Arc::clone(&source), session());
    scheduler.run_cycle().await;
    let committed = scheduler.latest_report().await.unwrap();

    source.set_telemetry(Reply::Table(payload(vec![])));
    let outcome = scheduler.run_cycle().await;

    assert!(matches!(outcome, CycleOutcome::NoData));
    assert_eq!(scheduler.status().await, MonitorStatus::NoData);
    assert!(Arc::ptr_eq(
        &scheduler.latest_report().await.unwrap(),
        &committed
    ));
}

#[tokio::test]
async fn test_blank_dataset_skips_fetch() {
    let source = Arc::new(healthy_source(22.0));
    let mut session = session();
    session.dataset_id = "   ".to_string();
    let scheduler = scheduler_with(Arc::clone(&source), session);

    let outcome = scheduler.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::NotConfigured));
    assert_eq!(scheduler.status().await, MonitorStatus::NotConfigured);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_fetch_timeout_marks_offline() {
    let source = Arc::new(FakeSource::new(
        Reply::Slow(Duration::from_secs(5), payload(vec![])),
        Reply::Table(payload(vec![])),
    ));
    let scheduler = Arc::new(PollScheduler::new(
        source,
        Pipeline::default(),
        SchedulerConfig {
            interval: Duration::from_secs(3600),
            fetch_timeout: Duration::from_millis(50),
        },
        session(),
    ));

    let outcome = scheduler.run_cycle().await;
    assert_eq!(outcome.status(), MonitorStatus::Offline);
}

#[tokio::test]
async fn test_overlapping_cycles_are_serialized() {
    let now = Utc::now();
    let source = Arc::new(FakeSource::new(
        Reply::Slow(
            Duration::from_millis(100),
            payload(vec![telemetry_row(ts(now), 22.0, 50.0, None)]),
        ),
        Reply::Slow(Duration::from_millis(100), payload(vec![])),
    ));
    let scheduler = scheduler_with(Arc::clone(&source), session());

    let (first, second) = tokio::join!(scheduler.run_cycle(), scheduler.run_cycle());

    assert!(matches!(first, CycleOutcome::Committed(_)));
    assert!(matches!(second, CycleOutcome::Committed(_)));
    assert_eq!(source.calls(), 4);
    // Both tables of one cycle run together, never two cycles at once
    assert_eq!(source.max_in_flight(), 2);
}

#[tokio::test]
async fn test_page_cursor_applies_on_next_cycle() {
    let now = Utc::now();
    let rows = (0..25)
        .map(|i| access_row(ts(now - chrono::Duration::minutes(i)), "u", "GRANTED", ""))
        .collect();
    let source = Arc::new(FakeSource::tables(
        payload(vec![telemetry_row(ts(now), 22.0, 50.0, None)]),
        payload(rows),
    ));
    let scheduler = scheduler_with(source, session());

    scheduler.set_page(TableName::Access, 9).await;
    let CycleOutcome::Committed(report) = scheduler.run_cycle().await else {
        panic!("expected a committed cycle");
    };

    assert_eq!(report.access_page.page, 3);
    assert_eq!(report.access_page.items.len(), 5);
    // The session cursor itself is left untouched
    assert_eq!(scheduler.session().await.access_page, 9);
}

#[tokio::test]
async fn test_save_dataset_acknowledges_even_when_muted() {
    let source = Arc::new(healthy_source(22.0));
    let mut session = session();
    session.notifications_enabled = false;
    let scheduler = scheduler_with(Arc::clone(&source), session);
    let mut updates = scheduler.subscribe();

    scheduler.save_dataset("  new-sheet  ").await.unwrap();

    let update = updates.recv().await.unwrap();
    assert_eq!(update.alerts.len(), 1);
    assert_eq!(update.alerts[0].kind, AlertKind::ConfigurationSaved);
    assert_eq!(update.alerts[0].severity, AlertSeverity::Success);
    assert_eq!(scheduler.session().await.dataset_id, "new-sheet");

    scheduler.run_cycle().await;
    assert!(source.datasets().iter().all(|id| id == "new-sheet"));
}

#[tokio::test]
async fn test_save_blank_dataset_is_rejected() {
    let scheduler = scheduler_with(Arc::new(healthy_source(22.0)), session());
    assert!(scheduler.save_dataset("  ").await.is_err());
    assert_eq!(scheduler.session().await.dataset_id, "dataset");
}

#[tokio::test]
async fn test_disabled_notifications_drop_cycle_alerts() {
    let scheduler = scheduler_with(Arc::new(healthy_source(40.0)), session());

    let CycleOutcome::Committed(report) = scheduler.run_cycle().await else {
        panic!("expected a committed cycle");
    };
    assert_eq!(report.alerts.len(), 1);

    scheduler.set_notifications_enabled(false).await;
    let CycleOutcome::Committed(report) = scheduler.run_cycle().await else {
        panic!("expected a committed cycle");
    };
    assert!(report.alerts.is_empty());
}

#[tokio::test]
async fn test_loop_polls_on_start_and_on_trigger() {
    let source = Arc::new(healthy_source(22.0));
    let scheduler = scheduler_with(Arc::clone(&source), session());
    let mut updates = scheduler.subscribe();

    let handle = scheduler.start();

    let first = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.sequence, 1);

    scheduler.trigger();
    let second = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.sequence, 2);

    scheduler.stop();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_triggers_during_a_cycle_coalesce() {
    let now = Utc::now();
    let source = Arc::new(FakeSource::new(
        Reply::Slow(
            Duration::from_millis(200),
            payload(vec![telemetry_row(ts(now), 22.0, 50.0, None)]),
        ),
        Reply::Table(payload(vec![])),
    ));
    let scheduler = scheduler_with(Arc::clone(&source), session());
    let mut updates = scheduler.subscribe();
    let handle = scheduler.start();

    // The first cycle starts immediately; pile up triggers while it runs
    tokio::time::sleep(Duration::from_millis(50)).await;
    for _ in 0..5 {
        scheduler.trigger();
    }

    tokio::time::sleep(Duration::from_millis(800)).await;
    scheduler.stop();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();

    let mut sequences = Vec::new();
    while let Ok(update) = updates.try_recv() {
        sequences.push(update.sequence);
    }
    assert_eq!(sequences, vec![1, 2]);
}

#[tokio::test]
async fn test_scheduler_over_http() {
    let server = MockSheetServer::start().await;
    let now = Utc::now();
    server
        .mount_table(
            "telemetry_logs",
            &payload(vec![telemetry_row(ts(now), 26.4, 48.0, Some(30.0))]),
        )
        .await;
    server
        .mount_table(
            "access_logs",
            &payload(vec![access_row(ts(now), "u7", "DENIED", "unknown card")]),
        )
        .await;

    let client = Arc::new(server.client(Duration::from_secs(5)));
    let mut session = session();
    session.dataset_id = common::gviz_mock::DATASET_ID.to_string();
    let scheduler = PollScheduler::new(
        client,
        Pipeline::default(),
        SchedulerConfig {
            interval: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(5),
        },
        session,
    );

    let CycleOutcome::Committed(report) = scheduler.run_cycle().await else {
        panic!("expected a committed cycle");
    };
    assert_eq!(report.summary.temperature_label(), "26.4");
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].kind, AlertKind::AccessDenied);
    assert!(report.alerts[0].message.contains("u7"));
}
