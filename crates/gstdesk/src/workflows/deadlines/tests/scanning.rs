use std::sync::Arc;

use chrono::FixedOffset;

use super::common::*;
use crate::workflows::deadlines::domain::{
    DueDate, InvoiceStatus, NoticeStatus, NotificationSeverity, ObligationKind, ReturnStatus,
};
use crate::workflows::deadlines::memory::InMemoryEntityStore;
use crate::workflows::deadlines::repository::StoreError;
use crate::workflows::deadlines::scanner::{DeadlineScanner, DeadlineSeverity};
use crate::workflows::deadlines::{ComplianceEngine, EngineConfig, EngineError, Obligation};

fn store_with_client() -> Arc<InMemoryEntityStore> {
    let store = Arc::new(InMemoryEntityStore::new());
    store
        .insert_client(client("c-1", "Sharma Textiles"))
        .expect("insert client");
    store
}

#[test]
fn filed_return_due_yesterday_raises_nothing() {
    let store = store_with_client();
    store
        .insert_return(gst_return("r-1", "c-1", "10-2024", "2024-11-19", ReturnStatus::Filed))
        .expect("insert return");

    let summary = engine_for(store.clone())
        .scan_and_notify(now())
        .expect("scan succeeds");

    assert_eq!(summary.created, 0);
    assert!(store.notifications().expect("read").is_empty());
}

#[test]
fn return_due_today_alerts_once_per_day() {
    let store = store_with_client();
    store
        .insert_return(gst_return("r-1", "c-1", "10-2024", "2024-11-20", ReturnStatus::Draft))
        .expect("insert return");
    let engine = engine_for(store.clone());

    let first = engine.scan_and_notify(now()).expect("first scan");
    let second = engine
        .scan_and_notify(at("2024-11-20T17:45:00Z"))
        .expect("second scan");

    assert_eq!(first.created, 1);
    assert_eq!(second.created, 0);
    assert_eq!(second.suppressed, 1);

    let notifications = store.notifications().expect("read");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, NotificationSeverity::Error);
    assert_eq!(
        notifications[0].title,
        "Return filing due today [GSTR-3B - 10-2024 / c-1]"
    );
}

#[test]
fn next_day_scan_alerts_again() {
    let store = store_with_client();
    store
        .insert_return(gst_return("r-1", "c-1", "10-2024", "2024-11-20", ReturnStatus::Draft))
        .expect("insert return");
    let engine = engine_for(store.clone());

    engine.scan_and_notify(now()).expect("first scan");
    let next_day = engine
        .scan_and_notify(at("2024-11-21T09:00:00Z"))
        .expect("next day scan");

    assert_eq!(next_day.created, 1);
    let notifications = store.notifications().expect("read");
    assert_eq!(notifications.len(), 2);
    assert!(notifications[1].title.starts_with("Return filing overdue"));
}

#[test]
fn overdue_return_end_to_end() {
    let store = store_with_client();
    let record = gst_return("r-1", "c-1", "10-2024", "2024-11-18", ReturnStatus::Draft);
    store.insert_return(record.clone()).expect("insert return");

    let scanner = DeadlineScanner::new(EngineConfig::default());
    let scanned = scanner
        .evaluate(&Obligation::Return(record), now())
        .expect("valid date")
        .expect("alertable");
    assert_eq!(scanned.days_until_due, -2);
    assert_eq!(scanned.severity, DeadlineSeverity::Critical);

    let summary = engine_for(store.clone())
        .scan_and_notify(now())
        .expect("scan succeeds");
    assert_eq!(summary.created, 1);

    let notifications = store.notifications().expect("read");
    assert_eq!(notifications.len(), 1);
    let alert = &notifications[0];
    assert_eq!(alert.severity, NotificationSeverity::Error);
    assert_eq!(alert.recipient.0, PRACTITIONER);
    assert!(alert.title.contains("GSTR-3B - 10-2024"));
    assert!(alert.message.contains("2 day(s) overdue"));
    assert_eq!(alert.created_at, now());
}

#[test]
fn practice_scan_covers_every_kind() {
    let store = practice_store();
    store
        .insert_invoice(invoice(
            "inv-1",
            "c-1",
            date(2024, 11, 1),
            "2024-11-22",
            15_000,
            InvoiceStatus::Sent,
        ))
        .expect("insert invoice");
    store
        .insert_invoice(invoice(
            "inv-2",
            "c-2",
            date(2024, 11, 1),
            "2024-11-25",
            9_000,
            InvoiceStatus::Sent,
        ))
        .expect("insert invoice");

    let summary = engine_for(store.clone())
        .scan_and_notify(now())
        .expect("scan succeeds");

    // r-2 and r-3 share a return period but belong to different clients.
    assert_eq!(summary.by_kind[&ObligationKind::ReturnFiling].created, 3);
    assert_eq!(summary.by_kind[&ObligationKind::NoticeReply].created, 1);
    assert_eq!(summary.by_kind[&ObligationKind::InvoicePayment].created, 1);
    assert_eq!(summary.by_kind[&ObligationKind::InvoicePayment].scanned, 1);
    assert_eq!(summary.created, 5);

    let notifications = store.notifications().expect("read");
    let invoice_alert = notifications
        .iter()
        .find(|item| item.title.contains("[Invoice INV-1 / c-1]"))
        .expect("invoice alert");
    assert_eq!(invoice_alert.severity, NotificationSeverity::Warning);
    assert!(invoice_alert.message.contains("Rs 15000.00"));
}

#[test]
fn info_alerts_only_when_enabled() {
    let store = store_with_client();
    store
        .insert_notice(notice("n-1", "c-1", "2024-12-10", NoticeStatus::InProgress))
        .expect("insert notice");

    let quiet = engine_for(store.clone())
        .scan_and_notify(now())
        .expect("quiet scan");
    assert_eq!(quiet.created, 0);

    let config = EngineConfig {
        include_info: true,
        ..EngineConfig::default()
    };
    let chatty = ComplianceEngine::new(store.clone(), config)
        .scan_and_notify(now())
        .expect("info scan");
    assert_eq!(chatty.created, 1);

    let notifications = store.notifications().expect("read");
    assert_eq!(notifications[0].severity, NotificationSeverity::Info);
    assert!(notifications[0].title.starts_with("Notice reply upcoming"));
}

#[test]
fn configured_offset_moves_the_day_boundary() {
    // 01:30 on 20 Nov in India, still 19 Nov in UTC.
    let late_evening = at("2024-11-19T20:00:00Z");
    let store = store_with_client();
    store
        .insert_notice(notice("n-1", "c-1", "2024-11-20", NoticeStatus::Pending))
        .expect("insert notice");

    let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid offset");
    let engine = ComplianceEngine::new(
        store.clone(),
        EngineConfig {
            timezone: ist,
            ..EngineConfig::default()
        },
    );
    engine.scan_and_notify(late_evening).expect("scan succeeds");

    let notifications = store.notifications().expect("read");
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].title.starts_with("Notice reply due today"));

    let utc_store = store_with_client();
    utc_store
        .insert_notice(notice("n-1", "c-1", "2024-11-20", NoticeStatus::Pending))
        .expect("insert notice");
    engine_for(utc_store.clone())
        .scan_and_notify(late_evening)
        .expect("scan succeeds");
    let notifications = utc_store.notifications().expect("read");
    assert!(notifications[0].title.starts_with("Notice reply due soon"));
}

#[test]
fn bad_records_are_skipped_without_aborting() {
    let store = store_with_client();
    let mut broken = gst_return("r-1", "c-1", "09-2024", "2024-10-20", ReturnStatus::Draft);
    broken.due_date = DueDate("twentieth".to_string());
    store.insert_return(broken).expect("insert return");
    store
        .insert_return(gst_return("r-2", "ghost", "10-2024", "2024-11-18", ReturnStatus::Draft))
        .expect("insert return");
    store
        .insert_return(gst_return("r-3", "c-1", "10-2024", "2024-11-18", ReturnStatus::Draft))
        .expect("insert return");

    let summary = engine_for(store.clone())
        .scan_and_notify(now())
        .expect("scan succeeds");

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.by_kind[&ObligationKind::ReturnFiling].scanned, 3);
    assert_eq!(store.notifications().expect("read").len(), 1);
}

#[test]
fn rejected_write_is_counted_and_batch_continues() {
    let inner = InMemoryEntityStore::new();
    inner
        .insert_client(client("c-1", "Sharma Textiles"))
        .expect("insert client");
    inner
        .insert_return(gst_return("r-1", "c-1", "09-2024", "2024-10-20", ReturnStatus::Draft))
        .expect("insert return");
    inner
        .insert_return(gst_return("r-2", "c-1", "10-2024", "2024-11-18", ReturnStatus::Draft))
        .expect("insert return");

    let store = Arc::new(FaultyWrites {
        inner: inner.clone(),
        poisoned_marker: "09-2024".to_string(),
        outage: false,
    });

    let summary = engine_for(store).scan_and_notify(now()).expect("scan succeeds");

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.created, 1);
    let notifications = inner.notifications().expect("read");
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].title.contains("10-2024"));
}

#[test]
fn outage_during_write_aborts_the_scan() {
    let inner = InMemoryEntityStore::new();
    inner
        .insert_client(client("c-1", "Sharma Textiles"))
        .expect("insert client");
    inner
        .insert_return(gst_return("r-1", "c-1", "10-2024", "2024-11-18", ReturnStatus::Draft))
        .expect("insert return");

    let store = Arc::new(FaultyWrites {
        inner,
        poisoned_marker: "10-2024".to_string(),
        outage: true,
    });

    match engine_for(store).scan_and_notify(now()) {
        Err(EngineError::Store(StoreError::Unavailable(_))) => {}
        other => panic!("expected unavailable store, got {other:?}"),
    }
}

#[test]
fn unavailable_store_fails_the_scan() {
    let result = engine_for(Arc::new(UnavailableStore)).scan_and_notify(now());
    assert!(matches!(
        result,
        Err(EngineError::Store(StoreError::Unavailable(_)))
    ));
}

#[test]
fn filing_confirmation_is_a_success_notification() {
    let store = store_with_client();
    let mut record = gst_return("r-1", "c-1", "10-2024", "2024-11-20", ReturnStatus::Draft);
    store.insert_return(record.clone()).expect("insert return");

    record.status = ReturnStatus::Filed;
    record.filed_at = Some(now());
    store.update_return(record.clone()).expect("update return");

    let engine = engine_for(store.clone());
    let notification = engine
        .notify_return_filed(&record, now())
        .expect("confirmation written");
    assert_eq!(notification.severity, NotificationSeverity::Success);
    assert_eq!(
        notification.title,
        "Return filing filed [GSTR-3B - 10-2024 / c-1]"
    );

    // Filed returns are no longer outstanding, so the scan stays quiet.
    let summary = engine.scan_and_notify(now()).expect("scan succeeds");
    assert_eq!(summary.created, 0);
    assert_eq!(summary.suppressed, 0);

    let orphan = gst_return("r-9", "ghost", "10-2024", "2024-11-20", ReturnStatus::Filed);
    assert!(matches!(
        engine.notify_return_filed(&orphan, now()),
        Err(EngineError::UnknownClient(_))
    ));
}

#[test]
fn early_filing_confirmation_does_not_hide_the_same_day_alert() {
    let store = store_with_client();
    let record = gst_return("r-1", "c-1", "10-2024", "2024-11-19", ReturnStatus::Pending);
    store.insert_return(record.clone()).expect("insert return");
    let engine = engine_for(store.clone());

    // Confirmation recorded before the portal status catches up.
    engine
        .notify_return_filed(&record, at("2024-11-20T08:00:00Z"))
        .expect("confirmation written");
    let summary = engine.scan_and_notify(now()).expect("scan succeeds");

    assert_eq!(summary.created, 1);
    assert_eq!(summary.suppressed, 0);
    let titles: Vec<String> = store
        .notifications()
        .expect("read")
        .into_iter()
        .map(|notification| notification.title)
        .collect();
    assert_eq!(
        titles,
        vec![
            "Return filing filed [GSTR-3B - 10-2024 / c-1]".to_string(),
            "Return filing overdue [GSTR-3B - 10-2024 / c-1]".to_string(),
        ]
    );

    let rerun = engine
        .scan_and_notify(at("2024-11-20T15:00:00Z"))
        .expect("rerun succeeds");
    assert_eq!(rerun.created, 0);
    assert_eq!(rerun.suppressed, 1);
}
