use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use packtally::{
    audio::ToneEngine,
    db::Database,
    intake::{IntakeController, ScanFeedback, ScanOutcome},
    settings::SettingsStore,
};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    db: Database,
    intake: IntakeController,
}

fn harness() -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let db = Database::new(dir.path().join("tally.sqlite3")).expect("open database");
    let settings =
        Arc::new(SettingsStore::new(dir.path().join("settings.json")).expect("settings"));
    let intake = IntakeController::new(db.clone(), settings, ToneEngine::muted());
    Harness {
        _dir: dir,
        db,
        intake,
    }
}

fn key(n: u32) -> String {
    format!("{n:044}")
}

#[tokio::test]
async fn wrong_length_input_never_reaches_storage() {
    let h = harness();

    let forty_three = "9".repeat(43);
    let forty_five = "9".repeat(45);
    for raw in ["123", forty_three.as_str(), forty_five.as_str()] {
        let outcome = h.intake.submit_scan(raw).await.expect("submit");
        assert_eq!(outcome, ScanOutcome::Invalid);
    }

    let snapshot = h.intake.snapshot().await;
    assert_eq!(snapshot.count, 0);
    assert!(snapshot.records.is_empty());
    assert_eq!(snapshot.feedback, Some(ScanFeedback::Invalid));

    let stored = h
        .db
        .count_since(DateTime::UNIX_EPOCH)
        .await
        .expect("count");
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn empty_input_is_a_noop() {
    let h = harness();

    let outcome = h.intake.submit_scan("   ").await.expect("submit");
    assert_eq!(outcome, ScanOutcome::Ignored);

    let snapshot = h.intake.snapshot().await;
    assert_eq!(snapshot.feedback, None);
    assert_eq!(snapshot.count, 0);
}

#[tokio::test]
async fn fresh_keys_count_up_newest_first() {
    let h = harness();

    for n in 1..=3 {
        let outcome = h.intake.submit_scan(&key(n)).await.expect("submit");
        assert_eq!(outcome, ScanOutcome::Counted);
    }

    let snapshot = h.intake.snapshot().await;
    assert_eq!(snapshot.count, 3);
    assert_eq!(snapshot.records.len(), 3);
    assert_eq!(snapshot.records[0].nfe_key, key(3));
    assert_eq!(snapshot.records[2].nfe_key, key(1));
    assert!(!snapshot.busy);
}

#[tokio::test]
async fn duplicate_scan_rolls_back_the_optimistic_count() {
    let h = harness();

    assert_eq!(
        h.intake.submit_scan(&key(7)).await.expect("submit"),
        ScanOutcome::Counted
    );
    assert_eq!(
        h.intake.submit_scan(&key(7)).await.expect("submit"),
        ScanOutcome::Duplicate
    );

    let snapshot = h.intake.snapshot().await;
    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.feedback, Some(ScanFeedback::Duplicate));
}

#[tokio::test]
async fn finish_day_resets_and_is_idempotent() {
    let h = harness();

    for n in 1..=3 {
        h.intake.submit_scan(&key(n)).await.expect("submit");
    }

    let before = Utc::now();
    h.intake.finish_day().await.expect("finish");
    let snapshot = h.intake.snapshot().await;
    assert_eq!(snapshot.count, 0);
    assert!(snapshot.records.is_empty());
    assert!(snapshot.session_start >= before);

    h.intake.finish_day().await.expect("finish again");
    let snapshot = h.intake.snapshot().await;
    assert_eq!(snapshot.count, 0);
    assert!(snapshot.records.is_empty());

    assert_eq!(
        h.intake.submit_scan(&key(4)).await.expect("submit"),
        ScanOutcome::Counted
    );
    assert_eq!(h.intake.snapshot().await.count, 1);
}

#[tokio::test]
async fn removing_an_unknown_record_changes_nothing() {
    let h = harness();

    h.intake.submit_scan(&key(8)).await.expect("submit");
    h.intake
        .remove_record("does-not-exist")
        .await
        .expect("remove is a no-op");

    let snapshot = h.intake.snapshot().await;
    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.records.len(), 1);
}

#[tokio::test]
async fn removing_a_record_updates_count_with_a_floor() {
    let h = harness();

    h.intake.submit_scan(&key(9)).await.expect("submit");
    let id = h.intake.snapshot().await.records[0].id.clone();

    h.intake.remove_record(&id).await.expect("remove");
    assert_eq!(h.intake.snapshot().await.count, 0);

    // A second remove finds nothing and must not go negative.
    h.intake.remove_record(&id).await.expect("second remove");
    assert_eq!(h.intake.snapshot().await.count, 0);
}

#[tokio::test]
async fn feedback_clears_after_the_two_second_window() {
    let h = harness();

    h.intake.submit_scan("123").await.expect("submit");
    assert_eq!(
        h.intake.snapshot().await.feedback,
        Some(ScanFeedback::Invalid)
    );

    tokio::time::sleep(Duration::from_millis(2300)).await;
    assert_eq!(h.intake.snapshot().await.feedback, None);
}

#[tokio::test]
async fn a_new_scan_replaces_the_pending_feedback_clear() {
    let h = harness();

    h.intake.submit_scan("123").await.expect("submit");
    tokio::time::sleep(Duration::from_millis(1500)).await;

    h.intake.submit_scan(&key(5)).await.expect("submit");

    // The first scan's timer would fire around t=2s; it was replaced, so the
    // second scan's feedback survives past that point.
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(
        h.intake.snapshot().await.feedback,
        Some(ScanFeedback::Success)
    );

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(h.intake.snapshot().await.feedback, None);
}
