use chrono::{DateTime, Duration, Utc};
use packtally::db::{ChangeKind, Database, GatewayError};
use tempfile::TempDir;

fn open_db() -> (TempDir, Database) {
    let dir = TempDir::new().expect("temp dir");
    let db = Database::new(dir.path().join("tally.sqlite3")).expect("open database");
    (dir, db)
}

fn key(n: u32) -> String {
    format!("{n:044}")
}

#[tokio::test]
async fn insert_assigns_id_timestamp_and_date() {
    let (_dir, db) = open_db();

    let record = db.insert_scan(&key(1)).await.expect("insert");
    assert_eq!(record.nfe_key, key(1));
    assert!(!record.id.is_empty());
    assert_eq!(record.date_only, record.created_at.date_naive());
}

#[tokio::test]
async fn duplicate_key_is_a_conflict() {
    let (_dir, db) = open_db();

    db.insert_scan(&key(2)).await.expect("first insert");
    let err = db
        .insert_scan(&key(2))
        .await
        .expect_err("second insert of the same key must fail");
    assert!(matches!(err, GatewayError::Conflict));

    let total = db.count_since(DateTime::UNIX_EPOCH).await.expect("count");
    assert_eq!(total, 1);
}

#[tokio::test]
async fn delete_of_unknown_id_is_not_found() {
    let (_dir, db) = open_db();

    let err = db
        .delete_scan("no-such-id")
        .await
        .expect_err("deleting a missing row must fail");
    assert!(matches!(err, GatewayError::NotFound));
}

#[tokio::test]
async fn count_and_list_respect_the_watermark() {
    let (_dir, db) = open_db();

    db.insert_scan(&key(10)).await.expect("insert");
    db.insert_scan(&key(11)).await.expect("insert");
    let mid = Utc::now();
    db.insert_scan(&key(12)).await.expect("insert");

    assert_eq!(db.count_since(DateTime::UNIX_EPOCH).await.expect("count"), 3);
    assert_eq!(db.count_since(mid).await.expect("count"), 1);

    let recent = db.scans_since(mid, 100).await.expect("list");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].nfe_key, key(12));

    let newest_first = db
        .scans_since(DateTime::UNIX_EPOCH, 100)
        .await
        .expect("list");
    assert_eq!(newest_first[0].nfe_key, key(12));
    assert_eq!(newest_first[2].nfe_key, key(10));

    let capped = db.scans_since(DateTime::UNIX_EPOCH, 2).await.expect("list");
    assert_eq!(capped.len(), 2);
}

#[tokio::test]
async fn date_scoped_queries_only_touch_their_date() {
    let (_dir, db) = open_db();

    db.insert_scan(&key(20)).await.expect("insert");
    db.insert_scan(&key(21)).await.expect("insert");

    let today = Utc::now().date_naive();
    let tomorrow = today + Duration::days(1);

    assert_eq!(db.count_for_date(today).await.expect("count"), 2);
    assert_eq!(db.count_for_date(tomorrow).await.expect("count"), 0);
    assert_eq!(
        db.delete_scans_for_date(tomorrow).await.expect("delete"),
        0
    );
    assert_eq!(db.count_for_date(today).await.expect("count"), 2);

    assert_eq!(db.delete_scans_for_date(today).await.expect("delete"), 2);
    assert_eq!(db.count_for_date(today).await.expect("count"), 0);
    assert!(db.scans_for_date(today).await.expect("list").is_empty());
}

#[tokio::test]
async fn change_feed_publishes_inserts_and_deletes() {
    let (_dir, db) = open_db();
    let mut changes = db.subscribe_changes();

    let record = db.insert_scan(&key(30)).await.expect("insert");
    let event = changes.recv().await.expect("insert event");
    assert_eq!(event.table, "package_counts");
    assert_eq!(event.kind, ChangeKind::Insert);

    db.delete_scan(&record.id).await.expect("delete");
    let event = changes.recv().await.expect("delete event");
    assert_eq!(event.kind, ChangeKind::Delete);
}
