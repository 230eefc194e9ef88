use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    error::{GatewayError, GatewayResult},
    helpers::{parse_date, parse_datetime, to_u64},
    models::ScanRecord,
};

fn row_to_scan(row: &Row) -> GatewayResult<ScanRecord> {
    let created_at: String = row.get("created_at")?;
    let date_only: String = row.get("date_only")?;

    Ok(ScanRecord {
        id: row.get("id")?,
        nfe_key: row.get("nfe_key")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        date_only: parse_date(&date_only, "date_only")?,
    })
}

impl Database {
    /// Stores one scanned key, assigning id and timestamps. A second insert of
    /// the same key fails with `GatewayError::Conflict`.
    pub async fn insert_scan(&self, key: &str) -> GatewayResult<ScanRecord> {
        let key = key.to_string();
        self.execute(move |conn| {
            let now = Utc::now();
            let record = ScanRecord {
                id: Uuid::new_v4().to_string(),
                nfe_key: key,
                created_at: now,
                date_only: now.date_naive(),
            };

            conn.execute(
                "INSERT INTO package_counts (id, nfe_key, created_at, date_only)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    record.nfe_key,
                    record.created_at.to_rfc3339(),
                    record.date_only.to_string(),
                ],
            )?;

            Ok(record)
        })
        .await
    }

    pub async fn delete_scan(&self, id: &str) -> GatewayResult<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            let affected = conn.execute("DELETE FROM package_counts WHERE id = ?1", params![id])?;
            if affected == 0 {
                return Err(GatewayError::NotFound);
            }
            Ok(())
        })
        .await
    }

    /// Bulk delete for one calendar date. Returns the number of rows removed;
    /// a date with no records deletes nothing and succeeds.
    pub async fn delete_scans_for_date(&self, date: NaiveDate) -> GatewayResult<usize> {
        self.execute(move |conn| {
            let affected = conn.execute(
                "DELETE FROM package_counts WHERE date_only = ?1",
                params![date.to_string()],
            )?;
            Ok(affected)
        })
        .await
    }

    pub async fn count_since(&self, since: DateTime<Utc>) -> GatewayResult<u64> {
        self.execute(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM package_counts WHERE created_at >= ?1",
                params![since.to_rfc3339()],
                |row| row.get(0),
            )?;
            to_u64(total, "count")
        })
        .await
    }

    pub async fn scans_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> GatewayResult<Vec<ScanRecord>> {
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, nfe_key, created_at, date_only
                 FROM package_counts
                 WHERE created_at >= ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![since.to_rfc3339(), limit])?;
            let mut scans = Vec::new();
            while let Some(row) = rows.next()? {
                scans.push(row_to_scan(row)?);
            }

            Ok(scans)
        })
        .await
    }

    pub async fn scans_for_date(&self, date: NaiveDate) -> GatewayResult<Vec<ScanRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, nfe_key, created_at, date_only
                 FROM package_counts
                 WHERE date_only = ?1
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query(params![date.to_string()])?;
            let mut scans = Vec::new();
            while let Some(row) = rows.next()? {
                scans.push(row_to_scan(row)?);
            }

            Ok(scans)
        })
        .await
    }

    pub async fn count_for_date(&self, date: NaiveDate) -> GatewayResult<u64> {
        self.execute(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM package_counts WHERE date_only = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )?;
            to_u64(total, "count")
        })
        .await
    }
}
