use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use log::info;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    db::{Database, GatewayError, ScanRecord},
    report,
};

/// Date-scoped read/delete view over all historical records, independent of
/// the session watermark.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    pub selected_date: NaiveDate,
    pub records: Vec<ScanRecord>,
    pub total_count: u64,
    pub loading: bool,
}

#[derive(Clone)]
pub struct HistoryBrowser {
    state: Arc<Mutex<HistoryState>>,
    db: Database,
}

impl HistoryBrowser {
    pub fn new(db: Database) -> Self {
        Self {
            state: Arc::new(Mutex::new(HistoryState {
                selected_date: Utc::now().date_naive(),
                records: Vec::new(),
                total_count: 0,
                loading: false,
            })),
            db,
        }
    }

    pub async fn snapshot(&self) -> HistoryState {
        self.state.lock().await.clone()
    }

    pub async fn load_for_date(&self, date: NaiveDate) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.selected_date = date;
            state.loading = true;
        }

        let fetched = async {
            let records = self.db.scans_for_date(date).await?;
            let total = self.db.count_for_date(date).await?;
            Ok::<_, GatewayError>((records, total))
        }
        .await;

        let mut state = self.state.lock().await;
        state.loading = false;
        let (records, total) = fetched?;
        state.records = records;
        state.total_count = total;
        Ok(())
    }

    /// Deletes one historical record. On failure local state is left
    /// untouched; the caller surfaces the error.
    pub async fn delete_one(&self, id: &str) -> Result<()> {
        self.db.delete_scan(id).await?;

        let mut state = self.state.lock().await;
        state.records.retain(|r| r.id != id);
        state.total_count = state.total_count.saturating_sub(1);
        Ok(())
    }

    /// Deletes every record for one date. Returns how many rows were removed.
    pub async fn delete_all_for_date(&self, date: NaiveDate) -> Result<usize> {
        let deleted = self.db.delete_scans_for_date(date).await?;

        let mut state = self.state.lock().await;
        if state.selected_date == date {
            state.records.clear();
            state.total_count = 0;
        }
        info!("Deleted {deleted} records for {date}");
        Ok(deleted)
    }

    /// Writes the report for the loaded date; read-only with respect to both
    /// local state and storage.
    pub async fn export_report(&self, out_dir: &Path) -> Result<PathBuf> {
        let state = self.snapshot().await;
        report::write_report(&state.records, state.selected_date, out_dir)
    }
}
