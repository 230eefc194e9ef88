use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::ScanRecord;

/// Most recent records kept visible in the counter view.
pub const RECORDS_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanFeedback {
    Success,
    Error,
    Duplicate,
    Invalid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeState {
    pub count: u64,
    /// Newest first, capped at `RECORDS_LIMIT`. Mirrors storage but may
    /// transiently diverge while an optimistic insert is in flight.
    pub records: Vec<ScanRecord>,
    pub feedback: Option<ScanFeedback>,
    pub busy: bool,
    pub session_start: DateTime<Utc>,
}

impl IntakeState {
    pub fn new(session_start: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            records: Vec::new(),
            feedback: None,
            busy: false,
            session_start,
        }
    }

    /// Optimistic prepend: the pending record becomes visible before the
    /// insert confirms.
    pub fn apply_pending(&mut self, record: ScanRecord) {
        self.count += 1;
        self.records.insert(0, record);
        self.records.truncate(RECORDS_LIMIT);
    }

    /// Rolls back an optimistic prepend after a failed insert.
    pub fn revert_pending(&mut self, temp_id: &str) {
        self.records.retain(|r| r.id != temp_id);
        self.count = self.count.saturating_sub(1);
    }

    /// Swaps the pending record for the stored one, keeping its position.
    pub fn confirm_pending(&mut self, temp_id: &str, confirmed: ScanRecord) {
        if let Some(slot) = self.records.iter_mut().find(|r| r.id == temp_id) {
            *slot = confirmed;
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.records.retain(|r| r.id != id);
        self.count = self.count.saturating_sub(1);
    }

    pub fn reset(&mut self, session_start: DateTime<Utc>) {
        self.count = 0;
        self.records.clear();
        self.session_start = session_start;
    }

    /// Authoritative replacement from a fresh storage read.
    pub fn replace(&mut self, count: u64, records: Vec<ScanRecord>) {
        self.count = count;
        self.records = records;
    }
}
