use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One counted package: a single 44-digit NFe access key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    pub nfe_key: String,
    pub created_at: DateTime<Utc>,
    pub date_only: NaiveDate,
}

impl ScanRecord {
    /// Placeholder shown while the insert is in flight. The id is a fresh
    /// UUID so the row can be addressed before storage confirms it; on
    /// success the stored record replaces this one in place.
    pub fn pending(nfe_key: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            nfe_key: nfe_key.to_string(),
            created_at: now,
            date_only: now.date_naive(),
        }
    }
}
