use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    /// Start of the current counting batch; survives restarts so a reopened
    /// app keeps showing the same batch.
    session_start: Option<DateTime<Utc>>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Session watermark. Falls back to the start of the current UTC day when
    /// nothing was persisted yet.
    pub fn session_start(&self) -> DateTime<Utc> {
        self.data
            .read()
            .unwrap()
            .session_start
            .unwrap_or_else(start_of_today)
    }

    pub fn update_session_start(&self, start: DateTime<Utc>) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.session_start = Some(start);
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

pub fn start_of_today() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}
