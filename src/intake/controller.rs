use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast::error::RecvError, Mutex},
    task::JoinHandle,
    time,
};

use crate::{
    audio::ToneEngine,
    db::{Database, GatewayError, ScanRecord},
    settings::SettingsStore,
};

use super::state::{IntakeState, ScanFeedback, RECORDS_LIMIT};

const FEEDBACK_CLEAR_AFTER: Duration = Duration::from_secs(2);

/// What a single submission amounted to, for the shell's status line.
/// Unexpected failures are reported through the error path instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanOutcome {
    Ignored,
    Counted,
    Duplicate,
    Invalid,
    Failed,
}

#[derive(Clone)]
pub struct IntakeController {
    state: Arc<Mutex<IntakeState>>,
    db: Database,
    settings: Arc<SettingsStore>,
    tones: ToneEngine,
    feedback_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl IntakeController {
    pub fn new(db: Database, settings: Arc<SettingsStore>, tones: ToneEngine) -> Self {
        let session_start = settings.session_start();
        Self {
            state: Arc::new(Mutex::new(IntakeState::new(session_start))),
            db,
            settings,
            tones,
            feedback_timer: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn snapshot(&self) -> IntakeState {
        self.state.lock().await.clone()
    }

    /// One scanned or typed key. Anything that is not exactly 44 digits is
    /// rejected before storage is touched; a valid key is counted
    /// optimistically and rolled back if the insert fails.
    pub async fn submit_scan(&self, raw: &str) -> Result<ScanOutcome> {
        let key = raw.trim();
        if key.is_empty() {
            return Ok(ScanOutcome::Ignored);
        }

        if key.len() != 44 || !key.bytes().all(|b| b.is_ascii_digit()) {
            self.state.lock().await.feedback = Some(ScanFeedback::Invalid);
            self.tones.error();
            self.schedule_feedback_clear().await;
            return Ok(ScanOutcome::Invalid);
        }

        let pending = ScanRecord::pending(key, Utc::now());
        let temp_id = pending.id.clone();

        {
            let mut state = self.state.lock().await;
            state.busy = true;
            state.feedback = Some(ScanFeedback::Success);
            state.apply_pending(pending);
        }
        self.tones.success();

        let outcome = match self.db.insert_scan(key).await {
            Ok(confirmed) => {
                self.state.lock().await.confirm_pending(&temp_id, confirmed);
                // Authoritative recount; reconciles drift from concurrent
                // inserts by other operators.
                if let Err(err) = self.reload(None).await {
                    warn!("Post-scan reconciliation failed: {err}");
                }
                Ok(ScanOutcome::Counted)
            }
            Err(GatewayError::Conflict) => {
                {
                    let mut state = self.state.lock().await;
                    state.feedback = Some(ScanFeedback::Duplicate);
                    state.revert_pending(&temp_id);
                }
                self.tones.error();
                Ok(ScanOutcome::Duplicate)
            }
            Err(err @ GatewayError::Storage(_)) => {
                error!("Failed to store scan: {err}");
                {
                    let mut state = self.state.lock().await;
                    state.feedback = Some(ScanFeedback::Error);
                    state.revert_pending(&temp_id);
                }
                self.tones.error();
                Ok(ScanOutcome::Failed)
            }
            Err(err) => {
                // Unexpected failure: roll back, then let the shell interrupt
                // the operator with a blocking notice.
                {
                    let mut state = self.state.lock().await;
                    state.feedback = Some(ScanFeedback::Error);
                    state.revert_pending(&temp_id);
                }
                self.tones.error();
                Err(err.into())
            }
        };

        self.state.lock().await.busy = false;
        self.schedule_feedback_clear().await;

        outcome
    }

    /// Deletes one record from the current batch. A record that is already
    /// gone from storage leaves local state untouched.
    pub async fn remove_record(&self, id: &str) -> Result<()> {
        match self.db.delete_scan(id).await {
            Ok(()) => {
                self.state.lock().await.remove(id);
                self.tones.success();
                Ok(())
            }
            Err(GatewayError::NotFound) => {
                // Row vanished under us; list and storage reconcile on the
                // next reload.
                self.tones.error();
                Ok(())
            }
            Err(err) => {
                self.tones.error();
                Err(err.into())
            }
        }
    }

    /// Closes the current batch: the watermark moves to now (persisted first),
    /// the visible count and list are zeroed immediately, and a reload scoped
    /// to the new watermark reconciles with storage.
    pub async fn finish_day(&self) -> Result<()> {
        let now = Utc::now();
        self.settings.update_session_start(now)?;
        self.state.lock().await.reset(now);
        self.tones.success();
        info!("Batch finished; new session starts at {now}");
        self.reload(Some(now)).await
    }

    /// Authoritative re-read scoped to the watermark. Without an override the
    /// watermark is taken from the state cell at call time, so change-feed
    /// deliveries always see the value current at delivery, not the one in
    /// effect when the subscription was established.
    pub async fn reload(&self, watermark_override: Option<DateTime<Utc>>) -> Result<()> {
        let since = match watermark_override {
            Some(ts) => ts,
            None => self.state.lock().await.session_start,
        };

        let count = self.db.count_since(since).await?;
        let records = self.db.scans_since(since, RECORDS_LIMIT).await?;
        self.state.lock().await.replace(count, records);
        Ok(())
    }

    /// Reconciling reload on every external change to the records table.
    /// Idempotent regardless of delivery order or duplicates, so lagged
    /// receivers just reload again.
    pub fn spawn_change_listener(&self) -> JoinHandle<()> {
        let controller = self.clone();
        let mut changes = controller.db.subscribe_changes();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) => {
                        if event.table != "package_counts" {
                            continue;
                        }
                        if let Err(err) = controller.reload(None).await {
                            warn!("Change-feed reconciliation failed: {err}");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Change feed lagged by {skipped} events; reloading");
                        if let Err(err) = controller.reload(None).await {
                            warn!("Change-feed reconciliation failed: {err}");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// (Re)schedules the 2-second feedback reset. Replacing the previous
    /// timer keeps a fast second scan's feedback from being wiped by the
    /// first scan's stale timer.
    async fn schedule_feedback_clear(&self) {
        let mut timer = self.feedback_timer.lock().await;
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let state = self.state.clone();
        *timer = Some(tokio::spawn(async move {
            time::sleep(FEEDBACK_CLEAR_AFTER).await;
            state.lock().await.feedback = None;
        }));
    }
}
