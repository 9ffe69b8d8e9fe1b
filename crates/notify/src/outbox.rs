//! JSONL outbox notifier for hosts without a native notification centre.
//!
//! Every operation is appended to the outbox file; the outstanding set is
//! derived by replaying it.  Immediate notifications are also logged so they
//! surface in the terminal.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::Notifier;
use crate::types::{
    ActionCategory, NotificationRequest, PermissionStatus, ScheduledNotification, Trigger,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OutboxOp {
    Schedule { notification: ScheduledNotification },
    Cancel { id: String },
    CancelAll,
    Category { category: ActionCategory },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub recorded_at: DateTime<Utc>,
    pub op: OutboxOp,
}

#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, op: OutboxOp) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let record = OutboxRecord {
            recorded_at: Utc::now(),
            op,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let line = serde_json::to_string(&record)?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<OutboxRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = OpenOptions::new().read(true).open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OutboxRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    line = line_idx + 1,
                    error = %err,
                    path = %self.path.display(),
                    "corrupt outbox record, skipping line"
                ),
            }
        }
        Ok(records)
    }

    /// Rewrite the outbox so it holds only what is still outstanding plus the
    /// latest registration of each action category.  Returns the number of
    /// records kept.
    pub async fn compact(&self) -> Result<usize> {
        let records = self.load()?;
        let mut categories: BTreeMap<String, OutboxRecord> = BTreeMap::new();
        for record in &records {
            if let OutboxOp::Category { category } = &record.op {
                categories.insert(category.id.clone(), record.clone());
            }
        }
        let mut kept: Vec<OutboxRecord> = categories.into_values().collect();
        kept.extend(Self::replay(&records).into_iter().map(|notification| OutboxRecord {
            recorded_at: notification.scheduled_at,
            op: OutboxOp::Schedule { notification },
        }));

        let tmp_path = {
            let filename = self
                .path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "notifications.jsonl".to_string());
            self.path.with_file_name(format!("{filename}.tmp"))
        };

        let write_result: Result<()> = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .await?;
            for record in &kept {
                let line = serde_json::to_string(record)?;
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;

        if let Err(err) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        tokio::fs::rename(&tmp_path, &self.path).await?;
        info!(
            before = records.len(),
            after = kept.len(),
            "outbox compacted"
        );
        Ok(kept.len())
    }

    fn replay(records: &[OutboxRecord]) -> Vec<ScheduledNotification> {
        let mut outstanding: BTreeMap<String, ScheduledNotification> = BTreeMap::new();
        for record in records {
            match &record.op {
                OutboxOp::Schedule { notification } => {
                    if notification.request.is_transient() {
                        outstanding.remove(&notification.id);
                    } else {
                        outstanding.insert(notification.id.clone(), notification.clone());
                    }
                }
                OutboxOp::Cancel { id } => {
                    outstanding.remove(id);
                }
                OutboxOp::CancelAll => outstanding.clear(),
                OutboxOp::Category { .. } => {}
            }
        }
        outstanding.into_values().collect()
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn schedule(&self, request: NotificationRequest) -> Result<String> {
        let id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if matches!(request.trigger, Trigger::Immediate) {
            info!(
                id = %id,
                title = %request.content.title,
                body = %request.content.body,
                "notification delivered"
            );
        }
        let notification = ScheduledNotification {
            id: id.clone(),
            request,
            scheduled_at: Utc::now(),
        };
        self.append(OutboxOp::Schedule { notification }).await?;
        Ok(id)
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.append(OutboxOp::Cancel { id: id.to_string() }).await
    }

    async fn cancel_all(&self) -> Result<()> {
        self.append(OutboxOp::CancelAll).await
    }

    async fn set_category(&self, category: ActionCategory) -> Result<()> {
        self.append(OutboxOp::Category { category }).await
    }

    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn outstanding(&self) -> Result<Vec<ScheduledNotification>> {
        Ok(Self::replay(&self.load()?))
    }
}
