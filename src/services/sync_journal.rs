use crate::entities::{prelude::*, *};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::fmt;
use tracing::{error, info};
use uuid::Uuid;

pub const RUN_RUNNING: &str = "running";
pub const RUN_COMPLETED: &str = "completed";
pub const RUN_FAILED: &str = "failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Full,
    Model,
    Activation,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            SyncKind::Full => "full",
            SyncKind::Model => "model",
            SyncKind::Activation => "activation",
        };
        f.write_str(kind)
    }
}

/// Records every sync/activation run in `sync_runs`.
///
/// Journal writes are best effort: a failure is logged and never masks the
/// outcome of the run itself.
#[derive(Clone)]
pub struct SyncJournal {
    db: DatabaseConnection,
}

impl SyncJournal {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a `running` entry and returns its id
    pub async fn start(&self, kind: SyncKind, scope: Option<&str>) -> Option<String> {
        info!(
            target: "sync_journal",
            kind = %kind,
            scope = ?scope,
            "Sync run started"
        );

        let id = Uuid::new_v4().to_string();
        let run = sync_runs::ActiveModel {
            id: Set(id.clone()),
            kind: Set(kind.to_string()),
            scope: Set(scope.map(str::to_string)),
            status: Set(RUN_RUNNING.to_string()),
            stats: Set(None),
            error: Set(None),
            started_at: Set(Utc::now()),
            finished_at: Set(None),
        };

        match run.insert(&self.db).await {
            Ok(_) => Some(id),
            Err(e) => {
                error!("Failed to persist sync run: {}", e);
                None
            }
        }
    }

    pub async fn complete<T: Serialize>(&self, run_id: Option<String>, stats: &T) {
        let stats = serde_json::to_value(stats).ok();
        self.finish(run_id, RUN_COMPLETED, stats, None).await;
    }

    pub async fn fail(&self, run_id: Option<String>, message: &str) {
        self.finish(run_id, RUN_FAILED, None, Some(message.to_string()))
            .await;
    }

    async fn finish(
        &self,
        run_id: Option<String>,
        status: &str,
        stats: Option<serde_json::Value>,
        message: Option<String>,
    ) {
        let Some(id) = run_id else {
            return;
        };

        let run = sync_runs::ActiveModel {
            id: Set(id),
            status: Set(status.to_string()),
            stats: Set(stats),
            error: Set(message),
            finished_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        if let Err(e) = run.update(&self.db).await {
            error!("Failed to close sync run: {}", e);
        }
    }

    /// Most recent runs first
    pub async fn recent(&self, limit: u64) -> Result<Vec<sync_runs::Model>, DbErr> {
        SyncRuns::find()
            .order_by_desc(sync_runs::Column::StartedAt)
            .limit(limit)
            .all(&self.db)
            .await
    }

    pub async fn last_completed(&self, kind: SyncKind) -> Result<Option<sync_runs::Model>, DbErr> {
        SyncRuns::find()
            .filter(sync_runs::Column::Kind.eq(kind.to_string()))
            .filter(sync_runs::Column::Status.eq(RUN_COMPLETED))
            .order_by_desc(sync_runs::Column::StartedAt)
            .one(&self.db)
            .await
    }
}
