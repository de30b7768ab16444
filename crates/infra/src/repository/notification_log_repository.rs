//! # NotificationLogRepository
//!
//! 通知ログの永続化を担当するリポジトリ。
//! 送信成功・失敗のどちらも記録する。

use async_trait::async_trait;
use busify_domain::notification::{NotificationKind, NotificationLogId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::InfraError;

/// 送信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationLogStatus {
    Sent,
    Failed,
}

/// 通知ログ（リポジトリ INSERT 用データ型）
#[derive(Debug, Clone)]
pub struct NotificationLog {
    pub id: NotificationLogId,
    pub kind: NotificationKind,
    pub recipient_email: String,
    pub subject: String,
    pub status: NotificationLogStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// 通知ログリポジトリトレイト
#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    /// 通知ログを挿入する
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の NotificationLogRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationLogRepository {
    pool: PgPool,
}

impl PostgresNotificationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepository for PostgresNotificationLogRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(kind = %log.kind))]
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        let kind: &str = log.kind.into();
        let status: &str = log.status.into();
        sqlx::query(
            r#"
            INSERT INTO notification_logs (
                id, kind, recipient_email, subject, status, error_message, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(kind)
        .bind(&log.recipient_email)
        .bind(&log.subject)
        .bind(status)
        .bind(log.error_message.as_deref())
        .bind(log.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
