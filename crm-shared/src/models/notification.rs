/// In-app notifications
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     message TEXT NOT NULL,
///     kind notification_kind NOT NULL DEFAULT 'info',
///     link TEXT,
///     read BOOLEAN NOT NULL DEFAULT FALSE,
///     read_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::Owned;

const NOTIFICATION_COLUMNS: &str =
    "id, owner_id, title, message, kind, link, read, read_at, created_at, updated_at";

/// Page size for [`Notification::list_by_owner`]
pub const LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Notification {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewNotification {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Message is required"))]
    pub message: String,

    #[serde(default)]
    pub kind: NotificationKind,

    pub link: Option<String>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            link: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    pub read: Option<bool>,
}

impl Notification {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        data: NewNotification,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (id, owner_id, title, message, kind, link) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(data.title)
            .bind(data.message)
            .bind(data.kind)
            .bind(data.link)
            .fetch_one(pool)
            .await
    }

    /// Creates a side-effect notification; a failure is logged and swallowed
    pub async fn notify_quietly(pool: &PgPool, owner_id: Uuid, data: NewNotification) {
        if let Err(e) = Self::create(pool, owner_id, data).await {
            tracing::warn!(owner_id = %owner_id, error = %e, "Failed to create notification");
        }
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM notifications WHERE id = $1", NOTIFICATION_COLUMNS);

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first, at most [`LIST_LIMIT`]
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &NotificationFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM notifications \
             WHERE owner_id = $1 AND ($2::boolean IS NULL OR read = $2) \
             ORDER BY created_at DESC LIMIT $3",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(owner_id)
            .bind(filter.read)
            .bind(LIST_LIMIT)
            .fetch_all(pool)
            .await
    }

    pub async fn count_unread(pool: &PgPool, owner_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE owner_id = $1 AND read = FALSE")
            .bind(owner_id)
            .fetch_one(pool)
            .await
    }

    /// Marks every unread notification read; returns how many changed
    pub async fn mark_all_read(pool: &PgPool, owner_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE, read_at = NOW(), updated_at = NOW() \
             WHERE owner_id = $1 AND read = FALSE",
        )
        .bind(owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Sets the read flag; `read_at` follows it
    pub async fn set_read(pool: &PgPool, id: Uuid, read: bool) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET read = $2, \
                 read_at = CASE WHEN $2 THEN COALESCE(read_at, NOW()) ELSE NULL END, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(read)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
