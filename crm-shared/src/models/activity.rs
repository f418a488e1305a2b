/// Activity log
///
/// Append-only record of what a user did (created a customer, converted a
/// lead, exported data, ...). Rows are never updated.
///
/// Writes made as a side effect of another operation go through
/// [`Activity::record_quietly`], which logs failures instead of returning them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const ACTIVITY_COLUMNS: &str =
    "id, owner_id, kind, description, entity_id, entity_type, metadata, created_at";

/// Default and maximum page sizes for [`Activity::list_by_owner`]
pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;
pub const RECENT_LIMIT: i64 = 10;

/// Well-known activity kinds
pub mod kinds {
    pub const REGISTERED: &str = "registered";
    pub const CUSTOMER_CREATED: &str = "customer_created";
    pub const CUSTOMER_UPDATED: &str = "customer_updated";
    pub const CUSTOMER_DELETED: &str = "customer_deleted";
    pub const LEAD_CREATED: &str = "lead_created";
    pub const LEAD_STATUS_CHANGED: &str = "lead_status_changed";
    pub const LEAD_CONVERTED: &str = "lead_converted";
    pub const LEAD_DELETED: &str = "lead_deleted";
    pub const SALE_CREATED: &str = "sale_created";
    pub const SALE_STATUS_CHANGED: &str = "sale_status_changed";
    pub const SALE_DELETED: &str = "sale_deleted";
    pub const TASK_CREATED: &str = "task_created";
    pub const TASK_COMPLETED: &str = "task_completed";
    pub const TASK_DELETED: &str = "task_deleted";
    pub const PASSWORD_CHANGED: &str = "password_changed";
    pub const EXPORT: &str = "export";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: String,
    pub description: String,
    pub entity_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub metadata: Json<Value>,
    pub created_at: DateTime<Utc>,
}

/// Activity plus a human-friendly age, for the recent feed
#[derive(Debug, Clone, Serialize)]
pub struct RecentActivity {
    #[serde(flatten)]
    pub activity: Activity,
    pub relative_time: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewActivity {
    #[validate(length(min = 1, max = 100, message = "Kind is required"))]
    pub kind: String,

    #[validate(length(min = 1, max = 1000, message = "Description is required"))]
    pub description: String,

    pub entity_id: Option<Uuid>,
    pub entity_type: Option<String>,

    #[serde(default)]
    pub metadata: Option<Value>,
}

impl NewActivity {
    pub fn new(kind: &str, description: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            description: description.into(),
            entity_id: None,
            entity_type: None,
            metadata: None,
        }
    }

    pub fn entity(mut self, entity_type: &str, entity_id: Uuid) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub limit: Option<i64>,
    pub kind: Option<String>,
}

impl ActivityFilter {
    /// Requested limit clamped to `1..=MAX_LIMIT`
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

impl Activity {
    pub async fn record(pool: &PgPool, owner_id: Uuid, data: NewActivity) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO activities (id, owner_id, kind, description, entity_id, entity_type, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            ACTIVITY_COLUMNS
        );

        sqlx::query_as::<_, Activity>(&query)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(data.kind)
            .bind(data.description)
            .bind(data.entity_id)
            .bind(data.entity_type)
            .bind(Json(data.metadata.unwrap_or_else(|| Value::Object(Default::default()))))
            .fetch_one(pool)
            .await
    }

    /// Records a side-effect activity; a failure is logged and swallowed
    pub async fn record_quietly(pool: &PgPool, owner_id: Uuid, data: NewActivity) {
        let kind = data.kind.clone();
        if let Err(e) = Self::record(pool, owner_id, data).await {
            tracing::warn!(owner_id = %owner_id, kind = %kind, error = %e, "Failed to record activity");
        }
    }

    /// Newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &ActivityFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM activities \
             WHERE owner_id = $1 AND ($2::text IS NULL OR kind = $2) \
             ORDER BY created_at DESC LIMIT $3",
            ACTIVITY_COLUMNS
        );

        sqlx::query_as::<_, Activity>(&query)
            .bind(owner_id)
            .bind(filter.kind.as_deref())
            .bind(filter.effective_limit())
            .fetch_all(pool)
            .await
    }

    /// The last [`RECENT_LIMIT`] activities
    pub async fn recent(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let filter = ActivityFilter {
            limit: Some(RECENT_LIMIT),
            kind: None,
        };
        Self::list_by_owner(pool, owner_id, &filter).await
    }

    pub fn with_relative_time(self, now: DateTime<Utc>) -> RecentActivity {
        let relative_time = relative_time(self.created_at, now);
        RecentActivity {
            activity: self,
            relative_time,
        }
    }
}

/// Human-readable age of `then` as seen at `now`
///
/// ```
/// use chrono::{Duration, Utc};
/// use crm_shared::models::activity::relative_time;
///
/// let now = Utc::now();
/// assert_eq!(relative_time(now - Duration::seconds(30), now), "just now");
/// assert_eq!(relative_time(now - Duration::minutes(5), now), "5 min ago");
/// assert_eq!(relative_time(now - Duration::hours(1), now), "1 hour ago");
/// assert_eq!(relative_time(now - Duration::days(3), now), "3 days ago");
/// ```
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{} min ago", minutes)
    } else if hours < 24 {
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}
