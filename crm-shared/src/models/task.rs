/// Task model and database operations
///
/// Tasks are to-dos optionally attached to a customer or lead. Completing a
/// task stamps `completed_at`; reopening it clears the stamp.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT,
///     due_date TIMESTAMPTZ,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     kind TEXT NOT NULL DEFAULT 'general',
///     status task_status NOT NULL DEFAULT 'pending',
///     customer_id UUID REFERENCES customers(id) ON DELETE SET NULL,
///     lead_id UUID REFERENCES leads(id) ON DELETE SET NULL,
///     completed_at TIMESTAMPTZ,
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

const TASK_COLUMNS: &str = "id, owner_id, title, description, due_date, priority, kind, status, \
     customer_id, lead_id, completed_at, created_at, updated_at";

const DEFAULT_KIND: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,

    /// Free-form category, e.g. `call`, `meeting`
    pub kind: String,

    pub status: TaskStatus,
    pub customer_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Task {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Task {
    /// Pending with a due date in the past
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.due_date.map(|d| d < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateTask {
    #[validate(length(min = 1, max = 300, message = "Title is required"))]
    pub title: String,

    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub priority: TaskPriority,

    pub kind: Option<String>,
    pub customer_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 300, message = "Title must not be empty"))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub kind: Option<String>,
    pub status: Option<TaskStatus>,
    pub customer_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

/// `completed_at` after moving from `current` to `next`
///
/// Completing stamps `now` unless already stamped; reopening clears it.
pub fn completion_timestamp(
    current: Option<DateTime<Utc>>,
    next: TaskStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match next {
        TaskStatus::Completed => current.or(Some(now)),
        TaskStatus::Pending => None,
    }
}

impl Task {
    pub async fn create(pool: &PgPool, owner_id: Uuid, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (id, owner_id, title, description, due_date, priority, kind, \
                 customer_id, lead_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(data.title.trim().to_string())
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.priority)
            .bind(data.kind.unwrap_or_else(|| DEFAULT_KIND.to_string()))
            .bind(data.customer_id)
            .bind(data.lead_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the owner's tasks by due date, undated last
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks \
             WHERE owner_id = $1 \
               AND ($2::task_status IS NULL OR status = $2) \
               AND ($3::task_priority IS NULL OR priority = $3) \
             ORDER BY due_date ASC NULLS LAST, created_at DESC",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner_id)
            .bind(filter.status)
            .bind(filter.priority)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update to an already loaded task
    pub async fn update(&self, pool: &PgPool, data: UpdateTask) -> Result<Option<Self>, sqlx::Error> {
        let status = data.status.unwrap_or(self.status);
        let completed_at = completion_timestamp(self.completed_at, status, Utc::now());

        let query = format!(
            "UPDATE tasks SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 due_date = COALESCE($4, due_date), \
                 priority = COALESCE($5, priority), \
                 kind = COALESCE($6, kind), \
                 status = $7, \
                 customer_id = COALESCE($8, customer_id), \
                 lead_id = COALESCE($9, lead_id), \
                 completed_at = $10, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(self.id)
            .bind(data.title.map(|t| t.trim().to_string()))
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.priority)
            .bind(data.kind)
            .bind(status)
            .bind(data.customer_id)
            .bind(data.lead_id)
            .bind(completed_at)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
