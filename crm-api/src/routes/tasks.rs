/// Task endpoints
///
/// - `GET /api/tasks?status=pending&priority=high` - List own tasks by due date
/// - `POST /api/tasks` - Create a task
/// - `GET /api/tasks/:id` - Get a task
/// - `PUT /api/tasks/:id` - Update the given fields
/// - `DELETE /api/tasks/:id` - Delete a task

use super::owned;
use crate::{app::AppState, error::ApiResult};
use crate::extract::{Json, Path, Query};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::Utc;
use crm_shared::{
    auth::middleware::AuthContext,
    models::{
        activity::{kinds, Activity, NewActivity},
        customer::Customer,
        lead::Lead,
        task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask},
    },
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

const ENTITY: &str = "task";

#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<Task>,
    pub total: usize,

    /// Pending tasks past their due date
    pub overdue: usize,
}

/// Linked customer and lead must belong to the caller
async fn check_links(
    state: &AppState,
    auth: &AuthContext,
    customer_id: Option<Uuid>,
    lead_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(customer_id) = customer_id {
        owned(Customer::find_by_id(&state.db, customer_id).await?, auth, "Customer")?;
    }
    if let Some(lead_id) = lead_id {
        owned(Lead::find_by_id(&state.db, lead_id).await?, auth, "Lead")?;
    }
    Ok(())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<ListTasksResponse>> {
    let tasks = Task::list_by_owner(&state.db, auth.user_id, &filter).await?;

    let now = Utc::now();
    let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();

    Ok(Json(ListTasksResponse {
        total: tasks.len(),
        overdue,
        tasks,
    }))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Content-Type: application/json
///
/// {
///   "title": "Call Acme",
///   "due_date": "2025-03-12T15:00:00Z",
///   "priority": "high",
///   "kind": "call",
///   "customer_id": "uuid"
/// }
/// ```
///
/// New tasks are `pending`; `kind` defaults to `general`.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;
    check_links(&state, &auth, req.customer_id, req.lead_id).await?;

    let task = Task::create(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, task_id = %task.id, "Task created");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(kinds::TASK_CREATED, format!("Task {} created", task.title))
            .entity(ENTITY, task.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = owned(Task::find_by_id(&state.db, id).await?, &auth, "Task")?;
    Ok(Json(task))
}

/// Update a task
///
/// Only the fields present in the body change. Setting `status` to
/// `completed` stamps `completed_at`; setting it back to `pending` clears it.
///
/// # Errors
///
/// - `403 Forbidden`: Task, customer or lead belongs to another user
/// - `404 Not Found`: No such task, customer or lead
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    req.validate()?;
    let existing = owned(Task::find_by_id(&state.db, id).await?, &auth, "Task")?;
    check_links(&state, &auth, req.customer_id, req.lead_id).await?;

    let task = owned(existing.update(&state.db, req).await?, &auth, "Task")?;

    if existing.status != TaskStatus::Completed && task.status == TaskStatus::Completed {
        Activity::record_quietly(
            &state.db,
            auth.user_id,
            NewActivity::new(kinds::TASK_COMPLETED, format!("Task {} completed", task.title))
                .entity(ENTITY, task.id),
        )
        .await;
    }

    Ok(Json(task))
}

/// Delete a task
///
/// # Response
///
/// `204 No Content`
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = owned(Task::find_by_id(&state.db, id).await?, &auth, "Task")?;

    Task::delete(&state.db, task.id).await?;

    tracing::info!(user_id = %auth.user_id, task_id = %task.id, "Task deleted");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(kinds::TASK_DELETED, format!("Task {} deleted", task.title))
            .entity(ENTITY, task.id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
