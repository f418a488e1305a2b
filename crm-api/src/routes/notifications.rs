/// Notification endpoints
///
/// # Endpoints
///
/// - `GET /api/notifications?read=false` - Newest 50, plus the unread count
/// - `POST /api/notifications` - Create a notification
/// - `PATCH /api/notifications` - Mark all as read
/// - `PATCH /api/notifications/:id` - Mark one read or unread
/// - `DELETE /api/notifications/:id` - Delete one

use super::owned;
use crate::{app::AppState, error::ApiResult};
use crate::extract::{Json, OptionalJson, Path, Query};
use axum::{extract::State, http::StatusCode, Extension};
use crm_shared::{
    auth::middleware::AuthContext,
    models::notification::{NewNotification, Notification, NotificationFilter},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,

    /// Across all of the user's notifications, not only the listed ones
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

fn default_read() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationRequest {
    #[serde(default = "default_read")]
    pub read: bool,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<NotificationFilter>,
) -> ApiResult<Json<ListNotificationsResponse>> {
    let (notifications, unread) = tokio::try_join!(
        Notification::list_by_owner(&state.db, auth.user_id, &filter),
        Notification::count_unread(&state.db, auth.user_id),
    )?;

    Ok(Json(ListNotificationsResponse {
        notifications,
        unread,
    }))
}

/// Create a notification
///
/// # Endpoint
///
/// ```text
/// POST /api/notifications
/// Content-Type: application/json
///
/// {
///   "title": "Follow up",
///   "message": "Call Acme back tomorrow",
///   "kind": "warning",
///   "link": "/customers/uuid"
/// }
/// ```
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NewNotification>,
) -> ApiResult<(StatusCode, Json<Notification>)> {
    req.validate()?;

    let notification = Notification::create(&state.db, auth.user_id, req).await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// Mark all notifications read
///
/// # Response
///
/// ```json
/// { "updated": 3 }
/// ```
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let updated = Notification::mark_all_read(&state.db, auth.user_id).await?;

    tracing::debug!(user_id = %auth.user_id, updated, "Notifications marked read");

    Ok(Json(MarkAllReadResponse { updated }))
}

/// Mark one notification read or unread
///
/// # Endpoint
///
/// ```text
/// PATCH /api/notifications/:id
/// Content-Type: application/json
///
/// { "read": false }
/// ```
///
/// Without a body (or without `read`) the notification is marked read. A
/// body that is not valid JSON is rejected.
///
/// # Errors
///
/// - `403 Forbidden`: Notification belongs to another user
/// - `404 Not Found`: No such notification
pub async fn update_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    OptionalJson(body): OptionalJson<UpdateNotificationRequest>,
) -> ApiResult<Json<Notification>> {
    let read = body.map(|req| req.read).unwrap_or(true);
    owned(Notification::find_by_id(&state.db, id).await?, &auth, "Notification")?;

    let notification = owned(
        Notification::set_read(&state.db, id, read).await?,
        &auth,
        "Notification",
    )?;

    Ok(Json(notification))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    owned(Notification::find_by_id(&state.db, id).await?, &auth, "Notification")?;

    Notification::delete(&state.db, id).await?;

    tracing::info!(user_id = %auth.user_id, notification_id = %id, "Notification deleted");

    Ok(StatusCode::NO_CONTENT)
}
