/// Activity log endpoints
///
/// - `GET /api/activities?limit=20&kind=lead_converted` - Newest first, at most 100
/// - `POST /api/activities` - Record an activity
/// - `GET /api/activities/recent` - Last 10, with a relative age

use crate::{app::AppState, error::ApiResult};
use crate::extract::{Json, Query};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::Utc;
use crm_shared::{
    auth::middleware::AuthContext,
    models::activity::{Activity, ActivityFilter, NewActivity, RecentActivity},
};
use serde::Serialize;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct ListActivitiesResponse {
    pub activities: Vec<Activity>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentActivitiesResponse {
    pub activities: Vec<RecentActivity>,
}

/// List activities
///
/// `limit` defaults to 50 and is clamped to 1..=100.
pub async fn list_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<ActivityFilter>,
) -> ApiResult<Json<ListActivitiesResponse>> {
    let activities = Activity::list_by_owner(&state.db, auth.user_id, &filter).await?;

    Ok(Json(ListActivitiesResponse {
        total: activities.len(),
        activities,
    }))
}

/// Record an activity
///
/// # Endpoint
///
/// ```text
/// POST /api/activities
/// Content-Type: application/json
///
/// {
///   "kind": "meeting",
///   "description": "Demo with Acme",
///   "entity_type": "customer",
///   "entity_id": "uuid",
///   "metadata": { "duration_minutes": 30 }
/// }
/// ```
pub async fn create_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NewActivity>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    req.validate()?;

    let activity = Activity::record(&state.db, auth.user_id, req).await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

/// Recent activity feed
///
/// # Response
///
/// ```json
/// {
///   "activities": [
///     { "id": "uuid", "kind": "customer_created", "description": "...", "relative_time": "5 min ago", ... }
///   ]
/// }
/// ```
pub async fn recent_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<RecentActivitiesResponse>> {
    let now = Utc::now();
    let activities = Activity::recent(&state.db, auth.user_id)
        .await?
        .into_iter()
        .map(|activity| activity.with_relative_time(now))
        .collect();

    Ok(Json(RecentActivitiesResponse { activities }))
}
