/// Profile endpoints
///
/// - `GET /api/profile` - Current user's profile
/// - `PUT /api/profile` - Update profile fields and settings
/// - `POST /api/profile/change-password` - Change password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use crate::extract::Json;
use axum::{extract::State, Extension};
use crm_shared::{
    auth::{middleware::AuthContext, password},
    models::{
        activity::{kinds, Activity, NewActivity},
        notification::{NewNotification, Notification, NotificationKind},
        user::{UpdateProfile, User, UserSettings},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Profile update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 200))]
    pub company: Option<String>,

    #[validate(length(max = 100))]
    pub job_title: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar_url: Option<String>,

    pub settings: Option<UserSettings>,
}

impl From<UpdateProfileRequest> for UpdateProfile {
    fn from(req: UpdateProfileRequest) -> Self {
        UpdateProfile {
            name: req.name,
            company: req.company,
            job_title: req.job_title,
            phone: req.phone,
            avatar_url: req.avatar_url,
            settings: req.settings,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub message: &'static str,
}

async fn load_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    Ok(Json(load_user(&state, &auth).await?))
}

/// Update profile
///
/// # Endpoint
///
/// ```text
/// PUT /api/profile
/// Content-Type: application/json
///
/// {
///   "name": "Ana Souza",
///   "job_title": "Sales lead",
///   "settings": { "theme": "dark" }
/// }
/// ```
///
/// `settings` replaces the stored settings as a whole; missing keys take
/// their defaults.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = User::update_profile(&state.db, auth.user_id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::debug!(user_id = %user.id, "Profile updated");

    Ok(Json(user))
}

/// Change password
///
/// # Endpoint
///
/// ```text
/// POST /api/profile/change-password
/// Content-Type: application/json
///
/// {
///   "current_password": "secret123",
///   "new_password": "n3w-secret"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Current password is wrong
/// - `422 Unprocessable Entity`: New password too short
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ChangePasswordResponse>> {
    req.validate()?;
    password::validate_password_strength(&req.new_password)
        .map_err(|msg| ApiError::invalid_field("new_password", msg))?;

    let user = load_user(&state, &auth).await?;

    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
    }

    let password_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Activity::record_quietly(
        &state.db,
        user.id,
        NewActivity::new(kinds::PASSWORD_CHANGED, "Password changed"),
    )
    .await;
    Notification::notify_quietly(
        &state.db,
        user.id,
        NewNotification::new(
            NotificationKind::Success,
            "Password changed",
            "Your password was changed successfully",
        ),
    )
    .await;

    Ok(Json(ChangePasswordResponse {
        message: "Password changed",
    }))
}
