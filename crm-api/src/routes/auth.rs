/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new user
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Rotate the token pair
/// - `POST /api/auth/logout` - Revoke the current session
/// - `GET /api/auth/me` - Current user
///
/// Only the SHA-256 fingerprint of the latest refresh token is stored on the
/// user. Refreshing replaces it, so an older refresh token stops working.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use crate::extract::Json;
use axum::{extract::State, http::StatusCode, Extension};
use crm_shared::{
    auth::{
        authorization::AuthzError,
        jwt::{self, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::{
        activity::{kinds, Activity, NewActivity},
        notification::{NewNotification, Notification, NotificationKind},
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked by `validate_password_strength`
    pub password: String,

    #[validate(length(max = 200, message = "Company must be at most 200 characters"))]
    pub company: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens plus the authenticated user
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,

    /// Always `Bearer`
    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    pub user: User,
}

impl AuthResponse {
    fn new(pair: TokenPair, user: User) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: TokenType::Access.default_expiration().num_seconds(),
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

/// Issues a token pair and stores the refresh token fingerprint
async fn start_session(state: &AppState, user: &User) -> ApiResult<TokenPair> {
    let pair = jwt::create_token_pair(user.id, &user.email, user.role, &state.keys)?;
    User::set_refresh_token(&state.db, user.id, &jwt::fingerprint(&pair.refresh_token)).await?;
    Ok(pair)
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Ana Souza",
///   "email": "ana@example.com",
///   "password": "secret123",
///   "company": "Acme"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ...",
///   "token_type": "Bearer",
///   "expires_in": 900,
///   "user": { "id": "uuid", "name": "Ana Souza", "email": "ana@example.com", ... }
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;
    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
            company: req.company,
            phone: req.phone,
        },
    )
    .await?;

    let pair = start_session(&state, &user).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Activity::record_quietly(
        &state.db,
        user.id,
        NewActivity::new(kinds::REGISTERED, "Account created").entity("user", user.id),
    )
    .await;
    Notification::notify_quietly(
        &state.db,
        user.id,
        NewNotification::new(
            NotificationKind::Success,
            "Welcome",
            format!("Welcome to the CRM, {}!", user.name),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(AuthResponse::new(pair, user))))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "ana@example.com",
///   "password": "secret123"
/// }
/// ```
///
/// # Response
///
/// Same body as registration, with `200 OK`.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `403 Forbidden`: Account deactivated
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.active {
        return Err(AuthzError::Inactive.into());
    }

    let pair = start_session(&state, &user).await?;
    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse::new(pair, user)))
}

/// Token refresh endpoint
///
/// Exchanges the current refresh token for a new pair. The presented token
/// must be the latest one issued to the user.
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, access-type, or rotated-out token;
///   unknown or deactivated user
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, &state.keys)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.active)
        .ok_or_else(|| ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

    if !user.refresh_token_matches(&jwt::fingerprint(&req.refresh_token)) {
        tracing::warn!(user_id = %user.id, "Refresh rejected: token is not the current one");
        return Err(ApiError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
    }

    let pair = start_session(&state, &user).await?;

    tracing::debug!(user_id = %user.id, "Token pair rotated");

    Ok(Json(AuthResponse::new(pair, user)))
}

/// Logout endpoint
///
/// Clears the stored refresh token and revokes the access token used for
/// this request until it would have expired.
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/logout
/// Authorization: Bearer <access_token>
/// ```
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<LogoutResponse>> {
    User::clear_refresh_token(&state.db, auth.user_id).await?;
    state.blacklist.revoke(&auth.token, auth.expires_at).await?;

    tracing::info!(user_id = %auth.user_id, "User logged out");

    Ok(Json(LogoutResponse {
        message: "Logged out",
    }))
}

/// Current user
///
/// # Endpoint
///
/// ```text
/// GET /api/auth/me
/// Authorization: Bearer <access_token>
/// ```
///
/// # Errors
///
/// - `404 Not Found`: The account was deleted after the token was issued
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
