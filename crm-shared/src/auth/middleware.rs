/// Request authentication for Axum
///
/// Extracts the `Authorization: Bearer <token>` header, rejects revoked tokens,
/// validates the access token and produces an [`AuthContext`] that handlers
/// read from request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::Request, middleware::Next, response::Response};
/// use crm_shared::auth::blacklist::TokenBlacklist;
/// use crm_shared::auth::jwt::JwtKeys;
/// use crm_shared::auth::middleware::{authenticate_request, AuthError};
///
/// async fn layer(
///     keys: JwtKeys,
///     blacklist: TokenBlacklist,
///     mut req: Request,
///     next: Next,
/// ) -> Result<Response, AuthError> {
///     let auth = authenticate_request(req.headers(), &keys, &blacklist).await?;
///     req.extensions_mut().insert(auth);
///     Ok(next.run(req).await)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::blacklist::TokenBlacklist;
use super::jwt::{extract_bearer, validate_access_token, Claims, JwtError, JwtKeys};
use crate::models::user::UserRole;

/// Authentication context added to request extensions
///
/// ```
/// use axum::Extension;
/// use crm_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {} <{}>", auth.user_id, auth.email)
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Email carried by the token
    pub email: String,

    /// Role carried by the token
    pub role: UserRole,

    /// Raw access token, kept so logout can revoke it
    #[serde(skip)]
    pub token: String,

    /// Access token expiration (Unix seconds)
    pub expires_at: i64,
}

impl AuthContext {
    /// Creates auth context from validated claims and the token they came from
    pub fn from_claims(claims: Claims, token: &str) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            token: token.to_string(),
            expires_at: claims.exp,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Error type for request authentication
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Token signature/claims rejected
    InvalidToken(String),

    /// Token was revoked by logout
    Revoked,

    /// Revocation store unavailable
    BackendError(String),
}

impl AuthError {
    pub fn message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "Missing credentials".to_string(),
            AuthError::InvalidFormat(msg) => msg.clone(),
            AuthError::InvalidToken(msg) => msg.clone(),
            AuthError::Revoked => "Token has been revoked".to_string(),
            AuthError::BackendError(_) => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::BackendError(msg) => {
                tracing::error!("Authentication backend error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            _ => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };

        let body = Json(json!({ "error": code, "message": self.message() }));
        (status, body).into_response()
    }
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// Every client-side failure (missing header, wrong scheme, revoked, expired
/// or otherwise invalid token) maps to a 401-class [`AuthError`]; only an
/// unreachable revocation store yields `BackendError`.
pub async fn authenticate_request(
    headers: &HeaderMap,
    keys: &JwtKeys,
    blacklist: &TokenBlacklist,
) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = extract_bearer(auth_header)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if blacklist
        .is_revoked(token)
        .await
        .map_err(|e| AuthError::BackendError(e.to_string()))?
    {
        return Err(AuthError::Revoked);
    }

    let claims = validate_access_token(token, keys).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        JwtError::InvalidAudience { .. } => {
            AuthError::InvalidToken("Invalid audience".to_string())
        }
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(AuthContext::from_claims(claims, token))
}
