/// JWT token generation and validation module
///
/// Access and refresh tokens are signed with HS256 using two **separate**
/// secrets, so a leaked refresh secret cannot mint access tokens and vice versa.
///
/// # Token Types
///
/// - **Access Token**: 15 minutes, sent as `Authorization: Bearer <token>`
/// - **Refresh Token**: 7 days, exchanged at `/api/auth/refresh` for a new pair
///
/// # Validation
///
/// Signature, expiration, not-before, issuer (`crm-sistema`), audience
/// (`crm-users`) and token type are all checked.
///
/// # Example
///
/// ```
/// use crm_shared::auth::jwt::{create_token_pair, validate_refresh_token, JwtKeys};
/// use crm_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = JwtKeys::new("access-secret-at-least-32-bytes-long!", "refresh-secret-at-least-32-bytes-long");
/// let user_id = Uuid::new_v4();
///
/// let pair = create_token_pair(user_id, "ana@example.com", UserRole::User, &keys)?;
/// let claims = validate_refresh_token(&pair.refresh_token, &keys)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Token issuer claim
pub const ISSUER: &str = "crm-sistema";

/// Token audience claim
pub const AUDIENCE: &str = "crm-users";

/// Remaining lifetime under which a token counts as "expiring soon"
const EXPIRING_SOON_SECONDS: i64 = 300;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Invalid audience
    #[error("Invalid audience: expected {expected}")]
    InvalidAudience { expected: String },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived, 15 minutes)
    Access,

    /// Refresh token (long-lived, 7 days)
    Refresh,
}

impl TokenType {
    /// Gets default expiration duration for token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::minutes(15),
            TokenType::Refresh => Duration::days(7),
        }
    }

    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Signing secrets for both token types
#[derive(Debug, Clone)]
pub struct JwtKeys {
    access_secret: String,
    refresh_secret: String,
}

impl JwtKeys {
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
        }
    }

    fn secret_for(&self, token_type: TokenType) -> &str {
        match token_type {
            TokenType::Access => &self.access_secret,
            TokenType::Refresh => &self.refresh_secret,
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "crm-sistema")
/// - `aud`: Audience (always "crm-users")
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `jti`: Random token ID
///
/// # Custom Claims
///
/// - `email`: User email at issuance time
/// - `role`: User role
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// User email (custom claim)
    pub email: String,

    /// User role (custom claim)
    pub role: UserRole,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token type (custom claim)
    pub token_type: TokenType,

    /// Unique token ID; two tokens issued in the same second still differ
    pub jti: Uuid,
}

impl Claims {
    /// Creates new claims with the default expiration for the token type
    pub fn new(user_id: Uuid, email: &str, role: UserRole, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, email, role, token_type, token_type.default_expiration())
    }

    /// Creates claims with custom expiration
    pub fn with_expiration(
        user_id: Uuid,
        email: &str,
        role: UserRole,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            email: email.to_string(),
            role,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            token_type,
            jti: Uuid::new_v4(),
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }

    /// True when fewer than five minutes of validity remain
    pub fn is_expiring_soon(&self) -> bool {
        self.exp - Utc::now().timestamp() < EXPIRING_SOON_SECONDS
    }
}

/// Access and refresh tokens issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Creates a signed token from claims
///
/// The signing secret is chosen from `keys` by `claims.token_type`.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, keys: &JwtKeys) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(keys.secret_for(claims.token_type).as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a fresh access + refresh token pair for a user
pub fn create_token_pair(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    keys: &JwtKeys,
) -> Result<TokenPair, JwtError> {
    let access = Claims::new(user_id, email, role, TokenType::Access);
    let refresh = Claims::new(user_id, email, role, TokenType::Refresh);

    Ok(TokenPair {
        access_token: create_token(&access, keys)?,
        refresh_token: create_token(&refresh, keys)?,
    })
}

fn validate_token(token: &str, keys: &JwtKeys, expected: TokenType) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(keys.secret_for(expected).as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[AUDIENCE]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience {
            expected: AUDIENCE.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    if token_data.claims.token_type != expected {
        return Err(JwtError::ValidationError(format!(
            "Expected {} token, got {} token",
            expected.as_str(),
            token_data.claims.token_type.as_str()
        )));
    }

    Ok(token_data.claims)
}

/// Validates an access token
///
/// # Example
///
/// ```
/// use crm_shared::auth::jwt::{create_token, validate_access_token, Claims, JwtKeys, TokenType};
/// use crm_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = JwtKeys::new("a-secret", "r-secret");
/// let claims = Claims::new(Uuid::new_v4(), "ana@example.com", UserRole::User, TokenType::Access);
/// let token = create_token(&claims, &keys)?;
///
/// let validated = validate_access_token(&token, &keys)?;
/// assert_eq!(validated.token_type, TokenType::Access);
/// # Ok(())
/// # }
/// ```
pub fn validate_access_token(token: &str, keys: &JwtKeys) -> Result<Claims, JwtError> {
    validate_token(token, keys, TokenType::Access)
}

/// Validates a refresh token
pub fn validate_refresh_token(token: &str, keys: &JwtKeys) -> Result<Claims, JwtError> {
    validate_token(token, keys, TokenType::Refresh)
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Hex-encoded SHA-256 of a token
///
/// Tokens are never stored verbatim; refresh tokens and revocation entries
/// are keyed by this fingerprint.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
