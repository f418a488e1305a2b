/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: Access/refresh token generation and validation
/// - [`blacklist`]: Revocation list for logged-out access tokens
/// - [`middleware`]: Request authentication context
/// - [`authorization`]: Record ownership checks
///
/// # Example
///
/// ```no_run
/// use crm_shared::auth::password::{hash_password, verify_password};
/// use crm_shared::auth::jwt::{create_token_pair, validate_access_token, JwtKeys};
/// use crm_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let keys = JwtKeys::new("access-secret-at-least-32-bytes-long!", "refresh-secret-at-least-32-bytes-long");
/// let pair = create_token_pair(Uuid::new_v4(), "ana@example.com", UserRole::User, &keys)?;
/// let claims = validate_access_token(&pair.access_token, &keys)?;
/// assert_eq!(claims.email, "ana@example.com");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod blacklist;
pub mod jwt;
pub mod middleware;
pub mod password;
