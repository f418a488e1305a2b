/// User model and database operations
///
/// Each user is its own tenant: every other record carries an `owner_id`
/// pointing here.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     name TEXT NOT NULL,
///     email TEXT NOT NULL UNIQUE,          -- always lowercase
///     password_hash TEXT NOT NULL,
///     company TEXT, job_title TEXT, phone TEXT, avatar_url TEXT,
///     role user_role NOT NULL DEFAULT 'user',
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     refresh_token_hash TEXT,
///     settings JSONB NOT NULL DEFAULT '{}',
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use crm_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     name: "Ana Souza".to_string(),
///     email: "Ana@Example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     company: None,
///     phone: None,
/// })
/// .await?;
///
/// assert_eq!(user.email, "ana@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, company, job_title, phone, \
     avatar_url, role, active, refresh_token_hash, settings, last_login_at, created_at, updated_at";

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// Per-user preferences stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub theme: String,
    pub language: String,
    pub timezone: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: true,
            theme: "light".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
        }
    }
}

/// User account
///
/// Secrets (`password_hash`, `refresh_token_hash`) are never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,

    /// Lowercased email, unique across all users
    pub email: String,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub company: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,

    /// Inactive users cannot log in
    pub active: bool,

    /// SHA-256 fingerprint of the current refresh token
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,

    pub settings: Json<UserSettings>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    /// Already hashed; never plaintext
    pub password_hash: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

/// Profile fields a user may change about themselves
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub settings: Option<UserSettings>,
}

/// Trims and lowercases an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Inserts a new user with default role and settings
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_email_unique` if the email is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash, company, phone, settings) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(data.name.trim())
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.company)
            .bind(data.phone)
            .bind(Json(UserSettings::default()))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email, case-insensitively
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Applies the present fields of `data`
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                company = COALESCE($3, company), \
                job_title = COALESCE($4, job_title), \
                phone = COALESCE($5, phone), \
                avatar_url = COALESCE($6, avatar_url), \
                settings = COALESCE($7, settings), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(data.name.map(|n| n.trim().to_string()))
            .bind(data.company)
            .bind(data.job_title)
            .bind(data.phone)
            .bind(data.avatar_url)
            .bind(data.settings.map(Json))
            .fetch_optional(pool)
            .await
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores the fingerprint of the user's current refresh token
    pub async fn set_refresh_token(
        pool: &PgPool,
        id: Uuid,
        fingerprint: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(fingerprint)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn clear_refresh_token(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token_hash = NULL WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Activates or deactivates an account
    pub async fn set_active(pool: &PgPool, id: Uuid, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// True when `fingerprint` matches the stored refresh token
    pub fn refresh_token_matches(&self, fingerprint: &str) -> bool {
        self.refresh_token_hash.as_deref() == Some(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            company: Some("Acme".to_string()),
            job_title: None,
            phone: None,
            avatar_url: None,
            role: UserRole::User,
            active: true,
            refresh_token_hash: Some("abc".to_string()),
            settings: Json(UserSettings::default()),
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token_hash").is_none());
        assert_eq!(json["email"], "ana@example.com");
        assert_eq!(json["role"], "user");
        assert_eq!(json["settings"]["theme"], "light");
    }

    #[test]
    fn test_refresh_token_matches() {
        let mut user = sample_user();
        assert!(user.refresh_token_matches("abc"));
        assert!(!user.refresh_token_matches("abd"));

        user.refresh_token_hash = None;
        assert!(!user.refresh_token_matches("abc"));
    }

    #[test]
    fn test_settings_fill_missing_fields() {
        let settings: UserSettings = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(settings.theme, "dark");
        assert!(settings.email_notifications);
        assert_eq!(settings.language, "pt-BR");
    }

    #[test]
    fn test_user_role_default() {
        assert_eq!(UserRole::default(), UserRole::User);
        assert_eq!(UserRole::Admin.as_str(), "admin");
    }
}
