/// Configuration management for the API server
///
/// Values come from environment variables (a `.env` file is loaded first if
/// present), layered over built-in defaults with the `config` crate.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Access token secret, at least 32 characters (required)
/// - `JWT_REFRESH_SECRET`: Refresh token secret, at least 32 characters, different from `JWT_SECRET` (required)
/// - `REDIS_URL`: Enables the Redis-backed token revocation list (optional)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use crm_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use ::config::{Config as Settings, Environment};
use serde::{Deserialize, Serialize};

const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub redis: RedisConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Access token secret
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Refresh token secret, distinct from `secret`
    pub refresh_secret: String,
}

/// Token revocation backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    /// In-memory revocation list when absent
    pub url: Option<String>,
}

impl Config {
    /// Loads configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or the JWT secrets are too short or identical.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Settings::builder()
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        Self::from_settings(&settings)
    }

    /// Builds configuration from already collected settings
    ///
    /// Keys are the lowercased environment variable names (`api_port`, ...).
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let string_or = |key: &str, default: &str| -> String {
            settings
                .get_string(key)
                .unwrap_or_else(|_| default.to_string())
        };
        let required = |key: &str| -> anyhow::Result<String> {
            settings
                .get_string(key)
                .map_err(|_| anyhow::anyhow!("{} environment variable is required", key.to_uppercase()))
        };

        let port = string_or("api_port", "8080").parse::<u16>()?;
        let max_connections = string_or("database_max_connections", "10").parse::<u32>()?;
        let production = string_or("production", "false").parse::<bool>()?;

        let cors_origins = string_or("cors_origins", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let secret = required("jwt_secret")?;
        let refresh_secret = required("jwt_refresh_secret")?;

        if secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if refresh_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_REFRESH_SECRET must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }
        if secret == refresh_secret {
            anyhow::bail!("JWT_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let redis_url = settings
            .get_string("redis_url")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            api: ApiConfig {
                host: string_or("api_host", "0.0.0.0"),
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: required("database_url")?,
                max_connections,
            },
            jwt: JwtConfig {
                secret,
                refresh_secret,
            },
            redis: RedisConfig { url: redis_url },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = "test-access-secret-at-least-32-bytes";
    const REFRESH: &str = "test-refresh-secret-at-least-32-bytes";

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let mut builder = Settings::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("database_url", "postgresql://localhost/crm"),
            ("jwt_secret", ACCESS),
            ("jwt_refresh_secret", REFRESH),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_settings(&settings(&minimal())).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.allows_any_origin());
        assert!(!config.api.production);
        assert!(config.redis.url.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = minimal();
        pairs.extend([
            ("api_host", "127.0.0.1"),
            ("api_port", "3001"),
            ("cors_origins", "https://crm.example.com, https://admin.example.com"),
            ("production", "true"),
            ("redis_url", "redis://localhost:6379"),
        ]);

        let config = Config::from_settings(&settings(&pairs)).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:3001");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://crm.example.com", "https://admin.example.com"]
        );
        assert!(!config.allows_any_origin());
        assert!(config.api.production);
        assert_eq!(config.redis.url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_missing_database_url() {
        let pairs = vec![("jwt_secret", ACCESS), ("jwt_refresh_secret", REFRESH)];
        let err = Config::from_settings(&settings(&pairs)).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let pairs = vec![
            ("database_url", "postgresql://localhost/crm"),
            ("jwt_secret", "short"),
            ("jwt_refresh_secret", REFRESH),
        ];
        assert!(Config::from_settings(&settings(&pairs)).is_err());
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let pairs = vec![
            ("database_url", "postgresql://localhost/crm"),
            ("jwt_secret", ACCESS),
            ("jwt_refresh_secret", ACCESS),
        ];
        let err = Config::from_settings(&settings(&pairs)).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }
}
