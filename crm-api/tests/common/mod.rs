//! Shared helpers for router-level tests
//!
//! Two kinds of harness:
//! - [`TestApp::offline`]: lazy pool that never connects, for requests the
//!   authentication layer or request validation reject before any query
//! - [`TestApp::with_database`]: real Postgres from `DATABASE_URL`; returns
//!   `None` (and the test returns early) when the variable is unset

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use crm_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig, RedisConfig},
};
use crm_shared::{auth::blacklist::TokenBlacklist, db::migrations::run_migrations};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "integration-access-secret-at-least-32-bytes";
pub const REFRESH_SECRET: &str = "integration-refresh-secret-at-least-32-bytes";
pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config(database_url: &str) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: ACCESS_SECRET.to_string(),
            refresh_secret: REFRESH_SECRET.to_string(),
        },
        redis: RedisConfig::default(),
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text)
            .unwrap_or_else(|e| panic!("Response is not JSON ({}): {}", e, self.text))
    }
}

/// Registered user with its current tokens
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub fn offline() -> Self {
        let url = "postgresql://localhost/never_connected";
        let pool = PgPoolOptions::new()
            .connect_lazy(url)
            .expect("Lazy pool should build");

        Self::from_state(AppState::new(pool, test_config(url), TokenBlacklist::in_memory()))
    }

    pub async fn with_database() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("Failed to connect to DATABASE_URL");
        run_migrations(&pool).await.expect("Migrations should apply");

        Some(Self::from_state(AppState::new(
            pool,
            test_config(&url),
            TokenBlacklist::in_memory(),
        )))
    }

    fn from_state(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Registers a fresh user with a unique email
    pub async fn register_user(&self, name: &str) -> TestUser {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let response = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);

        let body = response.json();
        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            email,
            access_token: body["access_token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        }
    }
}
