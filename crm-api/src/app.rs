/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use crm_api::{app::AppState, config::Config};
/// use crm_shared::auth::blacklist::TokenBlacklist;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, TokenBlacklist::in_memory());
/// let app = crm_api::app::build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use crm_shared::auth::{blacklist::TokenBlacklist, jwt::JwtKeys, middleware::authenticate_request};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into each handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token signing secrets
    pub keys: Arc<JwtKeys>,

    /// Revoked access tokens
    pub blacklist: TokenBlacklist,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, blacklist: TokenBlacklist) -> Self {
        let keys = JwtKeys::new(config.jwt.secret.clone(), config.jwt.refresh_secret.clone());

        Self {
            db,
            config: Arc::new(config),
            keys: Arc::new(keys),
            blacklist,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                          (public)
/// └── /api
///     ├── /auth
///     │   ├── POST /register                (public)
///     │   ├── POST /login                   (public)
///     │   ├── POST /refresh                 (public)
///     │   ├── POST /logout
///     │   └── GET  /me
///     ├── GET|PUT          /profile
///     ├── POST             /profile/change-password
///     ├── GET|POST         /customers
///     ├── GET|PUT|DELETE   /customers/:id
///     ├── GET|POST         /leads
///     ├── GET|PUT|DELETE   /leads/:id
///     ├── POST             /leads/:id/convert
///     ├── GET|POST         /sales
///     ├── GET|PUT|DELETE   /sales/:id
///     ├── GET|POST         /tasks
///     ├── GET|PUT|DELETE   /tasks/:id
///     ├── GET|POST         /activities
///     ├── GET              /activities/recent
///     ├── GET|POST|PATCH   /notifications
///     ├── PATCH|DELETE     /notifications/:id
///     ├── GET              /dashboard/stats
///     ├── GET              /dashboard/sales-chart
///     ├── GET              /statistics
///     ├── GET              /search?q=
///     └── GET              /export
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, then bearer
/// authentication on the protected routes only.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{
        activities, auth, customers, dashboard, export, health, leads, notifications, profile,
        sales, search, statistics, tasks,
    };

    let public_auth = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/profile/change-password", post(profile::change_password))
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/leads", get(leads::list_leads).post(leads::create_lead))
        .route(
            "/leads/:id",
            get(leads::get_lead)
                .put(leads::update_lead)
                .delete(leads::delete_lead),
        )
        .route("/leads/:id/convert", post(leads::convert_lead))
        .route("/sales", get(sales::list_sales).post(sales::create_sale))
        .route(
            "/sales/:id",
            get(sales::get_sale)
                .put(sales::update_sale)
                .delete(sales::delete_sale),
        )
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/activities",
            get(activities::list_activities).post(activities::create_activity),
        )
        .route("/activities/recent", get(activities::recent_activities))
        .route(
            "/notifications",
            get(notifications::list_notifications)
                .post(notifications::create_notification)
                .patch(notifications::mark_all_read),
        )
        .route(
            "/notifications/:id",
            patch(notifications::update_notification).delete(notifications::delete_notification),
        )
        .route("/dashboard/stats", get(dashboard::dashboard_stats))
        .route("/dashboard/sales-chart", get(dashboard::sales_chart))
        .route("/statistics", get(statistics::statistics))
        .route("/search", get(search::search))
        .route("/export", get(export::export))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let api = Router::new().nest("/auth", public_auth).merge(protected);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Bearer authentication
///
/// Rejects missing, malformed, revoked, expired or otherwise invalid tokens
/// with 401 and injects [`AuthContext`](crm_shared::auth::middleware::AuthContext)
/// into the request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate_request(req.headers(), &state.keys, &state.blacklist)
        .await
        .map_err(|err| {
            tracing::debug!(path = %req.uri().path(), reason = %err.message(), "Rejected request");
            ApiError::from(err)
        })?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, DatabaseConfig, JwtConfig, RedisConfig};
    use sqlx::postgres::PgPoolOptions;

    fn config(cors_origins: &[&str]) -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: cors_origins.iter().map(|o| o.to_string()).collect(),
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/never_connected".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "app-test-access-secret-32-bytes-long".to_string(),
                refresh_secret: "app-test-refresh-secret-32-bytes-long".to_string(),
            },
            redis: RedisConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_router_builds_with_restricted_origins() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/never_connected")
            .unwrap();
        let state = AppState::new(
            pool,
            config(&["https://crm.example.com", "not a header\u{7f}"]),
            TokenBlacklist::in_memory(),
        );

        let _router = build_router(state);
    }
}
