/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "schema_version": 20250101000000,
///   "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
/// }
/// ```
///
/// `status` is `degraded` and `database` is `disconnected` when the database
/// does not answer; the endpoint itself still returns 200.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use crm_shared::db::{
    migrations::get_migration_status,
    pool::{get_pool_stats, health_check as database_health, PoolStats},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,

    /// Latest applied migration
    pub schema_version: Option<i64>,

    pub pool: PoolStats,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let (status, database) = match database_health(&state.db).await {
        Ok(()) => ("healthy", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            ("degraded", "disconnected")
        }
    };

    let schema_version = match database {
        "connected" => get_migration_status(&state.db)
            .await
            .ok()
            .and_then(|status| status.latest_version),
        _ => None,
    };

    Ok(Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
        schema_version,
        pool: get_pool_stats(&state.db),
    }))
}
