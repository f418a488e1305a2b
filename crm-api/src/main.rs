//! # CRM API Server
//!
//! Serves the CRM REST API: authentication, customers, leads, sales, tasks,
//! activity log, notifications, dashboard statistics, search and export.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/crm \
//! JWT_SECRET=... JWT_REFRESH_SECRET=... \
//! cargo run -p crm-api
//! ```

use crm_api::{
    app::{build_router, AppState},
    config::Config,
};
use crm_shared::auth::blacklist::TokenBlacklist;
use crm_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired revocations are dropped from the in-memory list
const BLACKLIST_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_api=debug,crm_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("CRM API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await?;
    run_migrations(&pool).await?;

    let blacklist = match &config.redis.url {
        Some(url) => TokenBlacklist::connect_redis(url).await?,
        None => {
            tracing::info!("REDIS_URL not set, token revocations are kept in memory");
            TokenBlacklist::in_memory()
        }
    };
    spawn_blacklist_sweeper(blacklist.clone());

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config, blacklist);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn spawn_blacklist_sweeper(blacklist: TokenBlacklist) {
    if matches!(blacklist, TokenBlacklist::Redis(_)) {
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(BLACKLIST_SWEEP_INTERVAL);
        // First tick fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let purged = blacklist.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged expired token revocations");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
