//! Honeypot SSL-VPN portal
//!
//! Decoy login portal that looks and answers like an SSL-VPN appliance.
//! Every submitted credential and every off-portal request is recorded.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HONEYPOT PORTAL                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  Portal   │  │  Assets   │  │  Catch-all (403)        │ │
//! │  │  login /  │  │  css/js/  │  │  requests recorded as   │ │
//! │  │  check    │  │  fonts    │  │  exploit attempts       │ │
//! │  └─────┬─────┘  └───────────┘  └────────────┬────────────┘ │
//! │        └─────────────────┬──────────────────┘              │
//! │                          ▼                                  │
//! │                 ┌─────────────────┐                         │
//! │                 │ CredentialSink  │──▶ creds.log (optional) │
//! │                 │    (SQLite)     │                         │
//! │                 └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod fidelity;
mod handlers;
mod middleware;
mod pages;

use std::net::SocketAddr;

use axum::{
    extract::State,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use honey_store::{db, CredentialSink};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handlers::{assets, forbidden, portal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Honeypot portal starting ({})", config.environment);
    tracing::info!("Database: {}", config.database_url);

    // Initialize attempt store
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let mut sink = CredentialSink::new(pool);
    if let Some(path) = &config.creds_log {
        tracing::info!("Mirroring credentials to {}", path.display());
        sink = sink.with_log_mirror(path);
    }

    let state = AppState {
        sink,
        config: config.clone(),
    };
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Portal listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Portal stopped");
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sink: CredentialSink,
    pub config: config::Config,
}

/// Create the router with all portal routes.
///
/// Known paths answer 403 for any other method, and unknown paths answer
/// 403 too, so the portal never reveals a 404 or 405. Neither carries an
/// `Allow` header.
fn create_router(state: AppState) -> Router {
    let portal_routes = Router::new()
        .route("/", get(portal::root).fallback(forbidden::handler))
        .route(portal::LOGIN_PATH, get(portal::login).fallback(forbidden::handler))
        .route("/remote/logincheck", post(portal::login_check).fallback(forbidden::handler));

    let asset_routes = assets::ASSETS.iter().fold(Router::new(), |router, asset| {
        router.route(
            asset.route,
            get(move |state: State<AppState>| assets::serve(state, asset)).fallback(forbidden::handler),
        )
    });

    Router::new()
        .merge(portal_routes)
        .merge(asset_routes)
        .fallback(forbidden::handler)
        .layer(axum_middleware::map_response(middleware::headers::strip_allow))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received, draining connections");
}
