//! Syncline Server - HTTP front for the offline-first sync engine.
//!
//! Clients POST their pending change lists to `/sync` and receive every item
//! changed since their checkpoint, as decided by the syncline-engine merge
//! strategies.

mod config;
mod error;
mod handlers;
mod routes;

use crate::config::Config;
use axum::Router;
use std::sync::Arc;
use syncline_engine::{Registry, Server};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "syncline_server=debug,syncline_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Syncline Server on {}:{}", config.host, config.port);

    let registry = Registry::with_defaults();
    tracing::info!("Registered data types: {:?}", registry);

    // Build application state
    let state = AppState {
        server: Arc::new(Server::new(Arc::new(registry))),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
