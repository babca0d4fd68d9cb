//! Content CMS Backend
//!
//! Serves slug-addressed content blocks over a JSON API, backed by a local
//! line-delimited store file, and hosts the admin panel and content pages.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{ContentStore, StoreOptions};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config);

    tracing::info!("Starting Content CMS Backend");
    tracing::info!("Store path: {:?}", config.db_path);
    tracing::info!("Public directory: {:?}", config.public_dir);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CMS_API_PSK). Write endpoints are open!");
    }

    // Open the content store
    let options = StoreOptions {
        corrupt_threshold: config.corrupt_threshold,
    };
    let store = Arc::new(db::init_store(&config.db_path, options).await?);
    tracing::info!(
        "Loaded {} content item(s) from {}",
        store.count().await,
        store.path().display()
    );

    if config.seed {
        if let Err(e) = db::seed_if_empty(&store).await {
            tracing::error!("Error seeding initial content: {}", e);
        }
    }

    if let Some(period) = config.compact_interval {
        spawn_compaction(store.clone(), period);
    }

    let state = AppState {
        store: store.clone(),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await?;
    tracing::info!("Server stopped");

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically rewrite the store file to drop superseded journal lines.
fn spawn_compaction(store: Arc<ContentStore>, period: Duration) {
    tracing::info!("Auto-compaction every {:?}", period);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; the file was compacted on open.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = store.compact().await {
                tracing::error!("Auto-compaction failed: {}", e);
            }
        }
    });
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();
    let public_dir = state.config.public_dir.clone();

    let api_routes = Router::new()
        .route(
            "/content",
            get(api::list_content).post(api::save_content),
        )
        // GET and PUT address content by slug, DELETE by id
        .route(
            "/content/{key}",
            get(api::get_content)
                .put(api::update_content_by_slug)
                .delete(api::delete_content),
        )
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .route_service("/admin", ServeFile::new(public_dir.join("admin.html")))
        .fallback_service(ServeDir::new(&public_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received, draining requests");
}
