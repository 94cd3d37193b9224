//! # Server Configuration
//!
//! Router construction and the plaintext / TLS listeners for the relay.

use anyhow::{Context, Result};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::events::EventProcessor;
use crate::exchange::OAuthExchange;
use crate::handlers;
use crate::telemetry;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub exchange: Arc<OAuthExchange>,
    pub events: Arc<EventProcessor>,
}

impl AppState {
    /// Wire the production collaborators from configuration.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let db = Arc::new(db);
        Self {
            exchange: Arc::new(OAuthExchange::from_config(db.clone(), &config)),
            events: Arc::new(EventProcessor::new(db.clone())),
            db,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/redirect-link", get(handlers::oauth::redirect_link))
        .route("/authorization", get(handlers::oauth::authorization))
        .route("/event", post(handlers::events::receive_event))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(telemetry::request_id_middleware))
}

/// Starts the server with the given configuration.
///
/// Serves TLS when both certificate and key paths are configured, plaintext otherwise.
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("Invalid server address: {}", config.api_bind_addr))?;
    let tls_paths = config
        .tls_paths()
        .map(|(cert, key)| (cert.clone(), key.clone()));
    let profile = config.profile.clone();

    let app = create_app(AppState::new(config, db));

    match tls_paths {
        Some((cert, key)) => {
            // axum-server is built without a default crypto provider.
            let _ = rustls::crypto::ring::default_provider().install_default();

            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert, &key)
                .await
                .with_context(|| {
                    format!(
                        "Failed to load TLS certificate {} / key {}",
                        cert.display(),
                        key.display()
                    )
                })?;

            let handle = axum_server::Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            tracing::info!(%addr, profile = %profile, tls = true, "Server listening");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("TLS server error")?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;

            tracing::info!(%addr, profile = %profile, tls = false, "Server listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::oauth::redirect_link,
        crate::handlers::oauth::authorization,
        crate::handlers::events::receive_event,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::events::EventResponse,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Slack Relay API",
        description = "Slack OAuth installs and Events API ingestion",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
