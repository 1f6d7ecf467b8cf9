//! Router assembly and server startup.

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id, session_auth};
use crate::routes::{api_info, not_found};
use crate::routes::{claims, functions, health, items, matching, pages, session};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use lostfound::LostFoundConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the router.
///
/// Pages and health checks are public; pages decide between rendering and
/// redirecting from the session themselves. Everything under `/api/v1`
/// except sign-in requires a session.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(pages::landing))
        .route("/dashboard", get(pages::dashboard))
        .route("/report-found", get(pages::report_found))
        .route("/report-lost", get(pages::report_lost))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/api/v1", get(api_info))
        .route(
            "/api/v1/session",
            post(session::sign_in).delete(session::sign_out),
        );

    let protected_routes = Router::new()
        .route("/api/v1/me", get(session::me))
        .route("/api/v1/items", get(items::list_items))
        .route("/api/v1/items/feed", get(items::feed))
        .route("/api/v1/items/lost", post(items::report_lost))
        .route("/api/v1/items/found", post(items::report_found))
        .route("/api/v1/items/found/draft", post(items::draft_found))
        .route("/api/v1/items/{id}", get(items::get_item))
        .route("/api/v1/items/{id}/returned", post(items::mark_returned))
        .route("/api/v1/matches", post(matching::find_matches))
        .route("/api/v1/claims", post(claims::open_claim))
        .route(
            "/api/v1/claims/{id}",
            get(claims::get_claim).delete(claims::close_claim),
        )
        .route("/api/v1/claims/{id}/proof", post(claims::submit_proof))
        .route("/api/v1/claims/{id}/retry", post(claims::retry_claim))
        .route(
            "/api/v1/functions/analyze-item-image",
            post(functions::analyze_item_image),
        )
        .route(
            "/api/v1/functions/verify-claim",
            post(functions::verify_claim),
        )
        .layer(from_fn_with_state(state.clone(), session_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the service configuration named by `app_config`, or defaults
/// filled from the environment.
pub fn load_app_config(config: &ServerConfig) -> anyhow::Result<LostFoundConfig> {
    let app = match &config.app_config {
        Some(path) => LostFoundConfig::from_file(path)?,
        None => {
            let mut app = LostFoundConfig::default();
            app.apply_env(|key| std::env::var(key).ok());
            app.validate()?;
            app
        }
    };
    Ok(app)
}

/// Run until SIGTERM or Ctrl+C.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .json()
        .init();

    let app = load_app_config(&config)?;
    tracing::info!(
        name = ?app.name,
        backend = ?app.store.backend,
        provider = ?app.assist.provider,
        domain = %app.auth.allowed_domain,
        "service configuration loaded"
    );

    let state = Arc::new(ServerState::new(config.clone(), app)?);
    let router = build_router(state);
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        %addr,
        timeout_secs = config.timeout_secs,
        max_body_mb = config.max_body_size_mb,
        rate_limit = config.rate_limit_per_minute,
        cors = config.enable_cors,
        metrics = config.metrics_enabled,
        "starting lost & found server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
