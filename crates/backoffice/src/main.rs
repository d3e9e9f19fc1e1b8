//! Bamboo back office - admin and end-user API server.
//!
//! # Architecture
//!
//! - Axum web framework, JSON API only
//! - `PostgreSQL` (schema `backoffice`) for admins, institutions, end users,
//!   applications, notifications, sessions and the audit log
//! - Cookie sessions (tower-sessions) for admins, bearer tokens for end users
//! - Sentry for error tracking
//!
//! Migrations are NOT run on startup. Run them explicitly:
//! `cargo run -p bamboo-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use serde_json::json;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, OnResponse, TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bamboo_backoffice::config::{BackofficeConfig, TlsConfig};
use bamboo_backoffice::db;
use bamboo_backoffice::middleware::{create_session_layer, request_id_middleware};
use bamboo_backoffice::routes;
use bamboo_backoffice::services::Argon2Hasher;
use bamboo_backoffice::state::AppState;

const DEFAULT_LOG_FILTER: &str = "bamboo_backoffice=info,tower_http=debug";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

fn init_sentry(config: &BackofficeConfig) -> Option<sentry::ClientInitGuard> {
    let sentry = config.sentry.as_ref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: sentry.environment.clone().map(Into::into),
        sample_rate: sentry.sample_rate,
        traces_sample_rate: sentry.traces_sample_rate,
        attach_stacktrace: true,
        // End-user contact details must not leave the service
        send_default_pii: false,
        ..Default::default()
    };
    let guard = sentry::init((sentry.dsn.as_str(), options));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    use sentry_tracing::EventFilter;
    use tracing::Level;

    match *metadata.level() {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    // LOG_FORMAT=json for log shipping
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true)))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Span per request. `request_id` is filled in by the request id middleware.
#[derive(Clone, Copy)]
struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}

#[derive(Clone, Copy)]
struct RecordResponse;

impl<B> OnResponse<B> for RecordResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        span.record("status", response.status().as_u16());
        span.record(
            "latency_ms",
            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        );
        DefaultOnResponse::default().on_response(response, latency, span);
    }
}

fn trace_layer()
-> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan, DefaultOnRequest, RecordResponse>
{
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(RecordResponse)
}

/// Assemble the full application: health checks, API routes and the
/// middleware stack (innermost first).
fn app(state: AppState, sessions: SessionManagerLayer<PostgresStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(sessions)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(trace_layer())
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

async fn serve_tls(app: Router, addr: SocketAddr, tls: TlsConfig) -> Result<(), Box<dyn Error>> {
    let rustls_config = RustlsConfig::from_pem(
        tls.cert_pem.into_bytes(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await?;

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    tracing::info!(%addr, "backoffice listening (https)");
    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn serve_plain(app: Router, addr: SocketAddr) -> Result<(), Box<dyn Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "backoffice listening (http)");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    let config = BackofficeConfig::from_env()?;

    // Sentry before the subscriber so the tracing layer has a client
    let _sentry = init_sentry(&config);
    init_tracing();

    let pool = db::create_pool(&config.database_url).await?;
    let sessions = create_session_layer(&pool, &config)?;
    let addr = config.socket_addr();
    let tls = config.tls.clone();

    let state = AppState::new(config, pool, Arc::new(Argon2Hasher));
    let app = app(state, sessions);

    match tls {
        Some(tls) => serve_tls(app, addr, tls).await,
        None => serve_plain(app, addr).await,
    }
}

/// Liveness check. Never touches the database.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: 503 while the database is unreachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "database": "up" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "database": "down" })),
            )
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
