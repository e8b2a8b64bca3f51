//! # dbrelay: Dropbox upload relay
//!
//! `dbrelay` is a small HTTP service with a single job: take a file, either by public URL or as a
//! base64 payload, and upload it into a Dropbox account using a token held by the server. Browser
//! clients can call it directly, so every response carries permissive CORS headers.
//!
//! ## Request Flow
//!
//! A `POST /api/upload` request goes through a short, strictly sequential pipeline:
//!
//! 1. The configured Dropbox token is checked.
//! 2. The body is parsed as JSON (an empty body counts as `{}`) and `filename` plus one of
//!    `url`/`content` are required.
//! 3. The file bytes are obtained, by downloading `url` or by decoding `content`.
//! 4. The destination path is built from `folder` (or the configured default) and `filename`.
//! 5. The bytes are sent to Dropbox's `files/upload` endpoint in `add` mode with autorename.
//! 6. Dropbox's file metadata is returned as `{"ok": true, "file": ...}`.
//!
//! Failures at any step become a JSON `{"error": ...}` body; see [`errors::Error`] for the status
//! mapping. Nothing is retried and no state is kept between requests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use dbrelay::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = dbrelay::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     dbrelay::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod errors;
mod openapi;
pub mod relay;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;

pub use relay::UploadRelay;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .relay(Arc::new(relay))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub relay: Arc<UploadRelay>,
}

impl AppState {
    /// Builds the state, including the shared HTTP client, from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dbrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let relay = UploadRelay::new(client, &config.dropbox, &config.limits)?;

        Ok(Self::builder().config(config).relay(Arc::new(relay)).build())
    }
}

/// Cross-origin headers, set on every response including errors and pre-flights.
fn cors_headers(config: &Config) -> anyhow::Result<[(header::HeaderName, HeaderValue); 3]> {
    Ok([
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            config.cors.allow_origin.parse::<HeaderValue>()?,
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ),
    ])
}

/// Build the application router with all endpoints and middleware.
///
/// # Errors
///
/// Returns an error if the configured CORS origin is not a valid header value.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::uploads;

    let body_limit = match state.config.limits.max_request_body {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/openapi.json", get(|| async { Json(openapi::ApiDoc::openapi()) }))
        .route(
            "/api/upload",
            post(uploads::upload_file)
                .options(uploads::preflight)
                .fallback(uploads::method_not_allowed)
                .layer(body_limit),
        )
        .with_state(state.clone());

    for (name, value) in cors_headers(&state.config)? {
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The relay server.
///
/// 1. **Create**: [`Application::new`] builds the HTTP client, relay and router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting relay with configuration: {:#?}", config);

        if config.dropbox.access_token().is_none() {
            warn!("DROPBOX_ACCESS_TOKEN is not set; uploads will fail until it is configured");
        }

        let state = AppState::from_config(config.clone())?;
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Upload relay listening on http://{}, uploads at http://localhost:{}/api/upload",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
