// Relay service - stateless pass-through from the uploader to upstream storage
//
// Two endpoints mirror the serverless functions the browser client talks to.
// Every response carries permissive CORS headers.

pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::any,
    Router,
};
use reqwest::Client;
use std::time::Duration;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;
use crate::errors::AppResult;

/// Base64 inflates a 5 MiB chunk to ~6.7 MiB; leave room for larger chunk sizes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct RelayState {
    pub client: Client,
    pub upstream_url: String,
    pub max_body_bytes: usize,
}

impl RelayState {
    pub fn new(upstream_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            upstream_url: upstream_url.into().trim_end_matches('/').to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.upstream_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn upstream_endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.upstream_url, path)
    }
}

pub fn router(state: RelayState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/upload-chunk", any(handlers::upload_chunk))
        .route("/complete-upload", any(handlers::complete_upload))
        .route("/.netlify/functions/upload-chunk", any(handlers::upload_chunk))
        .route(
            "/.netlify/functions/complete-upload",
            any(handlers::complete_upload),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: RelayState) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!(
        "Relay listening on {} (upstream {})",
        listener.local_addr()?,
        state.upstream_url
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
