//! Catch-all
//!
//! Anything the portal does not serve gets a stock 403 rather than a 404,
//! so scanning cannot map the route table. Each hit is kept as an exploit
//! attempt (path traversal, symlink and config lookups land here).

use axum::extract::State;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use honey_store::ExploitAttempt;

use crate::error::AppError;
use crate::middleware::client::ClientAddr;
use crate::AppState;

pub async fn handler(State(state): State<AppState>, ClientAddr(source_ip): ClientAddr, uri: Uri) -> Response {
    let requested = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let attempt = ExploitAttempt::new(source_ip, requested, Utc::now());
    if let Err(e) = state.sink.record_exploit(&attempt).await {
        tracing::warn!("Failed to record request for {} from {}: {}", attempt.path, attempt.source_ip, e);
    }

    AppError::Forbidden(display_path(uri.path())).into_response()
}

/// Percent-decoded request path, as the stock error page shows it.
fn display_path(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}
