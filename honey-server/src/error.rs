//! Error handling
//!
//! Nothing a handler fails at is ever shown to the caller. Every error
//! renders as the stock forbidden page, exactly like an unknown path.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::pages;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Path is not part of the portal
    #[error("forbidden path {0}")]
    Forbidden(String),

    /// A static file could not be read
    #[error("asset {path} unavailable: {source}")]
    AssetUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    fn request_path(&self) -> &str {
        match self {
            AppError::Forbidden(path) => path,
            AppError::AssetUnavailable { path, .. } => path,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Forbidden(path) => tracing::debug!("Forbidden: {}", path),
            AppError::AssetUnavailable { .. } => tracing::warn!("{}", self),
        }

        pages::forbidden(self.request_path())
    }
}
