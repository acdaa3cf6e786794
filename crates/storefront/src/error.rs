//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::assets::AssetError;
use crate::catalog::CatalogError;
use crate::search::SearchError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Product lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Image lookup failed.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Search index call failed.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(CatalogError::RecordNotFound(_))
            | Self::Asset(AssetError::AssetNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::BackingStoreUnavailable(_))
            | Self::Asset(AssetError::BackendUnavailable(_))
            | Self::Search(SearchError::Unavailable(_) | SearchError::Timeout(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Search(SearchError::QueryFailed(_)) => StatusCode::BAD_GATEWAY,
            Self::Search(SearchError::Translation(_)) => StatusCode::BAD_REQUEST,
            Self::Catalog(CatalogError::Decode { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Catalog(CatalogError::RecordNotFound(_)) => "Product not found".to_string(),
            Self::Asset(AssetError::AssetNotFound(_)) => "Image not found".to_string(),
            Self::Search(SearchError::Translation(err)) => err.to_string(),
            Self::Search(SearchError::QueryFailed(_)) => "Search service error".to_string(),
            _ if status == StatusCode::SERVICE_UNAVAILABLE => "Service unavailable".to_string(),
            _ => "Internal server error".to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("search", "Searched products", Some(&[("q", "shirt")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
