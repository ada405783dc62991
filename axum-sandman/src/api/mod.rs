//! Admin JSON endpoints
//!
//! Handlers resolve the `{endpoint}` path segment through the registry, so
//! only models with an admin view are reachable.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::admin::AdminView;
use crate::database::{DatabaseError, DatabaseProvider};
use crate::model::Model;
use crate::registry::Registry;

pub mod models;
pub mod rows;

pub use models::{get_model_handler, list_models_handler};
pub use rows::{count_rows_handler, get_rows_handler};

/// State shared by the admin handlers
pub struct ApiState<DB> {
    pub database: Arc<DB>,
    pub registry: Arc<Registry>,
    pub views: Arc<Vec<AdminView>>,
}

// Manual impl: deriving would require `DB: Clone`
impl<DB> Clone for ApiState<DB> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            registry: self.registry.clone(),
            views: self.views.clone(),
        }
    }
}

impl<DB: DatabaseProvider> ApiState<DB> {
    /// The model behind an admin view, if `endpoint` has one
    pub fn resolve(&self, endpoint: &str) -> Option<&Model> {
        if !self.views.iter().any(|view| view.endpoint == endpoint) {
            return None;
        }
        self.registry.by_endpoint(endpoint)
    }
}

/// JSON error body with the given status
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": message.into()
        })),
    )
        .into_response()
}

pub(crate) fn model_not_found(endpoint: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Model not found: {}", endpoint))
}

/// Map a database error to a response, logging it
pub(crate) fn database_error_response(context: &str, error: DatabaseError) -> Response {
    tracing::error!(%error, "{}", context);

    let status = match error {
        DatabaseError::TableNotFound(_) => StatusCode::NOT_FOUND,
        DatabaseError::InvalidColumn(_) => StatusCode::BAD_REQUEST,
        DatabaseError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    error_response(status, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_status() {
        let response = database_error_response("test", DatabaseError::TableNotFound("t".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = database_error_response("test", DatabaseError::InvalidColumn("c".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = database_error_response("test", DatabaseError::Query("boom".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
