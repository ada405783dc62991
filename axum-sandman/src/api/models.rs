//! Model listing and detail endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::api::{model_not_found, ApiState};
use crate::database::DatabaseProvider;
use crate::model::{Method, Model, Relationship};
use crate::schema::TableSchema;

/// A model as listed in the admin
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub name: String,
    pub endpoint: String,
    pub table_name: String,
    pub methods: Vec<Method>,
    pub primary_key: Vec<String>,
    pub related_tables: Vec<String>,
}

impl From<&Model> for ModelSummary {
    fn from(model: &Model) -> Self {
        Self {
            name: model.name().to_string(),
            endpoint: model.endpoint(),
            table_name: model.table_name().to_string(),
            methods: model.methods().collect(),
            primary_key: model.primary_key(),
            related_tables: model.related_tables().map(str::to_string).collect(),
        }
    }
}

/// Response from listing models
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub models: Vec<ModelSummary>,
}

/// Full description of one model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDetail {
    #[serde(flatten)]
    pub summary: ModelSummary,
    pub schema: Option<TableSchema>,
    pub relationships: Vec<Relationship>,
}

/// Handler for GET {base}/api/models
///
/// Lists the models that have an admin view, in view order.
pub async fn list_models_handler<DB: DatabaseProvider>(State(state): State<ApiState<DB>>) -> Response {
    let models = state
        .views
        .iter()
        .filter_map(|view| state.registry.by_endpoint(&view.endpoint))
        .map(ModelSummary::from)
        .collect();

    (StatusCode::OK, Json(ModelsResponse { models })).into_response()
}

/// Handler for GET {base}/api/models/{endpoint}
///
/// Returns the reflected schema, primary key and relationships of a model.
pub async fn get_model_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(endpoint): Path<String>,
) -> Response {
    let Some(model) = state.resolve(&endpoint) else {
        return model_not_found(&endpoint);
    };

    let detail = ModelDetail {
        summary: ModelSummary::from(model),
        schema: model.schema().cloned(),
        relationships: model.relationships().cloned().collect(),
    };

    (StatusCode::OK, Json(detail)).into_response()
}
