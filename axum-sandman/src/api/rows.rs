//! Row fetching endpoints with pagination

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;

use crate::api::{database_error_response, error_response, model_not_found, ApiState};
use crate::database::DatabaseProvider;
use crate::model::Model;
use crate::registry::Registry;
use crate::schema::{RowQuery, MAX_ROW_LIMIT};

/// Render a primary key value as a single percent-encoded URI segment
fn key_segment(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(urlencoding::encode(text).into_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Attach `_links` to every row of a model with a single-column primary key
fn attach_links(model: &Model, registry: &Registry, rows: &mut [Value]) {
    let primary_key = model.primary_key();
    let [key_column] = primary_key.as_slice() else {
        return;
    };

    for row in rows.iter_mut() {
        let Some(key) = row.get(key_column).and_then(key_segment) else {
            continue;
        };
        let links = model.links(key, |table| {
            registry.endpoint_for_table(table).map(str::to_string)
        });
        if let (Value::Object(map), Ok(links)) = (row, serde_json::to_value(links)) {
            map.insert("_links".to_string(), links);
        }
    }
}

/// Handler for GET {base}/api/models/{endpoint}/rows
///
/// Fetches rows of a model's table with pagination, sorting, and filtering.
///
/// Query parameters:
/// - offset: Starting row offset (default: 0)
/// - limit: Maximum rows to return (default: 100, max: 500)
/// - sortBy: Column name to sort by (optional)
/// - sortOrder: "ascending" or "descending" (optional, default: "ascending")
/// - filter[column]: Filter value for a column (supports % wildcards); a bare
///   `column=value` works too
///
/// Each row carries `_links` when the table has a single-column primary key.
pub async fn get_rows_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(endpoint): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let Some(model) = state.resolve(&endpoint) else {
        return model_not_found(&endpoint);
    };

    let mut query = match RowQuery::from_pairs(pairs) {
        Ok(query) => query,
        Err(error) => return error_response(StatusCode::BAD_REQUEST, error.to_string()),
    };
    query.limit = query.limit.min(MAX_ROW_LIMIT);

    match state.database.get_rows(model.table_name(), query).await {
        Ok(mut response) => {
            attach_links(model, &state.registry, &mut response.rows);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => database_error_response(
            &format!("failed to get rows for model '{}'", endpoint),
            error,
        ),
    }
}

/// Handler for GET {base}/api/models/{endpoint}/count
///
/// Returns the total row count of a model's table, with filters applied.
/// Takes the same filter parameters as [`get_rows_handler`].
pub async fn count_rows_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(endpoint): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let Some(model) = state.resolve(&endpoint) else {
        return model_not_found(&endpoint);
    };

    let query = match RowQuery::from_pairs(pairs) {
        Ok(query) => query,
        Err(error) => return error_response(StatusCode::BAD_REQUEST, error.to_string()),
    };

    match state.database.count_rows(model.table_name(), &query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => database_error_response(
            &format!("failed to count rows for model '{}'", endpoint),
            error,
        ),
    }
}
