//! Admin index page
//!
//! The index is a single server-rendered HTML page listing every admin view
//! with links to its JSON endpoints.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::admin::AdminView;

/// State for the index page
#[derive(Clone)]
pub struct FrontendState {
    pub base_path: Arc<String>,
    pub views: Arc<Vec<AdminView>>,
}

/// Create a router serving the admin index at `/`
///
/// # Arguments
///
/// * `base_path` - The URL path the admin is mounted under (e.g., "/admin")
/// * `views` - The views to list
pub fn create_frontend_router(base_path: String, views: Arc<Vec<AdminView>>) -> Router {
    let state = FrontendState {
        base_path: Arc::new(base_path),
        views,
    };

    Router::new()
        .route("/", get(serve_index_page))
        .with_state(state)
}

async fn serve_index_page(State(state): State<FrontendState>) -> Response {
    let html = render_index(&state.base_path, &state.views);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        html,
    )
        .into_response()
}

/// Escape text for HTML element content and attribute values
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn render_index(base_path: &str, views: &[AdminView]) -> String {
    let rows: String = views
        .iter()
        .map(|view| {
            let api = format!("{}/api/models/{}", base_path, view.endpoint);
            format!(
                "            <tr>\n                <td>{name}</td>\n                <td><code>{table}</code></td>\n                <td><a href=\"{api}\">schema</a> · <a href=\"{api}/rows\">rows</a> · <a href=\"{api}/count\">count</a></td>\n            </tr>\n",
                name = escape_html(&view.name),
                table = escape_html(&view.table_name),
                api = escape_html(&api),
            )
        })
        .collect();

    let body = if views.is_empty() {
        "        <p class=\"empty\">No models are registered for the admin.</p>\n".to_string()
    } else {
        format!(
            "        <table>\n            <tr><th>Model</th><th>Table</th><th>Views</th></tr>\n{}        </table>\n",
            rows
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Admin</title>
    <style>
        body {{
            font-family: system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 900px;
            margin: 60px auto;
            padding: 20px;
            color: #333;
        }}
        table {{
            border-collapse: collapse;
            width: 100%;
        }}
        th, td {{
            text-align: left;
            padding: 8px 12px;
            border-bottom: 1px solid #e9ecef;
        }}
        code {{
            background: #f5f5f5;
            padding: 2px 6px;
            border-radius: 4px;
        }}
        .empty {{
            color: #856404;
            background: #fff3cd;
            padding: 15px 20px;
            border-left: 4px solid #ffc107;
        }}
    </style>
</head>
<body>
    <h1>Admin</h1>
    <p><a href="{models}">All models as JSON</a></p>
{body}</body>
</html>
"#,
        models = escape_html(&format!("{}/api/models", base_path)),
        body = body,
    )
}
