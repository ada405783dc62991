//! Admin interface
//!
//! An [`Admin`] collects one [`AdminView`] per model and turns them into an
//! Axum router that can be merged into an application.

use crate::api::{count_rows_handler, get_model_handler, get_rows_handler, list_models_handler, ApiState};
use crate::database::DatabaseProvider;
use crate::frontend::create_frontend_router;
use crate::model::Model;
use crate::registry::Registry;
use axum::{routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// One model exposed in the admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    /// Title shown in the admin
    pub name: String,

    /// Endpoint of the model the view is bound to
    pub endpoint: String,

    pub table_name: String,
}

impl AdminView {
    pub fn from_model(model: &Model) -> Self {
        Self {
            name: model.name().to_string(),
            endpoint: model.endpoint(),
            table_name: model.table_name().to_string(),
        }
    }
}

/// The admin interface, mounted under a base path
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_sandman::{Admin, AdminView, Model, Registry, SqliteProvider};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
/// let mut registry = Registry::new();
/// registry.register(Model::new("artist"), true).unwrap();
///
/// let mut admin = Admin::new("/admin");
/// admin.add_view(AdminView::from_model(registry.by_table("artist").unwrap()));
///
/// let app: Router = admin.into_router(Arc::new(registry), Arc::new(SqliteProvider::new(pool)));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Admin {
    base_path: String,
    views: Vec<AdminView>,
}

impl Admin {
    /// Create an admin mounted at `base_path` (e.g. "/admin")
    pub fn new(base_path: impl Into<String>) -> Self {
        let base_path = base_path.into().trim_end_matches('/').to_string();
        Self {
            base_path,
            views: Vec::new(),
        }
    }

    /// Add a view; a second view for the same endpoint replaces the first
    pub fn add_view(&mut self, view: AdminView) {
        match self.views.iter_mut().find(|existing| existing.endpoint == view.endpoint) {
            Some(existing) => *existing = view,
            None => self.views.push(view),
        }
    }

    pub fn views(&self) -> &[AdminView] {
        &self.views
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router includes:
    /// - The admin index at `{base_path}/`
    /// - JSON views at `{base_path}/api/models/*`
    /// - Permissive CORS middleware for development
    pub fn into_router<DB: DatabaseProvider>(self, registry: Arc<Registry>, database: Arc<DB>) -> Router {
        tracing::info!(
            base_path = %self.base_path,
            views = self.views.len(),
            "mounting admin"
        );

        let views = Arc::new(self.views);
        let state = ApiState {
            database,
            registry,
            views: views.clone(),
        };

        // Axum 0.8 uses {param} syntax
        let api_router = Router::new()
            .route("/models", get(list_models_handler::<DB>))
            .route("/models/{endpoint}", get(get_model_handler::<DB>))
            .route("/models/{endpoint}/rows", get(get_rows_handler::<DB>))
            .route("/models/{endpoint}/count", get(count_rows_handler::<DB>))
            .with_state(state);

        let frontend_router = create_frontend_router(self.base_path.clone(), views);

        // Axum refuses to nest at the root, so a root-mounted admin is merged instead
        let router = if self.base_path.is_empty() {
            Router::new()
                .nest("/api", api_router)
                .merge(frontend_router)
        } else {
            Router::new()
                .nest(&format!("{}/api", self.base_path), api_router)
                .nest(&self.base_path, frontend_router)
        };

        router.layer(CorsLayer::permissive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_trailing_slash_is_dropped() {
        assert_eq!(Admin::new("/admin/").base_path(), "/admin");
        assert_eq!(Admin::new("/").base_path(), "");
    }

    #[test]
    fn test_add_view_replaces_same_endpoint() {
        let mut admin = Admin::new("/admin");
        admin.add_view(AdminView::from_model(&Model::new("artist")));
        admin.add_view(AdminView::from_model(&Model::new("album")));
        admin.add_view(AdminView::from_model(&Model::new("artist").with_name("Artist")));

        let names: Vec<_> = admin.views().iter().map(|view| view.name.as_str()).collect();
        assert_eq!(names, vec!["Artist", "album"]);
    }

    #[cfg(feature = "sqlite")]
    mod routes {
        use super::*;
        use crate::activate::{activate, ActivateOptions};
        use crate::database::sqlite::tests::music_pool;
        use crate::database::sqlite::SqliteProvider;
        use axum::body::{to_bytes, Body};
        use axum::http::{Request, StatusCode};
        use serde_json::Value;
        use tower::ServiceExt;

        async fn admin_router(registry: Registry) -> Router {
            mounted_router(registry, "/admin").await
        }

        async fn mounted_router(registry: Registry, admin_path: &str) -> Router {
            let provider = SqliteProvider::new(music_pool().await);
            let options = ActivateOptions {
                browser: false,
                admin_path: admin_path.to_string(),
                ..ActivateOptions::default()
            };
            activate(registry, &provider, &options)
                .await
                .unwrap()
                .into_router(provider)
        }

        async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
            let response = router
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, body.to_vec())
        }

        async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
            let (status, body) = get(router, uri).await;
            (status, serde_json::from_slice(&body).unwrap())
        }

        #[tokio::test]
        async fn test_index_page() {
            let (status, body) = get(admin_router(Registry::new()).await, "/admin").await;
            assert_eq!(status, StatusCode::OK);

            let html = String::from_utf8(body).unwrap();
            assert!(html.contains("/admin/api/models/track/rows"));
        }

        #[tokio::test]
        async fn test_list_models() {
            let (status, body) = get_json(admin_router(Registry::new()).await, "/admin/api/models").await;
            assert_eq!(status, StatusCode::OK);

            let endpoints: Vec<_> = body["models"]
                .as_array()
                .unwrap()
                .iter()
                .map(|model| model["endpoint"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(endpoints, vec!["album", "artist", "genre", "track"]);
            assert_eq!(body["models"][0]["relatedTables"], serde_json::json!(["artist"]));
        }

        #[tokio::test]
        async fn test_model_detail() {
            let (status, body) =
                get_json(admin_router(Registry::new()).await, "/admin/api/models/album").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["tableName"], "album");
            assert_eq!(body["primaryKey"], serde_json::json!(["AlbumId"]));
            assert_eq!(body["schema"]["columns"].as_array().unwrap().len(), 3);

            let attributes: Vec<_> = body["relationships"]
                .as_array()
                .unwrap()
                .iter()
                .map(|relationship| relationship["attribute"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(attributes, vec!["artist", "track"]);
        }

        #[tokio::test]
        async fn test_rows_carry_links() {
            let (status, body) = get_json(
                admin_router(Registry::new()).await,
                "/admin/api/models/album/rows?sortBy=AlbumId&sortOrder=descending&limit=2",
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["total"], 3);
            assert_eq!(body["hasMore"], true);
            assert_eq!(body["rows"][0]["AlbumId"], 3);
            assert_eq!(body["rows"][0]["_links"][0]["uri"], "/album/3");
            assert_eq!(body["rows"][0]["_links"][1]["uri"], "/artist");
        }

        #[tokio::test]
        async fn test_count() {
            let (status, body) =
                get_json(admin_router(Registry::new()).await, "/admin/api/models/track/count").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["count"], 3);
        }

        #[tokio::test]
        async fn test_links_do_not_follow_the_admin_path() {
            let (status, body) = get_json(
                mounted_router(Registry::new(), "/manage").await,
                "/manage/api/models/artist/rows?ArtistId=1",
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["rows"][0]["_links"][0]["uri"], "/artist/1");
        }

        #[tokio::test]
        async fn test_filtered_count() {
            let router = admin_router(Registry::new()).await;

            for uri in [
                "/admin/api/models/album/count?filter[ArtistId]=1",
                "/admin/api/models/album/count?filter%5BArtistId%5D=1",
                "/admin/api/models/album/count?filters[ArtistId]=1",
                "/admin/api/models/album/count?ArtistId=1",
            ] {
                let (status, body) = get_json(router.clone(), uri).await;
                assert_eq!(status, StatusCode::OK, "{}", uri);
                assert_eq!(body["count"], 2, "{}", uri);
            }

            let (status, body) =
                get_json(router, "/admin/api/models/track/count?filter[Name]=%25Dog%25").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["count"], 1);
        }

        #[tokio::test]
        async fn test_filtered_rows() {
            let (status, body) = get_json(
                admin_router(Registry::new()).await,
                "/admin/api/models/album/rows?filter[ArtistId]=1&sortBy=Title",
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["total"], 2);
            assert_eq!(body["hasMore"], false);

            let titles: Vec<_> = body["rows"]
                .as_array()
                .unwrap()
                .iter()
                .map(|row| row["Title"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(titles, vec!["For Those About To Rock", "Let There Be Rock"]);
        }

        #[tokio::test]
        async fn test_unknown_filter_column_is_bad_request() {
            let router = admin_router(Registry::new()).await;

            let (status, body) = get_json(router.clone(), "/admin/api/models/album/count?filters=ArtistId").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid column: filters");

            let (status, _) = get_json(router, "/admin/api/models/album/rows?filter[Nope]=1").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_offset_past_the_end() {
            let router = admin_router(Registry::new()).await;

            let (status, body) = get_json(router.clone(), "/admin/api/models/album/rows?offset=10").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["rows"], serde_json::json!([]));
            assert_eq!(body["total"], 3);
            assert_eq!(body["hasMore"], false);

            let (status, body) = get_json(
                router.clone(),
                "/admin/api/models/album/rows?offset=18446744073709551615",
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["rows"], serde_json::json!([]));
            assert_eq!(body["hasMore"], false);

            let (status, body) = get_json(router.clone(), "/admin/api/models/album/rows?offset=-1").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid value for 'offset': -1");

            let (status, _) = get_json(router, "/admin/api/models/album/rows?offset=18446744073709551616").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_invalid_sort_column_is_bad_request() {
            let (status, body) = get_json(
                admin_router(Registry::new()).await,
                "/admin/api/models/album/rows?sortBy=Nope",
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid column: Nope");
        }

        #[tokio::test]
        async fn test_models_without_admin_view_are_hidden() {
            let mut registry = Registry::new();
            registry
                .register_all([Model::new("artist"), Model::new("genre")], true)
                .unwrap();
            registry.register(Model::new("album"), false).unwrap();

            let router = admin_router(registry).await;

            let (status, _) = get_json(router.clone(), "/admin/api/models/album").await;
            assert_eq!(status, StatusCode::NOT_FOUND);

            let (status, body) = get_json(router, "/admin/api/models/unknown/rows").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "Model not found: unknown");
        }
    }
}
