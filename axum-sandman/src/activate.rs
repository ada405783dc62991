//! Activation
//!
//! Activation turns a registry into something servable: it reflects the
//! database, wires relationships and mounts the admin.

use crate::admin::{Admin, AdminView};
use crate::database::DatabaseProvider;
use crate::model::Model;
use crate::registry::Registry;
use crate::relationships::prepare_relationships;
use crate::Result;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

/// What [`activate`] should do besides reflecting the schema
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivateOptions {
    /// Mount an admin view for every model registered with `use_admin`
    pub admin: bool,

    /// Open the admin in the system browser once it is mounted
    pub browser: bool,

    /// Infer relationships from foreign keys
    pub relationships: bool,

    /// Path the admin is mounted under
    pub admin_path: String,

    /// Public base URL of the server, used for the browser launch
    pub public_url: String,
}

impl Default for ActivateOptions {
    fn default() -> Self {
        Self {
            admin: true,
            browser: true,
            relationships: true,
            admin_path: "/admin".to_string(),
            public_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

impl ActivateOptions {
    /// Full URL of the admin index
    pub fn admin_url(&self) -> String {
        format!(
            "{}{}",
            self.public_url.trim_end_matches('/'),
            self.admin_path
        )
    }
}

/// The result of [`activate`]: a populated registry and, optionally, an admin
pub struct Activation {
    registry: Arc<Registry>,
    admin: Option<Admin>,
}

impl Activation {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn admin(&self) -> Option<&Admin> {
        self.admin.as_ref()
    }

    /// Build the router serving the admin (empty when the admin is disabled)
    pub fn into_router<DB: DatabaseProvider>(self, database: DB) -> Router {
        self.into_router_shared(Arc::new(database))
    }

    /// Like [`Activation::into_router`] for a provider that is already shared
    pub fn into_router_shared<DB: DatabaseProvider>(self, database: Arc<DB>) -> Router {
        match self.admin {
            Some(admin) => admin.into_router(self.registry, database),
            None => Router::new(),
        }
    }
}

/// Activate every registered model
///
/// An empty registry is filled with one model per table in the database,
/// each registered with its admin view enabled. Otherwise the declared
/// models have their tables reflected, which fails if a table is missing.
pub async fn activate<DB: DatabaseProvider>(
    mut registry: Registry,
    database: &DB,
    options: &ActivateOptions,
) -> Result<Activation> {
    if registry.is_empty() {
        let tables = database.list_tables().await?;
        tracing::info!(count = tables.len(), "reflecting all tables");

        for table in tables {
            let schema = database.get_table_schema(&table.name).await?;
            let model = unclaimed_endpoint(&registry, Model::new(table.name).with_schema(schema));
            registry.register(model, true)?;
        }
    } else {
        tracing::info!(count = registry.len(), "preparing declared models");

        for model in registry.models_mut() {
            let schema = database.get_table_schema(model.table_name()).await?;
            model.schema = Some(schema);
        }
    }

    if options.relationships {
        prepare_relationships(&mut registry, database).await?;
    }

    let admin = if options.admin {
        let mut admin = Admin::new(options.admin_path.clone());
        for model in registry.admin_models() {
            admin.add_view(AdminView::from_model(model));
        }

        if options.browser {
            open_browser(&options.admin_url());
        }
        Some(admin)
    } else {
        None
    };

    Ok(Activation {
        registry: Arc::new(registry),
        admin,
    })
}

/// Move a reflected model off an endpoint another table already serves
///
/// Tables whose names differ only in case share a default endpoint. The
/// later one gets its exact table name, or failing that a numbered suffix.
fn unclaimed_endpoint(registry: &Registry, model: Model) -> Model {
    let endpoint = model.endpoint();
    let Some(owner) = registry.by_endpoint(&endpoint) else {
        return model;
    };

    let mut candidates = std::iter::once(model.table_name().to_string())
        .chain((2..).map(|suffix| format!("{}_{}", endpoint, suffix)));
    match candidates.find(|candidate| registry.by_endpoint(candidate).is_none()) {
        Some(candidate) => {
            tracing::warn!(
                table = %model.table_name(),
                %endpoint,
                owner = %owner.table_name(),
                replacement = %candidate,
                "endpoint already taken, using replacement"
            );
            model.with_endpoint(candidate)
        }
        None => model,
    }
}

fn open_browser(url: &str) {
    match open::that_detached(url) {
        Ok(()) => tracing::info!(%url, "opened admin in browser"),
        Err(error) => tracing::warn!(%url, %error, "failed to open browser"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseError;
    use crate::schema::{CountResponse, RowQuery, RowsResponse, TableInfo, TableSchema};
    use async_trait::async_trait;

    /// Catalog with tables whose names differ only in case, as PostgreSQL allows
    struct CaseSensitiveCatalog {
        tables: Vec<&'static str>,
    }

    #[async_trait]
    impl DatabaseProvider for CaseSensitiveCatalog {
        async fn list_tables(&self) -> std::result::Result<Vec<TableInfo>, DatabaseError> {
            Ok(self
                .tables
                .iter()
                .map(|name| TableInfo {
                    name: name.to_string(),
                    row_count: None,
                })
                .collect())
        }

        async fn get_table_schema(&self, table: &str) -> std::result::Result<TableSchema, DatabaseError> {
            Ok(TableSchema {
                name: table.to_string(),
                columns: Vec::new(),
                primary_key: None,
                foreign_keys: Vec::new(),
                indexes: Vec::new(),
            })
        }

        async fn get_rows(&self, table: &str, _query: RowQuery) -> std::result::Result<RowsResponse, DatabaseError> {
            Err(DatabaseError::TableNotFound(table.to_string()))
        }

        async fn count_rows(&self, table: &str, _query: &RowQuery) -> std::result::Result<CountResponse, DatabaseError> {
            Err(DatabaseError::TableNotFound(table.to_string()))
        }
    }

    #[tokio::test]
    async fn test_tables_differing_in_case_get_distinct_endpoints() {
        let catalog = CaseSensitiveCatalog {
            tables: vec!["ARTIST", "Artist", "artist"],
        };
        let options = ActivateOptions {
            browser: false,
            ..ActivateOptions::default()
        };
        let activation = activate(Registry::new(), &catalog, &options).await.unwrap();
        let registry = activation.registry();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.endpoint_for_table("ARTIST"), Some("artist"));
        assert_eq!(registry.endpoint_for_table("Artist"), Some("Artist"));
        assert_eq!(registry.endpoint_for_table("artist"), Some("artist_2"));
        assert_eq!(activation.admin().unwrap().views().len(), 3);
    }
}
