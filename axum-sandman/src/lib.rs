//! # axum-sandman
//!
//! Point it at an existing SQL database and get an admin surface for it,
//! mountable as an Axum router.
//!
//! ## Features
//!
//! - Reflection of every table in the bound database, or of hand-declared models
//! - Registration table mapping endpoints, tables and models
//! - Relationship inference from foreign keys (many-to-one plus backref)
//! - Admin index and JSON views with pagination, sorting and filtering
//! - Support for SQLite and PostgreSQL
//!
//! ## Security Warning
//!
//! **This is a development tool only!** There is no authentication and the
//! admin exposes every registered table.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::Router;
//! use axum_sandman::{activate, ActivateOptions, Registry, SqliteProvider};
//! use sqlx::SqlitePool;
//!
//! # async fn example() -> axum_sandman::Result<()> {
//! let pool = SqlitePool::connect("sqlite:chinook.db").await.unwrap();
//! let database = SqliteProvider::new(pool);
//!
//! // An empty registry reflects every table in the database
//! let options = ActivateOptions { browser: false, ..ActivateOptions::default() };
//! let activation = activate(Registry::new(), &database, &options).await?;
//!
//! let app = Router::new().merge(activation.into_router(database));
//! # Ok(())
//! # }
//! ```

pub mod activate;
pub mod admin;
pub mod api;
pub mod database;
pub mod frontend;
pub mod model;
pub mod registry;
pub mod relationships;
pub mod schema;

pub use activate::{activate, ActivateOptions, Activation};
pub use admin::{Admin, AdminView};
pub use model::{Direction, Link, Method, Model, Relationship};
pub use registry::Registry;
pub use relationships::prepare_relationships;
pub use schema::{ColumnInfo, ForeignKey, IndexInfo, TableSchema};

pub use database::traits::{DatabaseError, DatabaseProvider};

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
pub use database::postgres::PostgresProvider;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("endpoint '{endpoint}' is already served by table '{table}'")]
    EndpointConflict { endpoint: String, table: String },

    #[error("table '{table}' references '{referenced}', which has no registered model")]
    UnregisteredTable { table: String, referenced: String },
}

pub type Result<T> = std::result::Result<T, Error>;
