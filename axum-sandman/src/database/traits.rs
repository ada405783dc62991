//! Database provider trait
//!
//! This trait is the reflection seam: everything the crate knows about a
//! database comes through it.

use crate::schema::{CountResponse, ForeignKey, RowQuery, RowsResponse, TableInfo, TableSchema};
use async_trait::async_trait;
use thiserror::Error;

/// Database provider trait for schema reflection and data access
///
/// Implementations of this trait provide database-specific logic for
/// discovering schema information and fetching data.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// List all user tables in the database, ordered by name
    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError>;

    /// Get schema information for a specific table
    ///
    /// # Arguments
    ///
    /// * `table` - Name of the table
    ///
    /// # Returns
    ///
    /// Complete schema information including columns, keys, and indexes
    async fn get_table_schema(&self, table: &str) -> Result<TableSchema, DatabaseError>;

    /// Get the foreign keys declared on a table
    ///
    /// Providers with a cheaper catalog query may override this.
    async fn get_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, DatabaseError> {
        Ok(self.get_table_schema(table).await?.foreign_keys)
    }

    /// Fetch rows with pagination, sorting, and filtering
    ///
    /// # Arguments
    ///
    /// * `table` - Name of the table
    /// * `query` - Query parameters (pagination, sorting, filters)
    async fn get_rows(&self, table: &str, query: RowQuery) -> Result<RowsResponse, DatabaseError>;

    /// Get total row count for a table (with optional filters)
    async fn count_rows(&self, table: &str, query: &RowQuery) -> Result<CountResponse, DatabaseError>;
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Generic database error
    #[error("Database error: {0}")]
    Query(String),

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Invalid column name
    #[error("Invalid column: {0}")]
    InvalidColumn(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::Query(error.to_string())
    }
}
