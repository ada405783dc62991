//! Schema types for runtime database reflection
//!
//! These types describe what the database reports about its tables. They are
//! produced by a [`DatabaseProvider`](crate::DatabaseProvider) and attached to
//! registered models during activation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Maximum number of rows a single page may contain
pub const MAX_ROW_LIMIT: u64 = 500;

/// Complete schema information for a database table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Name of the table
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,

    /// Primary key column names in key order (if any)
    pub primary_key: Option<Vec<String>>,

    /// Foreign key constraints, one entry per referencing column
    pub foreign_keys: Vec<ForeignKey>,

    /// Index definitions
    pub indexes: Vec<IndexInfo>,
}

impl TableSchema {
    /// Whether the table has a column with the given name
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }
}

/// Information about a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// SQL data type (e.g., "INTEGER", "TEXT", "VARCHAR(255)")
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Default value expression (if any)
    pub default_value: Option<String>,

    /// Whether this column is part of the primary key
    pub is_primary_key: bool,
}

/// Foreign key column information
///
/// Multi-column constraints are reported as several entries sharing the same
/// `constraint` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Identifier of the constraint this column belongs to
    pub constraint: String,

    /// Column name in this table
    pub column: String,

    /// Referenced table name
    pub references_table: String,

    /// Referenced column name
    pub references_column: String,
}

/// Index information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Index name
    pub name: String,

    /// Columns included in the index
    pub columns: Vec<String>,

    /// Whether the index enforces uniqueness
    pub unique: bool,
}

/// Information about a table (for listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Table name
    pub name: String,

    /// Row count (if available)
    pub row_count: Option<u64>,
}

/// Query parameters for fetching rows
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowQuery {
    /// Starting offset for pagination
    #[serde(default)]
    pub offset: u64,

    /// Maximum number of rows to return
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Column name to sort by
    pub sort_by: Option<String>,

    /// Sort order
    pub sort_order: Option<SortOrder>,

    /// Column filters (column_name -> filter_value)
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl Default for RowQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
            sort_by: None,
            sort_order: None,
            filters: HashMap::new(),
        }
    }
}

impl RowQuery {
    /// Build a query from the raw pairs of a query string
    ///
    /// `offset`, `limit`, `sortBy` and `sortOrder` are reserved. Filters are
    /// written `filter[column]=value`; any other key is taken as the name of
    /// a column to filter on, so a misspelt parameter is rejected as an
    /// unknown column instead of being ignored.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, RowQueryError> {
        let mut query = RowQuery::default();

        for (key, value) in pairs {
            match key.as_str() {
                "offset" => query.offset = parse_number(&key, &value)?,
                "limit" => query.limit = parse_number(&key, &value)?,
                "sortBy" => query.sort_by = Some(value),
                "sortOrder" => query.sort_order = Some(value.parse()?),
                _ => {
                    query.filters.insert(filter_column(&key).to_string(), value);
                }
            }
        }

        Ok(query)
    }

    /// The page size actually used, capped at [`MAX_ROW_LIMIT`]
    pub fn effective_limit(&self) -> u64 {
        self.limit.min(MAX_ROW_LIMIT)
    }

    /// The offset actually used; SQL offsets are signed 64-bit integers
    pub fn effective_offset(&self) -> u64 {
        self.offset.min(i64::MAX as u64)
    }

    /// Whether rows remain after a page of `returned` rows out of `total`
    pub fn has_more(&self, returned: usize, total: u64) -> bool {
        self.effective_offset().saturating_add(returned as u64) < total
    }
}

/// A query string that cannot be turned into a [`RowQuery`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowQueryError {
    #[error("Invalid value for '{name}': {value}")]
    InvalidNumber { name: String, value: String },

    #[error("Invalid sort order: {0}")]
    InvalidSortOrder(String),
}

fn parse_number(name: &str, value: &str) -> Result<u64, RowQueryError> {
    value.parse().map_err(|_| RowQueryError::InvalidNumber {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// `filter[Name]` and `filters[Name]` name the column `Name`
fn filter_column(key: &str) -> &str {
    ["filter[", "filters["]
        .iter()
        .find_map(|prefix| key.strip_prefix(prefix)?.strip_suffix(']'))
        .unwrap_or(key)
}

fn default_limit() -> u64 {
    100
}

/// Sort order for row queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl std::str::FromStr for SortOrder {
    type Err = RowQueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortOrder::Ascending),
            "descending" | "desc" => Ok(SortOrder::Descending),
            _ => Err(RowQueryError::InvalidSortOrder(value.to_string())),
        }
    }
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Response containing table rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsResponse {
    /// The rows returned
    pub rows: Vec<serde_json::Value>,

    /// Column names in the result
    pub columns: Vec<String>,

    /// Total number of rows in the table (with filters applied)
    pub total: u64,

    /// Current offset
    pub offset: u64,

    /// Limit used for this query
    pub limit: u64,

    /// Whether there are more rows available
    pub has_more: bool,
}

/// Response for row count queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    /// Total number of rows
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_query_defaults() {
        let query: RowQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, 100);
        assert!(query.sort_by.is_none());
        assert!(query.filters.is_empty());
    }

    #[test]
    fn test_effective_limit_is_capped() {
        let query = RowQuery {
            limit: 10_000,
            ..RowQuery::default()
        };
        assert_eq!(query.effective_limit(), MAX_ROW_LIMIT);
    }

    fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_from_pairs_collects_filters() {
        let query = RowQuery::from_pairs(pairs(&[
            ("offset", "20"),
            ("limit", "5"),
            ("sortBy", "Name"),
            ("sortOrder", "descending"),
            ("filter[ArtistId]", "1"),
            ("filters[Title]", "Let%"),
            ("GenreId", "2"),
        ]))
        .unwrap();

        assert_eq!(query.offset, 20);
        assert_eq!(query.limit, 5);
        assert_eq!(query.sort_by.as_deref(), Some("Name"));
        assert_eq!(query.sort_order, Some(SortOrder::Descending));
        assert_eq!(query.filters.len(), 3);
        assert_eq!(query.filters["ArtistId"], "1");
        assert_eq!(query.filters["Title"], "Let%");
        assert_eq!(query.filters["GenreId"], "2");
    }

    #[test]
    fn test_from_pairs_rejects_bad_values() {
        let error = RowQuery::from_pairs(pairs(&[("offset", "-1")])).unwrap_err();
        assert_eq!(
            error,
            RowQueryError::InvalidNumber {
                name: "offset".to_string(),
                value: "-1".to_string()
            }
        );

        let error = RowQuery::from_pairs(pairs(&[("sortOrder", "sideways")])).unwrap_err();
        assert_eq!(error, RowQueryError::InvalidSortOrder("sideways".to_string()));
    }

    #[test]
    fn test_offset_bounds() {
        let query = RowQuery {
            offset: u64::MAX,
            ..RowQuery::default()
        };
        assert_eq!(query.effective_offset(), i64::MAX as u64);
        assert!(!query.has_more(usize::MAX, u64::MAX - 1));

        let query = RowQuery {
            offset: 1,
            ..RowQuery::default()
        };
        assert!(query.has_more(1, 3));
        assert!(!query.has_more(2, 3));
    }

    #[test]
    fn test_schema_serializes_camel_case() {
        let schema = TableSchema {
            name: "track".to_string(),
            columns: vec![ColumnInfo {
                name: "TrackId".to_string(),
                data_type: "INTEGER".to_string(),
                nullable: false,
                default_value: None,
                is_primary_key: true,
            }],
            primary_key: Some(vec!["TrackId".to_string()]),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        };

        let value = serde_json::to_value(&schema).unwrap();
        assert!(value.get("primaryKey").is_some());
        assert!(value.get("foreignKeys").is_some());
        assert_eq!(value["columns"][0]["isPrimaryKey"], true);
        assert!(schema.has_column("TrackId"));
        assert!(!schema.has_column("Name"));
    }
}
