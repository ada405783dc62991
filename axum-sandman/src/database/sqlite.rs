//! SQLite database provider implementation

use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::schema::{
    ColumnInfo, CountResponse, ForeignKey, IndexInfo, RowQuery, RowsResponse, SortOrder,
    TableInfo, TableSchema,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use std::collections::HashMap;

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Quote an identifier (table or column name)
    ///
    /// SQLite uses double quotes for identifiers; embedded double quotes are
    /// doubled.
    fn quote_identifier(identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Convert a SQLite row to a JSON object
    fn row_to_json(row: &SqliteRow) -> Result<Value, DatabaseError> {
        let mut map = serde_json::Map::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(Value::Object(map))
    }

    /// Extract a column value from a SQLite row and convert to JSON
    fn extract_column_value(
        row: &SqliteRow,
        column: &sqlx::sqlite::SqliteColumn,
    ) -> Result<Value, DatabaseError> {
        let ordinal = column.ordinal();

        if row
            .try_get_raw(ordinal)
            .map_err(|e| DatabaseError::Query(e.to_string()))?
            .is_null()
        {
            return Ok(Value::Null);
        }

        // SQLite reports affinities; declared types only narrow the first guess
        let declared = column.type_info().name().to_uppercase();
        match declared.as_str() {
            "BOOLEAN" | "BOOL" => {
                if let Ok(value) = row.try_get::<bool, _>(ordinal) {
                    return Ok(Value::Bool(value));
                }
            }
            "BLOB" => {
                if let Ok(value) = row.try_get::<Vec<u8>, _>(ordinal) {
                    return Ok(Value::String(format!("[BLOB: {} bytes]", value.len())));
                }
            }
            _ => {}
        }

        if let Ok(value) = row.try_get::<i64, _>(ordinal) {
            return Ok(Value::Number(value.into()));
        }
        if let Ok(value) = row.try_get::<f64, _>(ordinal) {
            if let Some(number) = serde_json::Number::from_f64(value) {
                return Ok(Value::Number(number));
            }
        }
        if let Ok(value) = row.try_get::<String, _>(ordinal) {
            return Ok(Value::String(value));
        }
        if let Ok(value) = row.try_get::<Vec<u8>, _>(ordinal) {
            return Ok(Value::String(format!("[BLOB: {} bytes]", value.len())));
        }

        Ok(Value::Null)
    }

    /// Build a WHERE clause from filters
    ///
    /// Values containing `%` are matched with LIKE, everything else with `=`.
    /// Columns are visited in sorted order so the clause is deterministic.
    fn build_where_clause(filters: &HashMap<String, String>) -> (String, Vec<String>) {
        if filters.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut entries: Vec<_> = filters.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut conditions = Vec::new();
        let mut values = Vec::new();

        for (column, filter_value) in entries {
            let operator = if filter_value.contains('%') { "LIKE" } else { "=" };
            conditions.push(format!("{} {} ?", Self::quote_identifier(column), operator));
            values.push(filter_value.clone());
        }

        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }

    /// Build an ORDER BY clause from sort parameters
    fn build_order_clause(sort_by: Option<&str>, sort_order: Option<SortOrder>) -> String {
        match sort_by {
            Some(column) => format!(
                " ORDER BY {} {}",
                Self::quote_identifier(column),
                sort_order.unwrap_or(SortOrder::Ascending).as_sql()
            ),
            None => String::new(),
        }
    }

    /// Reject filters and sort keys naming columns the table does not have
    fn validate_columns(schema: &TableSchema, query: &RowQuery) -> Result<(), DatabaseError> {
        let unknown = query
            .filters
            .keys()
            .chain(query.sort_by.iter())
            .find(|column| !schema.has_column(column));

        match unknown {
            Some(column) => Err(DatabaseError::InvalidColumn(column.clone())),
            None => Ok(()),
        }
    }

    /// Primary key columns of a table in key order
    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let query = format!("PRAGMA table_info({})", Self::quote_identifier(table));
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut keyed = Vec::new();
        for row in rows {
            let position: i64 = row.try_get("pk")?;
            if position > 0 {
                keyed.push((position, row.try_get::<String, _>("name")?));
            }
        }
        keyed.sort_by_key(|(position, _)| *position);

        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }

    async fn count_filtered(&self, table: &str, query: &RowQuery) -> Result<u64, DatabaseError> {
        let (where_clause, filter_values) = Self::build_where_clause(&query.filters);
        let count_query = format!(
            "SELECT COUNT(*) FROM {}{}",
            Self::quote_identifier(table),
            where_clause
        );

        let mut sql_query = sqlx::query_scalar::<_, i64>(&count_query);
        for value in &filter_values {
            sql_query = sql_query.bind(value);
        }

        let count = sql_query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let query = "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut tables = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;

            let count_query = format!("SELECT COUNT(*) FROM {}", Self::quote_identifier(&name));
            let row_count: Option<u64> = sqlx::query_scalar(&count_query)
                .fetch_one(&self.pool)
                .await
                .ok()
                .map(|count: i64| count as u64);

            tables.push(TableInfo { name, row_count });
        }

        Ok(tables)
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema, DatabaseError> {
        // PRAGMA table_info returns: cid, name, type, notnull, dflt_value, pk
        let table_info_query = format!("PRAGMA table_info({})", Self::quote_identifier(table));
        let column_rows = sqlx::query(&table_info_query)
            .fetch_all(&self.pool)
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let mut columns = Vec::new();
        let mut primary_key_columns = Vec::new();

        for row in column_rows {
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let default_value: Option<String> = row.try_get("dflt_value").ok().flatten();
            let key_position: i64 = row.try_get("pk")?;

            let is_primary_key = key_position > 0;
            if is_primary_key {
                primary_key_columns.push((key_position, name.clone()));
            }

            columns.push(ColumnInfo {
                name,
                data_type,
                nullable: not_null == 0,
                default_value,
                is_primary_key,
            });
        }

        primary_key_columns.sort_by_key(|(position, _)| *position);
        let primary_key = if primary_key_columns.is_empty() {
            None
        } else {
            Some(primary_key_columns.into_iter().map(|(_, name)| name).collect())
        };

        let foreign_keys = self.get_foreign_keys(table).await?;

        // PRAGMA index_list returns: seq, name, unique, origin, partial
        let index_list_query = format!("PRAGMA index_list({})", Self::quote_identifier(table));
        let index_rows = sqlx::query(&index_list_query)
            .fetch_all(&self.pool)
            .await?;

        let mut indexes = Vec::new();
        for row in index_rows {
            let index_name: String = row.try_get("name")?;
            let unique: i64 = row.try_get("unique")?;

            // PRAGMA index_info returns: seqno, cid, name
            let index_info_query = format!("PRAGMA index_info({})", Self::quote_identifier(&index_name));
            let index_column_rows = sqlx::query(&index_info_query)
                .fetch_all(&self.pool)
                .await?;

            let index_columns = index_column_rows
                .iter()
                .filter_map(|column_row| column_row.try_get::<Option<String>, _>("name").ok().flatten())
                .collect();

            indexes.push(IndexInfo {
                name: index_name,
                columns: index_columns,
                unique: unique != 0,
            });
        }

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    async fn get_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, DatabaseError> {
        // PRAGMA foreign_key_list returns: id, seq, table, from, to, on_update, on_delete, match
        let foreign_key_query = format!("PRAGMA foreign_key_list({})", Self::quote_identifier(table));
        let foreign_key_rows = sqlx::query(&foreign_key_query)
            .fetch_all(&self.pool)
            .await?;

        let mut foreign_keys = Vec::new();
        for row in foreign_key_rows {
            let constraint: i64 = row.try_get("id")?;
            let sequence: i64 = row.try_get("seq")?;
            let column: String = row.try_get("from")?;
            let references_table: String = row.try_get("table")?;
            let declared_target: Option<String> = row.try_get("to")?;

            // `REFERENCES parent` without a column list targets the parent's primary key
            let references_column = match declared_target {
                Some(target) => target,
                None => self
                    .primary_key_columns(&references_table)
                    .await?
                    .into_iter()
                    .nth(sequence.max(0) as usize)
                    .unwrap_or_default(),
            };

            foreign_keys.push(ForeignKey {
                constraint: constraint.to_string(),
                column,
                references_table,
                references_column,
            });
        }

        Ok(foreign_keys)
    }

    async fn get_rows(&self, table: &str, query: RowQuery) -> Result<RowsResponse, DatabaseError> {
        let schema = self.get_table_schema(table).await?;
        Self::validate_columns(&schema, &query)?;

        let limit = query.effective_limit();
        let total = self.count_filtered(table, &query).await?;

        let (where_clause, filter_values) = Self::build_where_clause(&query.filters);
        let order_clause = Self::build_order_clause(query.sort_by.as_deref(), query.sort_order);

        let select_query = format!(
            "SELECT * FROM {}{}{} LIMIT ? OFFSET ?",
            Self::quote_identifier(table),
            where_clause,
            order_clause
        );

        let mut sql_query = sqlx::query(&select_query);
        for value in &filter_values {
            sql_query = sql_query.bind(value);
        }
        let offset = query.effective_offset();
        sql_query = sql_query.bind(limit as i64).bind(offset as i64);

        let rows = sql_query.fetch_all(&self.pool).await?;

        let columns = schema.columns.into_iter().map(|column| column.name).collect();
        let json_rows = rows
            .iter()
            .map(Self::row_to_json)
            .collect::<Result<Vec<_>, _>>()?;

        let has_more = query.has_more(json_rows.len(), total);

        Ok(RowsResponse {
            rows: json_rows,
            columns,
            total,
            offset,
            limit,
            has_more,
        })
    }

    async fn count_rows(&self, table: &str, query: &RowQuery) -> Result<CountResponse, DatabaseError> {
        let schema = self.get_table_schema(table).await?;
        Self::validate_columns(&schema, query)?;

        Ok(CountResponse {
            count: self.count_filtered(table, query).await?,
        })
    }
}
