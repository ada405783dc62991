//! PostgreSQL database provider implementation
//!
//! Only the `public` schema is reflected.

use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::schema::{
    ColumnInfo, CountResponse, ForeignKey, IndexInfo, RowQuery, RowsResponse, SortOrder,
    TableInfo, TableSchema,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgRow, Column, PgPool, Row, TypeInfo};
use std::collections::HashMap;

/// PostgreSQL database provider
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn quote_identifier(identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Convert a PostgreSQL row to a JSON object
    fn row_to_json(row: &PgRow) -> Result<Value, DatabaseError> {
        let mut map = serde_json::Map::new();

        for column in row.columns() {
            let column_name = column.name();
            let value = match column.type_info().name() {
                "BOOL" => row
                    .try_get::<Option<bool>, _>(column_name)?
                    .map(Value::Bool),
                "INT2" => row
                    .try_get::<Option<i16>, _>(column_name)?
                    .map(|value| Value::Number(value.into())),
                "INT4" => row
                    .try_get::<Option<i32>, _>(column_name)?
                    .map(|value| Value::Number(value.into())),
                "INT8" => row
                    .try_get::<Option<i64>, _>(column_name)?
                    .map(|value| Value::Number(value.into())),
                "FLOAT4" => row
                    .try_get::<Option<f32>, _>(column_name)?
                    .and_then(|value| serde_json::Number::from_f64(value as f64))
                    .map(Value::Number),
                "FLOAT8" => row
                    .try_get::<Option<f64>, _>(column_name)?
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number),
                "BYTEA" => row
                    .try_get::<Option<Vec<u8>>, _>(column_name)?
                    .map(|bytes| Value::String(format!("[BLOB: {} bytes]", bytes.len()))),
                "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(column_name)?,
                // Text-like and everything else: best effort as string
                _ => row
                    .try_get::<Option<String>, _>(column_name)
                    .ok()
                    .flatten()
                    .map(Value::String),
            };

            map.insert(column_name.to_string(), value.unwrap_or(Value::Null));
        }

        Ok(Value::Object(map))
    }

    /// Build a WHERE clause from filters with numbered placeholders
    fn build_where_clause(filters: &HashMap<String, String>, parameter_offset: usize) -> (String, Vec<String>) {
        if filters.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut entries: Vec<_> = filters.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut conditions = Vec::new();
        let mut values = Vec::new();

        for (index, (column, filter_value)) in entries.into_iter().enumerate() {
            // Compare as text so any column type can be filtered with a string
            let operator = if filter_value.contains('%') { "LIKE" } else { "=" };
            conditions.push(format!(
                "{}::text {} ${}",
                Self::quote_identifier(column),
                operator,
                parameter_offset + index
            ));
            values.push(filter_value.clone());
        }

        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }

    /// Split one constraint into per-column foreign keys, pairing by position
    fn pair_key_columns(
        constraint: String,
        references_table: String,
        columns: Vec<String>,
        references_columns: Vec<String>,
    ) -> Result<Vec<ForeignKey>, DatabaseError> {
        if columns.len() != references_columns.len() {
            return Err(DatabaseError::Query(format!(
                "foreign key '{}' has {} columns but references {}",
                constraint,
                columns.len(),
                references_columns.len()
            )));
        }

        Ok(columns
            .into_iter()
            .zip(references_columns)
            .map(|(column, references_column)| ForeignKey {
                constraint: constraint.clone(),
                column,
                references_table: references_table.clone(),
                references_column,
            })
            .collect())
    }

    fn validate_columns(schema: &TableSchema, query: &RowQuery) -> Result<(), DatabaseError> {
        match query
            .filters
            .keys()
            .chain(query.sort_by.iter())
            .find(|column| !schema.has_column(column))
        {
            Some(column) => Err(DatabaseError::InvalidColumn(column.clone())),
            None => Ok(()),
        }
    }

    async fn count_filtered(&self, table: &str, query: &RowQuery) -> Result<u64, DatabaseError> {
        let (where_clause, filter_values) = Self::build_where_clause(&query.filters, 1);
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {}{}",
            Self::quote_identifier(table),
            where_clause
        );

        let mut query_builder = sqlx::query(&sql);
        for value in &filter_values {
            query_builder = query_builder.bind(value);
        }

        let row = query_builder.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let query = r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut tables = Vec::new();
        for row in rows {
            let name: String = row.try_get("table_name")?;

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
        let column_query = r#"
            SELECT column_name, data_type, is_nullable, column_default
            FROM information_schema.columns
            WHERE table_schema = 'public'
              AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let column_rows = sqlx::query(column_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let primary_key_query = r#"
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public'
              AND tc.table_name = $1
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
        "#;

        let primary_key_columns: Vec<String> = sqlx::query(primary_key_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<Result<Vec<_>, _>>()?;

        let index_query = r#"
            SELECT
                index_class.relname AS index_name,
                index_meta.indisunique AS is_unique,
                ARRAY(
                    SELECT attribute.attname::text
                    FROM unnest(index_meta.indkey) WITH ORDINALITY AS key(attnum, position)
                    JOIN pg_attribute attribute
                      ON attribute.attrelid = index_meta.indrelid
                      AND attribute.attnum = key.attnum
                    ORDER BY key.position
                ) AS column_names
            FROM pg_index index_meta
            JOIN pg_class index_class ON index_class.oid = index_meta.indexrelid
            JOIN pg_class table_class ON table_class.oid = index_meta.indrelid
            JOIN pg_namespace namespace ON namespace.oid = table_class.relnamespace
            WHERE namespace.nspname = 'public'
              AND table_class.relname = $1
              AND NOT index_meta.indisprimary
            ORDER BY index_class.relname
        "#;

        let indexes = sqlx::query(index_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| {
                Ok(IndexInfo {
                    name: row.try_get("index_name")?,
                    columns: row.try_get("column_names")?,
                    unique: row.try_get("is_unique")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let columns = column_rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("column_name")?;
                let is_nullable: String = row.try_get("is_nullable")?;

                Ok(ColumnInfo {
                    is_primary_key: primary_key_columns.contains(&name),
                    name,
                    data_type: row.try_get("data_type")?,
                    nullable: is_nullable == "YES",
                    default_value: row.try_get("column_default")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let primary_key = if primary_key_columns.is_empty() {
            None
        } else {
            Some(primary_key_columns)
        };

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key,
            foreign_keys: self.get_foreign_keys(table).await?,
            indexes,
        })
    }

    async fn get_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, DatabaseError> {
        // conkey/confkey list the key columns on both sides in constraint order
        let foreign_key_query = r#"
            SELECT
                constraint_meta.conname::text AS constraint_name,
                referenced_class.relname::text AS references_table,
                ARRAY(
                    SELECT attribute.attname::text
                    FROM unnest(constraint_meta.conkey) WITH ORDINALITY AS key(attnum, position)
                    JOIN pg_attribute attribute
                      ON attribute.attrelid = constraint_meta.conrelid
                      AND attribute.attnum = key.attnum
                    ORDER BY key.position
                ) AS column_names,
                ARRAY(
                    SELECT attribute.attname::text
                    FROM unnest(constraint_meta.confkey) WITH ORDINALITY AS key(attnum, position)
                    JOIN pg_attribute attribute
                      ON attribute.attrelid = constraint_meta.confrelid
                      AND attribute.attnum = key.attnum
                    ORDER BY key.position
                ) AS references_columns
            FROM pg_constraint constraint_meta
            JOIN pg_class table_class ON table_class.oid = constraint_meta.conrelid
            JOIN pg_namespace namespace ON namespace.oid = table_class.relnamespace
            JOIN pg_class referenced_class ON referenced_class.oid = constraint_meta.confrelid
            WHERE constraint_meta.contype = 'f'
              AND namespace.nspname = 'public'
              AND table_class.relname = $1
            ORDER BY constraint_meta.conname
        "#;

        let rows = sqlx::query(foreign_key_query)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        let mut foreign_keys = Vec::new();
        for row in rows {
            foreign_keys.extend(Self::pair_key_columns(
                row.try_get("constraint_name")?,
                row.try_get("references_table")?,
                row.try_get("column_names")?,
                row.try_get("references_columns")?,
            )?);
        }

        Ok(foreign_keys)
    }

    async fn get_rows(&self, table: &str, query: RowQuery) -> Result<RowsResponse, DatabaseError> {
        let schema = self.get_table_schema(table).await?;
        Self::validate_columns(&schema, &query)?;

        let mut sql = format!("SELECT * FROM {}", Self::quote_identifier(table));

        let (where_clause, filter_values) = Self::build_where_clause(&query.filters, 1);
        sql.push_str(&where_clause);

        if let Some(sort_column) = &query.sort_by {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                Self::quote_identifier(sort_column),
                query.sort_order.unwrap_or(SortOrder::Ascending).as_sql()
            ));
        }

        let limit = query.effective_limit();
        let offset = query.effective_offset();
        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

        let mut query_builder = sqlx::query(&sql);
        for value in &filter_values {
            query_builder = query_builder.bind(value);
        }

        let rows = query_builder.fetch_all(&self.pool).await?;
        let json_rows = rows
            .iter()
            .map(Self::row_to_json)
            .collect::<Result<Vec<_>, _>>()?;

        let total = self.count_filtered(table, &query).await?;
        let has_more = query.has_more(json_rows.len(), total);

        Ok(RowsResponse {
            rows: json_rows,
            columns: schema.columns.into_iter().map(|column| column.name).collect(),
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
