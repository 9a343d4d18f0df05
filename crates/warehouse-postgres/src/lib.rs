//! PostgreSQL implementation of the warehouse store port.
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so the crate
//! builds without a database. Identifiers are always quoted; values are
//! always bound.

mod sql;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::debug;

use warehouse_core::store::{MergeStats, SchemaChange, Warehouse};
use warehouse_core::{Column, ColumnType, Relation, Result, Schema, Value, WarehouseError};

use crate::sql::{column_type_from_pg, ident, select_list};

/// Postgres caps a statement at 65535 bind parameters.
const MAX_BINDS: usize = 65_535;

/// Rows per multi-row INSERT; at least one even for very wide tables.
fn rows_per_insert(width: usize) -> usize {
    (MAX_BINDS / width.max(1)).max(1)
}

// ── PgWarehouse ───────────────────────────────────────────────

/// Postgres-backed warehouse. Every table lives in one database schema.
#[derive(Clone)]
pub struct PgWarehouse {
    pool: PgPool,
    schema: String,
}

impl PgWarehouse {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub async fn connect(url: &str, schema: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await
            .map_err(|e| anyhow!(e))?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", ident(schema)))
            .execute(&pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(Self::new(pool, schema))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", ident(&self.schema), ident(table))
    }

    async fn require_schema(&self, table: &str) -> Result<Schema> {
        self.table_schema(table)
            .await?
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))
    }

    async fn insert_rows(
        tx: &mut Transaction<'_, Postgres>,
        target: &str,
        relation: &Relation,
    ) -> Result<()> {
        let columns = relation
            .schema()
            .names()
            .map(ident)
            .collect::<Vec<_>>()
            .join(", ");
        let types: Vec<ColumnType> = relation.schema().columns().iter().map(|c| c.ty).collect();

        for chunk in relation.rows().chunks(rows_per_insert(relation.schema().len())) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {target} ({columns}) "));
            qb.push_values(chunk, |mut b, row| {
                for (value, ty) in row.iter().zip(&types) {
                    match (value, ty) {
                        (Value::Null, ColumnType::Boolean) => b.push_bind(None::<bool>),
                        (Value::Null, ColumnType::Integer) => b.push_bind(None::<i64>),
                        (Value::Null, ColumnType::Decimal) => b.push_bind(None::<Decimal>),
                        (Value::Null, ColumnType::Text) => b.push_bind(None::<String>),
                        (Value::Null, ColumnType::Date) => b.push_bind(None::<NaiveDate>),
                        (Value::Null, ColumnType::Timestamp) => b.push_bind(None::<NaiveDateTime>),
                        (Value::Bool(v), _) => b.push_bind(*v),
                        (Value::Int(v), _) => b.push_bind(*v),
                        (Value::Decimal(v), _) => b.push_bind(*v),
                        (Value::Text(v), _) => b.push_bind(v.clone()),
                        (Value::Date(v), _) => b.push_bind(*v),
                        (Value::Timestamp(v), _) => b.push_bind(*v),
                    };
                }
            });
            qb.build()
                .execute(&mut **tx)
                .await
                .map_err(|e| anyhow!(e))?;
        }
        Ok(())
    }

    fn create_table_sql(&self, table: &str, schema: &Schema) -> String {
        let cols = schema
            .columns()
            .iter()
            .map(|c| format!("{} {}", ident(&c.name), c.ty.sql_name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({cols})", self.qualified(table))
    }
}

fn decode_value(row: &PgRow, idx: usize, ty: ColumnType) -> Result<Value> {
    let v = match ty {
        ColumnType::Boolean => row
            .try_get::<Option<bool>, _>(idx)
            .map(Value::from),
        ColumnType::Integer => row.try_get::<Option<i64>, _>(idx).map(Value::from),
        ColumnType::Decimal => row.try_get::<Option<Decimal>, _>(idx).map(Value::from),
        ColumnType::Text => row.try_get::<Option<String>, _>(idx).map(Value::from),
        ColumnType::Date => row.try_get::<Option<NaiveDate>, _>(idx).map(Value::from),
        ColumnType::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(Value::from),
    };
    Ok(v.map_err(|e| anyhow!(e))?)
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn table_schema(&self, table: &str) -> Result<Option<Schema>> {
        let rows = sqlx::query(
            r#"
            SELECT column_name::text, data_type::text
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get(0).map_err(|e| anyhow!(e))?;
            let data_type: String = row.try_get(1).map_err(|e| anyhow!(e))?;
            columns.push(Column::new(name, column_type_from_pg(&data_type)));
        }
        Ok(Some(Schema::new(columns)))
    }

    async fn read_table(&self, table: &str) -> Result<Relation> {
        let schema = self.require_schema(table).await?;
        let sql = format!(
            "SELECT {} FROM {}",
            select_list(&schema),
            self.qualified(table)
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        let mut out = Relation::new(table, schema.clone());
        for row in &rows {
            let values = schema
                .columns()
                .iter()
                .enumerate()
                .map(|(i, c)| decode_value(row, i, c.ty))
                .collect::<Result<Vec<_>>>()?;
            out.push(values)?;
        }
        Ok(out)
    }

    async fn max_value(&self, table: &str, column: &str) -> Result<Value> {
        let schema = self.require_schema(table).await?;
        let col = schema
            .column(column)
            .ok_or_else(|| WarehouseError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })?;
        let sql = format!(
            "SELECT MAX({})::{} FROM {}",
            ident(column),
            col.ty.sql_name(),
            self.qualified(table)
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        decode_value(&row, 0, col.ty)
    }

    async fn replace_table(&self, table: &str, relation: &Relation) -> Result<()> {
        let build = format!("{table}__build");
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.qualified(&build)))
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        sqlx::query(&self.create_table_sql(&build, relation.schema()))
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Self::insert_rows(&mut tx, &self.qualified(&build), relation).await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.qualified(table)))
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        sqlx::query(&format!(
            "ALTER TABLE {} RENAME TO {}",
            self.qualified(&build),
            ident(table)
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        debug!(table, rows = relation.len(), "swapped in rebuilt table");
        Ok(())
    }

    async fn apply_schema_changes(&self, table: &str, changes: &[SchemaChange]) -> Result<()> {
        let target = self.qualified(table);
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        for change in changes {
            let sql = match change {
                SchemaChange::AddColumn(c) => format!(
                    "ALTER TABLE {target} ADD COLUMN {} {}",
                    ident(&c.name),
                    c.ty.sql_name()
                ),
                SchemaChange::DropColumn(name) => {
                    format!("ALTER TABLE {target} DROP COLUMN {}", ident(name))
                }
                SchemaChange::AlterType { column, to, .. } => format!(
                    "ALTER TABLE {target} ALTER COLUMN {col} TYPE {ty} USING {col}::{ty}",
                    col = ident(column),
                    ty = to.sql_name()
                ),
            };
            debug!(table, %sql, "schema change");
            sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;
        }
        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn merge_rows(
        &self,
        table: &str,
        unique_key: &[String],
        relation: &Relation,
    ) -> Result<MergeStats> {
        let existing = self.require_schema(table).await?;
        if existing != *relation.schema() {
            return Err(WarehouseError::SchemaChangeRejected {
                table: table.to_string(),
                reason: "merge batch does not match the table schema".to_string(),
            });
        }
        let target = self.qualified(table);
        let stage = ident(&format!("{table}__merge"));
        let key_match = unique_key
            .iter()
            .map(|k| format!("t.{k} = s.{k}", k = ident(k)))
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}.{table}", self.schema))
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        sqlx::query(&format!(
            "CREATE TEMP TABLE {stage} (LIKE {target}) ON COMMIT DROP"
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Self::insert_rows(&mut tx, &stage, relation).await?;

        let updated: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {target} t JOIN {stage} s ON {key_match}"
        ))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;
        sqlx::query(&format!(
            "DELETE FROM {target} t USING {stage} s WHERE {key_match}"
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;
        sqlx::query(&format!("INSERT INTO {target} SELECT * FROM {stage}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {target}"))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        tx.commit().await.map_err(|e| anyhow!(e))?;

        let updated = updated as usize;
        Ok(MergeStats {
            inserted: relation.len().saturating_sub(updated),
            updated,
            total: total as usize,
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(names)
    }
}
