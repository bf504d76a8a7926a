// SQLite-backed document store: one table per collection, each row a JSON
// document queried through json_extract.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use super::filter::{json_path, Bind};
use super::migration::run_migrations;
use super::{Accumulator, Collection, DataSource, DbError, Filter, FindOptions, GroupBy, Pipeline, SortOrder};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            // Enable WAL mode for better concurrency
            .journal_mode(SqliteJournalMode::Wal)
            .with_regexp();

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        run_migrations(&pool).await?;
        info!("Document store ready at {}", database_url);

        Ok(Self { pool })
    }

    /// Private in-memory store; a single connection keeps the database alive
    pub async fn in_memory() -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.with_regexp();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Batch insert documents into a collection
    pub async fn insert(&self, collection: Collection, docs: &[Value]) -> Result<(), DbError> {
        let sql = format!("INSERT INTO {} (doc) VALUES (?)", collection.table_name());
        let mut tx = self.pool.begin().await?;

        for doc in docs {
            let text = serde_json::to_string(doc)?;
            sqlx::query(&sql).bind(text).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!("Inserted {} documents into {}", docs.len(), collection.table_name());
        Ok(())
    }
}

fn where_clause(filter: &Filter, sql: &mut String, binds: &mut Vec<Bind>) {
    sql.push_str(" WHERE ");
    filter.write_sql(sql, binds);
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: &'q [Bind],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            Bind::Null => query.bind(None::<String>),
            Bind::Int(v) => query.bind(*v),
            Bind::Real(v) => query.bind(*v),
            Bind::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

fn project(doc: Value, fields: &[&'static str]) -> Value {
    match doc {
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .collect();
            Value::Object(kept)
        }
        other => other,
    }
}

#[async_trait]
impl DataSource for SqliteStore {
    async fn find(&self, collection: Collection, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>, DbError> {
        let mut sql = format!("SELECT doc FROM {}", collection.table_name());
        let mut binds = Vec::new();
        where_clause(filter, &mut sql, &mut binds);

        sql.push_str(" ORDER BY ");
        for key in &options.sort {
            sql.push_str(&format!("{} {}, ", json_path(key.field), direction(key.order)));
        }
        sql.push_str("id ASC");

        if options.limit.is_some() || options.skip > 0 {
            sql.push_str(" LIMIT ? OFFSET ?");
            let limit = options.limit.map(|l| l as i64).unwrap_or(-1);
            binds.push(Bind::Int(limit));
            binds.push(Bind::Int(options.skip as i64));
        }

        let rows = bind_all(sqlx::query(&sql), &binds).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<Value, DbError> {
                let text: String = row.try_get("doc")?;
                let doc: Value = serde_json::from_str(&text)?;
                Ok(match &options.projection {
                    Some(fields) => project(doc, fields),
                    None => doc,
                })
            })
            .collect()
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DbError> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", collection.table_name());
        let mut binds = Vec::new();
        where_clause(filter, &mut sql, &mut binds);

        let count: i64 = bind_all(sqlx::query(&sql), &binds)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        Ok(count.max(0) as u64)
    }

    async fn aggregate(&self, collection: Collection, pipeline: &Pipeline) -> Result<Vec<Value>, DbError> {
        let key = match pipeline.group {
            GroupBy::Field(field) => json_path(field),
            GroupBy::Day(field) => format!("date({}, 'unixepoch')", json_path(field)),
        };

        let mut sql = format!("SELECT {} AS _id", key);
        for (name, accumulator) in &pipeline.accumulators {
            let expr = match accumulator {
                Accumulator::Sum(field) => format!("TOTAL({})", json_path(field)),
                Accumulator::Count => "COUNT(*)".to_string(),
                Accumulator::Min(field) => format!("CAST(MIN({}) AS INTEGER)", json_path(field)),
            };
            sql.push_str(&format!(", {} AS \"{}\"", expr, name));
        }
        sql.push_str(&format!(" FROM {}", collection.table_name()));

        let mut binds = Vec::new();
        where_clause(&pipeline.filter, &mut sql, &mut binds);
        sql.push_str(" GROUP BY _id");

        if let Some(sort) = pipeline.sort {
            sql.push_str(&format!(" ORDER BY \"{}\" {}, _id ASC", sort.field, direction(sort.order)));
        }
        if let Some(limit) = pipeline.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Bind::Int(limit as i64));
        }

        let rows = bind_all(sqlx::query(&sql), &binds).fetch_all(&self.pool).await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut doc = Map::new();
            let id: Option<String> = row.try_get("_id")?;
            doc.insert("_id".to_string(), id.map(Value::String).unwrap_or(Value::Null));
            for (name, accumulator) in &pipeline.accumulators {
                let value = match accumulator {
                    Accumulator::Sum(_) => Value::from(row.try_get::<f64, _>(*name)?),
                    Accumulator::Count => Value::from(row.try_get::<i64, _>(*name)?),
                    Accumulator::Min(_) => row
                        .try_get::<Option<i64>, _>(*name)?
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                };
                doc.insert(name.to_string(), value);
            }
            result.push(Value::Object(doc));
        }

        Ok(result)
    }
}
