//! PostgreSQL [`Executor`] built on tokio-postgres.
//!
//! `PgExecutor` turns a [`BuiltQuery`] into a tokio-postgres call:
//!
//! - `?` placeholders are rewritten to `$1..$n`
//! - SELECT rows are decoded column by column into [`Value`](crate::Value)
//! - INSERT gets `RETURNING <insert_id_column>` so the generated id can be reported
//! - UPDATE/DELETE report the affected row count
//!
//! # Example
//!
//! ```ignore
//! use chainql::{PgExecutor, QueryBuilder};
//!
//! let executor = PgExecutor::connect(&database_url).await?;
//! let mut db = QueryBuilder::with_executor(executor);
//! let rows = db.table("users").where_("status", "active").get().await?;
//!
//! // or from a pool
//! let pool = chainql::create_pool(&database_url)?;
//! let mut db = QueryBuilder::with_executor(PgExecutor::from_pool(&pool).await?);
//! ```

mod config;
mod decode;
mod placeholder;

pub use config::PgExecutorConfig;
pub use placeholder::rewrite_placeholders;

use crate::error::{DbError, DbResult};
use crate::executor::{ExecResult, Executor};
use crate::render::{BuiltQuery, StatementKind};
use crate::value::Value;
use std::future::Future;
use tokio_postgres::types::ToSql;

/// The subset of a tokio-postgres connection the executor needs.
///
/// Implemented for `tokio_postgres::Client` and, with the `pool` feature,
/// for pooled `deadpool_postgres::Client`s.
pub trait PgConnection: Send + Sync {
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<tokio_postgres::Row>, tokio_postgres::Error>> + Send;

    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, tokio_postgres::Error>> + Send;

    fn batch_execute(
        &self,
        sql: &str,
    ) -> impl Future<Output = Result<(), tokio_postgres::Error>> + Send;
}

impl PgConnection for tokio_postgres::Client {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, tokio_postgres::Error> {
        tokio_postgres::Client::query(self, sql, params).await
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, tokio_postgres::Error> {
        tokio_postgres::Client::execute(self, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> Result<(), tokio_postgres::Error> {
        tokio_postgres::Client::batch_execute(self, sql).await
    }
}

#[cfg(feature = "pool")]
impl PgConnection for deadpool_postgres::Client {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, tokio_postgres::Error> {
        // Delegate to the deref target (ClientWrapper -> tokio_postgres::Client).
        let client: &tokio_postgres::Client = self;
        PgConnection::query(client, sql, params).await
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, tokio_postgres::Error> {
        let client: &tokio_postgres::Client = self;
        PgConnection::execute(client, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> Result<(), tokio_postgres::Error> {
        let client: &tokio_postgres::Client = self;
        PgConnection::batch_execute(client, sql).await
    }
}

/// Executor backed by one PostgreSQL connection.
pub struct PgExecutor<C = tokio_postgres::Client> {
    conn: C,
    config: PgExecutorConfig,
}

impl PgExecutor<tokio_postgres::Client> {
    /// Connect with `NoTls` and spawn the connection driver on the current runtime.
    ///
    /// Uses [`PgExecutorConfig::default`], so inserts report `RETURNING id`.
    /// Tables without an `id` column need [`connect_with_config`](Self::connect_with_config)
    /// and [`PgExecutorConfig::no_insert_id`] or another id column.
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        Self::connect_with_config(database_url, PgExecutorConfig::default()).await
    }

    /// Connect with `NoTls` and a custom configuration.
    pub async fn connect_with_config(
        database_url: &str,
        config: PgExecutorConfig,
    ) -> DbResult<Self> {
        let pg_config: tokio_postgres::Config = database_url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::Connection(e.to_string()))?;

        let (client, connection) = pg_config
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                #[cfg(feature = "tracing")]
                tracing::error!(target: "chainql.sql", error = %e, "postgres connection error");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
            }
        });

        Ok(Self::with_config(client, config))
    }
}

#[cfg(feature = "pool")]
impl PgExecutor<deadpool_postgres::Client> {
    /// Check a connection out of `pool`. It returns to the pool when the executor drops.
    pub async fn from_pool(pool: &deadpool_postgres::Pool) -> DbResult<Self> {
        Ok(Self::new(pool.get().await?))
    }
}

impl<C: PgConnection> PgExecutor<C> {
    /// Wrap an existing connection with the default configuration.
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, PgExecutorConfig::default())
    }

    pub fn with_config(conn: C, config: PgExecutorConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &PgExecutorConfig {
        &self.config
    }

    /// The wrapped connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    /// Final SQL text sent to the server.
    pub(crate) fn prepare_sql(&self, query: &BuiltQuery) -> DbResult<String> {
        let mut sql = if self.config.rewrite_placeholders {
            let (sql, count) = rewrite_placeholders(&query.sql);
            if count != query.params.len() {
                return Err(DbError::invalid(format!(
                    "statement has {} placeholders but {} parameters",
                    count,
                    query.params.len()
                )));
            }
            sql
        } else {
            query.sql.clone()
        };

        if query.kind == StatementKind::Insert {
            if let Some(ref column) = self.config.insert_id_column {
                sql.push_str(" RETURNING ");
                sql.push_str(column);
            }
        }
        Ok(sql)
    }

    async fn run(&self, query: &BuiltQuery) -> DbResult<ExecResult> {
        let sql = self.prepare_sql(query)?;
        let params: Vec<&(dyn ToSql + Sync)> = query
            .params
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect();

        match query.kind {
            StatementKind::Select => {
                let rows = self.conn.query(&sql, &params).await?;
                Ok(ExecResult::Rows(decode::decode_rows(&rows)?))
            }
            StatementKind::Insert if self.config.insert_id_column.is_some() => {
                let rows = self.conn.query(&sql, &params).await?;
                let insert_id = match rows.first() {
                    Some(row) => match decode::decode_value(row, 0)? {
                        Value::Int(id) => Some(id),
                        _ => None,
                    },
                    None => None,
                };
                Ok(ExecResult::inserted(insert_id, rows.len() as u64))
            }
            StatementKind::Insert => {
                let affected = self.conn.execute(&sql, &params).await?;
                Ok(ExecResult::inserted(None, affected))
            }
            StatementKind::Update | StatementKind::Delete => {
                let affected = self.conn.execute(&sql, &params).await?;
                Ok(ExecResult::affected(affected))
            }
        }
    }
}

impl<C: PgConnection> Executor for PgExecutor<C> {
    async fn execute(&self, query: &BuiltQuery) -> DbResult<ExecResult> {
        self.run(query).await
    }

    async fn begin_transaction(&self) -> DbResult<()> {
        Ok(self.conn.batch_execute("BEGIN").await?)
    }

    async fn commit(&self) -> DbResult<()> {
        Ok(self.conn.batch_execute("COMMIT").await?)
    }

    async fn rollback(&self) -> DbResult<()> {
        Ok(self.conn.batch_execute("ROLLBACK").await?)
    }
}
