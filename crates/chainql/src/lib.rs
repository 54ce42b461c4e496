//! # chainql
//!
//! A fluent, stateful SQL query builder over an async database executor.
//!
//! ## Features
//!
//! - **Chainable**: describe a statement with `table()`, `where_()`, `join()`, `order_by()`, ...
//! - **Parameterized**: every value is bound as a `?` placeholder, never spliced into SQL
//! - **Stateful**: pending state resets after each successful statement, and survives failures
//! - **Pluggable**: anything implementing [`Executor`] can run the statements
//! - **PostgreSQL out of the box**: [`PgExecutor`] over tokio-postgres, pooled via deadpool
//! - **Traceable**: SQL is logged through `tracing` (feature `tracing`)
//!
//! ## Example
//!
//! ```ignore
//! use chainql::{PgExecutor, QueryBuilder, Record};
//!
//! let mut db = QueryBuilder::with_executor(PgExecutor::connect(&database_url).await?);
//!
//! // SELECT * FROM users WHERE status = ? AND age > ?
//! let users = db
//!     .table("users")
//!     .where_("status", "active")
//!     .where_op("age", ">", 18)
//!     .get()
//!     .await?;
//!
//! // INSERT INTO users (name, email) VALUES (?, ?)
//! let id = db
//!     .table("users")
//!     .insert(Record::new().set("name", "John").set("email", "j@x.com"))
//!     .await?;
//!
//! // UPDATE users SET status = ? WHERE id = ?
//! let changed = db
//!     .table("users")
//!     .where_("id", 1)
//!     .update([("status", "deleted")])
//!     .await?;
//! ```

pub mod builder;
pub mod error;
pub mod executor;
pub mod pending;
pub mod pg_executor;
pub mod record;
pub mod render;
pub mod row;
pub mod value;

#[cfg(feature = "tracing")]
pub mod trace;

#[cfg(feature = "pool")]
pub mod pool;

pub use builder::QueryBuilder;
pub use error::{DbError, DbResult};
pub use executor::{ExecResult, Executor};
pub use pending::{Condition, PendingQuery, empty_state};
pub use pg_executor::{PgConnection, PgExecutor, PgExecutorConfig};
pub use record::Record;
pub use render::{BuiltQuery, StatementKind};
pub use row::{FromRow, FromValue, Row};
pub use value::Value;

#[cfg(feature = "tracing")]
pub use trace::SqlTracer;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
