//! The fluent, stateful query builder.
//!
//! A [`QueryBuilder`] owns one [`PendingQuery`]. Chain methods mutate it;
//! terminal operations render it, hand the result to the [`Executor`] and
//! reset it on success. A failed terminal operation leaves it untouched, so
//! the caller can inspect it or retry.

use crate::error::{DbError, DbResult};
use crate::executor::{ExecResult, Executor};
use crate::pending::{PendingQuery, empty_state};
use crate::record::Record;
use crate::render::{
    BuiltQuery, render_delete, render_insert, render_insert_many, render_select, render_update,
};
use crate::row::{FromRow, Row};
#[cfg(feature = "tracing")]
use crate::trace::SqlTracer;
use crate::value::Value;

/// Fluent query builder over an [`Executor`].
///
/// # Example
///
/// ```ignore
/// use chainql::{PgExecutor, QueryBuilder, Record};
///
/// let mut db = QueryBuilder::with_executor(PgExecutor::connect(url).await?);
///
/// let adults = db
///     .table("users")
///     .where_("status", "active")
///     .where_op("age", ">", 18)
///     .get()
///     .await?;
///
/// let id = db
///     .table("users")
///     .insert(Record::new().set("name", "John").set("email", "j@x.com"))
///     .await?;
/// ```
pub struct QueryBuilder<E> {
    executor: Option<E>,
    pending: PendingQuery,
    last_sql: Option<String>,
    #[cfg(feature = "tracing")]
    tracer: SqlTracer,
}

impl<E> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self {
            executor: None,
            pending: empty_state(),
            last_sql: None,
            #[cfg(feature = "tracing")]
            tracer: SqlTracer::default(),
        }
    }
}

impl<E> QueryBuilder<E> {
    /// Create a disconnected builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder bound to `executor`.
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor: Some(executor),
            ..Self::default()
        }
    }

    // ==================== Connection ====================

    /// Attach (or replace) the executor.
    pub fn connect(&mut self, executor: E) -> &mut Self {
        self.executor = Some(executor);
        self
    }

    /// Detach the executor and hand it back.
    pub fn disconnect(&mut self) -> Option<E> {
        self.executor.take()
    }

    pub fn is_connected(&self) -> bool {
        self.executor.is_some()
    }

    pub fn executor(&self) -> Option<&E> {
        self.executor.as_ref()
    }

    /// Replace the SQL tracer.
    #[cfg(feature = "tracing")]
    pub fn tracer(&mut self, tracer: SqlTracer) -> &mut Self {
        self.tracer = tracer;
        self
    }

    // ==================== Shape ====================

    /// Set the target table. Not escaped.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.pending.set_table(name);
        self
    }

    /// Replace the SELECT list.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.set_select(columns);
        self
    }

    /// Add `JOIN <table> ON <on>`.
    pub fn join(&mut self, table: &str, on: &str) -> &mut Self {
        self.pending.push_join(None, table, on);
        self
    }

    /// Add `<kind> JOIN <table> ON <on>`; `kind` is rendered literally.
    pub fn join_with(&mut self, kind: &str, table: &str, on: &str) -> &mut Self {
        self.pending.push_join(Some(kind), table, on);
        self
    }

    pub fn left_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join_with("LEFT", table, on)
    }

    pub fn right_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join_with("RIGHT", table, on)
    }

    pub fn inner_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join_with("INNER", table, on)
    }

    pub fn full_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join_with("FULL", table, on)
    }

    // ==================== Conditions ====================

    /// Add AND condition `column = ?`.
    pub fn where_(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.where_op(column, "=", value)
    }

    /// Add AND condition `column <op> ?`. The operator is not validated.
    pub fn where_op(&mut self, column: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        self.pending.push_where(column, op, value.into());
        self
    }

    /// Add OR condition `column = ?`.
    pub fn or_where(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.or_where_op(column, "=", value)
    }

    /// Add OR condition `column <op> ?`.
    pub fn or_where_op(&mut self, column: &str, op: &str, value: impl Into<Value>) -> &mut Self {
        self.pending.push_or_where(column, op, value.into());
        self
    }

    /// Add `column IN (?, ...)`. Does nothing when `values` is empty.
    pub fn where_in<I>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.pending.push_where_in(column, values);
        self
    }

    /// Add a verbatim AND fragment.
    ///
    /// The fragment is not parameterized; never build it from untrusted input.
    /// It is wrapped in parentheses whenever other conditions are present.
    pub fn raw_where(&mut self, fragment: &str) -> &mut Self {
        self.pending.push_raw_where(fragment);
        self
    }

    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.pending.set_group_by(column);
        self
    }

    /// Set `ORDER BY <column> <direction>`; the direction is not validated.
    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.pending.set_order_by(column, direction);
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.pending.set_limit(n);
        self
    }

    // ==================== Inspection ====================

    pub fn pending(&self) -> &PendingQuery {
        &self.pending
    }

    /// Discard everything accumulated so far.
    pub fn reset(&mut self) -> &mut Self {
        self.pending = empty_state();
        self
    }

    /// Render the pending SELECT without executing it.
    pub fn to_select_sql(&self) -> DbResult<BuiltQuery> {
        render_select(&self.pending)
    }

    /// SQL of the last statement handed to the executor, as rendered.
    ///
    /// This is the `?`-placeholder form. The text actually sent to the server
    /// may differ: [`PgExecutor`](crate::PgExecutor) rewrites placeholders to
    /// `$n` and appends `RETURNING` to inserts.
    pub fn last_query(&self) -> Option<&str> {
        self.last_sql.as_deref()
    }
}

impl<E: Executor> QueryBuilder<E> {
    fn connected(&self) -> DbResult<&E> {
        self.executor
            .as_ref()
            .ok_or(DbError::ConnectionNotEstablished)
    }

    async fn dispatch(&mut self, query: BuiltQuery) -> DbResult<ExecResult> {
        let executor = self
            .executor
            .as_ref()
            .ok_or(DbError::ConnectionNotEstablished)?;

        self.last_sql = Some(query.sql.clone());
        #[cfg(feature = "tracing")]
        self.tracer.before_execute(&query);

        let result = match executor.execute(&query).await {
            Ok(result) => result.check_shape(query.kind).map(|()| result),
            Err(e) => Err(e),
        };

        match result {
            Ok(result) => {
                self.pending = empty_state();
                Ok(result)
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                self.tracer.on_error(&query, &e);
                Err(e)
            }
        }
    }

    // ==================== Terminal operations ====================

    /// Run the pending SELECT and return every row.
    pub async fn get(&mut self) -> DbResult<Vec<Row>> {
        self.connected()?;
        let query = render_select(&self.pending)?;
        self.dispatch(query).await?.into_rows()
    }

    /// Run the pending SELECT and map every row into `T`.
    pub async fn get_as<T: FromRow>(&mut self) -> DbResult<Vec<T>> {
        let rows = self.get().await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Run the pending SELECT with `LIMIT 1` and return the first row.
    ///
    /// Any limit set earlier is overwritten; it is restored if the call fails.
    pub async fn first(&mut self) -> DbResult<Option<Row>> {
        self.connected()?;
        let previous = self.pending.limit;
        self.pending.set_limit(1);
        match self.get().await {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(e) => {
                self.pending.limit = previous;
                Err(e)
            }
        }
    }

    pub async fn first_as<T: FromRow>(&mut self) -> DbResult<Option<T>> {
        match self.first().await? {
            Some(row) => T::from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    /// Insert one row and return the generated identifier, if the executor reports one.
    ///
    /// WHERE state is ignored but still cleared on success.
    ///
    /// With the default [`PgExecutorConfig`](crate::PgExecutorConfig) the
    /// statement gets `RETURNING id`, which fails on tables without an `id`
    /// column. Configure [`insert_id_column`](crate::PgExecutorConfig::insert_id_column)
    /// or [`no_insert_id`](crate::PgExecutorConfig::no_insert_id) for such tables.
    pub async fn insert(&mut self, data: impl Into<Record>) -> DbResult<Option<i64>> {
        self.connected()?;
        let query = render_insert(&self.pending, &data.into())?;
        let (insert_id, _) = self.dispatch(query).await?.into_mutation()?;
        Ok(insert_id)
    }

    /// Insert several rows in one statement; returns the first generated identifier.
    pub async fn insert_many<I>(&mut self, rows: I) -> DbResult<Option<i64>>
    where
        I: IntoIterator,
        I::Item: Into<Record>,
    {
        self.connected()?;
        let rows: Vec<Record> = rows.into_iter().map(Into::into).collect();
        let query = render_insert_many(&self.pending, &rows)?;
        let (insert_id, _) = self.dispatch(query).await?.into_mutation()?;
        Ok(insert_id)
    }

    /// Update matching rows. Returns `true` if any row changed.
    pub async fn update(&mut self, data: impl Into<Record>) -> DbResult<bool> {
        self.connected()?;
        let query = render_update(&self.pending, &data.into())?;
        let (_, affected) = self.dispatch(query).await?.into_mutation()?;
        Ok(affected > 0)
    }

    /// Delete matching rows. Returns `true` if any row was removed.
    pub async fn delete(&mut self) -> DbResult<bool> {
        self.connected()?;
        let query = render_delete(&self.pending)?;
        let (_, affected) = self.dispatch(query).await?.into_mutation()?;
        Ok(affected > 0)
    }

    // ==================== Transactions ====================

    pub async fn begin_transaction(&self) -> DbResult<()> {
        self.connected()?.begin_transaction().await
    }

    pub async fn commit(&self) -> DbResult<()> {
        self.connected()?.commit().await
    }

    pub async fn rollback(&self) -> DbResult<()> {
        self.connected()?.rollback().await
    }
}

#[cfg(test)]
mod tests;
