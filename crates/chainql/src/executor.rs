//! Executor trait: the database capability a builder delegates to.

use crate::error::{DbError, DbResult};
use crate::render::{BuiltQuery, StatementKind};
use crate::row::Row;
use std::future::Future;
use std::sync::Arc;

/// What an executor hands back for a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecResult {
    /// Row set of a SELECT.
    Rows(Vec<Row>),
    /// Metadata of an INSERT/UPDATE/DELETE.
    Mutation {
        /// Generated identifier of the first inserted row, when reported.
        insert_id: Option<i64>,
        affected_rows: u64,
    },
}

impl ExecResult {
    /// Mutation result with no generated identifier.
    pub fn affected(affected_rows: u64) -> Self {
        ExecResult::Mutation {
            insert_id: None,
            affected_rows,
        }
    }

    /// Mutation result for an insert.
    pub fn inserted(insert_id: Option<i64>, affected_rows: u64) -> Self {
        ExecResult::Mutation {
            insert_id,
            affected_rows,
        }
    }

    /// Take the row set, rejecting mutation-shaped results.
    pub fn into_rows(self) -> DbResult<Vec<Row>> {
        match self {
            ExecResult::Rows(rows) => Ok(rows),
            ExecResult::Mutation { .. } => Err(DbError::UnexpectedResult(
                "expected a row set, got mutation metadata".to_string(),
            )),
        }
    }

    /// `(insert_id, affected_rows)`, rejecting row-set results.
    pub fn into_mutation(self) -> DbResult<(Option<i64>, u64)> {
        match self {
            ExecResult::Mutation {
                insert_id,
                affected_rows,
            } => Ok((insert_id, affected_rows)),
            ExecResult::Rows(_) => Err(DbError::UnexpectedResult(
                "expected mutation metadata, got a row set".to_string(),
            )),
        }
    }

    /// Check the result shape against the statement kind.
    pub(crate) fn check_shape(&self, kind: StatementKind) -> DbResult<()> {
        match (kind.returns_rows(), self) {
            (true, ExecResult::Rows(_)) | (false, ExecResult::Mutation { .. }) => Ok(()),
            (true, _) => Err(DbError::UnexpectedResult(format!(
                "{kind} returned mutation metadata instead of rows"
            ))),
            (false, _) => Err(DbError::UnexpectedResult(format!(
                "{kind} returned a row set instead of mutation metadata"
            ))),
        }
    }
}

/// A database connection capability.
///
/// Builders call [`Executor::execute`] exactly once per terminal operation.
/// Transaction methods are plain pass-throughs. Implemented for
/// [`crate::PgExecutor`], and for `&E` / `Arc<E>` so several builders can
/// share one connection.
pub trait Executor: Send + Sync {
    /// Run a rendered statement.
    fn execute(&self, query: &BuiltQuery) -> impl Future<Output = DbResult<ExecResult>> + Send;

    /// Start a transaction on the underlying connection.
    fn begin_transaction(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Commit the current transaction.
    fn commit(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Roll back the current transaction.
    fn rollback(&self) -> impl Future<Output = DbResult<()>> + Send;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, query: &BuiltQuery) -> impl Future<Output = DbResult<ExecResult>> + Send {
        (**self).execute(query)
    }

    fn begin_transaction(&self) -> impl Future<Output = DbResult<()>> + Send {
        (**self).begin_transaction()
    }

    fn commit(&self) -> impl Future<Output = DbResult<()>> + Send {
        (**self).commit()
    }

    fn rollback(&self) -> impl Future<Output = DbResult<()>> + Send {
        (**self).rollback()
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, query: &BuiltQuery) -> impl Future<Output = DbResult<ExecResult>> + Send {
        (**self).execute(query)
    }

    fn begin_transaction(&self) -> impl Future<Output = DbResult<()>> + Send {
        (**self).begin_transaction()
    }

    fn commit(&self) -> impl Future<Output = DbResult<()>> + Send {
        (**self).commit()
    }

    fn rollback(&self) -> impl Future<Output = DbResult<()>> + Send {
        (**self).rollback()
    }
}
