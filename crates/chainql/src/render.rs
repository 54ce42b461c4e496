//! SQL rendering.
//!
//! Every function here is a pure function of a [`PendingQuery`] (plus the
//! payload for INSERT/UPDATE). Placeholders are rendered as `?`; executors
//! that need another syntax rewrite them (see `pg_executor`).
//!
//! ## WHERE composition
//!
//! AND-conditions are joined with ` AND `, OR-conditions with ` OR `. When
//! both kinds are present and there is more than one AND-condition, the AND
//! group is parenthesized so the statement reads the way it evaluates:
//!
//! ```text
//! WHERE (status = ? AND age > ?) OR role = ?
//! ```
//!
//! With only OR-conditions the clause is simply `WHERE a = ? OR b = ?`.

use crate::error::{DbError, DbResult};
use crate::pending::{Condition, PendingQuery};
use crate::record::Record;
use crate::value::Value;
use std::fmt;

/// The kind of statement a [`BuiltQuery`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// Whether the executor should answer with a row set.
    pub fn returns_rows(self) -> bool {
        matches!(self, StatementKind::Select)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        })
    }
}

/// A rendered statement ready for an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    pub fn new(kind: StatementKind, sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            kind,
            sql: sql.into(),
            params,
        }
    }
}

fn require_table(state: &PendingQuery) -> DbResult<&str> {
    match state.table.as_deref() {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(DbError::invalid("table name is required; call table() first")),
    }
}

/// Append the WHERE clause (if any) and collect its parameters.
fn push_where(state: &PendingQuery, sql: &mut String, params: &mut Vec<Value>) {
    let total = state.where_conditions.len() + state.or_where_conditions.len();
    if total == 0 {
        return;
    }

    // Raw fragments are opaque; wrap them once they share the clause.
    let fragment = |c: &Condition| -> String {
        if c.raw && total > 1 {
            format!("({})", c.sql)
        } else {
            c.sql.clone()
        }
    };
    let and_parts: Vec<String> = state.where_conditions.iter().map(fragment).collect();
    let or_parts: Vec<String> = state.or_where_conditions.iter().map(fragment).collect();

    sql.push_str(" WHERE ");
    if !and_parts.is_empty() {
        let grouped = !or_parts.is_empty() && and_parts.len() > 1;
        if grouped {
            sql.push('(');
        }
        sql.push_str(&and_parts.join(" AND "));
        if grouped {
            sql.push(')');
        }
    }
    if !or_parts.is_empty() {
        if !and_parts.is_empty() {
            sql.push_str(" OR ");
        }
        sql.push_str(&or_parts.join(" OR "));
    }

    params.extend(state.params_of(&state.where_conditions).cloned());
    params.extend(state.params_of(&state.or_where_conditions).cloned());
}

/// Render a SELECT.
pub fn render_select(state: &PendingQuery) -> DbResult<BuiltQuery> {
    let table = require_table(state)?;
    let mut params = Vec::with_capacity(state.parameters.len());

    let columns = if state.select_columns.is_empty() {
        "*".to_string()
    } else {
        state.select_columns.join(", ")
    };
    let mut sql = format!("SELECT {} FROM {}", columns, table);

    for join in &state.joins {
        sql.push(' ');
        sql.push_str(join);
    }

    push_where(state, &mut sql, &mut params);

    if let Some(ref group) = state.group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(group);
    }

    if let Some(ref order) = state.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }

    if let Some(limit) = state.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok(BuiltQuery::new(StatementKind::Select, sql, params))
}

/// Render a single-row INSERT. WHERE state is ignored.
pub fn render_insert(state: &PendingQuery, data: &Record) -> DbResult<BuiltQuery> {
    render_insert_many(state, std::slice::from_ref(data))
}

/// Render a multi-row INSERT.
///
/// Every row must list the same columns in the same order as the first;
/// parameters are flattened row by row.
pub fn render_insert_many(state: &PendingQuery, rows: &[Record]) -> DbResult<BuiltQuery> {
    let table = require_table(state)?;
    let first = rows
        .first()
        .ok_or_else(|| DbError::invalid("insert requires at least one row"))?;
    if first.is_empty() {
        return Err(DbError::invalid("insert requires at least one column"));
    }
    if let Some(pos) = rows.iter().position(|r| !r.has_same_columns(first)) {
        return Err(DbError::invalid(format!(
            "row {} does not match the columns of row 0 ({})",
            pos,
            first.columns().collect::<Vec<_>>().join(", ")
        )));
    }

    let columns = first.columns().collect::<Vec<_>>().join(", ");
    let group = format!("({})", vec!["?"; first.len()].join(", "));
    let groups = vec![group.as_str(); rows.len()].join(", ");

    let sql = format!("INSERT INTO {} ({}) VALUES {}", table, columns, groups);
    let params = rows.iter().flat_map(|r| r.values().cloned()).collect();
    Ok(BuiltQuery::new(StatementKind::Insert, sql, params))
}

/// Render an UPDATE: SET parameters first, then WHERE parameters.
pub fn render_update(state: &PendingQuery, data: &Record) -> DbResult<BuiltQuery> {
    let table = require_table(state)?;
    if data.is_empty() {
        return Err(DbError::invalid("update requires at least one column to set"));
    }

    let sets: Vec<String> = data.columns().map(|c| format!("{} = ?", c)).collect();
    let mut sql = format!("UPDATE {} SET {}", table, sets.join(", "));
    let mut params: Vec<Value> = data.values().cloned().collect();

    push_where(state, &mut sql, &mut params);

    Ok(BuiltQuery::new(StatementKind::Update, sql, params))
}

/// Render a DELETE.
pub fn render_delete(state: &PendingQuery) -> DbResult<BuiltQuery> {
    let table = require_table(state)?;
    let mut sql = format!("DELETE FROM {}", table);
    let mut params = Vec::with_capacity(state.parameters.len());

    push_where(state, &mut sql, &mut params);

    Ok(BuiltQuery::new(StatementKind::Delete, sql, params))
}
