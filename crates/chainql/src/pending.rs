//! Accumulated, not-yet-rendered statement state.
//!
//! [`PendingQuery`] is a plain value: the builder mutates it through the
//! chain methods and the renderer reads it. Fragments are stored already
//! rendered with `?` placeholders; each condition remembers which slice of
//! [`PendingQuery::parameters`] it owns so the renderer can emit parameters
//! in placeholder order.

use crate::value::Value;
use std::ops::Range;

/// A rendered WHERE/OR-WHERE fragment and the parameters it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub(crate) sql: String,
    pub(crate) params: Range<usize>,
    /// Caller-supplied text whose operator precedence is unknown.
    pub(crate) raw: bool,
}

impl Condition {
    /// Fragment text with `?` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of placeholders the fragment carries.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Whether the fragment came from `raw_where`.
    pub fn is_raw(&self) -> bool {
        self.raw
    }
}

/// State of the statement under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingQuery {
    pub(crate) table: Option<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) select_columns: Vec<String>,
    pub(crate) where_conditions: Vec<Condition>,
    pub(crate) or_where_conditions: Vec<Condition>,
    pub(crate) group_by: Option<String>,
    pub(crate) order_by: Option<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) parameters: Vec<Value>,
}

/// A fresh, empty statement state.
pub fn empty_state() -> PendingQuery {
    PendingQuery::default()
}

impl PendingQuery {
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    pub fn select_columns(&self) -> &[String] {
        &self.select_columns
    }

    pub fn where_conditions(&self) -> &[Condition] {
        &self.where_conditions
    }

    pub fn or_where_conditions(&self) -> &[Condition] {
        &self.or_where_conditions
    }

    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Bound values in the order their conditions were added.
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Returns `true` when nothing has been configured.
    pub fn is_empty(&self) -> bool {
        *self == empty_state()
    }

    // ==================== Mutation ====================

    pub(crate) fn set_table(&mut self, name: &str) {
        self.table = Some(name.to_string());
    }

    pub(crate) fn set_select<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_columns = columns.into_iter().map(Into::into).collect();
    }

    pub(crate) fn push_join(&mut self, kind: Option<&str>, table: &str, on: &str) {
        let clause = match kind {
            Some(kind) => format!("{} JOIN {} ON {}", kind, table, on),
            None => format!("JOIN {} ON {}", table, on),
        };
        self.joins.push(clause);
    }

    fn bind(&mut self, values: impl IntoIterator<Item = Value>) -> Range<usize> {
        let start = self.parameters.len();
        self.parameters.extend(values);
        start..self.parameters.len()
    }

    pub(crate) fn push_where(&mut self, column: &str, op: &str, value: Value) {
        let params = self.bind([value]);
        self.where_conditions.push(Condition {
            sql: format!("{} {} ?", column, op),
            params,
            raw: false,
        });
    }

    pub(crate) fn push_or_where(&mut self, column: &str, op: &str, value: Value) {
        let params = self.bind([value]);
        self.or_where_conditions.push(Condition {
            sql: format!("{} {} ?", column, op),
            params,
            raw: false,
        });
    }

    pub(crate) fn push_where_in(&mut self, column: &str, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let params = self.bind(values);
        self.where_conditions.push(Condition {
            sql: format!("{} IN ({})", column, placeholders),
            params,
            raw: false,
        });
    }

    pub(crate) fn push_raw_where(&mut self, fragment: &str) {
        let at = self.parameters.len();
        self.where_conditions.push(Condition {
            sql: fragment.to_string(),
            params: at..at,
            raw: true,
        });
    }

    pub(crate) fn set_group_by(&mut self, column: &str) {
        self.group_by = Some(column.to_string());
    }

    pub(crate) fn set_order_by(&mut self, column: &str, direction: &str) {
        self.order_by = Some(format!("{} {}", column, direction));
    }

    pub(crate) fn set_limit(&mut self, n: u64) {
        self.limit = Some(n);
    }

    /// Parameters of `conditions`, in condition order.
    pub(crate) fn params_of<'a>(
        &'a self,
        conditions: &'a [Condition],
    ) -> impl Iterator<Item = &'a Value> + 'a {
        conditions
            .iter()
            .flat_map(move |c| self.parameters[c.params.clone()].iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_appends_fragment_and_parameter() {
        let mut q = empty_state();
        q.push_where("status", "=", Value::from("active"));
        q.push_where("age", ">", Value::from(18));
        let sql: Vec<&str> = q.where_conditions().iter().map(Condition::sql).collect();
        assert_eq!(sql, ["status = ?", "age > ?"]);
        assert_eq!(q.parameters(), &[Value::from("active"), Value::Int(18)]);
    }

    #[test]
    fn empty_where_in_is_a_no_op() {
        let mut q = empty_state();
        q.set_table("users");
        let before = q.clone();
        q.push_where_in("id", Vec::new());
        assert_eq!(q, before);
    }

    #[test]
    fn where_in_gets_one_placeholder_per_value() {
        let mut q = empty_state();
        q.push_where_in("id", vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(q.where_conditions()[0].sql(), "id IN (?, ?, ?)");
        assert_eq!(q.where_conditions()[0].param_count(), 3);
        assert_eq!(q.parameters().len(), 3);
    }

    #[test]
    fn raw_where_binds_nothing() {
        let mut q = empty_state();
        q.push_raw_where("deleted_at IS NULL");
        assert_eq!(q.where_conditions()[0].param_count(), 0);
        assert!(q.parameters().is_empty());
    }

    #[test]
    fn single_slots_are_last_write_wins() {
        let mut q = empty_state();
        q.set_limit(10);
        q.set_limit(5);
        q.set_order_by("id", "ASC");
        q.set_order_by("name", "DESC");
        q.set_group_by("a");
        q.set_group_by("b");
        assert_eq!(q.limit(), Some(5));
        assert_eq!(q.order_by(), Some("name DESC"));
        assert_eq!(q.group_by(), Some("b"));
    }

    #[test]
    fn params_follow_condition_order_not_call_order() {
        let mut q = empty_state();
        q.push_or_where("role", "=", Value::from("admin"));
        q.push_where("status", "=", Value::from("active"));
        let where_params: Vec<&Value> = q.params_of(&q.where_conditions).collect();
        let or_params: Vec<&Value> = q.params_of(&q.or_where_conditions).collect();
        assert_eq!(where_params, [&Value::from("active")]);
        assert_eq!(or_params, [&Value::from("admin")]);
    }

    #[test]
    fn fresh_state_is_empty() {
        assert!(empty_state().is_empty());
        let mut q = empty_state();
        q.set_table("t");
        assert!(!q.is_empty());
    }
}
