use crate::error::DbError;
use crate::render::BuiltQuery;
use tracing::Level;

/// A `tracing`-based hook that emits the SQL a builder is about to execute.
///
/// One event is emitted **before** each terminal operation reaches the
/// executor, and a WARN event when the executor fails. Parameter values are
/// never logged, only their count.
///
/// Enable via the crate feature: `chainql = { features = ["tracing"] }` (on by default).
#[derive(Debug, Clone)]
pub struct SqlTracer {
    /// Tracing event level to emit at. `None` silences the tracer.
    pub level: Option<Level>,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlTracer {
    fn default() -> Self {
        Self {
            level: Some(Level::DEBUG),
            max_sql_length: Some(200),
        }
    }
}

impl SqlTracer {
    /// Create a new tracer with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracer that emits nothing.
    pub fn disabled() -> Self {
        Self {
            level: None,
            max_sql_length: None,
        }
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.level.is_some()
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn before_execute(&self, query: &BuiltQuery) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let Some(level) = self.level else {
            return;
        };
        let sql = self.truncate_sql(&query.sql);
        emit_at_level!(
            level,
            target: "chainql.sql",
            kind = %query.kind,
            param_count = query.params.len(),
            sql = %sql,
        );
    }

    pub(crate) fn on_error(&self, query: &BuiltQuery, err: &DbError) {
        if !self.is_enabled() {
            return;
        }
        let sql = self.truncate_sql(&query.sql);
        tracing::warn!(
            target: "chainql.sql",
            kind = %query.kind,
            sql = %sql,
            code = err.code().unwrap_or("-"),
            error = %err,
            "statement failed",
        );
    }
}

/// Cut `sql` to at most `max_bytes` without splitting a UTF-8 character.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT");
        // 'é' is two bytes
        assert_eq!(truncate_sql_bytes("café", 4), "caf");
    }

    #[test]
    fn tracer_truncates_with_ellipsis() {
        let tracer = SqlTracer::new().max_sql_length(6);
        assert_eq!(tracer.truncate_sql("SELECT * FROM t"), "SELECT...");
        assert_eq!(tracer.no_truncate().truncate_sql("SELECT * FROM t"), "SELECT * FROM t");
    }

    #[test]
    fn disabled_tracer_is_silent() {
        assert!(!SqlTracer::disabled().is_enabled());
        assert!(SqlTracer::default().is_enabled());
        assert_eq!(SqlTracer::default().max_sql_length, Some(200));
    }
}
