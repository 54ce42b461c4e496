/// Configuration for [`PgExecutor`](super::PgExecutor).
#[derive(Debug, Clone)]
pub struct PgExecutorConfig {
    /// Column appended as `RETURNING <col>` to INSERTs to report the generated id.
    /// `None` runs inserts without `RETURNING` and reports no id.
    ///
    /// Defaults to `id`; an INSERT into a table lacking that column fails.
    pub insert_id_column: Option<String>,
    /// Rewrite `?` placeholders to `$1..$n` before sending.
    ///
    /// Turn this off only when statements already use `$n` placeholders.
    pub rewrite_placeholders: bool,
}

impl Default for PgExecutorConfig {
    fn default() -> Self {
        Self {
            insert_id_column: Some("id".to_string()),
            rewrite_placeholders: true,
        }
    }
}

impl PgExecutorConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report generated ids from `column`.
    pub fn insert_id_column(mut self, column: impl Into<String>) -> Self {
        self.insert_id_column = Some(column.into());
        self
    }

    /// Do not append `RETURNING` to inserts.
    pub fn no_insert_id(mut self) -> Self {
        self.insert_id_column = None;
        self
    }

    /// Enable or disable `?` to `$n` rewriting.
    pub fn rewrite_placeholders(mut self, enabled: bool) -> Self {
        self.rewrite_placeholders = enabled;
        self
    }
}
