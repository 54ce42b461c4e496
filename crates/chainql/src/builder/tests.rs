use super::*;
use crate::render::StatementKind;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

/// Records every statement and replays queued results.
#[derive(Default)]
struct ScriptedExecutor {
    calls: Mutex<Vec<BuiltQuery>>,
    responses: Mutex<VecDeque<DbResult<ExecResult>>>,
    tx_log: Mutex<Vec<&'static str>>,
}

impl ScriptedExecutor {
    fn respond(&self, result: DbResult<ExecResult>) -> &Self {
        self.responses.lock().unwrap().push_back(result);
        self
    }

    fn calls(&self) -> Vec<BuiltQuery> {
        self.calls.lock().unwrap().clone()
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, query: &BuiltQuery) -> impl Future<Output = DbResult<ExecResult>> + Send {
        self.calls.lock().unwrap().push(query.clone());
        let next = self.responses.lock().unwrap().pop_front();
        let kind = query.kind;
        async move {
            match next {
                Some(result) => result,
                None if kind == StatementKind::Select => Ok(ExecResult::Rows(Vec::new())),
                None => Ok(ExecResult::affected(0)),
            }
        }
    }

    fn begin_transaction(&self) -> impl Future<Output = DbResult<()>> + Send {
        self.tx_log.lock().unwrap().push("begin");
        async { Ok(()) }
    }

    fn commit(&self) -> impl Future<Output = DbResult<()>> + Send {
        self.tx_log.lock().unwrap().push("commit");
        async { Ok(()) }
    }

    fn rollback(&self) -> impl Future<Output = DbResult<()>> + Send {
        self.tx_log.lock().unwrap().push("rollback");
        async { Ok(()) }
    }
}

fn user_row(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", Value::Int(id)), ("name", Value::from(name))])
}

#[tokio::test]
async fn test_get_renders_and_resets() {
    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::Rows(vec![user_row(1, "Ada")])));
    let mut db = QueryBuilder::with_executor(&exec);

    let rows = db
        .table("users")
        .where_("status", "active")
        .where_op("age", ">", 18)
        .get()
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let calls = exec.calls();
    assert_eq!(calls[0].sql, "SELECT * FROM users WHERE status = ? AND age > ?");
    assert_eq!(calls[0].params, vec![Value::from("active"), Value::Int(18)]);
    assert_eq!(*db.pending(), empty_state());
    assert_eq!(
        db.last_query(),
        Some("SELECT * FROM users WHERE status = ? AND age > ?")
    );
}

#[tokio::test]
async fn test_failed_execution_keeps_state() {
    let exec = ScriptedExecutor::default();
    exec.respond(Err(DbError::execution(Some("42P01"), "relation does not exist")));
    let mut db = QueryBuilder::with_executor(&exec);
    db.table("missing").where_("id", 1);
    let before = db.pending().clone();

    let err = db.delete().await.unwrap_err();
    assert_eq!(err.code(), Some("42P01"));
    assert_eq!(*db.pending(), before);
    assert_eq!(db.last_query(), Some("DELETE FROM missing WHERE id = ?"));
}

#[tokio::test]
async fn test_render_error_keeps_state_and_skips_executor() {
    let exec = ScriptedExecutor::default();
    let mut db = QueryBuilder::with_executor(&exec);
    db.where_("id", 1);
    let before = db.pending().clone();

    let err = db.get().await.unwrap_err();
    assert!(matches!(err, DbError::InvalidArgument(_)));
    assert_eq!(*db.pending(), before);
    assert!(exec.calls().is_empty());
    assert_eq!(db.last_query(), None);
}

#[tokio::test]
async fn test_disconnected_builder_fails_before_rendering() {
    let mut db: QueryBuilder<ScriptedExecutor> = QueryBuilder::new();
    // no table set: the connection check must win
    db.where_("id", 1);
    let before = db.pending().clone();

    assert!(db.get().await.unwrap_err().is_connection_not_established());
    assert!(db.first().await.unwrap_err().is_connection_not_established());
    assert!(matches!(
        db.insert(Record::from([("a", 1)])).await,
        Err(DbError::ConnectionNotEstablished)
    ));
    assert!(db.begin_transaction().await.is_err());
    assert_eq!(*db.pending(), before);
}

#[tokio::test]
async fn test_first_overwrites_limit() {
    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::Rows(vec![user_row(1, "Ada"), user_row(2, "Bob")])));
    let mut db = QueryBuilder::with_executor(&exec);

    let row = db.table("t").limit(10).first().await.unwrap().unwrap();
    assert_eq!(row.try_get::<i64>("id").unwrap(), 1);
    assert_eq!(exec.calls()[0].sql, "SELECT * FROM t LIMIT 1");
    assert!(db.pending().is_empty());
}

#[tokio::test]
async fn test_first_restores_limit_on_failure() {
    let exec = ScriptedExecutor::default();
    exec.respond(Err(DbError::execution(None::<String>, "boom")));
    let mut db = QueryBuilder::with_executor(&exec);
    db.table("t").limit(10);

    assert!(db.first().await.is_err());
    assert_eq!(db.pending().limit(), Some(10));
}

#[tokio::test]
async fn test_first_on_empty_result() {
    let exec = ScriptedExecutor::default();
    let mut db = QueryBuilder::with_executor(&exec);
    assert!(db.table("t").first().await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_returns_reported_id() {
    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::inserted(Some(42), 1)));
    let mut db = QueryBuilder::with_executor(&exec);

    let id = db
        .table("users")
        .where_("ignored", 1)
        .insert(Record::new().set("name", "John").set("email", "j@x.com"))
        .await
        .unwrap();

    assert_eq!(id, Some(42));
    let call = &exec.calls()[0];
    assert_eq!(call.sql, "INSERT INTO users (name, email) VALUES (?, ?)");
    assert_eq!(call.params, vec![Value::from("John"), Value::from("j@x.com")]);
    assert!(db.pending().is_empty());
    // executor-side RETURNING and `$n` rewriting never show up here
    assert_eq!(
        db.last_query(),
        Some("INSERT INTO users (name, email) VALUES (?, ?)")
    );
}

#[tokio::test]
async fn test_raw_where_is_grouped_in_sent_sql() {
    let exec = ScriptedExecutor::default();
    let mut db = QueryBuilder::with_executor(&exec);

    db.table("sessions")
        .where_("user_id", 9)
        .raw_where("expires_at IS NULL OR revoked")
        .delete()
        .await
        .unwrap();

    assert_eq!(
        exec.calls()[0].sql,
        "DELETE FROM sessions WHERE user_id = ? AND (expires_at IS NULL OR revoked)"
    );
}

#[tokio::test]
async fn test_insert_many_in_one_statement() {
    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::inserted(Some(7), 2)));
    let mut db = QueryBuilder::with_executor(&exec);

    let id = db
        .table("tags")
        .insert_many([[("name", "a")], [("name", "b")]])
        .await
        .unwrap();

    assert_eq!(id, Some(7));
    assert_eq!(exec.calls()[0].sql, "INSERT INTO tags (name) VALUES (?), (?)");
}

#[tokio::test]
async fn test_update_reports_affected_rows() {
    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::affected(1)));
    exec.respond(Ok(ExecResult::affected(0)));
    let mut db = QueryBuilder::with_executor(&exec);

    let changed = db
        .table("users")
        .where_("id", 1)
        .update([("status", "deleted")])
        .await
        .unwrap();
    assert!(changed);

    let call = &exec.calls()[0];
    assert_eq!(call.sql, "UPDATE users SET status = ? WHERE id = ?");
    assert_eq!(call.params, vec![Value::from("deleted"), Value::Int(1)]);

    let changed = db
        .table("users")
        .where_("id", 2)
        .update([("status", "deleted")])
        .await
        .unwrap();
    assert!(!changed);
}

#[tokio::test]
async fn test_delete_reports_affected_rows() {
    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::affected(3)));
    let mut db = QueryBuilder::with_executor(&exec);

    assert!(db.table("sessions").where_op("expires_at", "<", "2024-01-01").delete().await.unwrap());
    assert_eq!(exec.calls()[0].sql, "DELETE FROM sessions WHERE expires_at < ?");
}

#[tokio::test]
async fn test_wrong_result_shape_is_rejected() {
    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::affected(1)));
    let mut db = QueryBuilder::with_executor(&exec);
    db.table("users");

    let err = db.get().await.unwrap_err();
    assert!(matches!(err, DbError::UnexpectedResult(_)));
    assert_eq!(db.pending().table(), Some("users"));
}

#[tokio::test]
async fn test_get_as_maps_rows() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    impl FromRow for User {
        fn from_row(row: &Row) -> DbResult<Self> {
            row.deserialize()
        }
    }

    let exec = ScriptedExecutor::default();
    exec.respond(Ok(ExecResult::Rows(vec![user_row(1, "Ada")])));
    let mut db = QueryBuilder::with_executor(&exec);

    let users: Vec<User> = db.table("users").get_as().await.unwrap();
    assert_eq!(
        users,
        vec![User {
            id: 1,
            name: "Ada".into()
        }]
    );
}

#[tokio::test]
async fn test_transactions_pass_through() {
    let exec = ScriptedExecutor::default();
    let mut db = QueryBuilder::with_executor(&exec);
    db.table("users").where_("id", 1);

    db.begin_transaction().await.unwrap();
    db.commit().await.unwrap();
    db.rollback().await.unwrap();

    assert_eq!(*exec.tx_log.lock().unwrap(), ["begin", "commit", "rollback"]);
    assert_eq!(db.pending().table(), Some("users"));
    assert!(exec.calls().is_empty());
}

#[test]
fn test_where_in_empty_is_a_no_op() {
    let mut db: QueryBuilder<ScriptedExecutor> = QueryBuilder::new();
    db.table("users");
    let before = db.pending().clone();
    db.where_in("id", Vec::<i64>::new());
    assert_eq!(*db.pending(), before);

    db.where_in("id", [1, 2, 3]);
    assert_eq!(
        db.to_select_sql().unwrap().sql,
        "SELECT * FROM users WHERE id IN (?, ?, ?)"
    );
}

#[test]
fn test_join_helpers() {
    let mut db: QueryBuilder<ScriptedExecutor> = QueryBuilder::new();
    db.table("users u")
        .left_join("orders o", "o.user_id = u.id")
        .inner_join("teams t", "t.id = u.team_id")
        .join("roles r", "r.id = u.role_id");
    assert_eq!(
        db.pending().joins(),
        [
            "LEFT JOIN orders o ON o.user_id = u.id",
            "INNER JOIN teams t ON t.id = u.team_id",
            "JOIN roles r ON r.id = u.role_id",
        ]
    );
}

#[test]
fn test_reset_and_connection_management() {
    let mut db: QueryBuilder<ScriptedExecutor> = QueryBuilder::new();
    assert!(!db.is_connected());
    db.connect(ScriptedExecutor::default());
    assert!(db.is_connected());

    db.table("users").limit(3);
    db.reset();
    assert!(db.pending().is_empty());

    assert!(db.disconnect().is_some());
    assert!(db.executor().is_none());
}
