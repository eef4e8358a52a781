#![cfg(feature = "mysql")]

//! Runs against a live server only when `SQL_INSTANCE_MYSQL_HOST` is set; the other connection
//! settings come from `SQL_INSTANCE_MYSQL_USER`, `_PASS`, `_DATABASE` and `_PORT`.

use std::sync::Arc;

use sql_instance::prelude::*;

fn live_client() -> Option<SqlClient> {
    let overrides = DbConfigOverride::from_env("SQL_INSTANCE_MYSQL_").ok()?;
    overrides.host.as_ref()?;
    SqlClient::load_with_overrides(Arc::new(MySqlDriver::new()), &DbConfig::default(), &overrides).ok()
}

#[tokio::test]
async fn test05_mysql_round_trip() -> Result<(), SqlInstanceError> {
    let Some(client) = live_client() else {
        eprintln!("SQL_INSTANCE_MYSQL_HOST not set; skipping");
        return Ok(());
    };
    let instance = RequestInstance::new();

    client
        .set_record(
            &instance,
            vec![
                "DROP TABLE IF EXISTS sql_instance_test",
                "CREATE TABLE sql_instance_test (id INT PRIMARY KEY, title VARCHAR(64), score INT) DEFAULT CHARSET=utf8mb4",
            ],
        )
        .await?;

    let mut rows = Vec::new();
    for (id, title) in [(1, "it's"), (2, "back\\slash"), (3, "emoji 😀")] {
        rows.push(client.build_query(
            "INSERT INTO sql_instance_test SET ?",
            &[SqlInput::field_map([
                ("id", SqlInput::from(id)),
                ("title", SqlInput::from(title)),
                ("score", SqlInput::from(0)),
            ])],
        )?);
    }
    let affected = client.set_record(&instance, rows).await?;
    assert_eq!(affected, Some(3));

    let title = client
        .get_record(&instance, "SELECT title FROM sql_instance_test WHERE id = 2")
        .await?;
    assert_eq!(title, Record::Scalar(SqlValue::Text("back\\slash".into())));

    let zero = client
        .get_record(&instance, "SELECT score FROM sql_instance_test WHERE id = 1")
        .await?;
    assert_eq!(zero, Record::Scalar(SqlValue::Int(0)));

    let all = client
        .get_record(&instance, "SELECT id, title FROM sql_instance_test ORDER BY id")
        .await?;
    assert!(all.has_multiple_rows());

    // duplicate key in the second statement discards the first
    assert!(client
        .set_record(
            &instance,
            vec![
                "INSERT INTO sql_instance_test (id, title) VALUES (4, 'x')",
                "INSERT INTO sql_instance_test (id, title) VALUES (1, 'dup')",
            ],
        )
        .await
        .is_err());
    let count = client
        .get_record(&instance, "SELECT COUNT(*) FROM sql_instance_test")
        .await?;
    assert_eq!(count.scalar().and_then(SqlValue::as_int), Some(3));

    client
        .set_record(&instance, "DROP TABLE sql_instance_test")
        .await?;
    instance.cleanup().await;
    Ok(())
}

#[tokio::test]
async fn test05_mysql_unreachable_host_is_a_connection_error() {
    let config = DbConfig::builder("127.0.0.1").port(1).user("nobody").finish();
    let client = SqlClient::load(Arc::new(MySqlDriver::new()), config).unwrap();
    let instance = RequestInstance::new();

    let err = client.get_record(&instance, "SELECT 1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(matches!(err, SqlInstanceError::ConnectFailed { role: ConnectionRole::Primary, .. }));
    assert_eq!(instance.pending_cleanups(), 0);
}
