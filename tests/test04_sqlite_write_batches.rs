#![cfg(feature = "sqlite")]

use std::sync::Arc;

use sql_instance::prelude::*;

async fn count(client: &SqlClient, instance: &RequestInstance) -> Result<i64, SqlInstanceError> {
    let record = client
        .get_record(instance, "SELECT COUNT(*) AS cnt FROM ledger")
        .await?;
    record
        .scalar()
        .and_then(SqlValue::as_int)
        .ok_or_else(|| SqlInstanceError::ExecutionError("missing count".into()))
}

#[test]
fn test04_batches_are_all_or_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ledger.db").to_string_lossy().into_owned();
    let client = SqlClient::load(Arc::new(SqliteDriver::new()), DbConfig::builder(path).finish())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let instance = RequestInstance::new();
        client
            .set_record(
                &instance,
                "CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER NOT NULL)",
            )
            .await?;

        // three statements: inserts and an update, counts summed across all of them
        let affected = client
            .set_record(
                &instance,
                vec![
                    "INSERT INTO ledger (id, amount) VALUES (1, 10), (2, 20);",
                    "INSERT INTO ledger (id, amount) VALUES (3, 30)",
                    "UPDATE ledger SET amount = amount + 1",
                ],
            )
            .await?;
        assert_eq!(affected, Some(6));
        assert_eq!(count(&client, &instance).await?, 3);

        // second statement violates the primary key, so the first must not stick
        let err = client
            .set_record(
                &instance,
                vec![
                    "INSERT INTO ledger (id, amount) VALUES (4, 40)",
                    "INSERT INTO ledger (id, amount) VALUES (1, 99)",
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
        assert_eq!(count(&client, &instance).await?, 3);

        // the connection is still usable and not stuck inside the aborted transaction
        let single = client
            .set_record(&instance, vec!["INSERT INTO ledger (id, amount) VALUES (4, 40)"])
            .await?;
        assert_eq!(single, Some(1));
        assert_eq!(count(&client, &instance).await?, 4);

        instance.cleanup().await;

        let fresh = RequestInstance::new();
        assert_eq!(count(&client, &fresh).await?, 4);
        fresh.cleanup().await;
        Ok::<(), SqlInstanceError>(())
    })?;
    Ok(())
}

#[tokio::test]
async fn test04_single_statement_failure_keeps_earlier_writes() -> Result<(), SqlInstanceError> {
    let client = SqlClient::load(
        Arc::new(SqliteDriver::new()),
        DbConfig::builder(":memory:").finish(),
    )?;
    let instance = RequestInstance::new();

    client
        .set_record(&instance, "CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER)")
        .await?;
    client
        .set_record(&instance, "INSERT INTO ledger VALUES (1, 1)")
        .await?;
    assert!(client
        .set_record(&instance, "INSERT INTO ledger VALUES (1, 2)")
        .await
        .is_err());
    assert_eq!(count(&client, &instance).await?, 1);

    instance.cleanup().await;
    Ok(())
}
