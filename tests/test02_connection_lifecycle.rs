#![cfg(feature = "test-utils")]

use std::sync::Arc;

use sql_instance::prelude::*;
use sql_instance::test_utils::StubDriver;

fn client(driver: &StubDriver, reader_host: Option<&str>) -> SqlClient {
    let mut config = DbConfig::builder("db-primary")
        .user("app")
        .password("secret")
        .database("shop")
        .finish();
    config.reader_host = reader_host.map(str::to_string);
    SqlClient::load(Arc::new(driver.clone()), config).unwrap()
}

#[tokio::test]
async fn test02_two_reads_open_one_connection() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, None);
    let instance = RequestInstance::new();

    client.get_record(&instance, "SELECT 1").await?;
    client.get_record(&instance, "SELECT 2").await?;

    assert_eq!(driver.connect_count(), 1);
    assert_eq!(instance.pending_cleanups(), 1);
    instance.cleanup().await;
    Ok(())
}

#[tokio::test]
async fn test02_cleanup_closes_once_and_next_call_reopens() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, None);
    let instance = RequestInstance::new();

    client.set_record(&instance, "UPDATE t SET a = 1").await?;
    instance.cleanup().await;
    instance.cleanup().await;
    assert_eq!(driver.end_count(), 1);
    assert!(!instance.is_connected(ConnectionRole::Primary).await);

    client.set_record(&instance, "UPDATE t SET a = 2").await?;
    assert_eq!(driver.connect_count(), 2);
    assert_eq!(instance.pending_cleanups(), 1);
    instance.cleanup().await;
    assert_eq!(driver.end_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test02_empty_writes_open_nothing() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, None);
    let instance = RequestInstance::new();

    assert_eq!(client.set_record(&instance, "").await?, None);
    assert_eq!(client.set_record(&instance, Vec::<String>::new()).await?, None);
    assert_eq!(client.set_record(&instance, None::<&str>).await?, None);

    assert_eq!(driver.connect_count(), 0);
    assert_eq!(instance.pending_cleanups(), 0);
    Ok(())
}

#[tokio::test]
async fn test02_reader_host_gets_its_own_connection() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, Some("db-replica"));
    let instance = RequestInstance::new();

    client.get_record(&instance, "SELECT 1").await?;
    client.set_record(&instance, "DELETE FROM t").await?;
    client.get_record(&instance, "SELECT 2").await?;

    assert_eq!(driver.connect_count_for(ConnectionRole::ReadOnly), 1);
    assert_eq!(driver.connect_count_for(ConnectionRole::Primary), 1);
    assert_eq!(
        driver.connected_hosts(),
        vec!["db-replica".to_string(), "db-primary".to_string()]
    );
    assert_eq!(instance.pending_cleanups(), 2);

    instance.cleanup().await;
    assert_eq!(driver.end_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test02_reader_equal_to_primary_is_ignored() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, Some("db-primary"));
    let instance = RequestInstance::new();

    client.get_record(&instance, "SELECT 1").await?;
    client.set_record(&instance, "DELETE FROM t").await?;

    assert_eq!(driver.connect_count(), 1);
    assert!(driver
        .executed()
        .iter()
        .all(|(role, _)| *role == ConnectionRole::Primary));
    instance.cleanup().await;
    Ok(())
}

#[tokio::test]
async fn test02_connect_failure_surfaces_and_registers_nothing() {
    let driver = StubDriver::new();
    driver.fail_next_connects(1);
    let client = client(&driver, None);
    let instance = RequestInstance::new();

    let err = client.get_record(&instance, "SELECT 1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(matches!(
        err.driver_error(),
        SqlInstanceError::ConnectionError(msg) if msg.contains("db-primary")
    ));
    assert_eq!(instance.pending_cleanups(), 0);
    assert!(driver.executed().is_empty());

    // the slot stayed unopened, so the next call tries again
    client.get_record(&instance, "SELECT 1").await.unwrap();
    assert_eq!(driver.connect_count(), 1);
    instance.cleanup().await;
}

#[tokio::test]
async fn test02_failed_graceful_end_falls_back_to_destroy() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    driver.fail_graceful_end(true);
    let client = client(&driver, None);
    let instance = RequestInstance::new();

    client.get_record(&instance, "SELECT 1").await?;
    instance.cleanup().await;

    assert_eq!(driver.end_count(), 1);
    assert_eq!(driver.destroy_count(), 1);
    assert!(!instance.is_connected(ConnectionRole::Primary).await);
    Ok(())
}

#[tokio::test]
async fn test02_concurrent_reads_share_one_connect() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    driver.set_connect_delay(std::time::Duration::from_millis(25));
    let client = client(&driver, None);
    let instance = Arc::new(RequestInstance::new());

    let mut handles = Vec::new();
    for i in 0..4 {
        let client = client.clone();
        let instance = Arc::clone(&instance);
        handles.push(tokio::spawn(async move {
            client.get_record(&instance, &format!("SELECT {i}")).await
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked")?;
    }

    assert_eq!(driver.connect_count(), 1);
    assert_eq!(driver.executed().len(), 4);
    assert_eq!(instance.pending_cleanups(), 1);
    instance.cleanup().await;
    Ok(())
}

#[tokio::test]
async fn test02_reads_and_writes_run_on_spawned_tasks() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, Some("db-replica"));
    let instance = Arc::new(RequestInstance::new());

    let write = {
        let client = client.clone();
        let instance = Arc::clone(&instance);
        tokio::spawn(async move {
            client
                .set_record(&instance, vec!["DELETE FROM t", "DELETE FROM u"])
                .await
        })
    };
    let read = {
        let client = client.clone();
        let instance = Arc::clone(&instance);
        tokio::spawn(async move { client.get_record(&instance, "SELECT 1").await })
    };
    write.await.expect("write task panicked")?;
    assert_eq!(read.await.expect("read task panicked")?, Record::Empty);

    assert_eq!(driver.connect_count_for(ConnectionRole::Primary), 1);
    assert_eq!(driver.connect_count_for(ConnectionRole::ReadOnly), 1);
    instance.cleanup().await;
    assert_eq!(driver.end_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test02_scoped_connection_does_not_block_later_calls() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, None);
    let instance = RequestInstance::new();

    client
        .manager()
        .with_connection(&instance, ConnectionRole::Primary, |conn| {
            Box::pin(async move { conn.query("SET NAMES utf8mb4").await })
        })
        .await?;

    let record = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        client.get_record(&instance, "SELECT 1"),
    )
    .await
    .expect("connection released when the scope ended")?;
    assert_eq!(record, Record::Empty);
    assert_eq!(driver.connect_count(), 1);
    assert_eq!(driver.executed().len(), 2);

    tokio::time::timeout(std::time::Duration::from_secs(1), instance.cleanup())
        .await
        .expect("cleanup does not wait on a finished scope");
    assert_eq!(driver.end_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test02_batches_sum_affected_rows() -> Result<(), SqlInstanceError> {
    let driver = StubDriver::new();
    let client = client(&driver, None);
    let instance = RequestInstance::new();

    driver.push_output(QueryOutput::Multiple(vec![
        QueryOutput::affected(0),
        QueryOutput::affected(1),
        QueryOutput::affected(2),
        QueryOutput::affected(3),
        QueryOutput::affected(0),
    ]));
    let total = client
        .set_record(
            &instance,
            vec!["INSERT INTO a VALUES (1)", "UPDATE b SET x = 1", "DELETE FROM c"],
        )
        .await?;
    assert_eq!(total, Some(6));
    assert_eq!(
        driver.executed()[0].1,
        "START TRANSACTION;INSERT INTO a VALUES (1);UPDATE b SET x = 1;DELETE FROM c;COMMIT;"
    );
    instance.cleanup().await;
    Ok(())
}
