//! Lazy, per-instance connections.
//!
//! Each (instance, role) pair moves through Unopened → Opening → Open and back to Unopened when
//! its close routine runs. The slot's async mutex is held while a connection is being opened, so
//! concurrent callers for the same pair queue behind the first and reuse what it opened.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::MutexGuard;
use tracing::{debug, error, warn};

use crate::config::DbConfig;
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlInstanceError;
use crate::instance::{CleanupRoutine, RequestInstance};
use crate::types::{Access, ConnectionRole, Dialect};

/// Future returned by a [`ConnectionManager::with_connection`] callback.
pub type ConnectionFuture<'c, R> =
    Pin<Box<dyn Future<Output = Result<R, SqlInstanceError>> + Send + 'c>>;

/// Exclusive use of an instance's open connection; the slot stays locked until drop.
pub(crate) struct ConnectionHandle<'i> {
    slot: MutexGuard<'i, Option<Box<dyn DriverConnection>>>,
    role: ConnectionRole,
}

impl ConnectionHandle<'_> {
    pub(crate) fn connection(
        &mut self,
    ) -> Result<&mut (dyn DriverConnection + 'static), SqlInstanceError> {
        let role = self.role;
        self.slot.as_deref_mut().ok_or_else(|| {
            SqlInstanceError::ConnectionError(format!("{role} connection slot is empty"))
        })
    }
}

/// Opens, caches and closes connections on [`RequestInstance`]s.
#[derive(Clone)]
pub struct ConnectionManager {
    config: Arc<DbConfig>,
    driver: Arc<dyn Driver>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("dialect", &self.driver.dialect())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(config: DbConfig, driver: Arc<dyn Driver>) -> Self {
        Self {
            config: Arc::new(config),
            driver,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    /// Reads use the reader only when one is configured on a different host; writes never do.
    #[must_use]
    pub fn route(&self, access: Access) -> ConnectionRole {
        match access {
            Access::Read if self.config.reader_enabled() => ConnectionRole::ReadOnly,
            _ => ConnectionRole::Primary,
        }
    }

    /// Return the instance's connection for `role`, opening it on first use.
    ///
    /// A `ReadOnly` request is served by the primary connection when no distinct reader host is
    /// configured. On success a close routine for that role is registered with the instance.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConnectFailed` wrapping the driver's error (or the
    /// configuration error) when the connection cannot be opened; the slot stays unopened.
    pub(crate) async fn ensure_connection<'i>(
        &self,
        instance: &'i RequestInstance,
        role: ConnectionRole,
    ) -> Result<ConnectionHandle<'i>, SqlInstanceError> {
        let role = self.config.effective_role(role);
        let mut slot = instance.slot(role).lock().await;

        if slot.is_none() {
            *slot = Some(self.open(instance, role).await?);
            instance.add_cleanup_routine(CloseConnection { role });
        }

        Ok(ConnectionHandle { slot, role })
    }

    /// Run `f` on the instance's connection for `role`, opening it on first use.
    ///
    /// The connection is exclusive to `f` until its future completes. Every other operation on
    /// the same instance and role waits for that, so `f` must not call back into them.
    ///
    /// ```rust,no_run
    /// # async fn demo(client: &sql_instance::SqlClient) -> Result<(), sql_instance::SqlInstanceError> {
    /// use sql_instance::prelude::*;
    ///
    /// let instance = RequestInstance::new();
    /// let output = client
    ///     .manager()
    ///     .with_connection(&instance, ConnectionRole::Primary, |conn| {
    ///         Box::pin(async move { conn.query("SET NAMES utf8mb4").await })
    ///     })
    ///     .await?;
    /// # let _ = output;
    /// instance.cleanup().await;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConnectFailed` when the connection cannot be opened, otherwise
    /// whatever `f` returns.
    pub async fn with_connection<R, F>(
        &self,
        instance: &RequestInstance,
        role: ConnectionRole,
        f: F,
    ) -> Result<R, SqlInstanceError>
    where
        F: for<'c> FnOnce(&'c mut (dyn DriverConnection + 'static)) -> ConnectionFuture<'c, R>
            + Send,
        R: Send,
    {
        let mut handle = self.ensure_connection(instance, role).await?;
        f(handle.connection()?).await
    }

    async fn open(
        &self,
        instance: &RequestInstance,
        role: ConnectionRole,
    ) -> Result<Box<dyn DriverConnection>, SqlInstanceError> {
        let connect_failed = |source: SqlInstanceError| {
            error!(
                instance = instance.id(),
                %role,
                error = %source,
                "Database connection failed"
            );
            SqlInstanceError::ConnectFailed {
                role,
                source: Box::new(source),
            }
        };

        let params = self.config.connect_params(role).map_err(connect_failed)?;
        debug!(
            instance = instance.id(),
            elapsed_ms = instance.elapsed_ms(),
            %role,
            host = %params.host,
            "Init-Start Database Connection"
        );
        let conn = self.driver.connect(&params).await.map_err(connect_failed)?;
        debug!(
            instance = instance.id(),
            elapsed_ms = instance.elapsed_ms(),
            %role,
            "Init-End Database Connection"
        );
        Ok(conn)
    }
}

/// Close the instance's connection for `role` and clear the slot.
///
/// Tries a graceful disconnect first and falls back to dropping the connection. Does nothing
/// when the slot was never opened.
pub async fn close(instance: &RequestInstance, role: ConnectionRole) {
    let Some(mut conn) = instance.slot(role).lock().await.take() else {
        return;
    };
    if let Err(err) = conn.end().await {
        warn!(
            instance = instance.id(),
            %role,
            error = %err,
            "graceful disconnect failed; destroying connection"
        );
        conn.destroy();
    }
    debug!(instance = instance.id(), %role, "connection closed");
}

/// Teardown hook registered once per successful open.
#[derive(Debug, Clone, Copy)]
struct CloseConnection {
    role: ConnectionRole,
}

#[async_trait]
impl CleanupRoutine for CloseConnection {
    async fn run(&self, instance: &RequestInstance) {
        close(instance, self.role).await;
    }

    fn name(&self) -> &str {
        match self.role {
            ConnectionRole::Primary => "close primary connection",
            ConnectionRole::ReadOnly => "close read-only connection",
        }
    }
}
