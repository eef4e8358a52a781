//! Reads and writes against a [`RequestInstance`]'s lazily opened connections.

mod read;
mod write;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::{DbConfig, DbConfigOverride};
use crate::driver::Driver;
use crate::error::SqlInstanceError;
use crate::instance::RequestInstance;
use crate::manager::ConnectionManager;
use crate::query_builder::{self, JoinOperator, SqlInput};
use crate::results::QueryOutput;
use crate::types::{ConnectionRole, Dialect};

pub use read::{Record, normalize};
pub use write::SqlUnit;

/// Entry point: owns the configuration and driver, and runs SQL for any number of instances.
///
/// ```rust,no_run
/// # #[cfg(feature = "mysql")]
/// # async fn demo() -> Result<(), sql_instance::SqlInstanceError> {
/// use std::sync::Arc;
/// use sql_instance::prelude::*;
///
/// let config = DbConfig::builder("db-primary").user("app").password("secret").database("shop").finish();
/// let client = SqlClient::load(Arc::new(MySqlDriver::new()), config)?;
///
/// let instance = RequestInstance::new();
/// let count = client.get_record(&instance, "SELECT COUNT(*) FROM orders").await?;
/// client.set_record(&instance, vec!["UPDATE a SET x = 1", "UPDATE b SET y = 2"]).await?;
/// instance.cleanup().await;
/// # let _ = count;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqlClient {
    manager: ConnectionManager,
}

impl SqlClient {
    /// Validate `config` and build a client around `driver`.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConfigError` when `HOST` is missing.
    pub fn load(driver: Arc<dyn Driver>, config: DbConfig) -> Result<Self, SqlInstanceError> {
        config.validate()?;
        Ok(Self {
            manager: ConnectionManager::new(config, driver),
        })
    }

    /// [`SqlClient::load`] with `overrides` merged over `config` first.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConfigError` when the merged configuration has no `HOST`.
    pub fn load_with_overrides(
        driver: Arc<dyn Driver>,
        config: &DbConfig,
        overrides: &DbConfigOverride,
    ) -> Result<Self, SqlInstanceError> {
        Self::load(driver, config.merged(overrides))
    }

    #[must_use]
    pub fn config(&self) -> &DbConfig {
        self.manager.config()
    }

    #[must_use]
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.manager.dialect()
    }

    /// [`query_builder::build_query`] with this client's dialect.
    ///
    /// # Errors
    /// See [`query_builder::build_query`].
    pub fn build_query(&self, template: &str, inputs: &[SqlInput]) -> Result<String, SqlInstanceError> {
        query_builder::build_query_for(self.dialect(), template, inputs)
    }

    /// [`query_builder::build_multi_condition`] with this client's dialect.
    ///
    /// # Errors
    /// See [`query_builder::build_multi_condition`].
    pub fn build_multi_condition(
        &self,
        fields: &IndexMap<String, SqlInput>,
        operator: JoinOperator,
    ) -> Result<String, SqlInstanceError> {
        query_builder::build_multi_condition_for(self.dialect(), fields, operator)
    }

    async fn run_on(
        &self,
        instance: &RequestInstance,
        role: ConnectionRole,
        sql: &str,
    ) -> Result<QueryOutput, SqlInstanceError> {
        let mut handle = self.manager.ensure_connection(instance, role).await?;
        handle.connection()?.query(sql).await
    }
}
