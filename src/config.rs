//! Connection configuration.
//!
//! A [`DbConfig`] is built once at startup and handed to [`crate::SqlClient::load`]. Partial
//! overrides are merged with [`DbConfig::merged`], which returns a new value and never touches
//! the original.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SqlInstanceError;
use crate::types::ConnectionRole;

/// Database connection details shared by both connection roles.
///
/// Keys follow the `HOST` / `USER` / `PASS` / `DATABASE` / `READER_HOST` layout:
/// ```rust
/// use sql_instance::prelude::*;
///
/// let cfg = DbConfig::from_json(r#"{
///     "HOST": "db-primary",
///     "USER": "app",
///     "PASS": "secret",
///     "DATABASE": "shop",
///     "READER_HOST": "db-replica"
/// }"#).unwrap();
/// assert!(cfg.reader_enabled());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DbConfig {
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(rename = "PASS", default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Optional separate instance for read-only operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// Manual Debug implementation so the password never reaches a log line
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("reader_host", &self.reader_host)
            .field("port", &self.port)
            .finish()
    }
}

impl DbConfig {
    #[must_use]
    pub fn builder(host: impl Into<String>) -> DbConfigBuilder {
        DbConfigBuilder::new(host)
    }

    /// Parse a configuration record from JSON.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConfigError` if the JSON is malformed or `HOST` is missing.
    pub fn from_json(json: &str) -> Result<Self, SqlInstanceError> {
        serde_json::from_str(json)
            .map_err(|e| SqlInstanceError::ConfigError(format!("invalid configuration: {e}")))
    }

    /// Check that a primary host is present.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConfigError` when `HOST` is empty.
    pub fn validate(&self) -> Result<(), SqlInstanceError> {
        if self.host.trim().is_empty() {
            return Err(SqlInstanceError::ConfigError("HOST is required".to_string()));
        }
        Ok(())
    }

    /// Whether reads get their own connection: a reader host is set and differs from `HOST`.
    #[must_use]
    pub fn reader_enabled(&self) -> bool {
        self.reader_host
            .as_deref()
            .map(str::trim)
            .is_some_and(|reader| !reader.is_empty() && reader != self.host.trim())
    }

    /// Return a new configuration with every field present in `overrides` replacing ours.
    #[must_use]
    pub fn merged(&self, overrides: &DbConfigOverride) -> DbConfig {
        DbConfig {
            host: overrides.host.clone().unwrap_or_else(|| self.host.clone()),
            user: overrides.user.clone().unwrap_or_else(|| self.user.clone()),
            password: overrides
                .password
                .clone()
                .unwrap_or_else(|| self.password.clone()),
            database: overrides
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
            reader_host: overrides
                .reader_host
                .clone()
                .or_else(|| self.reader_host.clone()),
            port: overrides.port.or(self.port),
        }
    }

    /// Connect parameters for `role`.
    ///
    /// A `ReadOnly` request while the reader path is disabled resolves to the primary host.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConfigError` when the resolved host is empty.
    pub fn connect_params(&self, role: ConnectionRole) -> Result<ConnectParams, SqlInstanceError> {
        let role = self.effective_role(role);
        let host = match (role, self.reader_host.as_deref()) {
            (ConnectionRole::ReadOnly, Some(reader)) => reader.trim(),
            _ => self.host.trim(),
        };
        if host.is_empty() {
            return Err(SqlInstanceError::ConfigError(format!(
                "no host configured for the {role} connection"
            )));
        }
        Ok(ConnectParams {
            role,
            host: host.to_string(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        })
    }

    /// Collapse `ReadOnly` onto `Primary` when no distinct reader host exists.
    #[must_use]
    pub fn effective_role(&self, role: ConnectionRole) -> ConnectionRole {
        match role {
            ConnectionRole::ReadOnly if self.reader_enabled() => ConnectionRole::ReadOnly,
            _ => ConnectionRole::Primary,
        }
    }
}

/// Partial configuration merged over a [`DbConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DbConfigOverride {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(rename = "PASS", default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub reader_host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl DbConfigOverride {
    /// Parse a partial configuration from JSON; unknown keys are ignored.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConfigError` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, SqlInstanceError> {
        serde_json::from_str(json)
            .map_err(|e| SqlInstanceError::ConfigError(format!("invalid configuration: {e}")))
    }

    /// Read `{prefix}HOST`, `{prefix}USER`, `{prefix}PASS`, `{prefix}DATABASE`,
    /// `{prefix}READER_HOST` and `{prefix}PORT` from the environment.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConfigError` if `{prefix}PORT` is not a valid port number.
    pub fn from_env(prefix: &str) -> Result<Self, SqlInstanceError> {
        let var = |key: &str| std::env::var(format!("{prefix}{key}")).ok();
        let port = var("PORT")
            .map(|p| {
                p.parse::<u16>().map_err(|e| {
                    SqlInstanceError::ConfigError(format!("{prefix}PORT is not a port: {e}"))
                })
            })
            .transpose()?;
        Ok(Self {
            host: var("HOST"),
            user: var("USER"),
            password: var("PASS"),
            database: var("DATABASE"),
            reader_host: var("READER_HOST"),
            port,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fluent builder for [`DbConfig`].
#[derive(Debug, Clone)]
pub struct DbConfigBuilder {
    cfg: DbConfig,
}

impl DbConfigBuilder {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            cfg: DbConfig {
                host: host.into(),
                ..DbConfig::default()
            },
        }
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.cfg.user = user.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.cfg.password = password.into();
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.cfg.database = database.into();
        self
    }

    #[must_use]
    pub fn reader_host(mut self, reader_host: impl Into<String>) -> Self {
        self.cfg.reader_host = Some(reader_host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.cfg.port = Some(port);
        self
    }

    #[must_use]
    pub fn finish(self) -> DbConfig {
        self.cfg
    }
}

/// Everything a driver needs to open one connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub role: ConnectionRole,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("role", &self.role)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}
