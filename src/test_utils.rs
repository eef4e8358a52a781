//! In-memory driver for exercising connection lifecycles without a server.
//!
//! Enabled for this crate's own tests and, for downstream crates, by the `test-utils` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConnectParams;
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlInstanceError;
use crate::results::{QueryOutput, ResultSet};
use crate::types::{ConnectionRole, Dialect};

#[derive(Default)]
struct StubState {
    connects: Vec<(ConnectionRole, String)>,
    executed: Vec<(ConnectionRole, String)>,
    responses: VecDeque<Result<QueryOutput, SqlInstanceError>>,
    failing_connects: usize,
    fail_graceful_end: bool,
    connect_delay: Option<Duration>,
    ends: usize,
    destroys: usize,
}

/// Records every connect, query and disconnect; replies from a scripted queue.
///
/// Clones share state, so keep one handle for assertions and give a clone to the client. A
/// query with nothing queued returns an empty result set.
#[derive(Clone, Default)]
pub struct StubDriver {
    state: Arc<Mutex<StubState>>,
    dialect: Dialect,
}

impl std::fmt::Debug for StubDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubDriver")
            .field("dialect", &self.dialect)
            .field("connects", &self.connect_count())
            .finish_non_exhaustive()
    }
}

impl StubDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Queue the reply for the next query.
    pub fn push_output(&self, output: QueryOutput) {
        self.state().responses.push_back(Ok(output));
    }

    /// Queue a failure for the next query.
    pub fn push_error(&self, err: SqlInstanceError) {
        self.state().responses.push_back(Err(err));
    }

    /// Refuse the next `n` connection attempts.
    pub fn fail_next_connects(&self, n: usize) {
        self.state().failing_connects = n;
    }

    /// Make every graceful disconnect fail.
    pub fn fail_graceful_end(&self, fail: bool) {
        self.state().fail_graceful_end = fail;
    }

    /// Sleep this long inside every connect.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.state().connect_delay = Some(delay);
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state().connects.len()
    }

    #[must_use]
    pub fn connect_count_for(&self, role: ConnectionRole) -> usize {
        self.state().connects.iter().filter(|(r, _)| *r == role).count()
    }

    /// Hosts of successful connects, in order.
    #[must_use]
    pub fn connected_hosts(&self) -> Vec<String> {
        self.state().connects.iter().map(|(_, h)| h.clone()).collect()
    }

    /// Every SQL text received, with the role of the connection that ran it.
    #[must_use]
    pub fn executed(&self) -> Vec<(ConnectionRole, String)> {
        self.state().executed.clone()
    }

    #[must_use]
    pub fn end_count(&self) -> usize {
        self.state().ends
    }

    #[must_use]
    pub fn destroy_count(&self) -> usize {
        self.state().destroys
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<StubState>) -> MutexGuard<'_, StubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Driver for StubDriver {
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn DriverConnection>, SqlInstanceError> {
        let delay = self.state().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(SqlInstanceError::ConnectionError(format!(
                "connection to {} refused",
                params.host
            )));
        }
        state.connects.push((params.role, params.host.clone()));
        Ok(Box::new(StubConnection {
            role: params.role,
            state: Arc::clone(&self.state),
        }))
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

struct StubConnection {
    role: ConnectionRole,
    state: Arc<Mutex<StubState>>,
}

#[async_trait]
impl DriverConnection for StubConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryOutput, SqlInstanceError> {
        let mut state = lock(&self.state);
        state.executed.push((self.role, sql.to_string()));
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutput::Rows(ResultSet::default())))
    }

    async fn end(&mut self) -> Result<(), SqlInstanceError> {
        let mut state = lock(&self.state);
        state.ends += 1;
        if state.fail_graceful_end {
            return Err(SqlInstanceError::ConnectionError(
                "connection reset during quit".to_string(),
            ));
        }
        Ok(())
    }

    fn destroy(&mut self) {
        lock(&self.state).destroys += 1;
    }
}
