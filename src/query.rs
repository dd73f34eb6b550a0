//! Cancellable query execution.
//!
//! A [`Query`] runs its SQL text once per [`Query::execute`] call. While the
//! engine is working, the query records its in-flight handle so that
//! [`Query::cancel`], called from any task or thread, can interrupt it.

use crate::classify::{identify_commands, StatementClassifier};
use crate::connection::ConnectionManager;
use crate::error::{AdapterError, Result};
use crate::normalize::normalize_all;
use crate::types::ResultSet;
use rusqlite::InterruptHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Handle on the connection of a running query.
pub(crate) struct InFlightQuery {
    interrupt: InterruptHandle,
    canceled: Arc<AtomicBool>,
}

impl InFlightQuery {
    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.interrupt.interrupt();
    }
}

type InFlightSlot = Arc<Mutex<Option<InFlightQuery>>>;

/// Clears the in-flight slot on every exit path of an execution.
struct InFlightGuard {
    slot: InFlightSlot,
}

impl InFlightGuard {
    fn record(slot: &InFlightSlot, in_flight: InFlightQuery) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(in_flight);
        Self {
            slot: Arc::clone(slot),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// A prepared, cancellable query.
///
/// Clones share the in-flight state, so a clone can cancel an execution
/// running elsewhere. Run at most one `execute` at a time per query.
#[derive(Clone)]
pub struct Query {
    sql: Arc<str>,
    manager: ConnectionManager,
    classifier: Arc<dyn StatementClassifier>,
    delay: Option<Duration>,
    in_flight: InFlightSlot,
}

impl Query {
    pub(crate) fn new(
        sql: &str,
        manager: ConnectionManager,
        classifier: Arc<dyn StatementClassifier>,
    ) -> Self {
        Self {
            sql: Arc::from(sql),
            manager,
            classifier,
            delay: None,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Waits `delay` after the query becomes cancellable and before the
    /// engine starts. Used to make cancellation tests deterministic.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs the query and returns one result set per statement.
    ///
    /// Fails with [`AdapterError::Canceled`] when interrupted by
    /// [`Query::cancel`].
    pub async fn execute(&self) -> Result<Vec<ResultSet>> {
        let sql = Arc::clone(&self.sql);
        let slot = Arc::clone(&self.in_flight);
        let delay = self.delay;

        debug!(sql = %self.sql, "sqlite.query.execute");
        let results = self
            .manager
            .with_connection(move |conn| {
                let canceled = Arc::new(AtomicBool::new(false));
                let _guard = InFlightGuard::record(
                    &slot,
                    InFlightQuery {
                        interrupt: conn.interrupt_handle(),
                        canceled: Arc::clone(&canceled),
                    },
                );

                if let Some(delay) = delay {
                    std::thread::sleep(delay);
                }

                conn.all_cancellable(&sql, &[], &canceled)
            })
            .await
            .map_err(AdapterError::into_canceled)?;

        let commands = identify_commands(self.classifier.as_ref(), &self.sql);
        Ok(normalize_all(results, &commands))
    }

    /// Interrupts the running execution.
    ///
    /// Fails with [`AdapterError::NotReady`] when nothing is running, which
    /// includes the window before execution starts and after it completes.
    pub fn cancel(&self) -> Result<()> {
        let in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match in_flight.as_ref() {
            Some(query) => {
                debug!(sql = %self.sql, "sqlite.query.cancel");
                query.cancel();
                Ok(())
            }
            None => Err(AdapterError::NotReady),
        }
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
