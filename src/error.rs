//! Error types for the SQLite client.
//!
//! Every fallible operation returns [`AdapterError`]. Callers that only care
//! about the broad category can match on [`AdapterError::kind`].

use std::path::PathBuf;
use thiserror::Error;

/// Marker attached to errors caused by a user-issued cancel.
pub const CANCELED_BY_USER: &str = "CANCELED_BY_USER";

/// Alias for `Result<T, AdapterError>`.
pub type Result<T, E = AdapterError> = std::result::Result<T, E>;

/// Broad error categories exposed to the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening the database or the reachability probe failed.
    ConnectionFailed,
    /// The running query was interrupted by [`crate::Query::cancel`].
    Canceled,
    /// Cancel was requested while no query was in flight.
    NotReady,
    /// Any other engine failure.
    EngineError,
}

#[derive(Error, Debug)]
pub enum AdapterError {
    /// The database file could not be opened or did not answer the probe.
    #[error("failed to connect to sqlite database {}: {source}", .path.display())]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The engine reported an interrupt raised by a cancel request.
    #[error("query canceled by user")]
    Canceled {
        #[source]
        source: rusqlite::Error,
    },

    #[error("query not ready to be canceled")]
    NotReady,

    #[error("{context}: {source}")]
    Engine {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The blocking worker running the engine call panicked or was aborted.
    #[error("sqlite worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl AdapterError {
    pub(crate) fn engine(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Engine {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Self::Canceled { .. } => ErrorKind::Canceled,
            Self::NotReady => ErrorKind::NotReady,
            Self::Engine { .. } | Self::Worker(_) => ErrorKind::EngineError,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.kind() == ErrorKind::Canceled
    }

    /// Returns [`CANCELED_BY_USER`] for cancellations, `None` otherwise.
    pub fn marker(&self) -> Option<&'static str> {
        self.is_canceled().then_some(CANCELED_BY_USER)
    }

    /// Re-tags an engine interrupt as a user cancellation.
    pub(crate) fn into_canceled(self) -> Self {
        match self {
            Self::Engine { source, .. } if is_interrupt(&source) => Self::Canceled { source },
            other => other,
        }
    }

    /// Re-tags any engine failure as a connection failure for `path`.
    pub(crate) fn into_connection_failed(self, path: PathBuf) -> Self {
        match self {
            Self::Engine { source, .. } | Self::Canceled { source } => {
                Self::ConnectionFailed { path, source }
            }
            other => other,
        }
    }
}

/// Whether the engine error is SQLite's `SQLITE_INTERRUPT`.
pub(crate) fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::OperationInterrupted
    )
}

/// The error SQLite itself raises for an interrupted statement.
pub(crate) fn interrupted() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
        Some("interrupted".to_string()),
    )
}
