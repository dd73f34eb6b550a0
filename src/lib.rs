//! SQLite client adapter for schema browsers and query consoles.
//!
//! # Intention
//!
//! - Run arbitrary SQL text against one database file and return a uniform
//!   [`ResultSet`] per statement, whether it selected rows or mutated them.
//! - Let a running query be canceled from another task.
//! - Answer the introspection questions a schema browser asks (tables, views,
//!   columns, indexes, triggers, create scripts).
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - One connection per client, no pooling; statements on it run in order.
//! - The hosting application owns configuration loading and presentation.

pub mod catalog;
pub mod classify;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod normalize;
pub mod query;
pub mod sqlite;
pub mod types;

pub use classify::{KeywordClassifier, StatementClassifier, StatementKind};
pub use client::DatabaseClient;
pub use config::{DatabaseConfig, ServerConfig, SqliteConfig};
pub use connection::{ConnectionHandle, ConnectionManager};
pub use error::{AdapterError, ErrorKind, Result, CANCELED_BY_USER};
pub use normalize::normalize;
pub use query::Query;
pub use sqlite::{connect, get_query_select_top, wrap_identifier, SqliteClient};
pub use types::{ColumnDescriptor, Field, RawResult, ResultSet, Row, Value};
