use crate::error::Result;
use crate::query::Query;
use crate::types::{ColumnDescriptor, ResultSet};
use async_trait::async_trait;

/// Contract every database client exposes to the hosting application.
///
/// Capabilities the engine lacks answer with an empty list instead of an
/// error, so "unsupported" and "nothing found" look the same to the host.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Quotes an identifier for this engine.
    fn wrap_identifier(&self, value: &str) -> String;

    async fn disconnect(&self) -> Result<()>;

    async fn list_tables(&self) -> Result<Vec<String>>;
    async fn list_views(&self) -> Result<Vec<String>>;
    async fn list_routines(&self) -> Result<Vec<String>>;
    async fn list_table_columns(&self, database: &str, table: &str)
        -> Result<Vec<ColumnDescriptor>>;
    async fn list_table_triggers(&self, table: &str) -> Result<Vec<String>>;
    async fn list_table_indexes(&self, database: &str, table: &str) -> Result<Vec<String>>;
    async fn list_schemas(&self) -> Result<Vec<String>>;
    async fn list_databases(&self) -> Result<Vec<String>>;

    async fn get_table_references(&self, table: &str) -> Result<Vec<String>>;
    async fn get_table_keys(&self, database: &str, table: &str) -> Result<Vec<String>>;

    /// Prepares a cancellable query.
    fn query(&self, sql: &str) -> Query;

    /// Runs `sql` to completion, one result set per statement.
    async fn execute_query(&self, sql: &str) -> Result<Vec<ResultSet>>;

    /// SQL selecting the first `limit` rows of `table`.
    fn get_query_select_top(&self, table: &str, limit: u64) -> String;

    async fn get_table_create_script(&self, table: &str) -> Result<Vec<String>>;
    async fn get_view_create_script(&self, view: &str) -> Result<Vec<String>>;
    async fn get_routine_create_script(&self, routine: &str) -> Result<Vec<String>>;

    /// Deletes every row of every user table and resets their sequences.
    async fn truncate_all_tables(&self) -> Result<()>;
}
