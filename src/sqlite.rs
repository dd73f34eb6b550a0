use crate::catalog;
use crate::classify::{identify_commands, KeywordClassifier, StatementClassifier};
use crate::client::DatabaseClient;
use crate::config::{DatabaseConfig, ServerConfig, SqliteConfig};
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::normalize::normalize_all;
use crate::query::Query;
use crate::types::{ColumnDescriptor, ResultSet};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Statement used to check that the database answers.
const VERSION_PROBE: &str = "SELECT sqlite_version() AS version";

/// Wraps `value` in square brackets; the `*` wildcard is left alone.
///
/// Closing brackets inside `value` are not escaped.
pub fn wrap_identifier(value: &str) -> String {
    if value == "*" {
        value.to_string()
    } else {
        format!("[{value}]")
    }
}

pub fn get_query_select_top(table: &str, limit: u64) -> String {
    format!("SELECT TOP {limit} * FROM {}", wrap_identifier(table))
}

/// Statements clearing every user table in `tables` and, when the database
/// has one, their `sqlite_sequence` entries.
fn truncate_sql(tables: &[String]) -> String {
    let has_sequence = tables.iter().any(|table| table == "sqlite_sequence");
    tables
        .iter()
        .filter(|table| !table.starts_with("sqlite_"))
        .map(|table| {
            let mut sql = format!("DELETE FROM {};\n", wrap_identifier(table));
            if has_sequence {
                sql.push_str(&format!(
                    "DELETE FROM sqlite_sequence WHERE name = '{}';\n",
                    table.replace('\'', "''")
                ));
            }
            sql
        })
        .collect()
}

/// Connects to the database described by the host's config entries.
///
/// Fails with a connection error when the file cannot be opened or does not
/// answer a version probe.
pub async fn connect(server: &ServerConfig, database: &DatabaseConfig) -> Result<SqliteClient> {
    SqliteClient::open(SqliteConfig::from_configs(server, database)).await
}

/// Client for one SQLite database file.
#[derive(Clone)]
pub struct SqliteClient {
    manager: ConnectionManager,
    classifier: Arc<dyn StatementClassifier>,
}

impl SqliteClient {
    /// Create a client without touching the database.
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            manager: ConnectionManager::new(config),
            classifier: Arc::new(KeywordClassifier),
        }
    }

    /// Create a client and probe the database.
    pub async fn open(config: SqliteConfig) -> Result<Self> {
        let path = config.db_path.clone();
        info!(path = %path.display(), "sqlite.connect");

        let client = Self::new(config);
        let probe = client
            .execute_query(VERSION_PROBE)
            .await
            .map_err(|err| err.into_connection_failed(path))?;
        if let Some(version) = probe.first().map(|result| result.text_column("version")) {
            debug!(version = ?version, "sqlite.connect.probe");
        }
        Ok(client)
    }

    /// Replaces the statement classifier used to label result sets.
    pub fn with_classifier(mut self, classifier: Arc<dyn StatementClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &SqliteConfig {
        self.manager.config()
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.manager
    }
}

impl std::fmt::Debug for SqliteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteClient")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn wrap_identifier(&self, value: &str) -> String {
        wrap_identifier(value)
    }

    async fn disconnect(&self) -> Result<()> {
        self.manager.disconnect().await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.manager.with_connection(catalog::list_tables).await
    }

    async fn list_views(&self) -> Result<Vec<String>> {
        self.manager.with_connection(catalog::list_views).await
    }

    async fn list_routines(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn list_table_columns(
        &self,
        _database: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>> {
        let table = table.to_string();
        self.manager
            .with_connection(move |conn| catalog::list_table_columns(conn, &table))
            .await
    }

    async fn list_table_triggers(&self, table: &str) -> Result<Vec<String>> {
        let table = table.to_string();
        self.manager
            .with_connection(move |conn| catalog::list_table_triggers(conn, &table))
            .await
    }

    async fn list_table_indexes(&self, _database: &str, table: &str) -> Result<Vec<String>> {
        let table = table.to_string();
        self.manager
            .with_connection(move |conn| catalog::list_table_indexes(conn, &table))
            .await
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        self.manager.with_connection(catalog::list_databases).await
    }

    async fn get_table_references(&self, _table: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn get_table_keys(&self, _database: &str, _table: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn query(&self, sql: &str) -> Query {
        Query::new(sql, self.manager.clone(), Arc::clone(&self.classifier))
    }

    async fn execute_query(&self, sql: &str) -> Result<Vec<ResultSet>> {
        let text = sql.to_string();
        debug!(sql = %sql, "sqlite.execute_query");
        let results = self
            .manager
            .with_connection(move |conn| conn.all(&text, &[]))
            .await?;

        // Statements without result columns still yield an empty raw result,
        // so mutation-only batches get one result set per statement.
        let commands = identify_commands(self.classifier.as_ref(), sql);
        Ok(normalize_all(results, &commands))
    }

    fn get_query_select_top(&self, table: &str, limit: u64) -> String {
        get_query_select_top(table, limit)
    }

    async fn get_table_create_script(&self, table: &str) -> Result<Vec<String>> {
        let table = table.to_string();
        self.manager
            .with_connection(move |conn| catalog::create_script(conn, &table))
            .await
    }

    async fn get_view_create_script(&self, view: &str) -> Result<Vec<String>> {
        let view = view.to_string();
        self.manager
            .with_connection(move |conn| catalog::create_script(conn, &view))
            .await
    }

    async fn get_routine_create_script(&self, _routine: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn truncate_all_tables(&self) -> Result<()> {
        self.manager
            .with_connection(|conn| {
                let sql = truncate_sql(&catalog::list_tables(conn)?);
                if !sql.is_empty() {
                    debug!(path = %conn.path().display(), "sqlite.truncate_all_tables");
                    conn.all(&sql, &[])?;
                }
                Ok(())
            })
            .await
    }
}
