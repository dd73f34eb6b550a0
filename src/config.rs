//! Connection configuration.
//!
//! The hosting application hands every client the same pair of configs: a
//! server entry (network oriented) and a database entry. SQLite only needs
//! the database file, so most server fields are carried for parity and
//! ignored.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Server entry as stored by the hosting application.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssh_tunnel: bool,
    /// Local end of the ssh tunnel, set by the host once the tunnel is up.
    pub local_host: Option<String>,
    pub local_port: Option<u16>,
}

/// Database entry: for SQLite this is the database file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    pub database: PathBuf,
}

impl DatabaseConfig {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

/// Effective configuration of one SQLite client.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Create the file when it does not exist yet
    pub create: bool,
    /// Keep the handle open between scopes until `disconnect`
    pub keep_alive: bool,
}

impl SqliteConfig {
    /// Create a new SQLite config for the given database file
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            create: true,
            keep_alive: false,
        }
    }

    /// Resolve the effective config from the host's server and database entries.
    pub fn from_configs(server: &ServerConfig, database: &DatabaseConfig) -> Self {
        if server.host.is_some() || server.port.is_some() || server.ssh_tunnel {
            debug!(
                server = server.name.as_deref().unwrap_or_default(),
                ssh_tunnel = server.ssh_tunnel,
                "sqlite.config.network_fields_ignored"
            );
        }
        Self::new(database.database.clone())
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_database_file_and_ignores_network_fields() {
        let server = ServerConfig {
            name: Some("local".to_string()),
            host: Some("db.example.com".to_string()),
            port: Some(5432),
            ssh_tunnel: true,
            local_host: Some("127.0.0.1".to_string()),
            local_port: Some(15432),
        };
        let config = SqliteConfig::from_configs(&server, &DatabaseConfig::new("/data/app.db"));

        assert_eq!(config, SqliteConfig::new("/data/app.db"));
        assert!(config.create);
        assert!(!config.keep_alive);
    }

    #[test]
    fn deserializes_host_entries() {
        let server: ServerConfig =
            serde_json::from_str(r#"{"name":"local","sshTunnel":false,"localPort":2222}"#)
                .unwrap();
        assert_eq!(server.name.as_deref(), Some("local"));
        assert_eq!(server.local_port, Some(2222));
        assert_eq!(server.host, None);

        let database: DatabaseConfig =
            serde_json::from_str(r#"{"database":"/data/app.db"}"#).unwrap();
        assert_eq!(database.database, PathBuf::from("/data/app.db"));
    }

    #[test]
    fn builder_flags() {
        let config = SqliteConfig::new("a.db").with_create(false).with_keep_alive(true);
        assert!(!config.create);
        assert!(config.keep_alive);
        assert_eq!(config.path(), Path::new("a.db"));
    }
}
