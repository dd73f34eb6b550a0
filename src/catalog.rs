//! Canned introspection queries.
//!
//! Each function runs against a handle obtained by the caller, so several of
//! them can share one connection scope.

use crate::classify::StatementKind;
use crate::connection::ConnectionHandle;
use crate::error::Result;
use crate::normalize::normalize;
use crate::types::{ColumnDescriptor, ResultSet, Value};

const LIST_TABLES: &str = "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name";
const LIST_VIEWS: &str = "SELECT name FROM sqlite_master WHERE type = 'view'";
const LIST_COLUMNS: &str = "SELECT name, type FROM pragma_table_info(?1)";
const LIST_TRIGGERS: &str =
    "SELECT name FROM sqlite_master WHERE type = 'trigger' AND tbl_name = ?1";
const LIST_INDEXES: &str = "SELECT name FROM pragma_index_list(?1)";
const LIST_DATABASES: &str = "PRAGMA database_list";
const CREATE_SCRIPT: &str = "SELECT sql FROM sqlite_master WHERE name = ?1";

/// Runs one catalog query; every catalog query is a single SELECT.
fn fetch(conn: &ConnectionHandle, sql: &str, params: &[Value]) -> Result<ResultSet> {
    let mut raw = conn.all(sql, params)?.into_iter();
    let first = raw.next().unwrap_or_default();
    Ok(normalize(
        first.rows,
        Some(StatementKind::Select),
        first.affected_rows,
    ))
}

/// Table names in ascending order, SQLite internal tables included.
pub fn list_tables(conn: &ConnectionHandle) -> Result<Vec<String>> {
    Ok(fetch(conn, LIST_TABLES, &[])?.text_column("name"))
}

pub fn list_views(conn: &ConnectionHandle) -> Result<Vec<String>> {
    Ok(fetch(conn, LIST_VIEWS, &[])?.text_column("name"))
}

pub fn list_table_columns(conn: &ConnectionHandle, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let result = fetch(conn, LIST_COLUMNS, &[Value::from(table)])?;
    Ok(result
        .rows
        .iter()
        .map(|row| ColumnDescriptor {
            column_name: text(row.get("name")),
            data_type: text(row.get("type")),
        })
        .collect())
}

pub fn list_table_triggers(conn: &ConnectionHandle, table: &str) -> Result<Vec<String>> {
    Ok(fetch(conn, LIST_TRIGGERS, &[Value::from(table)])?.text_column("name"))
}

pub fn list_table_indexes(conn: &ConnectionHandle, table: &str) -> Result<Vec<String>> {
    Ok(fetch(conn, LIST_INDEXES, &[Value::from(table)])?.text_column("name"))
}

/// Files of the attached databases; empty for in-memory ones.
pub fn list_databases(conn: &ConnectionHandle) -> Result<Vec<String>> {
    Ok(fetch(conn, LIST_DATABASES, &[])?.text_column("file"))
}

/// `CREATE` statement of the named table, view, index or trigger.
pub fn create_script(conn: &ConnectionHandle, name: &str) -> Result<Vec<String>> {
    Ok(fetch(conn, CREATE_SCRIPT, &[Value::from(name)])?.text_column("sql"))
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_text)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqliteConfig;

    fn schema() -> ConnectionHandle {
        let conn = ConnectionHandle::open(&SqliteConfig::new(":memory:")).unwrap();
        conn.all(
            "CREATE TABLE zebra (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);
             CREATE TABLE apple (id INTEGER, price REAL);
             CREATE INDEX idx_zebra_name ON zebra (name);
             CREATE VIEW cheap AS SELECT * FROM apple WHERE price < 1;
             CREATE TRIGGER zebra_ins AFTER INSERT ON zebra BEGIN SELECT 1; END;",
            &[],
        )
        .unwrap();
        conn
    }

    #[test]
    fn tables_are_sorted() {
        let conn = schema();
        assert_eq!(
            list_tables(&conn).unwrap(),
            ["apple", "sqlite_sequence", "zebra"]
        );
    }

    #[test]
    fn views_triggers_and_indexes() {
        let conn = schema();
        assert_eq!(list_views(&conn).unwrap(), ["cheap"]);
        assert_eq!(list_table_triggers(&conn, "zebra").unwrap(), ["zebra_ins"]);
        assert!(list_table_triggers(&conn, "apple").unwrap().is_empty());
        assert_eq!(list_table_indexes(&conn, "zebra").unwrap(), ["idx_zebra_name"]);
    }

    #[test]
    fn columns_carry_declared_types() {
        let conn = schema();
        assert_eq!(
            list_table_columns(&conn, "apple").unwrap(),
            vec![
                ColumnDescriptor {
                    column_name: "id".to_string(),
                    data_type: "INTEGER".to_string(),
                },
                ColumnDescriptor {
                    column_name: "price".to_string(),
                    data_type: "REAL".to_string(),
                },
            ]
        );
    }

    #[test]
    fn create_scripts() {
        let conn = schema();
        let script = create_script(&conn, "apple").unwrap();
        assert_eq!(script, ["CREATE TABLE apple (id INTEGER, price REAL)"]);
        assert!(create_script(&conn, "cheap").unwrap()[0].starts_with("CREATE VIEW cheap"));
        assert!(create_script(&conn, "nothing").unwrap().is_empty());
    }

    #[test]
    fn in_memory_database_has_empty_file() {
        let conn = schema();
        assert_eq!(list_databases(&conn).unwrap(), [""]);
    }
}
