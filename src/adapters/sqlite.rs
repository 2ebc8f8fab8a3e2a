use crate::domain::model::{CleanRecordSet, Column, FieldType, LoadAck};
use crate::domain::ports::TableSink;
use crate::utils::error::{EtlError, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};

/// SQLite database file acting as the load sink.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    path: PathBuf,
}

impl SqliteSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replace_table(&self, table: &str, records: &CleanRecordSet) -> rusqlite::Result<usize> {
        let mut conn = Connection::open(&self.path)?;
        let tx = conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)), [])?;
        tx.execute(&create_table_sql(table, &records.columns), [])?;

        let mut written = 0;
        {
            let mut stmt = tx.prepare(&insert_sql(table, &records.columns))?;
            for row in &records.rows {
                let values: Vec<SqlValue> = row.iter().map(to_sql_value).collect();
                written += stmt.execute(params_from_iter(values.iter()))?;
            }
        }

        // DDL 與 DML 同一個 transaction，失敗時舊表保持不變
        tx.commit()?;
        Ok(written)
    }

    fn read_table(&self, table: &str) -> Result<CleanRecordSet> {
        let not_found = || EtlError::TableNotFound {
            location: self.location(),
            table: table.to_string(),
        };

        if !self.path.exists() {
            return Err(not_found());
        }

        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(not_found());
        }

        let columns = {
            let mut stmt =
                conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
            let columns = stmt
                .query_map([table], |row| {
                    let name: String = row.get(0)?;
                    let declared: String = row.get(1)?;
                    Ok(Column {
                        name,
                        field_type: FieldType::from_sql_type(&declared),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            columns
        };

        // rowid table 的全表掃描即為插入順序；來源本身可能有 rowid 欄位，不能 ORDER BY rowid
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                values.push(from_sql_value(row.get_ref(index)?, column.field_type));
            }
            records.push(values);
        }

        Ok(CleanRecordSet {
            columns,
            rows: records,
        })
    }
}

impl TableSink for SqliteSink {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn replace(&self, table: &str, records: &CleanRecordSet) -> Result<LoadAck> {
        let write_error = |reason: String| EtlError::SinkWriteError {
            table: table.to_string(),
            reason,
        };

        if records.columns.is_empty() {
            return Err(write_error("record set has no columns".to_string()));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
            }
        }

        tracing::debug!(
            "Replacing table '{}' in {} with {} rows",
            table,
            self.location(),
            records.len()
        );

        // rusqlite 是同步 API，移到 blocking 執行緒
        let sink = self.clone();
        let target = table.to_string();
        let snapshot = records.clone();
        let rows_written =
            tokio::task::spawn_blocking(move || sink.replace_table(&target, &snapshot))
                .await
                .map_err(|e| write_error(e.to_string()))?
                .map_err(|e| write_error(e.to_string()))?;

        Ok(LoadAck {
            table: table.to_string(),
            rows_written,
            columns: records.columns.clone(),
        })
    }

    async fn read_all(&self, table: &str) -> Result<CleanRecordSet> {
        let sink = self.clone();
        let table = table.to_string();
        tokio::task::spawn_blocking(move || sink.read_table(&table)).await?
    }
}

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str, columns: &[Column]) -> String {
    let defs = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.field_type.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), defs)
}

fn insert_sql(table: &str, columns: &[Column]) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names,
        placeholders
    )
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(int) => SqlValue::Integer(int),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>, field_type: FieldType) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => match field_type {
            FieldType::Boolean => Value::Bool(int != 0),
            FieldType::Real => float_value(int as f64),
            _ => Value::from(int),
        },
        ValueRef::Real(float) => float_value(float),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn float_value(float: f64) -> Value {
    Number::from_f64(float).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_records() -> CleanRecordSet {
        CleanRecordSet {
            columns: vec![
                Column {
                    name: "user_id".to_string(),
                    field_type: FieldType::Integer,
                },
                Column {
                    name: "name".to_string(),
                    field_type: FieldType::Text,
                },
                Column {
                    name: "score".to_string(),
                    field_type: FieldType::Real,
                },
                Column {
                    name: "active".to_string(),
                    field_type: FieldType::Boolean,
                },
            ],
            rows: vec![
                vec![json!(1), json!("Ann"), json!(7.5), json!(true)],
                vec![json!(2), json!("Bob"), json!(3.0), json!(false)],
                vec![json!(3), Value::Null, Value::Null, Value::Null],
            ],
        }
    }

    #[tokio::test]
    async fn test_replace_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let sink = SqliteSink::new(dir.path().join("users.db"));
        let records = sample_records();

        let ack = sink.replace("registered_users", &records).await.unwrap();
        assert_eq!(ack.rows_written, 3);
        assert_eq!(ack.columns, records.columns);

        let loaded = sink.read_all("registered_users").await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn test_replace_drops_previous_schema() {
        let dir = TempDir::new().unwrap();
        let sink = SqliteSink::new(dir.path().join("users.db"));
        sink.replace("t", &sample_records()).await.unwrap();

        let smaller = CleanRecordSet {
            columns: vec![Column {
                name: "title".to_string(),
                field_type: FieldType::Text,
            }],
            rows: vec![vec![json!("Heat")]],
        };
        sink.replace("t", &smaller).await.unwrap();

        let loaded = sink.read_all("t").await.unwrap();
        assert_eq!(loaded, smaller);
    }

    #[tokio::test]
    async fn test_empty_schema_is_rejected_without_touching_table() {
        let dir = TempDir::new().unwrap();
        let sink = SqliteSink::new(dir.path().join("users.db"));
        sink.replace("t", &sample_records()).await.unwrap();

        let err = sink
            .replace("t", &CleanRecordSet::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::SinkWriteError { .. }));
        assert_eq!(sink.read_all("t").await.unwrap(), sample_records());
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back() {
        let dir = TempDir::new().unwrap();
        let sink = SqliteSink::new(dir.path().join("users.db"));
        sink.replace("t", &sample_records()).await.unwrap();

        // 重複欄位名稱讓 CREATE TABLE 失敗
        let broken = CleanRecordSet {
            columns: vec![
                Column {
                    name: "id".to_string(),
                    field_type: FieldType::Integer,
                },
                Column {
                    name: "id".to_string(),
                    field_type: FieldType::Integer,
                },
            ],
            rows: vec![vec![json!(1), json!(2)]],
        };
        let err = sink.replace("t", &broken).await.unwrap_err();
        assert!(matches!(err, EtlError::SinkWriteError { .. }));
        assert_eq!(sink.read_all("t").await.unwrap(), sample_records());
    }

    #[tokio::test]
    async fn test_read_missing_table_and_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("never.db");
        let sink = SqliteSink::new(&db_path);

        let err = sink.read_all("registered_users").await.unwrap_err();
        assert!(matches!(err, EtlError::TableNotFound { .. }));
        assert!(!db_path.exists(), "reading must not create the database");

        sink.replace("other", &sample_records()).await.unwrap();
        let err = sink.read_all("registered_users").await.unwrap_err();
        assert!(matches!(err, EtlError::TableNotFound { .. }));
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let sink = SqliteSink::new(dir.path().join("nested/out/movies.db"));
        sink.replace("vote_movies", &sample_records()).await.unwrap();
        assert!(sink.path().exists());
    }

    #[tokio::test]
    async fn test_source_rowid_column_keeps_insertion_order() {
        let dir = TempDir::new().unwrap();
        let sink = SqliteSink::new(dir.path().join("rows.db"));
        let records = CleanRecordSet {
            columns: vec![
                Column {
                    name: "rowid".to_string(),
                    field_type: FieldType::Integer,
                },
                Column {
                    name: "n".to_string(),
                    field_type: FieldType::Text,
                },
            ],
            rows: vec![
                vec![json!(3), json!("a")],
                vec![json!(1), json!("b")],
                vec![json!(2), json!("c")],
            ],
        };

        sink.replace("t", &records).await.unwrap();
        assert_eq!(sink.read_all("t").await.unwrap(), records);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("vote_movies"), "\"vote_movies\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
