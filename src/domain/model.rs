use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A single source record before any schema is enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub data: Map<String, Value>,
}

impl RawRecord {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

pub type RawRecordSet = Vec<RawRecord>;

/// Where a pipeline run pulls its records from.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    RemoteEndpoint {
        url: String,
        timeout: Option<Duration>,
    },
    LocalFile {
        path: PathBuf,
        delimiter: u8,
    },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::RemoteEndpoint { url, .. } => write!(f, "{}", url),
            Origin::LocalFile { path, .. } => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Real,
    Boolean,
}

impl FieldType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Integer => "INTEGER",
            FieldType::Real => "REAL",
            FieldType::Boolean => "BOOLEAN",
        }
    }

    /// Maps a declared SQL column type back to a field type. Unknown
    /// declarations fall back to text.
    pub fn from_sql_type(declared: &str) -> Self {
        match declared.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" | "BIGINT" => FieldType::Integer,
            "REAL" | "FLOAT" | "DOUBLE" => FieldType::Real,
            "BOOLEAN" | "BOOL" => FieldType::Boolean,
            _ => FieldType::Text,
        }
    }

    /// Normalizes `value` into this type. `None` means the value has no
    /// representation in the type; `Some(Value::Null)` is a genuine null.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            FieldType::Text => Some(match value {
                Value::String(s) => Value::String(s.clone()),
                Value::Bool(b) => Value::String(b.to_string()),
                Value::Number(n) => Value::String(n.to_string()),
                // 巢狀結構直接存成 JSON 文字
                other => Value::String(other.to_string()),
            }),
            FieldType::Integer => match value {
                Value::Number(n) => n.as_i64().map(Value::from),
                Value::Bool(b) => Some(Value::from(i64::from(*b))),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                _ => None,
            },
            FieldType::Real => {
                let float = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }?;
                serde_json::Number::from_f64(float).map(Value::Number)
            }
            FieldType::Boolean => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Some(Value::Bool(false)),
                    Some(1) => Some(Value::Bool(true)),
                    _ => None,
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Real => "real",
            FieldType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

/// One required output field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    /// Dotted path into a nested source record, e.g. `address.city`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: None,
            rename: None,
            field_type: None,
        }
    }

    pub fn derived_from(mut self, path: impl Into<String>) -> Self {
        self.from = Some(path.into());
        self
    }

    pub fn renamed(mut self, target: impl Into<String>) -> Self {
        self.rename = Some(target.into());
        self
    }

    pub fn typed(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Path segments walked inside each raw record.
    pub fn source_path(&self) -> Vec<&str> {
        match &self.from {
            Some(path) => path.split('.').collect(),
            None => vec![self.name.as_str()],
        }
    }

    /// Top-level key that must exist in the raw schema.
    pub fn source_key(&self) -> &str {
        match &self.from {
            Some(path) => path.split('.').next().unwrap_or(path),
            None => &self.name,
        }
    }

    pub fn output_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

pub type FieldSpec = Vec<FieldRule>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub field_type: FieldType,
}

/// Schema-conformant records: one value per column in every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanRecordSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl CleanRecordSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// Renders the first `limit` rows (all rows when `None`) as an aligned
    /// text table.
    pub fn render(&self, limit: Option<usize>) -> String {
        let shown = limit.unwrap_or(self.rows.len()).min(self.rows.len());
        let cells: Vec<Vec<String>> = self.rows[..shown]
            .iter()
            .map(|row| row.iter().map(display_value).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.chars().count()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let format_line = |values: Vec<&str>| -> String {
            values
                .iter()
                .zip(&widths)
                .map(|(value, width)| format!("{:<width$}", value, width = *width))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(shown + 3);
        lines.push(format_line(self.column_names()));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &cells {
            lines.push(format_line(row.iter().map(String::as_str).collect()));
        }
        if shown < self.rows.len() {
            lines.push(format!("... ({} more rows)", self.rows.len() - shown));
        }
        lines.push(format!("[{} rows x {} columns]", self.rows.len(), self.columns.len()));
        lines.join("\n")
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Acknowledgement of a successful table replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAck {
    pub table: String,
    pub rows_written: usize,
    pub columns: Vec<Column>,
}

/// Non-fatal conditions raised while projecting records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionWarning {
    /// The field's source key is absent from the raw schema; the field is
    /// dropped for this run.
    FieldMissing { field: String },
    /// A value could not be represented in the declared column type and was
    /// replaced by null.
    ValueCoerced {
        field: String,
        row: usize,
        field_type: FieldType,
    },
}

impl fmt::Display for ProjectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionWarning::FieldMissing { field } => {
                write!(f, "field '{}' not found in source, skipping it", field)
            }
            ProjectionWarning::ValueCoerced {
                field,
                row,
                field_type,
            } => write!(
                f,
                "value of '{}' in row {} is not a valid {}, stored as NULL",
                field, row, field_type
            ),
        }
    }
}

/// Output of the transform step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub records: CleanRecordSet,
    pub warnings: Vec<ProjectionWarning>,
}
