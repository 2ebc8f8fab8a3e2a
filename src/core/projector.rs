//! Record projection: picks the configured fields out of raw records,
//! derives nested values, renames, and settles one type per column.

use crate::domain::model::{
    CleanRecordSet, Column, FieldRule, FieldType, Projection, ProjectionWarning, RawRecord,
};
use serde_json::Value;

/// Projects `raw` onto `spec`.
///
/// The raw schema is sampled from the first record. Rules whose source key
/// is missing from that sample are dropped with a [`ProjectionWarning::FieldMissing`];
/// values missing from individual records become null. Row count and order
/// are preserved.
pub fn project(raw: &[RawRecord], spec: &[FieldRule]) -> Projection {
    let mut warnings = Vec::new();

    let effective: Vec<&FieldRule> = match raw.first() {
        Some(sample) => spec
            .iter()
            .filter(|rule| {
                let present = sample.data.contains_key(rule.source_key());
                if !present {
                    warnings.push(ProjectionWarning::FieldMissing {
                        field: rule.name.clone(),
                    });
                }
                present
            })
            .collect(),
        // 沒有樣本可以檢查，保留全部欄位
        None => spec.iter().collect(),
    };

    let mut columns = Vec::with_capacity(effective.len());
    let mut column_values = Vec::with_capacity(effective.len());

    for rule in effective {
        let path = rule.source_path();
        let values: Vec<Value> = raw
            .iter()
            .map(|record| lookup_path(record, &path).cloned().unwrap_or(Value::Null))
            .collect();

        let field_type = rule.field_type.unwrap_or_else(|| infer_type(&values));
        let name = rule.output_name().to_string();

        let normalized = values
            .iter()
            .enumerate()
            .map(|(row, value)| match field_type.coerce(value) {
                Some(coerced) => coerced,
                None => {
                    warnings.push(ProjectionWarning::ValueCoerced {
                        field: name.clone(),
                        row,
                        field_type,
                    });
                    Value::Null
                }
            })
            .collect::<Vec<_>>();

        columns.push(Column { name, field_type });
        column_values.push(normalized);
    }

    let rows = (0..raw.len())
        .map(|row| column_values.iter().map(|values| values[row].clone()).collect())
        .collect();

    Projection {
        records: CleanRecordSet { columns, rows },
        warnings,
    }
}

/// Walks `path` through nested objects. Any missing segment, or a segment
/// that is not an object, yields `None`.
fn lookup_path<'a>(record: &'a RawRecord, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = record.data.get(*first)?;
    for segment in rest {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

/// Narrowest type that fits every non-null value; text when nothing fits or
/// every value is null.
pub fn infer_type(values: &[Value]) -> FieldType {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return FieldType::Text;
    }

    if present.iter().all(|v| v.is_boolean()) {
        FieldType::Boolean
    } else if present.iter().all(|v| v.is_i64()) {
        FieldType::Integer
    } else if present.iter().all(|v| v.is_number()) {
        FieldType::Real
    } else {
        FieldType::Text
    }
}
