use crate::core::projector::project;
use crate::domain::model::{FieldSpec, LoadAck, Origin, Projection, RawRecordSet};
use crate::domain::ports::{Pipeline, RecordSource, TableSink};
use crate::utils::error::Result;

pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Everything one pipeline run needs, fixed before extraction starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDefinition {
    pub name: String,
    pub origin: Origin,
    pub fields: FieldSpec,
    pub table: String,
    pub preview_rows: usize,
}

/// Extract from an origin, project onto a field spec, replace a table.
pub struct TablePipeline<R: RecordSource, K: TableSink> {
    source: R,
    sink: K,
    definition: PipelineDefinition,
}

impl<R: RecordSource, K: TableSink> TablePipeline<R, K> {
    pub fn new(source: R, sink: K, definition: PipelineDefinition) -> Self {
        Self {
            source,
            sink,
            definition,
        }
    }
}

#[async_trait::async_trait]
impl<R: RecordSource, K: TableSink> Pipeline for TablePipeline<R, K> {
    fn name(&self) -> &str {
        &self.definition.name
    }

    async fn extract(&self) -> Result<RawRecordSet> {
        tracing::info!("📥 Fetching data from {}", self.definition.origin);
        let records = self.source.read(&self.definition.origin).await?;
        tracing::info!("📊 Extracted {} records", records.len());
        Ok(records)
    }

    async fn transform(&self, data: RawRecordSet) -> Result<Projection> {
        tracing::info!("🔧 Cleaning {} records", data.len());
        let projection = project(&data, &self.definition.fields);

        for warning in &projection.warnings {
            tracing::warn!("⚠️ {}: {}", self.definition.name, warning);
        }

        if self.definition.preview_rows > 0 {
            tracing::info!(
                "✅ Data cleaned. Preview:\n{}",
                projection
                    .records
                    .render(Some(self.definition.preview_rows))
            );
        }

        Ok(projection)
    }

    async fn load(&self, projection: &Projection) -> Result<LoadAck> {
        tracing::info!(
            "💾 Saving data to '{}' in table '{}'",
            self.sink.location(),
            self.definition.table
        );
        let ack = self
            .sink
            .replace(&self.definition.table, &projection.records)
            .await?;
        tracing::info!("✅ Wrote {} rows to '{}'", ack.rows_written, ack.table);
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CleanRecordSet, FieldRule, RawRecord};
    use crate::utils::error::EtlError;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct StaticSource {
        records: Option<RawRecordSet>,
    }

    impl RecordSource for StaticSource {
        async fn read(&self, origin: &Origin) -> Result<RawRecordSet> {
            self.records
                .clone()
                .ok_or_else(|| EtlError::SourceNotFound {
                    path: origin.to_string(),
                })
        }
    }

    #[derive(Clone, Default)]
    struct MemorySink {
        tables: Arc<Mutex<HashMap<String, CleanRecordSet>>>,
    }

    impl TableSink for MemorySink {
        fn location(&self) -> String {
            "memory".to_string()
        }

        async fn replace(&self, table: &str, records: &CleanRecordSet) -> Result<LoadAck> {
            let mut tables = self.tables.lock().unwrap();
            tables.insert(table.to_string(), records.clone());
            Ok(LoadAck {
                table: table.to_string(),
                rows_written: records.len(),
                columns: records.columns.clone(),
            })
        }

        async fn read_all(&self, table: &str) -> Result<CleanRecordSet> {
            let tables = self.tables.lock().unwrap();
            tables
                .get(table)
                .cloned()
                .ok_or_else(|| EtlError::TableNotFound {
                    location: self.location(),
                    table: table.to_string(),
                })
        }
    }

    fn definition() -> PipelineDefinition {
        PipelineDefinition {
            name: "users".to_string(),
            origin: Origin::LocalFile {
                path: "users.csv".into(),
                delimiter: b',',
            },
            fields: vec![
                FieldRule::new("id").renamed("user_id"),
                FieldRule::new("city").derived_from("address.city"),
            ],
            table: "registered_users".to_string(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    #[tokio::test]
    async fn test_pipeline_steps() {
        let raw = vec![RawRecord::new(
            json!({"id": 1, "address": {"city": "X"}})
                .as_object()
                .unwrap()
                .clone(),
        )];
        let sink = MemorySink::default();
        let pipeline = TablePipeline::new(
            StaticSource { records: Some(raw) },
            sink.clone(),
            definition(),
        );

        let extracted = pipeline.extract().await.unwrap();
        let projection = pipeline.transform(extracted).await.unwrap();
        let ack = pipeline.load(&projection).await.unwrap();

        assert_eq!(pipeline.name(), "users");
        assert_eq!(ack.rows_written, 1);
        let stored = sink.read_all("registered_users").await.unwrap();
        assert_eq!(stored.column_names(), vec!["user_id", "city"]);
        assert_eq!(stored.value(0, "city"), Some(&json!("X")));
    }

    #[tokio::test]
    async fn test_extract_failure_propagates() {
        let pipeline = TablePipeline::new(
            StaticSource { records: None },
            MemorySink::default(),
            definition(),
        );
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::SourceNotFound { .. }));
    }
}
