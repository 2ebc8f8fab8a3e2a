use crate::domain::model::CleanRecordSet;
use crate::domain::ports::TableSink;
use crate::utils::error::Result;

/// Read-only inspection of a loaded table.
pub struct Verifier<K: TableSink> {
    sink: K,
}

impl<K: TableSink> Verifier<K> {
    pub fn new(sink: K) -> Self {
        Self { sink }
    }

    pub async fn read_all(&self, table: &str) -> Result<CleanRecordSet> {
        self.sink.read_all(table).await
    }

    /// Reads the whole table back and renders it for display.
    pub async fn verify(&self, table: &str) -> Result<String> {
        tracing::info!("🔍 Verifying table '{}' in {}", table, self.sink.location());
        let records = self.read_all(table).await?;
        tracing::info!(
            "✅ Read {} rows from table '{}'",
            records.len(),
            table
        );
        Ok(records.render(None))
    }
}
