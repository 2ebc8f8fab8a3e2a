use crate::domain::model::{CleanRecordSet, LoadAck, Origin, Projection, RawRecordSet};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Obtains raw records from an origin.
pub trait RecordSource: Send + Sync {
    fn read(&self, origin: &Origin) -> impl std::future::Future<Output = Result<RawRecordSet>> + Send;
}

/// A relational store addressed by table name, bound to one location.
pub trait TableSink: Send + Sync {
    fn location(&self) -> String;

    /// Replaces the table's schema and contents in one step.
    fn replace(
        &self,
        table: &str,
        records: &CleanRecordSet,
    ) -> impl std::future::Future<Output = Result<LoadAck>> + Send;

    fn read_all(&self, table: &str) -> impl std::future::Future<Output = Result<CleanRecordSet>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self) -> Result<RawRecordSet>;
    async fn transform(&self, data: RawRecordSet) -> Result<Projection>;
    async fn load(&self, projection: &Projection) -> Result<LoadAck>;
}
