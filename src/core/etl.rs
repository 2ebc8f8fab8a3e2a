use crate::domain::model::ProjectionWarning;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub pipeline: String,
    pub table: String,
    pub rows_extracted: usize,
    pub rows_loaded: usize,
    pub warnings: Vec<ProjectionWarning>,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Runs extract, transform and load in order. The first fatal error
    /// aborts the run; nothing is loaded unless extract and transform
    /// succeeded.
    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting ETL pipeline '{}'", self.pipeline.name());

        let raw_data = self.pipeline.extract().await?;
        let rows_extracted = raw_data.len();

        let projection = self.pipeline.transform(raw_data).await?;

        let ack = self.pipeline.load(&projection).await?;

        tracing::info!(
            "🏁 Pipeline '{}' finished: {} rows loaded into '{}' ({} warnings)",
            self.pipeline.name(),
            ack.rows_written,
            ack.table,
            projection.warnings.len()
        );

        Ok(RunSummary {
            pipeline: self.pipeline.name().to_string(),
            table: ack.table,
            rows_extracted,
            rows_loaded: ack.rows_written,
            warnings: projection.warnings,
        })
    }
}
