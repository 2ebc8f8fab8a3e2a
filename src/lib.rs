pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{CsvFileSource, HttpSource, SqliteSink};
pub use config::toml_config::TomlConfig;
pub use self::core::{
    etl::{EtlEngine, RunSummary},
    pipeline::{PipelineDefinition, TablePipeline},
    projector::project,
    source::OriginReader,
    verifier::Verifier,
};
pub use domain::model::{
    CleanRecordSet, Column, FieldRule, FieldSpec, FieldType, LoadAck, Origin, Projection,
    ProjectionWarning, RawRecord, RawRecordSet,
};
pub use utils::error::{EtlError, Result};
