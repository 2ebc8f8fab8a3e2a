pub mod etl;
pub mod pipeline;
pub mod projector;
pub mod source;
pub mod verifier;

pub use crate::domain::model::{CleanRecordSet, FieldRule, FieldSpec, Origin, Projection, RawRecord};
pub use crate::domain::ports::{Pipeline, RecordSource, TableSink};
pub use crate::utils::error::Result;
