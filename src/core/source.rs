use crate::adapters::{CsvFileSource, HttpSource};
use crate::domain::model::{Origin, RawRecordSet};
use crate::domain::ports::RecordSource;
use crate::utils::error::Result;

/// Dispatches an [`Origin`] to the matching source adapter.
#[derive(Debug, Clone, Default)]
pub struct OriginReader {
    http: HttpSource,
    csv: CsvFileSource,
}

impl OriginReader {
    pub fn new() -> Self {
        Self {
            http: HttpSource::new(),
            csv: CsvFileSource::new(),
        }
    }

    pub fn with_http(http: HttpSource) -> Self {
        Self {
            http,
            csv: CsvFileSource::new(),
        }
    }
}

impl RecordSource for OriginReader {
    async fn read(&self, origin: &Origin) -> Result<RawRecordSet> {
        match origin {
            Origin::RemoteEndpoint { url, timeout } => self.http.fetch(url, *timeout).await,
            Origin::LocalFile { path, delimiter } => self.csv.read(path, *delimiter),
        }
    }
}
