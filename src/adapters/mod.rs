// Adapters layer: concrete bindings for the extract sources and the load sink.

pub mod csv_file;
pub mod http;
pub mod sqlite;

pub use csv_file::CsvFileSource;
pub use http::HttpSource;
pub use sqlite::SqliteSink;
