use thiserror::Error;

/// Errors surfaced by the loader and the query engine.
///
/// A query for a name with no records is not an error: it yields an empty
/// result.
#[derive(Debug, Error)]
pub enum Error {
    /// A source record is malformed: missing field, bad number, negative count.
    #[error("data format error at {location}: {message}")]
    DataFormat { location: String, message: String },

    /// A year range whose start lies after its end.
    #[error("invalid year range: start {start} is after end {end}")]
    InvalidRange { start: i32, end: i32 },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    pub(crate) fn data_format(location: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DataFormat {
            location: location.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
