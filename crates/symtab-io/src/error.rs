use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Append mode never creates files.
    #[error("cannot append to missing file: {0}")]
    MissingFile(String),

    #[error("dataset '{dataset}' already exists in {path}")]
    DatasetExists { path: String, dataset: String },

    #[error("dataset '{dataset}' not found in {path}")]
    DatasetMissing { path: String, dataset: String },

    #[error("header mismatch in {path}: expected '{expected}', found '{found}'")]
    HeaderMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("not supported: {0}")]
    Unsupported(&'static str),
}

impl From<Error> for symtab_core::error::Error {
    fn from(e: Error) -> Self {
        // Export runs on the engine side; surface failures as remote rejections.
        symtab_core::error::Error::Remote(symtab_core::error::RemoteError::Rejected(e.to_string()))
    }
}
