use thiserror::Error;
use trkcore::error::TrkError;

#[derive(Error, Debug)]
pub enum TrkDfError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] TrkError),
}

pub type Result<T> = std::result::Result<T, TrkDfError>;
