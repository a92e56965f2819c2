use thiserror::Error;

/// Failures of the SQLite persistence layer.
///
/// Column decode problems surface as [`StoreError::Sqlite`] wrapping a
/// `FromSqlConversionFailure`, see the `rows` helpers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The platform reports no per-user data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A single-row lookup matched nothing.
    #[error("Record not found")]
    NotFound,

    /// A schema step failed, or the file is newer than this build.
    #[error("Migration error: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Turn `QueryReturnedNoRows` into [`StoreError::NotFound`].
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}
