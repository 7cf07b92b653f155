//! Store errors

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("credential log error: {0}")]
    Io(#[from] std::io::Error),

    /// A `ts` column held something that is not RFC 3339.
    #[error("corrupt timestamp in store: {0:?}")]
    Timestamp(String),
}
