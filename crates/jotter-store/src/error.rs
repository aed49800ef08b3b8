use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Any MongoDB driver error (connection, query, serialization).
    #[error("Database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A write hit the unique title index (duplicate-key code 11000).
    #[error("Duplicate note title")]
    DuplicateTitle,

    /// An acknowledged insert came back without an ObjectId.
    #[error("Insert returned no ObjectId")]
    MissingInsertId,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Whether a driver error is a duplicate-key violation.
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000
    )
}
