//! Error types for the diff crate.

use strata_types::ObjectId;

use crate::patch::Patch;

/// Errors that can occur while classifying changes or building patches.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A change with neither a from side nor a to side.
    #[error("malformed change: empty from and to")]
    MalformedChange,

    /// The build was cancelled between two changes.
    ///
    /// `partial` holds the records completed before cancellation was seen.
    #[error("patch build cancelled after {} completed records", .partial.len())]
    Cancelled { partial: Box<Patch> },

    /// An object referenced by a change or tree was not found in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[source] strata_store::StoreError),

    /// A diff engine returned a symbol the line codec cannot map back.
    #[error("line codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid patch configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl From<strata_store::StoreError> for DiffError {
    fn from(err: strata_store::StoreError) -> Self {
        match err {
            strata_store::StoreError::NotFound(id) => Self::ObjectNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Errors from the line-id codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The line id has no single-scalar encoding.
    #[error("line id {0} is outside the encodable range")]
    OutOfRange(u32),

    /// The scalar was never produced by the encoder.
    #[error("scalar {0:?} does not encode a line id")]
    InvalidScalar(char),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
