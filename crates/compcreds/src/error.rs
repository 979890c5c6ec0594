use compcreds_core::storage::SecureStorageError;
use serde_json::error::Category;
use thiserror::Error;

/// Errors returned by [`crate::CompCredStore`].
///
/// Backend failures (lookup, enumeration, store) pass through unchanged in
/// [`CompCredError::Storage`].
#[derive(Debug, Error)]
pub enum CompCredError {
    #[error(transparent)]
    Storage(#[from] SecureStorageError),
    /// The stored value is not a credential record. Only the position is
    /// kept; parser messages can quote field values.
    #[error("malformed credential record at {key}: {category:?} error at line {line}, column {column}")]
    Decode {
        key: String,
        category: Category,
        line: usize,
        column: usize,
    },
    #[error("failed to encode credentials for {xname}: {source}")]
    Encode {
        xname: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("component xname must not be empty")]
    EmptyXname,
}

impl CompCredError {
    pub(crate) fn decode(key: String, err: &serde_json::Error) -> Self {
        Self::Decode {
            key,
            category: err.classify(),
            line: err.line(),
            column: err.column(),
        }
    }

    /// True when the backend reported that the key does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(SecureStorageError::NotFound { .. }))
    }
}
