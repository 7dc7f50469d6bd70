use thiserror::Error;

use crate::storage::filesystem::FilesystemError;

/// Errors surfaced by the directory engine.
///
/// Empty results (missing partition file, malformed partition, empty scan) are
/// never errors; they resolve to empty collections before reaching this type.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Invalid taxonomy levels: {0}")]
    InvalidLevels(String),

    #[error("Invalid page size: {0} (must be positive)")]
    InvalidPageSize(i64),

    #[error("Invalid kind: '{0}' (expected 'stores' or 'services')")]
    InvalidKind(String),

    #[error("Invalid mobile number: '{0}'")]
    InvalidMobile(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Write conflict on {key} after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DirectoryError {
    /// Whether the caller supplied something the taxonomy cannot accept
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::InvalidLevels(_)
                | DirectoryError::InvalidPageSize(_)
                | DirectoryError::InvalidKind(_)
                | DirectoryError::InvalidMobile(_)
        )
    }
}

impl From<FilesystemError> for DirectoryError {
    fn from(err: FilesystemError) -> Self {
        match err {
            FilesystemError::Config(msg) | FilesystemError::UnsupportedScheme(msg) => {
                DirectoryError::Config(msg)
            }
            other => DirectoryError::StoreUnavailable(other.to_string()),
        }
    }
}

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;
