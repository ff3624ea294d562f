use std::path::PathBuf;

use csm_types::TypeError;

/// Errors from driver operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identifier failed validation.
    #[error("invalid identifier: {0}")]
    Validation(#[from] TypeError),

    /// A required path component could not be created or chmod'd.
    #[error("can not create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path prefix exists but is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Source missing, empty, unreadable, or read aborted by callback.
    #[error("can not read file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// Destination unwritable or write aborted by callback.
    #[error("can not save file {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// Removal failed, including not found.
    #[error("can not delete file {}: {reason}", path.display())]
    Delete { path: PathBuf, reason: String },

    /// Source unreadable or destination unwritable during copy.
    #[error("can not copy file {} to {}: {reason}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    /// An operation was requested without the configuration it needs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The logical name can not be used as a single path element.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
