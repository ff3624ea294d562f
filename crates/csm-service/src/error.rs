use csm_store::StoreError;

/// Errors from the content service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or inconsistent service or driver configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A driver operation or driver construction failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration file is not valid TOML for [`ServiceConfig`](crate::ServiceConfig).
    #[error("can not parse service config: {0}")]
    ConfigParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
