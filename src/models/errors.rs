use thiserror::Error;

/// Errors raised by a key/value storage port
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("Storage I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },
}

/// Repository-level errors for snapshot and order persistence
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: StorageError,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Service-level errors for operations that report failure to the caller
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

/// Result type alias for storage port operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
