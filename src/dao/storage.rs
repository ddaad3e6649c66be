use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of where the data lives.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not persist or reach its data.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Synchronous string-keyed, string-valued store that survives restarts.
///
/// Writes must be durable before they return.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; absent keys yield `None`.
    fn get(&self, key: &str) -> Option<String>;
    /// Insert or replace a value.
    fn set(&self, key: &str, value: String) -> StorageResult<()>;
    /// Delete a value; deleting an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
    /// Delete every value.
    fn clear(&self) -> StorageResult<()>;
}
