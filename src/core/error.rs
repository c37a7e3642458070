use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A build/packaging defect: missing mapping for a declared version
    /// transition, empty version catalog, non-adjacent step construction.
    /// Not recoverable at runtime.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any runtime data failure: unreadable metadata, unknown schema
    /// fingerprint, checkpoint/destroy/replace failure, failed migration
    /// step. The only remedy is dropping and recreating the store.
    #[error("Database corrupted: {0}")]
    DatabaseCorrupted(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
