pub mod lead_repository;
pub mod token_repository;
pub mod user_repository;

use thiserror::Error;

/// Failure inside the credential store. Surfaced to callers as an opaque
/// internal error; the detail stays in the logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// A unique index slot was already claimed by another record.
    #[error("{0} already exists")]
    Duplicate(&'static str),
}

#[derive(Clone)]
pub struct Database {
    pub db: sled::Db,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Database { db })
    }

    /// Ephemeral database for tests; backing files are removed on drop.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Database { db })
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn is_reachable(&self) -> bool {
        self.db.size_on_disk().is_ok()
    }
}
