use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored URL record in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The normalized target URL.
    pub target: String,
    /// When the mapping was first committed.
    pub created_at: Timestamp,
}

impl UrlRecord {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// What an insert-if-absent call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Inserted,
    /// A record already owned the code and was left untouched.
    AlreadyPresent,
}

/// A read-only view of the durable store.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the URL record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Every code currently stored. Used to rebuild the membership filter.
    async fn list_codes(&self) -> Result<Vec<ShortCode>>;

    /// Number of stored mappings.
    async fn count(&self) -> Result<u64>;
}

/// The authoritative mapping store.
#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts the record unless the code is already taken.
    ///
    /// An existing row always wins: it is never overwritten, and finding one
    /// is reported as [`InsertOutcome::AlreadyPresent`] rather than an error.
    /// Implementations must make the check and the write atomic.
    async fn insert_if_absent(&self, code: &ShortCode, record: UrlRecord) -> Result<InsertOutcome>;
}
