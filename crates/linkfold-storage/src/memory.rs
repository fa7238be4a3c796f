use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use linkfold_core::repository::{InsertOutcome, ReadRepository, Repository, Result, UrlRecord};
use linkfold_core::ShortCode;

/// In-memory implementation of the Repository trait using DashMap.
///
/// Insert-if-absent goes through the entry API, which holds the shard lock
/// across the check and the write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    storage: DashMap<String, UrlRecord>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.storage.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn list_codes(&self) -> Result<Vec<ShortCode>> {
        Ok(self
            .storage
            .iter()
            .map(|entry| ShortCode::new_unchecked(entry.key().as_str()))
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.storage.len() as u64)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_if_absent(&self, code: &ShortCode, record: UrlRecord) -> Result<InsertOutcome> {
        match self.storage.entry(code.as_str().to_owned()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyPresent),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(InsertOutcome::Inserted)
            }
        }
    }
}
