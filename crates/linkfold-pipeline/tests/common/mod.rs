#![allow(dead_code)]

use async_trait::async_trait;
use linkfold_cache::{BloomMembershipFilter, FilterConfig, MokaUrlCache};
use linkfold_core::{
    CacheError, CodeFormat, InsertOutcome, ReadRepository, Repository, ShortCode, StorageError,
    UrlCache, UrlRecord,
};
use linkfold_generator::{DigestGenerator, Generator};
use linkfold_pipeline::{PipelineConfig, ResolutionPipeline};
use linkfold_storage::InMemoryRepository;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory store that counts every call made to it.
#[derive(Debug, Default)]
pub struct CountingRepository {
    inner: InMemoryRepository,
    pub gets: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl CountingRepository {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadRepository for CountingRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(code).await
    }

    async fn list_codes(&self) -> Result<Vec<ShortCode>, StorageError> {
        self.inner.list_codes().await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.inner.count().await
    }
}

#[async_trait]
impl Repository for CountingRepository {
    async fn insert_if_absent(
        &self,
        code: &ShortCode,
        record: UrlRecord,
    ) -> Result<InsertOutcome, StorageError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_if_absent(code, record).await
    }
}

/// Store that is always unreachable.
#[derive(Debug, Default)]
pub struct UnavailableRepository;

#[async_trait]
impl ReadRepository for UnavailableRepository {
    async fn get(&self, _code: &ShortCode) -> Result<Option<UrlRecord>, StorageError> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn list_codes(&self) -> Result<Vec<ShortCode>, StorageError> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl Repository for UnavailableRepository {
    async fn insert_if_absent(
        &self,
        _code: &ShortCode,
        _record: UrlRecord,
    ) -> Result<InsertOutcome, StorageError> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
}

/// Store whose every call hangs for `delay`.
#[derive(Debug)]
pub struct StalledRepository {
    pub delay: Duration,
}

#[async_trait]
impl ReadRepository for StalledRepository {
    async fn get(&self, _code: &ShortCode) -> Result<Option<UrlRecord>, StorageError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn list_codes(&self) -> Result<Vec<ShortCode>, StorageError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        tokio::time::sleep(self.delay).await;
        Ok(0)
    }
}

#[async_trait]
impl Repository for StalledRepository {
    async fn insert_if_absent(
        &self,
        _code: &ShortCode,
        _record: UrlRecord,
    ) -> Result<InsertOutcome, StorageError> {
        tokio::time::sleep(self.delay).await;
        Ok(InsertOutcome::Inserted)
    }
}

/// Moka cache that counts hits and writes and remembers the last write TTL.
#[derive(Debug, Default)]
pub struct CountingCache {
    inner: MokaUrlCache,
    pub hits: AtomicUsize,
    pub writes: AtomicUsize,
    last_ttl_ms: AtomicU64,
}

impl CountingCache {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn last_ttl(&self) -> Duration {
        Duration::from_millis(self.last_ttl_ms.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl UrlCache for CountingCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>, CacheError> {
        let found = self.inner.get_url(code).await?;
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(found)
    }

    async fn set_url(&self, code: &ShortCode, target: &str, ttl: Duration) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.last_ttl_ms
            .store(ttl.as_millis() as u64, Ordering::SeqCst);
        self.inner.set_url(code, target, ttl).await
    }

    async fn del(&self, code: &ShortCode) -> Result<(), CacheError> {
        self.inner.del(code).await
    }
}

/// Cache that fails every call.
#[derive(Debug, Default)]
pub struct BrokenCache;

#[async_trait]
impl UrlCache for BrokenCache {
    async fn get_url(&self, _code: &ShortCode) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("cache is down".to_string()))
    }

    async fn set_url(&self, _code: &ShortCode, _target: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("cache is down".to_string()))
    }

    async fn del(&self, _code: &ShortCode) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("cache is down".to_string()))
    }
}

/// Cache whose every call hangs for `delay`.
#[derive(Debug)]
pub struct StalledCache {
    pub delay: Duration,
}

#[async_trait]
impl UrlCache for StalledCache {
    async fn get_url(&self, _code: &ShortCode) -> Result<Option<String>, CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn set_url(&self, _code: &ShortCode, _target: &str, _ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn del(&self, _code: &ShortCode) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Maps every target to the same code.
#[derive(Debug)]
pub struct FixedGenerator {
    code: ShortCode,
    format: CodeFormat,
}

impl FixedGenerator {
    pub fn new(code: &str) -> Self {
        Self {
            code: ShortCode::new_unchecked(code),
            format: CodeFormat::default(),
        }
    }
}

impl Generator for FixedGenerator {
    fn generate(&self, _target: &str) -> ShortCode {
        self.code.clone()
    }

    fn format(&self) -> &CodeFormat {
        &self.format
    }
}

pub fn filter() -> BloomMembershipFilter {
    BloomMembershipFilter::new(FilterConfig::default()).unwrap()
}

pub fn fast_timeouts() -> PipelineConfig {
    PipelineConfig::builder()
        .store_timeout(Duration::from_millis(100))
        .cache_timeout(Duration::from_millis(50))
        .rebuild_timeout(Duration::from_millis(100))
        .build()
}

/// Ready pipeline over a counting store and a counting cache.
pub async fn counting_pipeline(
) -> ResolutionPipeline<CountingRepository, CountingCache, BloomMembershipFilter, DigestGenerator> {
    ResolutionPipeline::bootstrap(
        CountingRepository::default(),
        CountingCache::default(),
        filter(),
        DigestGenerator::default(),
        PipelineConfig::default(),
    )
    .await
    .unwrap()
}
