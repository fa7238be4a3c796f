use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A volatile cache of `code -> target` pairs.
///
/// The cache carries no correctness obligation: callers must treat every
/// error as a miss (on read) or as a skipped write.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get the target URL from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Store the target URL, expiring after `ttl`.
    async fn set_url(&self, code: &ShortCode, target: &str, ttl: Duration) -> Result<()>;

    /// Remove a cached entry.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;
}
