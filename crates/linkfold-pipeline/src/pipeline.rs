use crate::config::{ConfigError, PipelineConfig};
use crate::error::{BootstrapError, MissReason, PipelineError, RebuildError, StoreOperation};
use crate::stats::PipelineStats;
use linkfold_core::{
    CacheError, InsertOutcome, MembershipFilter, Repository, ShortCode, StorageError, UrlCache,
    UrlRecord,
};
use linkfold_generator::{normalize_url, Generator};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Composes the generator, membership filter, cache and durable store into
/// the create / resolve / stats operations.
///
/// The durable store is the only source of truth. The filter answers "never
/// created" without I/O and the cache answers hot lookups without touching
/// the store; neither can change what `resolve` returns.
#[derive(Debug)]
pub struct ResolutionPipeline<R, C, F, G> {
    repository: Arc<R>,
    cache: Arc<C>,
    filter: Arc<F>,
    generator: Arc<G>,
    config: PipelineConfig,
    rebuild_lock: Mutex<()>,
}

impl<R, C, F, G> ResolutionPipeline<R, C, F, G>
where
    R: Repository,
    C: UrlCache,
    F: MembershipFilter,
    G: Generator,
{
    /// Assembles a pipeline without populating the filter.
    ///
    /// Until [`rebuild_filter`](Self::rebuild_filter) completes the filter
    /// reports every code as possibly present, so lookups fall through to
    /// the cache and the store.
    pub fn new(
        repository: R,
        cache: C,
        filter: F,
        generator: G,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            repository: Arc::new(repository),
            cache: Arc::new(cache),
            filter: Arc::new(filter),
            generator: Arc::new(generator),
            config,
            rebuild_lock: Mutex::new(()),
        })
    }

    /// Assembles a pipeline and populates the filter from the durable store.
    pub async fn bootstrap(
        repository: R,
        cache: C,
        filter: F,
        generator: G,
        config: PipelineConfig,
    ) -> Result<Self, BootstrapError> {
        let pipeline = Self::new(repository, cache, filter, generator, config)?;
        pipeline.rebuild_filter().await?;
        Ok(pipeline)
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shortens `raw_url` and returns its code.
    ///
    /// Calling this twice with the same URL returns the same code and leaves
    /// one row in the store. If a different URL already owns the code, the
    /// stored row is kept and the code is returned anyway.
    pub async fn create(&self, raw_url: &str) -> Result<ShortCode, PipelineError> {
        let target = normalize_url(raw_url)?;
        let code = self.generator.generate(&target);
        trace!(code = %code, target = %target, "generated short code");

        let outcome = bounded_store(
            self.config.store_timeout,
            StoreOperation::Insert,
            self.repository
                .insert_if_absent(&code, UrlRecord::new(target.as_str())),
        )
        .await
        .map_err(|source| PipelineError::store(StoreOperation::Insert, Some(&code), source))?;

        // only after the row is durable
        self.filter.add(&code);

        match outcome {
            InsertOutcome::Inserted => {
                debug!(code = %code, "stored new short code");
                self.cache_write(&code, &target).await;
            }
            InsertOutcome::AlreadyPresent => {
                // the stored target may differ from ours; let resolve fill the cache
                debug!(code = %code, "short code already stored, keeping first writer");
            }
        }

        Ok(code)
    }

    /// Looks up the target stored for `raw_code`.
    pub async fn resolve(&self, raw_code: &str) -> Result<String, PipelineError> {
        let code = match self.generator.format().parse(raw_code) {
            Ok(code) => code,
            Err(e) => {
                debug!(code = raw_code, error = %e, "rejecting malformed short code");
                return Err(PipelineError::not_found(raw_code, MissReason::Malformed));
            }
        };

        if !self.filter.test(&code) {
            debug!(code = %code, "filter miss");
            return Err(PipelineError::not_found(code.as_str(), MissReason::FilterMiss));
        }

        if let Some(target) = self.cache_read(&code).await {
            trace!(code = %code, "resolved from cache");
            return Ok(target);
        }

        let record = bounded_store(
            self.config.store_timeout,
            StoreOperation::Get,
            self.repository.get(&code),
        )
        .await
        .map_err(|source| PipelineError::store(StoreOperation::Get, Some(&code), source))?;

        let Some(record) = record else {
            debug!(code = %code, "filter positive but code is not stored");
            return Err(PipelineError::not_found(code.as_str(), MissReason::Absent));
        };

        self.cache_write(&code, &record.target).await;
        trace!(code = %code, "resolved from durable store");
        Ok(record.target)
    }

    pub async fn stats(&self) -> Result<PipelineStats, PipelineError> {
        let total_count = bounded_store(
            self.config.store_timeout,
            StoreOperation::Count,
            self.repository.count(),
        )
        .await
        .map_err(|source| PipelineError::store(StoreOperation::Count, None, source))?;

        Ok(PipelineStats {
            total_count,
            filter: self.filter.parameters(),
            cache_ttl_secs: self.config.cache_ttl.as_secs(),
        })
    }

    /// Replaces the filter contents with every code in the durable store.
    ///
    /// Codes created while the scan runs are kept. Concurrent calls are
    /// serialized. On failure the current filter is left untouched.
    pub async fn rebuild_filter(&self) -> Result<usize, RebuildError> {
        let _serialized = self.rebuild_lock.lock().await;

        self.filter.begin_rebuild();
        let guard = AbortOnDrop {
            filter: self.filter.as_ref(),
            armed: true,
        };

        let codes = bounded_store(
            self.config.rebuild_timeout,
            StoreOperation::ListCodes,
            self.repository.list_codes(),
        )
        .await?;

        let populated = guard.finish(&codes)?;
        info!(codes = populated, "membership filter populated from durable store");
        Ok(populated)
    }

    async fn cache_read(&self, code: &ShortCode) -> Option<String> {
        match bounded_cache(self.config.cache_timeout, self.cache.get_url(code)).await {
            Ok(target) => target,
            Err(e) => {
                warn!(code = %code, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn cache_write(&self, code: &ShortCode, target: &str) {
        let write = self.cache.set_url(code, target, self.config.cache_ttl);
        if let Err(e) = bounded_cache(self.config.cache_timeout, write).await {
            warn!(code = %code, error = %e, "cache write failed, continuing without it");
        }
    }
}

/// Aborts a filter rebuild that never reached `finish`, including when the
/// rebuilding future is dropped mid-scan.
struct AbortOnDrop<'a, F: MembershipFilter> {
    filter: &'a F,
    armed: bool,
}

impl<F: MembershipFilter> AbortOnDrop<'_, F> {
    fn finish(mut self, codes: &[ShortCode]) -> Result<usize, RebuildError> {
        self.armed = false;
        Ok(self.filter.finish_rebuild(codes)?)
    }
}

impl<F: MembershipFilter> Drop for AbortOnDrop<'_, F> {
    fn drop(&mut self) {
        if self.armed {
            warn!("membership filter rebuild abandoned");
            self.filter.abort_rebuild();
        }
    }
}

async fn bounded_store<T>(
    limit: Duration,
    operation: StoreOperation,
    call: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(format!(
            "{operation} did not complete within {limit:?}"
        ))),
    }
}

async fn bounded_cache<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, CacheError>>,
) -> Result<T, CacheError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout(format!(
            "cache call did not complete within {limit:?}"
        ))),
    }
}
