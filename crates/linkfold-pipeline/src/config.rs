use std::time::Duration;
use thiserror::Error;
use typed_builder::TypedBuilder;

/// Seven days.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(604_800);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_REBUILD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cache ttl must be positive")]
    ZeroCacheTtl,
    #[error("{0} timeout must be positive")]
    ZeroTimeout(&'static str),
}

/// Tunables of the resolution pipeline, validated once at construction.
#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineConfig {
    /// Expiry of entries written to the cache on creation and repopulation.
    #[builder(default = DEFAULT_CACHE_TTL)]
    pub cache_ttl: Duration,

    /// Upper bound for a single durable-store call.
    #[builder(default = DEFAULT_STORE_TIMEOUT)]
    pub store_timeout: Duration,

    /// Upper bound for a single cache call. Exceeding it counts as a miss.
    #[builder(default = DEFAULT_CACHE_TIMEOUT)]
    pub cache_timeout: Duration,

    /// Upper bound for listing every code during a filter rebuild.
    #[builder(default = DEFAULT_REBUILD_TIMEOUT)]
    pub rebuild_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroCacheTtl);
        }
        for (name, value) in [
            ("store", self.store_timeout),
            ("cache", self.cache_timeout),
            ("rebuild", self.rebuild_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache_ttl.as_secs(), 604_800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = PipelineConfig::builder().cache_ttl(Duration::ZERO).build();
        assert_eq!(config.validate(), Err(ConfigError::ZeroCacheTtl));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let config = PipelineConfig::builder().cache_timeout(Duration::ZERO).build();
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout("cache")));

        let config = PipelineConfig::builder().store_timeout(Duration::ZERO).build();
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout("store")));
    }
}
