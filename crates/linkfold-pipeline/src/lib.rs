//! The resolution pipeline: URL normalization and code generation composed
//! with a membership filter, a volatile cache, and the durable store.
//!
//! Creation runs generator -> store (insert-if-absent) -> filter -> cache.
//! Lookup runs filter -> cache -> store, repopulating the cache on a store
//! hit. The filter and the cache only ever change latency, never answers.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use error::{BootstrapError, MissReason, PipelineError, RebuildError, StoreOperation};
pub use pipeline::ResolutionPipeline;
pub use stats::PipelineStats;
