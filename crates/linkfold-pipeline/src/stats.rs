use linkfold_core::FilterParameters;
use serde::Serialize;

/// Snapshot returned by [`ResolutionPipeline::stats`](crate::ResolutionPipeline::stats).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Rows in the durable store at the time of the call.
    pub total_count: u64,
    pub filter: FilterParameters,
    pub cache_ttl_secs: u64,
}
