use crate::error::Result;
use crate::shortcode::ShortCode;
use serde::Serialize;

/// Sizing of a membership filter, as reported by stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterParameters {
    /// Expected number of codes the filter was sized for.
    pub capacity: usize,
    /// False-positive rate the filter was configured to stay under.
    pub target_false_positive_rate: f64,
    /// False-positive rate predicted once `capacity` codes are in, from the
    /// actual bit and hash counts.
    pub expected_false_positive_rate: f64,
    pub bit_count: u64,
    pub hash_count: u32,
    /// Whether the first population from the durable store has completed.
    pub ready: bool,
}

/// A probabilistic set of short codes.
///
/// `test` returning `false` means the code was never added. `true` only means
/// the code may have been added. The set is append-only; the only way to
/// forget codes is a full rebuild.
///
/// Until the first rebuild completes the filter is *not ready* and `test`
/// answers `true` for everything, so an empty filter never masks stored codes.
pub trait MembershipFilter: Send + Sync + 'static {
    fn add(&self, code: &ShortCode);

    fn test(&self, code: &ShortCode) -> bool;

    /// Starts capturing codes passed to [`add`](Self::add) so they survive the
    /// swap performed by [`finish_rebuild`](Self::finish_rebuild).
    fn begin_rebuild(&self);

    /// Replaces the filter state with one holding exactly `codes` plus every
    /// code added since [`begin_rebuild`](Self::begin_rebuild). Marks the
    /// filter ready. Returns the number of codes in the new state.
    fn finish_rebuild(&self, codes: &[ShortCode]) -> Result<usize>;

    /// Stops capturing without touching the current state.
    fn abort_rebuild(&self);

    fn is_ready(&self) -> bool;

    fn parameters(&self) -> FilterParameters;
}
