//! Bloom filter implementation of [`MembershipFilter`].
//!
//! The filter sits in front of the cache and the durable store. A negative
//! answer is exact, so lookups for codes that were never created are
//! rejected without any I/O. A positive answer may be a false positive and
//! must still be verified downstream.
//!
//! # Rebuilds
//!
//! The filter is derived state. It is populated once at startup from the
//! durable store's key set and can be rebuilt at any time. A rebuild builds
//! a fresh bitmap off to the side and swaps it in; codes added while the
//! rebuild is running are buffered and replayed into the new bitmap before
//! the swap, so readers only ever see a complete filter.

use bloomfilter::Bloom;
use linkfold_core::error::Result;
use linkfold_core::{CoreError, FilterParameters, MembershipFilter, ShortCode};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

pub const DEFAULT_CAPACITY: usize = 10_000;
/// Rate the default bitmap is sized to stay under at capacity.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;
/// 96 KiB of bits. With the default capacity this derives 7 hash functions.
pub const DEFAULT_BITS: u64 = 96 * 1024;

/// How the bitmap size is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterSizing {
    /// Size the bitmap for this false-positive probability at capacity.
    FalsePositiveRate(f64),
    /// Use exactly this many bits (rounded up to whole bytes).
    Bits(u64),
}

impl Default for FilterSizing {
    fn default() -> Self {
        FilterSizing::Bits(DEFAULT_BITS)
    }
}

/// Configuration for the Bloom filter.
///
/// Unless `hash_count` is set, the hash-function count is derived from the
/// bitmap size and the expected capacity.
#[derive(Debug, Clone, TypedBuilder)]
pub struct FilterConfig {
    /// Expected number of codes. Past this the false positive rate climbs.
    #[builder(default = DEFAULT_CAPACITY)]
    pub capacity: usize,

    #[builder(default)]
    pub sizing: FilterSizing,

    /// Fixed number of hash functions.
    #[builder(default, setter(strip_option))]
    pub hash_count: Option<u32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FilterConfig {
    fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CoreError::Filter("capacity must be positive".to_string()));
        }
        match self.sizing {
            FilterSizing::FalsePositiveRate(p) if !(p > 0.0 && p < 1.0) => Err(CoreError::Filter(
                format!("false positive rate must be within (0, 1), got {p}"),
            )),
            FilterSizing::Bits(0) => Err(CoreError::Filter("bit count must be positive".to_string())),
            _ if self.hash_count == Some(0) => {
                Err(CoreError::Filter("hash count must be positive".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Rate the bitmap is meant to stay under once `capacity` codes are in.
    fn target_false_positive_rate(&self) -> f64 {
        match self.sizing {
            FilterSizing::FalsePositiveRate(p) => p,
            FilterSizing::Bits(_) => DEFAULT_FALSE_POSITIVE_RATE,
        }
    }

    /// Bitmap size in bytes.
    fn bitmap_bytes(&self) -> usize {
        let bits = match self.sizing {
            FilterSizing::Bits(bits) => bits,
            FilterSizing::FalsePositiveRate(p) => {
                // m = -n ln(p) / ln(2)^2
                let n = self.capacity as f64;
                let ln2 = std::f64::consts::LN_2;
                (-n * p.ln() / (ln2 * ln2)).ceil() as u64
            }
        };
        bits.div_ceil(8) as usize
    }
}

/// Item count that makes `Bloom::new` derive the requested hash count.
///
/// The bloom crate picks `k = ceil(m / n * ln 2)`, so aiming `m / n * ln 2`
/// a quarter below `k` lands on `k`.
fn sizing_items(bitmap_bytes: usize, capacity: usize, hash_count: Option<u32>) -> Result<usize> {
    let Some(k) = hash_count else {
        return Ok(capacity);
    };
    let m = (bitmap_bytes * 8) as f64;
    let n = m * std::f64::consts::LN_2 / (f64::from(k) - 0.25);
    if n < 1.0 {
        return Err(CoreError::Filter(format!(
            "{k} hash functions need more than {} bits",
            bitmap_bytes * 8
        )));
    }
    Ok(n.round() as usize)
}

/// A [`MembershipFilter`] backed by a Bloom filter.
pub struct BloomMembershipFilter {
    config: FilterConfig,
    bitmap_bytes: usize,
    /// Item count handed to the bloom constructor. Equals `capacity` unless
    /// the hash count is fixed.
    sizing_items: usize,
    bloom: RwLock<Bloom<ShortCode>>,
    ready: AtomicBool,
    /// `Some` while a rebuild is running; collects codes added meanwhile.
    rebuild_buffer: Mutex<Option<Vec<ShortCode>>>,
}

impl BloomMembershipFilter {
    /// Creates an empty, not yet ready, filter.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Filter` if the configuration is out of range or
    /// the bitmap cannot be allocated.
    pub fn new(config: FilterConfig) -> Result<Self> {
        config.validate()?;
        let bitmap_bytes = config.bitmap_bytes();
        let sizing_items = sizing_items(bitmap_bytes, config.capacity, config.hash_count)?;
        let bloom = Self::empty_bloom(bitmap_bytes, sizing_items)?;
        if let Some(wanted) = config.hash_count {
            let derived = bloom.number_of_hash_functions();
            if derived != wanted {
                return Err(CoreError::Filter(format!(
                    "cannot use {wanted} hash functions with {} bits, got {derived}",
                    bitmap_bytes * 8
                )));
            }
        }

        debug!(
            capacity = config.capacity,
            bits = bitmap_bytes * 8,
            hashes = bloom.number_of_hash_functions(),
            "Bloom filter initialized"
        );

        Ok(Self {
            config,
            bitmap_bytes,
            sizing_items,
            bloom: RwLock::new(bloom),
            ready: AtomicBool::new(false),
            rebuild_buffer: Mutex::new(None),
        })
    }

    fn empty_bloom(bitmap_bytes: usize, capacity: usize) -> Result<Bloom<ShortCode>> {
        Bloom::new(bitmap_bytes, capacity).map_err(|e| CoreError::Filter(e.to_string()))
    }

    /// Probability of a false positive once `capacity` codes are in.
    fn expected_false_positive_rate(&self, hashes: u32) -> f64 {
        let k = hashes as f64;
        let n = self.config.capacity as f64;
        let m = (self.bitmap_bytes * 8) as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }
}

impl MembershipFilter for BloomMembershipFilter {
    fn add(&self, code: &ShortCode) {
        // lock order: buffer, then bloom (same as finish_rebuild)
        let mut buffer = self.rebuild_buffer.lock();
        self.bloom.write().set(code);
        if let Some(pending) = buffer.as_mut() {
            pending.push(code.clone());
        }
    }

    fn test(&self, code: &ShortCode) -> bool {
        if !self.ready.load(Ordering::Acquire) {
            return true;
        }
        self.bloom.read().check(code)
    }

    fn begin_rebuild(&self) {
        *self.rebuild_buffer.lock() = Some(Vec::new());
    }

    fn finish_rebuild(&self, codes: &[ShortCode]) -> Result<usize> {
        let mut fresh = match Self::empty_bloom(self.bitmap_bytes, self.sizing_items) {
            Ok(bloom) => bloom,
            Err(e) => {
                self.abort_rebuild();
                return Err(e);
            }
        };
        for code in codes {
            fresh.set(code);
        }

        let replayed = {
            let mut buffer = self.rebuild_buffer.lock();
            let pending = buffer.take().unwrap_or_default();
            for code in &pending {
                fresh.set(code);
            }
            *self.bloom.write() = fresh;
            pending.len()
        };
        self.ready.store(true, Ordering::Release);

        if codes.len() > self.config.capacity {
            info!(
                codes = codes.len(),
                capacity = self.config.capacity,
                "Bloom filter holds more codes than it was sized for"
            );
        }
        info!(codes = codes.len(), replayed, "Bloom filter rebuilt");
        Ok(codes.len() + replayed)
    }

    fn abort_rebuild(&self) {
        *self.rebuild_buffer.lock() = None;
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn parameters(&self) -> FilterParameters {
        let hash_count = self.bloom.read().number_of_hash_functions();
        FilterParameters {
            capacity: self.config.capacity,
            target_false_positive_rate: self.config.target_false_positive_rate(),
            expected_false_positive_rate: self.expected_false_positive_rate(hash_count),
            bit_count: (self.bitmap_bytes * 8) as u64,
            hash_count,
            ready: self.is_ready(),
        }
    }
}

impl std::fmt::Debug for BloomMembershipFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomMembershipFilter")
            .field("config", &self.config)
            .field("bitmap_bytes", &self.bitmap_bytes)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(i: usize) -> ShortCode {
        ShortCode::new_unchecked(format!("c{i:05}"))
    }

    fn ready_filter() -> BloomMembershipFilter {
        let filter = BloomMembershipFilter::new(FilterConfig::default()).unwrap();
        filter.finish_rebuild(&[]).unwrap();
        filter
    }

    #[test]
    fn default_sizing_matches_reference() {
        let filter = BloomMembershipFilter::new(FilterConfig::default()).unwrap();
        let params = filter.parameters();
        assert_eq!(params.capacity, 10_000);
        assert_eq!(params.bit_count, 98_304);
        assert_eq!(params.hash_count, 7);
        assert_eq!(params.target_false_positive_rate, 0.01);
        assert!(params.expected_false_positive_rate < 0.01);
    }

    #[test]
    fn hash_count_override_is_honoured() {
        for k in [1, 3, 7, 10, 13] {
            let config = FilterConfig::builder().hash_count(k).build();
            let filter = BloomMembershipFilter::new(config).unwrap();
            let params = filter.parameters();
            assert_eq!(params.hash_count, k);
            assert_eq!(params.bit_count, 98_304);
            assert_eq!(params.capacity, 10_000);
        }
    }

    #[test]
    fn hash_count_survives_rebuild() {
        let config = FilterConfig::builder().hash_count(4).build();
        let filter = BloomMembershipFilter::new(config).unwrap();
        filter.begin_rebuild();
        filter.finish_rebuild(&[code(1)]).unwrap();
        assert_eq!(filter.parameters().hash_count, 4);
        assert!(filter.test(&code(1)));
    }

    #[test]
    fn fewer_hashes_raise_expected_rate() {
        let derived = BloomMembershipFilter::new(FilterConfig::default()).unwrap();
        let single = BloomMembershipFilter::new(FilterConfig::builder().hash_count(1).build())
            .unwrap();
        assert!(
            single.parameters().expected_false_positive_rate
                > derived.parameters().expected_false_positive_rate
        );
    }

    #[test]
    fn fp_rate_sizing_reports_target() {
        let config = FilterConfig::builder()
            .sizing(FilterSizing::FalsePositiveRate(0.01))
            .build();
        let filter = BloomMembershipFilter::new(config).unwrap();
        let params = filter.parameters();
        assert_eq!(params.target_false_positive_rate, 0.01);
        assert!((params.expected_false_positive_rate - 0.01).abs() < 0.001);
        // ~9.59 bits per item at 1%
        assert!(params.bit_count >= 95_850 && params.bit_count <= 95_900);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let zero_capacity = FilterConfig::builder().capacity(0).build();
        assert!(BloomMembershipFilter::new(zero_capacity).is_err());

        let bad_rate = FilterConfig::builder()
            .sizing(FilterSizing::FalsePositiveRate(1.5))
            .build();
        assert!(BloomMembershipFilter::new(bad_rate).is_err());

        let zero_bits = FilterConfig::builder().sizing(FilterSizing::Bits(0)).build();
        assert!(BloomMembershipFilter::new(zero_bits).is_err());

        let zero_hashes = FilterConfig::builder().hash_count(0).build();
        assert!(BloomMembershipFilter::new(zero_hashes).is_err());

        let tiny = FilterConfig::builder()
            .sizing(FilterSizing::Bits(8))
            .hash_count(40)
            .build();
        assert!(BloomMembershipFilter::new(tiny).is_err());
    }

    #[test]
    fn not_ready_filter_answers_possibly_present() {
        let filter = BloomMembershipFilter::new(FilterConfig::default()).unwrap();
        assert!(!filter.is_ready());
        assert!(filter.test(&code(1)));
    }

    #[test]
    fn added_codes_always_test_positive() {
        let filter = ready_filter();
        for i in 0..1_000 {
            filter.add(&code(i));
        }
        for i in 0..1_000 {
            assert!(filter.test(&code(i)), "added code {i} must test positive");
        }
    }

    #[test]
    fn absent_codes_test_negative_at_low_load() {
        let filter = ready_filter();
        for i in 0..500 {
            filter.add(&code(i));
        }
        let false_positives = (10_000..20_000).filter(|i| filter.test(&code(*i))).count();
        // at 5% load the expected rate is far below 0.1%
        assert!(false_positives < 10, "too many false positives: {false_positives}");
    }

    #[test]
    fn rebuild_replaces_contents() {
        let filter = ready_filter();
        filter.add(&code(1));

        filter.begin_rebuild();
        let count = filter.finish_rebuild(&[code(2), code(3)]).unwrap();

        assert_eq!(count, 2);
        assert!(filter.test(&code(2)));
        assert!(filter.test(&code(3)));
    }

    #[test]
    fn adds_during_rebuild_survive_the_swap() {
        let filter = ready_filter();

        filter.begin_rebuild();
        filter.add(&code(42));
        let count = filter.finish_rebuild(&[code(1)]).unwrap();

        assert_eq!(count, 2);
        assert!(filter.test(&code(42)));
        assert!(filter.test(&code(1)));
    }

    #[test]
    fn first_rebuild_marks_ready() {
        let filter = BloomMembershipFilter::new(FilterConfig::default()).unwrap();
        filter.begin_rebuild();
        filter.finish_rebuild(&[code(7)]).unwrap();
        assert!(filter.is_ready());
        assert!(filter.parameters().ready);
        assert!(filter.test(&code(7)));
    }

    #[test]
    fn concurrent_adds_are_all_visible() {
        use std::sync::Arc;

        let filter = Arc::new(ready_filter());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let filter = Arc::clone(&filter);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        filter.add(&code(t * 1_000 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..4 {
            for i in 0..250 {
                assert!(filter.test(&code(t * 1_000 + i)));
            }
        }
    }
}
