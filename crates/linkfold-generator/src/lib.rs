pub mod digest;
pub mod encoding;
pub mod normalize;

pub use digest::DigestGenerator;
pub use normalize::{normalize_url, UrlError};

use linkfold_core::{CodeFormat, ShortCode};

/// Trait for generating short codes from target URLs.
///
/// Implementations are pure functions of the target: no storage access,
/// no randomness, no clock. The same target must always produce the same
/// code. Collisions between distinct targets are allowed and are resolved by
/// the durable store's insert-if-absent semantics, not here.
pub trait Generator: Send + Sync + 'static {
    /// Computes the code for an already normalized target.
    fn generate(&self, target: &str) -> ShortCode;

    /// The format every generated code conforms to.
    fn format(&self) -> &CodeFormat;
}
