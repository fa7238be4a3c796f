use crate::encoding::encode_fixed;
use crate::Generator;
use linkfold_core::{CodeFormat, ShortCode};
use sha2::{Digest, Sha256};

/// Number of leading digest bytes folded into the code.
pub const DIGEST_PREFIX_BYTES: usize = 6;

/// Derives codes from a SHA-256 digest of the target.
///
/// The first [`DIGEST_PREFIX_BYTES`] bytes of the digest are read as a
/// big-endian integer and encoded with [`encode_fixed`].
#[derive(Debug, Clone, Default)]
pub struct DigestGenerator {
    format: CodeFormat,
}

impl DigestGenerator {
    pub fn new(format: CodeFormat) -> Self {
        Self { format }
    }

    fn digest_prefix(target: &str) -> u64 {
        let digest = Sha256::digest(target.as_bytes());
        let mut buf = [0u8; 8];
        buf[8 - DIGEST_PREFIX_BYTES..].copy_from_slice(&digest[..DIGEST_PREFIX_BYTES]);
        u64::from_be_bytes(buf)
    }
}

impl Generator for DigestGenerator {
    fn generate(&self, target: &str) -> ShortCode {
        encode_fixed(&self.format, Self::digest_prefix(target))
    }

    fn format(&self) -> &CodeFormat {
        &self.format
    }
}
