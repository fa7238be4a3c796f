use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Digits, then uppercase, then lowercase. Index 0 is the padding symbol.
pub const BASE62_SYMBOLS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const DEFAULT_WIDTH: usize = 6;
pub const MIN_WIDTH: usize = 1;
pub const MAX_WIDTH: usize = 10;

/// A short code identifying a shortened URL.
///
/// Codes coming from untrusted input should be obtained through
/// [`CodeFormat::parse`], which checks width and alphabet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (the generator, or rows read back from the durable store).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered set of ASCII symbols used as digits when encoding codes.
#[derive(Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: String,
}

impl Alphabet {
    /// The default `[0-9][A-Z][a-z]` alphabet.
    pub fn base62() -> Self {
        Self {
            symbols: BASE62_SYMBOLS.to_string(),
        }
    }

    /// Creates an alphabet from the given symbols, in digit order.
    ///
    /// Symbols must be printable ASCII, distinct, and there must be at least two.
    pub fn new(symbols: impl Into<String>) -> Result<Self> {
        let symbols = symbols.into();

        if symbols.len() < 2 {
            return Err(CoreError::InvalidAlphabet(format!(
                "at least 2 symbols required, got {}",
                symbols.len()
            )));
        }

        if let Some(c) = symbols.chars().find(|c| !c.is_ascii_graphic()) {
            return Err(CoreError::InvalidAlphabet(format!(
                "symbol {c:?} is not printable ASCII"
            )));
        }

        let mut seen = [false; 128];
        for b in symbols.bytes() {
            if seen[b as usize] {
                return Err(CoreError::InvalidAlphabet(format!(
                    "symbol '{}' appears more than once",
                    b as char
                )));
            }
            seen[b as usize] = true;
        }

        Ok(Self { symbols })
    }

    /// Number of symbols, i.e. the radix used for encoding.
    pub fn base(&self) -> u64 {
        self.symbols.len() as u64
    }

    /// Symbol for the given digit value. `digit` must be below [`Alphabet::base`].
    pub fn symbol(&self, digit: usize) -> char {
        self.symbols.as_bytes()[digit] as char
    }

    /// The symbol standing for zero, used for left padding.
    pub fn zero(&self) -> char {
        self.symbol(0)
    }

    pub fn contains(&self, c: char) -> bool {
        c.is_ascii() && self.symbols.as_bytes().contains(&(c as u8))
    }

    pub fn as_str(&self) -> &str {
        &self.symbols
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::base62()
    }
}

impl std::fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Alphabet").field(&self.symbols).finish()
    }
}

/// Shape shared by every code of a deployment: alphabet and fixed width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFormat {
    alphabet: Alphabet,
    width: usize,
}

impl CodeFormat {
    pub fn new(alphabet: Alphabet, width: usize) -> Result<Self> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
            return Err(CoreError::InvalidWidth {
                min: MIN_WIDTH,
                max: MAX_WIDTH,
                got: width,
            });
        }
        Ok(Self { alphabet, width })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of distinct codes of this format, or `None` if it exceeds `u64`.
    pub fn capacity(&self) -> Option<u64> {
        self.alphabet.base().checked_pow(self.width as u32)
    }

    /// Validates untrusted input against this format.
    pub fn parse(&self, raw: &str) -> Result<ShortCode> {
        if raw.len() != self.width {
            return Err(CoreError::InvalidShortCode(format!(
                "expected {} symbols, got {}",
                self.width,
                raw.len()
            )));
        }

        if let Some(c) = raw.chars().find(|c| !self.alphabet.contains(*c)) {
            return Err(CoreError::InvalidShortCode(format!(
                "symbol {c:?} is not in the code alphabet"
            )));
        }

        Ok(ShortCode(raw.to_string()))
    }
}

impl Default for CodeFormat {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::base62(),
            width: DEFAULT_WIDTH,
        }
    }
}
