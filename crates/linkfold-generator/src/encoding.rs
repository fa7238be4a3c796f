use linkfold_core::{CodeFormat, ShortCode};

/// Encodes `value` in the format's alphabet, left-padded with the zero symbol
/// to exactly the format's width.
///
/// Values that do not fit in `width` digits are reduced modulo
/// `base^width` first, so every output has the same length.
pub fn encode_fixed(format: &CodeFormat, value: u64) -> ShortCode {
    let alphabet = format.alphabet();
    let base = alphabet.base();

    let mut n = match format.capacity() {
        Some(capacity) => value % capacity,
        // base^width exceeds u64, every value already fits
        None => value,
    };

    let mut digits = vec![alphabet.zero(); format.width()];
    for slot in digits.iter_mut().rev() {
        if n == 0 {
            break;
        }
        *slot = alphabet.symbol((n % base) as usize);
        n /= base;
    }

    ShortCode::new_unchecked(digits.into_iter().collect::<String>())
}
