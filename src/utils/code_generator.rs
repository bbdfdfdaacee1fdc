//! Short code generation, derivation, and validation.
//!
//! Codes are drawn from a UUIDv7 (time-ordered, monotonic within a
//! millisecond, random low bits) re-encoded in base 62 and fitted to the
//! configured length. Custom aliases are normalized deterministically: only
//! characters outside `[0-9A-Za-z]` are stripped, nothing is rewritten.

use uuid::Uuid;

/// The base-62 alphabet; codes never need percent-encoding in URLs.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Minimum accepted code length.
pub const MIN_CODE_LENGTH: usize = 4;
/// Maximum accepted code length.
pub const MAX_CODE_LENGTH: usize = 16;

/// Generates a unique short code of exactly `code_length` characters.
///
/// The UUIDv7 encoding is longer than any permitted code length, so the
/// trailing characters are kept: they carry the identifier's random payload,
/// which keeps concurrent generators on any machines collision-resistant
/// (≈47.6 bits of entropy at length 8). Insertion-order locality in the
/// store comes from the serial primary key, not the code.
///
/// # Panics
///
/// Panics if the system random number generator fails (extremely rare).
pub fn generate(code_length: usize) -> String {
    let encoded = base62::encode(Uuid::now_v7().as_u128());

    if encoded.len() >= code_length {
        encoded[encoded.len() - code_length..].to_string()
    } else {
        let mut code = encoded;
        pad_random(&mut code, code_length);
        code
    }
}

/// Derives a code from a user-supplied alias.
///
/// Characters outside the base-62 alphabet are removed; a result shorter than
/// `code_length` is padded with random base-62 characters, one longer than
/// [`MAX_CODE_LENGTH`] is truncated to its first [`MAX_CODE_LENGTH`]
/// characters. Aliases already in `code_length..=MAX_CODE_LENGTH` pass
/// through unchanged, so repeat submissions derive the same code. An alias
/// that normalizes to nothing falls back to [`generate`].
pub fn derive(alias: &str, code_length: usize) -> String {
    let mut normalized: String = alias.chars().filter(char::is_ascii_alphanumeric).collect();

    if normalized.is_empty() {
        return generate(code_length);
    }

    if normalized.len() > MAX_CODE_LENGTH {
        normalized.truncate(MAX_CODE_LENGTH);
    } else if normalized.len() < code_length {
        pad_random(&mut normalized, code_length);
    }

    normalized
}

/// Validates a short code: length 4..=16, all characters base-62.
pub fn validate(code: &str) -> bool {
    (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Appends cryptographically random base-62 characters until `target_len`.
fn pad_random(code: &mut String, target_len: usize) {
    let needed = target_len.saturating_sub(code.len());
    if needed == 0 {
        return;
    }

    let mut buffer = vec![0u8; needed];
    getrandom::fill(&mut buffer).expect("Failed to generate random bytes");

    code.extend(
        buffer
            .iter()
            .map(|&b| BASE62_ALPHABET[(b % 62) as usize] as char),
    );
}
