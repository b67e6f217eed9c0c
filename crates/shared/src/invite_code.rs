//! Invite code alphabet and random generation.
//!
//! Codes are fixed-length strings over uppercase ASCII letters and digits.
//! Comparison is case-insensitive everywhere, so codes are normalized to
//! uppercase before they are stored or looked up.

use rand::rngs::OsRng;
use rand::Rng;

/// Symbols an invite code may contain.
pub const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Code length used when configuration does not override it.
pub const DEFAULT_INVITE_CODE_LENGTH: usize = 8;

/// Shortest code length accepted by configuration and request validation.
pub const MIN_INVITE_CODE_LENGTH: usize = 4;

/// Longest code length accepted by configuration and request validation.
pub const MAX_INVITE_CODE_LENGTH: usize = 32;

/// Generate a random code of `length` symbols using the operating system CSPRNG.
pub fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..INVITE_CODE_ALPHABET.len());
            INVITE_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalize user input into the stored form of a code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Returns true if `code` only uses the invite alphabet (in either case)
/// and has an acceptable length.
pub fn is_well_formed(code: &str) -> bool {
    (MIN_INVITE_CODE_LENGTH..=MAX_INVITE_CODE_LENGTH).contains(&code.len())
        && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
