//! Identifier utilities
//!
//! Member ids are opaque per-device tokens; session codes are short,
//! human-shareable strings over an alphabet without look-alike characters.

use rand::Rng;
use uuid::Uuid;

/// Session code alphabet: digits 2-9 and uppercase letters without O, I, L
pub const SESSION_CODE_CHARS: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Session code length
pub const SESSION_CODE_LENGTH: usize = 6;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new opaque member id
pub fn generate_member_id() -> String {
    generate().to_string()
}

/// Draw a session code uniformly from the alphabet
///
/// Uniqueness is the caller's concern; see the coordinator's retry loop.
pub fn generate_session_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SESSION_CODE_LENGTH)
        .map(|_| SESSION_CODE_CHARS[rng.gen_range(0..SESSION_CODE_CHARS.len())] as char)
        .collect()
}

/// Canonicalize user-entered session code (trim + uppercase)
pub fn normalize_session_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// True if `code` has the right length and only alphabet characters
pub fn is_valid_session_code(code: &str) -> bool {
    code.len() == SESSION_CODE_LENGTH && code.bytes().all(|b| SESSION_CODE_CHARS.contains(&b))
}
