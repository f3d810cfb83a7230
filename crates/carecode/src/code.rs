//! Access-code generation for carecode.
//!
//! Two kinds of code exist:
//!
//! - The **deterministic permanent code**: a pure function of the owner
//!   identity (BLAKE3 hash, fixed-length uppercase prefix, ambiguous
//!   characters substituted). It is never stored and is recomputed on every
//!   validation attempt, so it survives store resets.
//! - The **random temporary code**: drawn from a fixed alphabet that avoids
//!   visually ambiguous characters, persisted as part of an access grant.
//!
//! Both are safe to read aloud or transcribe: no generated code ever
//! contains `0`, `1`, or `5`, and presented codes have those characters
//! folded back to `O`, `I`, and `S` before lookup.

use rand::Rng;

/// Length of the deterministic permanent code.
///
/// Fixed, not configurable: changing it would silently invalidate every
/// permanent code already handed out on paper.
pub const PERMANENT_CODE_LENGTH: usize = 8;

/// Upper bound on any configured temporary-code length.
///
/// No generated code is ever longer than this, so validation can reject
/// longer inputs before any lookup.
pub const MAX_CODE_LENGTH: usize = 16;

/// Alphabet for random temporary codes.
///
/// Uppercase letters and digits, excluding `0`, `1`, and `5`.
pub const TEMPORARY_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ2346789";

/// Substitute visually ambiguous characters in an uppercase code.
///
/// `0` reads as `O`, `1` as `I`, `5` as `S`.
fn substitute_ambiguous(c: char) -> char {
    match c {
        '0' => 'O',
        '1' => 'I',
        '5' => 'S',
        other => other,
    }
}

/// Compute the deterministic permanent code for an owner identity.
///
/// Pure and side-effect free; the same owner id always yields the same
/// code, with no stored secret involved.
#[must_use]
pub fn deterministic_code(owner_id: &str) -> String {
    let hex = blake3::hash(owner_id.as_bytes()).to_hex().to_string();
    hex.chars()
        .take(PERMANENT_CODE_LENGTH)
        .map(|c| substitute_ambiguous(c.to_ascii_uppercase()))
        .collect()
}

/// Generate a random temporary code of the given length.
///
/// Uniqueness among active grants is the caller's concern; this function
/// only guarantees the alphabet.
#[must_use]
pub fn random_code(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..TEMPORARY_CODE_ALPHABET.len());
            TEMPORARY_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalize a presented code for lookup.
///
/// Trims surrounding whitespace, uppercases, and folds the ambiguous
/// characters so a transcribed `0`/`1`/`5` still resolves.
#[must_use]
pub fn normalize_presented(code: &str) -> String {
    code.trim()
        .chars()
        .map(|c| substitute_ambiguous(c.to_ascii_uppercase()))
        .collect()
}
