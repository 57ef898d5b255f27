// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SneakyNote

//! Name derivation and code generation.
//!
//! Secrets are stored under `lowercase-hex(SHA-256(uuid-bytes))` so the raw
//! UUID never touches the substrate and the directory cannot be correlated
//! with identifiers seen on the wire. Sharing codes are sampled from a
//! 30-character alphabet with the easily-confused glyphs (`0 1 i l o u`)
//! removed.

use std::io;

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use super::CODE_BYTE_SIZE;

/// Code alphabet: `2-9` and `a-z` minus the ambiguous `0 1 i l o u`.
pub const CODE_ALPHABET: &[u8; 30] = b"23456789abcdefghjkmnpqrstvwxyz";

// Largest multiple of the alphabet size below 256, for unbiased rejection
// sampling of random bytes.
const SAMPLE_LIMIT: u8 = (256 / CODE_ALPHABET.len() * CODE_ALPHABET.len()) as u8;

/// Derive the on-disk file name for a UUID.
///
/// Accepts canonical 8-4-4-4-12 hex with or without dashes, any case.
/// Returns `None` when the input does not decode to 16 bytes of hex.
pub fn uuid_to_file_name(uuid: &str) -> Option<String> {
    let normalized: String = uuid
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if normalized.len() != 32 {
        return None;
    }
    let id_bytes = hex::decode(&normalized).ok()?;
    Some(hex::encode(Sha256::digest(&id_bytes)))
}

/// Check a URL path segment against the note id shape: 8-4-4-4-12 hex
/// groups, each separating dash individually optional, case-insensitive.
pub fn is_valid_note_id(id: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let mut chars = id.chars().peekable();
    for (i, len) in GROUPS.iter().enumerate() {
        for _ in 0..*len {
            match chars.next() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => return false,
            }
        }
        if i < GROUPS.len() - 1 && chars.peek() == Some(&'-') {
            chars.next();
        }
    }
    chars.next().is_none()
}

/// Generate a sharing code: three space-separated groups `XXX XXX XXXX`,
/// each character sampled uniformly from [`CODE_ALPHABET`] with the system
/// cryptographic RNG. RNG failures are surfaced, not retried.
pub fn generate_code() -> io::Result<String> {
    let mut code = String::with_capacity(CODE_BYTE_SIZE);
    let mut placed = 0;
    while placed < 10 {
        let mut batch = [0u8; 16];
        OsRng.try_fill_bytes(&mut batch).map_err(io::Error::other)?;
        for byte in batch {
            if placed == 10 {
                break;
            }
            if byte >= SAMPLE_LIMIT {
                continue;
            }
            if placed == 3 || placed == 6 {
                code.push(' ');
            }
            code.push(CODE_ALPHABET[byte as usize % CODE_ALPHABET.len()] as char);
            placed += 1;
        }
    }
    Ok(code)
}

/// Generate a canonical UUIDv4 string, for clients and tests.
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a random 64-hex-char temp file name for the being-accessed
/// directory, so concurrent retrievals of one uuid cannot collide.
pub fn random_temp_name() -> io::Result<String> {
    let mut bytes = [0u8; 32];
    OsRng.try_fill_bytes(&mut bytes).map_err(io::Error::other)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_sha256_hex() {
        let name = uuid_to_file_name("fc2a4122-e81e-4b10-a31b-d79fbdb33a27").unwrap();
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn file_name_ignores_dashes_and_case() {
        let dashed = uuid_to_file_name("fc2a4122-e81e-4b10-a31b-d79fbdb33a27").unwrap();
        let plain = uuid_to_file_name("fc2a4122e81e4b10a31bd79fbdb33a27").unwrap();
        let upper = uuid_to_file_name("FC2A4122-E81E-4B10-A31B-D79FBDB33A27").unwrap();
        assert_eq!(dashed, plain);
        assert_eq!(dashed, upper);
    }

    #[test]
    fn file_name_rejects_garbage() {
        assert!(uuid_to_file_name("").is_none());
        assert!(uuid_to_file_name("not-a-uuid").is_none());
        assert!(uuid_to_file_name("fc2a4122-e81e-4b10-a31b-d79fbdb33a2").is_none());
        assert!(uuid_to_file_name("zz2a4122-e81e-4b10-a31b-d79fbdb33a27").is_none());
    }

    #[test]
    fn note_id_shape_accepts_optional_dashes() {
        assert!(is_valid_note_id("fc2a4122-e81e-4b10-a31b-d79fbdb33a27"));
        assert!(is_valid_note_id("fc2a4122e81e4b10a31bd79fbdb33a27"));
        assert!(is_valid_note_id("fc2a4122e81e-4b10-a31bd79fbdb33a27"));
        assert!(is_valid_note_id("FC2A4122-E81E-4B10-A31B-D79FBDB33A27"));
    }

    #[test]
    fn note_id_shape_rejects_malformed_ids() {
        assert!(!is_valid_note_id(""));
        assert!(!is_valid_note_id("fc2a4122-e81e-4b10-a31b-d79fbdb33a2"));
        assert!(!is_valid_note_id("fc2a4122-e81e-4b10-a31b-d79fbdb33a277"));
        assert!(!is_valid_note_id("gc2a4122-e81e-4b10-a31b-d79fbdb33a27"));
        assert!(!is_valid_note_id("fc2a4122--e81e-4b10-a31b-d79fbdb33a27"));
    }

    #[test]
    fn code_has_human_shape() {
        for _ in 0..50 {
            let code = generate_code().unwrap();
            assert_eq!(code.len(), CODE_BYTE_SIZE);
            let groups: Vec<&str> = code.split(' ').collect();
            assert_eq!(groups.len(), 3);
            assert_eq!(groups[0].len(), 3);
            assert_eq!(groups[1].len(), 3);
            assert_eq!(groups[2].len(), 4);
            for c in code.chars().filter(|c| *c != ' ') {
                assert!(
                    CODE_ALPHABET.contains(&(c as u8)),
                    "character {c:?} outside the code alphabet"
                );
            }
        }
    }

    #[test]
    fn generated_uuids_are_canonical_and_unique() {
        let a = generate_uuid();
        let b = generate_uuid();
        assert!(is_valid_note_id(&a));
        assert!(is_valid_note_id(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn temp_names_are_distinct_hex() {
        let a = random_temp_name().unwrap();
        let b = random_temp_name().unwrap();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
