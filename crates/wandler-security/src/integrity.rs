// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact integrity — SHA-256 fingerprints of stored conversion results.

use sha2::{Digest, Sha256};
use wandler_core::error::WandlerError;

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// Recorded for every artifact at creation time and checked again before its
/// bytes are served.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verify that `data` matches the expected SHA-256 hex digest.
///
/// Returns `Err(WandlerError::IntegrityMismatch)` with both digests when the
/// stored bytes were altered or truncated.
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<(), WandlerError> {
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(WandlerError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        let data = b"%PDF-1.7";
        let hex = hash_bytes(data).to_uppercase();
        assert!(verify_hash(data, &hex).is_ok());
    }

    #[test]
    fn verify_reports_both_digests() {
        match verify_hash(b"a", "0000") {
            Err(WandlerError::IntegrityMismatch { expected, actual }) => {
                assert_eq!(expected, "0000");
                assert_eq!(actual, hash_bytes(b"a"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
