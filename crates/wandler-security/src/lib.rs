// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wandler-security — PDF password protection and content fingerprints.
//
// Wraps lopdf's Standard Security Handler for the document security operator
// (decryption of every revision, RC4-128 encryption, and a loader that keeps
// password-protected objects intact), and computes the SHA-256 fingerprints
// recorded for every stored artifact.

pub mod integrity;
pub mod standard;

pub use integrity::{hash_bytes, verify_hash};
pub use standard::{decrypt_document, encrypt_document, is_encrypted, load_sealed};
