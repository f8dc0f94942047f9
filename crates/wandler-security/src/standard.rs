// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF Standard Security Handler, built on lopdf's `EncryptionState`.
//
// lopdf authenticates and decrypts every revision from 2 (RC4 40-bit) to 6
// (AES-256). Documents we lock use revision 3 with a 128-bit RC4 key, which
// every mainstream reader opens.
//
// lopdf's loader only parses the objects of an encrypted file when the empty
// user password opens it. `load_sealed` hides the trailer's /Encrypt entry
// from the loader so the ciphertext objects survive, then puts it back.

use std::collections::BTreeMap;

use lopdf::encryption::DecryptionError;
use lopdf::{
    Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions, Reader,
    StringFormat,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use wandler_core::error::{Result, WandlerError};

/// Key length in bits for documents we encrypt.
const ENCRYPT_KEY_BITS: usize = 128;

/// Trailer key as written in the file.
const ENCRYPT_KEY: &[u8] = b"/Encrypt";

/// Same length as [`ENCRYPT_KEY`] so xref offsets stay valid.
const PARKED_ENCRYPT_KEY: &[u8] = b"/Encrypx";

/// Object streams are hidden from the loader until they are decrypted.
const PARKED_OBJECT_STREAM: &[u8] = b"WandlerParkedObjStm";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Whether the document's trailer references an encryption dictionary.
pub fn is_encrypted(doc: &Document) -> bool {
    doc.trailer.get(b"Encrypt").is_ok()
}

/// Parse PDF bytes, keeping encrypted objects as ciphertext.
///
/// Unencrypted files load exactly as `Document::load_mem` would. Encrypted
/// files come back with every object present and still encrypted, ready for
/// [`decrypt_document`] with whatever password the caller has.
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn load_sealed(data: &[u8]) -> Result<Document> {
    let Some(parked) = park_encrypt_key(data) else {
        return Document::load_mem(data)
            .map_err(|err| WandlerError::Pdf(format!("failed to load PDF: {err}")));
    };

    let mut doc = Reader {
        buffer: &parked,
        document: Document::new(),
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    }
    .read(Some(park_object_stream))
    .map_err(|err| WandlerError::Pdf(format!("failed to load encrypted PDF: {err}")))?;

    match doc.trailer.remove(&PARKED_ENCRYPT_KEY[1..]) {
        Some(reference) => doc.trailer.set("Encrypt", reference),
        None => warn!("encryption entry vanished while loading"),
    }
    for object in doc.objects.values_mut() {
        if let Ok(stream) = object.as_stream_mut() {
            if stream.dict.has_type(PARKED_OBJECT_STREAM) {
                stream.dict.set("Type", Object::Name(b"ObjStm".to_vec()));
            }
        }
    }

    debug!(objects = doc.objects.len(), "encrypted PDF loaded sealed");
    Ok(doc)
}

/// Decrypt `doc` in place with `password`, tried as the owner password and
/// then as the user password.
///
/// Returns `Ok(true)` when the document is now readable (including when it was
/// never encrypted) and `Ok(false)` when the password does not match, leaving
/// the document untouched. On success the `/Encrypt` entry and its dictionary
/// are gone, so the document saves unencrypted.
#[instrument(skip_all, fields(objects = doc.objects.len()))]
pub fn decrypt_document(doc: &mut Document, password: &str) -> Result<bool> {
    if !is_encrypted(doc) {
        return Ok(true);
    }

    // lopdf already decrypted this one with the empty password while loading.
    if doc.encryption_state.is_some() {
        strip_encryption(doc);
        debug!("document was decrypted on load");
        return Ok(true);
    }

    match doc.authenticate_password(password) {
        Ok(()) => {}
        Err(lopdf::Error::Decryption(DecryptionError::IncorrectPassword)) => {
            debug!("password rejected by security handler");
            return Ok(false);
        }
        Err(err) => {
            return Err(WandlerError::Encryption(format!(
                "unsupported security handler: {err}"
            )));
        }
    }

    doc.decrypt(password)
        .map_err(|err| WandlerError::Encryption(format!("decryption failed: {err}")))?;
    info!(objects = doc.objects.len(), "document decrypted");
    Ok(true)
}

/// Encrypt `doc` in place with `password` as both user and owner password.
///
/// The document must not already be encrypted. A fresh file identifier is
/// written to the trailer.
#[instrument(skip_all, fields(objects = doc.objects.len()))]
pub fn encrypt_document(doc: &mut Document, password: &str) -> Result<()> {
    if is_encrypted(doc) {
        return Err(WandlerError::Encryption(
            "document is already encrypted".into(),
        ));
    }

    let file_id = Uuid::new_v4().as_bytes().to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
            Object::String(file_id, StringFormat::Hexadecimal),
        ]),
    );

    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &*doc,
        owner_password: password,
        user_password: password,
        key_length: ENCRYPT_KEY_BITS,
        permissions: Permissions::all(),
    })
    .map_err(|err| WandlerError::Encryption(format!("cannot derive encryption key: {err}")))?;

    doc.encrypt(&state)
        .map_err(|err| WandlerError::Encryption(format!("encryption failed: {err}")))?;
    info!(key_bits = ENCRYPT_KEY_BITS, "document encrypted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Remove the trailer's /Encrypt entry together with the dictionary it points at.
fn strip_encryption(doc: &mut Document) {
    if let Some(Object::Reference(id)) = doc.trailer.remove(b"Encrypt") {
        doc.objects.remove(&id);
    }
}

/// Copy of `data` with the trailer's /Encrypt key renamed, or `None` when the
/// trailer carries no such key.
fn park_encrypt_key(data: &[u8]) -> Option<Vec<u8>> {
    let start = xref_start(data)?;
    let mut parked: Option<Vec<u8>> = None;
    let mut from = start;

    while let Some(offset) = find(&data[from..], ENCRYPT_KEY) {
        let at = from + offset;
        let end = at + ENCRYPT_KEY.len();
        // "/EncryptMetadata" and friends are different keys.
        let whole_key = data.get(end).is_none_or(|byte| !byte.is_ascii_alphanumeric());
        if whole_key {
            parked.get_or_insert_with(|| data.to_vec())[at..end]
                .copy_from_slice(PARKED_ENCRYPT_KEY);
        }
        from = end;
    }
    parked
}

/// Offset named by the last `startxref`, where the newest trailer lives.
fn xref_start(data: &[u8]) -> Option<usize> {
    const MARKER: &[u8] = b"startxref";
    let at = data.windows(MARKER.len()).rposition(|w| w == MARKER)?;
    let digits: String = data[at + MARKER.len()..]
        .iter()
        .skip_while(|byte| byte.is_ascii_whitespace())
        .take_while(|byte| byte.is_ascii_digit())
        .map(|&byte| byte as char)
        .collect();
    digits.parse().ok().filter(|&offset: &usize| offset < data.len())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Loader filter: rename object streams so lopdf does not try to unpack
/// their ciphertext. Objects the loader keeps are the mutated originals.
fn park_object_stream(id: ObjectId, object: &mut Object) -> Option<(ObjectId, Object)> {
    if let Ok(stream) = object.as_stream_mut() {
        if stream.dict.has_type(b"ObjStm") {
            stream.dict.set("Type", Object::Name(PARKED_OBJECT_STREAM.to_vec()));
        }
    }
    Some((id, object.clone()))
}
