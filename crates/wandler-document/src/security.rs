// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document security operator — unlock and lock PDFs.
//
// Whatever the path taken, output is always a freshly rebuilt container: the
// source's encryption dictionary, document info, and outlines never carry
// over.

use lopdf::Document;
use tracing::{debug, info, instrument, warn};
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::UnlockMethod;
use wandler_security::{decrypt_document, encrypt_document, is_encrypted};

use crate::pdf::reader::{load_document, pages_readable, rebuild_document, save_document};

/// Whether a document needs a password before its pages can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionState {
    Unencrypted,
    Encrypted,
}

/// Result of an unlock or lock.
#[derive(Debug, Clone)]
pub struct SecuredOutput {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// How an unlock succeeded. `None` for lock.
    pub method: Option<UnlockMethod>,
}

/// Unlocks and locks PDFs.
///
/// Automatic unlock tries, in order: the empty password, each entry of the
/// configured dictionary, and finally reading the pages without decrypting
/// them. The dictionary is a best-effort guess list, not a security measure.
#[derive(Debug, Clone, Default)]
pub struct SecurityOperator {
    passwords: Vec<String>,
}

impl SecurityOperator {
    pub fn new(passwords: Vec<String>) -> Self {
        Self { passwords }
    }

    pub fn inspect(data: &[u8]) -> Result<ProtectionState> {
        let document = load_document(data)?;
        Ok(if is_encrypted(&document) {
            ProtectionState::Encrypted
        } else {
            ProtectionState::Unencrypted
        })
    }

    // -- Unlock ---------------------------------------------------------------

    /// Remove protection without asking the caller for a password.
    ///
    /// Fails with `UnlockFailed` when every strategy is exhausted; the caller
    /// should then ask for the password.
    #[instrument(skip_all, fields(bytes_len = data.len(), candidates = self.passwords.len()))]
    pub fn unlock_auto(&self, data: &[u8]) -> Result<SecuredOutput> {
        let mut document = load_document(data)?;
        if !is_encrypted(&document) {
            debug!("Document is not encrypted");
            return finish_unlock(&document, UnlockMethod::NotEncrypted);
        }

        if try_password(&mut document, "")? {
            return finish_unlock(&document, UnlockMethod::EmptyPassword);
        }

        for (attempt, candidate) in self.passwords.iter().enumerate() {
            if try_password(&mut document, candidate)? {
                // The matched password itself is never logged.
                info!(attempt = attempt + 1, "Dictionary password accepted");
                return finish_unlock(&document, UnlockMethod::CommonPassword);
            }
        }

        if pages_readable(&document) {
            info!("Encrypted document has readable pages; recovering them");
            return finish_unlock(&document, UnlockMethod::PageRecovery);
        }

        warn!("Automatic unlock exhausted every strategy");
        Err(WandlerError::UnlockFailed(
            "the document needs its password".to_string(),
        ))
    }

    /// Remove protection with a caller-supplied password.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn unlock_with_password(&self, data: &[u8], password: &str) -> Result<SecuredOutput> {
        let mut document = load_document(data)?;
        if !is_encrypted(&document) {
            return finish_unlock(&document, UnlockMethod::NotEncrypted);
        }
        if !decrypt_document(&mut document, password)? {
            return Err(WandlerError::IncorrectPassword);
        }
        finish_unlock(&document, UnlockMethod::UserPassword)
    }

    // -- Lock -----------------------------------------------------------------

    /// Encrypt a copy of the document with `password` as both the user and
    /// owner password. The password is not checked for strength.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn lock(&self, data: &[u8], password: &str) -> Result<SecuredOutput> {
        let mut source = load_document(data)?;
        if is_encrypted(&source) && !decrypt_document(&mut source, "")? {
            return Err(WandlerError::Validation(
                "document is already password protected; unlock it first".to_string(),
            ));
        }

        let mut rebuilt = rebuild_document(&source)?;
        let page_count = rebuilt.get_pages().len();
        encrypt_document(&mut rebuilt, password)?;
        let bytes = save_document(&mut rebuilt)?;
        info!(pages = page_count, bytes = bytes.len(), "Document locked");
        Ok(SecuredOutput {
            bytes,
            page_count,
            method: None,
        })
    }
}

/// Decrypt in place. A handler error counts as a rejected password so the
/// remaining strategies still run.
fn try_password(document: &mut Document, password: &str) -> Result<bool> {
    match decrypt_document(document, password) {
        Ok(accepted) => Ok(accepted),
        Err(WandlerError::Encryption(reason)) => {
            debug!(%reason, "Security handler could not try password");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn finish_unlock(document: &Document, method: UnlockMethod) -> Result<SecuredOutput> {
    let mut rebuilt = rebuild_document(document)?;
    let page_count = rebuilt.get_pages().len();
    let bytes = save_document(&mut rebuilt)?;
    info!(?method, pages = page_count, "Document unlocked");
    Ok(SecuredOutput {
        bytes,
        page_count,
        method: Some(method),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{A4, PlacementRect};
    use crate::pdf::{PdfComposer, SourceDocument};
    use crate::testing::{pdf_document, pdf_fixture};
    use lopdf::dictionary;
    use wandler_core::config::DEFAULT_UNLOCK_PASSWORDS;

    fn dictionary() -> SecurityOperator {
        SecurityOperator::new(DEFAULT_UNLOCK_PASSWORDS.iter().map(|p| (*p).to_owned()).collect())
    }

    fn three_pages() -> Vec<u8> {
        pdf_fixture(&[(612.0, 792.0), (595.0, 842.0), (300.0, 300.0)])
    }

    /// Decoded content stream of every page, in page order.
    fn page_contents(bytes: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| doc.get_page_content(id).unwrap())
            .collect()
    }

    /// Two text pages written by our own composer, with deflated streams.
    fn composed() -> Vec<u8> {
        let mut composer = PdfComposer::new("minutes");
        for text in ["Agenda", "Decisions"] {
            composer.begin_page(A4);
            let rect = PlacementRect {
                left: 72.0,
                top: 72.0,
                width: 400.0,
                height: 100.0,
            };
            composer.draw_text(text, rect, 18.0, [0, 0, 0], false).unwrap();
        }
        composer.finish().unwrap()
    }

    #[test]
    fn lock_then_unlock_round_trips() {
        let operator = dictionary();
        let locked = operator.lock(&three_pages(), "secret").unwrap();
        assert_eq!(locked.page_count, 3);
        assert_eq!(SecurityOperator::inspect(&locked.bytes).unwrap(), ProtectionState::Encrypted);

        let unlocked = operator.unlock_with_password(&locked.bytes, "secret").unwrap();
        assert_eq!(unlocked.method, Some(UnlockMethod::UserPassword));
        assert_eq!(
            SecurityOperator::inspect(&unlocked.bytes).unwrap(),
            ProtectionState::Unencrypted
        );
        let reopened = SourceDocument::open(&unlocked.bytes, "unlocked.pdf").unwrap();
        assert_eq!(reopened.page_count(), 3);
        assert_eq!(page_contents(&unlocked.bytes), page_contents(&three_pages()));
    }

    #[test]
    fn composed_document_survives_lock_and_unlock() {
        let operator = dictionary();
        let original = composed();
        let locked = operator.lock(&original, "secret").unwrap();
        assert_eq!(locked.page_count, 2);

        let unlocked = operator.unlock_with_password(&locked.bytes, "secret").unwrap();
        assert_eq!(unlocked.page_count, 2);
        assert_eq!(page_contents(&unlocked.bytes), page_contents(&original));
    }

    #[test]
    fn wrong_password_is_a_client_error() {
        let operator = dictionary();
        let locked = operator.lock(&three_pages(), "secret").unwrap();
        assert!(matches!(
            operator.unlock_with_password(&locked.bytes, "wrong"),
            Err(WandlerError::IncorrectPassword)
        ));
    }

    #[test]
    fn automatic_unlock_reports_its_method() {
        let operator = dictionary();

        let plain = operator.unlock_auto(&three_pages()).unwrap();
        assert_eq!(plain.method, Some(UnlockMethod::NotEncrypted));

        let empty = operator.lock(&three_pages(), "").unwrap();
        let unlocked = operator.unlock_auto(&empty.bytes).unwrap();
        assert_eq!(unlocked.method, Some(UnlockMethod::EmptyPassword));
        assert_eq!(page_contents(&unlocked.bytes), page_contents(&three_pages()));

        let common = operator.lock(&three_pages(), "qwerty").unwrap();
        let unlocked = operator.unlock_auto(&common.bytes).unwrap();
        assert_eq!(unlocked.method, Some(UnlockMethod::CommonPassword));
        assert_eq!(unlocked.page_count, 3);
        assert_eq!(page_contents(&unlocked.bytes), page_contents(&three_pages()));
    }

    #[test]
    fn empty_password_input_is_relocked_with_readable_content() {
        let operator = dictionary();
        let open = operator.lock(&three_pages(), "").unwrap();
        let relocked = operator.lock(&open.bytes, "secret").unwrap();
        let unlocked = operator.unlock_with_password(&relocked.bytes, "secret").unwrap();
        assert_eq!(page_contents(&unlocked.bytes), page_contents(&three_pages()));
    }

    #[test]
    fn readable_pages_survive_an_unknown_handler() {
        let mut doc = pdf_document(&[(612.0, 792.0)]);
        let handler = doc.add_object(dictionary! { "Filter" => "VendorLock", "V" => 1, "R" => 2 });
        doc.trailer.set("Encrypt", handler);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let recovered = dictionary().unlock_auto(&bytes).unwrap();
        assert_eq!(recovered.method, Some(UnlockMethod::PageRecovery));
        assert_eq!(
            page_contents(&recovered.bytes),
            page_contents(&pdf_fixture(&[(612.0, 792.0)]))
        );
    }

    #[test]
    fn strong_password_needs_the_caller() {
        let operator = dictionary();
        let locked = operator.lock(&three_pages(), "correct horse battery").unwrap();
        assert!(matches!(
            operator.unlock_auto(&locked.bytes),
            Err(WandlerError::UnlockFailed(_))
        ));
    }

    #[test]
    fn locked_input_cannot_be_locked_again() {
        let operator = dictionary();
        let locked = operator.lock(&three_pages(), "secret").unwrap();
        assert!(matches!(
            operator.lock(&locked.bytes, "other"),
            Err(WandlerError::Validation(_))
        ));
    }

    #[test]
    fn garbage_is_rejected_up_front() {
        assert!(matches!(
            dictionary().unlock_auto(b"hello"),
            Err(WandlerError::Validation(_))
        ));
    }
}
