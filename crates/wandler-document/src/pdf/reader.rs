// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open source documents, measure their pages, and re-serialise
// page trees into fresh containers using the `lopdf` crate.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument, warn};
use wandler_core::error::{Result, WandlerError};
use wandler_security::{decrypt_document, is_encrypted, load_sealed};

use crate::geometry::{Size, US_LETTER};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Every operator a content stream may contain. Ciphertext that happens to
/// tokenise almost never consists of these alone.
const CONTENT_OPERATORS: &[&str] = &[
    "b", "B", "b*", "B*", "BDC", "BI", "BMC", "BT", "BX", "c", "cm", "CS", "cs", "d", "d0",
    "d1", "Do", "DP", "EI", "EMC", "ET", "EX", "f", "F", "f*", "G", "g", "gs", "h", "i", "ID",
    "j", "J", "K", "k", "l", "m", "M", "MP", "n", "q", "Q", "re", "RG", "rg", "ri", "s", "S",
    "SC", "sc", "SCN", "scn", "sh", "T*", "Tc", "Td", "TD", "Tf", "Tj", "TJ", "TL", "Tm", "Tr",
    "Ts", "Tw", "Tz", "v", "w", "W", "W*", "y", "'", "\"",
];

/// Upper bound on /Parent hops, guarding against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// An opened, readable PDF.
///
/// Holds both the parsed object graph and a plaintext serialisation of it,
/// which is what rasterisation backends consume. Encrypted inputs are only
/// accepted when the empty password opens them.
pub struct SourceDocument {
    document: Document,
    bytes: Vec<u8>,
    name: String,
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("pages", &self.page_ids.len())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl SourceDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from raw bytes.
    #[instrument(skip_all, fields(name = %name, bytes_len = data.len()))]
    pub fn open(data: &[u8], name: &str) -> Result<Self> {
        let mut document = load_document(data)?;

        if is_encrypted(&document) {
            if !decrypt_document(&mut document, "")? {
                return Err(WandlerError::Validation(format!(
                    "{name} is password protected; unlock it first"
                )));
            }
            debug!("Opened encrypted PDF with the empty password");
            return Self::from_document(document, name);
        }

        Self::with_bytes(document, data.to_vec(), name)
    }

    /// Wrap an in-memory document, serialising it for rasterisation.
    pub fn from_document(mut document: Document, name: &str) -> Result<Self> {
        let bytes = save_document(&mut document)?;
        Self::with_bytes(document, bytes, name)
    }

    fn with_bytes(document: Document, bytes: Vec<u8>, name: &str) -> Result<Self> {
        // get_pages is keyed by 1-based page number, so values come out in order.
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(WandlerError::Pdf(format!("{name} contains no pages")));
        }
        debug!(pages = page_ids.len(), "PDF loaded");
        Ok(Self {
            document,
            bytes,
            name: name.to_owned(),
            page_ids,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Display name of the source, usually the uploaded filename.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plaintext PDF bytes for this document.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Visible size of the page at `index` (zero-based) in points, after
    /// applying its /Rotate. Uses the CropBox when present, else the MediaBox.
    pub fn page_size(&self, index: usize) -> Result<Size> {
        let page_id = self.page_id(index)?;
        page_size_of(&self.document, page_id)
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            WandlerError::Render(format!(
                "page index {index} out of range (document has {} pages)",
                self.page_ids.len()
            ))
        })
    }
}

// -- Loading and saving -------------------------------------------------------

/// Parse PDF bytes, rejecting anything without a `%PDF` header up front.
///
/// Encrypted documents come back with their objects still encrypted, so
/// any password can be tried on them afterwards.
pub fn load_document(data: &[u8]) -> Result<Document> {
    if !looks_like_pdf(data) {
        return Err(WandlerError::Validation(
            "file is not a PDF document".to_string(),
        ));
    }
    load_sealed(data)
}

/// Serialise a document to bytes.
pub fn save_document(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| WandlerError::Pdf(format!("failed to serialise PDF: {err}")))?;
    Ok(output)
}

/// Whether `data` carries a PDF header. Some producers emit junk before it,
/// so the first kilobyte is searched.
pub fn looks_like_pdf(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

// -- Page geometry ------------------------------------------------------------

fn page_size_of(doc: &Document, page_id: ObjectId) -> Result<Size> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|err| WandlerError::Pdf(format!("cannot read page {page_id:?}: {err}")))?;

    let bounds = inherited(doc, page, b"CropBox")
        .and_then(|value| rectangle(doc, &value))
        .or_else(|| inherited(doc, page, b"MediaBox").and_then(|value| rectangle(doc, &value)));

    let mut size = match bounds {
        Some([x1, y1, x2, y2]) if (x2 - x1).abs() > 0.0 && (y2 - y1).abs() > 0.0 => {
            Size::new((x2 - x1).abs(), (y2 - y1).abs())
        }
        _ => {
            warn!(?page_id, "Page has no usable MediaBox, assuming US Letter");
            US_LETTER
        }
    };

    let rotation = inherited(doc, page, b"Rotate")
        .and_then(|value| resolve(doc, &value).as_i64().ok())
        .unwrap_or(0)
        .rem_euclid(360);
    if rotation == 90 || rotation == 270 {
        size = size.swapped();
    }
    Ok(size)
}

/// Look up `key` on the page, walking up /Parent links for inheritable
/// attributes.
fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn rectangle(doc: &Document, object: &Object) -> Option<[f64; 4]> {
    let values = resolve(doc, object).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, value) in rect.iter_mut().zip(values) {
        *slot = number(resolve(doc, value))?;
    }
    Some(rect)
}

// -- Page recovery ------------------------------------------------------------

/// Whether every page's content stream can be decoded without decryption.
///
/// Some documents carry an encryption dictionary but store their content in
/// the clear; those can be salvaged by copying the pages out.
#[instrument(skip_all)]
pub fn pages_readable(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let mut operations = 0usize;
    for (number, page_id) in pages {
        let content = match doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(err) => {
                debug!(number, %err, "Page content unreadable");
                return false;
            }
        };
        match Content::decode(&content) {
            Ok(decoded) => {
                if let Some(op) = decoded
                    .operations
                    .iter()
                    .find(|op| !CONTENT_OPERATORS.contains(&op.operator.as_str()))
                {
                    debug!(number, operator = %op.operator, "Page content holds unknown operators");
                    return false;
                }
                operations += decoded.operations.len();
            }
            Err(err) => {
                debug!(number, %err, "Page content does not decode");
                return false;
            }
        }
    }
    operations > 0
}

// -- Re-serialisation ---------------------------------------------------------

/// Copy every page of `source` into a new document with a flat page tree.
///
/// Inherited page attributes are materialised on each page, and nothing
/// outside the page graph (encryption dictionary, document info, outlines)
/// is carried over.
#[instrument(skip_all, fields(pages = source.get_pages().len()))]
pub fn rebuild_document(source: &Document) -> Result<Document> {
    let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
    if source_pages.is_empty() {
        return Err(WandlerError::Pdf("document contains no pages".to_string()));
    }

    let mut target = Document::with_version(source.version.clone());
    let pages_id = target.new_object_id();

    let mut copier = PageCopier {
        source,
        target: &mut target,
        copied: HashMap::new(),
    };

    // Pages nodes of the source all collapse onto the new root; page objects
    // get their ids up front so cross-references (annotations, links) resolve.
    for page_id in &source_pages {
        copier.map_ancestors(*page_id, pages_id);
    }
    let new_pages: Vec<ObjectId> = source_pages
        .iter()
        .map(|page_id| {
            let new_id = copier.target.new_object_id();
            copier.copied.insert(*page_id, new_id);
            new_id
        })
        .collect();

    for (page_id, new_id) in source_pages.iter().zip(&new_pages) {
        copier.copy_page(*page_id, *new_id, pages_id)?;
    }

    let kids: Vec<Object> = new_pages.iter().map(|id| Object::Reference(*id)).collect();
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => new_pages.len() as i64,
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);

    info!(pages = new_pages.len(), objects = target.objects.len(), "Page tree rebuilt");
    Ok(target)
}

/// Deep copy of the objects reachable from pages, preserving sharing: an
/// object referenced twice in the source is copied once.
struct PageCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl PageCopier<'_> {
    fn map_ancestors(&mut self, page_id: ObjectId, pages_id: ObjectId) {
        let mut current = page_id;
        for _ in 0..MAX_TREE_DEPTH {
            let parent = self
                .source
                .get_dictionary(current)
                .ok()
                .and_then(|dict| dict.get(b"Parent").ok())
                .and_then(|parent| parent.as_reference().ok());
            match parent {
                Some(parent) => {
                    self.copied.insert(parent, pages_id);
                    current = parent;
                }
                None => return,
            }
        }
    }

    fn copy_page(&mut self, page_id: ObjectId, new_id: ObjectId, pages_id: ObjectId) -> Result<()> {
        let source = self.source;
        let page = source.get_dictionary(page_id).map_err(|err| {
            WandlerError::Pdf(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        let mut copy = Dictionary::new();
        for (key, value) in page.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.copy_object(value);
            copy.set(key.clone(), value);
        }
        for key in INHERITABLE {
            if !copy.has(key)
                && let Some(value) = inherited(source, page, key)
            {
                let value = self.copy_object(&value);
                copy.set(key.to_vec(), value);
            }
        }
        if !copy.has(b"MediaBox") {
            copy.set(
                "MediaBox",
                vec![0.into(), 0.into(), 612.into(), 792.into()],
            );
        }
        copy.set("Parent", pages_id);

        self.target.objects.insert(new_id, Object::Dictionary(copy));
        Ok(())
    }

    fn copy_reference(&mut self, id: ObjectId) -> Object {
        if let Some(new_id) = self.copied.get(&id) {
            return Object::Reference(*new_id);
        }
        let new_id = self.target.new_object_id();
        self.copied.insert(id, new_id);

        let object = match self.source.get_object(id) {
            Ok(object) => self.copy_object(object),
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        self.target.objects.insert(new_id, object);
        Object::Reference(new_id)
    }

    fn copy_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(*id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy_object(item)).collect())
            }
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(&stream.dict);
                Object::Stream(
                    Stream::new(dict, stream.content.clone())
                        .with_compression(stream.allows_compression),
                )
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = self.copy_object(value);
            copy.set(key.clone(), value);
        }
        copy
    }
}
