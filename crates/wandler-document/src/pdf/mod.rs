// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — opening source documents and composing new ones.

pub mod reader;
pub mod writer;

pub use reader::SourceDocument;
pub use writer::PdfComposer;
