// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Presentation module — reading and writing OOXML presentations (.pptx).

pub mod parts;
pub mod reader;
pub mod writer;

pub use reader::{Presentation, Slide, SlideElement, TextStyle, read_presentation};
pub use writer::PresentationComposer;

/// Smallest slide edge the format accepts (1 inch).
pub const MIN_SLIDE_EMU: i64 = 914_400;

/// Largest slide edge the format accepts (56 inches).
pub const MAX_SLIDE_EMU: i64 = 51_206_400;

/// Slide size used when a deck does not declare one (10 x 7.5 inches).
pub const DEFAULT_SLIDE_EMU: (i64, i64) = (9_144_000, 6_858_000);
