// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry engine — target canvas sizes and image placement rectangles.
//
// All values are typographic points with a top-left origin. Container writers
// convert to their own units (PDF flips the y axis, presentations use EMU).

use serde::{Deserialize, Serialize};
use wandler_core::error::{Result, WandlerError};
use wandler_core::{FitPolicy, MarginPolicy, Orientation, PageSizePolicy};

/// ISO A4 in points, portrait (rounded to whole points).
pub const A4: Size = Size::new(595.0, 842.0);

/// US Letter in points, portrait.
pub const US_LETTER: Size = Size::new(612.0, 792.0);

/// A width/height pair in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width, self.height)
    }

    pub fn swapped(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Rotate to `orientation` if the natural orientation differs.
    pub fn oriented(&self, orientation: Orientation) -> Self {
        if self.orientation() == orientation {
            *self
        } else {
            self.swapped()
        }
    }

    fn validate(&self, what: &str) -> Result<()> {
        let valid = self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0;
        if valid {
            Ok(())
        } else {
            Err(WandlerError::InvalidGeometry(format!(
                "{what} has zero or invalid area ({} x {})",
                self.width, self.height
            )))
        }
    }
}

/// Where an image lands on a canvas, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacementRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Distance from the canvas bottom edge to the rect's bottom edge, for
    /// containers with a bottom-left origin.
    pub fn bottom_offset(&self, canvas_height: f64) -> f64 {
        canvas_height - self.bottom()
    }
}

/// Compute the target canvas for one source item.
///
/// Fixed sizes are rotated to `orientation`. `FitToSource` takes the source
/// dimensions, swaps them if their natural orientation conflicts with the
/// requested one, and adds `margin` on every side so the image keeps its
/// natural size however small it is.
pub fn compute_canvas(
    policy: PageSizePolicy,
    orientation: Orientation,
    margin: MarginPolicy,
    source: Size,
) -> Result<Size> {
    let canvas = match policy {
        PageSizePolicy::A4 => A4.oriented(orientation),
        PageSizePolicy::UsLetter => US_LETTER.oriented(orientation),
        PageSizePolicy::FitToSource => {
            source.validate("source")?;
            let m = margin.points();
            let fitted = source.oriented(orientation);
            Size::new(fitted.width + 2.0 * m, fitted.height + 2.0 * m)
        }
    };
    Ok(canvas)
}

/// Compute where a `source`-sized image goes on `canvas`.
///
/// `Contain` scales to the largest size that fits inside the margins while
/// preserving aspect ratio and centres the result. `Fill` covers the whole
/// canvas and ignores both margins and aspect ratio.
pub fn compute_placement(
    canvas: Size,
    source: Size,
    margin: MarginPolicy,
    fit: FitPolicy,
) -> Result<PlacementRect> {
    canvas.validate("canvas")?;
    source.validate("source image")?;

    if fit == FitPolicy::Fill {
        return Ok(PlacementRect {
            left: 0.0,
            top: 0.0,
            width: canvas.width,
            height: canvas.height,
        });
    }

    let m = margin.points();
    let available = Size::new(canvas.width - 2.0 * m, canvas.height - 2.0 * m);
    if available.width <= 0.0 || available.height <= 0.0 {
        return Err(WandlerError::InvalidGeometry(format!(
            "margin {m}pt leaves no room on a {} x {} canvas",
            canvas.width, canvas.height
        )));
    }

    let scale = (available.width / source.width).min(available.height / source.height);
    let width = (source.width * scale).min(available.width);
    let height = (source.height * scale).min(available.height);

    Ok(PlacementRect {
        left: m + (available.width - width) / 2.0,
        top: m + (available.height - height) / 2.0,
        width,
        height,
    })
}
