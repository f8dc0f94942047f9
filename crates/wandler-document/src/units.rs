// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unit conversion between typographic points, rendered pixels, and the English
// Metric Units (EMU) used by OOXML presentations.

/// Typographic points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// EMU per inch, fixed by the OOXML standard.
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per typographic point (914400 / 72).
pub const EMU_PER_POINT: i64 = 12_700;

const MM_PER_INCH: f64 = 25.4;

/// A length unit understood by the container writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Point,
    /// Pixels of a bitmap rendered at `scale` pixels per point.
    Pixel,
    Emu,
    Inch,
    Millimeter,
}

/// Convert `value` in `unit` to points. `scale` is only consulted for pixels.
pub fn to_points(value: f64, unit: Unit, scale: f64) -> f64 {
    match unit {
        Unit::Point => value,
        Unit::Pixel => value / scale,
        Unit::Emu => value / EMU_PER_POINT as f64,
        Unit::Inch => value * POINTS_PER_INCH,
        Unit::Millimeter => value * POINTS_PER_INCH / MM_PER_INCH,
    }
}

/// Convert `points` to `unit`. Inverse of [`to_points`].
pub fn from_points(points: f64, unit: Unit, scale: f64) -> f64 {
    match unit {
        Unit::Point => points,
        Unit::Pixel => points * scale,
        Unit::Emu => points * EMU_PER_POINT as f64,
        Unit::Inch => points / POINTS_PER_INCH,
        Unit::Millimeter => points * MM_PER_INCH / POINTS_PER_INCH,
    }
}

/// Points to integral EMU, rounding half to even.
pub fn points_to_emu(points: f64) -> i64 {
    (points * EMU_PER_POINT as f64).round_ties_even() as i64
}

pub fn emu_to_points(emu: i64) -> f64 {
    emu as f64 / EMU_PER_POINT as f64
}

/// Pixel extent of `points` rendered at `scale`, never less than one pixel.
pub fn points_to_pixels(points: f64, scale: f64) -> u32 {
    from_points(points, Unit::Pixel, scale).round_ties_even().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_identity_for_every_unit() {
        let units = [
            Unit::Point,
            Unit::Pixel,
            Unit::Emu,
            Unit::Inch,
            Unit::Millimeter,
        ];
        for unit in units {
            for &scale in &[1.0, 2.0, 3.0, 0.75] {
                for &x in &[0.0, 1.0, 20.0, 595.0, 842.5, 12345.678] {
                    let back = from_points(to_points(x, unit, scale), unit, scale);
                    assert!((back - x).abs() < 1e-9, "{unit:?} at {scale}: {x} -> {back}");
                }
            }
        }
    }

    #[test]
    fn known_equivalences() {
        assert_eq!(to_points(1.0, Unit::Inch, 1.0), 72.0);
        assert_eq!(to_points(914_400.0, Unit::Emu, 1.0), 72.0);
        assert!((to_points(210.0, Unit::Millimeter, 1.0) - 595.2756).abs() < 1e-3);
        assert_eq!(to_points(1190.0, Unit::Pixel, 2.0), 595.0);
    }

    #[test]
    fn emu_conversion_is_exact_for_whole_points() {
        assert_eq!(points_to_emu(612.0), 7_772_400);
        assert_eq!(points_to_emu(0.5), 6_350);
        assert_eq!(emu_to_points(points_to_emu(792.0)), 792.0);
    }

    #[test]
    fn pixel_rounding_is_half_to_even() {
        assert_eq!(points_to_pixels(1.25, 2.0), 2);
        assert_eq!(points_to_pixels(1.75, 2.0), 4);
        assert_eq!(points_to_pixels(595.0, 2.0), 1190);
    }

    #[test]
    fn pixel_extent_never_collapses() {
        assert_eq!(points_to_pixels(0.1, 1.0), 1);
        assert_eq!(points_to_pixels(0.25, 2.0), 1);
    }
}
