//! Rotation-invariant pixel comparison.

use crate::core::codec::CanonicalImage;
use image::imageops;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Quarter turns applied to the first image before comparing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    fn apply(self, pixels: &RgbaImage) -> Option<RgbaImage> {
        match self {
            Rotation::None => None,
            Rotation::Clockwise90 => Some(imageops::rotate90(pixels)),
            Rotation::Clockwise180 => Some(imageops::rotate180(pixels)),
            Rotation::Clockwise270 => Some(imageops::rotate270(pixels)),
        }
    }
}

/// Whether two images show the same pixels, allowing for quarter-turn
/// rotations.
///
/// With `compare_format` set, images stored in different encodings are
/// never equal. Dimensions must match directly or transposed. Square images
/// are tried at 0, 90, 180 and 270 degrees; other images at the two rotations
/// that line up their widths. Channel values (alpha included) must match
/// exactly.
pub fn images_equal(a: &CanonicalImage, b: &CanonicalImage, compare_format: bool) -> bool {
    matching_rotation(a, b, compare_format).is_some()
}

/// The first rotation of `a` that reproduces `b`, if any
pub fn matching_rotation(
    a: &CanonicalImage,
    b: &CanonicalImage,
    compare_format: bool,
) -> Option<Rotation> {
    if compare_format && a.format != b.format {
        return None;
    }

    let direct = a.width() == b.width() && a.height() == b.height();
    let transposed = a.width() == b.height() && a.height() == b.width();
    if !direct && !transposed {
        return None;
    }

    let candidates: &[Rotation] = if a.is_square() {
        &[
            Rotation::None,
            Rotation::Clockwise90,
            Rotation::Clockwise180,
            Rotation::Clockwise270,
        ]
    } else if direct {
        &[Rotation::None, Rotation::Clockwise180]
    } else {
        &[Rotation::Clockwise90, Rotation::Clockwise270]
    };

    candidates
        .iter()
        .copied()
        .find(|rotation| same_pixels(a, b, *rotation))
}

fn same_pixels(a: &CanonicalImage, b: &CanonicalImage, rotation: Rotation) -> bool {
    match rotation.apply(&a.pixels) {
        Some(rotated) => pixels_match(&rotated, &b.pixels),
        None => pixels_match(&a.pixels, &b.pixels),
    }
}

fn pixels_match(a: &RgbaImage, b: &RgbaImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}
