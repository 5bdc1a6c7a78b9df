//! Morphological cleanup of the binary mask.
//!
//! One erosion pass removes thin noise, then several dilation passes
//! restore and slightly grow the true object silhouette. Both passes
//! use a square structuring element; repeated passes with the same
//! element are equivalent to a single pass with a proportionally
//! larger one, which is how they are executed here.

use image::GrayImage;
use imageproc::distance_transform::Norm;

use crate::types::MorphParams;

/// Erode then dilate a binary mask according to `params`.
///
/// A pass count of zero skips that operation entirely, leaving the
/// mask untouched by it.
#[must_use = "returns the cleaned mask"]
pub fn clean(mask: &GrayImage, params: MorphParams) -> GrayImage {
    let erode_extent = params.kernel_radius.saturating_mul(params.erode_iterations);
    let dilate_extent = params.kernel_radius.saturating_mul(params.dilate_iterations);

    let eroded = if erode_extent == 0 {
        mask.clone()
    } else {
        imageproc::morphology::erode(mask, Norm::LInf, erode_extent)
    };

    if dilate_extent == 0 {
        eroded
    } else {
        imageproc::morphology::dilate(&eroded, Norm::LInf, dilate_extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 20x20 mask with a single white square of the given half-width
    /// centered at (10, 10).
    fn square_mask(half: u32) -> GrayImage {
        GrayImage::from_fn(20, 20, |x, y| {
            if x.abs_diff(10) <= half && y.abs_diff(10) <= half {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        })
    }

    fn white_count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == 255).count()
    }

    #[test]
    fn zero_iterations_leave_mask_unchanged() {
        let mask = square_mask(3);
        let cleaned = clean(&mask, MorphParams::new(2, 0, 0));
        assert_eq!(mask, cleaned);
    }

    #[test]
    fn erosion_removes_thin_noise() {
        // A single isolated pixel should not survive a radius-2 erosion.
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(5, 5, image::Luma([255]));
        let cleaned = clean(&mask, MorphParams::new(2, 1, 0));
        assert_eq!(white_count(&cleaned), 0);
    }

    #[test]
    fn dilation_grows_the_silhouette() {
        let mask = square_mask(3);
        let before = white_count(&mask);
        let cleaned = clean(&mask, MorphParams::new(2, 0, 1));
        assert!(
            white_count(&cleaned) > before,
            "expected dilation to add foreground pixels",
        );
    }

    #[test]
    fn erode_then_dilate_preserves_a_solid_region() {
        // A 7x7 square survives erosion by 2 and is restored (and
        // grown) by the subsequent dilation.
        let mask = square_mask(3);
        let cleaned = clean(&mask, MorphParams::new(2, 1, 2));
        assert_eq!(cleaned.get_pixel(10, 10).0[0], 255);
        assert!(white_count(&cleaned) >= white_count(&mask));
    }

    #[test]
    fn output_dimensions_preserved() {
        let mask = square_mask(3);
        let cleaned = clean(&mask, MorphParams::new(2, 1, 6));
        assert_eq!(cleaned.width(), 20);
        assert_eq!(cleaned.height(), 20);
    }
}
