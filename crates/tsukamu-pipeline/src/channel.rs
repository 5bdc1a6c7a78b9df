//! Color-plane extraction and binarization.
//!
//! The first segmentation stage: pull a single channel out of the
//! color frame and threshold it at a fixed intensity cutoff, inverted
//! so that the object of interest (dark in the chosen plane) becomes
//! white foreground.

use image::{GrayImage, RgbImage};

use crate::types::{ChannelSource, EstimatorError};

/// Decode raw image bytes into an RGB color frame.
///
/// Supports PNG, JPEG, BMP, and WebP (whatever the `image` crate can
/// decode).
///
/// # Errors
///
/// Returns [`EstimatorError::EmptyInput`] if `bytes` is empty.
/// Returns [`EstimatorError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, EstimatorError> {
    if bytes.is_empty() {
        return Err(EstimatorError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Extract a single-channel plane from a color frame.
///
/// For [`ChannelSource::Luminance`] the standard weighted formula
/// `0.299*R + 0.587*G + 0.114*B` is used; the other variants copy one
/// plane verbatim.
#[must_use = "returns the extracted plane"]
pub fn extract(image: &RgbImage, source: ChannelSource) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let value = match source {
            ChannelSource::Red => r,
            ChannelSource::Green => g,
            ChannelSource::Blue => b,
            ChannelSource::Luminance => luminance(r, g, b),
        };
        image::Luma([value])
    })
}

/// Binarize a single-channel plane at a fixed cutoff.
///
/// Pixels at or below `threshold` become foreground (255); brighter
/// pixels become background (0). This is the threshold-then-invert
/// step: the dark object silhouette ends up white.
#[must_use = "returns the binary mask"]
pub fn binarize(plane: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        if plane.get_pixel(x, y).0[0] > threshold {
            image::Luma([0])
        } else {
            image::Luma([255])
        }
    })
}

/// Integer-weighted luminance, rounded to the nearest value.
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let weighted =
        299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    u8::try_from((weighted + 500) / 1000).unwrap_or(u8::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode a 1x1 RGB pixel as a PNG byte buffer.
    fn encode_rgb_pixel(r: u8, g: u8, b: u8) -> Vec<u8> {
        let img = RgbImage::from_fn(1, 1, |_, _| image::Rgb([r, g, b]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgb(&[]);
        assert!(matches!(result, Err(EstimatorError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_return_decode_error() {
        let result = decode_rgb(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(EstimatorError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_decodes() {
        let png = encode_rgb_pixel(10, 20, 30);
        let rgb = decode_rgb(&png).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn extract_red_plane() {
        let img = RgbImage::from_fn(3, 2, |x, _| image::Rgb([x as u8 * 10, 200, 100]));
        let plane = extract(&img, ChannelSource::Red);
        assert_eq!(plane.get_pixel(0, 0).0[0], 0);
        assert_eq!(plane.get_pixel(2, 1).0[0], 20);
    }

    #[test]
    fn extract_green_and_blue_planes() {
        let img = RgbImage::from_fn(1, 1, |_, _| image::Rgb([11, 22, 33]));
        assert_eq!(extract(&img, ChannelSource::Green).get_pixel(0, 0).0[0], 22);
        assert_eq!(extract(&img, ChannelSource::Blue).get_pixel(0, 0).0[0], 33);
    }

    #[test]
    fn luminance_weights_green_highest() {
        let img_r = RgbImage::from_fn(1, 1, |_, _| image::Rgb([255, 0, 0]));
        let img_g = RgbImage::from_fn(1, 1, |_, _| image::Rgb([0, 255, 0]));
        let img_b = RgbImage::from_fn(1, 1, |_, _| image::Rgb([0, 0, 255]));
        let r = extract(&img_r, ChannelSource::Luminance).get_pixel(0, 0).0[0];
        let g = extract(&img_g, ChannelSource::Luminance).get_pixel(0, 0).0[0];
        let b = extract(&img_b, ChannelSource::Luminance).get_pixel(0, 0).0[0];
        assert!(
            g > r && r > b,
            "expected green > red > blue luminance, got R={r} G={g} B={b}",
        );
    }

    #[test]
    fn binarize_inverts_at_cutoff() {
        let plane = GrayImage::from_fn(4, 1, |x, _| image::Luma([x as u8 * 30]));
        let mask = binarize(&plane, 40);
        // 0, 30 <= 40 -> foreground; 60, 90 > 40 -> background.
        assert_eq!(mask.get_pixel(0, 0).0[0], 255);
        assert_eq!(mask.get_pixel(1, 0).0[0], 255);
        assert_eq!(mask.get_pixel(2, 0).0[0], 0);
        assert_eq!(mask.get_pixel(3, 0).0[0], 0);
    }

    #[test]
    fn binarize_cutoff_is_inclusive() {
        let plane = GrayImage::from_fn(1, 1, |_, _| image::Luma([40]));
        let mask = binarize(&plane, 40);
        assert_eq!(mask.get_pixel(0, 0).0[0], 255);
    }
}
