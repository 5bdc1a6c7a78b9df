//! tsukamu-pipeline: Pure grasp-pose estimation pipeline (sans-IO).
//!
//! Estimates where to grasp a toy airplane, and at what rotation
//! angle, from a single color camera frame:
//! plane extraction -> binarization -> morphological cleanup ->
//! contour detection -> region-pair selection -> heading angle ->
//! rotated-frame right-edge search -> inverse correspondence.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Image loading and any
//! message wiring live with the caller.
//!
//! A frame the heuristics cannot interpret is not an error: it yields
//! the sentinel pose from [`GraspPose::undetermined`], which callers
//! already treat as "unknown object". Errors are reserved for bad
//! input and geometric degeneracies.

pub mod angle;
pub mod channel;
pub mod contour;
pub mod diagnostics;
pub mod morphology;
pub mod rotate;
pub mod select;
pub mod types;

pub use select::Selection;
pub use types::{
    ChannelSource, Contour, EstimatorConfig, EstimatorError, GraspPose, MorphParams, Orientation,
    Point,
};

/// Minimum contour count for a recognizable frame (inclusive).
pub const MIN_CONTOURS: usize = 2;

/// Maximum contour count for a recognizable frame (exclusive).
pub const MAX_CONTOURS: usize = 9;

/// First-attempt contour count at or below which the single retry
/// with wider morphology kernels is taken.
pub const RETRY_CONTOUR_LIMIT: usize = 2;

/// Estimate the grasp pose from raw image bytes.
///
/// Decodes the frame (PNG, JPEG, BMP, WebP) and runs
/// [`estimate_image`].
///
/// # Errors
///
/// Returns [`EstimatorError::EmptyInput`] if `bytes` is empty,
/// [`EstimatorError::ImageDecode`] if decoding fails, and any error
/// of [`estimate_image`].
pub fn estimate(bytes: &[u8], config: &EstimatorConfig) -> Result<GraspPose, EstimatorError> {
    let rgb = channel::decode_rgb(bytes)?;
    estimate_image(&rgb, config)
}

/// Estimate the grasp pose from an in-memory color frame.
///
/// # Pipeline steps
///
/// 1. Extract the configured plane and binarize at the fixed cutoff
/// 2. Morphological cleanup (erode once, dilate several times)
/// 3. Contour detection; one retry with wider kernels when the first
///    pass finds too few contours
/// 4. Contour-count band check: outside `[2, 9)` the frame is
///    unrecognizable and the sentinel pose is returned
/// 5. Region-pair selection under the area ceiling
/// 6. Front/back resolution (swaps the pair when configured)
/// 7. Heading angle from the two region centroids
/// 8. Rotate the plane to cancel the heading, re-segment, and take
///    the right edge of the chosen region
/// 9. Inverse correspondence back to the original frame
///
/// # Errors
///
/// Returns [`EstimatorError::InvalidConfig`] for bad configuration,
/// [`EstimatorError::ZeroAreaRegion`] when a selected region has no
/// enclosed area, [`EstimatorError::RegionLost`] when the rotated
/// frame re-detection comes back empty, and
/// [`EstimatorError::CorrespondenceFailed`] when no original-frame
/// pixel maps near the rotated-frame target.
pub fn estimate_image(
    image: &image::RgbImage,
    config: &EstimatorConfig,
) -> Result<GraspPose, EstimatorError> {
    config.validate()?;

    // 1. Plane extraction + binarization.
    let plane = channel::extract(image, config.channel);
    let mask = channel::binarize(&plane, config.threshold);

    // 2+3. Morphology and contour detection, with the two-attempt
    // policy: the retry re-segments from the raw mask, so indices from
    // the first pass are discarded wholesale.
    let cleaned = morphology::clean(&mask, config.morphology);
    let mut contours = contour::detect(&cleaned);
    if contours.len() <= RETRY_CONTOUR_LIMIT {
        let retried = morphology::clean(&mask, config.retry_morphology);
        contours = contour::detect(&retried);
    }

    // 4. Band check: too few or too many regions means this is not
    // the object we know how to grasp.
    if contours.len() < MIN_CONTOURS || contours.len() >= MAX_CONTOURS {
        return Ok(GraspPose::undetermined());
    }

    // 5+6. Region pair under the ceiling, then the back-facing check.
    let selection = select::select_pair(&contours, config.area_ceiling);
    let (selection, orientation) =
        angle::resolve_orientation(selection, config.back_area_threshold);

    // 7. Heading from tail centroid toward head centroid.
    let tail = contour::centroid(&contours[selection.max_id])
        .ok_or(EstimatorError::ZeroAreaRegion)?;
    let head = contour::centroid(&contours[selection.second_id])
        .ok_or(EstimatorError::ZeroAreaRegion)?;
    let angle_degrees = angle::heading_degrees(tail, head);

    // 8+9. Rotation-compensated right edge, mapped back.
    let point = locate_grasp_point(&plane, angle_degrees, orientation, config)?;

    Ok(GraspPose {
        point,
        angle_degrees,
        orientation,
    })
}

/// Find the grasp point: rotate the plane to cancel `angle_degrees`,
/// re-segment, take the right edge of the chosen region, and map it
/// back into the original frame.
fn locate_grasp_point(
    plane: &image::GrayImage,
    angle_degrees: f64,
    orientation: Orientation,
    config: &EstimatorConfig,
) -> Result<Point, EstimatorError> {
    let transform =
        rotate::RotationTransform::about_center(plane.width(), plane.height(), angle_degrees);
    let rotated = rotate::warp(plane, &transform);

    // Fresh segmentation in the rotated frame; the upstream indices
    // do not carry over.
    let rotated_mask = channel::binarize(&rotated, config.threshold);
    let contours = contour::detect(&rotated_mask);
    if contours.is_empty() {
        return Err(EstimatorError::RegionLost);
    }

    let selection = select::select_pair(&contours, config.area_ceiling);
    // Mirror the upstream swap: a back-facing object grasps on the
    // second region.
    let chosen = match orientation {
        Orientation::Front => selection.max_id,
        Orientation::Back => selection.second_id,
    };

    let target = rotate::right_edge(&contours[chosen]);
    rotate::invert_point(
        &transform,
        target,
        plane.width(),
        plane.height(),
        config.correspondence_tolerance,
    )
    .ok_or(EstimatorError::CorrespondenceFailed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BACKGROUND: [u8; 3] = [200, 60, 60];
    const OBJECT: [u8; 3] = [0, 0, 0];

    /// 100x100 bright-red frame with dark filled circles at the given
    /// centers and radii. Dark pixels fall below the red-plane cutoff
    /// and become foreground.
    fn circle_frame(circles: &[(i32, i32, i32)]) -> image::RgbImage {
        image::RgbImage::from_fn(100, 100, |x, y| {
            #[allow(clippy::cast_possible_wrap)]
            let (x, y) = (x as i32, y as i32);
            let inside = circles
                .iter()
                .any(|&(cx, cy, r)| (x - cx).pow(2) + (y - cy).pow(2) <= r * r);
            if inside {
                image::Rgb(OBJECT)
            } else {
                image::Rgb(BACKGROUND)
            }
        })
    }

    /// Config with pass-through morphology so synthetic shapes keep
    /// their exact geometry through both attempts.
    fn passthrough_config() -> EstimatorConfig {
        EstimatorConfig {
            morphology: MorphParams::new(1, 0, 0),
            retry_morphology: MorphParams::new(1, 0, 0),
            ..EstimatorConfig::default()
        }
    }

    fn encode_png(img: &image::RgbImage) -> Vec<u8> {
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
    fn uniform_frame_yields_the_exact_sentinel() {
        let img = circle_frame(&[]);
        let pose = estimate_image(&img, &EstimatorConfig::default()).unwrap();
        assert_eq!(pose, GraspPose::undetermined());
        assert_eq!(pose.point, Point::new(999, 999));
        assert!((pose.angle_degrees - 999.0).abs() < f64::EPSILON);
        assert_eq!(pose.orientation, Orientation::Front);
    }

    #[test]
    fn too_many_regions_yield_the_sentinel() {
        // Ten small squares: contour count lands at or above the band
        // maximum of nine.
        let img = image::RgbImage::from_fn(100, 100, |x, y| {
            let in_square = (10..=13).contains(&y) && x % 10 >= 4 && x % 10 <= 7;
            if in_square {
                image::Rgb(OBJECT)
            } else {
                image::Rgb(BACKGROUND)
            }
        });
        let pose = estimate_image(&img, &passthrough_config()).unwrap();
        assert_eq!(pose, GraspPose::undetermined());
    }

    #[test]
    fn single_region_yields_the_sentinel() {
        let img = circle_frame(&[(50, 50, 10)]);
        let pose = estimate_image(&img, &passthrough_config()).unwrap();
        assert_eq!(pose, GraspPose::undetermined());
    }

    #[test]
    fn two_circle_scene_grasp_pose() {
        // Large circle (tail, area ~1130) at (20,20), small circle
        // (head, area ~530) at (80,20): purely horizontal heading.
        let img = circle_frame(&[(20, 20, 19), (80, 20, 13)]);
        let pose = estimate_image(&img, &passthrough_config()).unwrap();

        assert!(!pose.is_undetermined());
        assert_eq!(pose.orientation, Orientation::Front);
        // Centroids share y=20, so atan2(0, 60) * 60 = 0.
        assert!(
            pose.angle_degrees.abs() < f64::EPSILON,
            "expected horizontal heading, got {}",
            pose.angle_degrees,
        );
        // Zero rotation: the rightmost pixel of the large circle is
        // (39, 20); biased by (-8, -10) and identity-mapped back.
        assert_eq!(pose.point, Point::new(31, 10));
    }

    #[test]
    fn two_circle_selection_prefers_the_larger_region() {
        let img = circle_frame(&[(20, 20, 19), (80, 20, 13)]);
        let config = passthrough_config();
        let plane = channel::extract(&img, config.channel);
        let mask = channel::binarize(&plane, config.threshold);
        let contours = contour::detect(&mask);
        assert_eq!(contours.len(), 2);

        let selection = select::select_pair(&contours, config.area_ceiling);
        assert!(
            selection.max_area > selection.second_area,
            "max {} should beat second {}",
            selection.max_area,
            selection.second_area,
        );
        let tail = contour::centroid(&contours[selection.max_id]).unwrap();
        let head = contour::centroid(&contours[selection.second_id]).unwrap();
        assert_eq!(tail, Point::new(20, 20));
        assert_eq!(head, Point::new(80, 20));
    }

    #[test]
    fn diagonal_scene_produces_a_signed_angle() {
        // Head below and right of the tail: dy >= 0 branch, positive
        // scaled angle.
        let img = circle_frame(&[(25, 25, 16), (75, 65, 10)]);
        let pose = estimate_image(&img, &passthrough_config()).unwrap();
        assert!(!pose.is_undetermined());
        let expected = 40.0_f64.atan2(50.0) * angle::ANGLE_SCALE;
        assert!(
            (pose.angle_degrees - expected).abs() < 1e-9,
            "expected {expected}, got {}",
            pose.angle_degrees,
        );
    }

    #[test]
    fn retry_pass_rescues_an_over_eroded_mask() {
        // Attempt 1 erodes so aggressively every region vanishes;
        // the retry with pass-through parameters recovers them.
        let img = circle_frame(&[(30, 30, 10), (70, 30, 6), (50, 70, 4)]);
        let config = EstimatorConfig {
            morphology: MorphParams::new(5, 3, 0),
            retry_morphology: MorphParams::new(1, 0, 0),
            ..EstimatorConfig::default()
        };
        let pose = estimate_image(&img, &config).unwrap();
        assert!(!pose.is_undetermined());
    }

    #[test]
    fn degenerate_regions_are_an_error() {
        // Three isolated pixels: enough contours to pass the band, but
        // none encloses any area.
        let img = circle_frame(&[(20, 20, 0), (50, 50, 0), (80, 80, 0)]);
        let result = estimate_image(&img, &passthrough_config());
        assert!(matches!(result, Err(EstimatorError::ZeroAreaRegion)));
    }

    #[test]
    fn invalid_config_is_rejected_before_processing() {
        let img = circle_frame(&[]);
        let config = EstimatorConfig {
            correspondence_tolerance: 0,
            ..EstimatorConfig::default()
        };
        let result = estimate_image(&img, &config);
        assert!(matches!(result, Err(EstimatorError::InvalidConfig(_))));
    }

    #[test]
    fn estimate_from_bytes_matches_estimate_image() {
        let img = circle_frame(&[(20, 20, 19), (80, 20, 13)]);
        let png = encode_png(&img);
        let config = passthrough_config();
        let from_bytes = estimate(&png, &config).unwrap();
        let from_image = estimate_image(&img, &config).unwrap();
        assert_eq!(from_bytes, from_image);
    }

    #[test]
    fn estimate_empty_input_is_an_error() {
        let result = estimate(&[], &EstimatorConfig::default());
        assert!(matches!(result, Err(EstimatorError::EmptyInput)));
    }

    #[test]
    fn estimate_corrupt_input_is_an_error() {
        let result = estimate(&[0xFF, 0x00], &EstimatorConfig::default());
        assert!(matches!(result, Err(EstimatorError::ImageDecode(_))));
    }
}
