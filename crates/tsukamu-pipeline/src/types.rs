//! Shared types for the tsukamu grasp-pose estimation pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// decoded camera frame without depending on `image` directly.
pub use image::RgbImage;

/// A 2D point in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Ordered boundary points of one connected foreground region.
///
/// A contour is only meaningful relative to the detection pass that
/// produced it: indices into a contour set must never be reused after
/// a re-segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from a vector of boundary points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of boundary points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all boundary points in detection order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }
}

/// Which way the object is judged to be facing.
///
/// Selects which of the two detected regions represents the tail vs
/// the head when extracting the grasp point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Object faces forward (the default, unexamined state).
    #[default]
    Front,
    /// Object faces backward; tail and head regions are swapped.
    Back,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

/// Result of a grasp-pose estimation.
///
/// A failed estimation is not an error: it is represented by the
/// sentinel pose from [`GraspPose::undetermined`], matching the
/// behavior callers already rely on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraspPose {
    /// Grasp point in the original (pre-rotation) image frame.
    pub point: Point,
    /// Signed rotation estimate in the application's operating angle
    /// convention (see [`crate::angle::ANGLE_SCALE`]).
    pub angle_degrees: f64,
    /// Front/back classification of the object.
    pub orientation: Orientation,
}

impl GraspPose {
    /// Sentinel coordinate meaning "undetermined".
    pub const UNDETERMINED_COORD: i32 = 999;

    /// Sentinel angle meaning "undetermined".
    pub const UNDETERMINED_ANGLE: f64 = 999.0;

    /// The sentinel pose reported when the contour count falls outside
    /// the recognizable band.
    #[must_use]
    pub const fn undetermined() -> Self {
        Self {
            point: Point::new(Self::UNDETERMINED_COORD, Self::UNDETERMINED_COORD),
            angle_degrees: Self::UNDETERMINED_ANGLE,
            orientation: Orientation::Front,
        }
    }

    /// Returns `true` if this pose carries the sentinel values.
    #[must_use]
    pub fn is_undetermined(&self) -> bool {
        self.point == Point::new(Self::UNDETERMINED_COORD, Self::UNDETERMINED_COORD)
            && (self.angle_degrees - Self::UNDETERMINED_ANGLE).abs() < f64::EPSILON
    }
}

/// Which color plane feeds the binarization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSource {
    /// Red plane of the color frame.
    #[default]
    Red,
    /// Green plane of the color frame.
    Green,
    /// Blue plane of the color frame.
    Blue,
    /// Weighted luminance of all three planes.
    Luminance,
}

impl std::fmt::Display for ChannelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Blue => write!(f, "blue"),
            Self::Luminance => write!(f, "luminance"),
        }
    }
}

/// Structuring-element size and pass counts for the morphological
/// cleanup step. These are tunable constants, never computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphParams {
    /// Half-width of the square structuring element in pixels
    /// (radius 2 is a 5x5 element).
    pub kernel_radius: u8,
    /// Number of erosion passes. Zero skips erosion entirely.
    pub erode_iterations: u8,
    /// Number of dilation passes. Zero skips dilation entirely.
    pub dilate_iterations: u8,
}

impl MorphParams {
    /// Create morphology parameters.
    #[must_use]
    pub const fn new(kernel_radius: u8, erode_iterations: u8, dilate_iterations: u8) -> Self {
        Self {
            kernel_radius,
            erode_iterations,
            dilate_iterations,
        }
    }
}

/// Configuration for the grasp-pose estimation pipeline.
///
/// One pipeline serves both historical capture setups; the differences
/// between them are carried here as data rather than as forked code
/// paths: `{channel, threshold, area_ceiling, back_area_threshold,
/// correspondence_tolerance}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Which color plane to binarize.
    pub channel: ChannelSource,

    /// Binarization cutoff: plane values at or below this intensity
    /// become foreground.
    pub threshold: u8,

    /// Morphology parameters for the first segmentation attempt.
    pub morphology: MorphParams,

    /// Morphology parameters for the single retry attempt, taken when
    /// the first pass yields too few contours.
    pub retry_morphology: MorphParams,

    /// Region area ceiling: contours with at least this area are
    /// excluded from region-pair selection (they are plausibly the
    /// whole-frame background).
    pub area_ceiling: f64,

    /// When set, a "second" region with at least this area flips the
    /// orientation to [`Orientation::Back`] and swaps the two selected
    /// regions. `None` disables the check, leaving the flag at its
    /// `Front` default. The two capture setups deliberately differ
    /// here.
    pub back_area_threshold: Option<f64>,

    /// Half-open tolerance window, in pixels, for the inverse
    /// coordinate correspondence search.
    pub correspondence_tolerance: i32,
}

impl EstimatorConfig {
    /// Default binarization cutoff for the color-frame setup.
    pub const DEFAULT_THRESHOLD: u8 = 40;

    /// Area ceiling used with direct color frames.
    pub const DEFAULT_AREA_CEILING: f64 = 30_000.0;

    /// Area ceiling used with edge-detected frames, where regions are
    /// much thinner.
    pub const EDGE_AREA_CEILING: f64 = 3_000.0;

    /// Second-region area at which the object is judged back-facing.
    pub const BACK_AREA_THRESHOLD: f64 = 800.0;

    /// Tight correspondence window (the default).
    pub const DEFAULT_CORRESPONDENCE_TOLERANCE: i32 = 2;

    /// Looser historical correspondence window; risks ambiguous
    /// matches on small objects.
    pub const LOOSE_CORRESPONDENCE_TOLERANCE: i32 = 20;

    /// First-attempt morphology: 5x5 element, one erosion, six
    /// dilations.
    pub const DEFAULT_MORPHOLOGY: MorphParams = MorphParams::new(2, 1, 6);

    /// Retry morphology: wider 11x11 element, same pass counts.
    pub const RETRY_MORPHOLOGY: MorphParams = MorphParams::new(5, 1, 6);

    /// Configuration for direct color camera frames: red-plane
    /// binarization, no back-facing check.
    #[must_use]
    pub const fn direct_color() -> Self {
        Self {
            channel: ChannelSource::Red,
            threshold: Self::DEFAULT_THRESHOLD,
            morphology: Self::DEFAULT_MORPHOLOGY,
            retry_morphology: Self::RETRY_MORPHOLOGY,
            area_ceiling: Self::DEFAULT_AREA_CEILING,
            back_area_threshold: None,
            correspondence_tolerance: Self::DEFAULT_CORRESPONDENCE_TOLERANCE,
        }
    }

    /// Configuration for edge-detected frames: luminance plane,
    /// tighter area ceiling, back-facing check enabled.
    #[must_use]
    pub const fn edge_image() -> Self {
        Self {
            channel: ChannelSource::Luminance,
            threshold: Self::DEFAULT_THRESHOLD,
            morphology: Self::DEFAULT_MORPHOLOGY,
            retry_morphology: Self::RETRY_MORPHOLOGY,
            area_ceiling: Self::EDGE_AREA_CEILING,
            back_area_threshold: Some(Self::BACK_AREA_THRESHOLD),
            correspondence_tolerance: Self::DEFAULT_CORRESPONDENCE_TOLERANCE,
        }
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::InvalidConfig`] when the area ceiling
    /// is not positive, the correspondence tolerance is below one
    /// pixel, or a structuring element has zero radius.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if self.area_ceiling <= 0.0 {
            return Err(EstimatorError::InvalidConfig(format!(
                "area_ceiling must be positive, got {}",
                self.area_ceiling,
            )));
        }
        if self.correspondence_tolerance < 1 {
            return Err(EstimatorError::InvalidConfig(format!(
                "correspondence_tolerance must be at least 1, got {}",
                self.correspondence_tolerance,
            )));
        }
        if self.morphology.kernel_radius == 0 || self.retry_morphology.kernel_radius == 0 {
            return Err(EstimatorError::InvalidConfig(
                "morphology kernel_radius must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::direct_color()
    }
}

/// Errors that can occur during estimation.
///
/// Sentinel failures (contour count outside the recognizable band) are
/// not errors; they surface as [`GraspPose::undetermined`]. Errors are
/// reserved for bad input and geometric degeneracies the caller is
/// expected to treat as fatal-and-retry.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Estimator configuration is invalid.
    #[error("invalid estimator configuration: {0}")]
    InvalidConfig(String),

    /// A selected region has zero polygon area, so its centroid is
    /// undefined.
    #[error("selected region has zero area, cannot compute a centroid")]
    ZeroAreaRegion,

    /// The rotated-frame re-detection found no contours at all.
    #[error("no contours survived the rotated-frame re-detection")]
    RegionLost,

    /// No original-frame pixel mapped into the tolerance window around
    /// the rotated-frame target.
    #[error("no original-frame pixel maps near the rotated-frame target point")]
    CorrespondenceFailed,
}
