//! Heading angle and front/back determination.
//!
//! The heading runs from the tail region centroid (`pt1`, the larger
//! region) toward the head region centroid (`pt2`, the second
//! region): zero points right, positive turns clockwise. The raw
//! `atan2` result is scaled by [`ANGLE_SCALE`] into the operating
//! angle convention the grasp controller was calibrated against.

use crate::select::Selection;
use crate::types::{Orientation, Point};

/// Fixed multiplier converting the geometric angle into the
/// application's operating angle convention. A deliberate
/// domain-specific recalibration, not a unit conversion.
pub const ANGLE_SCALE: f64 = 60.0;

/// Signed heading from `pt1` (tail) toward `pt2` (head), scaled by
/// [`ANGLE_SCALE`].
///
/// When the head sits at or below the tail (`dy >= 0`, y grows
/// downward), the angle is `atan2(dy, dx)`; otherwise the magnitude
/// is taken from the mirrored delta and negated.
#[must_use]
pub fn heading_degrees(pt1: Point, pt2: Point) -> f64 {
    let dx = f64::from(pt2.x - pt1.x);
    let dy = f64::from(pt2.y - pt1.y);

    let angle = if dy >= 0.0 {
        dy.atan2(dx)
    } else {
        -((-dy).atan2(dx))
    };

    angle * ANGLE_SCALE
}

/// Decide the front/back flag and swap the selected regions when the
/// object is judged back-facing.
///
/// When `back_area_threshold` is configured and the second region's
/// area reaches it, the object is backward: the former second region
/// becomes the tail and vice versa. When the threshold is absent
/// (the direct-color capture setup), the flag stays `Front` and the
/// selection passes through untouched.
#[must_use]
pub fn resolve_orientation(
    selection: Selection,
    back_area_threshold: Option<f64>,
) -> (Selection, Orientation) {
    match back_area_threshold {
        Some(threshold) if selection.second_area >= threshold => {
            (selection.swapped(), Orientation::Back)
        }
        _ => (selection, Orientation::Front),
    }
}
