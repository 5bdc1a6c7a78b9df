//! Contour detection and per-contour geometry.
//!
//! Detection uses Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`], listing every border with
//! no containment hierarchy. Area and centroid follow the usual
//! polygon formulas (shoelace and Green's theorem moments), matching
//! the conventions the selection and angle stages were tuned against.

use image::GrayImage;

use crate::types::{Contour, Point};

/// Detect all contours in a binary mask.
///
/// Returns one [`Contour`] per detected border, in detection order.
/// Every boundary pixel is kept; collinear runs are not collapsed to
/// their endpoints. The downstream consumers are insensitive to the
/// difference: shoelace area and polygon moments are unchanged by
/// collinear points, and the right-edge scan tracks a strict maximum,
/// so extra points along an edge never displace the first winner.
/// Indices into the returned set are only valid for this set; a
/// re-detection produces fresh indices.
#[must_use = "returns the detected contours"]
pub fn detect(mask: &GrayImage) -> Vec<Contour> {
    let found: Vec<imageproc::contours::Contour<i32>> = imageproc::contours::find_contours(mask);

    found
        .into_iter()
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(p.x, p.y))
                .collect();
            Contour::new(points)
        })
        .collect()
}

/// Polygon area of a contour under the shoelace formula.
///
/// Contours with fewer than three points enclose nothing and have
/// zero area.
#[must_use]
pub fn area(contour: &Contour) -> f64 {
    let points = contour.points();
    if points.len() < 3 {
        return 0.0;
    }

    let mut doubled: i64 = 0;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        let (xi, yi) = (i64::from(points[i].x), i64::from(points[i].y));
        let (xj, yj) = (i64::from(points[j].x), i64::from(points[j].y));
        doubled += xi * yj - xj * yi;
    }

    #[allow(clippy::cast_precision_loss)]
    let area = doubled.abs() as f64 / 2.0;
    area
}

/// Moment-based centroid of a contour polygon, truncated to integer
/// pixel coordinates.
///
/// Computed from the geometric moments `(m10/m00, m01/m00)` via
/// Green's theorem. Returns `None` when `m00` is zero (a degenerate
/// region with no enclosed area), which callers treat as a
/// precondition violation.
#[must_use]
pub fn centroid(contour: &Contour) -> Option<Point> {
    let points = contour.points();
    if points.len() < 3 {
        return None;
    }

    let mut m00 = 0.0_f64;
    let mut m10 = 0.0_f64;
    let mut m01 = 0.0_f64;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        let (xi, yi) = (f64::from(points[i].x), f64::from(points[i].y));
        let (xj, yj) = (f64::from(points[j].x), f64::from(points[j].y));
        let cross = xi * yj - xj * yi;
        m00 += cross;
        m10 += (xi + xj) * cross;
        m01 += (yi + yj) * cross;
    }
    m00 /= 2.0;
    m10 /= 6.0;
    m01 /= 6.0;

    if m00.abs() < f64::EPSILON {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let center = Point::new((m10 / m00) as i32, (m01 / m00) as i32);
    Some(center)
}
