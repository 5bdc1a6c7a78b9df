//! Rotation-compensated right-edge search and inverse coordinate
//! correspondence.
//!
//! The grasp point is found on the rightmost edge of the chosen
//! region *after* rotating the image to cancel the computed heading.
//! Because the rotation is applied to the image rather than to
//! individual contour points, the original-frame coordinate has to be
//! recovered afterwards: a closed-form inverse affine gets tried
//! first, falling back to the reference row-major scan over every
//! original pixel when truncation makes the analytic answer miss.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection};

use crate::types::{Contour, Point};

/// Horizontal grasp-point bias applied to the right-edge point.
pub const GRASP_OFFSET_X: i32 = -8;

/// Vertical grasp-point bias applied to the right-edge point.
pub const GRASP_OFFSET_Y: i32 = -10;

/// A 2D affine rotation about the image center, scale 1.0.
///
/// Row form `[[a, b, tx], [-b, a, ty]]` with `a = cos θ` and
/// `b = sin θ`: with y growing downward, positive angles turn the
/// content counter-clockwise on screen, the same convention the
/// headings of [`crate::angle`] were calibrated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTransform {
    a: f64,
    b: f64,
    tx: f64,
    ty: f64,
}

impl RotationTransform {
    /// Rotation by `angle_degrees` about the center of a
    /// `width` x `height` image.
    ///
    /// The center is `(⌊w/2⌋, ⌊h/2⌋)`, matching the integer-divided
    /// center the correspondence constants were tuned against.
    #[must_use]
    pub fn about_center(width: u32, height: u32, angle_degrees: f64) -> Self {
        let theta = angle_degrees.to_radians();
        let a = theta.cos();
        let b = theta.sin();
        let cx = f64::from(width / 2);
        let cy = f64::from(height / 2);

        Self {
            a,
            b,
            tx: (1.0 - a) * cx - b * cy,
            ty: b * cx + (1.0 - a) * cy,
        }
    }

    /// Forward-map a point, keeping full precision.
    #[must_use]
    pub fn apply_f64(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.tx,
            -self.b * x + self.a * y + self.ty,
        )
    }

    /// Forward-map a pixel coordinate, truncating toward zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(&self, p: Point) -> Point {
        let (fx, fy) = self.apply_f64(f64::from(p.x), f64::from(p.y));
        Point::new(fx as i32, fy as i32)
    }

    /// The inverse rotation (exact, since the scale is 1.0).
    #[must_use]
    pub fn invert(&self) -> Self {
        Self {
            a: self.a,
            b: -self.b,
            tx: -(self.a * self.tx - self.b * self.ty),
            ty: -(self.b * self.tx + self.a * self.ty),
        }
    }

    /// The equivalent projective transform for image warping.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    fn projection(&self) -> Option<Projection> {
        Projection::from_matrix([
            self.a as f32,
            self.b as f32,
            self.tx as f32,
            -self.b as f32,
            self.a as f32,
            self.ty as f32,
            0.0,
            0.0,
            1.0,
        ])
    }
}

/// Warp a single-channel image by the given rotation.
///
/// Nearest-neighbor sampling, black fill outside the source. Output
/// dimensions match the input.
#[must_use = "returns the reoriented image"]
pub fn warp(image: &GrayImage, transform: &RotationTransform) -> GrayImage {
    transform.projection().map_or_else(
        || image.clone(),
        |projection| {
            imageproc::geometric_transformations::warp(
                image,
                &projection,
                Interpolation::Nearest,
                Luma([0]),
            )
        },
    )
}

/// Rightmost contour point, biased by the grasp offsets.
///
/// Scans the boundary points in detection order and tracks the
/// strictly increasing maximum x seen so far, starting from zero; the
/// recorded point is the winner shifted by
/// ([`GRASP_OFFSET_X`], [`GRASP_OFFSET_Y`]).
#[must_use]
pub fn right_edge(contour: &Contour) -> Point {
    let mut max_x = 0;
    let mut pt = Point::new(0, 0);

    for p in contour.points() {
        if p.x > max_x {
            max_x = p.x;
            pt = Point::new(p.x + GRASP_OFFSET_X, p.y + GRASP_OFFSET_Y);
        }
    }

    pt
}

/// Recover the original-frame pixel whose forward image is `target`.
///
/// Fast path: the closed-form inverse affine, accepted when its
/// truncated forward image lands exactly on `target`. Several
/// adjacent pixels can truncate onto the same target, so the
/// row-major-earlier neighbors of an accepted candidate are also
/// tested and the earliest exact match wins, keeping the result
/// identical to the exhaustive scan. Otherwise the brute-force search
/// runs: every original pixel is forward-mapped in row-major order,
/// and the half-open window
/// `(target.x - tolerance, target.x] x [target.y, target.y + tolerance)`
/// is checked. The first exact hit short-circuits; failing that, the
/// last in-window coordinate wins. Returns `None` when nothing lands
/// in the window at all.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn invert_point(
    transform: &RotationTransform,
    target: Point,
    width: u32,
    height: u32,
    tolerance: i32,
) -> Option<Point> {
    let (w, h) = (width as i32, height as i32);
    let in_bounds = |p: Point| (0..w).contains(&p.x) && (0..h).contains(&p.y);

    // Closed-form inverse first; exactness check guards against
    // truncation landing one pixel off. A zero target coordinate is
    // left to the scan: truncation toward zero collapses the whole
    // interval (-1, 1) onto 0, so exact matches there can sit two
    // pixels apart and the neighbor check below cannot order them.
    let candidate = transform.invert().apply(target);
    if target.x != 0
        && target.y != 0
        && in_bounds(candidate)
        && transform.apply(candidate) == target
    {
        // Exact matches are lattice points inside the preimage of one
        // unit square, so any two of them are less than sqrt(2)
        // apart; checking the row-major-earlier neighbors is enough
        // to find the one the scan would report first.
        let earlier = [
            Point::new(candidate.x - 1, candidate.y - 1),
            Point::new(candidate.x, candidate.y - 1),
            Point::new(candidate.x + 1, candidate.y - 1),
            Point::new(candidate.x - 1, candidate.y),
        ];
        for p in earlier {
            if in_bounds(p) && transform.apply(p) == target {
                return Some(p);
            }
        }
        return Some(candidate);
    }

    let mut fallback = None;
    for y in 0..h {
        for x in 0..w {
            let check = transform.apply(Point::new(x, y));
            let in_window = target.x - tolerance < check.x
                && check.x <= target.x
                && target.y <= check.y
                && check.y < target.y + tolerance;
            if in_window {
                fallback = Some(Point::new(x, y));
                if check == target {
                    return fallback;
                }
            }
        }
    }

    fallback
}
