//! Region-pair selection: the largest and second-largest regions
//! under an area ceiling.
//!
//! A small reducer over `(id, area)` pairs in detection order, with
//! two running winner slots. Contours whose area reaches the ceiling
//! are skipped outright; they are plausibly the whole-frame
//! background rather than part of the object.

use serde::{Deserialize, Serialize};

use crate::contour;
use crate::types::Contour;

/// The two winning regions of a selection pass.
///
/// Ids default to `0` when a slot was never filled, so callers decide
/// on area magnitude rather than on the id alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Index of the largest-area contour under the ceiling.
    pub max_id: usize,
    /// Index of the second-largest-area contour under the ceiling.
    pub second_id: usize,
    /// Area of the `max` contour.
    pub max_area: f64,
    /// Area of the `second` contour.
    pub second_area: f64,
}

impl Selection {
    /// Swap the two winner slots, areas included.
    #[must_use]
    pub const fn swapped(self) -> Self {
        Self {
            max_id: self.second_id,
            second_id: self.max_id,
            max_area: self.second_area,
            second_area: self.max_area,
        }
    }
}

/// Select the largest and second-largest contours strictly below
/// `area_ceiling`.
///
/// Contours are visited in detection order. A contour beating the
/// current `max` demotes it into `second`; otherwise one beating the
/// current `second` replaces it. After every under-ceiling contour,
/// if `second`'s area is no longer strictly below `max`'s, both area
/// slots reset to zero — degenerate ties must not collapse the two
/// winners onto indistinguishable regions. The reset clears areas
/// only; ids keep their last value, which is why callers check area
/// magnitude downstream.
///
/// Deterministic and idempotent: the same contour set and ceiling
/// always produce the same selection.
#[must_use]
pub fn select_pair(contours: &[Contour], area_ceiling: f64) -> Selection {
    let mut selection = Selection {
        max_id: 0,
        second_id: 0,
        max_area: 0.0,
        second_area: 0.0,
    };

    for (id, contour) in contours.iter().enumerate() {
        let area = contour::area(contour);
        if area >= area_ceiling {
            continue;
        }

        if area > selection.max_area {
            selection.second_area = selection.max_area;
            selection.second_id = selection.max_id;
            selection.max_area = area;
            selection.max_id = id;
        } else if area > selection.second_area {
            selection.second_area = area;
            selection.second_id = id;
        }

        if selection.second_area >= selection.max_area {
            selection.second_area = 0.0;
            selection.max_area = 0.0;
        }
    }

    selection
}
