//! Estimation diagnostics: timing, counts, and geometry for each
//! pipeline stage.
//!
//! [`estimate_with_diagnostics`] runs the same pipeline as
//! [`crate::estimate`] while collecting per-stage timing and counts,
//! which is what the bench CLI prints for parameter tuning.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement
//! serde traits. Timestamps come from a caller-supplied [`Clock`] so
//! the pipeline crate itself stays free of platform time sources.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{EstimatorConfig, EstimatorError, GraspPose, Orientation, Point};
use crate::{angle, channel, contour, morphology, rotate, select};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
///
/// The bench CLI supplies an implementation backed by
/// [`std::time::Instant`]; tests can supply a fixed clock.
pub trait Clock {
    /// An opaque captured timestamp.
    type Instant;

    /// Capture the current instant.
    fn now(&self) -> Self::Instant;

    /// Elapsed time since a captured instant.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single estimation run.
///
/// Stages after contour detection are `None` when the run ended early
/// with the undetermined sentinel pose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: plane extraction + binarization.
    pub binarize: StageDiagnostics,
    /// Stage 2: morphological cleanup (final attempt's parameters).
    pub morphology: StageDiagnostics,
    /// Stage 3: contour detection (final attempt's contour set).
    pub contours: StageDiagnostics,
    /// Stage 4: region-pair selection.
    pub selection: Option<StageDiagnostics>,
    /// Stage 5: orientation + heading angle.
    pub orientation: Option<StageDiagnostics>,
    /// Stage 6: rotated-frame right-edge search.
    pub rotated_search: Option<StageDiagnostics>,
    /// Stage 7: inverse coordinate correspondence.
    pub correspondence: Option<StageDiagnostics>,
    /// Number of segmentation attempts taken (1 or 2).
    pub attempts: u32,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the run.
    pub summary: EstimateSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded frame width in pixels.
        width: u32,
        /// Decoded frame height in pixels.
        height: u32,
    },
    /// Plane extraction and binarization metrics.
    Binarize {
        /// Which plane fed the cutoff.
        channel: String,
        /// Intensity cutoff.
        threshold: u8,
        /// Foreground pixels in the raw mask.
        foreground_pixels: u64,
    },
    /// Morphological cleanup metrics.
    Morphology {
        /// Structuring element half-width.
        kernel_radius: u8,
        /// Erosion passes.
        erode_iterations: u8,
        /// Dilation passes.
        dilate_iterations: u8,
        /// Foreground pixels after cleanup.
        foreground_pixels: u64,
    },
    /// Contour detection metrics.
    Contours {
        /// Number of detected contours.
        contour_count: usize,
        /// Total boundary points across all contours.
        total_points: usize,
    },
    /// Region-pair selection metrics.
    Selection {
        /// Winning region id.
        max_id: usize,
        /// Runner-up region id.
        second_id: usize,
        /// Winning region area.
        max_area: f64,
        /// Runner-up region area.
        second_area: f64,
    },
    /// Orientation and heading metrics.
    Orientation {
        /// Front/back classification.
        orientation: String,
        /// Whether the back check swapped the regions.
        swapped: bool,
        /// Tail region centroid.
        tail: Point,
        /// Head region centroid.
        head: Point,
        /// Computed heading in the operating convention.
        angle_degrees: f64,
    },
    /// Rotated-frame right-edge search metrics.
    RotatedSearch {
        /// Contours re-detected in the rotated frame.
        rotated_contour_count: usize,
        /// Id of the region chosen for the edge scan.
        chosen_id: usize,
        /// Biased right-edge point, rotated frame.
        edge_point: Point,
    },
    /// Inverse correspondence metrics.
    Correspondence {
        /// Tolerance window half-width.
        tolerance: i32,
        /// Recovered original-frame grasp point.
        point: Point,
    },
}

/// High-level summary of an estimation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateSummary {
    /// Source frame width in pixels.
    pub image_width: u32,
    /// Source frame height in pixels.
    pub image_height: u32,
    /// Contours in the final detection pass.
    pub contour_count: usize,
    /// `"pose"` for a determined result, `"undetermined"` for the
    /// sentinel.
    pub outcome: String,
}

impl EstimateDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Estimation Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Frame: {}x{}  |  attempts: {}  |  outcome: {}",
            self.summary.image_width,
            self.summary.image_height,
            self.attempts,
            self.summary.outcome,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<18} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let stages: Vec<(&str, &StageDiagnostics)> = {
            let mut s = vec![
                ("Decode", &self.decode),
                ("Binarize", &self.binarize),
                ("Morphology", &self.morphology),
                ("Contours", &self.contours),
            ];
            if let Some(ref d) = self.selection {
                s.push(("Selection", d));
            }
            if let Some(ref d) = self.orientation {
                s.push(("Orientation", d));
            }
            if let Some(ref d) = self.rotated_search {
                s.push(("Rotated Search", d));
            }
            if let Some(ref d) = self.correspondence {
                s.push(("Correspondence", d));
            }
            s
        };

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<18} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Binarize {
            channel,
            threshold,
            foreground_pixels,
        } => format!("{channel} plane, cutoff {threshold}, fg={foreground_pixels}"),
        StageMetrics::Morphology {
            kernel_radius,
            erode_iterations,
            dilate_iterations,
            foreground_pixels,
        } => format!(
            "r={kernel_radius} erode={erode_iterations} dilate={dilate_iterations} fg={foreground_pixels}",
        ),
        StageMetrics::Contours {
            contour_count,
            total_points,
        } => format!("{contour_count} contours, {total_points} pts"),
        StageMetrics::Selection {
            max_id,
            second_id,
            max_area,
            second_area,
        } => format!(
            "max #{max_id} ({max_area:.0}), second #{second_id} ({second_area:.0})",
        ),
        StageMetrics::Orientation {
            orientation,
            swapped,
            tail,
            head,
            angle_degrees,
        } => format!(
            "{orientation}{} tail=({}, {}) head=({}, {}) angle={angle_degrees:.2}",
            if *swapped { " (swapped)" } else { "" },
            tail.x,
            tail.y,
            head.x,
            head.y,
        ),
        StageMetrics::RotatedSearch {
            rotated_contour_count,
            chosen_id,
            edge_point,
        } => format!(
            "{rotated_contour_count} contours, region #{chosen_id}, edge=({}, {})",
            edge_point.x, edge_point.y,
        ),
        StageMetrics::Correspondence { tolerance, point } => {
            format!("tol={tolerance} point=({}, {})", point.x, point.y)
        }
    }
}

/// Count foreground pixels (value == 255) in a binary mask.
pub(crate) fn count_foreground(mask: &image::GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == 255)))
        .sum()
}

/// Run the full estimation pipeline, collecting per-stage
/// diagnostics.
///
/// Behaves identically to [`crate::estimate`]: the undetermined
/// sentinel pose is a successful outcome, reported with the stages
/// after contour detection absent.
///
/// # Errors
///
/// Same conditions as [`crate::estimate`].
#[allow(clippy::too_many_lines, clippy::missing_panics_doc)]
pub fn estimate_with_diagnostics<C: Clock>(
    bytes: &[u8],
    config: &EstimatorConfig,
    clock: &C,
) -> Result<(GraspPose, EstimateDiagnostics), EstimatorError> {
    config.validate()?;

    let run_start = clock.now();

    let start = clock.now();
    let rgb = channel::decode_rgb(bytes)?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: bytes.len(),
            width: rgb.width(),
            height: rgb.height(),
        },
    };

    let start = clock.now();
    let plane = channel::extract(&rgb, config.channel);
    let mask = channel::binarize(&plane, config.threshold);
    let binarize = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Binarize {
            channel: config.channel.to_string(),
            threshold: config.threshold,
            foreground_pixels: count_foreground(&mask),
        },
    };

    let start = clock.now();
    let cleaned = morphology::clean(&mask, config.morphology);
    let mut detected = contour::detect(&cleaned);
    let mut attempts = 1;
    let mut morph_params = config.morphology;
    let mut cleaned_final = cleaned;
    if detected.len() <= crate::RETRY_CONTOUR_LIMIT {
        attempts = 2;
        morph_params = config.retry_morphology;
        cleaned_final = morphology::clean(&mask, config.retry_morphology);
        detected = contour::detect(&cleaned_final);
    }
    let stage_duration = clock.elapsed(&start);
    let morphology_diag = StageDiagnostics {
        duration: stage_duration,
        metrics: StageMetrics::Morphology {
            kernel_radius: morph_params.kernel_radius,
            erode_iterations: morph_params.erode_iterations,
            dilate_iterations: morph_params.dilate_iterations,
            foreground_pixels: count_foreground(&cleaned_final),
        },
    };
    let contours_diag = StageDiagnostics {
        duration: Duration::ZERO,
        metrics: StageMetrics::Contours {
            contour_count: detected.len(),
            total_points: detected.iter().map(crate::types::Contour::len).sum(),
        },
    };

    let mut diagnostics = EstimateDiagnostics {
        decode,
        binarize,
        morphology: morphology_diag,
        contours: contours_diag,
        selection: None,
        orientation: None,
        rotated_search: None,
        correspondence: None,
        attempts,
        total_duration: Duration::ZERO,
        summary: EstimateSummary {
            image_width: rgb.width(),
            image_height: rgb.height(),
            contour_count: detected.len(),
            outcome: String::new(),
        },
    };

    if detected.len() < crate::MIN_CONTOURS || detected.len() >= crate::MAX_CONTOURS {
        diagnostics.total_duration = clock.elapsed(&run_start);
        diagnostics.summary.outcome = "undetermined".to_string();
        return Ok((GraspPose::undetermined(), diagnostics));
    }

    let start = clock.now();
    let selection = select::select_pair(&detected, config.area_ceiling);
    diagnostics.selection = Some(StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Selection {
            max_id: selection.max_id,
            second_id: selection.second_id,
            max_area: selection.max_area,
            second_area: selection.second_area,
        },
    });

    let start = clock.now();
    let (selection, orientation) =
        angle::resolve_orientation(selection, config.back_area_threshold);
    let tail = contour::centroid(&detected[selection.max_id])
        .ok_or(EstimatorError::ZeroAreaRegion)?;
    let head = contour::centroid(&detected[selection.second_id])
        .ok_or(EstimatorError::ZeroAreaRegion)?;
    let angle_degrees = angle::heading_degrees(tail, head);
    diagnostics.orientation = Some(StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Orientation {
            orientation: orientation.to_string(),
            swapped: orientation == Orientation::Back,
            tail,
            head,
            angle_degrees,
        },
    });

    let start = clock.now();
    let transform =
        rotate::RotationTransform::about_center(plane.width(), plane.height(), angle_degrees);
    let rotated = rotate::warp(&plane, &transform);
    let rotated_mask = channel::binarize(&rotated, config.threshold);
    let rotated_contours = contour::detect(&rotated_mask);
    if rotated_contours.is_empty() {
        return Err(EstimatorError::RegionLost);
    }
    let rotated_selection = select::select_pair(&rotated_contours, config.area_ceiling);
    let chosen_id = match orientation {
        Orientation::Front => rotated_selection.max_id,
        Orientation::Back => rotated_selection.second_id,
    };
    let edge_point = rotate::right_edge(&rotated_contours[chosen_id]);
    diagnostics.rotated_search = Some(StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::RotatedSearch {
            rotated_contour_count: rotated_contours.len(),
            chosen_id,
            edge_point,
        },
    });

    let start = clock.now();
    let point = rotate::invert_point(
        &transform,
        edge_point,
        plane.width(),
        plane.height(),
        config.correspondence_tolerance,
    )
    .ok_or(EstimatorError::CorrespondenceFailed)?;
    diagnostics.correspondence = Some(StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Correspondence {
            tolerance: config.correspondence_tolerance,
            point,
        },
    });

    diagnostics.total_duration = clock.elapsed(&run_start);
    diagnostics.summary.outcome = "pose".to_string();

    let pose = GraspPose {
        point,
        angle_degrees,
        orientation,
    };
    Ok((pose, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A clock that always reports a fixed elapsed duration.
    struct FixedClock;

    impl Clock for FixedClock {
        type Instant = ();

        fn now(&self) {}

        fn elapsed(&self, (): &()) -> Duration {
            Duration::from_millis(1)
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
    fn count_foreground_counts_only_white() {
        let mut mask = image::GrayImage::new(10, 10);
        for x in 0..5 {
            mask.put_pixel(x, 0, image::Luma([255]));
        }
        mask.put_pixel(6, 0, image::Luma([128]));
        assert_eq!(count_foreground(&mask), 5);
    }

    #[test]
    fn uniform_frame_reports_undetermined_outcome() {
        // Bright red everywhere: nothing below the cutoff, no contours.
        let img = image::RgbImage::from_fn(30, 30, |_, _| image::Rgb([200, 0, 0]));
        let png = encode_png(&img);
        let (pose, diagnostics) =
            estimate_with_diagnostics(&png, &EstimatorConfig::default(), &FixedClock).unwrap();
        assert!(pose.is_undetermined());
        assert_eq!(diagnostics.summary.outcome, "undetermined");
        assert_eq!(diagnostics.attempts, 2);
        assert!(diagnostics.selection.is_none());
        assert!(diagnostics.correspondence.is_none());
    }

    #[test]
    fn empty_bytes_error_propagates() {
        let result = estimate_with_diagnostics(&[], &EstimatorConfig::default(), &FixedClock);
        assert!(matches!(result, Err(EstimatorError::EmptyInput)));
    }

    #[test]
    fn report_of_undetermined_run_mentions_outcome() {
        let img = image::RgbImage::from_fn(30, 30, |_, _| image::Rgb([200, 0, 0]));
        let png = encode_png(&img);
        let (_, diagnostics) =
            estimate_with_diagnostics(&png, &EstimatorConfig::default(), &FixedClock).unwrap();
        let report = diagnostics.report();
        assert!(report.contains("Estimation Diagnostics Report"));
        assert!(report.contains("undetermined"));
        assert!(report.contains("Morphology"));
    }

    #[test]
    fn diagnostics_serde_round_trip() {
        let img = image::RgbImage::from_fn(30, 30, |_, _| image::Rgb([200, 0, 0]));
        let png = encode_png(&img);
        let (_, diagnostics) =
            estimate_with_diagnostics(&png, &EstimatorConfig::default(), &FixedClock).unwrap();
        let json = serde_json::to_string(&diagnostics).unwrap();
        let back: EstimateDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.outcome, diagnostics.summary.outcome);
        assert_eq!(back.attempts, diagnostics.attempts);
    }
}
