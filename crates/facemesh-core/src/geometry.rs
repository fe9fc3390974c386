//! Landmark geometry: pixel distances and expression metrics.
//!
//! All indices below belong to the face-mesh topology and are fixed by the
//! model. They must not be renumbered.

use crate::types::{ExpressionMetrics, LandmarkSet};
use thiserror::Error;

pub const UPPER_INNER_LIP: usize = 13;
pub const LOWER_INNER_LIP: usize = 14;
pub const RIGHT_EYE_TOP: usize = 159;
pub const RIGHT_EYE_BOTTOM: usize = 145;
pub const LEFT_EYE_TOP: usize = 386;
pub const LEFT_EYE_BOTTOM: usize = 374;
pub const RIGHT_EYE_CORNER: usize = 133;
pub const LEFT_EYE_CORNER: usize = 362;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("landmark index {index} out of range for a set of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("non-finite {metric} value")]
    NonFinite { metric: &'static str },
}

/// Outcome of [`analyze_expressions`].
///
/// Metrics are best-effort: a malformed landmark set degrades to all-zero
/// metrics instead of failing the detection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionAnalysis {
    Measured(ExpressionMetrics),
    Degraded {
        metrics: ExpressionMetrics,
        reason: GeometryError,
    },
}

impl ExpressionAnalysis {
    /// The metrics to report; zeros when degraded.
    pub fn metrics(&self) -> ExpressionMetrics {
        match self {
            ExpressionAnalysis::Measured(m) => *m,
            ExpressionAnalysis::Degraded { metrics, .. } => *metrics,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ExpressionAnalysis::Degraded { .. })
    }
}

/// Euclidean distance in pixels between landmarks `i` and `j`.
pub fn pixel_distance(
    landmarks: &LandmarkSet,
    i: usize,
    j: usize,
    height: u32,
    width: u32,
) -> Result<f64, GeometryError> {
    let (x1, y1) = landmark(landmarks, i)?.to_pixel(height, width);
    let (x2, y2) = landmark(landmarks, j)?.to_pixel(height, width);
    Ok(((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt())
}

/// Compute mouth opening, mean eye opening and head tilt for one face.
///
/// Never fails: any error yields [`ExpressionAnalysis::Degraded`] with zeros.
pub fn analyze_expressions(landmarks: &LandmarkSet, height: u32, width: u32) -> ExpressionAnalysis {
    match measure(landmarks, height, width) {
        Ok(metrics) => ExpressionAnalysis::Measured(metrics),
        Err(reason) => {
            tracing::warn!(
                error = %reason,
                landmarks = landmarks.len(),
                "expression metrics unavailable; reporting zeros"
            );
            ExpressionAnalysis::Degraded {
                metrics: ExpressionMetrics::default(),
                reason,
            }
        }
    }
}

fn measure(landmarks: &LandmarkSet, height: u32, width: u32) -> Result<ExpressionMetrics, GeometryError> {
    let mouth = pixel_distance(landmarks, UPPER_INNER_LIP, LOWER_INNER_LIP, height, width)?;

    let right_eye = pixel_distance(landmarks, RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM, height, width)?;
    let left_eye = pixel_distance(landmarks, LEFT_EYE_TOP, LEFT_EYE_BOTTOM, height, width)?;
    let eyes = (right_eye + left_eye) / 2.0;

    let right_corner_y = landmark(landmarks, RIGHT_EYE_CORNER)?.y as f64;
    let left_corner_y = landmark(landmarks, LEFT_EYE_CORNER)?.y as f64;
    let tilt = (right_corner_y - left_corner_y) * height as f64;

    Ok(ExpressionMetrics {
        mouth_opening_px: finite_round2(mouth, "mouth_opening_px")?,
        eye_opening_px: finite_round2(eyes, "eye_opening_px")?,
        head_tilt_px: finite_round2(tilt, "head_tilt_px")?,
    })
}

fn landmark(landmarks: &LandmarkSet, index: usize) -> Result<&crate::types::NormalizedLandmark, GeometryError> {
    landmarks.get(index).ok_or(GeometryError::IndexOutOfRange {
        index,
        len: landmarks.len(),
    })
}

fn finite_round2(value: f64, metric: &'static str) -> Result<f64, GeometryError> {
    if !value.is_finite() {
        return Err(GeometryError::NonFinite { metric });
    }
    Ok((value * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NormalizedLandmark, TOTAL_LANDMARKS};

    fn flat_face() -> Vec<NormalizedLandmark> {
        vec![NormalizedLandmark::new(0.5, 0.5, 0.0); TOTAL_LANDMARKS]
    }

    #[test]
    fn test_pixel_distance_symmetric() {
        let mut pts = flat_face();
        pts[3] = NormalizedLandmark::new(0.1, 0.9, 0.0);
        pts[7] = NormalizedLandmark::new(0.75, 0.2, 0.3);
        let set = LandmarkSet::new(pts);

        let a = pixel_distance(&set, 3, 7, 480, 640).unwrap();
        let b = pixel_distance(&set, 7, 3, 480, 640).unwrap();
        assert_eq!(a, b);
        assert!(a > 0.0);
    }

    #[test]
    fn test_pixel_distance_scales_axes_independently() {
        let mut pts = flat_face();
        pts[0] = NormalizedLandmark::new(0.0, 0.0, 0.0);
        pts[1] = NormalizedLandmark::new(0.5, 0.5, 0.0);
        let set = LandmarkSet::new(pts);
        // width 60 → dx 30, height 80 → dy 40
        let d = pixel_distance(&set, 0, 1, 80, 60).unwrap();
        assert!((d - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_distance_out_of_range() {
        let set = LandmarkSet::new(vec![NormalizedLandmark::new(0.0, 0.0, 0.0); 10]);
        assert_eq!(
            pixel_distance(&set, 2, 400, 100, 100),
            Err(GeometryError::IndexOutOfRange { index: 400, len: 10 })
        );
    }

    #[test]
    fn test_mouth_opening() {
        let mut pts = flat_face();
        pts[UPPER_INNER_LIP] = NormalizedLandmark::new(0.5, 0.40, 0.0);
        pts[LOWER_INNER_LIP] = NormalizedLandmark::new(0.5, 0.45, 0.0);
        let set = LandmarkSet::new(pts);

        // 100 wide, 200 tall
        let analysis = analyze_expressions(&set, 200, 100);
        assert!(!analysis.is_degraded());
        assert_eq!(analysis.metrics().mouth_opening_px, 10.0);
    }

    #[test]
    fn test_closed_right_eye_is_zero() {
        let mut pts = flat_face();
        pts[RIGHT_EYE_TOP] = NormalizedLandmark::new(0.3, 0.4, 0.0);
        pts[RIGHT_EYE_BOTTOM] = NormalizedLandmark::new(0.3, 0.4, 0.0);
        let set = LandmarkSet::new(pts);
        assert_eq!(pixel_distance(&set, RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM, 300, 300).unwrap(), 0.0);
    }

    #[test]
    fn test_eye_opening_is_mean_of_both_eyes() {
        let mut pts = flat_face();
        pts[RIGHT_EYE_TOP] = NormalizedLandmark::new(0.3, 0.40, 0.0);
        pts[RIGHT_EYE_BOTTOM] = NormalizedLandmark::new(0.3, 0.44, 0.0);
        pts[LEFT_EYE_TOP] = NormalizedLandmark::new(0.7, 0.40, 0.0);
        pts[LEFT_EYE_BOTTOM] = NormalizedLandmark::new(0.7, 0.42, 0.0);
        let set = LandmarkSet::new(pts);

        // 0.04 * 100 = 4, 0.02 * 100 = 2 → mean 3
        let m = analyze_expressions(&set, 100, 100).metrics();
        assert!((m.eye_opening_px - 3.0).abs() < 0.011, "{}", m.eye_opening_px);
    }

    #[test]
    fn test_head_tilt_sign() {
        let mut pts = flat_face();
        pts[RIGHT_EYE_CORNER] = NormalizedLandmark::new(0.4, 0.52, 0.0);
        pts[LEFT_EYE_CORNER] = NormalizedLandmark::new(0.6, 0.48, 0.0);
        let set = LandmarkSet::new(pts);

        let m = analyze_expressions(&set, 500, 500).metrics();
        // right corner lower in image → positive
        assert!((m.head_tilt_px - 20.0).abs() < 0.011, "{}", m.head_tilt_px);

        let mut pts = flat_face();
        pts[RIGHT_EYE_CORNER] = NormalizedLandmark::new(0.4, 0.48, 0.0);
        pts[LEFT_EYE_CORNER] = NormalizedLandmark::new(0.6, 0.52, 0.0);
        let m = analyze_expressions(&LandmarkSet::new(pts), 500, 500).metrics();
        assert!(m.head_tilt_px < -19.9);
    }

    #[test]
    fn test_metrics_rounded_to_two_decimals() {
        let mut pts = flat_face();
        pts[UPPER_INNER_LIP] = NormalizedLandmark::new(0.0, 0.0, 0.0);
        pts[LOWER_INNER_LIP] = NormalizedLandmark::new(1.0, 1.0, 0.0);
        let set = LandmarkSet::new(pts);
        // sqrt(2) = 1.41421...
        let m = analyze_expressions(&set, 1, 1).metrics();
        assert_eq!(m.mouth_opening_px, 1.41);
    }

    #[test]
    fn test_short_set_degrades_to_zero() {
        let set = LandmarkSet::new(vec![NormalizedLandmark::new(0.5, 0.5, 0.0); 100]);
        let analysis = analyze_expressions(&set, 480, 640);
        assert!(analysis.is_degraded());
        assert_eq!(analysis.metrics(), ExpressionMetrics::default());
        match analysis {
            ExpressionAnalysis::Degraded { reason, .. } => {
                assert!(matches!(reason, GeometryError::IndexOutOfRange { index: 159, len: 100 }));
            }
            ExpressionAnalysis::Measured(_) => panic!("expected degraded analysis"),
        }
    }

    #[test]
    fn test_empty_set_degrades_to_zero() {
        let analysis = analyze_expressions(&LandmarkSet::new(Vec::new()), 480, 640);
        assert!(analysis.is_degraded());
        assert_eq!(analysis.metrics(), ExpressionMetrics::default());
    }

    #[test]
    fn test_nan_landmark_degrades_to_zero() {
        let mut pts = flat_face();
        pts[UPPER_INNER_LIP] = NormalizedLandmark::new(f32::NAN, 0.5, 0.0);
        let analysis = analyze_expressions(&LandmarkSet::new(pts), 480, 640);
        assert_eq!(
            analysis,
            ExpressionAnalysis::Degraded {
                metrics: ExpressionMetrics::default(),
                reason: GeometryError::NonFinite { metric: "mouth_opening_px" },
            }
        );
    }
}
