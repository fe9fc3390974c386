use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Landmarks per face returned by the mesh model with iris refinement.
pub const TOTAL_LANDMARKS: usize = 478;

/// Landmarks per face without iris refinement.
pub const MESH_LANDMARKS: usize = 468;

/// Head tilt below this magnitude (pixels) counts as centered.
pub const TILT_DEAD_ZONE_PX: f64 = 2.0;

/// A single face-mesh landmark, normalized to the image it was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    /// Horizontal position in [0, 1] relative to image width.
    pub x: f32,
    /// Vertical position in [0, 1] relative to image height.
    pub y: f32,
    /// Relative depth. Carried through but not used for any metric.
    pub z: f32,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Position in pixel space for an image of the given size.
    pub fn to_pixel(&self, height: u32, width: u32) -> (f64, f64) {
        (self.x as f64 * width as f64, self.y as f64 * height as f64)
    }
}

/// Ordered landmarks for one face.
///
/// Index order is fixed by the model topology (e.g. 13/14 are the inner
/// lips) and must never be reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<NormalizedLandmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<NormalizedLandmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NormalizedLandmark> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[NormalizedLandmark] {
        &self.points
    }

    /// Keep only the first `len` landmarks.
    pub fn truncate(&mut self, len: usize) {
        self.points.truncate(len);
    }
}

/// Pixel-space expression metrics derived from a landmark set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionMetrics {
    /// Distance between the inner lips.
    pub mouth_opening_px: f64,
    /// Mean eyelid gap of both eyes.
    pub eye_opening_px: f64,
    /// Signed vertical offset between the eye corners. Positive when the
    /// right-eye corner sits lower in image coordinates.
    pub head_tilt_px: f64,
}

impl ExpressionMetrics {
    pub fn tilt_direction(&self) -> TiltDirection {
        TiltDirection::from_tilt_px(self.head_tilt_px)
    }
}

/// Interpretation of `head_tilt_px` for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiltDirection {
    Left,
    Right,
    Centered,
}

impl TiltDirection {
    pub fn from_tilt_px(tilt_px: f64) -> Self {
        if tilt_px > TILT_DEAD_ZONE_PX {
            TiltDirection::Left
        } else if tilt_px < -TILT_DEAD_ZONE_PX {
            TiltDirection::Right
        } else {
            TiltDirection::Centered
        }
    }
}

impl fmt::Display for TiltDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TiltDirection::Left => "left",
            TiltDirection::Right => "right",
            TiltDirection::Centered => "centered",
        };
        f.write_str(s)
    }
}

/// How detected landmarks are drawn onto the output image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStyle {
    /// A filled circle per landmark, no connections.
    #[default]
    Points,
    /// The full triangulated tessellation, no point markers.
    Mesh,
    /// Eyes, eyebrows, lips and face oval only.
    Contours,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown draw style: {0} (expected points, mesh or contours)")]
pub struct ParseDrawStyleError(String);

impl FromStr for DrawStyle {
    type Err = ParseDrawStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "points" => Ok(DrawStyle::Points),
            "mesh" => Ok(DrawStyle::Mesh),
            "contours" => Ok(DrawStyle::Contours),
            _ => Err(ParseDrawStyleError(s.to_string())),
        }
    }
}

impl fmt::Display for DrawStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DrawStyle::Points => "points",
            DrawStyle::Mesh => "mesh",
            DrawStyle::Contours => "contours",
        };
        f.write_str(s)
    }
}

/// Summary of one detection call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub faces_detected: usize,
    /// Landmarks of the face that was used (0 when no face was found).
    pub total_landmarks: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expressions: Option<ExpressionMetrics>,
}

impl DetectionResult {
    /// Result for an image in which no face was found.
    pub fn not_detected() -> Self {
        Self::default()
    }

    /// Share of the full refined topology that was returned, in percent.
    pub fn landmark_coverage_pct(&self) -> f64 {
        self.total_landmarks as f64 / TOTAL_LANDMARKS as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tilt_dead_zone() {
        assert_eq!(TiltDirection::from_tilt_px(0.0), TiltDirection::Centered);
        assert_eq!(TiltDirection::from_tilt_px(2.0), TiltDirection::Centered);
        assert_eq!(TiltDirection::from_tilt_px(-2.0), TiltDirection::Centered);
        assert_eq!(TiltDirection::from_tilt_px(2.01), TiltDirection::Left);
        assert_eq!(TiltDirection::from_tilt_px(-7.5), TiltDirection::Right);
    }

    #[test]
    fn test_draw_style_parse() {
        assert_eq!("points".parse::<DrawStyle>().unwrap(), DrawStyle::Points);
        assert_eq!("Mesh".parse::<DrawStyle>().unwrap(), DrawStyle::Mesh);
        assert_eq!(" CONTOURS ".parse::<DrawStyle>().unwrap(), DrawStyle::Contours);
        assert!("wireframe".parse::<DrawStyle>().is_err());
    }

    #[test]
    fn test_draw_style_display_roundtrip() {
        for style in [DrawStyle::Points, DrawStyle::Mesh, DrawStyle::Contours] {
            assert_eq!(style.to_string().parse::<DrawStyle>().unwrap(), style);
        }
    }

    #[test]
    fn test_not_detected_serializes_without_expressions() {
        let json = serde_json::to_value(DetectionResult::not_detected()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["faces_detected"], 0);
        assert_eq!(json["total_landmarks"], 0);
        assert!(json.get("expressions").is_none());
    }

    #[test]
    fn test_landmark_coverage() {
        let result = DetectionResult {
            faces_detected: 1,
            total_landmarks: TOTAL_LANDMARKS,
            success: true,
            expressions: Some(ExpressionMetrics::default()),
        };
        assert!((result.landmark_coverage_pct() - 100.0).abs() < 1e-9);
        assert_eq!(DetectionResult::not_detected().landmark_coverage_pct(), 0.0);
    }

    #[test]
    fn test_landmark_to_pixel() {
        let lm = NormalizedLandmark::new(0.5, 0.25, 0.0);
        let (x, y) = lm.to_pixel(200, 100);
        assert!((x - 50.0).abs() < 1e-6);
        assert!((y - 50.0).abs() < 1e-6);
    }
}
