//! End-to-end pipeline: decode → convert → resize → detect → display.
//!
//! Uses a stub landmark model so no ONNX file is required.

use facemesh_core::{
    resize_to_max_width, to_display, to_internal, DrawStyle, FaceMeshDetector, LandmarkModel, LandmarkSet,
    ModelError, NormalizedLandmark, TiltDirection, TOTAL_LANDMARKS,
};
use image::{DynamicImage, Rgba, RgbaImage, RgbImage};

/// Reports one synthetic face whose geometry is fixed in normalized space.
struct SyntheticFace;

impl LandmarkModel for SyntheticFace {
    fn process(&mut self, _rgb: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        let mut pts: Vec<NormalizedLandmark> = (0..TOTAL_LANDMARKS)
            .map(|i| {
                let t = i as f32 / TOTAL_LANDMARKS as f32 * std::f32::consts::TAU;
                NormalizedLandmark::new(0.5 + 0.3 * t.cos(), 0.5 + 0.35 * t.sin(), 0.0)
            })
            .collect();
        pts[13] = NormalizedLandmark::new(0.5, 0.60, 0.0);
        pts[14] = NormalizedLandmark::new(0.5, 0.65, 0.0);
        pts[159] = NormalizedLandmark::new(0.35, 0.40, 0.0);
        pts[145] = NormalizedLandmark::new(0.35, 0.42, 0.0);
        pts[386] = NormalizedLandmark::new(0.65, 0.40, 0.0);
        pts[374] = NormalizedLandmark::new(0.65, 0.42, 0.0);
        pts[133] = NormalizedLandmark::new(0.42, 0.45, 0.0);
        pts[362] = NormalizedLandmark::new(0.58, 0.43, 0.0);
        Ok(vec![LandmarkSet::new(pts)])
    }
}

struct NoFace;

impl LandmarkModel for NoFace {
    fn process(&mut self, _rgb: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        Ok(Vec::new())
    }
}

fn upload(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 251) as u8, (y % 241) as u8, 90, 128])
    }))
}

#[test]
fn test_pipeline_with_face() {
    let bgr = resize_to_max_width(&to_internal(&upload(1600, 1200)), 800).unwrap();
    assert_eq!((bgr.width(), bgr.height()), (800, 600));

    let mut detector = FaceMeshDetector::new(SyntheticFace);
    for style in [DrawStyle::Points, DrawStyle::Mesh, DrawStyle::Contours] {
        let det = detector.detect(&bgr, style).unwrap();
        assert!(det.result.success);
        assert_eq!(det.result.faces_detected, 1);
        assert_eq!(det.result.total_landmarks, TOTAL_LANDMARKS);
        assert_ne!(det.image, bgr, "{style} left the image untouched");

        let ex = det.result.expressions.unwrap();
        // 0.05 * 600
        assert!((ex.mouth_opening_px - 30.0).abs() < 0.02, "{}", ex.mouth_opening_px);
        // 0.02 * 600 for both eyes
        assert!((ex.eye_opening_px - 12.0).abs() < 0.02, "{}", ex.eye_opening_px);
        // (0.45 - 0.43) * 600 = 12 → right eye corner lower
        assert!((ex.head_tilt_px - 12.0).abs() < 0.02, "{}", ex.head_tilt_px);
        assert_eq!(ex.tilt_direction(), TiltDirection::Left);

        let shown = to_display(&det.image);
        assert_eq!(shown.dimensions(), (800, 600));
    }
    detector.release();
}

#[test]
fn test_pipeline_without_face() {
    let bgr = to_internal(&upload(320, 240));
    let mut detector = FaceMeshDetector::new(NoFace);
    let det = detector.detect(&bgr, DrawStyle::Contours).unwrap();

    assert!(!det.result.success);
    assert_eq!(det.result.total_landmarks, 0);
    assert!(det.result.expressions.is_none());
    assert!(det.landmarks.is_none());
    assert_eq!(det.image, bgr);

    let json = serde_json::to_string(&det.result).unwrap();
    assert_eq!(json, r#"{"faces_detected":0,"total_landmarks":0,"success":false}"#);
}

#[test]
fn test_boxed_model() {
    let model: Box<dyn LandmarkModel> = Box::new(SyntheticFace);
    let mut detector = FaceMeshDetector::new(model);
    let det = detector.detect(&to_internal(&upload(200, 200)), DrawStyle::Points).unwrap();
    assert!(det.result.success);
}
