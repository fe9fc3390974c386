//! Face-landmark model via ONNX Runtime.
//!
//! Runs a MediaPipe-style `face_landmark` network (192×192 input, 468 or 478
//! points plus a face-presence score) over the whole image, letterboxed into
//! the square model input.

use crate::config::{FaceMeshConfig, TensorLayout};
use crate::model::{LandmarkModel, ModelError};
use crate::types::{LandmarkSet, NormalizedLandmark, MESH_LANDMARKS};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

const PAD_VALUE: f32 = 0.0;

/// Metadata for coordinate de-mapping after letterbox resize.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Face-mesh model handle. The session is released on drop.
pub struct OrtFaceMesh {
    session: Session,
    output_names: Vec<String>,
    input_size: usize,
    layout: TensorLayout,
    refine_landmarks: bool,
    min_detection_confidence: f32,
}

impl OrtFaceMesh {
    /// Load the face-landmark ONNX model named by `config.model_path`.
    pub fn load(config: &FaceMeshConfig) -> Result<Self, ModelError> {
        config.validate()?;

        let model_path = config.model_path.to_string_lossy().into_owned();
        if !config.model_path.exists() {
            return Err(ModelError::ModelNotFound(model_path));
        }

        let session = Session::builder()?
            .with_intra_threads(config.intra_threads)?
            .commit_from_file(&config.model_path)?;

        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            layout = ?config.tensor_layout,
            "loaded face mesh model"
        );

        if output_names.is_empty() {
            return Err(ModelError::InferenceFailed("model has no outputs".into()));
        }

        if config.max_num_faces > 1 {
            tracing::warn!(
                max_num_faces = config.max_num_faces,
                "whole-image landmark model reports at most one face"
            );
        }
        tracing::debug!(
            min_tracking_confidence = config.min_tracking_confidence,
            "tracking confidence unused for single images"
        );

        Ok(Self {
            session,
            output_names,
            input_size: config.input_size,
            layout: config.tensor_layout,
            refine_landmarks: config.refine_landmarks,
            min_detection_confidence: config.min_detection_confidence,
        })
    }
}

impl LandmarkModel for OrtFaceMesh {
    fn process(&mut self, rgb: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        if rgb.width() == 0 || rgb.height() == 0 {
            return Ok(Vec::new());
        }

        let (input, letterbox) = preprocess(rgb, self.input_size, self.layout);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let tensors: Vec<Option<&[f32]>> = (0..self.output_names.len())
            .map(|i| outputs[i].try_extract_tensor::<f32>().ok().map(|(_, data)| data))
            .collect();
        let lengths: Vec<usize> = tensors.iter().map(|t| t.map_or(0, |d| d.len())).collect();

        let (landmark_idx, presence_idx) = select_outputs(&lengths).ok_or_else(|| {
            ModelError::InferenceFailed(format!(
                "no landmark tensor among outputs {:?} (lengths {lengths:?})",
                self.output_names
            ))
        })?;

        if let Some(idx) = presence_idx {
            let logit = tensors[idx].and_then(|d| d.first().copied()).unwrap_or(0.0);
            let presence = sigmoid(logit);
            tracing::debug!(presence, threshold = self.min_detection_confidence, "face presence");
            if presence < self.min_detection_confidence {
                return Ok(Vec::new());
            }
        }

        let raw = tensors[landmark_idx].unwrap_or(&[]);
        let keep = if self.refine_landmarks { usize::MAX } else { MESH_LANDMARKS };
        let landmarks = decode_landmarks(raw, &letterbox, rgb.width(), rgb.height(), keep);

        Ok(vec![landmarks])
    }
}

impl Drop for OrtFaceMesh {
    fn drop(&mut self) {
        tracing::info!("face mesh session released");
    }
}

/// Letterbox an RGB image into a square float tensor.
fn preprocess(rgb: &RgbImage, input_size: usize, layout: TensorLayout) -> (Array4<f32>, LetterboxInfo) {
    let (width, height) = (rgb.width() as f32, rgb.height() as f32);
    let scale = (input_size as f32 / width).min(input_size as f32 / height);

    let new_w = ((width * scale).round() as usize).clamp(1, input_size);
    let new_h = ((height * scale).round() as usize).clamp(1, input_size);
    let pad_x = ((input_size - new_w) / 2) as f32;
    let pad_y = ((input_size - new_h) / 2) as f32;
    let letterbox = LetterboxInfo { scale, pad_x, pad_y };

    let resized = image::imageops::resize(rgb, new_w as u32, new_h as u32, FilterType::Triangle);

    let shape = match layout {
        TensorLayout::Nchw => (1, 3, input_size, input_size),
        TensorLayout::Nhwc => (1, input_size, input_size, 3),
    };
    let mut tensor = Array4::<f32>::from_elem(shape, PAD_VALUE);

    let (ox, oy) = (pad_x as usize, pad_y as usize);
    for (x, y, px) in resized.enumerate_pixels() {
        let (tx, ty) = (ox + x as usize, oy + y as usize);
        for c in 0..3 {
            let v = px.0[c] as f32 / 255.0;
            match layout {
                TensorLayout::Nchw => tensor[[0, c, ty, tx]] = v * 2.0 - 1.0,
                TensorLayout::Nhwc => tensor[[0, ty, tx, c]] = v,
            }
        }
    }

    (tensor, letterbox)
}

/// Pick the landmark tensor (largest output holding at least 468 xyz
/// triples) and the face-presence tensor (first single-value output).
fn select_outputs(lengths: &[usize]) -> Option<(usize, Option<usize>)> {
    let landmarks = lengths
        .iter()
        .enumerate()
        .filter(|&(_, &len)| len >= MESH_LANDMARKS * 3 && len % 3 == 0)
        .max_by_key(|&(_, &len)| len)
        .map(|(i, _)| i)?;
    let presence = lengths.iter().position(|&len| len == 1);
    Some((landmarks, presence))
}

/// Map model-space xyz triples back to landmarks normalized to the source image.
fn decode_landmarks(raw: &[f32], letterbox: &LetterboxInfo, width: u32, height: u32, keep: usize) -> LandmarkSet {
    let (w, h) = (width as f32, height as f32);
    let points = raw
        .chunks_exact(3)
        .take(keep)
        .map(|p| {
            let x = (p[0] - letterbox.pad_x) / letterbox.scale;
            let y = (p[1] - letterbox.pad_y) / letterbox.scale;
            let z = p[2] / letterbox.scale;
            NormalizedLandmark::new(x / w, y / h, z / w)
        })
        .collect();
    LandmarkSet::new(points)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::types::TOTAL_LANDMARKS;
    use image::Rgb;

    #[test]
    fn test_preprocess_nchw_shape_and_padding() {
        let rgb = RgbImage::from_pixel(400, 200, Rgb([255, 255, 255]));
        let (tensor, lb) = preprocess(&rgb, 192, TensorLayout::Nchw);
        assert_eq!(tensor.shape(), &[1, 3, 192, 192]);

        // 400x200 → 192x96, padded 48 rows above and below
        assert!((lb.scale - 0.48).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 48.0);

        assert_eq!(tensor[[0, 0, 10, 96]], PAD_VALUE);
        assert!((tensor[[0, 0, 96, 96]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_nhwc_range() {
        let rgb = RgbImage::from_pixel(192, 192, Rgb([0, 51, 255]));
        let (tensor, lb) = preprocess(&rgb, 192, TensorLayout::Nhwc);
        assert_eq!(tensor.shape(), &[1, 192, 192, 3]);
        assert_eq!(lb, LetterboxInfo { scale: 1.0, pad_x: 0.0, pad_y: 0.0 });
        assert!((tensor[[0, 5, 5, 0]] - 0.0).abs() < 1e-6);
        assert!((tensor[[0, 5, 5, 1]] - 0.2).abs() < 1e-6);
        assert!((tensor[[0, 5, 5, 2]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_coordinate_roundtrip() {
        let (width, height) = (320u32, 240u32);
        let rgb = RgbImage::new(width, height);
        let (_, lb) = preprocess(&rgb, 192, TensorLayout::Nchw);

        // A point at (100, 50) in the source, as the model would report it
        let mx = 100.0 * lb.scale + lb.pad_x;
        let my = 50.0 * lb.scale + lb.pad_y;
        let set = decode_landmarks(&[mx, my, 0.0], &lb, width, height, usize::MAX);

        let lm = set.get(0).unwrap();
        assert!((lm.x * width as f32 - 100.0).abs() < 0.1, "x: {}", lm.x);
        assert!((lm.y * height as f32 - 50.0).abs() < 0.1, "y: {}", lm.y);
    }

    #[test]
    fn test_decode_truncates_irises() {
        let raw = vec![96.0f32; TOTAL_LANDMARKS * 3];
        let lb = LetterboxInfo { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };
        assert_eq!(decode_landmarks(&raw, &lb, 192, 192, usize::MAX).len(), TOTAL_LANDMARKS);
        assert_eq!(decode_landmarks(&raw, &lb, 192, 192, MESH_LANDMARKS).len(), MESH_LANDMARKS);
    }

    #[test]
    fn test_select_outputs() {
        // attention model: landmarks, presence, separate lip/eye refinements
        assert_eq!(select_outputs(&[1434, 1, 160, 142]), Some((0, Some(1))));
        // presence first, mesh-only model
        assert_eq!(select_outputs(&[1, 1404]), Some((1, Some(0))));
        // no presence output
        assert_eq!(select_outputs(&[1404]), Some((0, None)));
        // nothing large enough
        assert_eq!(select_outputs(&[1, 160]), None);
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_load_rejects_zero_input_size() {
        let config = FaceMeshConfig {
            input_size: 0,
            ..FaceMeshConfig::default()
        };
        assert!(matches!(
            OrtFaceMesh::load(&config),
            Err(ModelError::Config(ConfigError::Invalid { field: "input_size", .. }))
        ));
    }

    #[test]
    fn test_load_missing_model() {
        let config = FaceMeshConfig {
            model_path: "/nonexistent/face_landmark.onnx".into(),
            ..FaceMeshConfig::default()
        };
        assert!(matches!(OrtFaceMesh::load(&config), Err(ModelError::ModelNotFound(_))));
    }
}
