//! Detection facade: run the landmark model, draw the result, measure it.

use crate::frame::{self, BgrImage};
use crate::geometry;
use crate::model::{LandmarkModel, ModelError};
use crate::render;
use crate::types::{DetectionResult, DrawStyle, LandmarkSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Output of [`FaceMeshDetector::detect`].
#[derive(Debug, Clone)]
pub struct Detection {
    /// Input with landmarks drawn on it, or an unmodified copy when no face was found.
    pub image: BgrImage,
    /// Landmarks of the first detected face.
    pub landmarks: Option<LandmarkSet>,
    pub result: DetectionResult,
}

/// Face-mesh detector owning a model handle.
///
/// The handle is released when the detector is dropped or [`released`](Self::release).
pub struct FaceMeshDetector<M: LandmarkModel> {
    model: M,
}

impl<M: LandmarkModel> FaceMeshDetector<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Detect face landmarks in `image` and render them in `style`.
    ///
    /// Only the first face the model reports is drawn and measured.
    pub fn detect(&mut self, image: &BgrImage, style: DrawStyle) -> Result<Detection, DetectError> {
        let rgb = frame::to_display(image);
        let faces = self.model.process(&rgb)?;

        let Some(face) = faces.first() else {
            tracing::debug!(width = image.width(), height = image.height(), "no face detected");
            return Ok(Detection {
                image: image.clone(),
                landmarks: None,
                result: DetectionResult::not_detected(),
            });
        };

        if faces.len() > 1 {
            tracing::debug!(faces = faces.len(), "multiple faces; using the first");
        }

        let rendered = render::render(image, face, style);

        let analysis = geometry::analyze_expressions(face, image.height(), image.width());
        let expressions = analysis.metrics();

        tracing::info!(
            faces = faces.len(),
            landmarks = face.len(),
            %style,
            mouth_px = expressions.mouth_opening_px,
            eyes_px = expressions.eye_opening_px,
            tilt_px = expressions.head_tilt_px,
            degraded = analysis.is_degraded(),
            "face detected"
        );

        Ok(Detection {
            image: rendered,
            landmarks: Some(face.clone()),
            result: DetectionResult {
                faces_detected: faces.len(),
                total_landmarks: face.len(),
                success: true,
                expressions: Some(expressions),
            },
        })
    }

    /// Release the model handle. The detector cannot be used afterwards.
    pub fn release(self) {
        drop(self.model);
        tracing::debug!("face mesh detector released");
    }
}
