//! The face-landmark inference capability consumed by the detector.

use crate::config::ConfigError;
use crate::types::LandmarkSet;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file not found: {0} (set FACEMESH_MODEL_PATH or model_path in the config)")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A face-mesh landmark model.
///
/// `process` returns one landmark set per detected face, normalized to the
/// width and height of `rgb`. An empty vector means no face was found.
pub trait LandmarkModel {
    fn process(&mut self, rgb: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError>;
}

impl<M: LandmarkModel + ?Sized> LandmarkModel for Box<M> {
    fn process(&mut self, rgb: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        (**self).process(rgb)
    }
}
