use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{MESH_LANDMARKS, TOTAL_LANDMARKS};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Memory layout of the model's input tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, 3, H, W]`, values in [-1, 1].
    #[default]
    Nchw,
    /// `[1, H, W, 3]`, values in [0, 1].
    Nhwc,
}

impl std::str::FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nchw" => Ok(TensorLayout::Nchw),
            "nhwc" => Ok(TensorLayout::Nhwc),
            other => Err(format!("unknown tensor layout: {other}")),
        }
    }
}

/// Face-mesh model and pipeline settings.
///
/// Loaded from TOML (every key optional) and then overridden by
/// `FACEMESH_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceMeshConfig {
    /// Face-landmark ONNX model file.
    pub model_path: PathBuf,
    /// Maximum number of faces the model should report.
    pub max_num_faces: usize,
    /// Keep the ten iris landmarks (478 points instead of 468).
    pub refine_landmarks: bool,
    /// Minimum face-presence score for a face to be reported.
    pub min_detection_confidence: f32,
    /// Minimum score for re-using a face across frames. Single images never track.
    pub min_tracking_confidence: f32,
    /// Uploads wider than this are downscaled before detection.
    pub max_width: u32,
    /// Square model input size in pixels.
    pub input_size: usize,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: usize,
    pub tensor_layout: TensorLayout,
}

impl Default for FaceMeshConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/face_landmark.onnx"),
            max_num_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            max_width: 800,
            input_size: 192,
            intra_threads: 2,
            tensor_layout: TensorLayout::Nchw,
        }
    }
}

impl FaceMeshConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `FACEMESH_*` environment overrides on top of the current values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("FACEMESH_MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        self.max_num_faces = parse_or(&var, "FACEMESH_MAX_NUM_FACES", self.max_num_faces);
        self.refine_landmarks = var("FACEMESH_REFINE_LANDMARKS")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(self.refine_landmarks);
        self.min_detection_confidence = parse_or(
            &var,
            "FACEMESH_MIN_DETECTION_CONFIDENCE",
            self.min_detection_confidence,
        );
        self.min_tracking_confidence = parse_or(
            &var,
            "FACEMESH_MIN_TRACKING_CONFIDENCE",
            self.min_tracking_confidence,
        );
        self.max_width = parse_or(&var, "FACEMESH_MAX_WIDTH", self.max_width);
        self.input_size = parse_or(&var, "FACEMESH_INPUT_SIZE", self.input_size);
        self.intra_threads = parse_or(&var, "FACEMESH_INTRA_THREADS", self.intra_threads);
        self.tensor_layout = parse_or(&var, "FACEMESH_TENSOR_LAYOUT", self.tensor_layout);
        self
    }

    /// Reject values the model cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::Invalid {
                field: "input_size",
                reason: "must be at least 1".into(),
            });
        }
        for (field, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }

    /// Landmarks per face the model returns under this configuration.
    pub fn expected_landmarks(&self) -> usize {
        if self.refine_landmarks {
            TOTAL_LANDMARKS
        } else {
            MESH_LANDMARKS
        }
    }
}

/// `1/true/yes/on` or `0/false/no/off`, case-insensitive.
fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
