//! facemesh-core — Face-mesh landmark detection, rendering and measurement.
//!
//! Converts uploaded images into a BGR processing buffer, runs a face-landmark
//! model via ONNX Runtime, draws points, mesh or contours back onto the image
//! and derives simple pixel-distance expression metrics.

pub mod config;
pub mod connections;
pub mod detector;
pub mod frame;
pub mod geometry;
pub mod model;
pub mod ort_model;
pub mod render;
pub mod types;

pub use config::{ConfigError, FaceMeshConfig, TensorLayout};
pub use detector::{DetectError, Detection, FaceMeshDetector};
pub use frame::{resize_to_max_width, to_display, to_internal, BgrImage, FrameError};
pub use geometry::{analyze_expressions, pixel_distance, ExpressionAnalysis, GeometryError};
pub use model::{LandmarkModel, ModelError};
pub use ort_model::OrtFaceMesh;
pub use types::{
    DetectionResult, DrawStyle, ExpressionMetrics, LandmarkSet, NormalizedLandmark, TiltDirection,
    TOTAL_LANDMARKS,
};
