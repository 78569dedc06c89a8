//! Face detection capability and its cascade-based implementation.
//!
//! The pipeline only depends on [`FaceDetector`]; [`CascadeDetector`] backs
//! it with the SeetaFace funnel-structured cascade from `rustface`.

use crate::types::DetectionRect;
use image::GrayImage;
use std::path::Path;
use thiserror::Error;

// --- Cascade tuning ---
const CASCADE_MIN_FACE_SIZE: u32 = 20;
const CASCADE_SCORE_THRESHOLD: f64 = 2.0;
const CASCADE_PYRAMID_SCALE: f32 = 0.8;
const CASCADE_WINDOW_STEP: u32 = 4;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} (run `facecam provision` first)")]
    ModelNotFound(String),
    #[error("detector unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can find faces in a grayscale image.
///
/// Returned rectangles are in the coordinate space of `image`.
pub trait FaceDetector {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<DetectionRect>, DetectorError>;
}

/// Cascade classifier face detector.
pub struct CascadeDetector {
    inner: Box<dyn rustface::Detector>,
}

impl CascadeDetector {
    /// Load the cascade model from a provisioned local path.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }
        let path = model_path
            .to_str()
            .ok_or_else(|| DetectorError::Unavailable(format!("non UTF-8 model path: {model_path:?}")))?;

        let mut inner = rustface::create_detector(path)
            .map_err(|e| DetectorError::Unavailable(format!("{path}: {e}")))?;
        inner.set_min_face_size(CASCADE_MIN_FACE_SIZE);
        inner.set_score_thresh(CASCADE_SCORE_THRESHOLD);
        inner.set_pyramid_scale_factor(CASCADE_PYRAMID_SCALE);
        inner.set_slide_window_step(CASCADE_WINDOW_STEP, CASCADE_WINDOW_STEP);

        tracing::info!(path, "loaded cascade model");
        Ok(Self { inner })
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<DetectionRect>, DetectorError> {
        let (width, height) = image.dimensions();
        // The cascade rejects images smaller than its scan window.
        if width < CASCADE_MIN_FACE_SIZE || height < CASCADE_MIN_FACE_SIZE {
            return Ok(Vec::new());
        }

        let faces = self
            .inner
            .detect(&rustface::ImageData::new(image.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                DetectionRect {
                    x: f64::from(bbox.x()),
                    y: f64::from(bbox.y()),
                    width: f64::from(bbox.width()),
                    height: f64::from(bbox.height()),
                    score: face.score(),
                }
            })
            .collect())
    }
}
