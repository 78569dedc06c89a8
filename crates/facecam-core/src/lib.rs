//! facecam-core — Face overlay geometry for camera previews.
//!
//! Downsizes each frame to a fixed working resolution, rotates it to match
//! the screen orientation, runs a face detector on it, and maps the results
//! back onto the full-resolution frame for drawing.

pub mod detector;
pub mod geometry;
pub mod overlay;
pub mod pipeline;
pub mod provision;
pub mod types;

pub use detector::{CascadeDetector, DetectorError, FaceDetector};
pub use geometry::{
    RemapOptions, MAX_ASPECT_RATIO, ROTATION_180_VERTICAL_FIX_PX, TARGET_SHORT_SIDE,
};
pub use pipeline::{FramePipeline, FrameReport, PipelineError, PipelineOptions};
pub use provision::ModelStore;
pub use types::{
    DetectionRect, FrameSize, GeometryError, MarkerMode, Point, RemappedFace, RotationBucket,
};
