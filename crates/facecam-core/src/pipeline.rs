//! Per-frame processing: scale → compensate → detect → remap → draw.

use crate::detector::{DetectorError, FaceDetector};
use crate::geometry::{self, RemapOptions, ScaledFrame};
use crate::overlay;
use crate::types::{FrameSize, GeometryError, MarkerMode, RemappedFace, RotationBucket};
use image::{GrayImage, RgbImage};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("colour frame {color_w}x{color_h} does not match intensity frame {gray_w}x{gray_h}")]
    FrameMismatch {
        color_w: u32,
        color_h: u32,
        gray_w: u32,
        gray_h: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Resize to the working resolution before detection. When off the
    /// intensity frame is used as-is with ratio 1.0.
    pub downscale: bool,
    pub remap: RemapOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            downscale: true,
            remap: RemapOptions::default(),
        }
    }
}

impl PipelineOptions {
    pub fn with_marker(mut self, marker: MarkerMode) -> Self {
        self.remap.marker = marker;
        self
    }
}

/// What one frame produced.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: FrameSize,
    pub working: FrameSize,
    pub ratio: f64,
    pub rotation: RotationBucket,
    pub faces: Vec<RemappedFace>,
}

/// Face overlay pipeline.
///
/// Holds no per-frame state: each call to [`process`](Self::process) is
/// independent, and the rotation bucket is supplied with every frame.
pub struct FramePipeline {
    detector: Option<Box<dyn FaceDetector>>,
    options: PipelineOptions,
}

impl FramePipeline {
    pub fn new(detector: Box<dyn FaceDetector>, options: PipelineOptions) -> Self {
        Self {
            detector: Some(detector),
            options,
        }
    }

    /// A pipeline without a detector: frames pass through untouched.
    pub fn passthrough(options: PipelineOptions) -> Self {
        Self {
            detector: None,
            options,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.detector.is_none()
    }

    /// Detect faces on `gray` and draw them onto `color`.
    ///
    /// `color` is only written once every fallible step has succeeded, so on
    /// error it is left exactly as it was passed in.
    pub fn process(
        &mut self,
        color: &mut RgbImage,
        gray: &GrayImage,
        rotation: RotationBucket,
    ) -> Result<FrameReport, PipelineError> {
        let frame = FrameSize::new(color.width(), color.height());
        if frame.is_empty() {
            return Err(GeometryError::InvalidFrame {
                width: frame.width,
                height: frame.height,
            }
            .into());
        }
        if gray.dimensions() != color.dimensions() {
            return Err(PipelineError::FrameMismatch {
                color_w: color.width(),
                color_h: color.height(),
                gray_w: gray.width(),
                gray_h: gray.height(),
            });
        }

        let Some(detector) = self.detector.as_mut() else {
            return Ok(FrameReport {
                frame,
                working: frame,
                ratio: 1.0,
                rotation,
                faces: Vec::new(),
            });
        };

        let scaled = if self.options.downscale {
            geometry::scale_down(gray)?
        } else {
            ScaledFrame::identity(gray.clone())
        };
        let working = geometry::compensate(&scaled.image, rotation);
        let rects = detector.detect(&working)?;

        let faces: Vec<RemappedFace> = rects
            .iter()
            .map(|rect| geometry::remap(rect, scaled.ratio, rotation, frame, &self.options.remap))
            .collect();

        for face in &faces {
            overlay::draw_face(color, face);
        }

        tracing::debug!(
            rotation = %rotation,
            ratio = scaled.ratio,
            working_w = working.width(),
            working_h = working.height(),
            faces = faces.len(),
            "frame processed"
        );

        Ok(FrameReport {
            frame,
            working: FrameSize::new(working.width(), working.height()),
            ratio: scaled.ratio,
            rotation,
            faces,
        })
    }

    /// Like [`process`](Self::process) but never fails: a frame that cannot be
    /// processed is logged and handed back without overlays so the display
    /// keeps running.
    pub fn annotate(
        &mut self,
        color: &mut RgbImage,
        gray: &GrayImage,
        rotation: RotationBucket,
    ) -> Option<FrameReport> {
        match self.process(color, gray, rotation) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "frame skipped, showing without overlay");
                None
            }
        }
    }
}
