//! facecam-hw — V4L2 camera capture.
//!
//! Delivers each captured frame as a colour image for display plus an
//! intensity image for detection.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameStream, PixelFormat};
pub use frame::Frame;
