//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Highest `/dev/videoN` index scanned by [`Camera::list_devices`].
const MAX_VIDEO_NODES: u32 = 16;
const STREAM_BUFFERS: u32 = 4;
const EBUSY: i32 = 16;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy: {0}")]
    DeviceBusy(String),
    #[error("{0} is not a video capture device")]
    NotCaptureDevice(String),
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("frame conversion failed: {0}")]
    Frame(#[from] frame::FrameError),
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Pixel formats the preview can decode, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel); full colour preview.
    Yuyv,
    /// 8-bit grayscale (1 byte/pixel); monochrome sensors only.
    Grey,
}

impl PixelFormat {
    const PREFERRED: [PixelFormat; 2] = [PixelFormat::Yuyv, PixelFormat::Grey];

    pub fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Yuyv => FourCC::new(b"YUYV"),
            PixelFormat::Grey => FourCC::new(b"GREY"),
        }
    }

    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        Self::PREFERRED.into_iter().find(|f| f.fourcc() == fourcc)
    }
}

/// An open V4L2 capture device with a negotiated preview format.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a capture device (e.g. "/dev/video0") and ask for a `width`x`height`
    /// preview. The driver may settle on a different size; the negotiated one
    /// is what [`width`](Self::width) and [`height`](Self::height) report.
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| match e.raw_os_error() {
            Some(EBUSY) => CameraError::DeviceBusy(device_path.to_string()),
            _ => CameraError::DeviceNotFound(format!("{device_path}: {e}")),
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::CaptureFailed(format!("query capabilities: {e}")))?;
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE | Flags::STREAMING) {
            return Err(CameraError::NotCaptureDevice(device_path.to_string()));
        }

        let (pixel_format, width, height) = negotiate(&device, width, height)?;
        tracing::info!(
            device = device_path,
            card = %caps.card,
            width,
            height,
            format = ?pixel_format,
            "camera ready for preview"
        );

        Ok(Self {
            device,
            width,
            height,
            pixel_format,
        })
    }

    /// Open a capture stream delivering frames one at a time.
    pub fn stream(&self) -> Result<FrameStream<'_>, CameraError> {
        let stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::CaptureFailed(format!("create mmap stream: {e}")))?;
        Ok(FrameStream {
            camera: self,
            stream,
        })
    }

    fn decode(&self, buf: &[u8], sequence: u32) -> Result<Frame, CameraError> {
        let (color, gray) = match self.pixel_format {
            PixelFormat::Yuyv => (
                frame::yuyv_to_rgb(buf, self.width, self.height)?,
                frame::yuyv_to_gray(buf, self.width, self.height)?,
            ),
            PixelFormat::Grey => frame::grey_to_frames(buf, self.width, self.height)?,
        };
        Ok(Frame {
            color,
            gray,
            sequence,
        })
    }

    /// List V4L2 nodes that can stream video capture.
    pub fn list_devices() -> Vec<DeviceInfo> {
        (0..MAX_VIDEO_NODES)
            .map(|i| format!("/dev/video{i}"))
            .filter(|path| Path::new(path).exists())
            .filter_map(|path| {
                let caps = Device::with_path(&path).ok()?.query_caps().ok()?;
                caps.capabilities
                    .contains(Flags::VIDEO_CAPTURE)
                    .then(|| DeviceInfo {
                        path,
                        name: caps.card,
                        driver: caps.driver,
                        bus: caps.bus,
                    })
            })
            .collect()
    }
}

/// Ask for each preferred format in turn and keep the first one the driver
/// accepts unchanged.
fn negotiate(device: &Device, width: u32, height: u32) -> Result<(PixelFormat, u32, u32), CameraError> {
    let mut fmt = device
        .format()
        .map_err(|e| CameraError::FormatNegotiationFailed(format!("get format: {e}")))?;

    for wanted in PixelFormat::PREFERRED {
        fmt.fourcc = wanted.fourcc();
        fmt.width = width;
        fmt.height = height;
        let applied = device
            .set_format(&fmt)
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("set format: {e}")))?;
        if PixelFormat::from_fourcc(applied.fourcc) == Some(wanted) {
            return Ok((wanted, applied.width, applied.height));
        }
        tracing::debug!(wanted = ?wanted, got = ?applied.fourcc, "format refused");
    }

    Err(CameraError::FormatNegotiationFailed(
        "device offers neither YUYV nor GREY".to_string(),
    ))
}

/// An open mmap capture stream. Each call blocks until the driver hands over
/// the next buffer.
pub struct FrameStream<'a> {
    camera: &'a Camera,
    stream: MmapStream<'a>,
}

impl FrameStream<'_> {
    pub fn next_frame(&mut self) -> Result<Frame, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("dequeue buffer: {e}")))?;
        let sequence = meta.sequence;
        self.camera.decode(buf, sequence)
    }
}
