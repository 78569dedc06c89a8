//! Captured frame type and pixel-format conversion (YUYV, GREY).

use image::{GrayImage, RgbImage};

/// One captured frame, delivered as both a colour and an intensity image of
/// identical dimensions.
#[derive(Clone)]
pub struct Frame {
    pub color: RgbImage,
    pub gray: GrayImage,
    /// Driver-assigned capture sequence number.
    pub sequence: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("odd frame width {0} cannot be packed as YUYV")]
    OddWidth(u32),
}

/// Pixel count computed in `usize` so large negotiated sizes cannot wrap.
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), FrameError> {
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Extract the luma plane of packed YUYV (4:2:2) data.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
pub fn yuyv_to_gray(yuyv: &[u8], width: u32, height: u32) -> Result<GrayImage, FrameError> {
    let expected = pixel_count(width, height) * 2;
    check_len(yuyv, expected)?;
    let luma = yuyv[..expected].iter().step_by(2).copied().collect();
    GrayImage::from_raw(width, height, luma).ok_or(FrameError::InvalidLength {
        expected,
        actual: yuyv.len(),
    })
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 limited-range coefficients.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    if width % 2 != 0 {
        return Err(FrameError::OddWidth(width));
    }
    let expected = pixel_count(width, height) * 2;
    check_len(yuyv, expected)?;

    let mut rgb = Vec::with_capacity(pixel_count(width, height) * 3);
    for quad in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (quad[0], quad[1], quad[2], quad[3]);
        rgb.extend_from_slice(&ycbcr_to_rgb(y0, u, v));
        rgb.extend_from_slice(&ycbcr_to_rgb(y1, u, v));
    }
    RgbImage::from_raw(width, height, rgb).ok_or(FrameError::InvalidLength {
        expected,
        actual: yuyv.len(),
    })
}

fn ycbcr_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as f32 - 16.0) * 1.164;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [
        clamp(c + 1.596 * e),
        clamp(c - 0.392 * d - 0.813 * e),
        clamp(c + 2.017 * d),
    ]
}

/// Wrap an 8-bit grayscale buffer, replicating it into a colour image.
pub fn grey_to_frames(buf: &[u8], width: u32, height: u32) -> Result<(RgbImage, GrayImage), FrameError> {
    let pixels = pixel_count(width, height);
    check_len(buf, pixels)?;
    let gray = GrayImage::from_raw(width, height, buf[..pixels].to_vec()).ok_or(
        FrameError::InvalidLength {
            expected: pixels,
            actual: buf.len(),
        },
    )?;
    let color = image::DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
    Ok((color, gray))
}
