//! Frame geometry: working-resolution scaling, rotation compensation and the
//! inverse mapping of detections back to full-resolution frame space.

use crate::types::{
    DetectionRect, FrameSize, GeometryError, MarkerMode, Overlay, Point, RemappedFace,
    RotationBucket,
};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel};

/// Short-side length, in pixels, of the image handed to the detector.
pub const TARGET_SHORT_SIDE: u32 = 480;

/// Vertical offset added to the 180° correction overlay.
///
/// Applied to the frame's y axis before the 180° axis swap, which is why it
/// ends up in the overlay's x coordinates. Calibrated empirically on a single
/// reference handset; it compensates for an unexplained shift rather than
/// following from the transform. Recalibrate per device through [`RemapOptions::rotation_180_fix_px`].
pub const ROTATION_180_VERTICAL_FIX_PX: f64 = 150.0;

/// Largest long-side to short-side ratio [`scale_down`] accepts. Anything
/// thinner would be enlarged into a working frame too long to scan.
pub const MAX_ASPECT_RATIO: u32 = 16;

type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

/// A frame resized to the working resolution, with the ratio that produced it.
pub struct ScaledFrame<P: Pixel> {
    pub image: Image<P>,
    pub ratio: f64,
}

impl<P: Pixel> ScaledFrame<P> {
    /// Wrap an already appropriately sized frame without resizing (ratio 1.0).
    pub fn identity(image: Image<P>) -> Self {
        Self { image, ratio: 1.0 }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.image.width(), self.image.height())
    }
}

/// Ratio mapping `size` onto the working resolution.
pub fn ratio_to_target(size: FrameSize) -> Result<f64, GeometryError> {
    if size.is_empty() {
        return Err(GeometryError::InvalidFrame {
            width: size.width,
            height: size.height,
        });
    }
    Ok(f64::from(TARGET_SHORT_SIDE) / f64::from(size.short_side()))
}

/// Resize `frame` so its short side equals [`TARGET_SHORT_SIDE`], keeping the
/// aspect ratio. The input is left untouched.
///
/// Frames more elongated than [`MAX_ASPECT_RATIO`] are rejected with
/// [`GeometryError::ExtremeAspect`].
pub fn scale_down<P>(frame: &Image<P>) -> Result<ScaledFrame<P>, GeometryError>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let size = FrameSize::new(frame.width(), frame.height());
    let ratio = ratio_to_target(size)?;
    let long_side = u64::from(size.width.max(size.height));
    if long_side > u64::from(size.short_side()) * u64::from(MAX_ASPECT_RATIO) {
        return Err(GeometryError::ExtremeAspect {
            width: size.width,
            height: size.height,
        });
    }

    let new_w = scaled_dimension(size.width, ratio);
    let new_h = scaled_dimension(size.height, ratio);

    let image = if new_w == size.width && new_h == size.height {
        frame.clone()
    } else {
        imageops::resize(frame, new_w, new_h, FilterType::Triangle)
    };

    tracing::trace!(
        from_w = size.width,
        from_h = size.height,
        to_w = new_w,
        to_h = new_h,
        ratio,
        "scaled frame to working resolution"
    );

    Ok(ScaledFrame { image, ratio })
}

fn scaled_dimension(dim: u32, ratio: f64) -> u32 {
    ((f64::from(dim) * ratio).round() as u32).max(1)
}

/// Rotate or flip the working image for the current screen rotation so the
/// detector sees faces upright.
///
/// | bucket | transform |
/// |---|---|
/// | 0°   | rotate 90° clockwise, then flip horizontally |
/// | 90°  | none |
/// | 180° | rotate 90° counter-clockwise |
/// | 270° | flip vertically |
pub fn compensate<P>(frame: &Image<P>, bucket: RotationBucket) -> Image<P>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    match bucket {
        RotationBucket::Deg0 => imageops::flip_horizontal(&imageops::rotate90(frame)),
        RotationBucket::Deg90 => frame.clone(),
        RotationBucket::Deg180 => imageops::rotate270(frame),
        RotationBucket::Deg270 => imageops::flip_vertical(frame),
    }
}

/// Knobs for [`remap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemapOptions {
    pub marker: MarkerMode,
    pub rotation_180_fix_px: f64,
}

impl Default for RemapOptions {
    fn default() -> Self {
        Self {
            marker: MarkerMode::UpperLeft,
            rotation_180_fix_px: ROTATION_180_VERTICAL_FIX_PX,
        }
    }
}

/// Map a detector rectangle from working (scaled, rotated) space back into
/// the coordinate space of the full-resolution frame of size `full`.
pub fn remap(
    rect: &DetectionRect,
    ratio: f64,
    bucket: RotationBucket,
    full: FrameSize,
    options: &RemapOptions,
) -> RemappedFace {
    // Undo the scale first: the per-bucket formulas work on unscaled sizes.
    #[allow(clippy::float_cmp)]
    let r = if ratio == 1.0 {
        *rect
    } else {
        rect.scaled(1.0 / ratio)
    };

    let (x, y, rh) = (r.x, r.y, r.height);
    let w = r.x + r.width;
    let h = r.y + r.height;
    let full_h = f64::from(full.height);

    let overlay = |c1: Point, c2: Point| Overlay {
        corner1: c1,
        corner2: c2,
        marker: match options.marker {
            MarkerMode::UpperLeft => c1,
            MarkerMode::Centroid => c1.midpoint(c2),
        },
    };

    let (primary, correction) = match bucket {
        RotationBucket::Deg90 => (overlay(Point::new(x, y), Point::new(w, h)), None),
        RotationBucket::Deg0 => (overlay(Point::new(y, x), Point::new(h, w)), None),
        RotationBucket::Deg180 => {
            let y_fix = full_h - y + options.rotation_180_fix_px;
            let h_fix = y_fix - rh;
            (
                overlay(Point::new(y, x), Point::new(h, w)),
                Some(overlay(Point::new(y_fix, x), Point::new(h_fix, w))),
            )
        }
        RotationBucket::Deg270 => {
            let y_fix = full_h - y;
            let h_fix = y_fix - rh;
            (overlay(Point::new(x, y_fix), Point::new(w, h_fix)), None)
        }
    };

    RemappedFace {
        primary,
        correction,
        score: rect.score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    const EPS: f64 = 1e-9;

    fn assert_point(actual: Point, x: f64, y: f64) {
        assert!(
            (actual.x - x).abs() < EPS && (actual.y - y).abs() < EPS,
            "expected ({x}, {y}), got ({}, {})",
            actual.x,
            actual.y
        );
    }

    fn hd() -> FrameSize {
        FrameSize::new(1920, 1080)
    }

    fn hd_ratio() -> f64 {
        480.0 / 1080.0
    }

    #[test]
    fn test_square_frame_ratio() {
        for side in [120u32, 480, 640, 1000] {
            let ratio = ratio_to_target(FrameSize::new(side, side)).unwrap();
            assert_eq!(ratio, 480.0 / side as f64);
        }
    }

    #[test]
    fn test_scale_down_preserves_aspect() {
        let frame = GrayImage::new(1920, 1080);
        let scaled = scale_down(&frame).unwrap();
        assert_eq!(scaled.size(), FrameSize::new(853, 480));
        assert!((scaled.ratio - hd_ratio()).abs() < EPS);
    }

    #[test]
    fn test_scale_down_portrait() {
        let frame = GrayImage::new(720, 1280);
        let scaled = scale_down(&frame).unwrap();
        assert_eq!(scaled.size(), FrameSize::new(480, 853));
    }

    #[test]
    fn test_scale_down_already_target_is_copy() {
        let mut frame = GrayImage::new(640, 480);
        frame.put_pixel(3, 4, Luma([200]));
        let scaled = scale_down(&frame).unwrap();
        assert_eq!(scaled.ratio, 1.0);
        assert_eq!(scaled.image, frame);
    }

    #[test]
    fn test_scale_down_rejects_empty() {
        let frame = GrayImage::new(0, 100);
        let err = scale_down(&frame).err();
        assert_eq!(
            err,
            Some(GeometryError::InvalidFrame { width: 0, height: 100 })
        );
    }

    #[test]
    fn test_scale_down_rejects_sliver() {
        let frame = GrayImage::new(1, 4000);
        assert_eq!(
            scale_down(&frame).err(),
            Some(GeometryError::ExtremeAspect { width: 1, height: 4000 })
        );
        let frame = GrayImage::new(4000, 200);
        assert!(matches!(
            scale_down(&frame),
            Err(GeometryError::ExtremeAspect { .. })
        ));
    }

    #[test]
    fn test_scale_down_accepts_aspect_limit() {
        // 16:1 is the most elongated frame still scaled.
        let frame = GrayImage::new(1600, 100);
        let scaled = scale_down(&frame).unwrap();
        assert_eq!(scaled.size(), FrameSize::new(7680, 480));
    }

    #[test]
    fn test_identity_scaled_frame() {
        let frame = GrayImage::new(33, 17);
        let scaled = ScaledFrame::identity(frame);
        assert_eq!(scaled.ratio, 1.0);
        assert_eq!(scaled.size(), FrameSize::new(33, 17));
    }

    /// 3x2 image with distinct values so every transform is observable:
    /// ```text
    /// 1 2 3
    /// 4 5 6
    /// ```
    fn tiny() -> GrayImage {
        GrayImage::from_raw(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn test_compensate_deg90_identity() {
        assert_eq!(compensate(&tiny(), RotationBucket::Deg90), tiny());
    }

    #[test]
    fn test_compensate_deg0_transposes() {
        // Rotate clockwise then mirror = transpose.
        let out = compensate(&tiny(), RotationBucket::Deg0);
        assert_eq!(out.dimensions(), (2, 3));
        assert_eq!(out.into_raw(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_compensate_deg180_rotates_ccw() {
        let out = compensate(&tiny(), RotationBucket::Deg180);
        assert_eq!(out.dimensions(), (2, 3));
        assert_eq!(out.into_raw(), vec![3, 6, 2, 5, 1, 4]);
    }

    #[test]
    fn test_compensate_deg270_flips_vertically() {
        let out = compensate(&tiny(), RotationBucket::Deg270);
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(out.into_raw(), vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_compensate_leaves_input_untouched() {
        let input = tiny();
        let _ = compensate(&input, RotationBucket::Deg0);
        assert_eq!(input, tiny());
    }

    #[test]
    fn test_remap_identity() {
        let rect = DetectionRect::new(12.0, 34.0, 56.0, 78.0);
        let face = remap(
            &rect,
            1.0,
            RotationBucket::Deg90,
            hd(),
            &RemapOptions::default(),
        );
        assert_eq!(face.primary.corner1, rect.upper_left());
        assert_eq!(face.primary.corner2, rect.lower_right());
        assert!(face.correction.is_none());
    }

    #[test]
    fn test_remap_deg90_hd_scenario() {
        let rect = DetectionRect::new(100.0, 50.0, 40.0, 40.0);
        let face = remap(
            &rect,
            hd_ratio(),
            RotationBucket::Deg90,
            hd(),
            &RemapOptions::default(),
        );
        assert_point(face.primary.corner1, 225.0, 112.5);
        assert_point(face.primary.corner2, 315.0, 202.5);
        assert_point(face.primary.marker, 225.0, 112.5);
    }

    #[test]
    fn test_remap_deg0_swaps_axes() {
        let rect = DetectionRect::new(100.0, 50.0, 40.0, 40.0);
        let face = remap(
            &rect,
            hd_ratio(),
            RotationBucket::Deg0,
            hd(),
            &RemapOptions::default(),
        );
        assert_point(face.primary.corner1, 112.5, 225.0);
        assert_point(face.primary.corner2, 202.5, 315.0);
        assert!(face.correction.is_none());
    }

    #[test]
    fn test_remap_deg180_adds_correction() {
        let rect = DetectionRect::new(100.0, 50.0, 40.0, 40.0);
        let face = remap(
            &rect,
            hd_ratio(),
            RotationBucket::Deg180,
            hd(),
            &RemapOptions::default(),
        );
        assert_point(face.primary.corner1, 112.5, 225.0);
        assert_point(face.primary.corner2, 202.5, 315.0);

        let fix = face.correction.expect("180° bucket draws a correction");
        // y_fix = 1080 - 112.5 + 150, h_fix = y_fix - 90
        assert_point(fix.corner1, 1117.5, 225.0);
        assert_point(fix.corner2, 1027.5, 315.0);
        assert_point(fix.marker, 1117.5, 225.0);
    }

    #[test]
    fn test_remap_deg180_recalibrated_offset() {
        let rect = DetectionRect::new(10.0, 20.0, 30.0, 30.0);
        let options = RemapOptions {
            rotation_180_fix_px: 0.0,
            ..RemapOptions::default()
        };
        let face = remap(&rect, 1.0, RotationBucket::Deg180, hd(), &options);
        let fix = face.correction.unwrap();
        assert_point(fix.corner1, 1060.0, 10.0);
        assert_point(fix.corner2, 1030.0, 40.0);
    }

    #[test]
    fn test_remap_deg270_mirrors_vertically() {
        let rect = DetectionRect::new(100.0, 50.0, 40.0, 40.0);
        let face = remap(
            &rect,
            hd_ratio(),
            RotationBucket::Deg270,
            hd(),
            &RemapOptions::default(),
        );
        // y_fix = 1080 - 112.5, h_fix = y_fix - 90
        assert_point(face.primary.corner1, 225.0, 967.5);
        assert_point(face.primary.corner2, 315.0, 877.5);
        assert!(face.correction.is_none());
    }

    #[test]
    fn test_remap_centroid_marker() {
        let rect = DetectionRect::new(10.0, 20.0, 40.0, 60.0);
        let options = RemapOptions {
            marker: MarkerMode::Centroid,
            ..RemapOptions::default()
        };
        let face = remap(&rect, 1.0, RotationBucket::Deg90, hd(), &options);
        assert_point(face.primary.marker, 30.0, 50.0);
        // Corners are unaffected by the marker mode.
        assert_point(face.primary.corner1, 10.0, 20.0);
    }

    #[test]
    fn test_scale_roundtrip_recovers_rect() {
        let original = DetectionRect::new(123.0, 45.5, 67.25, 89.0);
        for ratio in [0.25, hd_ratio(), 0.75, 1.5, 3.0] {
            let working = original.scaled(ratio);
            let face = remap(
                &working,
                ratio,
                RotationBucket::Deg90,
                hd(),
                &RemapOptions::default(),
            );
            let ul = face.primary.corner1;
            let lr = face.primary.corner2;
            assert!((ul.x - original.x).abs() < 1e-9, "ratio {ratio}");
            assert!((ul.y - original.y).abs() < 1e-9, "ratio {ratio}");
            assert!((lr.x - ul.x - original.width).abs() < 1e-9, "ratio {ratio}");
            assert!((lr.y - ul.y - original.height).abs() < 1e-9, "ratio {ratio}");
        }
    }

    #[test]
    fn test_remap_preserves_score() {
        let rect = DetectionRect {
            score: 4.5,
            ..DetectionRect::new(0.0, 0.0, 10.0, 10.0)
        };
        let face = remap(&rect, 0.5, RotationBucket::Deg0, hd(), &RemapOptions::default());
        assert_eq!(face.score, 4.5);
    }
}
