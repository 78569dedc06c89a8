//! Burns detection overlays into the full-resolution colour frame.

use crate::types::{Point, RemappedFace};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

const DOT_RADIUS: i32 = 4;

/// Draw the outline of the rectangle spanned by two opposite corners, given
/// in any order. Parts outside the frame are clipped; returns `false` when
/// the rectangle lies entirely outside and nothing was drawn.
pub fn draw_rect(frame: &mut RgbImage, corner1: Point, corner2: Point, color: Rgb<u8>) -> bool {
    let Some(rect) = visible_rect(frame.dimensions(), corner1, corner2) else {
        tracing::trace!(?corner1, ?corner2, "rectangle outside frame, skipped");
        return false;
    };
    draw_hollow_rect_mut(frame, rect, color);
    true
}

/// Draw a filled marker dot. Returns `false` when the centre is outside the
/// frame; dots near an edge are clipped.
pub fn draw_dot(frame: &mut RgbImage, center: Point, color: Rgb<u8>) -> bool {
    let (w, h) = frame.dimensions();
    let (cx, cy) = (to_pixel(center.x), to_pixel(center.y));
    if cx < 0 || cy < 0 || cx >= i64::from(w) || cy >= i64::from(h) {
        tracing::trace!(?center, "marker outside frame, skipped");
        return false;
    }
    draw_filled_circle_mut(frame, (cx as i32, cy as i32), DOT_RADIUS, color);
    true
}

/// Draw a remapped face: red rectangle with a green marker, plus the yellow
/// and blue correction overlay when present.
pub fn draw_face(frame: &mut RgbImage, face: &RemappedFace) {
    let primary = &face.primary;
    draw_rect(frame, primary.corner1, primary.corner2, RED);
    draw_dot(frame, primary.marker, GREEN);

    if let Some(fix) = &face.correction {
        draw_rect(frame, fix.corner1, fix.corner2, YELLOW);
        draw_dot(frame, fix.marker, BLUE);
    }
}

/// The pixel rectangle to outline, or `None` when no part of it overlaps the
/// frame. Edges beyond the frame are pulled in to one pixel outside it, so
/// they stay invisible while keeping the outline short.
fn visible_rect((w, h): (u32, u32), a: Point, b: Point) -> Option<Rect> {
    let (w, h) = (i64::from(w), i64::from(h));
    let (x0, x1) = ordered(to_pixel(a.x), to_pixel(b.x));
    let (y0, y1) = ordered(to_pixel(a.y), to_pixel(b.y));
    if x1 < 0 || y1 < 0 || x0 >= w || y0 >= h {
        return None;
    }
    let (x0, x1) = (x0.max(-1), x1.min(w));
    let (y0, y1) = (y0.max(-1), y1.min(h));
    let left = i32::try_from(x0).ok()?;
    let top = i32::try_from(y0).ok()?;
    let width = u32::try_from(x1 - x0 + 1).ok()?;
    let height = u32::try_from(y1 - y0 + 1).ok()?;
    Some(Rect::at(left, top).of_size(width, height))
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

/// Fractional coordinates are truncated toward zero, not rounded.
fn to_pixel(v: f64) -> i64 {
    v as i64
}
