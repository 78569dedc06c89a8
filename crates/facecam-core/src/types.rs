use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
    #[error("frame {width}x{height} is too elongated to scale to the working resolution")]
    ExtremeAspect { width: u32, height: u32 },
    #[error("unsupported rotation bucket: {0}° (expected 0, 90, 180 or 270)")]
    UnsupportedRotationBucket(i32),
}

/// Discretized screen rotation, selecting both the image transform applied
/// before detection and the inverse coordinate remap after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "i32")]
pub enum RotationBucket {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl RotationBucket {
    /// Bucket a continuous orientation reading (degrees).
    ///
    /// `[45, 135)` → 270, `[135, 225)` → 180, `[225, 315)` → 90, anything
    /// else (including negative "unknown" readings) → 0.
    pub fn from_orientation(degrees: i32) -> Self {
        match degrees {
            45..=134 => Self::Deg270,
            135..=224 => Self::Deg180,
            225..=314 => Self::Deg90,
            _ => Self::Deg0,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

impl TryFrom<i32> for RotationBucket {
    type Error = GeometryError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(GeometryError::UnsupportedRotationBucket(other)),
        }
    }
}

impl From<RotationBucket> for i32 {
    fn from(bucket: RotationBucket) -> Self {
        bucket.degrees()
    }
}

impl std::fmt::Display for RotationBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A point in full-resolution frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned rectangle reported by a detector, in the coordinate space of
/// the image the detector was given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector-specific confidence; 0.0 when the detector reports none.
    pub score: f64,
}

impl DetectionRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height, score: 0.0 }
    }

    pub fn upper_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn lower_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
            score: self.score,
        }
    }
}

/// Width and height of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Which point of a remapped rectangle the marker dot is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerMode {
    /// The first corner of the remapped rectangle.
    #[default]
    UpperLeft,
    /// Midpoint between the two remapped corners.
    Centroid,
}

/// Opposite corners of a rectangle plus its marker point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overlay {
    pub corner1: Point,
    pub corner2: Point,
    pub marker: Point,
}

/// A detection mapped back into full-resolution, unrotated frame space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RemappedFace {
    pub primary: Overlay,
    /// Second, empirically corrected overlay drawn for the 180° bucket only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<Overlay>,
    pub score: f64,
}
