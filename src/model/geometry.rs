//! Page-space geometry: rectangles, transformation matrices and the
//! DPI-to-pixel sizing rule.

use serde::{Deserialize, Serialize};

/// Points per inch in PDF user space.
pub const POINTS_PER_INCH: f64 = 72.0;

/// US Letter, used when a page carries no usable box at all.
pub const LETTER: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// An axis-aligned rectangle in points (1/72 inch).
///
/// Corners are kept normalized so that `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from two corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// A rectangle anchored at the origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Smallest rectangle containing all points.
    pub fn bounding(points: &[(f32, f32)]) -> Option<Self> {
        let (&(x, y), rest) = points.split_first()?;
        let mut rect = Self::new(x, y, x, y);
        for &(x, y) in rest {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Swap width and height, keeping the lower-left corner.
    pub fn transposed(&self) -> Self {
        Self::new(
            self.x0,
            self.y0,
            self.x0 + self.height(),
            self.y0 + self.width(),
        )
    }

    /// Overlap of two rectangles, `None` if they do not intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 < x1 && y0 < y1 {
            Some(Rect { x0, y0, x1, y1 })
        } else {
            None
        }
    }

    /// True when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.1} {:.1} {:.1} {:.1}] ({:.1}x{:.1} pt)",
            self.x0,
            self.y0,
            self.x1,
            self.y1,
            self.width(),
            self.height()
        )
    }
}

/// A PDF transformation matrix `[a b c d e f]`.
///
/// Points are row vectors: `[x' y' 1] = [x y 1] × M`, so the operator
/// `cm` turns the current matrix `CTM` into `M × CTM`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Build from six numbers, as found in `cm` operands or `/Matrix`.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self × other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Bounding box of the unit square under this matrix.
    ///
    /// An image XObject is always painted into the unit square of the
    /// current user space, so this is where it lands on the page.
    pub fn unit_square_bounds(&self) -> Rect {
        let corners = [
            self.transform_point(0.0, 0.0),
            self.transform_point(1.0, 0.0),
            self.transform_point(0.0, 1.0),
            self.transform_point(1.0, 1.0),
        ];
        // four corners, never empty
        Rect::bounding(&corners).unwrap_or(Rect::from_size(0.0, 0.0))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Pixel dimensions an image should have at the target density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResolution {
    pub width: u32,
    pub height: u32,
}

impl TargetResolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if an image of `width` x `height` pixels is larger than this
    /// target in either dimension.
    pub fn is_exceeded_by(&self, width: u32, height: u32) -> bool {
        width > self.width || height > self.height
    }
}

impl std::fmt::Display for TargetResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel size of `rect` sampled at `dpi`.
///
/// Each side is `floor(points / 72 * dpi)`. Degenerate or negative sizes
/// come out as zero.
pub fn target_pixels(rect: &Rect, dpi: f32) -> TargetResolution {
    TargetResolution {
        width: points_to_pixels(rect.width(), dpi),
        height: points_to_pixels(rect.height(), dpi),
    }
}

fn points_to_pixels(points: f32, dpi: f32) -> u32 {
    let inches = f64::from(points) / POINTS_PER_INCH;
    // `as` saturates: NaN and negatives become 0
    (inches * f64::from(dpi)).floor() as u32
}

/// Effective density of `pixels` spread over `points`.
pub fn effective_dpi(pixels: u32, points: f32) -> Option<f32> {
    if points <= 0.0 {
        return None;
    }
    Some((f64::from(pixels) * POINTS_PER_INCH / f64::from(points)) as f32)
}
