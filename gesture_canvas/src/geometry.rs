//! Small 2D geometry kit shared by every stage of the pipeline.

use std::f32::consts::PI;

// ════════════════════════════════════════════════════════════════════════════
// Point2
// ════════════════════════════════════════════════════════════════════════════

/// A 2D point (or vector).  Normalized image space or canvas pixels,
/// depending on the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Point2 { x, y }
    }

    pub fn distance(self, other: Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint of `self` and `other`.
    pub fn midpoint(self, other: Point2) -> Point2 {
        Point2::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Angle (radians) of the vector `self → other`.
    pub fn angle_to(self, other: Point2) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn offset(self, dx: f32, dy: f32) -> Point2 {
        Point2::new(self.x + dx, self.y + dy)
    }

    pub fn sub(self, other: Point2) -> Point2 {
        Point2::new(self.x - other.x, self.y - other.y)
    }

    /// Rotate around `center` by `radians`.
    pub fn rotate_around(self, center: Point2, radians: f32) -> Point2 {
        let (sin, cos) = radians.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point2::new(center.x + dx * cos - dy * sin, center.y + dx * sin + dy * cos)
    }

    /// Scale the offset from `center` by `factor`.
    pub fn scale_around(self, center: Point2, factor: f32) -> Point2 {
        Point2::new(
            center.x + (self.x - center.x) * factor,
            center.y + (self.y - center.y) * factor,
        )
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Rect — axis-aligned bounding box
// ════════════════════════════════════════════════════════════════════════════

/// Axis-aligned rectangle, inclusive on all edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Point2,
    pub max: Point2,
}

impl Rect {
    /// Degenerate rect covering exactly one point.
    pub fn from_point(p: Point2) -> Self {
        Rect { min: p, max: p }
    }

    /// Tight bound of `points`, or `None` when empty.
    pub fn bounding<I: IntoIterator<Item = Point2>>(points: I) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect::from_point(first);
        for p in iter {
            rect.expand(p);
        }
        Some(rect)
    }

    pub fn expand(&mut self, p: Point2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.min = self.min.offset(dx, dy);
        self.max = self.max.offset(dx, dy);
    }

    /// Grow by `pad` on every side.
    pub fn padded(&self, pad: f32) -> Rect {
        Rect {
            min: self.min.offset(-pad, -pad),
            max: self.max.offset(pad, pad),
        }
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2 {
        self.min.midpoint(self.max)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Free helpers
// ════════════════════════════════════════════════════════════════════════════

/// Shortest distance from `p` to the segment `a–b`.
pub fn point_segment_distance(p: Point2, a: Point2, b: Point2) -> f32 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance(Point2::new(a.x + t * abx, a.y + t * aby))
}

/// Wrap an angle difference into (−π, π].
pub fn normalize_angle(mut a: f32) -> f32 {
    if !a.is_finite() {
        return 0.0;
    }
    a %= 2.0 * PI;
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Arithmetic mean of a point set, or `None` when empty.
pub fn centroid<I: IntoIterator<Item = Point2>>(points: I) -> Option<Point2> {
    let (mut sx, mut sy, mut n) = (0.0f64, 0.0f64, 0usize);
    for p in points {
        sx += p.x as f64;
        sy += p.y as f64;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(Point2::new((sx / n as f64) as f32, (sy / n as f64) as f32))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
