//! 2D affine transforms.
//!
//! An [`Affine`] is the SVG matrix
//!
//! ```text
//! [a c e]
//! [b d f]
//! [0 0 1]
//! ```
//!
//! ## Composition order
//!
//! [`compose(t1, t2)`](compose) means "apply `t1`, then `t2`": it is the
//! matrix product `M2 · M1`, so
//! `compose(t1, t2).apply_to_point(p) == t2.apply_to_point(t1.apply_to_point(p))`.
//! [`Affine::then`] is the same thing in method form. The `*` operator is the
//! plain matrix product, so `a * b` applies `b` first.
//!
//! Transform attributes read left to right as nested coordinate systems:
//! `translate(10) rotate(90)` rotates first, then translates.

use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

use svgtypes::{TransformListParser, TransformListToken};

use crate::error::TransformError;
use crate::geometry::{ArcSegment, Path, Point, Segment};

const EPS: f64 = 1e-12;

/// A 2D affine transform `(a, b, c, d, e, f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    #[inline]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees` about the origin (clockwise on screen, since y points down).
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = sin_cos_degrees(degrees);
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Rotation by `degrees` about `(cx, cy)`.
    pub fn rotate_about(degrees: f64, cx: f64, cy: f64) -> Self {
        Self::translate(-cx, -cy)
            .then(Self::rotate(degrees))
            .then(Self::translate(cx, cy))
    }

    pub fn skew_x(degrees: f64) -> Self {
        Self::new(1.0, 0.0, degrees.to_radians().tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(degrees: f64) -> Self {
        Self::new(1.0, degrees.to_radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    /// Parse an SVG `transform` attribute value.
    pub fn parse(attr: &str) -> Result<Self, TransformError> {
        let mut acc = Self::IDENTITY;
        for token in TransformListParser::from(attr) {
            let step = match token.map_err(|e| transform_error(attr, e))? {
                TransformListToken::Matrix { a, b, c, d, e, f } => Self::new(a, b, c, d, e, f),
                TransformListToken::Translate { tx, ty } => Self::translate(tx, ty),
                TransformListToken::Scale { sx, sy } => Self::scale(sx, sy),
                TransformListToken::Rotate { angle } => Self::rotate(angle),
                TransformListToken::SkewX { angle } => Self::skew_x(angle),
                TransformListToken::SkewY { angle } => Self::skew_y(angle),
            };
            // functions to the right apply first
            acc = compose(step, acc);
        }
        Ok(acc)
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Apply `self`, then `next`.
    #[inline]
    pub fn then(self, next: Affine) -> Affine {
        compose(self, next)
    }

    pub fn inverse(&self) -> Option<Affine> {
        let det = self.determinant();
        if det.abs() <= EPS || !det.is_finite() {
            return None;
        }
        Some(Affine::new(
            self.d / det,
            -self.b / det,
            -self.c / det,
            self.a / det,
            (self.c * self.f - self.d * self.e) / det,
            (self.b * self.e - self.a * self.f) / det,
        ))
    }

    #[inline]
    pub fn apply_to_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Map every point of a segment. Arcs get new radii, rotation and sweep.
    pub fn apply_to_segment(&self, segment: &Segment) -> Segment {
        match *segment {
            Segment::Line { from, to } => Segment::Line {
                from: self.apply_to_point(from),
                to: self.apply_to_point(to),
            },
            Segment::Cubic { from, ctrl1, ctrl2, to } => Segment::Cubic {
                from: self.apply_to_point(from),
                ctrl1: self.apply_to_point(ctrl1),
                ctrl2: self.apply_to_point(ctrl2),
                to: self.apply_to_point(to),
            },
            Segment::Quadratic { from, ctrl, to } => Segment::Quadratic {
                from: self.apply_to_point(from),
                ctrl: self.apply_to_point(ctrl),
                to: self.apply_to_point(to),
            },
            Segment::Arc(arc) => Segment::Arc(self.apply_to_arc(&arc)),
        }
    }

    /// Map a path. Segment kinds and the closed flag are kept.
    pub fn apply_to_path(&self, path: &Path) -> Path {
        if self.is_identity() {
            return path.clone();
        }
        Path {
            segments: path.segments.iter().map(|s| self.apply_to_segment(s)).collect(),
            closed: path.closed,
        }
    }

    fn apply_to_arc(&self, arc: &ArcSegment) -> ArcSegment {
        let from = self.apply_to_point(arc.from);
        let to = self.apply_to_point(arc.to);
        let det = self.determinant();
        let sweep = if det < 0.0 { !arc.sweep } else { arc.sweep };

        if self.is_similarity() {
            let scale = self.a.hypot(self.b);
            let (rx, ry) = if (scale - 1.0).abs() <= EPS {
                (arc.rx, arc.ry)
            } else {
                (arc.rx * scale, arc.ry * scale)
            };
            return ArcSegment {
                from,
                to,
                rx,
                ry,
                x_rotation: arc.x_rotation + self.b.atan2(self.a).to_degrees(),
                large_arc: arc.large_arc,
                sweep,
            };
        }

        // The mapped ellipse is the image of the unit circle under
        // A = L * R(phi) * diag(rx, ry). Its axes are the singular values of A.
        let (sin, cos) = sin_cos_degrees(arc.x_rotation);
        let (rx, ry) = (arc.rx.abs(), arc.ry.abs());
        let p = self.a * cos * rx + self.c * sin * rx;
        let q = -self.a * sin * ry + self.c * cos * ry;
        let r = self.b * cos * rx + self.d * sin * rx;
        let s = -self.b * sin * ry + self.d * cos * ry;

        let e = (p + s) / 2.0;
        let f = (p - s) / 2.0;
        let g = (r + q) / 2.0;
        let h = (r - q) / 2.0;
        let big_q = e.hypot(h);
        let big_r = f.hypot(g);

        ArcSegment {
            from,
            to,
            rx: big_q + big_r,
            ry: (big_q - big_r).abs(),
            x_rotation: ((g.atan2(f) + h.atan2(e)) / 2.0).to_degrees(),
            large_arc: arc.large_arc,
            sweep,
        }
    }

    /// Rotation plus uniform scale (no reflection, no shear).
    fn is_similarity(&self) -> bool {
        let tol = EPS * (1.0 + self.a.abs().max(self.b.abs()));
        (self.a - self.d).abs() <= tol && (self.b + self.c).abs() <= tol
    }

    /// The transform as an SVG `matrix(...)` value.
    pub fn to_svg(&self) -> String {
        self.to_string()
    }
}

/// Apply `t1`, then `t2`: the matrix product `M2 · M1`.
///
/// Composing with the identity returns the other operand unchanged.
pub fn compose(t1: Affine, t2: Affine) -> Affine {
    if t1.is_identity() {
        return t2;
    }
    if t2.is_identity() {
        return t1;
    }
    t2 * t1
}

impl Mul for Affine {
    type Output = Affine;

    /// Matrix product: `(self * rhs)` applies `rhs` first.
    fn mul(self, r: Affine) -> Affine {
        let s = self;
        Affine::new(
            s.a * r.a + s.c * r.b,
            s.b * r.a + s.d * r.b,
            s.a * r.c + s.c * r.d,
            s.b * r.c + s.d * r.d,
            s.a * r.e + s.c * r.f + s.e,
            s.b * r.e + s.d * r.f + s.f,
        )
    }
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `+ 0.0` turns -0 into 0
        write!(
            f,
            "matrix({},{},{},{},{},{})",
            self.a + 0.0,
            self.b + 0.0,
            self.c + 0.0,
            self.d + 0.0,
            self.e + 0.0,
            self.f + 0.0
        )
    }
}

impl FromStr for Affine {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Affine::parse(s)
    }
}

/// Sine and cosine of an angle in degrees, exact for multiples of 90.
fn sin_cos_degrees(degrees: f64) -> (f64, f64) {
    let turned = degrees.rem_euclid(360.0);
    if turned == 0.0 {
        (0.0, 1.0)
    } else if turned == 90.0 {
        (1.0, 0.0)
    } else if turned == 180.0 {
        (0.0, -1.0)
    } else if turned == 270.0 {
        (-1.0, 0.0)
    } else {
        degrees.to_radians().sin_cos()
    }
}

// ============================================================================
// Attribute parser errors
// ============================================================================

/// Maps an svgtypes error onto [`TransformError`]. svgtypes reports 1-based
/// character positions; ours are byte offsets into `text`.
fn transform_error(text: &str, err: svgtypes::Error) -> TransformError {
    let byte_offset = |pos: usize| {
        text.char_indices().nth(pos.saturating_sub(1)).map_or(text.len(), |(i, _)| i)
    };
    let offset = match &err {
        svgtypes::Error::UnexpectedData(pos) => {
            let offset = byte_offset(*pos);
            let name: String = text[offset..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
                .collect();
            if !name.is_empty() {
                return TransformError::UnknownFunction { name, offset };
            }
            offset
        }
        svgtypes::Error::InvalidChar(_, pos)
        | svgtypes::Error::InvalidString(_, pos)
        | svgtypes::Error::InvalidNumber(pos) => byte_offset(*pos),
        _ => text.len(),
    };
    TransformError::Syntax { offset, message: err.to_string() }
}

// ============================================================================
// TESTS
// ============================================================================
