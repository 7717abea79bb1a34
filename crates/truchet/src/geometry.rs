//! Core geometry types for truchet.
//!
//! Everything the engines work on lives here: [`Point`], the four kinds of
//! [`Segment`] an SVG path can contain, and [`Path`], one continuous subpath.
//!
//! ## Rust Lesson #3: Enums with data
//!
//! A `Segment` is either a line, a cubic, a quadratic or an arc. In JS you'd
//! tag an object with `type: "line"` and hope every caller checks it.
//! A Rust `enum` carries the data per variant, and `match` must cover every
//! variant - forget arcs somewhere and the compiler tells you.

use std::ops::{Add, Mul, Neg, Sub};

use lyon_geom::{point, vector, Angle, ArcFlags, CubicBezierSegment, QuadraticBezierSegment, SvgArc};

/// Distances at or below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// A 2D point (or vector) with x,y coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Length when the point is read as a vector from the origin.
    #[inline]
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    #[inline]
    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector in the same direction, or `None` for a zero vector.
    #[inline]
    pub fn normalized(&self) -> Option<Point> {
        let len = self.length();
        if len <= EPSILON || !len.is_finite() {
            None
        } else {
            Some(Point::new(self.x / len, self.y / len))
        }
    }

    /// The vector rotated a quarter turn: `(-y, x)`.
    #[inline]
    pub fn perp(&self) -> Point {
        Point::new(-self.y, self.x)
    }

    /// Rotate the vector by `angle` radians.
    #[inline]
    pub fn rotated(&self, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// An SVG elliptical arc in endpoint parameterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSegment {
    pub from: Point,
    pub to: Point,
    pub rx: f64,
    pub ry: f64,
    /// Rotation of the ellipse x-axis, in degrees.
    pub x_rotation: f64,
    pub large_arc: bool,
    pub sweep: bool,
}

impl ArcSegment {
    fn to_lyon(&self) -> SvgArc<f64> {
        SvgArc {
            from: point(self.from.x, self.from.y),
            to: point(self.to.x, self.to.y),
            radii: vector(self.rx, self.ry),
            x_rotation: Angle::degrees(self.x_rotation),
            flags: ArcFlags {
                large_arc: self.large_arc,
                sweep: self.sweep,
            },
        }
    }
}

/// One drawable piece of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line { from: Point, to: Point },
    Cubic { from: Point, ctrl1: Point, ctrl2: Point, to: Point },
    Quadratic { from: Point, ctrl: Point, to: Point },
    Arc(ArcSegment),
}

impl Segment {
    #[inline]
    pub fn line(from: Point, to: Point) -> Self {
        Segment::Line { from, to }
    }

    pub fn start(&self) -> Point {
        match *self {
            Segment::Line { from, .. }
            | Segment::Cubic { from, .. }
            | Segment::Quadratic { from, .. } => from,
            Segment::Arc(arc) => arc.from,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            Segment::Line { to, .. } | Segment::Cubic { to, .. } | Segment::Quadratic { to, .. } => to,
            Segment::Arc(arc) => arc.to,
        }
    }

    /// The same geometry traversed the other way.
    pub fn reversed(&self) -> Segment {
        match *self {
            Segment::Line { from, to } => Segment::Line { from: to, to: from },
            Segment::Cubic { from, ctrl1, ctrl2, to } => Segment::Cubic {
                from: to,
                ctrl1: ctrl2,
                ctrl2: ctrl1,
                to: from,
            },
            Segment::Quadratic { from, ctrl, to } => Segment::Quadratic { from: to, ctrl, to: from },
            Segment::Arc(arc) => Segment::Arc(ArcSegment {
                from: arc.to,
                to: arc.from,
                sweep: !arc.sweep,
                ..arc
            }),
        }
    }

    /// Copy of the segment with its first point moved to `start`.
    pub fn with_start(&self, start: Point) -> Segment {
        match *self {
            Segment::Line { to, .. } => Segment::Line { from: start, to },
            Segment::Cubic { ctrl1, ctrl2, to, .. } => Segment::Cubic { from: start, ctrl1, ctrl2, to },
            Segment::Quadratic { ctrl, to, .. } => Segment::Quadratic { from: start, ctrl, to },
            Segment::Arc(arc) => Segment::Arc(ArcSegment { from: start, ..arc }),
        }
    }

    /// Append points along the segment to `out`, excluding the start point.
    ///
    /// Lines contribute their end point only. Curves and arcs are sampled at
    /// `samples` evenly spaced parameter values; the last sample is always the
    /// exact end point.
    pub fn flatten_into(&self, samples: usize, out: &mut Vec<Point>) {
        let samples = samples.max(1);
        match *self {
            Segment::Line { to, .. } => out.push(to),
            Segment::Cubic { from, ctrl1, ctrl2, to } => {
                let curve = CubicBezierSegment {
                    from: point(from.x, from.y),
                    ctrl1: point(ctrl1.x, ctrl1.y),
                    ctrl2: point(ctrl2.x, ctrl2.y),
                    to: point(to.x, to.y),
                };
                for i in 1..samples {
                    let p = curve.sample(i as f64 / samples as f64);
                    out.push(Point::new(p.x, p.y));
                }
                out.push(to);
            }
            Segment::Quadratic { from, ctrl, to } => {
                let curve = QuadraticBezierSegment {
                    from: point(from.x, from.y),
                    ctrl: point(ctrl.x, ctrl.y),
                    to: point(to.x, to.y),
                };
                for i in 1..samples {
                    let p = curve.sample(i as f64 / samples as f64);
                    out.push(Point::new(p.x, p.y));
                }
                out.push(to);
            }
            Segment::Arc(arc) => {
                let svg_arc = arc.to_lyon();
                // Zero radii or coincident endpoints: SVG draws a straight line (or nothing).
                if !svg_arc.is_straight_line() {
                    let centered = svg_arc.to_arc();
                    for i in 1..samples {
                        let p = centered.sample(i as f64 / samples as f64);
                        out.push(Point::new(p.x, p.y));
                    }
                }
                out.push(arc.to);
            }
        }
    }
}

/// One continuous subpath: segments drawn end to end.
///
/// A path has two free endpoints unless it is a loop (see [`Path::is_loop`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub segments: Vec<Segment>,
    /// Ends with a `Z` command.
    pub closed: bool,
}

impl Path {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments, closed: false }
    }

    /// Build a path of straight lines through `points`.
    ///
    /// When `closed` is set a closing line back to the first point is added
    /// (unless the points already end where they started).
    pub fn from_polyline(points: &[Point], closed: bool) -> Self {
        let mut segments: Vec<Segment> = points.windows(2).map(|w| Segment::line(w[0], w[1])).collect();
        if closed {
            if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
                if points.len() > 1 && first != last {
                    segments.push(Segment::line(last, first));
                }
            }
        }
        Self { segments, closed }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn start(&self) -> Option<Point> {
        self.segments.first().map(Segment::start)
    }

    pub fn end(&self) -> Option<Point> {
        self.segments.last().map(Segment::end)
    }

    /// True when the path has no free endpoints: either it is explicitly
    /// closed, or its ends lie within `tolerance` of each other.
    pub fn is_loop(&self, tolerance: f64) -> bool {
        if self.closed {
            return true;
        }
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => start.distance(end) <= tolerance,
            _ => false,
        }
    }

    /// The path traversed from its end to its start.
    pub fn reversed(&self) -> Path {
        Path {
            segments: self.segments.iter().rev().map(Segment::reversed).collect(),
            closed: self.closed,
        }
    }

    /// Append `other` so it continues from this path's end.
    ///
    /// The first segment of `other` is re-anchored on the current end point,
    /// so the result has no gap even when the two ends were only close.
    pub fn extend_continuous(&mut self, other: Path) {
        let Some(end) = self.end() else {
            self.segments = other.segments;
            return;
        };
        let mut segments = other.segments.into_iter();
        if let Some(first) = segments.next() {
            self.segments.push(first.with_start(end));
        }
        self.segments.extend(segments);
    }

    /// On-curve nodes: the start point plus one per segment.
    pub fn node_count(&self) -> usize {
        if self.segments.is_empty() { 0 } else { self.segments.len() + 1 }
    }

    /// Approximate the path by a polyline.
    pub fn flatten(&self, samples: usize) -> Vec<Point> {
        let mut points = Vec::new();
        for segment in &self.segments {
            let start = segment.start();
            if points.last() != Some(&start) {
                points.push(start);
            }
            segment.flatten_into(samples, &mut points);
        }
        points
    }

    /// Approximate arc length.
    pub fn length(&self, samples: usize) -> f64 {
        self.flatten(samples).windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Bounding box of the flattened path as (min_x, min_y, max_x, max_y).
    pub fn bounding_box(&self, samples: usize) -> Option<(f64, f64, f64, f64)> {
        bounding_box_of_points(&self.flatten(samples))
    }
}

/// Bounding box of a point set as (min_x, min_y, max_x, max_y).
pub fn bounding_box_of_points(points: &[Point]) -> Option<(f64, f64, f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    Some((min_x, min_y, max_x, max_y))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
        Segment::line(Point::new(x1, y1), Point::new(x2, y2))
    }

    #[test]
    fn point_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert_eq!(p1.distance(p2), 5.0);
    }

    #[test]
    fn zero_vector_has_no_direction() {
        assert_eq!(Point::ORIGIN.normalized(), None);
        let unit = Point::new(0.0, 2.0).normalized().unwrap();
        assert_eq!(unit, Point::new(0.0, 1.0));
    }

    #[test]
    fn reversing_a_cubic_swaps_controls() {
        let seg = Segment::Cubic {
            from: Point::new(0.0, 0.0),
            ctrl1: Point::new(1.0, 1.0),
            ctrl2: Point::new(2.0, 1.0),
            to: Point::new(3.0, 0.0),
        };
        let rev = seg.reversed();
        assert_eq!(rev.start(), Point::new(3.0, 0.0));
        assert_eq!(rev.end(), Point::new(0.0, 0.0));
        assert!(matches!(rev, Segment::Cubic { ctrl1, .. } if ctrl1 == Point::new(2.0, 1.0)));
        assert_eq!(rev.reversed(), seg);
    }

    #[test]
    fn reversing_an_arc_flips_sweep() {
        let arc = ArcSegment {
            from: Point::new(1.0, 0.0),
            to: Point::new(0.0, 1.0),
            rx: 1.0,
            ry: 1.0,
            x_rotation: 0.0,
            large_arc: false,
            sweep: true,
        };
        match Segment::Arc(arc).reversed() {
            Segment::Arc(rev) => {
                assert_eq!(rev.from, arc.to);
                assert!(!rev.sweep);
                assert!(!rev.large_arc);
            }
            other => panic!("expected arc, got {:?}", other),
        }
    }

    #[test]
    fn path_endpoints_and_loops() {
        let open = Path::new(vec![line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 1.0, 1.0)]);
        assert_eq!(open.start(), Some(Point::new(0.0, 0.0)));
        assert_eq!(open.end(), Some(Point::new(1.0, 1.0)));
        assert!(!open.is_loop(0.1));

        let nearly = Path::new(vec![line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 0.05, 0.0)]);
        assert!(nearly.is_loop(0.1));
        assert!(!nearly.is_loop(0.01));

        assert!(!Path::default().is_loop(1.0));
        assert_eq!(Path::default().start(), None);
    }

    #[test]
    fn extend_continuous_snaps_the_join() {
        let mut a = Path::new(vec![line(0.0, 0.0, 1.0, 0.0)]);
        let b = Path::new(vec![line(1.05, 0.0, 2.0, 0.0)]);
        a.extend_continuous(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.segments[1].start(), Point::new(1.0, 0.0));
        assert_eq!(a.end(), Some(Point::new(2.0, 0.0)));
    }

    #[test]
    fn polyline_closes_back_to_start() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let path = Path::from_polyline(&pts, true);
        assert_eq!(path.len(), 3);
        assert!(path.closed);
        assert_eq!(path.end(), path.start());
    }

    #[test]
    fn flattened_arc_stays_on_circle() {
        let arc = Segment::Arc(ArcSegment {
            from: Point::new(1.0, 0.0),
            to: Point::new(-1.0, 0.0),
            rx: 1.0,
            ry: 1.0,
            x_rotation: 0.0,
            large_arc: false,
            sweep: true,
        });
        let mut pts = Vec::new();
        arc.flatten_into(16, &mut pts);
        assert_eq!(pts.len(), 16);
        for p in &pts {
            assert_relative_eq!(p.length(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(*pts.last().unwrap(), Point::new(-1.0, 0.0));
    }

    #[test]
    fn half_circle_length() {
        let path = Path::new(vec![Segment::Arc(ArcSegment {
            from: Point::new(1.0, 0.0),
            to: Point::new(-1.0, 0.0),
            rx: 1.0,
            ry: 1.0,
            x_rotation: 0.0,
            large_arc: false,
            sweep: true,
        })]);
        assert_relative_eq!(path.length(256), std::f64::consts::PI, epsilon = 1e-3);
    }

    #[test]
    fn bbox_of_lines() {
        let path = Path::new(vec![line(0.0, 0.0, 10.0, 0.0), line(10.0, 0.0, 10.0, 5.0)]);
        assert_eq!(path.bounding_box(8), Some((0.0, 0.0, 10.0, 5.0)));
        assert_eq!(Path::default().bounding_box(8), None);
    }
}
