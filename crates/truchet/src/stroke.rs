//! Stroke expansion - turn a stroked centerline into a filled outline.
//!
//! CAD tools and cutters ignore `stroke-width`; they only see geometry.
//! [`stroke_with`] replaces a centerline by the outline of the area its
//! stroke covers, so the result can be rendered as a plain fill.
//!
//! The outline is an approximation: curves are sampled into polylines, each
//! edge is offset by half the width to either side, and corners and ends are
//! finished with the configured [`LineJoin`] and [`LineCap`].

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::geometry::{EPSILON, Path, Point};

/// Angle covered by one step of a round join or cap.
const ROUND_STEP: f64 = std::f64::consts::PI / 8.0;

/// How open ends of a stroke are finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    /// Flat end exactly at the endpoint.
    Butt,
    /// Half circle around the endpoint.
    #[default]
    Round,
    /// Flat end extended by half the width.
    Square,
}

/// How corners between consecutive edges are finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Straight cut across the outer corner.
    Bevel,
    #[default]
    Round,
}

/// Parameters for stroke expansion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Samples per curve or arc segment when flattening the centerline.
    pub curve_samples: usize,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: LineCap::default(),
            join: LineJoin::default(),
            curve_samples: 16,
        }
    }
}

impl StrokeStyle {
    pub fn with_width(width: f64) -> Self {
        Self { width, ..Self::default() }
    }
}

/// The filled outline of a stroke.
///
/// An open centerline gives one closed contour. A closed centerline gives
/// two: one ring on each side, wound in opposite directions.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeOutline {
    pub contours: Vec<Path>,
}

/// Outline of `path` stroked with `width` and the default caps and joins.
pub fn stroke_to_path(path: &Path, width: f64) -> Result<StrokeOutline, GeometryError> {
    stroke_with(path, &StrokeStyle::with_width(width))
}

/// Outline every path, keeping failures per path.
pub fn stroke_all(paths: &[Path], style: &StrokeStyle) -> Vec<Result<StrokeOutline, GeometryError>> {
    paths.iter().map(|p| stroke_with(p, style)).collect()
}

/// Outline of `path` stroked with `style`.
pub fn stroke_with(path: &Path, style: &StrokeStyle) -> Result<StrokeOutline, GeometryError> {
    if !(style.width.is_finite() && style.width > 0.0) {
        return Err(GeometryError::InvalidWidth(style.width));
    }

    let mut points = centerline(path, style.curve_samples);
    let is_loop = path.closed && {
        if points.len() > 1 && points[0].distance(points[points.len() - 1]) <= EPSILON {
            points.pop();
        }
        points.len() >= 3
    };

    if points.len() < 2 {
        return Err(GeometryError::Degenerate("stroked path has zero length".to_string()));
    }

    let stroker = Stroker::new(&points, is_loop, style)?;
    let contours = if is_loop {
        let left = stroker.side(1.0);
        let mut right = stroker.side(-1.0);
        right.reverse();
        vec![Path::from_polyline(&left, true), Path::from_polyline(&right, true)]
    } else {
        vec![Path::from_polyline(&stroker.open_outline(), true)]
    };

    Ok(StrokeOutline { contours })
}

/// Flattened centerline without zero-length pieces.
fn centerline(path: &Path, samples: usize) -> Vec<Point> {
    let mut points = path.flatten(samples);
    points.dedup_by(|a, b| a.distance(*b) <= EPSILON);
    points
}

struct Stroker<'a> {
    points: &'a [Point],
    /// Unit direction of each edge; a loop has one extra edge back to the start.
    dirs: Vec<Point>,
    lengths: Vec<f64>,
    is_loop: bool,
    half: f64,
    style: &'a StrokeStyle,
}

impl<'a> Stroker<'a> {
    fn new(points: &'a [Point], is_loop: bool, style: &'a StrokeStyle) -> Result<Self, GeometryError> {
        let edge_count = if is_loop { points.len() } else { points.len() - 1 };
        let mut dirs = Vec::with_capacity(edge_count);
        let mut lengths = Vec::with_capacity(edge_count);
        for i in 0..edge_count {
            let delta = points[(i + 1) % points.len()] - points[i];
            let dir = delta
                .normalized()
                .ok_or_else(|| GeometryError::Degenerate("zero-length edge".to_string()))?;
            dirs.push(dir);
            lengths.push(delta.length());
        }
        Ok(Self { points, dirs, lengths, is_loop, half: style.width / 2.0, style })
    }

    /// Offset polyline on one side: `sign` +1 follows the normal `perp(dir)`,
    /// -1 the opposite side.
    fn side(&self, sign: f64) -> Vec<Point> {
        let mut out = Vec::new();
        let n = self.points.len();

        if self.is_loop {
            for k in 0..n {
                let prev = (k + n - 1) % n;
                self.corner(k, prev, k, sign, &mut out);
            }
            return out;
        }

        let last = self.dirs.len() - 1;
        out.push(self.points[0] + self.dirs[0].perp() * (sign * self.half));
        for k in 1..n - 1 {
            self.corner(k, k - 1, k, sign, &mut out);
        }
        out.push(self.points[n - 1] + self.dirs[last].perp() * (sign * self.half));
        out
    }

    /// Offset points around vertex `k` between edges `prev` and `next`.
    fn corner(&self, k: usize, prev: usize, next: usize, sign: f64, out: &mut Vec<Point>) {
        let p = self.points[k];
        let (d0, d1) = (self.dirs[prev], self.dirs[next]);
        let u = d0.perp() * sign;
        let v = d1.perp() * sign;
        let a = p + u * self.half;
        let b = p + v * self.half;

        let turn = d0.cross(d1);
        let reversal = turn.abs() <= EPSILON && d0.dot(d1) < 0.0;
        if a.distance(b) <= EPSILON {
            out.push(a);
            return;
        }

        let outer = sign * turn < 0.0 || reversal;
        if !outer {
            // Inner side: meet at the intersection of the two offset lines
            // when it stays within both edges.
            let denom = 1.0 + u.dot(v);
            if denom > EPSILON {
                let miter = p + (u + v) * (self.half / denom);
                if miter.distance(p) <= self.lengths[prev].min(self.lengths[next]) {
                    out.push(miter);
                    return;
                }
            }
            out.push(a);
            out.push(b);
            return;
        }

        out.push(a);
        if self.style.join == LineJoin::Round {
            let delta = if reversal { -sign * std::f64::consts::PI } else { turn.atan2(d0.dot(d1)) };
            let steps = (delta.abs() / ROUND_STEP).ceil().max(1.0) as usize;
            for i in 1..steps {
                let angle = delta * i as f64 / steps as f64;
                out.push(p + u.rotated(angle) * self.half);
            }
        }
        out.push(b);
    }

    /// Single closed contour around an open centerline.
    fn open_outline(&self) -> Vec<Point> {
        let n = self.points.len();
        let last = self.dirs.len() - 1;

        let mut outline = self.side(-1.0);
        // end cap: from the right side over to the left side
        self.cap(self.points[n - 1], self.dirs[last], -self.dirs[last].perp(), &mut outline);

        let mut left = self.side(1.0);
        left.reverse();
        outline.extend(left);
        // start cap: walking backwards, from the left side to the right side
        self.cap(self.points[0], -self.dirs[0], self.dirs[0].perp(), &mut outline);
        outline
    }

    /// Points strictly between `c + from*h` and `c - from*h`, bulging along `tangent`.
    fn cap(&self, c: Point, tangent: Point, from: Point, out: &mut Vec<Point>) {
        let h = self.half;
        match self.style.cap {
            LineCap::Butt => {}
            LineCap::Square => {
                out.push(c + from * h + tangent * h);
                out.push(c - from * h + tangent * h);
            }
            LineCap::Round => {
                let steps = (std::f64::consts::PI / ROUND_STEP).ceil() as usize;
                for i in 1..steps {
                    let phi = std::f64::consts::PI * i as f64 / steps as f64;
                    out.push(c + (from * phi.cos() + tangent * phi.sin()) * h);
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ArcSegment, Segment};
    use approx::assert_relative_eq;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Path {
        Path::new(vec![Segment::line(Point::new(x1, y1), Point::new(x2, y2))])
    }

    fn style(width: f64, cap: LineCap, join: LineJoin) -> StrokeStyle {
        StrokeStyle { width, cap, join, curve_samples: 16 }
    }

    #[test]
    fn butt_caps_give_exact_rectangle() {
        let outline = stroke_with(&line(0.0, 0.0, 10.0, 0.0), &style(2.0, LineCap::Butt, LineJoin::Round)).unwrap();
        assert_eq!(outline.contours.len(), 1);
        let contour = &outline.contours[0];
        assert!(contour.closed);
        assert_eq!(contour.len(), 4);
        assert_eq!(contour.bounding_box(1), Some((0.0, -1.0, 10.0, 1.0)));
    }

    #[test]
    fn zero_length_middle_segment_is_skipped() {
        let path = crate::path_data::parse_path_data("M 0 0 L 5 0 L 5 0 L 10 0").unwrap().remove(0);
        let outline = stroke_with(&path, &style(2.0, LineCap::Butt, LineJoin::Round)).unwrap();
        assert_eq!(outline.contours.len(), 1);
        let contour = &outline.contours[0];
        assert!(contour.flatten(16).iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert_eq!(contour.bounding_box(16), Some((0.0, -1.0, 10.0, 1.0)));
    }

    #[test]
    fn round_caps_extend_by_half_width() {
        let outline = stroke_to_path(&line(0.0, 0.0, 10.0, 0.0), 2.0).unwrap();
        let (min_x, min_y, max_x, max_y) = outline.contours[0].bounding_box(1).unwrap();
        assert_relative_eq!(min_x, -1.0, epsilon = 1e-9);
        assert_relative_eq!(max_x, 11.0, epsilon = 1e-9);
        assert_relative_eq!(min_y, -1.0, epsilon = 1e-9);
        assert_relative_eq!(max_y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn square_caps_extend_by_half_width() {
        let outline = stroke_with(&line(0.0, 0.0, 0.0, 4.0), &style(1.0, LineCap::Square, LineJoin::Bevel)).unwrap();
        let bbox = outline.contours[0].bounding_box(1).unwrap();
        assert_eq!(bbox, (-0.5, -0.5, 0.5, 4.5));
    }

    #[test]
    fn outline_points_keep_half_width_from_line() {
        let outline = stroke_to_path(&line(0.0, 0.0, 10.0, 0.0), 3.0).unwrap();
        for p in outline.contours[0].flatten(1) {
            let to_segment = if p.x < 0.0 {
                p.length()
            } else if p.x > 10.0 {
                p.distance(Point::new(10.0, 0.0))
            } else {
                p.y.abs()
            };
            assert_relative_eq!(to_segment, 1.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn closed_path_gives_two_contours() {
        let square = Path::from_polyline(
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            true,
        );
        let outline = stroke_to_path(&square, 2.0).unwrap();
        assert_eq!(outline.contours.len(), 2);
        assert!(outline.contours.iter().all(|c| c.closed));

        let mut boxes: Vec<_> = outline.contours.iter().map(|c| c.bounding_box(1).unwrap()).collect();
        boxes.sort_by(|a, b| (a.2 - a.0).total_cmp(&(b.2 - b.0)));
        let (inner, outer) = (boxes[0], boxes[1]);
        assert_relative_eq!(inner.0, 1.0, epsilon = 1e-9);
        assert_relative_eq!(inner.1, 1.0, epsilon = 1e-9);
        assert_relative_eq!(inner.2, 9.0, epsilon = 1e-9);
        assert_relative_eq!(inner.3, 9.0, epsilon = 1e-9);
        assert_relative_eq!(outer.0, -1.0, epsilon = 1e-9);
        assert_relative_eq!(outer.3, 11.0, epsilon = 1e-9);
    }

    #[test]
    fn bevel_join_cuts_the_corner() {
        let corner = Path::from_polyline(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
            false,
        );
        let bevel = stroke_with(&corner, &style(2.0, LineCap::Butt, LineJoin::Bevel)).unwrap();
        let round = stroke_with(&corner, &style(2.0, LineCap::Butt, LineJoin::Round)).unwrap();
        assert!(round.contours[0].len() > bevel.contours[0].len());
        // the rounded corner stays inside the same box as the bevel
        for outline in [&bevel, &round] {
            let (min_x, min_y, max_x, max_y) = outline.contours[0].bounding_box(1).unwrap();
            assert_relative_eq!(min_x, 0.0, epsilon = 1e-9);
            assert_relative_eq!(min_y, -1.0, epsilon = 1e-9);
            assert_relative_eq!(max_x, 11.0, epsilon = 1e-9);
            assert_relative_eq!(max_y, 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn curves_are_flattened() {
        let arc = Path::new(vec![Segment::Arc(ArcSegment {
            from: Point::new(10.0, 0.0),
            to: Point::new(-10.0, 0.0),
            rx: 10.0,
            ry: 10.0,
            x_rotation: 0.0,
            large_arc: false,
            sweep: true,
        })]);
        let outline = stroke_with(&arc, &style(2.0, LineCap::Butt, LineJoin::Round)).unwrap();
        for p in outline.contours[0].flatten(1) {
            let r = p.length();
            // inner corners sit slightly inside the offset circle
            assert!((8.9..=11.0 + 1e-9).contains(&r), "radius {} outside the stroke", r);
        }
    }

    #[test]
    fn degenerate_path_is_an_error() {
        let dot = line(5.0, 5.0, 5.0, 5.0);
        assert!(matches!(stroke_to_path(&dot, 1.0), Err(GeometryError::Degenerate(_))));
        assert!(matches!(stroke_to_path(&Path::default(), 1.0), Err(GeometryError::Degenerate(_))));
    }

    #[test]
    fn invalid_width_is_an_error() {
        let path = line(0.0, 0.0, 1.0, 0.0);
        for width in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(stroke_to_path(&path, width), Err(GeometryError::InvalidWidth(_))));
        }
    }

    #[test]
    fn stroke_all_keeps_failures_per_path() {
        let paths = vec![line(0.0, 0.0, 1.0, 0.0), Path::default()];
        let results = stroke_all(&paths, &StrokeStyle::default());
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
