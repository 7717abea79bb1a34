//! Path data - convert between `d` attributes / basic shapes and [`Path`]s.
//!
//! Parsing resolves relative coordinates and the shorthand commands
//! (`H`, `V`, `S`, `T`) but keeps elliptical arcs as arcs, so transforms
//! and joins see the real geometry.

use std::str::FromStr;

use svgtypes::{Length, LengthUnit, PathParser, PathSegment, PointsParser};

use crate::error::SvgError;
use crate::geometry::{ArcSegment, Path, Point, Segment};
use crate::svg::Element;

/// Parse a `d` attribute into one [`Path`] per subpath.
///
/// `Z` sets the closed flag and adds an explicit closing line when the
/// subpath does not already end at its start. Subpaths without drawing
/// commands (a bare `M`) are dropped.
pub fn parse_path_data(d: &str) -> Result<Vec<Path>, SvgError> {
    let mut builder = PathBuilder::default();

    for segment in PathParser::from(d) {
        let segment = segment.map_err(|err| SvgError::PathData(err.to_string()))?;
        builder.push(segment);
    }

    Ok(builder.finish())
}

#[derive(Default)]
struct PathBuilder {
    paths: Vec<Path>,
    current: Path,
    pos: Point,
    start: Point,
    /// Second control point of the previous cubic, for `S`.
    last_cubic_ctrl: Option<Point>,
    /// Control point of the previous quadratic, for `T`.
    last_quad_ctrl: Option<Point>,
}

impl PathBuilder {
    fn resolve(&self, abs: bool, x: f64, y: f64) -> Point {
        if abs { Point::new(x, y) } else { Point::new(self.pos.x + x, self.pos.y + y) }
    }

    fn flush(&mut self) {
        let path = std::mem::take(&mut self.current);
        if !path.is_empty() {
            self.paths.push(path);
        }
    }

    fn add(&mut self, segment: Segment) {
        if self.current.closed {
            // drawing straight after Z starts a new subpath at the old start
            self.flush();
        }
        self.pos = segment.end();
        self.current.segments.push(segment);
    }

    fn push(&mut self, segment: PathSegment) {
        let from = self.pos;
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        match segment {
            PathSegment::MoveTo { abs, x, y } => {
                self.flush();
                self.pos = self.resolve(abs, x, y);
                self.start = self.pos;
            }
            PathSegment::LineTo { abs, x, y } => {
                let to = self.resolve(abs, x, y);
                self.add(Segment::Line { from, to });
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                let to = Point::new(if abs { x } else { from.x + x }, from.y);
                self.add(Segment::Line { from, to });
            }
            PathSegment::VerticalLineTo { abs, y } => {
                let to = Point::new(from.x, if abs { y } else { from.y + y });
                self.add(Segment::Line { from, to });
            }
            PathSegment::CurveTo { abs, x1, y1, x2, y2, x, y } => {
                let ctrl1 = self.resolve(abs, x1, y1);
                let ctrl2 = self.resolve(abs, x2, y2);
                let to = self.resolve(abs, x, y);
                self.add(Segment::Cubic { from, ctrl1, ctrl2, to });
                cubic_ctrl = Some(ctrl2);
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let ctrl1 = self.last_cubic_ctrl.map_or(from, |c| from + (from - c));
                let ctrl2 = self.resolve(abs, x2, y2);
                let to = self.resolve(abs, x, y);
                self.add(Segment::Cubic { from, ctrl1, ctrl2, to });
                cubic_ctrl = Some(ctrl2);
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let ctrl = self.resolve(abs, x1, y1);
                let to = self.resolve(abs, x, y);
                self.add(Segment::Quadratic { from, ctrl, to });
                quad_ctrl = Some(ctrl);
            }
            PathSegment::SmoothQuadratic { abs, x, y } => {
                let ctrl = self.last_quad_ctrl.map_or(from, |c| from + (from - c));
                let to = self.resolve(abs, x, y);
                self.add(Segment::Quadratic { from, ctrl, to });
                quad_ctrl = Some(ctrl);
            }
            PathSegment::EllipticalArc { abs, rx, ry, x_axis_rotation, large_arc, sweep, x, y } => {
                let to = self.resolve(abs, x, y);
                self.add(Segment::Arc(ArcSegment {
                    from,
                    to,
                    rx: rx.abs(),
                    ry: ry.abs(),
                    x_rotation: x_axis_rotation,
                    large_arc,
                    sweep,
                }));
            }
            PathSegment::ClosePath { .. } => {
                if !self.current.is_empty() && !self.current.closed {
                    if self.pos != self.start {
                        self.current.segments.push(Segment::line(self.pos, self.start));
                    }
                    self.current.closed = true;
                }
                self.pos = self.start;
            }
        }

        self.last_cubic_ctrl = cubic_ctrl;
        self.last_quad_ctrl = quad_ctrl;
    }

    fn finish(mut self) -> Vec<Path> {
        self.flush();
        self.paths
    }
}

/// Format a number for path data: fixed `precision` with trailing zeros
/// trimmed, or the shortest exact representation.
pub fn fmt_num(value: f64, precision: Option<usize>) -> String {
    let text = match precision {
        Some(p) => {
            let fixed = format!("{:.*}", p, value);
            if fixed.contains('.') {
                fixed.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                fixed
            }
        }
        None => format!("{}", value),
    };
    if text == "-0" { "0".to_string() } else { text }
}

/// Serialize paths as a `d` attribute, one `M` per path.
pub fn write_path_data(paths: &[Path], precision: Option<usize>) -> String {
    let n = |v: f64| fmt_num(v, precision);
    let pt = |p: Point| format!("{},{}", n(p.x), n(p.y));

    let mut parts = Vec::new();
    for path in paths {
        let Some(start) = path.start() else {
            continue;
        };
        parts.push(format!("M {}", pt(start)));
        for segment in &path.segments {
            parts.push(match *segment {
                Segment::Line { to, .. } => format!("L {}", pt(to)),
                Segment::Cubic { ctrl1, ctrl2, to, .. } => {
                    format!("C {} {} {}", pt(ctrl1), pt(ctrl2), pt(to))
                }
                Segment::Quadratic { ctrl, to, .. } => format!("Q {} {}", pt(ctrl), pt(to)),
                Segment::Arc(arc) => format!(
                    "A {} {} {} {} {} {}",
                    n(arc.rx),
                    n(arc.ry),
                    n(arc.x_rotation),
                    u8::from(arc.large_arc),
                    u8::from(arc.sweep),
                    pt(arc.to)
                ),
            });
        }
        if path.closed {
            parts.push("Z".to_string());
        }
    }
    parts.join(" ")
}

/// Shape elements that [`shape_to_paths`] understands.
pub const SHAPE_ELEMENTS: [&str; 7] = ["path", "line", "polyline", "polygon", "rect", "circle", "ellipse"];

pub fn is_shape(element: &Element) -> bool {
    SHAPE_ELEMENTS.contains(&element.local_name())
}

/// Geometry attributes of the basic shapes; removed when a shape is baked
/// into a `<path>`.
pub const GEOMETRY_ATTRIBUTES: [&str; 14] = [
    "d", "x", "y", "width", "height", "rx", "ry", "cx", "cy", "r", "x1", "y1", "x2", "y2",
];

/// The outline of a basic shape in its own user space.
///
/// Returns `None` for elements that are not shapes. Shapes that SVG does
/// not render (zero width, zero radius, fewer than two points) give an
/// empty list.
pub fn shape_to_paths(element: &Element) -> Option<Result<Vec<Path>, SvgError>> {
    let result = match element.local_name() {
        "path" => element.attr("d").map_or(Ok(Vec::new()), parse_path_data),
        "line" => line_paths(element),
        "polyline" => points_paths(element, false),
        "polygon" => points_paths(element, true),
        "rect" => rect_paths(element),
        "circle" => length(element, "r", 0.0).and_then(|r| ellipse_paths(element, r, r)),
        "ellipse" => length(element, "rx", 0.0)
            .and_then(|rx| length(element, "ry", 0.0).map(|ry| (rx, ry)))
            .and_then(|(rx, ry)| ellipse_paths(element, rx, ry)),
        _ => return None,
    };
    Some(result)
}

/// A length attribute in user units.
pub fn length(element: &Element, name: &str, default: f64) -> Result<f64, SvgError> {
    let Some(value) = element.attr(name) else {
        return Ok(default);
    };
    let invalid = || SvgError::InvalidAttribute { name: name.to_string(), value: value.to_string() };
    let parsed = Length::from_str(value).map_err(|_| invalid())?;
    match parsed.unit {
        LengthUnit::None | LengthUnit::Px if parsed.number.is_finite() => Ok(parsed.number),
        _ => Err(invalid()),
    }
}

fn line_paths(element: &Element) -> Result<Vec<Path>, SvgError> {
    let from = Point::new(length(element, "x1", 0.0)?, length(element, "y1", 0.0)?);
    let to = Point::new(length(element, "x2", 0.0)?, length(element, "y2", 0.0)?);
    Ok(vec![Path::new(vec![Segment::line(from, to)])])
}

fn points_paths(element: &Element, closed: bool) -> Result<Vec<Path>, SvgError> {
    let points: Vec<Point> = PointsParser::from(element.attr("points").unwrap_or(""))
        .map(|(x, y)| Point::new(x, y))
        .collect();
    if points.len() < 2 {
        return Ok(Vec::new());
    }
    Ok(vec![Path::from_polyline(&points, closed)])
}

fn rect_paths(element: &Element) -> Result<Vec<Path>, SvgError> {
    let x = length(element, "x", 0.0)?;
    let y = length(element, "y", 0.0)?;
    let w = length(element, "width", 0.0)?;
    let h = length(element, "height", 0.0)?;
    if w <= 0.0 || h <= 0.0 {
        return Ok(Vec::new());
    }

    // A missing radius takes the other one's value.
    let rx_attr = element.has_attr("rx").then(|| length(element, "rx", 0.0)).transpose()?;
    let ry_attr = element.has_attr("ry").then(|| length(element, "ry", 0.0)).transpose()?;
    let (rx, ry) = match (rx_attr, ry_attr) {
        (Some(rx), Some(ry)) => (rx, ry),
        (Some(r), None) | (None, Some(r)) => (r, r),
        (None, None) => (0.0, 0.0),
    };
    let rx = rx.max(0.0).min(w / 2.0);
    let ry = ry.max(0.0).min(h / 2.0);

    if rx == 0.0 || ry == 0.0 {
        let corners = [
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ];
        return Ok(vec![Path::from_polyline(&corners, true)]);
    }

    let corner = |from: Point, to: Point| {
        Segment::Arc(ArcSegment { from, to, rx, ry, x_rotation: 0.0, large_arc: false, sweep: true })
    };
    // Clockwise from the end of the top-left corner; edges of zero length are skipped
    let stops = [
        Point::new(x + rx, y),
        Point::new(x + w - rx, y),
        Point::new(x + w, y + ry),
        Point::new(x + w, y + h - ry),
        Point::new(x + w - rx, y + h),
        Point::new(x + rx, y + h),
        Point::new(x, y + h - ry),
        Point::new(x, y + ry),
    ];
    let mut segments = Vec::new();
    for i in 0..stops.len() {
        let (from, to) = (stops[i], stops[(i + 1) % stops.len()]);
        if i % 2 == 0 {
            if from != to {
                segments.push(Segment::line(from, to));
            }
        } else {
            segments.push(corner(from, to));
        }
    }
    Ok(vec![Path { segments, closed: true }])
}

fn ellipse_paths(element: &Element, rx: f64, ry: f64) -> Result<Vec<Path>, SvgError> {
    let cx = length(element, "cx", 0.0)?;
    let cy = length(element, "cy", 0.0)?;
    if rx <= 0.0 || ry <= 0.0 {
        return Ok(Vec::new());
    }
    let right = Point::new(cx + rx, cy);
    let left = Point::new(cx - rx, cy);
    let half = |from: Point, to: Point| {
        Segment::Arc(ArcSegment { from, to, rx, ry, x_rotation: 0.0, large_arc: false, sweep: true })
    };
    Ok(vec![Path { segments: vec![half(right, left), half(left, right)], closed: true }])
}

// ============================================================================
// TESTS
// ============================================================================
