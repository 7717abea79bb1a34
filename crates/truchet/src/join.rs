//! Path joining - merge paths whose endpoints touch into longer paths.
//!
//! Tiled patterns draw one curve as many short pieces, one per tile. Plotters
//! and CAD tools want the opposite: as few paths as possible, and closed
//! outlines marked as closed. This module chains paths whose free endpoints
//! lie within a tolerance of each other.
//!
//! # Algorithm
//!
//! 1. Collect both endpoints of every open path (loops and empty paths are
//!    passed through untouched)
//! 2. Build a spatial hash of the endpoints and list every pair on different
//!    paths that lies within tolerance
//! 3. Take pairs nearest first (ties by input order). A pair is used only if
//!    both endpoints are still free and the two paths are not already in the
//!    same chain
//! 4. Walk each chain and concatenate its pieces, reversing where needed
//! 5. Optionally close every result whose two ends now touch
//!
//! # Performance
//!
//! O(n log n) average case with spatial hashing, O(n²) worst case if all
//! endpoints hash to same bucket.

use std::collections::HashMap;

use serde::Serialize;

use crate::geometry::{Path, Segment};

/// Configuration for path joining.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinConfig {
    /// Maximum distance between endpoints to consider them connected.
    /// Default: 0.1 (sub-pixel at typical SVG scales)
    pub tolerance: f64,
    /// Close paths whose two ends lie within `tolerance` after joining.
    pub auto_close: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self { tolerance: 0.1, auto_close: true }
    }
}

impl JoinConfig {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance, ..Self::default() }
    }
}

/// One output path and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedPath {
    pub path: Path,
    /// Input indices in the order they appear along `path`.
    pub sources: Vec<usize>,
    /// A closing segment or the closed flag was added by the join.
    pub closed_by_join: bool,
}

impl JoinedPath {
    /// The output is a bit-for-bit copy of a single input path.
    pub fn is_unchanged(&self) -> bool {
        self.sources.len() == 1 && !self.closed_by_join
    }
}

/// Statistics about a join run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinStats {
    pub paths_before: usize,
    pub paths_after: usize,
    /// Endpoint pairs that were connected.
    pub joins: usize,
    /// Outputs built from more than one input path.
    pub chains_formed: usize,
    pub paths_closed: usize,
    pub paths_unchanged: usize,
    /// On-curve nodes before and after.
    pub nodes_before: usize,
    pub nodes_after: usize,
}

#[derive(Debug, Clone, Default)]
pub struct JoinOutput {
    pub paths: Vec<JoinedPath>,
    pub stats: JoinStats,
}

/// Which end of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum End {
    Start,
    End,
}

impl End {
    fn other(self) -> End {
        match self {
            End::Start => End::End,
            End::End => End::Start,
        }
    }

    fn slot(self) -> usize {
        match self {
            End::Start => 0,
            End::End => 1,
        }
    }
}

/// An endpoint pair within tolerance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    a: usize,
    a_end: End,
    b: usize,
    b_end: End,
}

/// Join paths whose endpoints are within `config.tolerance` of each other.
///
/// Paths that take part in no join (and are not closed) come back as exact
/// clones. The output is ordered by the lowest input index of each result.
pub fn join_paths(paths: &[Path], config: &JoinConfig) -> JoinOutput {
    let tolerance = config.tolerance;
    let valid_tolerance = tolerance >= 0.0;
    if !valid_tolerance {
        log::warn!("join tolerance {} is not a non-negative number; nothing will be joined", tolerance);
    }

    let joinable: Vec<bool> = paths
        .iter()
        .map(|p| valid_tolerance && !p.is_empty() && !p.is_loop(tolerance))
        .collect();

    let candidates = if valid_tolerance {
        find_candidates(paths, &joinable, tolerance)
    } else {
        Vec::new()
    };

    // links[i][slot] = the endpoint that path i's start/end is glued to
    let mut links: Vec<[Option<(usize, End)>; 2]> = vec![[None, None]; paths.len()];
    let mut chains = UnionFind::new(paths.len());
    let mut joins = 0;

    for c in &candidates {
        if links[c.a][c.a_end.slot()].is_some() || links[c.b][c.b_end.slot()].is_some() {
            continue;
        }
        if chains.find(c.a) == chains.find(c.b) {
            continue;
        }
        links[c.a][c.a_end.slot()] = Some((c.b, c.b_end));
        links[c.b][c.b_end.slot()] = Some((c.a, c.a_end));
        chains.union(c.a, c.b);
        joins += 1;
    }
    log::debug!("{} join candidates, {} joins", candidates.len(), joins);

    let mut visited = vec![false; paths.len()];
    let mut output = Vec::new();

    for first in 0..paths.len() {
        if visited[first] {
            continue;
        }
        let order = walk_chain(first, &links);
        for &(idx, _) in &order {
            visited[idx] = true;
        }
        let mut joined = assemble(paths, &order);
        if config.auto_close && valid_tolerance {
            close_if_touching(&mut joined, tolerance);
        }
        output.push(joined);
    }

    let stats = JoinStats {
        paths_before: paths.len(),
        paths_after: output.len(),
        joins,
        chains_formed: output.iter().filter(|j| j.sources.len() > 1).count(),
        paths_closed: output.iter().filter(|j| j.closed_by_join).count(),
        paths_unchanged: output.iter().filter(|j| j.is_unchanged()).count(),
        nodes_before: paths.iter().map(Path::node_count).sum(),
        nodes_after: output.iter().map(|j| j.path.node_count()).sum(),
    };

    JoinOutput { paths: output, stats }
}

/// Convert a point to a grid cell coordinate.
#[inline]
fn point_to_cell(x: f64, y: f64, grid_size: f64) -> (i64, i64) {
    ((x / grid_size).floor() as i64, (y / grid_size).floor() as i64)
}

/// Every endpoint pair on different joinable paths within `tolerance`,
/// sorted nearest first with ties broken by input order.
fn find_candidates(paths: &[Path], joinable: &[bool], tolerance: f64) -> Vec<Candidate> {
    // Grid cells at least `tolerance` wide, so a 3x3 neighbourhood covers every match
    let grid_size = tolerance.max(0.001);
    let mut grid: HashMap<(i64, i64), Vec<(usize, End)>> = HashMap::new();
    let mut endpoints = Vec::new();

    for (i, path) in paths.iter().enumerate() {
        if !joinable[i] {
            continue;
        }
        let (Some(start), Some(end)) = (path.start(), path.end()) else {
            continue;
        };
        for (which, p) in [(End::Start, start), (End::End, end)] {
            grid.entry(point_to_cell(p.x, p.y, grid_size)).or_default().push((i, which));
            endpoints.push((i, which, p));
        }
    }

    let endpoint_of = |idx: usize, which: End| match which {
        End::Start => paths[idx].start(),
        End::End => paths[idx].end(),
    };

    let mut candidates = Vec::new();
    for &(i, which, p) in &endpoints {
        let cell = point_to_cell(p.x, p.y, grid_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = grid.get(&(cell.0 + dx, cell.1 + dy)) else {
                    continue;
                };
                for &(j, other) in bucket {
                    if j <= i {
                        continue;
                    }
                    let Some(q) = endpoint_of(j, other) else {
                        continue;
                    };
                    let distance = p.distance(q);
                    if distance <= tolerance {
                        candidates.push(Candidate { distance, a: i, a_end: which, b: j, b_end: other });
                    }
                }
            }
        }
    }

    candidates.sort_by(|x, y| {
        x.distance
            .total_cmp(&y.distance)
            .then((x.a, x.a_end, x.b, x.b_end).cmp(&(y.a, y.a_end, y.b, y.b_end)))
    });
    candidates
}

/// The members of `first`'s chain in drawing order, each with a "reversed" flag.
///
/// `first` must be the lowest index in its chain; it keeps its direction.
fn walk_chain(first: usize, links: &[[Option<(usize, End)>; 2]]) -> Vec<(usize, bool)> {
    // Pieces before `first`: we arrive at each through the end that touches
    // the following piece, so that end is where the piece must finish.
    let mut before = Vec::new();
    let mut next = links[first][End::Start.slot()];
    while let Some((idx, touching)) = next {
        before.push((idx, touching == End::Start));
        next = links[idx][touching.other().slot()];
    }
    before.reverse();

    let mut order = before;
    order.push((first, false));

    // Pieces after `first` must start at the end we arrive through.
    let mut next = links[first][End::End.slot()];
    while let Some((idx, touching)) = next {
        order.push((idx, touching == End::End));
        next = links[idx][touching.other().slot()];
    }
    order
}

fn assemble(paths: &[Path], order: &[(usize, bool)]) -> JoinedPath {
    let oriented = |idx: usize, reversed: bool| {
        if reversed { paths[idx].reversed() } else { paths[idx].clone() }
    };

    let mut pieces = order.iter();
    let Some(&(head, head_reversed)) = pieces.next() else {
        return JoinedPath { path: Path::default(), sources: Vec::new(), closed_by_join: false };
    };
    let mut path = oriented(head, head_reversed);
    for &(idx, reversed) in pieces {
        path.extend_continuous(oriented(idx, reversed));
    }

    JoinedPath {
        path,
        sources: order.iter().map(|&(idx, _)| idx).collect(),
        closed_by_join: false,
    }
}

fn close_if_touching(joined: &mut JoinedPath, tolerance: f64) {
    let path = &mut joined.path;
    if path.closed {
        return;
    }
    let (Some(start), Some(end)) = (path.start(), path.end()) else {
        return;
    };
    let gap = start.distance(end);
    if gap > tolerance {
        return;
    }
    if gap > 0.0 {
        path.segments.push(Segment::line(end, start));
    }
    path.closed = true;
    joined.closed_by_join = true;
}

/// Disjoint sets over path indices; one set per chain.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Path {
        Path::new(vec![Segment::line(Point::new(x1, y1), Point::new(x2, y2))])
    }

    fn open_endpoints(paths: &[Path]) -> usize {
        paths.iter().filter(|p| !p.is_empty() && !p.closed).count() * 2
    }

    #[test]
    fn join_empty() {
        let out = join_paths(&[], &JoinConfig::default());
        assert!(out.paths.is_empty());
        assert_eq!(out.stats, JoinStats::default());
    }

    #[test]
    fn join_coincident_endpoints() {
        let paths = vec![line(0.0, 0.0, 10.0, 0.0), line(10.0, 0.0, 10.0, 10.0)];
        let out = join_paths(&paths, &JoinConfig::default());

        assert_eq!(out.paths.len(), 1, "Should join into 1 path");
        assert_eq!(out.paths[0].sources, vec![0, 1]);
        let result: Vec<Path> = out.paths.iter().map(|j| j.path.clone()).collect();
        assert_eq!(open_endpoints(&result), open_endpoints(&paths) - 2);
        assert_eq!(out.stats.joins, 1);
        assert_eq!(out.stats.nodes_before, 4);
        assert_eq!(out.stats.nodes_after, 3);
    }

    #[test]
    fn join_far_apart_is_unchanged() {
        let paths = vec![line(0.0, 0.0, 10.0, 10.0), line(100.0, 100.0, 110.0, 110.0)];
        let out = join_paths(&paths, &JoinConfig::default());

        assert_eq!(out.paths.len(), 2, "Should remain as 2 separate paths");
        for (joined, original) in out.paths.iter().zip(&paths) {
            assert!(joined.is_unchanged());
            assert_eq!(&joined.path, original);
        }
        assert_eq!(out.stats.paths_unchanged, 2);
    }

    #[test]
    fn join_three_collinear_pieces() {
        let paths = vec![line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 2.0, 0.0), line(2.0, 0.0, 3.0, 0.0)];
        let out = join_paths(&paths, &JoinConfig::with_tolerance(0.01));

        assert_eq!(out.paths.len(), 1);
        let path = &out.paths[0].path;
        assert_eq!(path.start(), Some(Point::new(0.0, 0.0)));
        assert_eq!(path.end(), Some(Point::new(3.0, 0.0)));
        assert_eq!(path.len(), 3);
        assert!(!path.closed);
    }

    #[test]
    fn join_out_of_order_and_reversed() {
        // Pieces given out of order and pointing different ways
        let paths = vec![
            line(1.0, 0.0, 0.0, 0.0), // lowest index keeps its direction
            line(2.0, 0.0, 3.0, 0.0),
            line(1.0, 0.0, 2.0, 0.0),
        ];
        let out = join_paths(&paths, &JoinConfig::default());

        assert_eq!(out.paths.len(), 1);
        let joined = &out.paths[0];
        assert_eq!(joined.sources, vec![1, 2, 0]);
        assert_eq!(joined.path.start(), Some(Point::new(3.0, 0.0)));
        assert_eq!(joined.path.end(), Some(Point::new(0.0, 0.0)));
        assert_eq!(joined.path.segments[2], Segment::line(Point::new(1.0, 0.0), Point::new(0.0, 0.0)));
    }

    #[test]
    fn join_respects_tolerance() {
        let paths = vec![line(0.0, 0.0, 10.0, 10.0), line(10.05, 10.05, 20.0, 10.0)];

        // With default tolerance (0.1), should join and snap the gap
        let out = join_paths(&paths, &JoinConfig::with_tolerance(0.1));
        assert_eq!(out.paths.len(), 1, "Should join with tolerance 0.1");
        assert_eq!(out.paths[0].path.segments[1].start(), Point::new(10.0, 10.0));

        // With tight tolerance, should not join
        let out = join_paths(&paths, &JoinConfig::with_tolerance(0.01));
        assert_eq!(out.paths.len(), 2, "Should not join with tolerance 0.01");
    }

    #[test]
    fn join_distance_equal_to_tolerance() {
        let paths = vec![line(0.0, 0.0, 1.0, 0.0), line(1.5, 0.0, 3.0, 0.0)];
        let out = join_paths(&paths, &JoinConfig::with_tolerance(0.5));
        assert_eq!(out.paths.len(), 1);
    }

    #[test]
    fn auto_close_single_path() {
        let almost = Path::new(vec![
            Segment::line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
            Segment::line(Point::new(10.0, 0.0), Point::new(10.0, 10.0)),
            Segment::line(Point::new(10.0, 10.0), Point::new(0.05, 0.0)),
        ]);

        let out = join_paths(std::slice::from_ref(&almost), &JoinConfig::default());
        assert_eq!(out.paths.len(), 1);
        let closed = &out.paths[0];
        assert!(closed.closed_by_join);
        assert!(closed.path.closed);
        assert_eq!(closed.path.len(), 4);
        assert_eq!(closed.path.end(), closed.path.start());
        assert_eq!(out.stats.paths_closed, 1);

        let config = JoinConfig { auto_close: false, ..JoinConfig::default() };
        let out = join_paths(std::slice::from_ref(&almost), &config);
        assert!(out.paths[0].is_unchanged());
        assert_eq!(out.paths[0].path, almost);
    }

    #[test]
    fn auto_close_exact_loop_adds_no_segment() {
        let square = Path::from_polyline(
            &[
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 0.0),
            ],
            false,
        );
        let out = join_paths(&[square], &JoinConfig::default());
        assert!(out.paths[0].path.closed);
        assert_eq!(out.paths[0].path.len(), 3);
    }

    #[test]
    fn join_closes_ring_of_pieces() {
        // Four quarter pieces of a square; the last join closes the ring
        let paths = vec![
            line(0.0, 0.0, 10.0, 0.0),
            line(10.0, 0.0, 10.0, 10.0),
            line(10.0, 10.0, 0.0, 10.0),
            line(0.0, 10.0, 0.0, 0.0),
        ];
        let out = join_paths(&paths, &JoinConfig::default());
        assert_eq!(out.paths.len(), 1);
        let joined = &out.paths[0];
        assert_eq!(joined.sources.len(), 4);
        assert!(joined.path.closed);
        assert!(joined.closed_by_join);
        // union-find stops the last pair from joining the chain to itself
        assert_eq!(out.stats.joins, 3);
    }

    #[test]
    fn loops_are_not_joined() {
        let closed = Path { closed: true, ..line(0.0, 0.0, 1.0, 0.0) };
        let open = line(1.0, 0.0, 2.0, 0.0);
        let out = join_paths(&[closed.clone(), open.clone()], &JoinConfig::default());
        assert_eq!(out.paths.len(), 2);
        assert_eq!(out.paths[0].path, closed);
        assert_eq!(out.paths[1].path, open);
    }

    #[test]
    fn empty_paths_pass_through() {
        let out = join_paths(&[Path::default(), line(0.0, 0.0, 1.0, 0.0)], &JoinConfig::default());
        assert_eq!(out.paths.len(), 2);
        assert!(out.paths[0].path.is_empty());
        assert!(out.paths[0].is_unchanged());
    }

    #[test]
    fn bad_tolerance_joins_nothing() {
        let paths = vec![line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 2.0, 0.0)];
        for tolerance in [-1.0, f64::NAN] {
            let out = join_paths(&paths, &JoinConfig::with_tolerance(tolerance));
            assert_eq!(out.paths.len(), 2);
            assert_eq!(out.stats.joins, 0);
        }
    }

    #[test]
    fn ties_break_by_input_order() {
        // Both path 1 and path 2 start exactly where path 0 ends
        let paths = vec![line(0.0, 0.0, 1.0, 0.0), line(1.0, 0.0, 2.0, 0.0), line(1.0, 0.0, 1.0, 5.0)];
        let out = join_paths(&paths, &JoinConfig::default());

        assert_eq!(out.paths.len(), 2);
        assert_eq!(out.paths[0].sources, vec![0, 1]);
        assert_eq!(out.paths[1].sources, vec![2]);

        let again = join_paths(&paths, &JoinConfig::default());
        assert_eq!(again.paths, out.paths);
    }

    #[test]
    fn nearest_pair_wins() {
        // Path 2 is closer to the end of path 0 than path 1 is
        let paths = vec![line(0.0, 0.0, 1.0, 0.0), line(1.08, 0.0, 2.0, 0.0), line(1.02, 0.0, 1.0, 5.0)];
        let out = join_paths(&paths, &JoinConfig::default());
        assert_eq!(out.paths[0].sources, vec![0, 2]);
    }
}
