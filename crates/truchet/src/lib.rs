//! # truchet
//!
//! Truchet tiling and the 2D path geometry behind it.
//!
//! The crate is layered bottom-up:
//! - [`geometry`]: points, segments (lines, Béziers, arcs) and paths
//! - [`transform`]: 2D affine matrices, SVG `transform` parsing
//! - [`join`]: merge paths whose endpoints touch
//! - [`stroke`]: turn a stroked centerline into a filled outline
//! - [`svg`] and [`path_data`]: the element tree and `d=""` data
//! - [`passes`]: join / stroke-width / stroke-to-path over whole documents
//! - [`tile`]: the Truchet pattern generator, driven by a seeded [`rng::Rng`]
//!
//! ## Rust Lesson #7: Modules
//!
//! `mod foo;` loads `foo.rs`, `pub mod foo;` also exports it, and
//! `pub use foo::Bar;` re-exports `Bar` at the crate root so callers can
//! write `truchet::Bar` instead of `truchet::foo::Bar`.

pub mod error;
pub mod geometry;
pub mod join;
pub mod passes;
pub mod path_data;
pub mod rng;
pub mod stroke;
pub mod svg;
pub mod tile;
pub mod transform;

pub use error::{ElementError, ElementFailure, GeometryError, PipelineError, SvgError, TransformError};
pub use geometry::{ArcSegment, Path, Point, Segment};
pub use join::{JoinConfig, JoinOutput, JoinStats, JoinedPath, join_paths};
pub use passes::{JoinReport, StrokeReport, join_document, set_stroke_width, stroke_document};
pub use path_data::{parse_path_data, write_path_data};
pub use rng::Rng;
pub use stroke::{LineCap, LineJoin, StrokeOutline, StrokeStyle, stroke_to_path, stroke_with};
pub use svg::{Document, Element};
pub use tile::{GeneratedPattern, PatternReport, TileConfig, TilePlacement, generate_pattern, place_tiles};
pub use transform::{Affine, compose};
