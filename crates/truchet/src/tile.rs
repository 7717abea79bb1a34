//! Truchet tiling - place randomly rotated symbols on a grid.
//!
//! Truchet tiles are square tiles whose motifs line up with their
//! neighbours whichever way they are turned. Placed with random quarter
//! turns they form maze-like or flowing patterns.
//!
//! The driver takes the `<symbol>`s of an input document, picks a symbol
//! and a rotation for every grid cell, and writes a new document that
//! either references the symbols (`<use>`) or inlines them as plain paths.
//! Inlined patterns can then go through the post-processing pipeline, in
//! this fixed order: inline → join → stroke-width → stroke-to-path.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use svgtypes::{Length, LengthUnit, ViewBox};

use crate::error::{ElementError, ElementFailure, PipelineError};
use crate::join::JoinConfig;
use crate::passes::{
    COORD_PRECISION, JoinReport, StrokeReport, join_document, set_stroke_width, stroke_document,
};
use crate::path_data::{GEOMETRY_ATTRIBUTES, fmt_num, is_shape, shape_to_paths, write_path_data};
use crate::rng::Rng;
use crate::stroke::{LineCap, LineJoin, StrokeStyle};
use crate::svg::{Document, Element, SVG_NS, XLINK_NS};
use crate::transform::{Affine, compose};

/// Id of the group holding the tiles.
pub const PATTERN_GROUP_ID: &str = "truchet-pattern";

/// Presentation properties that inlined elements inherit from their
/// symbol and enclosing groups.
const INHERITED_PROPERTIES: [&str; 9] = [
    "fill",
    "fill-rule",
    "fill-opacity",
    "stroke",
    "stroke-width",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-opacity",
    "stroke-dasharray",
];

/// Elements that carry no drawing and are dropped when inlining.
const NON_DRAWING: [&str; 3] = ["title", "desc", "metadata"];

/// A reusable tile motif: one `<symbol>` of the input document.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: String,
    pub view_box: Option<ViewBox>,
    /// The `<symbol>` element, with `id` set even when the input had none.
    pub element: Element,
}

impl Symbol {
    /// Transform from symbol space into a `tile_size` square, as a `<use>`
    /// with that width and height would draw it (`xMidYMid meet`).
    pub fn fit_transform(&self, tile_size: f64) -> Affine {
        let Some(vb) = self.view_box else {
            return Affine::IDENTITY;
        };
        if vb.w <= 0.0 || vb.h <= 0.0 {
            return Affine::IDENTITY;
        }
        let scale = (tile_size / vb.w).min(tile_size / vb.h);
        let dx = (tile_size - vb.w * scale) / 2.0;
        let dy = (tile_size - vb.h * scale) / 2.0;
        Affine::translate(-vb.x, -vb.y)
            .then(Affine::scale(scale, scale))
            .then(Affine::translate(dx, dy))
    }

    /// Presentation properties set on the `<symbol>` itself.
    fn presentation(&self) -> Vec<(String, String)> {
        inherited_from(&self.element, &[])
    }
}

/// Every `<symbol>` in document order. Symbols without an id get `symbol-N`,
/// N being their position in the list.
pub fn find_symbols(doc: &Document) -> Vec<Symbol> {
    doc.root
        .descendants()
        .into_iter()
        .filter(|e| e.local_name() == "symbol")
        .enumerate()
        .map(|(n, e)| {
            let mut element = e.clone();
            let id = match e.id() {
                Some(id) => id.to_string(),
                None => {
                    let id = format!("symbol-{}", n);
                    element.set_attr("id", id.as_str());
                    id
                }
            };
            let view_box = e.attr("viewBox").and_then(|v| ViewBox::from_str(v).ok());
            Symbol { id, view_box, element }
        })
        .collect()
}

/// One grid cell of the pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlacement {
    pub column: usize,
    pub row: usize,
    /// Index into the symbol list.
    pub symbol: usize,
    /// Quarter turn in degrees: 0, 90, 180 or 270.
    pub rotation: u16,
    /// Tile space (a `tile_size` square at the origin) to document space.
    pub transform: Affine,
}

/// Choose a symbol and rotation for every cell.
///
/// Cells are visited column by column (rows inner). Each cell draws its
/// symbol first, then its rotation. The transform rotates the tile about its
/// centre, then moves it to the cell.
pub fn place_tiles(
    symbol_count: usize,
    columns: usize,
    rows: usize,
    tile_size: f64,
    rng: &mut Rng,
) -> Vec<TilePlacement> {
    if symbol_count == 0 {
        return Vec::new();
    }
    let half = tile_size / 2.0;
    let mut placements = Vec::with_capacity(columns * rows);
    for column in 0..columns {
        for row in 0..rows {
            let symbol = rng.next_index(symbol_count);
            let rotation = rng.quarter_turn();
            let transform = compose(
                Affine::rotate_about(f64::from(rotation), half, half),
                Affine::translate(column as f64 * tile_size, row as f64 * tile_size),
            );
            placements.push(TilePlacement { column, row, symbol, rotation, transform });
        }
    }
    placements
}

/// Settings of one pattern run. Loadable from YAML; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    pub columns: usize,
    pub rows: usize,
    pub tile_size: f64,
    pub seed: Option<u64>,
    /// Inline symbols as baked `<path>` elements instead of `<use>`.
    pub convert_to_paths: bool,
    pub join_paths: bool,
    pub join_tolerance: f64,
    pub auto_close: bool,
    /// Override `stroke-width` on every shape.
    pub stroke_width: Option<f64>,
    /// Replace strokes by filled outlines of this width.
    pub stroke_to_path: Option<f64>,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub curve_samples: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            columns: 10,
            rows: 10,
            tile_size: 40.0,
            seed: None,
            convert_to_paths: false,
            join_paths: false,
            join_tolerance: 0.1,
            auto_close: true,
            stroke_width: None,
            stroke_to_path: None,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            curve_samples: 16,
        }
    }
}

impl TileConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));
        if self.columns == 0 || self.rows == 0 {
            return invalid(format!("grid must be at least 1x1, got {}x{}", self.columns, self.rows));
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return invalid(format!("tile_size must be positive, got {}", self.tile_size));
        }
        if !(self.join_tolerance.is_finite() && self.join_tolerance >= 0.0) {
            return invalid(format!("join_tolerance must be non-negative, got {}", self.join_tolerance));
        }
        for (name, value) in [("stroke_width", self.stroke_width), ("stroke_to_path", self.stroke_to_path)] {
            if let Some(w) = value {
                if !(w.is_finite() && w > 0.0) {
                    return invalid(format!("{} must be positive, got {}", name, w));
                }
            }
        }
        if self.curve_samples == 0 {
            return invalid("curve_samples must be at least 1".to_string());
        }
        if !self.convert_to_paths {
            if self.join_paths {
                return Err(PipelineError::RequiresInline("join_paths"));
            }
            if self.stroke_to_path.is_some() {
                return Err(PipelineError::RequiresInline("stroke_to_path"));
            }
        }
        Ok(())
    }

    pub fn join_config(&self) -> JoinConfig {
        JoinConfig { tolerance: self.join_tolerance, auto_close: self.auto_close }
    }

    /// Stroke style for stroke-to-path, if enabled.
    pub fn stroke_style(&self) -> Option<StrokeStyle> {
        self.stroke_to_path.map(|width| StrokeStyle {
            width,
            cap: self.line_cap,
            join: self.line_join,
            curve_samples: self.curve_samples,
        })
    }
}

/// What a pattern run did, step by step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternReport {
    pub columns: usize,
    pub rows: usize,
    pub tile_size: f64,
    pub seed: Option<u64>,
    pub symbols: usize,
    pub tiles: usize,
    /// Symbol children that could not be inlined.
    pub inline_failures: Vec<ElementFailure>,
    pub join: Option<JoinReport>,
    pub stroke_widths_set: Option<usize>,
    pub stroke: Option<StrokeReport>,
}

#[derive(Debug, Clone)]
pub struct GeneratedPattern {
    pub document: Document,
    pub placements: Vec<TilePlacement>,
    pub report: PatternReport,
}

/// Build a Truchet pattern from the symbols of `input`.
pub fn generate_pattern(input: &Document, config: &TileConfig, rng: &mut Rng) -> Result<GeneratedPattern, PipelineError> {
    config.validate()?;

    let symbols = find_symbols(input);
    if symbols.is_empty() {
        return Err(PipelineError::NoSymbols);
    }
    log::info!("found {} symbols: {}", symbols.len(), symbol_ids(&symbols));

    let placements = place_tiles(symbols.len(), config.columns, config.rows, config.tile_size, rng);
    log::info!(
        "placed {} tiles ({}x{}, tile size {})",
        placements.len(),
        config.columns,
        config.rows,
        config.tile_size
    );

    let mut report = PatternReport {
        columns: config.columns,
        rows: config.rows,
        tile_size: config.tile_size,
        seed: config.seed,
        symbols: symbols.len(),
        tiles: placements.len(),
        ..PatternReport::default()
    };

    let mut group = Element::new("g").with_attr("id", PATTERN_GROUP_ID);
    for placement in &placements {
        let symbol = &symbols[placement.symbol];
        if config.convert_to_paths {
            for element in inline_symbol(symbol, placement, config.tile_size, &mut report.inline_failures) {
                group.push(element);
            }
        } else {
            group.push(use_element(symbol, placement, config.tile_size));
        }
    }
    if config.convert_to_paths {
        log::info!("inlined symbols as paths ({} elements)", group.children.len());
    }

    let width = config.columns as f64 * config.tile_size;
    let height = config.rows as f64 * config.tile_size;
    let mut defs = Element::new("defs");
    for symbol in &symbols {
        defs.push(symbol.element.clone());
    }
    let mut root = Element::new("svg")
        .with_attr("xmlns", SVG_NS)
        .with_attr("xmlns:xlink", XLINK_NS)
        .with_attr("width", fmt_num(width, Some(COORD_PRECISION)))
        .with_attr("height", fmt_num(height, Some(COORD_PRECISION)))
        .with_attr(
            "viewBox",
            format!("0 0 {} {}", fmt_num(width, Some(COORD_PRECISION)), fmt_num(height, Some(COORD_PRECISION))),
        );
    root.push(defs);
    root.push(group);
    let mut document = Document::new(root);

    if config.join_paths {
        let (joined, join_report) = join_document(&document, &config.join_config());
        document = joined;
        report.join = Some(join_report);
    }
    if let Some(width) = config.stroke_width {
        let (restyled, count) = set_stroke_width(&document, width);
        document = restyled;
        report.stroke_widths_set = Some(count);
    }
    if let Some(style) = config.stroke_style() {
        let (stroked, stroke_report) = stroke_document(&document, &style);
        document = stroked;
        report.stroke = Some(stroke_report);
    }

    Ok(GeneratedPattern { document, placements, report })
}

fn symbol_ids(symbols: &[Symbol]) -> String {
    symbols.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(", ")
}

fn use_element(symbol: &Symbol, placement: &TilePlacement, tile_size: f64) -> Element {
    let href = format!("#{}", symbol.id);
    let mut element = Element::new("use")
        .with_attr("href", href.as_str())
        .with_attr("xlink:href", href.as_str())
        .with_attr("x", "0")
        .with_attr("y", "0");
    if symbol.view_box.is_some() {
        let size = fmt_num(tile_size, Some(COORD_PRECISION));
        element.set_attr("width", size.as_str());
        element.set_attr("height", size.as_str());
    }
    element.set_attr("transform", placement.transform.to_svg());
    element
}

/// The drawable content of `symbol` for one cell, with groups flattened
/// and every transform baked into coordinates.
fn inline_symbol(
    symbol: &Symbol,
    placement: &TilePlacement,
    tile_size: f64,
    failures: &mut Vec<ElementFailure>,
) -> Vec<Element> {
    let ctm = compose(symbol.fit_transform(tile_size), placement.transform);
    let suffix = format!("{}-{}", placement.column, placement.row);
    let mut out = Vec::new();
    let inherited = symbol.presentation();
    for child in symbol.element.elements() {
        inline_element(child, ctm, &inherited, &suffix, &mut out, failures);
    }
    out
}

fn inline_element(
    element: &Element,
    parent_ctm: Affine,
    inherited: &[(String, String)],
    suffix: &str,
    out: &mut Vec<Element>,
    failures: &mut Vec<ElementFailure>,
) {
    let name = element.local_name();
    if NON_DRAWING.contains(&name) {
        return;
    }

    let own = match element.attr("transform").map(Affine::parse).transpose() {
        Ok(own) => own.unwrap_or(Affine::IDENTITY),
        Err(error) => {
            log::warn!("not inlining {}: {}", element.describe(), error);
            failures.push(ElementFailure { element: element.describe(), error: error.into() });
            return;
        }
    };
    let ctm = compose(own, parent_ctm);

    if name == "g" || name == "a" {
        let inherited = inherited_from(element, inherited);
        for child in element.elements() {
            inline_element(child, ctm, &inherited, suffix, out, failures);
        }
        return;
    }

    let baked_shape = is_shape(element);
    let mut baked = if baked_shape {
        match shape_to_paths(element) {
            Some(Ok(paths)) if paths.is_empty() => return,
            Some(Ok(paths)) => {
                let paths: Vec<_> = paths.iter().map(|p| ctm.apply_to_path(p)).collect();
                let mut path = Element::new("path");
                path.attributes = element
                    .attributes
                    .iter()
                    .filter(|(k, _)| {
                        k != "transform" && k != "points" && !GEOMETRY_ATTRIBUTES.contains(&k.as_str())
                    })
                    .cloned()
                    .collect();
                path.set_attr("d", write_path_data(&paths, Some(COORD_PRECISION)));
                path
            }
            Some(Err(error)) => {
                log::warn!("not inlining {}: {}", element.describe(), error);
                failures.push(ElementFailure {
                    element: element.describe(),
                    error: ElementError::Svg(error),
                });
                return;
            }
            None => return,
        }
    } else {
        let mut copy = element.clone();
        copy.set_attr("transform", ctm.to_svg());
        copy
    };

    for (name, value) in inherited {
        if baked.presentation(name).is_none() {
            baked.set_attr(name, value.as_str());
        }
    }
    if baked_shape {
        scale_stroke_width(&mut baked, ctm.determinant().abs().sqrt());
    }
    if let Some(id) = baked.id().map(|id| format!("{}-{}", id, suffix)) {
        baked.set_attr("id", id);
    }
    out.push(baked);
}

/// Rescale the stroke width of a shape whose coordinates had `scale` baked
/// in. An unset width is the initial value of 1.
fn scale_stroke_width(element: &mut Element, scale: f64) {
    if (scale - 1.0).abs() <= 1e-12 {
        return;
    }
    let width = match element.presentation("stroke-width").map(Length::from_str) {
        None => 1.0,
        Some(Ok(Length { number, unit: LengthUnit::None | LengthUnit::Px })) => number,
        Some(_) => {
            log::debug!("keeping relative stroke-width on {}", element.describe());
            return;
        }
    };
    let value = fmt_num(width * scale, Some(COORD_PRECISION));
    element.set_attr("stroke-width", value.as_str());
    if element.style_property("stroke-width").is_some() {
        element.set_style_property("stroke-width", &value);
    }
}

/// Inheritable properties in effect on `element`: its own values over
/// those of its ancestors.
fn inherited_from(element: &Element, parent: &[(String, String)]) -> Vec<(String, String)> {
    INHERITED_PROPERTIES
        .iter()
        .filter_map(|&name| {
            element
                .presentation(name)
                .map(str::to_string)
                .or_else(|| parent.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()))
                .map(|v| (name.to_string(), v))
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
