//! Whole-document passes shared by the tiling and joining tools.
//!
//! Each pass takes a [`Document`], returns a new one plus a report, and
//! never aborts because of one bad element: the element is left as it was
//! and listed in the report's `failures`.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{ElementError, ElementFailure};
use crate::geometry::Path;
use crate::join::{JoinConfig, JoinStats, join_paths};
use crate::path_data::{is_shape, parse_path_data, write_path_data};
use crate::stroke::{StrokeStyle, stroke_with};
use crate::svg::{Document, Element, Node};
use crate::transform::{Affine, compose};

/// Decimal places for coordinates written by the passes.
pub const COORD_PRECISION: usize = 6;

/// Containers whose content is never rendered in place.
const NON_RENDERED: [&str; 7] = ["defs", "symbol", "clipPath", "mask", "marker", "pattern", "metadata"];

/// Report of [`join_document`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinReport {
    #[serde(flatten)]
    pub stats: JoinStats,
    pub elements_before: usize,
    pub elements_after: usize,
    pub elements_rewritten: usize,
    pub failures: Vec<ElementFailure>,
}

/// Report of [`stroke_document`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct StrokeReport {
    pub paths_stroked: usize,
    pub contours: usize,
    /// Paths with `stroke: none`.
    pub skipped_unstroked: usize,
    pub failures: Vec<ElementFailure>,
}

/// A rendered `<path>` element with its geometry in document space.
#[derive(Debug, Clone)]
pub struct PathEntry {
    /// Child indices from the root down to the element.
    pub address: Vec<usize>,
    pub element: Element,
    /// Transform of the ancestors only.
    pub parent_ctm: Affine,
    /// Subpaths with the full CTM (ancestors and own `transform`) applied.
    pub paths: Vec<Path>,
}

/// Every rendered `<path>` in document order.
///
/// Elements with an unparsable `transform` (and everything below them),
/// unparsable `d` data or a singular parent transform are reported as
/// failures instead.
pub fn collect_paths(doc: &Document) -> (Vec<PathEntry>, Vec<ElementFailure>) {
    let mut entries = Vec::new();
    let mut failures = Vec::new();
    let root_ctm = match own_transform(&doc.root) {
        Ok(t) => t,
        Err(error) => {
            failures.push(ElementFailure { element: doc.root.describe(), error });
            return (entries, failures);
        }
    };
    collect_children(&doc.root, &mut Vec::new(), root_ctm, &mut entries, &mut failures);
    (entries, failures)
}

fn own_transform(element: &Element) -> Result<Affine, ElementError> {
    match element.attr("transform") {
        Some(t) => Ok(Affine::parse(t)?),
        None => Ok(Affine::IDENTITY),
    }
}

fn collect_children(
    parent: &Element,
    address: &mut Vec<usize>,
    parent_ctm: Affine,
    entries: &mut Vec<PathEntry>,
    failures: &mut Vec<ElementFailure>,
) {
    for (i, node) in parent.children.iter().enumerate() {
        let Node::Element(child) = node else {
            continue;
        };
        if NON_RENDERED.contains(&child.local_name()) {
            continue;
        }

        let ctm = match own_transform(child) {
            Ok(own) => compose(own, parent_ctm),
            Err(error) => {
                log::warn!("skipping {}: {}", child.describe(), error);
                failures.push(ElementFailure { element: child.describe(), error });
                continue;
            }
        };

        address.push(i);
        if child.local_name() == "path" {
            match path_entry(child, address, parent_ctm, ctm) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    log::warn!("skipping {}: {}", child.describe(), error);
                    failures.push(ElementFailure { element: child.describe(), error });
                }
            }
        }
        collect_children(child, address, ctm, entries, failures);
        address.pop();
    }
}

fn path_entry(element: &Element, address: &[usize], parent_ctm: Affine, ctm: Affine) -> Result<PathEntry, ElementError> {
    if parent_ctm.inverse().is_none() {
        return Err(ElementError::SingularTransform);
    }
    let local = parse_path_data(element.attr("d").unwrap_or(""))?;
    Ok(PathEntry {
        address: address.to_vec(),
        element: element.clone(),
        parent_ctm,
        paths: local.iter().map(|p| ctm.apply_to_path(p)).collect(),
    })
}

/// Join the subpaths of all rendered `<path>` elements across the document.
///
/// Joining happens in document space. Every output path is written into the
/// element that owns its lowest-index source subpath; an element receiving
/// new geometry keeps its attributes except `transform` and `sodipodi:*`,
/// and its coordinates are expressed in its parent's user space. Elements
/// whose subpaths were all consumed by other elements are removed. Elements
/// untouched by the join are kept verbatim.
pub fn join_document(doc: &Document, config: &JoinConfig) -> (Document, JoinReport) {
    let (entries, failures) = collect_paths(doc);

    let mut all_paths = Vec::new();
    let mut owner = Vec::new();
    for (entry_idx, entry) in entries.iter().enumerate() {
        for path in &entry.paths {
            all_paths.push(path.clone());
            owner.push(entry_idx);
        }
    }

    let joined = join_paths(&all_paths, config);

    let mut touched: HashSet<usize> = HashSet::new();
    for out in joined.paths.iter().filter(|j| !j.is_unchanged()) {
        touched.extend(out.sources.iter().map(|&s| owner[s]));
    }

    // Outputs grouped by the entry that owns their lowest source.
    let mut owned: HashMap<usize, Vec<&Path>> = HashMap::new();
    for out in &joined.paths {
        let Some(&first) = out.sources.iter().min() else {
            continue;
        };
        owned.entry(owner[first]).or_default().push(&out.path);
    }

    let mut replacements: HashMap<Vec<usize>, Option<Element>> = HashMap::new();
    let mut elements_after = entries.len();
    for &entry_idx in &touched {
        let entry = &entries[entry_idx];
        let replacement = owned.get(&entry_idx).and_then(|paths| {
            // parent_ctm was checked to be invertible when the entry was collected
            let back = entry.parent_ctm.inverse()?;
            let local: Vec<Path> = paths.iter().map(|p| back.apply_to_path(p)).collect();
            Some(rewritten_element(&entry.element, &local))
        });
        if replacement.is_none() {
            elements_after -= 1;
        }
        replacements.insert(entry.address.clone(), replacement);
    }

    log::info!(
        "joined {} subpaths into {} ({} joins, {} closed) across {} elements",
        joined.stats.paths_before,
        joined.stats.paths_after,
        joined.stats.joins,
        joined.stats.paths_closed,
        entries.len()
    );

    let report = JoinReport {
        stats: joined.stats,
        elements_before: entries.len(),
        elements_after,
        elements_rewritten: replacements.values().filter(|r| r.is_some()).count(),
        failures,
    };
    (Document::new(rebuild(&doc.root, &mut Vec::new(), &replacements)), report)
}

fn rewritten_element(original: &Element, paths: &[Path]) -> Element {
    let mut element = original.clone();
    element.attributes.retain(|(k, _)| k != "transform" && !k.starts_with("sodipodi:"));
    element.set_attr("d", write_path_data(paths, Some(COORD_PRECISION)));
    element
}

/// Copy of `element` with the elements at the given addresses replaced
/// (`Some`) or removed (`None`).
fn rebuild(
    element: &Element,
    address: &mut Vec<usize>,
    replacements: &HashMap<Vec<usize>, Option<Element>>,
) -> Element {
    let mut out = Element {
        name: element.name.clone(),
        attributes: element.attributes.clone(),
        children: Vec::with_capacity(element.children.len()),
    };
    for (i, node) in element.children.iter().enumerate() {
        address.push(i);
        match node {
            Node::Text(t) => out.children.push(Node::Text(t.clone())),
            Node::Element(child) => match replacements.get(address.as_slice()) {
                Some(Some(replacement)) => out.push(replacement.clone()),
                Some(None) => {}
                None => out.push(rebuild(child, address, replacements)),
            },
        }
        address.pop();
    }
    out
}

/// Set `stroke-width` on every shape element, including those inside
/// `<defs>` and `<symbol>`. Returns the number of elements changed.
pub fn set_stroke_width(doc: &Document, width: f64) -> (Document, usize) {
    let mut doc = doc.clone();
    let value = crate::path_data::fmt_num(width, Some(COORD_PRECISION));
    let mut count = 0;
    visit_mut(&mut doc.root, &mut |element| {
        if !is_shape(element) {
            return;
        }
        element.set_attr("stroke-width", value.as_str());
        if element.style_property("stroke-width").is_some() {
            element.set_style_property("stroke-width", &value);
        }
        count += 1;
    });
    log::info!("set stroke-width {} on {} elements", value, count);
    (doc, count)
}

fn visit_mut(element: &mut Element, f: &mut impl FnMut(&mut Element)) {
    f(element);
    for child in element.elements_mut() {
        visit_mut(child, f);
    }
}

/// Replace every stroked, rendered `<path>` by the filled outline of its stroke.
///
/// The outline uses `style.width` in the element's own user space. The
/// element is restyled to `fill:<stroke colour>;stroke:none` (black when no
/// stroke colour is set) and loses its `stroke-width`. Paths with
/// `stroke: none`, on the element or inherited, are skipped.
pub fn stroke_document(doc: &Document, style: &StrokeStyle) -> (Document, StrokeReport) {
    let mut doc = doc.clone();
    let mut report = StrokeReport::default();
    stroke_children(&mut doc.root, None, style, &mut report);
    log::info!(
        "stroked {} paths into {} contours ({} unstroked skipped, {} failed)",
        report.paths_stroked,
        report.contours,
        report.skipped_unstroked,
        report.failures.len()
    );
    (doc, report)
}

fn stroke_children(parent: &mut Element, inherited_stroke: Option<&str>, style: &StrokeStyle, report: &mut StrokeReport) {
    for child in parent.elements_mut() {
        if NON_RENDERED.contains(&child.local_name()) {
            continue;
        }
        let stroke = child.presentation("stroke").or(inherited_stroke).map(str::to_string);
        if child.local_name() == "path" {
            stroke_element(child, stroke.as_deref(), style, report);
        }
        stroke_children(child, stroke.as_deref(), style, report);
    }
}

fn stroke_element(element: &mut Element, stroke: Option<&str>, style: &StrokeStyle, report: &mut StrokeReport) {
    if stroke.is_some_and(|s| s.trim() == "none") {
        report.skipped_unstroked += 1;
        return;
    }

    let outline = parse_path_data(element.attr("d").unwrap_or(""))
        .map_err(ElementError::from)
        .and_then(|paths| {
            paths
                .iter()
                .map(|p| stroke_with(p, style).map_err(ElementError::from))
                .collect::<Result<Vec<_>, _>>()
        });

    let outlines = match outline {
        Ok(outlines) => outlines,
        Err(error) => {
            log::warn!("cannot stroke {}: {}", element.describe(), error);
            report.failures.push(ElementFailure { element: element.describe(), error });
            return;
        }
    };

    let contours: Vec<Path> = outlines.into_iter().flat_map(|o| o.contours).collect();
    report.paths_stroked += 1;
    report.contours += contours.len();

    let colour = stroke.unwrap_or("#000000").trim().to_string();
    element.set_attr("d", write_path_data(&contours, Some(COORD_PRECISION)));
    element.remove_attr("stroke-width");
    element.remove_attr("stroke");
    element.remove_attr("fill");
    element.remove_style_property("stroke-width");
    element.set_style_property("fill", &colour);
    element.set_style_property("stroke", "none");
}

// ============================================================================
// TESTS
// ============================================================================
