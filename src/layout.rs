//! Geometric page model and line-based table region detection.
//!
//! A page is a set of positioned text spans plus ruling geometry (stroked
//! lines and rectangle borders). Table regions are found with the classic
//! lattice strategy: snap near-duplicate ruling lines together, intersect
//! verticals with horizontals, group the crossings into regions, and read
//! each region out as a raw grid of cell text.
//!
//! Coordinates are top-based: `top` grows downward from the top edge of the
//! page, matching visual order.

use serde::{Deserialize, Serialize};

use crate::table::{RawGrid, RawRow};

/// A run of text anchored at its left/top corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f64,
    pub top: f64,
}

impl TextSpan {
    #[must_use]
    pub fn new(text: impl Into<String>, x: f64, top: f64) -> Self {
        Self {
            text: text.into(),
            x,
            top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned ruling line.
///
/// For a horizontal line `position` is its top coordinate and `start..end`
/// spans x; for a vertical line `position` is x and `start..end` spans top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulingLine {
    pub orientation: Orientation,
    pub position: f64,
    pub start: f64,
    pub end: f64,
}

impl RulingLine {
    #[must_use]
    pub fn horizontal(top: f64, x0: f64, x1: f64) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: top,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    #[must_use]
    pub fn vertical(x: f64, top0: f64, top1: f64) -> Self {
        Self {
            orientation: Orientation::Vertical,
            position: x,
            start: top0.min(top1),
            end: top0.max(top1),
        }
    }
}

/// A stroked rectangle; contributes its four sides as ruling lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectShape {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

/// One page's geometric layout: positioned text plus ruling geometry.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub spans: Vec<TextSpan>,
    pub lines: Vec<RulingLine>,
    pub rects: Vec<RectShape>,
}

impl PageLayout {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// All ruling lines on the page: explicit lines plus rectangle sides.
    #[must_use]
    pub fn rulings(&self) -> Vec<RulingLine> {
        let mut rulings = self.lines.clone();
        for rect in &self.rects {
            rulings.push(RulingLine::horizontal(rect.top, rect.x0, rect.x1));
            rulings.push(RulingLine::horizontal(rect.bottom, rect.x0, rect.x1));
            rulings.push(RulingLine::vertical(rect.x0, rect.top, rect.bottom));
            rulings.push(RulingLine::vertical(rect.x1, rect.top, rect.bottom));
        }
        rulings
    }
}

/// Tolerances governing lattice detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectSettings {
    /// Maximum coordinate distance for two ruling lines to be treated as
    /// the same line. Merges near-duplicate table borders.
    pub snap_tolerance: f64,
    /// Maximum distance for a vertical/horizontal crossing to count as a
    /// cell-boundary intersection.
    pub intersection_tolerance: f64,
}

impl Default for DetectSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 5.0,
            intersection_tolerance: 2.0,
        }
    }
}

/// Vertical distance within which spans are considered to sit on the same
/// text line when rendering page text.
const LINE_TOLERANCE: f64 = 3.0;

/// Detect table regions on a page and return one raw grid per region, in
/// top-to-bottom visual order.
///
/// A page with no ruling structure yields an empty vector. Regions whose
/// geometry does not resolve to at least a 1x1 cell matrix are skipped
/// silently; they never abort the page.
#[must_use]
pub fn detect_grids(page: &PageLayout, settings: &DetectSettings) -> Vec<RawGrid> {
    let rulings = page.rulings();
    let horizontal: Vec<RulingLine> = rulings
        .iter()
        .copied()
        .filter(|r| r.orientation == Orientation::Horizontal)
        .collect();
    let vertical: Vec<RulingLine> = rulings
        .iter()
        .copied()
        .filter(|r| r.orientation == Orientation::Vertical)
        .collect();

    let horizontal = snap_rulings(horizontal, settings.snap_tolerance);
    let vertical = snap_rulings(vertical, settings.snap_tolerance);
    if horizontal.len() < 2 || vertical.len() < 2 {
        return Vec::new();
    }

    let crossings = find_crossings(&horizontal, &vertical, settings.intersection_tolerance);
    if crossings.is_empty() {
        return Vec::new();
    }

    let mut regions = group_regions(&crossings, horizontal.len());
    // Top-to-bottom visual order by each region's topmost boundary.
    regions.sort_by(|a, b| {
        a.row_boundaries[0]
            .partial_cmp(&b.row_boundaries[0])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut grids = Vec::new();
    for region in regions {
        match read_region(&region, &page.spans) {
            Some(grid) => grids.push(grid),
            None => {
                tracing::debug!(
                    rows = region.row_boundaries.len(),
                    cols = region.col_boundaries.len(),
                    "skipping degenerate table region"
                );
            }
        }
    }
    grids
}

/// Render a page's spans as plain text: spans clustered into lines by
/// vertical position, lines joined with newlines, spans within a line
/// joined with spaces in left-to-right order.
#[must_use]
pub fn page_text(page: &PageLayout) -> String {
    let mut spans: Vec<&TextSpan> = page.spans.iter().filter(|s| !s.text.is_empty()).collect();
    if spans.is_empty() {
        return String::new();
    }
    spans.sort_by(|a, b| {
        a.top
            .partial_cmp(&b.top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut out = String::new();
    let mut line_top = f64::NEG_INFINITY;
    let mut line: Vec<&TextSpan> = Vec::new();
    for span in spans {
        if (span.top - line_top).abs() > LINE_TOLERANCE && !line.is_empty() {
            flush_line(&mut out, &mut line);
        }
        line_top = span.top;
        line.push(span);
    }
    flush_line(&mut out, &mut line);
    out
}

fn flush_line(out: &mut String, line: &mut Vec<&TextSpan>) {
    if line.is_empty() {
        return;
    }
    line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    if !out.is_empty() {
        out.push('\n');
    }
    let joined = line
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(&joined);
    line.clear();
}

/// Merge ruling lines whose positions fall within `tolerance` of each
/// other. Each cluster is re-anchored at its mean position; overlapping or
/// nearly-touching segments on the same snapped position are joined.
fn snap_rulings(mut rulings: Vec<RulingLine>, tolerance: f64) -> Vec<RulingLine> {
    if rulings.is_empty() {
        return rulings;
    }
    rulings.sort_by(|a, b| {
        a.position
            .partial_cmp(&b.position)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let orientation = rulings[0].orientation;
    let mut snapped = Vec::new();
    let mut cluster: Vec<RulingLine> = Vec::new();
    for ruling in rulings {
        let split = cluster
            .last()
            .is_some_and(|prev| ruling.position - prev.position > tolerance);
        if split {
            snapped.extend(merge_cluster(&cluster, orientation, tolerance));
            cluster.clear();
        }
        cluster.push(ruling);
    }
    snapped.extend(merge_cluster(&cluster, orientation, tolerance));
    snapped
}

fn merge_cluster(
    cluster: &[RulingLine],
    orientation: Orientation,
    tolerance: f64,
) -> Vec<RulingLine> {
    if cluster.is_empty() {
        return Vec::new();
    }
    let position = cluster.iter().map(|r| r.position).sum::<f64>() / cluster.len() as f64;

    let mut segments: Vec<(f64, f64)> = cluster.iter().map(|r| (r.start, r.end)).collect();
    segments.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (start, end) in segments {
        match merged.last_mut() {
            Some(last) if start <= last.1 + tolerance => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    merged
        .into_iter()
        .map(|(start, end)| RulingLine {
            orientation,
            position,
            start,
            end,
        })
        .collect()
}

/// A crossing of one horizontal and one vertical ruling, recorded by their
/// indices so regions can be grouped by shared rulings.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    h_index: usize,
    v_index: usize,
    x: f64,
    top: f64,
}

fn find_crossings(
    horizontal: &[RulingLine],
    vertical: &[RulingLine],
    tolerance: f64,
) -> Vec<Crossing> {
    let mut crossings = Vec::new();
    for (h_index, h) in horizontal.iter().enumerate() {
        for (v_index, v) in vertical.iter().enumerate() {
            let crosses_x = v.position >= h.start - tolerance && v.position <= h.end + tolerance;
            let crosses_y = h.position >= v.start - tolerance && h.position <= v.end + tolerance;
            if crosses_x && crosses_y {
                crossings.push(Crossing {
                    h_index,
                    v_index,
                    x: v.position,
                    top: h.position,
                });
            }
        }
    }
    crossings
}

/// One detected table region: the sorted row and column boundary
/// coordinates spanned by a connected group of crossings.
struct Region {
    row_boundaries: Vec<f64>,
    col_boundaries: Vec<f64>,
}

/// Group crossings into connected components: two crossings belong to the
/// same table when they share a horizontal or a vertical ruling.
fn group_regions(crossings: &[Crossing], horizontal_count: usize) -> Vec<Region> {
    let mut components = UnionFind::new(crossings.len());
    // Map each ruling to the first crossing seen on it; later crossings on
    // the same ruling union with it.
    let mut first_on_ruling: std::collections::HashMap<usize, usize> =
        std::collections::HashMap::new();
    for (idx, crossing) in crossings.iter().enumerate() {
        // Horizontal rulings occupy 0..horizontal_count, verticals are
        // offset past them so both share one key space.
        for key in [crossing.h_index, horizontal_count + crossing.v_index] {
            match first_on_ruling.get(&key) {
                Some(&other) => components.union(idx, other),
                None => {
                    first_on_ruling.insert(key, idx);
                }
            }
        }
    }

    let mut by_root: std::collections::HashMap<usize, (Vec<f64>, Vec<f64>)> =
        std::collections::HashMap::new();
    for (idx, crossing) in crossings.iter().enumerate() {
        let root = components.find(idx);
        let entry = by_root.entry(root).or_default();
        entry.0.push(crossing.top);
        entry.1.push(crossing.x);
    }

    by_root
        .into_values()
        .map(|(tops, xs)| Region {
            row_boundaries: sorted_unique(tops),
            col_boundaries: sorted_unique(xs),
        })
        .collect()
}

fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
    values
}

/// Read a region out as a raw grid: one row per boundary gap, one cell per
/// column gap, filled with the text of spans anchored inside the cell.
fn read_region(region: &Region, spans: &[TextSpan]) -> Option<RawGrid> {
    let rows = region.row_boundaries.len();
    let cols = region.col_boundaries.len();
    if rows < 2 || cols < 2 {
        return None;
    }

    let mut cells: Vec<Vec<Vec<&TextSpan>>> = vec![vec![Vec::new(); cols - 1]; rows - 1];
    for span in spans {
        let Some(row) = gap_index(&region.row_boundaries, span.top) else {
            continue;
        };
        let Some(col) = gap_index(&region.col_boundaries, span.x) else {
            continue;
        };
        cells[row][col].push(span);
    }

    let grid = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|mut cell_spans| {
                    if cell_spans.is_empty() {
                        return None;
                    }
                    cell_spans.sort_by(|a, b| {
                        a.top
                            .partial_cmp(&b.top)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
                    });
                    Some(
                        cell_spans
                            .iter()
                            .map(|s| s.text.as_str())
                            .collect::<Vec<_>>()
                            .join(" "),
                    )
                })
                .collect::<RawRow>()
        })
        .collect();
    Some(grid)
}

/// Index of the boundary gap containing `value`, or `None` when it falls
/// outside the region.
fn gap_index(boundaries: &[f64], value: f64) -> Option<usize> {
    if boundaries.len() < 2 {
        return None;
    }
    let last = boundaries.len() - 1;
    if value < boundaries[0] || value >= boundaries[last] {
        return None;
    }
    for (idx, window) in boundaries.windows(2).enumerate() {
        if value >= window[0] && value < window[1] {
            return Some(idx);
        }
    }
    None
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_a] = root_b;
        }
    }
}
