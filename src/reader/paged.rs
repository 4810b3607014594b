use lopdf::content::{Content, Operation};
use lopdf::{Document as PdfDocument, Object};

use crate::error::{FinqaError, Result};
use crate::layout::{PageLayout, RectShape, RulingLine, TextSpan, page_text};

/// US Letter, the fallback when a page carries no usable MediaBox.
const DEFAULT_PAGE_WIDTH: f64 = 612.0;
const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Maximum axis deviation for a path segment to count as a ruling line.
const AXIS_TOLERANCE: f64 = 0.5;

/// Fraction of the font size used as the per-character advance estimate
/// when laying out shown text.
const ADVANCE_FACTOR: f64 = 0.5;

/// One page of a paged-layout document: extracted text plus the geometric
/// layout used for table detection.
#[derive(Debug, Clone)]
pub struct PagedPage {
    pub text: String,
    pub layout: PageLayout,
}

/// A parsed paged-layout (PDF) document.
#[derive(Debug, Clone)]
pub struct PagedDocument {
    pages: Vec<PagedPage>,
}

impl PagedDocument {
    /// Parse PDF bytes into per-page text and layout.
    ///
    /// Page text comes from the library extractor when it yields anything,
    /// falling back to the layout-derived rendering. A page whose content
    /// stream cannot be decoded keeps its text but has empty geometry.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = PdfDocument::load_mem(bytes).map_err(|err| FinqaError::ExtractionFailed {
            reason: format!("failed to read pdf document: {err}"),
        })?;

        let mut pages = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            let (width, height) = page_size(&doc, page_id);
            let layout = match doc
                .get_page_content(page_id)
                .ok()
                .and_then(|raw| Content::decode(&raw).ok())
            {
                Some(content) => interpret_content(&content.operations, width, height),
                None => {
                    tracing::debug!(page = page_number, "page content stream not decodable");
                    PageLayout::new(width, height)
                }
            };

            let text = doc
                .extract_text(&[page_number])
                .ok()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| page_text(&layout));

            pages.push(PagedPage { text, layout });
        }

        Ok(Self { pages })
    }

    /// Build a document from already-materialized layouts; page text is
    /// derived from each layout's spans.
    #[must_use]
    pub fn from_pages(layouts: Vec<PageLayout>) -> Self {
        let pages = layouts
            .into_iter()
            .map(|layout| PagedPage {
                text: page_text(&layout),
                layout,
            })
            .collect();
        Self { pages }
    }

    #[must_use]
    pub fn pages(&self) -> &[PagedPage] {
        &self.pages
    }
}

fn page_size(doc: &PdfDocument, page_id: lopdf::ObjectId) -> (f64, f64) {
    let media_box = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|dict| dict.get(b"MediaBox").ok())
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| {
            if array.len() == 4 {
                let x0 = to_f64(&array[0])?;
                let y0 = to_f64(&array[1])?;
                let x1 = to_f64(&array[2])?;
                let y1 = to_f64(&array[3])?;
                Some(((x1 - x0).abs(), (y1 - y0).abs()))
            } else {
                None
            }
        });
    media_box.unwrap_or((DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT))
}

fn to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(f64::from(*v)),
        _ => None,
    }
}

/// A PDF transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Matrix {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    fn multiply(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
            e: self.e * rhs.a + self.f * rhs.c + rhs.e,
            f: self.e * rhs.b + self.f * rhs.d + rhs.f,
        }
    }

    fn apply(self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn is_axis_aligned(self) -> bool {
        self.b.abs() < f64::EPSILON && self.c.abs() < f64::EPSILON
    }
}

/// Interpreter state for one content stream.
struct ContentState {
    height: f64,
    ctm: Matrix,
    graphics_stack: Vec<Matrix>,
    current_point: Option<(f64, f64)>,
    pending_lines: Vec<RulingLine>,
    pending_rects: Vec<RectShape>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    leading: f64,
}

impl ContentState {
    fn new(height: f64) -> Self {
        Self {
            height,
            ctm: Matrix::IDENTITY,
            graphics_stack: Vec::new(),
            current_point: None,
            pending_lines: Vec::new(),
            pending_rects: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
        }
    }

    /// PDF y grows upward; layout coordinates grow downward from the top.
    fn to_top(&self, y: f64) -> f64 {
        self.height - y
    }
}

/// Walk a decoded content stream and collect the page's text spans and
/// ruling geometry. Unrecognized operators are ignored.
fn interpret_content(operations: &[Operation], width: f64, height: f64) -> PageLayout {
    let mut page = PageLayout::new(width, height);
    let mut state = ContentState::new(height);

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => state.graphics_stack.push(state.ctm),
            "Q" => {
                if let Some(ctm) = state.graphics_stack.pop() {
                    state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    state.ctm = m.multiply(state.ctm);
                }
            }
            "m" => {
                if let Some((x, y)) = point_operands(operands) {
                    state.current_point = Some(state.ctm.apply(x, y));
                }
            }
            "l" => {
                if let (Some((x, y)), Some(from)) = (point_operands(operands), state.current_point)
                {
                    let to = state.ctm.apply(x, y);
                    record_segment(&mut state, from, to);
                    state.current_point = Some(to);
                }
            }
            "re" => {
                if let Some([x, y, w, h]) = quad_operands(operands) {
                    record_rect(&mut state, x, y, w, h);
                }
            }
            // Painting commits pending geometry; `n` discards it.
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                page.lines.append(&mut state.pending_lines);
                page.rects.append(&mut state.pending_rects);
                state.current_point = None;
            }
            "n" => {
                state.pending_lines.clear();
                state.pending_rects.clear();
                state.current_point = None;
            }
            "BT" => {
                state.text_matrix = Matrix::IDENTITY;
                state.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(to_f64) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(to_f64) {
                    state.leading = leading;
                }
            }
            "Td" => {
                if let Some((tx, ty)) = point_operands(operands) {
                    move_text_line(&mut state, tx, ty);
                }
            }
            "TD" => {
                if let Some((tx, ty)) = point_operands(operands) {
                    state.leading = -ty;
                    move_text_line(&mut state, tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
            }
            "T*" => {
                let leading = state.leading;
                move_text_line(&mut state, 0.0, -leading);
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show_text(&mut state, &mut page, bytes);
                }
            }
            "'" => {
                let leading = state.leading;
                move_text_line(&mut state, 0.0, -leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show_text(&mut state, &mut page, bytes);
                }
            }
            "\"" => {
                let leading = state.leading;
                move_text_line(&mut state, 0.0, -leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    show_text(&mut state, &mut page, bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => show_text(&mut state, &mut page, bytes),
                            Object::Integer(v) => {
                                let shift = -(*v as f64) / 1000.0 * state.font_size;
                                advance_text(&mut state, shift);
                            }
                            Object::Real(v) => {
                                let shift = -f64::from(*v) / 1000.0 * state.font_size;
                                advance_text(&mut state, shift);
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    page
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    Some(Matrix {
        a: to_f64(&operands[0])?,
        b: to_f64(&operands[1])?,
        c: to_f64(&operands[2])?,
        d: to_f64(&operands[3])?,
        e: to_f64(&operands[4])?,
        f: to_f64(&operands[5])?,
    })
}

fn point_operands(operands: &[Object]) -> Option<(f64, f64)> {
    if operands.len() < 2 {
        return None;
    }
    Some((to_f64(&operands[0])?, to_f64(&operands[1])?))
}

fn quad_operands(operands: &[Object]) -> Option<[f64; 4]> {
    if operands.len() < 4 {
        return None;
    }
    Some([
        to_f64(&operands[0])?,
        to_f64(&operands[1])?,
        to_f64(&operands[2])?,
        to_f64(&operands[3])?,
    ])
}

/// Record an axis-aligned path segment as a pending ruling line. Diagonal
/// strokes are not table borders and are dropped.
fn record_segment(state: &mut ContentState, from: (f64, f64), to: (f64, f64)) {
    let (x0, y0) = from;
    let (x1, y1) = to;
    if (y1 - y0).abs() < AXIS_TOLERANCE {
        let top = state.to_top((y0 + y1) / 2.0);
        state.pending_lines.push(RulingLine::horizontal(top, x0, x1));
    } else if (x1 - x0).abs() < AXIS_TOLERANCE {
        state
            .pending_lines
            .push(RulingLine::vertical((x0 + x1) / 2.0, state.to_top(y0), state.to_top(y1)));
    }
}

fn record_rect(state: &mut ContentState, x: f64, y: f64, w: f64, h: f64) {
    if !state.ctm.is_axis_aligned() {
        return;
    }
    let (dx0, dy0) = state.ctm.apply(x, y);
    let (dx1, dy1) = state.ctm.apply(x + w, y + h);
    state.pending_rects.push(RectShape {
        x0: dx0.min(dx1),
        top: state.to_top(dy0.max(dy1)),
        x1: dx0.max(dx1),
        bottom: state.to_top(dy0.min(dy1)),
    });
}

fn move_text_line(state: &mut ContentState, tx: f64, ty: f64) {
    state.line_matrix = Matrix::translation(tx, ty).multiply(state.line_matrix);
    state.text_matrix = state.line_matrix;
}

fn advance_text(state: &mut ContentState, amount: f64) {
    state.text_matrix = Matrix::translation(amount, 0.0).multiply(state.text_matrix);
}

fn show_text(state: &mut ContentState, page: &mut PageLayout, bytes: &[u8]) {
    let text = decode_pdf_string(bytes);
    let combined = state.text_matrix.multiply(state.ctm);
    let (x, y) = (combined.e, combined.f);
    if !text.trim().is_empty() {
        page.spans
            .push(TextSpan::new(text.trim().to_string(), x, state.to_top(y)));
    }
    let advance = text.chars().count() as f64 * state.font_size * ADVANCE_FACTOR;
    advance_text(state, advance);
}

/// Decode a PDF string: UTF-16BE when it carries a BOM, otherwise treated
/// as Latin-1 so every byte maps to a character.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Orientation;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn int(v: i64) -> Object {
        Object::Integer(v)
    }

    fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), lopdf::StringFormat::Literal)
    }

    #[test]
    fn stroked_lines_become_rulings_with_top_coordinates() {
        let ops = vec![
            op("m", vec![int(10), int(700)]),
            op("l", vec![int(110), int(700)]),
            op("S", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert_eq!(page.lines.len(), 1);
        assert_eq!(page.lines[0].orientation, Orientation::Horizontal);
        assert!((page.lines[0].position - 92.0).abs() < 1e-9);
    }

    #[test]
    fn unpainted_paths_are_discarded() {
        let ops = vec![
            op("m", vec![int(10), int(700)]),
            op("l", vec![int(110), int(700)]),
            op("n", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert!(page.lines.is_empty());
    }

    #[test]
    fn diagonal_strokes_are_not_rulings() {
        let ops = vec![
            op("m", vec![int(10), int(10)]),
            op("l", vec![int(110), int(110)]),
            op("S", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert!(page.lines.is_empty());
    }

    #[test]
    fn rectangles_become_rect_shapes() {
        let ops = vec![
            op("re", vec![int(10), int(742), int(100), int(40)]),
            op("S", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert_eq!(page.rects.len(), 1);
        let rect = page.rects[0];
        assert!((rect.x0 - 10.0).abs() < 1e-9);
        assert!((rect.top - 10.0).abs() < 1e-9);
        assert!((rect.x1 - 110.0).abs() < 1e-9);
        assert!((rect.bottom - 50.0).abs() < 1e-9);
    }

    #[test]
    fn shown_text_is_positioned_by_the_text_matrix() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(12)]),
            op("Td", vec![int(72), int(720)]),
            op("Tj", vec![string("Revenue")]),
            op("ET", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert_eq!(page.spans.len(), 1);
        assert_eq!(page.spans[0].text, "Revenue");
        assert!((page.spans[0].x - 72.0).abs() < 1e-9);
        assert!((page.spans[0].top - 72.0).abs() < 1e-9);
    }

    #[test]
    fn td_moves_between_lines() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(12)]),
            op("Td", vec![int(72), int(720)]),
            op("Tj", vec![string("first")]),
            op("Td", vec![int(0), int(-20)]),
            op("Tj", vec![string("second")]),
            op("ET", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert_eq!(page.spans.len(), 2);
        assert!((page.spans[1].top - 92.0).abs() < 1e-9);
        assert!(
            (page.spans[1].x - 72.0).abs() < 1e-9,
            "Td is relative to the line start, not the shown text's end"
        );
    }

    #[test]
    fn cm_translation_shifts_geometry() {
        let ops = vec![
            op("q", vec![]),
            op("cm", vec![int(1), int(0), int(0), int(1), int(50), int(0)]),
            op("m", vec![int(0), int(700)]),
            op("l", vec![int(100), int(700)]),
            op("S", vec![]),
            op("Q", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert_eq!(page.lines.len(), 1);
        assert!((page.lines[0].start - 50.0).abs() < 1e-9);
        assert!((page.lines[0].end - 150.0).abs() < 1e-9);
    }

    #[test]
    fn tj_array_strings_all_land_on_the_page() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(10)]),
            op("Td", vec![int(10), int(780)]),
            op(
                "TJ",
                vec![Object::Array(vec![string("Net"), int(-250), string("Income")])],
            ),
            op("ET", vec![]),
        ];
        let page = interpret_content(&ops, 612.0, 792.0);
        assert_eq!(page.spans.len(), 2);
        assert!(page.spans[1].x > page.spans[0].x);
    }

    #[test]
    fn utf16_strings_decode_via_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Gewinn".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "Gewinn");
    }

    #[test]
    fn latin1_bytes_round_trip() {
        assert_eq!(decode_pdf_string(&[0x4E, 0x65, 0x74, 0x74, 0x6F]), "Netto");
        assert_eq!(decode_pdf_string(&[0xE9]), "é");
    }

    #[test]
    fn garbage_bytes_fail_with_extraction_error() {
        let err = PagedDocument::parse(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, FinqaError::ExtractionFailed { .. }));
    }

    #[test]
    fn from_pages_derives_text_from_spans() {
        let mut layout = PageLayout::new(612.0, 792.0);
        layout.spans.push(TextSpan::new("hello", 10.0, 10.0));
        let doc = PagedDocument::from_pages(vec![layout]);
        assert_eq!(doc.pages().len(), 1);
        assert_eq!(doc.pages()[0].text, "hello");
    }
}
