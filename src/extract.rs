//! Document extraction: turn a parsed [`Document`] into normalized flat
//! text plus structured tables.

use crate::layout::{DetectSettings, detect_grids};
use crate::reader::Document;
use crate::table::{Table, build_table};
use crate::text::normalize_text;

/// The normalized output of extracting one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub text: String,
    pub tables: Vec<Table>,
}

/// Extract flat text and tables from a parsed document.
///
/// Paged documents get per-page text joined with blank lines, normalized
/// once at the end, and one table per detected grid region in page order.
/// Sheet documents get one text block and at most one table per sheet, in
/// workbook order. Grids that collapse to nothing after cleanup are
/// dropped without error.
#[must_use]
pub fn extract(document: &Document, settings: &DetectSettings) -> ExtractionResult {
    match document {
        Document::PagedLayout(doc) => {
            let mut text = String::new();
            let mut tables = Vec::new();
            for page in doc.pages() {
                // Every page contributes, blank ones included, so page
                // boundaries stay visible in the accumulated text.
                text.push_str(&page.text);
                text.push_str("\n\n");
                for grid in detect_grids(&page.layout, settings) {
                    if let Some(table) = build_table(grid) {
                        tables.push(table);
                    }
                }
            }
            tracing::debug!(
                pages = doc.pages().len(),
                tables = tables.len(),
                "extracted paged-layout document"
            );
            ExtractionResult {
                text: normalize_text(&text),
                tables,
            }
        }
        Document::TabularSheet(doc) => {
            let mut text = String::new();
            let mut tables = Vec::new();
            for sheet in doc.sheets() {
                text.push_str(&sheet.to_text());
                text.push('\n');
                if let Some(table) = build_table(sheet.grid.clone()) {
                    tables.push(table);
                }
            }
            tracing::debug!(
                sheets = doc.sheets().len(),
                tables = tables.len(),
                "extracted tabular-sheet document"
            );
            ExtractionResult { text, tables }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PageLayout, RulingLine, TextSpan};
    use crate::reader::{PagedDocument, Sheet, SheetDocument};

    fn bordered_page(rows: &[(&str, &str)], caption: &str) -> PageLayout {
        let mut page = PageLayout::new(612.0, 792.0);
        page.spans.push(TextSpan::new(caption, 10.0, 5.0));
        let top = 100.0;
        let row_height = 20.0;
        let bottom = top + rows.len() as f64 * row_height;
        for x in [10.0, 110.0, 210.0] {
            page.lines.push(RulingLine::vertical(x, top, bottom));
        }
        for (idx, (left, right)) in rows.iter().enumerate() {
            let row_top = top + idx as f64 * row_height;
            page.lines
                .push(RulingLine::horizontal(row_top, 10.0, 210.0));
            page.spans
                .push(TextSpan::new(*left, 20.0, row_top + 5.0));
            page.spans
                .push(TextSpan::new(*right, 120.0, row_top + 5.0));
        }
        page.lines
            .push(RulingLine::horizontal(bottom, 10.0, 210.0));
        page
    }

    #[test]
    fn paged_extraction_yields_text_and_tables() {
        let page = bordered_page(
            &[("Item", "Amount"), ("Revenue", "1200"), ("Costs", "800")],
            "Quarterly results",
        );
        let doc = Document::PagedLayout(PagedDocument::from_pages(vec![page]));
        let result = extract(&doc, &DetectSettings::default());

        assert!(result.text.contains("Quarterly results"));
        assert_eq!(result.tables.len(), 1);
        let table = &result.tables[0];
        assert_eq!(table.headers(), ["Item", "Amount"]);
        assert_eq!(table.value(0, "Item"), Some("Revenue"));
        assert_eq!(table.value(1, "Amount"), Some("800"));
    }

    #[test]
    fn paged_text_is_normalized() {
        let mut page = PageLayout::new(612.0, 792.0);
        page.spans
            .push(TextSpan::new("Total: \u{FFFD}500", 10.0, 10.0));
        let doc = Document::PagedLayout(PagedDocument::from_pages(vec![page]));
        let result = extract(&doc, &DetectSettings::default());
        assert!(result.text.contains("Total: $500"));
    }

    #[test]
    fn multi_page_tables_keep_page_order() {
        let first = bordered_page(&[("A", "B"), ("1", "2")], "page one");
        let second = bordered_page(&[("C", "D"), ("3", "4")], "page two");
        let doc = Document::PagedLayout(PagedDocument::from_pages(vec![first, second]));
        let result = extract(&doc, &DetectSettings::default());

        assert_eq!(result.tables.len(), 2);
        assert_eq!(result.tables[0].headers(), ["A", "B"]);
        assert_eq!(result.tables[1].headers(), ["C", "D"]);
        let one = result.text.find("page one").unwrap();
        let two = result.text.find("page two").unwrap();
        assert!(one < two);
    }

    #[test]
    fn sheet_extraction_yields_banner_text_and_tables() {
        let doc = Document::TabularSheet(SheetDocument::from_sheets(vec![Sheet {
            name: "Summary".to_string(),
            grid: vec![
                vec![Some("Item".to_string()), Some("Amount".to_string())],
                vec![Some("Revenue".to_string()), Some("1200".to_string())],
            ],
        }]));
        let result = extract(&doc, &DetectSettings::default());

        assert!(result.text.starts_with("Sheet: Summary\n"));
        assert!(result.text.contains("Revenue\t1200"));
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].headers(), ["Item", "Amount"]);
    }

    #[test]
    fn empty_sheets_contribute_no_tables() {
        let doc = Document::TabularSheet(SheetDocument::from_sheets(vec![
            Sheet {
                name: "Blank".to_string(),
                grid: Vec::new(),
            },
            Sheet {
                name: "Data".to_string(),
                grid: vec![vec![Some("H".to_string())], vec![Some("v".to_string())]],
            },
        ]));
        let result = extract(&doc, &DetectSettings::default());
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].headers(), ["H"]);
    }

    #[test]
    fn blank_pages_still_contribute_a_separator() {
        let blank = PageLayout::new(612.0, 792.0);
        let mut second = PageLayout::new(612.0, 792.0);
        second
            .spans
            .push(TextSpan::new("content after a blank page", 10.0, 10.0));
        let doc = Document::PagedLayout(PagedDocument::from_pages(vec![blank, second]));
        let result = extract(&doc, &DetectSettings::default());
        assert!(result.text.starts_with("\n\n"));
        assert!(result.text.contains("content after a blank page"));
    }

    #[test]
    fn pages_without_tables_still_contribute_text() {
        let mut page = PageLayout::new(612.0, 792.0);
        page.spans
            .push(TextSpan::new("narrative only", 10.0, 10.0));
        let doc = Document::PagedLayout(PagedDocument::from_pages(vec![page]));
        let result = extract(&doc, &DetectSettings::default());
        assert!(result.text.contains("narrative only"));
        assert!(result.tables.is_empty());
    }
}
