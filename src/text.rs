//! Character-level cleanup applied to every extracted string.
//!
//! Financial PDFs from certain producers mis-decode the currency glyph to
//! U+FFFD and leak stray `!` artifacts from ruling strokes. The fix is a
//! fixed, ordered find/replace table applied uniformly to page text, cell
//! values, and headers.

/// Ordered literal substitutions. Extend here when a new producer quirk
/// shows up; order matters if a later pair could re-introduce an earlier
/// pattern.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    // Mis-decoded currency glyph.
    ("\u{FFFD}", "$"),
    // Stray ruling-stroke artifact.
    ("!", ""),
];

/// Normalize extracted page text.
///
/// Applies the substitution table only; leading/trailing whitespace is
/// preserved because page text keeps its layout separators. Total and
/// idempotent: a second pass is always a no-op.
#[must_use]
pub fn normalize_text(s: &str) -> String {
    let mut out = s.to_string();
    for (from, to) in SUBSTITUTIONS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

/// Normalize a cell value or header label.
///
/// Same substitutions as [`normalize_text`], plus a whitespace trim. The
/// trim applies to cells and headers only, never to full-page text.
#[must_use]
pub fn normalize_cell(s: &str) -> String {
    normalize_text(s).trim().to_string()
}
