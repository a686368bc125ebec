//! Text normalization helpers for SINAPI workbooks
//!
//! Pure functions shared by header detection, sheet classification and
//! record extraction: accent stripping, HYPERLINK display text, fuzzy match
//! keys and Brazilian-locale currency parsing.

use calamine::Data;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Match keys shorter than this are too ambiguous to correlate descriptions.
pub const MIN_MATCH_KEY_LEN: usize = 6;

static HYPERLINK_DISPLAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)HYPERLINK\s*\(.*,\s*"(.*)"\s*\)"#).expect("valid HYPERLINK display regex")
});

/// Render a cell the way a spreadsheet user would read it.
///
/// Whole floats lose their `.0` so numeric codes read back as `"104658"`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Canonical decomposition, combining marks removed, lowercased.
pub fn strip_accents_lower(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Display text of a `=HYPERLINK(target, "display")` formula string.
///
/// Other formulas lose their `=` and `"` characters; plain text is returned trimmed.
pub fn hyperlink_display_text(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with('=') {
        return text.to_string();
    }
    if let Some(caps) = HYPERLINK_DISPLAY.captures(text) {
        return caps[1].to_string();
    }
    text.replace(['"', '='], "")
}

/// Cell-level variant of [`hyperlink_display_text`]; empty cells yield `""`.
pub fn extract_hyperlink_display_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => hyperlink_display_text(&cell_text(other)),
    }
}

/// Fuzzy key for correlating a description across independently formatted sheets.
pub fn build_match_key(text: &str) -> String {
    strip_accents_lower(&hyperlink_display_text(text))
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

pub fn is_reliable_match_key(key: &str) -> bool {
    key.len() >= MIN_MATCH_KEY_LEN
}

/// Parse a monetary cell in Brazilian notation (`1.234,56`).
///
/// Numeric cells pass through. Blank, `-`, non-finite values and anything
/// that fails to parse yield `None`.
pub fn parse_brazilian_currency(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) if !f.is_finite() => None,
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_brazilian_currency_str(s),
        _ => None,
    }
}

pub fn parse_brazilian_currency_str(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || text == "-" || text.eq_ignore_ascii_case("nan") {
        return None;
    }
    text.replace('.', "")
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn normalize_sheet_name(name: &str) -> String {
    strip_accents_lower(name).trim().to_string()
}

/// Header-cell form used for role matching: no accents, trimmed, uppercase.
pub fn normalize_header_cell(cell: &Data) -> String {
    strip_accents_lower(&cell_text(cell)).trim().to_uppercase()
}
