//! Sheet selection and pricing-regime classification by sheet name

use crate::text::normalize_sheet_name;
use crate::types::PricingRegime;

/// Lowercase tokens marking a price sheet.
pub const PRICE_SHEET_TOKENS: &[&str] = &["csd", "ccd", "cse"];

/// Known non-data sheets, skipped when no sheet carries a price token.
pub const IGNORED_SHEETS: &[&str] = &["MENU", "BUSCA", "OBS", "INSTRUCOES"];

/// Tokens preferred when choosing the sheet holding workbook metadata.
pub const METADATA_SHEET_TOKENS: &[&str] = &["CSD", "CCD", "CSE", "ANALITICO"];

/// Token marking analytic (catalog) sheets.
pub const CATALOG_SHEET_TOKEN: &str = "analitico";

/// Ordered: the first token found in the sheet name decides the regime.
pub const REGIME_TOKENS: &[(&str, PricingRegime)] = &[
    ("CCD", PricingRegime::ComDesoneracao),
    ("COM DESONERACAO", PricingRegime::ComDesoneracao),
    ("CSE", PricingRegime::Empreitada),
    ("EMPREITADA", PricingRegime::Empreitada),
    ("CSD", PricingRegime::SemDesoneracao),
    ("SEM DESONERACAO", PricingRegime::SemDesoneracao),
];

fn is_ignored(name: &str) -> bool {
    let upper = normalize_sheet_name(name).to_uppercase();
    IGNORED_SHEETS.iter().any(|ignored| upper.contains(ignored))
}

/// Sheets holding price data, in workbook order.
///
/// Falls back to every sheet outside [`IGNORED_SHEETS`] when none has a price token.
pub fn select_price_sheets(sheet_names: &[String]) -> Vec<String> {
    let tagged: Vec<String> = sheet_names
        .iter()
        .filter(|name| {
            let norm = normalize_sheet_name(name);
            PRICE_SHEET_TOKENS.iter().any(|t| norm.contains(t))
        })
        .cloned()
        .collect();

    if !tagged.is_empty() {
        return tagged;
    }

    sheet_names
        .iter()
        .filter(|name| !is_ignored(name))
        .cloned()
        .collect()
}

pub fn classify_pricing_regime(sheet_name: &str) -> PricingRegime {
    let upper = normalize_sheet_name(sheet_name).to_uppercase();
    REGIME_TOKENS
        .iter()
        .find(|(token, _)| upper.contains(token))
        .map(|(_, regime)| *regime)
        .unwrap_or_default()
}

/// Sheet to read metadata from: the hint if it exists, else the first
/// sheet with a metadata token, else the first sheet.
pub fn select_metadata_sheet<'a>(sheet_names: &'a [String], hint: Option<&str>) -> Option<&'a str> {
    if let Some(hint) = hint {
        if let Some(found) = sheet_names.iter().find(|s| s.as_str() == hint) {
            return Some(found.as_str());
        }
    }
    sheet_names
        .iter()
        .find(|s| {
            let upper = normalize_sheet_name(s).to_uppercase();
            METADATA_SHEET_TOKENS.iter().any(|t| upper.contains(t))
        })
        .or_else(|| sheet_names.first())
        .map(String::as_str)
}

/// Analytic sheets that are not themselves price sheets.
pub fn select_catalog_sheets(sheet_names: &[String], price_sheets: &[String]) -> Vec<String> {
    sheet_names
        .iter()
        .filter(|name| {
            normalize_sheet_name(name).contains(CATALOG_SHEET_TOKEN) && !price_sheets.contains(*name)
        })
        .cloned()
        .collect()
}
