//! Record extraction from SINAPI price sheets
//!
//! Walks the data rows below a located header and emits one
//! [`CompositionRecord`] per valid row plus a [`PriceRecord`] when at least
//! one region column holds a price.
//!
//! Price sheets often wrap the composition code in a `HYPERLINK` formula.
//! Computed-value readers then see `0` in the code column, so when the first
//! rows all look blank the sheet is re-read at the formula level and the code
//! is taken from the formula's last numeric argument.

use crate::error::SkipReason;
use crate::excel::classifier::classify_pricing_regime;
use crate::excel::header::{locate_catalog_header, locate_header, HeaderLayout};
use crate::excel::workbook::{read_raw_formula_or_value, CellContent, FormulaGrid, Grid, Workbook};
use crate::text::{
    build_match_key, cell_text, extract_hyperlink_display_text, is_reliable_match_key,
    parse_brazilian_currency,
};
use crate::types::{CompositionRecord, PriceRecord, PricingRegime, Region, RegionPrices};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Data rows inspected when deciding whether codes live in formulas.
pub const FORMULA_PROBE_ROWS: usize = 10;

/// Placeholder for unmapped or blank unit/group cells.
pub const MISSING_FIELD: &str = "-";

static HYPERLINK_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,)]\s*(\d+)\s*\)\s*$").expect("valid HYPERLINK code regex"));

/// Numeric code carried as the last argument of a HYPERLINK formula.
///
/// `=HYPERLINK("#"&CELL("address",A1),104658)` yields `"104658"`.
pub fn extract_hyperlink_code(formula: &str) -> Option<String> {
    HYPERLINK_CODE
        .captures(formula)
        .map(|caps| caps[1].to_string())
}

/// Trim and drop a trailing `.0` left by float rendering.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).trim().to_string()
}

fn is_blank_code(cell: &calamine::Data) -> bool {
    let text = cell_text(cell);
    matches!(text.trim(), "" | "0" | "0.0")
}

/// Codes probably hidden behind formulas: every probed value is blank or zero.
pub fn codes_look_blank(grid: &Grid, layout: &HeaderLayout, code_col: usize) -> bool {
    (layout.data_start()..grid.height())
        .take(FORMULA_PROBE_ROWS)
        .all(|row| is_blank_code(grid.cell(row, code_col)))
}

/// Row index → code recovered from the code column at the formula level.
pub fn formula_codes(
    values: &Grid,
    formulas: &FormulaGrid,
    code_col: usize,
    data_start: usize,
) -> HashMap<usize, String> {
    let height = values.height().max(formulas.height());
    let mut codes = HashMap::new();
    for row in data_start..height {
        match read_raw_formula_or_value(values, formulas, row, code_col) {
            CellContent::Formula(text) => {
                if let Some(code) = extract_hyperlink_code(&text) {
                    codes.insert(row, code);
                }
            }
            CellContent::Literal(value) => {
                let text = cell_text(&value);
                let text = text.trim();
                if !text.is_empty() && text != "0" {
                    codes.insert(row, normalize_code(text));
                }
            }
        }
    }
    codes
}

//==============================================================================
// Catalog (analytic sheets)
//==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: String,
    pub description: String,
    pub unit: String,
    pub group: String,
}

/// Compositions listed on analytic sheets, used to fill gaps in price rows.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_code: HashMap<String, CatalogEntry>,
    code_by_key: HashMap<String, String>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// First entry per code and per match key wins; short keys are never indexed.
    pub fn insert(&mut self, entry: CatalogEntry) {
        let key = build_match_key(&entry.description);
        if is_reliable_match_key(&key) {
            self.code_by_key
                .entry(key)
                .or_insert_with(|| entry.code.clone());
        }
        self.by_code.entry(entry.code.clone()).or_insert(entry);
    }

    pub fn get(&self, code: &str) -> Option<&CatalogEntry> {
        self.by_code.get(code)
    }

    pub fn code_for_description(&self, description: &str) -> Option<&str> {
        let key = build_match_key(description);
        if !is_reliable_match_key(&key) {
            return None;
        }
        self.code_by_key.get(&key).map(String::as_str)
    }

    /// Add every valid row below an analytic sheet's header.
    pub fn extend_from_grid(&mut self, grid: &Grid) -> Result<usize, SkipReason> {
        let layout = locate_catalog_header(grid).ok_or(SkipReason::HeaderNotFound)?;
        let (Some(code_col), Some(desc_col)) = (layout.code, layout.description) else {
            return Err(SkipReason::HeaderNotFound);
        };
        let before = self.len();
        for row in layout.data_start()..grid.height() {
            let code = normalize_code(&cell_text(grid.cell(row, code_col)));
            if !is_valid_code(&code) {
                continue;
            }
            let description = extract_hyperlink_display_text(grid.cell(row, desc_col))
                .trim()
                .to_string();
            self.insert(CatalogEntry {
                code,
                description,
                unit: optional_field(grid, row, layout.unit),
                group: optional_field(grid, row, layout.group),
            });
        }
        Ok(self.len() - before)
    }
}

//==============================================================================
// Row extraction
//==============================================================================

/// Records extracted from one sheet, in row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRecords {
    pub compositions: Vec<CompositionRecord>,
    pub prices: Vec<PriceRecord>,
}

/// Codes are kept when all digits or at least three characters long.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && (code.chars().all(|c| c.is_ascii_digit()) || code.chars().count() >= 3)
}

fn optional_field(grid: &Grid, row: usize, col: Option<usize>) -> String {
    col.map(|c| cell_text(grid.cell(row, c)).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING_FIELD.to_string())
}

/// Per-sheet settings shared by every row.
pub struct RowContext<'a> {
    pub layout: &'a HeaderLayout,
    pub regime: PricingRegime,
    pub reference_month: &'a str,
    pub code_overrides: &'a HashMap<usize, String>,
    pub catalog: &'a Catalog,
}

/// Build the records of one data row, or `None` when the row carries no usable code.
pub fn process_row(
    grid: &Grid,
    row: usize,
    ctx: &RowContext<'_>,
) -> Option<(CompositionRecord, Option<PriceRecord>)> {
    let layout = ctx.layout;
    let mut description = layout
        .description
        .map(|c| extract_hyperlink_display_text(grid.cell(row, c)).trim().to_string())
        .unwrap_or_default();

    let code = ctx
        .code_overrides
        .get(&row)
        .cloned()
        .filter(|c| !c.is_empty())
        .or_else(|| layout.code.map(|c| normalize_code(&cell_text(grid.cell(row, c)))))
        .filter(|c| !c.is_empty())
        .or_else(|| {
            ctx.catalog
                .code_for_description(&description)
                .map(str::to_string)
        })?;

    if !is_valid_code(&code) {
        return None;
    }

    let mut unit = optional_field(grid, row, layout.unit);
    let mut group = optional_field(grid, row, layout.group);
    if let Some(entry) = ctx.catalog.get(&code) {
        if description.is_empty() {
            description = entry.description.clone();
        }
        if unit == MISSING_FIELD {
            unit = entry.unit.clone();
        }
        if group == MISSING_FIELD {
            group = entry.group.clone();
        }
    }

    let composition = CompositionRecord {
        composition_code: code.clone(),
        description,
        unit,
        group,
        reference_month: ctx.reference_month.to_string(),
    };

    let mut prices = RegionPrices::default();
    for (col, region) in &layout.regions {
        prices.set(*region, parse_brazilian_currency(grid.cell(row, *col)));
    }
    let price = prices.has_any().then(|| PriceRecord {
        composition_code: code,
        reference_month: ctx.reference_month.to_string(),
        pricing_regime: ctx.regime,
        prices,
    });

    Some((composition, price))
}

/// Walk every row strictly below the header.
pub fn extract_rows(grid: &Grid, ctx: &RowContext<'_>) -> SheetRecords {
    let mut records = SheetRecords::default();
    for row in ctx.layout.data_start()..grid.height() {
        let Some((composition, price)) = process_row(grid, row, ctx) else {
            continue;
        };
        records.compositions.push(composition);
        if let Some(price) = price {
            records.prices.push(price);
        }
    }
    records
}

/// Extract compositions and prices from one price sheet.
///
/// A sheet that cannot be read or has no recognizable header yields a
/// [`SkipReason`]; callers log it and move on.
pub fn extract_sheet_records(
    workbook: &mut Workbook,
    sheet: &str,
    reference_month: &str,
    catalog: &Catalog,
) -> Result<SheetRecords, SkipReason> {
    let grid = workbook
        .read_grid(sheet)
        .map_err(|e| SkipReason::ReadFailed(e.to_string()))?;
    let layout = locate_header(&grid, &Region::ALL).ok_or(SkipReason::HeaderNotFound)?;
    debug!(
        sheet,
        row = layout.row,
        strategy = layout.strategy.name(),
        regions = layout.regions.len(),
        "header located"
    );
    if layout.data_start() >= grid.height() {
        return Err(SkipReason::NoDataRows);
    }

    let regime = classify_pricing_regime(sheet);

    let code_overrides = match layout.code {
        Some(code_col) if codes_look_blank(&grid, &layout, code_col) => {
            info!(sheet, "code column reads as zero, recovering codes from formulas");
            match workbook.read_formulas(sheet) {
                Ok(formulas) => {
                    let codes = formula_codes(&grid, &formulas, code_col, layout.data_start());
                    info!(sheet, recovered = codes.len(), "formula codes extracted");
                    codes
                }
                Err(e) => {
                    warn!(sheet, error = %e, "formula read failed, using computed values");
                    HashMap::new()
                }
            }
        }
        _ => HashMap::new(),
    };

    let ctx = RowContext {
        layout: &layout,
        regime,
        reference_month,
        code_overrides: &code_overrides,
        catalog,
    };
    Ok(extract_rows(&grid, &ctx))
}
