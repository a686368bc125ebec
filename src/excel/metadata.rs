//! Workbook metadata read from fixed SINAPI header cells
//!
//! | cell | content |
//! |------|---------|
//! | B3   | reference month (`MM/YYYY`) |
//! | D4   | pricing regime label |
//! | D5   | region code, falling back to C3 |

use crate::error::{SinapiError, SinapiResult};
use crate::excel::classifier::select_metadata_sheet;
use crate::excel::workbook::{Grid, Workbook};
use crate::text::cell_text;
use crate::types::{SinapiMetadata, SourceType};
use calamine::Data;

pub const METADATA_SCAN_ROWS: usize = 20;
pub const UNKNOWN: &str = "UNKNOWN";
pub const NATIONAL_REGION: &str = "BR";

const REFERENCE_MONTH_CELL: (usize, usize) = (2, 1);
const REGIME_CELL: (usize, usize) = (3, 3);
const REGION_CELL: (usize, usize) = (4, 3);
const REGION_FALLBACK_CELL: (usize, usize) = (2, 2);

/// Date cells render as `MM/YYYY`; everything else as its text.
fn month_text(cell: &Data) -> String {
    let as_date = match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(iso) => chrono::NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .or_else(|| {
                chrono::NaiveDate::parse_from_str(iso, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
        _ => None,
    };
    match as_date {
        Some(dt) => dt.format("%m/%Y").to_string(),
        None => cell_text(cell).trim().to_string(),
    }
}

fn region_code(cell: &Data) -> Option<String> {
    let code = cell_text(cell).trim().to_uppercase();
    (code.chars().count() == 2 && code.chars().all(|c| c.is_alphabetic())).then_some(code)
}

/// Read metadata from the top rows of an already loaded sheet.
pub fn metadata_from_grid(grid: &Grid, source: SourceType) -> SinapiMetadata {
    let (r, c) = REFERENCE_MONTH_CELL;
    let month = month_text(grid.cell(r, c));
    let reference_month = if month.chars().count() > 4 {
        month
    } else {
        UNKNOWN.to_string()
    };

    let (r, c) = REGIME_CELL;
    let regime = cell_text(grid.cell(r, c)).trim().to_uppercase();
    let pricing_regime = if regime.is_empty() || regime == "NAN" {
        UNKNOWN.to_string()
    } else {
        regime
    };

    let region = [REGION_CELL, REGION_FALLBACK_CELL]
        .iter()
        .find_map(|(r, c)| region_code(grid.cell(*r, *c)))
        .unwrap_or_else(|| NATIONAL_REGION.to_string());

    SinapiMetadata {
        reference_month,
        region,
        pricing_regime,
        source: source.name().to_string(),
    }
}

/// Extract reference month, region and regime label for the whole workbook.
///
/// Any failure is reported as a single [`SinapiError::Metadata`].
pub fn extract_metadata(
    workbook: &mut Workbook,
    sheet_hint: Option<&str>,
    source: SourceType,
) -> SinapiResult<SinapiMetadata> {
    let sheet = select_metadata_sheet(workbook.sheet_names(), sheet_hint)
        .map(str::to_string)
        .ok_or_else(|| SinapiError::Metadata("workbook has no sheets".to_string()))?;
    let grid = workbook
        .read_grid(&sheet)
        .map_err(|e| SinapiError::Metadata(e.to_string()))?;
    Ok(metadata_from_grid(&grid.head(METADATA_SCAN_ROWS), source))
}
