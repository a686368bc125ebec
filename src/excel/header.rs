//! Header row detection for SINAPI sheets
//!
//! SINAPI releases are not stable month to month: the header may sit on a
//! single row, be split across two rows (state codes above the labels), or
//! lack the CODIGO/DESCRICAO labels entirely. [`locate_header`] tries three
//! strategies in order and the first hit wins.

use crate::excel::workbook::Grid;
use crate::text::normalize_header_cell;
use crate::types::Region;
use std::collections::BTreeMap;

/// Rows scanned by the label-based strategies.
pub const LABEL_SCAN_ROWS: usize = 20;
/// Rows scanned by the region-density fallback.
pub const DENSITY_SCAN_ROWS: usize = 15;
/// The row above a label row must hold at least this many region codes.
pub const TWO_ROW_MIN_REGIONS: usize = 5;
/// The density fallback needs strictly more region codes than this.
pub const DENSITY_MIN_REGIONS: usize = 5;

/// Semantic role of a non-price column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Code,
    Description,
    Unit,
    Group,
}

/// One entry of the column-role rule table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub needle: &'static str,
    pub role: ColumnRole,
}

impl ColumnRule {
    pub fn matches(&self, normalized_cell: &str) -> bool {
        normalized_cell.contains(self.needle)
    }
}

/// Evaluated top to bottom against each normalized header cell.
pub const COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule {
        needle: "CODIGO",
        role: ColumnRole::Code,
    },
    ColumnRule {
        needle: "DESCRICAO",
        role: ColumnRole::Description,
    },
    ColumnRule {
        needle: "UNIDADE",
        role: ColumnRole::Unit,
    },
    ColumnRule {
        needle: "GRUPO",
        role: ColumnRole::Group,
    },
];

/// Which strategy produced a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStrategy {
    SingleRow,
    TwoRow,
    RegionDensity,
    Catalog,
}

impl HeaderStrategy {
    pub fn name(self) -> &'static str {
        match self {
            HeaderStrategy::SingleRow => "single-row",
            HeaderStrategy::TwoRow => "two-row",
            HeaderStrategy::RegionDensity => "region-density",
            HeaderStrategy::Catalog => "catalog",
        }
    }
}

/// Header row position and column roles of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    /// 0-based grid row of the header.
    pub row: usize,
    pub code: Option<usize>,
    pub description: Option<usize>,
    pub unit: Option<usize>,
    pub group: Option<usize>,
    /// Column index → region of each price column.
    pub regions: BTreeMap<usize, Region>,
    pub strategy: HeaderStrategy,
}

impl HeaderLayout {
    fn empty(row: usize, strategy: HeaderStrategy) -> Self {
        Self {
            row,
            code: None,
            description: None,
            unit: None,
            group: None,
            regions: BTreeMap::new(),
            strategy,
        }
    }

    pub fn data_start(&self) -> usize {
        self.row + 1
    }

    pub fn column(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Code => self.code,
            ColumnRole::Description => self.description,
            ColumnRole::Unit => self.unit,
            ColumnRole::Group => self.group,
        }
    }

    fn slot(&mut self, role: ColumnRole) -> &mut Option<usize> {
        match role {
            ColumnRole::Code => &mut self.code,
            ColumnRole::Description => &mut self.description,
            ColumnRole::Unit => &mut self.unit,
            ColumnRole::Group => &mut self.group,
        }
    }

    /// Classify every cell of a normalized row. Region cells go to the
    /// region map; other cells take the first matching rule whose role is
    /// still unassigned.
    fn assign_columns(&mut self, cells: &[String], regions: &[Region]) {
        for (col, value) in cells.iter().enumerate() {
            if let Some(region) = recognized_region(value, regions) {
                self.regions.insert(col, region);
                continue;
            }
            if let Some(rule) = COLUMN_RULES.iter().find(|r| r.matches(value)) {
                let slot = self.slot(rule.role);
                if slot.is_none() {
                    *slot = Some(col);
                }
            }
        }
    }
}

fn recognized_region(value: &str, regions: &[Region]) -> Option<Region> {
    Region::from_code(value).filter(|r| regions.contains(r))
}

fn normalized_row(grid: &Grid, row: usize) -> Vec<String> {
    grid.row(row).iter().map(normalize_header_cell).collect()
}

fn count_regions(cells: &[String], regions: &[Region]) -> usize {
    cells
        .iter()
        .filter(|v| recognized_region(v, regions).is_some())
        .count()
}

fn has_code_or_description_label(cells: &[String]) -> bool {
    cells
        .iter()
        .any(|v| v.contains("CODIGO") || v.contains("DESCRICAO"))
}

/// Find the header of a price sheet, trying each strategy in order.
pub fn locate_header(grid: &Grid, regions: &[Region]) -> Option<HeaderLayout> {
    locate_single_row(grid, regions)
        .or_else(|| locate_two_row(grid, regions))
        .or_else(|| locate_by_region_density(grid, regions))
}

/// Region codes and a CODIGO or DESCRICAO label on the same row.
pub fn locate_single_row(grid: &Grid, regions: &[Region]) -> Option<HeaderLayout> {
    (0..grid.height().min(LABEL_SCAN_ROWS)).find_map(|row| {
        let cells = normalized_row(grid, row);
        if count_regions(&cells, regions) == 0 || !has_code_or_description_label(&cells) {
            return None;
        }
        let mut layout = HeaderLayout::empty(row, HeaderStrategy::SingleRow);
        layout.assign_columns(&cells, regions);
        Some(layout)
    })
}

/// Labels on one row, region codes on the row directly above.
pub fn locate_two_row(grid: &Grid, regions: &[Region]) -> Option<HeaderLayout> {
    (1..grid.height().min(LABEL_SCAN_ROWS)).find_map(|row| {
        let cells = normalized_row(grid, row);
        if !has_code_or_description_label(&cells) {
            return None;
        }
        let above = normalized_row(grid, row - 1);
        if count_regions(&above, regions) < TWO_ROW_MIN_REGIONS {
            return None;
        }
        let mut layout = HeaderLayout::empty(row, HeaderStrategy::TwoRow);
        layout.assign_columns(&cells, regions);
        for (col, value) in above.iter().enumerate() {
            if let Some(region) = recognized_region(value, regions) {
                layout.regions.insert(col, region);
            }
        }
        Some(layout)
    })
}

/// First row with more than [`DENSITY_MIN_REGIONS`] region codes.
pub fn locate_by_region_density(grid: &Grid, regions: &[Region]) -> Option<HeaderLayout> {
    (0..grid.height().min(DENSITY_SCAN_ROWS)).find_map(|row| {
        let cells = normalized_row(grid, row);
        if count_regions(&cells, regions) <= DENSITY_MIN_REGIONS {
            return None;
        }
        let mut layout = HeaderLayout::empty(row, HeaderStrategy::RegionDensity);
        layout.assign_columns(&cells, regions);
        Some(layout)
    })
}

/// Header of an analytic (catalog) sheet: CODIGO and DESCRICAO on one row, no prices.
pub fn locate_catalog_header(grid: &Grid) -> Option<HeaderLayout> {
    (0..grid.height().min(LABEL_SCAN_ROWS)).find_map(|row| {
        let cells = normalized_row(grid, row);
        let has_code = cells.iter().any(|v| v.contains("CODIGO"));
        let has_description = cells.iter().any(|v| v.contains("DESCRICAO"));
        if !(has_code && has_description) {
            return None;
        }
        let mut layout = HeaderLayout::empty(row, HeaderStrategy::Catalog);
        layout.assign_columns(&cells, &[]);
        Some(layout)
    })
}
