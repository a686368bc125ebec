//! Workbook access over calamine
//!
//! Sheets are read as raw grids addressed by absolute (0-based) sheet
//! coordinates, so `grid.cell(2, 1)` is always cell B3 no matter where the
//! used range of the sheet begins.

use crate::error::{SinapiError, SinapiResult};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use std::io::Cursor;

static EMPTY: Data = Data::Empty;

/// An opened multi-sheet spreadsheet backed by an owned byte blob.
pub struct Workbook {
    sheets: Sheets<Cursor<Vec<u8>>>,
    sheet_names: Vec<String>,
}

impl Workbook {
    /// Open `.xls`, `.xlsx`, `.xlsb` or `.ods` content.
    pub fn open(bytes: Vec<u8>) -> SinapiResult<Self> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| SinapiError::WorkbookOpen(e.to_string()))?;
        let sheet_names = sheets.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(SinapiError::WorkbookOpen(
                "workbook has no sheets".to_string(),
            ));
        }
        Ok(Self {
            sheets,
            sheet_names,
        })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Computed cell values, no header interpretation.
    pub fn read_grid(&mut self, sheet: &str) -> SinapiResult<Grid> {
        let range = self
            .sheets
            .worksheet_range(sheet)
            .map_err(|e| SinapiError::SheetRead {
                sheet: sheet.to_string(),
                message: e.to_string(),
            })?;
        Ok(Grid::from_range(&range))
    }

    /// Formula text per cell (without the leading `=`); empty where the cell is literal.
    pub fn read_formulas(&mut self, sheet: &str) -> SinapiResult<FormulaGrid> {
        let range = self
            .sheets
            .worksheet_formula(sheet)
            .map_err(|e| SinapiError::SheetRead {
                sheet: sheet.to_string(),
                message: e.to_string(),
            })?;
        Ok(FormulaGrid::from_range(&range))
    }
}

/// Raw 2D cell grid of one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Data>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Data>>) -> Self {
        Self { rows }
    }

    /// Convenience for fixtures: every non-empty string becomes a text cell.
    pub fn from_strings(rows: &[&[&str]]) -> Self {
        Self::from_rows(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|s| {
                            if s.is_empty() {
                                Data::Empty
                            } else {
                                Data::String(s.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    fn from_range(range: &Range<Data>) -> Self {
        let Some((start_row, start_col)) = range.start() else {
            return Self::default();
        };
        let mut rows = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![Data::Empty; start_col as usize];
            cells.extend(row.iter().cloned());
            rows.push(cells);
        }
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> &[Data] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Out-of-range cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Data {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// First `n` rows (fewer if the sheet is shorter).
    pub fn head(&self, n: usize) -> Grid {
        Grid::from_rows(self.rows.iter().take(n).cloned().collect())
    }
}

/// Formula text grid aligned with [`Grid`] coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaGrid {
    rows: Vec<Vec<String>>,
}

impl FormulaGrid {
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    fn from_range(range: &Range<String>) -> Self {
        let Some((start_row, start_col)) = range.start() else {
            return Self::default();
        };
        let mut rows = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().cloned());
            rows.push(cells);
        }
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn formula(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|f| !f.trim().is_empty())
    }
}

/// What a cell holds at the formula level.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Literal(Data),
    Formula(String),
}

/// Formula text when the cell has one, otherwise its literal value.
pub fn read_raw_formula_or_value(
    values: &Grid,
    formulas: &FormulaGrid,
    row: usize,
    col: usize,
) -> CellContent {
    match formulas.formula(row, col) {
        Some(f) => CellContent::Formula(f.trim_start_matches('=').to_string()),
        None => CellContent::Literal(values.cell(row, col).clone()),
    }
}
