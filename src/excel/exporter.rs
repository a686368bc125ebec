//! Export extracted SINAPI records to Excel, YAML or JSON

use crate::error::{SinapiError, SinapiResult};
use crate::types::{ExtractedWorkbook, Region};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

pub const METADATA_SHEET: &str = "Metadados";
pub const COMPOSITIONS_SHEET: &str = "Composicoes";
pub const PRICES_SHEET: &str = "Precos";

const COMPOSITION_HEADERS: [&str; 5] = ["CODIGO", "DESCRICAO", "UNIDADE", "GRUPO", "MES_REFERENCIA"];
const PRICE_KEY_HEADERS: [&str; 3] = ["CODIGO", "MES_REFERENCIA", "REGIME"];

/// Output format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Yaml,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> SinapiResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "json" => Ok(ExportFormat::Json),
            _ => Err(SinapiError::Export(format!(
                "unsupported output extension for '{}': expected .xlsx, .yaml or .json",
                path.display()
            ))),
        }
    }
}

/// Writes one extracted workbook as a flat three-sheet spreadsheet.
pub struct ExcelExporter<'a> {
    extracted: &'a ExtractedWorkbook,
}

impl<'a> ExcelExporter<'a> {
    pub fn new(extracted: &'a ExtractedWorkbook) -> Self {
        Self { extracted }
    }

    /// Export to an `.xlsx` file.
    pub fn export(&self, output_path: &Path) -> SinapiResult<()> {
        let mut workbook = self.build()?;
        workbook
            .save(output_path)
            .map_err(|e| SinapiError::Export(format!("Failed to save Excel file: {}", e)))
    }

    /// Export to an in-memory `.xlsx` blob.
    pub fn export_to_buffer(&self) -> SinapiResult<Vec<u8>> {
        let mut workbook = self.build()?;
        workbook
            .save_to_buffer()
            .map_err(|e| SinapiError::Export(format!("Failed to build Excel buffer: {}", e)))
    }

    fn build(&self) -> SinapiResult<Workbook> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();

        self.write_metadata(add_sheet(&mut workbook, METADATA_SHEET)?, &bold)?;
        self.write_compositions(add_sheet(&mut workbook, COMPOSITIONS_SHEET)?, &bold)?;
        self.write_prices(add_sheet(&mut workbook, PRICES_SHEET)?, &bold)?;

        Ok(workbook)
    }

    fn write_metadata(&self, worksheet: &mut Worksheet, bold: &Format) -> SinapiResult<()> {
        let meta = &self.extracted.metadata;
        let rows = [
            ("Mes de referencia", meta.reference_month.as_str()),
            ("Localidade", meta.region.as_str()),
            ("Desoneracao", meta.pricing_regime.as_str()),
            ("Fonte", meta.source.as_str()),
        ];
        for (row, (label, value)) in rows.iter().enumerate() {
            let row = row as u32;
            worksheet
                .write_string_with_format(row, 0, *label, bold)
                .map_err(export_err("metadata label"))?;
            worksheet
                .write_string(row, 1, *value)
                .map_err(export_err("metadata value"))?;
        }
        Ok(())
    }

    fn write_compositions(&self, worksheet: &mut Worksheet, bold: &Format) -> SinapiResult<()> {
        write_header(worksheet, COMPOSITION_HEADERS.iter().copied(), bold)?;

        for (idx, comp) in self.extracted.compositions.iter().enumerate() {
            let row = (idx + 1) as u32; // +1 for header row
            let values = [
                &comp.composition_code,
                &comp.description,
                &comp.unit,
                &comp.group,
                &comp.reference_month,
            ];
            for (col, value) in values.iter().enumerate() {
                worksheet
                    .write_string(row, col as u16, value.as_str())
                    .map_err(export_err("composition cell"))?;
            }
        }
        Ok(())
    }

    fn write_prices(&self, worksheet: &mut Worksheet, bold: &Format) -> SinapiResult<()> {
        let headers = PRICE_KEY_HEADERS
            .iter()
            .copied()
            .chain(Region::ALL.iter().map(|r| r.code()));
        write_header(worksheet, headers, bold)?;

        let first_region_col = PRICE_KEY_HEADERS.len();
        for (idx, price) in self.extracted.prices.iter().enumerate() {
            let row = (idx + 1) as u32;
            worksheet
                .write_string(row, 0, &price.composition_code)
                .map_err(export_err("price code"))?;
            worksheet
                .write_string(row, 1, &price.reference_month)
                .map_err(export_err("price month"))?;
            worksheet
                .write_string(row, 2, price.pricing_regime.label())
                .map_err(export_err("price regime"))?;

            // Missing regions stay blank
            for (i, region) in Region::ALL.iter().enumerate() {
                if let Some(value) = price.prices.get(*region) {
                    worksheet
                        .write_number(row, (first_region_col + i) as u16, value)
                        .map_err(export_err("price value"))?;
                }
            }
        }
        Ok(())
    }
}

fn add_sheet<'w>(workbook: &'w mut Workbook, name: &str) -> SinapiResult<&'w mut Worksheet> {
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(name)
        .map_err(|e| SinapiError::Export(format!("Failed to set worksheet name: {}", e)))?;
    Ok(worksheet)
}

fn write_header<'h>(
    worksheet: &mut Worksheet,
    headers: impl Iterator<Item = &'h str>,
    bold: &Format,
) -> SinapiResult<()> {
    for (col, header) in headers.enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, bold)
            .map_err(export_err("header"))?;
    }
    Ok(())
}

fn export_err(what: &'static str) -> impl Fn(rust_xlsxwriter::XlsxError) -> SinapiError {
    move |e| SinapiError::Export(format!("Failed to write {}: {}", what, e))
}

/// Export to `output_path`, picking the format from its extension.
pub fn export_extracted(extracted: &ExtractedWorkbook, output_path: &Path) -> SinapiResult<()> {
    match ExportFormat::from_path(output_path)? {
        ExportFormat::Xlsx => ExcelExporter::new(extracted).export(output_path),
        ExportFormat::Yaml => {
            let yaml = serde_yaml::to_string(extracted)?;
            std::fs::write(output_path, yaml)?;
            Ok(())
        }
        ExportFormat::Json => {
            let json = serde_json::to_string_pretty(extracted)?;
            std::fs::write(output_path, json)?;
            Ok(())
        }
    }
}
