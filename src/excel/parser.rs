//! Price table parsers
//!
//! [`PriceTableParser`] is the contract every reference-table family
//! implements; [`parser_for`] picks the implementation for a [`SourceType`].
//! SINAPI is the only family supported today.

use crate::error::{SinapiResult, SkipReason};
use crate::excel::classifier::{classify_pricing_regime, select_catalog_sheets, select_price_sheets};
use crate::excel::extractor::{extract_sheet_records, Catalog, SheetRecords};
use crate::excel::header::{locate_header, HeaderLayout};
use crate::excel::metadata::extract_metadata;
use crate::excel::workbook::Workbook;
use crate::types::{PricingRegime, Region, SinapiMetadata, SourceType};
use tracing::{debug, info, warn};

pub trait PriceTableParser {
    fn source(&self) -> SourceType;

    fn sheet_names(&self) -> &[String];

    /// Sheets holding composition prices, in workbook order.
    fn data_sheets(&self) -> Vec<String>;

    fn classify_regime(&self, sheet: &str) -> PricingRegime;

    fn metadata(&mut self, sheet_hint: Option<&str>) -> SinapiResult<SinapiMetadata>;

    /// Records of one sheet. A skipped sheet is logged and reports why.
    fn extract_sheet_records(
        &mut self,
        sheet: &str,
        reference_month: &str,
    ) -> Result<SheetRecords, SkipReason>;

    /// Header layout of one sheet, if any strategy finds it.
    fn header_layout(&mut self, sheet: &str) -> SinapiResult<Option<HeaderLayout>>;
}

/// Parser for SINAPI workbooks.
pub struct SinapiParser {
    workbook: Workbook,
    catalog: Option<Catalog>,
}

impl SinapiParser {
    pub fn new(workbook: Workbook) -> Self {
        Self {
            workbook,
            catalog: None,
        }
    }

    pub fn open(bytes: Vec<u8>) -> SinapiResult<Self> {
        Ok(Self::new(Workbook::open(bytes)?))
    }

    /// Build the catalog from the analytic sheets, once.
    fn load_catalog(&mut self) {
        if self.catalog.is_none() {
            let names = self.workbook.sheet_names().to_vec();
            let catalog_sheets = select_catalog_sheets(&names, &select_price_sheets(&names));
            let mut catalog = Catalog::default();
            for sheet in &catalog_sheets {
                let added = self
                    .workbook
                    .read_grid(sheet)
                    .map_err(|e| SkipReason::ReadFailed(e.to_string()))
                    .and_then(|grid| catalog.extend_from_grid(&grid));
                match added {
                    Ok(count) => debug!(sheet = sheet.as_str(), count, "catalog sheet loaded"),
                    Err(reason) => warn!(
                        sheet = sheet.as_str(),
                        reason = reason.code(),
                        "catalog sheet skipped: {}",
                        reason
                    ),
                }
            }
            if !catalog.is_empty() {
                info!(entries = catalog.len(), "analytic catalog available");
            }
            self.catalog = Some(catalog);
        }
    }
}

impl PriceTableParser for SinapiParser {
    fn source(&self) -> SourceType {
        SourceType::Sinapi
    }

    fn sheet_names(&self) -> &[String] {
        self.workbook.sheet_names()
    }

    fn data_sheets(&self) -> Vec<String> {
        select_price_sheets(self.workbook.sheet_names())
    }

    fn classify_regime(&self, sheet: &str) -> PricingRegime {
        classify_pricing_regime(sheet)
    }

    fn metadata(&mut self, sheet_hint: Option<&str>) -> SinapiResult<SinapiMetadata> {
        extract_metadata(&mut self.workbook, sheet_hint, SourceType::Sinapi)
    }

    fn extract_sheet_records(
        &mut self,
        sheet: &str,
        reference_month: &str,
    ) -> Result<SheetRecords, SkipReason> {
        self.load_catalog();
        let empty = Catalog::default();
        let catalog = self.catalog.as_ref().unwrap_or(&empty);
        match extract_sheet_records(&mut self.workbook, sheet, reference_month, catalog) {
            Ok(records) => {
                info!(
                    sheet,
                    compositions = records.compositions.len(),
                    prices = records.prices.len(),
                    "sheet extracted"
                );
                Ok(records)
            }
            Err(reason) => {
                warn!(sheet, reason = reason.code(), "sheet skipped: {}", reason);
                Err(reason)
            }
        }
    }

    fn header_layout(&mut self, sheet: &str) -> SinapiResult<Option<HeaderLayout>> {
        let grid = self.workbook.read_grid(sheet)?;
        Ok(locate_header(&grid, &Region::ALL))
    }
}

/// Parser for the given reference-table family.
pub fn parser_for(bytes: Vec<u8>, source: SourceType) -> SinapiResult<Box<dyn PriceTableParser>> {
    match source {
        SourceType::Sinapi => Ok(Box::new(SinapiParser::open(bytes)?)),
    }
}

/// Like [`parser_for`], naming the family by string (`"SINAPI"`).
pub fn parser_for_name(bytes: Vec<u8>, source: &str) -> SinapiResult<Box<dyn PriceTableParser>> {
    let source: SourceType = source.parse()?;
    parser_for(bytes, source)
}

impl std::fmt::Debug for SinapiParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinapiParser")
            .field("sheets", &self.workbook.sheet_names())
            .finish()
    }
}
