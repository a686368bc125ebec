//! SINAPI workbook parsing
//!
//! Reading side:
//! - `workbook`: calamine access, raw grids in absolute sheet coordinates
//! - `classifier`: which sheets hold prices, metadata or the analytic catalog
//! - `header`: header row and column-role detection
//! - `extractor`: composition and price records from one sheet
//! - `metadata`: reference month, region and regime from fixed cells
//! - `parser`: [`PriceTableParser`] and the per-source factory
//!
//! Writing side:
//! - `exporter`: extracted records to `.xlsx`, YAML or JSON

pub mod classifier;
pub mod extractor;
pub mod header;
pub mod metadata;
pub mod workbook;

mod exporter;
mod parser;

pub use exporter::{export_extracted, ExcelExporter, ExportFormat};
pub use extractor::{Catalog, SheetRecords};
pub use header::{HeaderLayout, HeaderStrategy};
pub use metadata::extract_metadata;
pub use parser::{parser_for, parser_for_name, PriceTableParser, SinapiParser};
pub use workbook::{Grid, Workbook};
