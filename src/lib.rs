//! SINAPI Forge - import pipeline for SINAPI reference price workbooks
//!
//! This library reads the monthly SINAPI Excel workbooks (Brazilian
//! construction unit prices per state), finds their header rows, extracts
//! composition and per-region price records, and upserts them into a row store.
//!
//! # Features
//!
//! - Header detection tolerant to layout changes between releases
//! - Composition codes recovered from `HYPERLINK` formulas
//! - Brazilian currency parsing (`1.234,56`)
//! - Idempotent chunked upserts with partial-success semantics
//! - Export of extracted records to Excel, YAML or JSON
//!
//! # Example
//!
//! ```no_run
//! use sinapi_forge::import::process_workbook;
//! use sinapi_forge::store::MemoryStore;
//!
//! let bytes = std::fs::read("SINAPI_Referencia_2025_12.xlsx")?;
//! let store = MemoryStore::new();
//! let result = process_workbook(bytes, &store)?;
//!
//! println!("Month: {}", result.metadata.reference_month);
//! println!("Compositions: {}", result.imported_compositions);
//! println!("Prices: {}", result.imported_prices);
//! # Ok::<(), sinapi_forge::error::SinapiError>(())
//! ```

pub mod api;
pub mod cli;
pub mod error;
pub mod excel;
pub mod import;
pub mod store;
pub mod text;
pub mod types;

// Re-export commonly used types
pub use error::{SinapiError, SinapiResult, SkipReason};
pub use import::{import_batch, process_workbook};
pub use types::{
    BatchImportReport, CompositionRecord, ImportResult, PriceRecord, PricingRegime, Region,
    RegionPrices, SinapiMetadata, SourceType,
};
