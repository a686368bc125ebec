//! Workbook import tests
//!
//! Real .xlsx files built in memory, parsed through calamine and persisted
//! into the in-memory store.

mod common;

use sinapi_forge::error::{SinapiError, SinapiResult};
use sinapi_forge::excel::metadata::{NATIONAL_REGION, UNKNOWN};
use sinapi_forge::import::{
    extract_workbook, import_batch, process_workbook, WorkbookUpload, BATCH_STATUS_SUCCESS,
};
use sinapi_forge::store::{MemoryStore, RecordStore};
use sinapi_forge::{CompositionRecord, PriceRecord, PricingRegime, Region, SourceType};
use std::sync::atomic::{AtomicUsize, Ordering};

// ═══════════════════════════════════════════════════════════════════════════
// END-TO-END EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sinapi_workbook_extracts_composition_and_price() {
    let extracted = extract_workbook(common::sinapi_workbook(), SourceType::Sinapi).unwrap();

    assert_eq!(extracted.metadata.reference_month, "12/2025");
    assert_eq!(extracted.metadata.region, "SP");
    assert_eq!(extracted.metadata.pricing_regime, "SEM DESONERAÇÃO");
    assert_eq!(extracted.metadata.source, "SINAPI");

    assert_eq!(extracted.compositions.len(), 1);
    let composition = &extracted.compositions[0];
    assert_eq!(composition.composition_code, "9999");
    assert_eq!(composition.description, "COMPOSICAO TESTE");
    assert_eq!(composition.reference_month, "12/2025");

    assert_eq!(extracted.prices.len(), 1);
    let price = &extracted.prices[0];
    assert_eq!(price.composition_code, "9999");
    assert_eq!(price.pricing_regime, PricingRegime::SemDesoneracao);
    assert_eq!(price.prices.get(Region::SP), Some(150.5));
    assert_eq!(price.prices.get(Region::RJ), None);
}

#[test]
fn test_process_workbook_persists_records() {
    let store = MemoryStore::new();
    let result = process_workbook(common::sinapi_workbook(), &store).unwrap();

    assert_eq!(result.imported_compositions, 1);
    assert_eq!(result.imported_prices, 1);
    assert_eq!(result.metadata.reference_month, "12/2025");

    let found = store
        .find_price("9999", Region::SP, "12/2025", PricingRegime::SemDesoneracao)
        .unwrap()
        .expect("price stored");
    assert_eq!(found.prices.get(Region::SP), Some(150.5));

    // RJ was blank in the sheet
    assert!(store
        .find_price("9999", Region::RJ, "12/2025", PricingRegime::SemDesoneracao)
        .unwrap()
        .is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// PRICING REGIMES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_one_price_per_regime_sheet() {
    let extracted = extract_workbook(common::three_regime_workbook(), SourceType::Sinapi).unwrap();

    assert_eq!(extracted.compositions.len(), 1);
    assert_eq!(extracted.compositions[0].composition_code, "123");

    let mut regimes: Vec<PricingRegime> =
        extracted.prices.iter().map(|p| p.pricing_regime).collect();
    regimes.sort();
    assert_eq!(
        regimes,
        vec![
            PricingRegime::SemDesoneracao,
            PricingRegime::ComDesoneracao,
            PricingRegime::Empreitada,
        ]
    );
    for price in &extracted.prices {
        assert_eq!(price.prices.get(Region::SP), Some(10.0));
        assert_eq!(price.prices.get(Region::RJ), Some(11.0));
        assert_eq!(price.prices.get(Region::MG), Some(12.0));
    }
}

#[test]
fn test_missing_metadata_cells_use_defaults() {
    let extracted = extract_workbook(common::three_regime_workbook(), SourceType::Sinapi).unwrap();

    assert_eq!(extracted.metadata.reference_month, UNKNOWN);
    assert_eq!(extracted.metadata.pricing_regime, UNKNOWN);
    assert_eq!(extracted.metadata.region, NATIONAL_REGION);
    assert!(extracted
        .prices
        .iter()
        .all(|p| p.reference_month == UNKNOWN));
}

#[test]
fn test_untagged_workbook_skips_menu_sheet() {
    let extracted = extract_workbook(common::untagged_workbook(), SourceType::Sinapi).unwrap();

    let codes: Vec<&str> = extracted
        .compositions
        .iter()
        .map(|c| c.composition_code.as_str())
        .collect();
    assert_eq!(codes, vec!["777"]);
    assert_eq!(extracted.prices[0].prices.get(Region::SP), Some(7.77));
}

#[test]
fn test_workbook_without_price_sheets_fails() {
    let store = MemoryStore::new();
    let err = process_workbook(common::menu_only_workbook(), &store).unwrap_err();

    assert!(matches!(err, SinapiError::NoHeaderFound(_)));
    assert!(err.is_client_error());
    assert!(err.to_string().contains("MENU"));
    assert_eq!(store.composition_count(), 0);
}

#[test]
fn test_no_header_in_any_price_sheet_fails() {
    let store = MemoryStore::new();
    let err = process_workbook(common::headerless_workbook(), &store).unwrap_err();

    assert!(matches!(err, SinapiError::NoHeaderFound(ref m) if m.contains("CSD")));
    assert!(err.is_client_error());
    assert_eq!(store.composition_count(), 0);
    assert_eq!(store.price_count(), 0);
}

#[test]
fn test_headerless_workbook_is_reported_in_batch() {
    let store = MemoryStore::new();
    let report = import_batch(
        vec![
            WorkbookUpload::new("MENU.xlsx", common::menu_only_workbook()),
            WorkbookUpload::new("SINAPI_CSD.xlsx", common::sinapi_workbook()),
        ],
        &store,
    );

    assert_eq!(report.imported_compositions, 1);
    assert_eq!(report.failed_files.len(), 1);
    assert_eq!(report.failed_files[0].file_name, "MENU.xlsx");
    assert!(report.failed_files[0].error.starts_with("No header row found"));
}

// ═══════════════════════════════════════════════════════════════════════════
// HYPERLINK CODES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_codes_recovered_from_hyperlink_formulas() {
    let extracted = extract_workbook(common::hyperlink_workbook(), SourceType::Sinapi).unwrap();

    let codes: Vec<&str> = extracted
        .compositions
        .iter()
        .map(|c| c.composition_code.as_str())
        .collect();
    assert_eq!(codes, vec!["104658", "104659"]);
    assert_eq!(extracted.compositions[0].description, "Alvenaria de vedação");
    assert_eq!(extracted.compositions[0].unit, "M2");

    let first = &extracted.prices[0];
    assert_eq!(first.composition_code, "104658");
    assert_eq!(first.prices.get(Region::SP), Some(150.5));
}

// ═══════════════════════════════════════════════════════════════════════════
// DEDUPLICATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicate_codes_keep_first_occurrence() {
    let extracted =
        extract_workbook(common::duplicate_code_workbook(), SourceType::Sinapi).unwrap();

    let codes: Vec<&str> = extracted
        .compositions
        .iter()
        .map(|c| c.composition_code.as_str())
        .collect();
    assert_eq!(codes, vec!["100", "200"]);
    assert_eq!(extracted.compositions[0].description, "Primeira ocorrência");

    assert_eq!(extracted.prices.len(), 2);
    assert_eq!(extracted.prices[0].prices.get(Region::BA), Some(1.0));
}

#[test]
fn test_non_finite_prices_are_dropped() {
    let extracted =
        extract_workbook(common::non_finite_price_workbook(), SourceType::Sinapi).unwrap();

    assert_eq!(extracted.compositions.len(), 2);
    assert_eq!(extracted.prices.len(), 1);
    let price = &extracted.prices[0];
    assert_eq!(price.composition_code, "502");
    assert_eq!(price.prices.get(Region::SP), Some(10.0));
    assert_eq!(price.prices.get(Region::RJ), None);
}

// ═══════════════════════════════════════════════════════════════════════════
// ANALYTIC CATALOG
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_catalog_fills_missing_fields_and_codes() {
    let extracted = extract_workbook(common::catalog_fill_workbook(), SourceType::Sinapi).unwrap();

    assert_eq!(extracted.metadata.region, "MG");
    assert_eq!(extracted.compositions.len(), 2);

    let contrapiso = &extracted.compositions[0];
    assert_eq!(contrapiso.composition_code, "7777");
    assert_eq!(contrapiso.unit, "M2");
    assert_eq!(contrapiso.group, "PISO");

    // Code matched through the description key
    let chapisco = &extracted.compositions[1];
    assert_eq!(chapisco.composition_code, "8888");
    assert_eq!(chapisco.description, "CHAPISCO ROLADO EM PAREDE");
    assert_eq!(chapisco.group, "REVESTIMENTO");

    assert_eq!(extracted.prices[1].prices.get(Region::MG), Some(8.25));
}

// ═══════════════════════════════════════════════════════════════════════════
// IDEMPOTENCE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_reimport_does_not_duplicate_rows() {
    let store = MemoryStore::new();
    let first = process_workbook(common::three_regime_workbook(), &store).unwrap();
    let second = process_workbook(common::three_regime_workbook(), &store).unwrap();

    assert_eq!(first.imported_prices, 3);
    assert_eq!(second.imported_prices, 3);
    assert_eq!(store.composition_count(), 1);
    assert_eq!(store.price_count(), 3);
}

// ═══════════════════════════════════════════════════════════════════════════
// CHUNKED PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════

/// Fails every price chunk whose index is listed in `fail_on`.
struct FlakyStore {
    inner: MemoryStore,
    fail_on: Vec<usize>,
    price_calls: AtomicUsize,
}

impl FlakyStore {
    fn new(chunk_size: usize, fail_on: Vec<usize>) -> Self {
        Self {
            inner: MemoryStore::with_chunk_size(chunk_size),
            fail_on,
            price_calls: AtomicUsize::new(0),
        }
    }
}

impl RecordStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn chunk_size(&self) -> usize {
        self.inner.chunk_size()
    }

    fn upsert_composition_chunk(&self, chunk: &[CompositionRecord]) -> SinapiResult<usize> {
        self.inner.upsert_composition_chunk(chunk)
    }

    fn upsert_price_chunk(&self, chunk: &[PriceRecord]) -> SinapiResult<usize> {
        let call = self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&call) {
            return Err(SinapiError::Persistence {
                table: "composicao_estados".to_string(),
                message: "HTTP 500: simulated".to_string(),
            });
        }
        self.inner.upsert_price_chunk(chunk)
    }

    fn find_price(
        &self,
        code: &str,
        region: Region,
        reference_month: &str,
        regime: PricingRegime,
    ) -> SinapiResult<Option<PriceRecord>> {
        self.inner.find_price(code, region, reference_month, regime)
    }
}

#[test]
fn test_failed_chunk_is_not_counted() {
    let store = FlakyStore::new(10, vec![1]);
    let result = process_workbook(common::many_rows_workbook(25), &store).unwrap();

    assert_eq!(result.imported_compositions, 25);
    assert_eq!(store.price_calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.imported_prices, 15);
    assert_eq!(store.inner.price_count(), 15);
}

#[test]
fn test_small_chunks_store_every_row() {
    let store = MemoryStore::with_chunk_size(7);
    let result = process_workbook(common::many_rows_workbook(30), &store).unwrap();

    assert_eq!(result.imported_compositions, 30);
    assert_eq!(result.imported_prices, 30);
    let found = store
        .find_price("10029", Region::PR, "10/2025", PricingRegime::SemDesoneracao)
        .unwrap()
        .unwrap();
    assert_eq!(found.prices.get(Region::PR), Some(30.0));
}

// ═══════════════════════════════════════════════════════════════════════════
// BATCH IMPORT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_batch_aggregates_files() {
    let store = MemoryStore::new();
    let report = import_batch(
        vec![
            WorkbookUpload::new("SINAPI_CSD.xlsx", common::sinapi_workbook()),
            WorkbookUpload::new("SINAPI_REGIMES.XLSX", common::three_regime_workbook()),
            WorkbookUpload::new("notes.pdf", b"%PDF".to_vec()),
            WorkbookUpload::new("broken.xls", b"definitely not excel".to_vec()),
        ],
        &store,
    );

    assert_eq!(report.status, BATCH_STATUS_SUCCESS);
    assert_eq!(report.imported_compositions, 2);
    assert_eq!(report.imported_prices, 4);
    assert_eq!(report.metadata_per_file.len(), 2);
    assert_eq!(report.metadata_per_file[0].reference_month, "12/2025");
    assert_eq!(report.skipped_files, vec!["notes.pdf".to_string()]);
    assert_eq!(report.failed_files.len(), 1);
    assert_eq!(report.failed_files[0].file_name, "broken.xls");
}

#[test]
fn test_batch_report_serializes_camel_case() {
    let store = MemoryStore::new();
    let report = import_batch(
        vec![WorkbookUpload::new("a.xlsx", common::sinapi_workbook())],
        &store,
    );
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["importedCompositions"], 1);
    assert_eq!(json["metadataPerFile"][0]["referenceMonth"], "12/2025");
    assert!(json.get("failedFiles").is_none());
}

#[test]
fn test_garbage_bytes_fail_with_open_error() {
    let store = MemoryStore::new();
    let err = process_workbook(b"PK\x03\x04 not really".to_vec(), &store).unwrap_err();
    assert!(matches!(err, SinapiError::WorkbookOpen(_)));
    assert!(err.is_client_error());
}
