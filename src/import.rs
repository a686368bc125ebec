//! Workbook import orchestration
//!
//! One workbook: open, pick price sheets, read metadata, extract every sheet,
//! deduplicate, upsert. A batch runs each file independently; a failing file
//! is reported and the rest still import.

use crate::error::{SinapiError, SinapiResult, SkipReason};
use crate::excel::parser_for;
use crate::store::RecordStore;
use crate::types::{
    BatchImportReport, CompositionRecord, ExtractedWorkbook, FileFailure, ImportResult,
    PriceRecord, PricingRegime, SinapiMetadata, SourceType,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["xls", "xlsx"];
pub const BATCH_STATUS_SUCCESS: &str = "success";

/// One uploaded workbook.
#[derive(Debug, Clone)]
pub struct WorkbookUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl WorkbookUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> SinapiResult<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, std::fs::read(path)?))
    }
}

/// `.xls` / `.xlsx`, case-insensitive.
pub fn is_supported_file_name(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| ext.eq_ignore_ascii_case(s))
        })
        .unwrap_or(false)
}

pub fn ensure_supported_file(file_name: &str) -> SinapiResult<()> {
    if is_supported_file_name(file_name) {
        Ok(())
    } else {
        Err(SinapiError::UnsupportedFile(file_name.to_string()))
    }
}

/// Keep the first record per composition code, in input order.
pub fn deduplicate_compositions(records: Vec<CompositionRecord>) -> Vec<CompositionRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.composition_code.clone()))
        .collect()
}

/// Keep the first record per natural key, in input order.
pub fn deduplicate_prices(records: Vec<PriceRecord>) -> Vec<PriceRecord> {
    let mut seen: HashSet<(String, String, PricingRegime)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            let (code, month, regime) = r.natural_key();
            seen.insert((code.to_string(), month.to_string(), regime))
        })
        .collect()
}

/// Metadata only; every failure surfaces as [`SinapiError::Metadata`].
pub fn extract_metadata_from_bytes(
    bytes: Vec<u8>,
    sheet_hint: Option<&str>,
    source: SourceType,
) -> SinapiResult<SinapiMetadata> {
    parser_for(bytes, source)
        .and_then(|mut parser| parser.metadata(sheet_hint))
        .map_err(|e| match e {
            SinapiError::Metadata(_) => e,
            other => SinapiError::Metadata(other.to_string()),
        })
}

/// Read and deduplicate every record of one workbook without persisting.
///
/// Fails with [`SinapiError::NoHeaderFound`] when the workbook has no price
/// sheet, or when no price sheet has a recognizable header.
pub fn extract_workbook(bytes: Vec<u8>, source: SourceType) -> SinapiResult<ExtractedWorkbook> {
    let mut parser = parser_for(bytes, source)?;
    let price_sheets = parser.data_sheets();
    if price_sheets.is_empty() {
        return Err(SinapiError::NoHeaderFound(format!(
            "no price sheet among [{}]",
            parser.sheet_names().join(", ")
        )));
    }

    let metadata = parser.metadata(price_sheets.first().map(String::as_str))?;
    info!(
        sheets = ?price_sheets,
        reference_month = metadata.reference_month.as_str(),
        region = metadata.region.as_str(),
        "processing {} workbook",
        source
    );

    let mut compositions = Vec::new();
    let mut prices = Vec::new();
    let mut headers_found = 0;
    for sheet in &price_sheets {
        match parser.extract_sheet_records(sheet, &metadata.reference_month) {
            Ok(records) => {
                headers_found += 1;
                compositions.extend(records.compositions);
                prices.extend(records.prices);
            }
            Err(SkipReason::NoDataRows) => headers_found += 1,
            Err(_) => {}
        }
    }
    if headers_found == 0 {
        return Err(SinapiError::NoHeaderFound(format!(
            "checked [{}]",
            price_sheets.join(", ")
        )));
    }

    let extracted = ExtractedWorkbook {
        metadata,
        compositions: deduplicate_compositions(compositions),
        prices: deduplicate_prices(prices),
    };
    if extracted.compositions.is_empty() {
        warn!("no composition records found in any price sheet");
    }
    Ok(extracted)
}

/// Import one SINAPI workbook into `store`.
pub fn process_workbook(bytes: Vec<u8>, store: &dyn RecordStore) -> SinapiResult<ImportResult> {
    process_workbook_as(bytes, SourceType::Sinapi, store)
}

pub fn process_workbook_as(
    bytes: Vec<u8>,
    source: SourceType,
    store: &dyn RecordStore,
) -> SinapiResult<ImportResult> {
    let extracted = extract_workbook(bytes, source).map_err(wrap_unrecoverable)?;

    let imported_compositions = store.upsert_compositions_batch(&extracted.compositions);
    let imported_prices = store.upsert_prices_batch(&extracted.prices);
    info!(
        store = store.name(),
        compositions = imported_compositions,
        prices = imported_prices,
        "workbook imported"
    );

    Ok(ImportResult {
        imported_compositions,
        imported_prices,
        metadata: extracted.metadata,
    })
}

// Bad-input errors keep their kind; anything else is reported as an import failure.
fn wrap_unrecoverable(e: SinapiError) -> SinapiError {
    if e.is_client_error() {
        e
    } else {
        SinapiError::Import(e.to_string())
    }
}

/// Import several workbooks, one at a time.
///
/// Files with an unsupported extension are skipped; files that fail are
/// listed in the report. Neither stops the batch.
pub fn import_batch(uploads: Vec<WorkbookUpload>, store: &dyn RecordStore) -> BatchImportReport {
    let mut report = BatchImportReport {
        status: BATCH_STATUS_SUCCESS.to_string(),
        ..Default::default()
    };

    for upload in uploads {
        if !is_supported_file_name(&upload.file_name) {
            warn!(file = upload.file_name.as_str(), "skipping unsupported file");
            report.skipped_files.push(upload.file_name);
            continue;
        }

        match process_workbook(upload.bytes, store) {
            Ok(result) => {
                report.imported_compositions += result.imported_compositions;
                report.imported_prices += result.imported_prices;
                report.metadata_per_file.push(result.metadata);
            }
            Err(e) => {
                warn!(file = upload.file_name.as_str(), "import failed: {}", e);
                report.failed_files.push(FileFailure {
                    file_name: upload.file_name,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
