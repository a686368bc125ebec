use crate::error::{SinapiError, SinapiResult};
use crate::excel::classifier::select_catalog_sheets;
use crate::excel::header::ColumnRole;
use crate::excel::{export_extracted, parser_for, ExportFormat};
use crate::import::{
    ensure_supported_file, extract_metadata_from_bytes, extract_workbook, import_batch,
    WorkbookUpload,
};
use crate::store::{MemoryStore, PostgrestStore, RecordStore, StoreConfig};
use crate::types::{PricingRegime, Region, SinapiMetadata, SourceType};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Send pipeline logs to stderr when `verbose` is set.
pub fn init_logging(verbose: bool) {
    if !verbose {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sinapi_forge=debug".into()),
        )
        .try_init();
}

fn read_workbook(path: &Path) -> SinapiResult<Vec<u8>> {
    let name = path.display().to_string();
    ensure_supported_file(&name)?;
    Ok(std::fs::read(path)?)
}

fn print_metadata(meta: &SinapiMetadata) {
    println!("   Reference month: {}", meta.reference_month.bright_blue().bold());
    println!("   Region:          {}", meta.region.bright_blue());
    println!("   Pricing regime:  {}", meta.pricing_regime.bright_blue());
    println!("   Source:          {}", meta.source);
}

/// Execute the metadata command
pub fn metadata(file: PathBuf, sheet: Option<String>) -> SinapiResult<()> {
    println!("{}", "🏗️  SINAPI - Workbook metadata".bold().green());
    println!("   File: {}\n", file.display());

    let bytes = read_workbook(&file)?;
    let meta = extract_metadata_from_bytes(bytes, sheet.as_deref(), SourceType::Sinapi)?;
    print_metadata(&meta);
    println!();
    Ok(())
}

/// Execute the inspect command
pub fn inspect(file: PathBuf) -> SinapiResult<()> {
    println!("{}", "🔍 SINAPI - Workbook structure".bold().green());
    println!("   File: {}\n", file.display());

    let mut parser = parser_for(read_workbook(&file)?, SourceType::Sinapi)?;
    let sheet_names = parser.sheet_names().to_vec();
    let price_sheets = parser.data_sheets();
    let catalog_sheets = select_catalog_sheets(&sheet_names, &price_sheets);

    println!("   Found {} sheets", sheet_names.len());
    for sheet in &sheet_names {
        let role = if price_sheets.contains(sheet) {
            format!("price ({})", parser.classify_regime(sheet).label())
                .green()
                .to_string()
        } else if catalog_sheets.contains(sheet) {
            "catalog".cyan().to_string()
        } else {
            "ignored".dimmed().to_string()
        };
        println!("\n   📄 {} [{}]", sheet.bright_blue().bold(), role);

        if !price_sheets.contains(sheet) {
            continue;
        }
        match parser.header_layout(sheet) {
            Ok(Some(layout)) => {
                println!(
                    "      Header row {} ({}), data from row {}",
                    layout.row + 1,
                    layout.strategy.name(),
                    layout.data_start() + 1
                );
                if let Some(col) = layout.column(ColumnRole::Code) {
                    println!("      Code column: {}", col + 1);
                }
                if let Some(col) = layout.column(ColumnRole::Description) {
                    println!("      Description column: {}", col + 1);
                }
                let regions: Vec<&str> = layout.regions.values().map(|r| r.code()).collect();
                println!("      Regions ({}): {}", regions.len(), regions.join(" "));
            }
            Ok(None) => println!("      {}", "⚠️  No header found".yellow()),
            Err(e) => println!("      {}", format!("❌ {}", e).red()),
        }
    }

    let meta = parser.metadata(price_sheets.first().map(String::as_str))?;
    println!("\n{}", "📋 Metadata".bold());
    print_metadata(&meta);
    println!();
    Ok(())
}

/// Execute the import command
///
/// Without a store config the import runs against an in-memory store.
pub fn import(files: Vec<PathBuf>, store: Option<StoreConfig>, verbose: bool) -> SinapiResult<()> {
    println!("{}", "🏗️  SINAPI - Import".bold().green());
    for file in &files {
        println!("   File: {}", file.display());
    }
    println!();

    let remote = store.map(PostgrestStore::new).transpose()?;
    let memory = MemoryStore::new();
    let store: &dyn RecordStore = match &remote {
        Some(remote) => remote,
        None => {
            println!(
                "{}",
                "📋 DRY RUN MODE - No database configured, records stay in memory\n".yellow()
            );
            &memory
        }
    };

    let uploads = files
        .iter()
        .map(|path| WorkbookUpload::from_path(path))
        .collect::<SinapiResult<Vec<_>>>()?;
    let report = import_batch(uploads, store);

    if verbose {
        for meta in &report.metadata_per_file {
            println!(
                "   📊 {} {} {}",
                meta.reference_month.bright_blue(),
                meta.region,
                meta.pricing_regime
            );
        }
        println!();
    }
    for skipped in &report.skipped_files {
        println!("   {}", format!("⚠️  Skipped {}", skipped).yellow());
    }
    for failed in &report.failed_files {
        println!(
            "   {}",
            format!("❌ {}: {}", failed.file_name, failed.error).red()
        );
    }

    println!("{}", "✅ Import Complete!".bold().green());
    println!("   Compositions: {}", report.imported_compositions);
    println!("   Prices:       {}", report.imported_prices);
    println!("   Store:        {}\n", store.name());

    if report.metadata_per_file.is_empty() && !report.failed_files.is_empty() {
        return Err(SinapiError::Import(format!(
            "none of the {} workbook(s) could be imported",
            report.failed_files.len()
        )));
    }
    Ok(())
}

/// Execute the export command
pub fn export(input: PathBuf, output: PathBuf, verbose: bool) -> SinapiResult<()> {
    println!("{}", "🏗️  SINAPI - Export".bold().green());
    println!("   Input:  {}", input.display());
    println!("   Output: {}\n", output.display());

    // Fail before parsing when the output extension is wrong
    let format = ExportFormat::from_path(&output)?;

    if verbose {
        println!("{}", "📖 Reading workbook...".cyan());
    }
    let extracted = extract_workbook(read_workbook(&input)?, SourceType::Sinapi)?;

    if verbose {
        print_metadata(&extracted.metadata);
        println!(
            "   Found {} compositions, {} prices\n",
            extracted.compositions.len(),
            extracted.prices.len()
        );
        println!("{}", format!("💾 Writing {:?}...", format).cyan());
    }

    export_extracted(&extracted, &output)?;

    println!("{}", "✅ Export Complete!".bold().green());
    println!("   Compositions: {}", extracted.compositions.len());
    println!("   Prices:       {}", extracted.prices.len());
    println!("   File:         {}\n", output.display());
    Ok(())
}

/// Execute the price command
pub fn price(
    code: String,
    region: String,
    month: String,
    regime: Option<String>,
    store: StoreConfig,
) -> SinapiResult<()> {
    let region: Region = region.parse()?;
    let regime: PricingRegime = match regime {
        Some(raw) => raw.parse()?,
        None => PricingRegime::default(),
    };

    println!("{}", "💰 SINAPI - Price lookup".bold().green());
    println!(
        "   Composition {} | {} | {} | {}\n",
        code.bright_blue().bold(),
        region,
        month,
        regime.label()
    );

    let store = PostgrestStore::new(store)?;
    match store.find_price(&code, region, &month, regime)? {
        Some(record) => {
            let value = record.prices.get(region).unwrap_or_default();
            println!("   {} {}", "R$".green(), format!("{:.2}", value).bold().green());
        }
        None => println!("{}", "⚠️  No price found".yellow()),
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_workbook_rejects_extension() {
        let err = read_workbook(Path::new("prices.csv")).unwrap_err();
        assert!(matches!(err, SinapiError::UnsupportedFile(_)));
    }

    #[test]
    fn test_price_rejects_unknown_region_before_connecting() {
        let err = price(
            "100".to_string(),
            "XX".to_string(),
            "12/2025".to_string(),
            None,
            StoreConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("XX"));
    }

    #[test]
    fn test_export_rejects_output_extension_first() {
        let err = export(
            PathBuf::from("missing.xlsx"),
            PathBuf::from("out.csv"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, SinapiError::Export(_)));
    }
}
