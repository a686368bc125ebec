use crate::error::SinapiError;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

//==============================================================================
// Regions
//==============================================================================

/// Brazilian states plus the federal district, in SINAPI column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    AC,
    AL,
    AP,
    AM,
    BA,
    CE,
    DF,
    ES,
    GO,
    MA,
    MT,
    MS,
    MG,
    PA,
    PB,
    PR,
    PE,
    PI,
    RJ,
    RN,
    RS,
    RO,
    RR,
    SC,
    SP,
    SE,
    TO,
}

pub const REGION_COUNT: usize = 27;

impl Region {
    pub const ALL: [Region; REGION_COUNT] = [
        Region::AC,
        Region::AL,
        Region::AP,
        Region::AM,
        Region::BA,
        Region::CE,
        Region::DF,
        Region::ES,
        Region::GO,
        Region::MA,
        Region::MT,
        Region::MS,
        Region::MG,
        Region::PA,
        Region::PB,
        Region::PR,
        Region::PE,
        Region::PI,
        Region::RJ,
        Region::RN,
        Region::RS,
        Region::RO,
        Region::RR,
        Region::SC,
        Region::SP,
        Region::SE,
        Region::TO,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Region::AC => "AC",
            Region::AL => "AL",
            Region::AP => "AP",
            Region::AM => "AM",
            Region::BA => "BA",
            Region::CE => "CE",
            Region::DF => "DF",
            Region::ES => "ES",
            Region::GO => "GO",
            Region::MA => "MA",
            Region::MT => "MT",
            Region::MS => "MS",
            Region::MG => "MG",
            Region::PA => "PA",
            Region::PB => "PB",
            Region::PR => "PR",
            Region::PE => "PE",
            Region::PI => "PI",
            Region::RJ => "RJ",
            Region::RN => "RN",
            Region::RS => "RS",
            Region::RO => "RO",
            Region::RR => "RR",
            Region::SC => "SC",
            Region::SP => "SP",
            Region::SE => "SE",
            Region::TO => "TO",
        }
    }

    /// Lowercase code, as used for persisted price columns.
    pub fn column(self) -> String {
        self.code().to_ascii_lowercase()
    }

    /// Exact (already uppercased) match of a normalized header cell.
    pub fn from_code(code: &str) -> Option<Region> {
        Region::ALL.iter().copied().find(|r| r.code() == code)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Region {
    type Err = SinapiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::from_code(&s.trim().to_ascii_uppercase())
            .ok_or_else(|| SinapiError::Import(format!("unknown region code '{}'", s)))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

//==============================================================================
// Pricing regime
//==============================================================================

/// Labor-tax basis SINAPI publishes per composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PricingRegime {
    #[default]
    SemDesoneracao,
    ComDesoneracao,
    Empreitada,
}

impl PricingRegime {
    pub fn label(self) -> &'static str {
        match self {
            PricingRegime::SemDesoneracao => "Sem Desoneração",
            PricingRegime::ComDesoneracao => "Com Desoneração",
            PricingRegime::Empreitada => "Empreitada",
        }
    }
}

impl fmt::Display for PricingRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PricingRegime {
    type Err = SinapiError;

    /// Accepts the persisted label or the sheet token (`CSD`, `CCD`, `CSE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = crate::text::strip_accents_lower(s.trim());
        match key.as_str() {
            "sem desoneracao" | "csd" => Ok(PricingRegime::SemDesoneracao),
            "com desoneracao" | "ccd" => Ok(PricingRegime::ComDesoneracao),
            "empreitada" | "cse" => Ok(PricingRegime::Empreitada),
            _ => Err(SinapiError::Import(format!("unknown pricing regime '{}'", s))),
        }
    }
}

impl Serialize for PricingRegime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PricingRegime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

//==============================================================================
// Source type
//==============================================================================

/// Reference price table family a workbook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    #[default]
    Sinapi,
}

impl SourceType {
    pub fn name(self) -> &'static str {
        match self {
            SourceType::Sinapi => "SINAPI",
        }
    }
}

impl FromStr for SourceType {
    type Err = SinapiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SINAPI" => Ok(SourceType::Sinapi),
            _ => Err(SinapiError::UnsupportedSource(s.to_string())),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//==============================================================================
// Records
//==============================================================================

/// One priced work composition for one reference month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRecord {
    pub composition_code: String,
    pub description: String,
    pub unit: String,
    pub group: String,
    /// `MM/YYYY`
    pub reference_month: String,
}

/// Per-region unit prices; one optional value per known region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionPrices([Option<f64>; REGION_COUNT]);

impl RegionPrices {
    pub fn get(&self, region: Region) -> Option<f64> {
        self.0[region.index()]
    }

    pub fn set(&mut self, region: Region, value: Option<f64>) {
        self.0[region.index()] = value;
    }

    pub fn has_any(&self) -> bool {
        self.0.iter().any(Option::is_some)
    }
}

/// Every region is written, nulls included, so bulk rows share one key set.
impl Serialize for RegionPrices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(REGION_COUNT))?;
        for region in Region::ALL {
            map.serialize_entry(&region.column(), &self.get(region))?;
        }
        map.end()
    }
}

/// Unknown keys and non-numeric values are ignored (rows carry ids and timestamps).
impl<'de> Deserialize<'de> for RegionPrices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: HashMap<String, serde_json::Value> = HashMap::deserialize(deserializer)?;
        let mut prices = RegionPrices::default();
        for (key, value) in raw {
            if let Some(region) = Region::from_code(&key.to_ascii_uppercase()) {
                prices.set(region, value.as_f64());
            }
        }
        Ok(prices)
    }
}

/// Per-region prices of one composition for one month and regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub composition_code: String,
    pub reference_month: String,
    pub pricing_regime: PricingRegime,
    #[serde(flatten)]
    pub prices: RegionPrices,
}

impl PriceRecord {
    pub fn natural_key(&self) -> (&str, &str, PricingRegime) {
        (
            &self.composition_code,
            &self.reference_month,
            self.pricing_regime,
        )
    }
}

//==============================================================================
// Metadata and results
//==============================================================================

/// Workbook-level header data read from fixed cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinapiMetadata {
    pub reference_month: String,
    pub region: String,
    pub pricing_regime: String,
    pub source: String,
}

/// Everything read from one workbook, deduplicated, ready to persist or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedWorkbook {
    pub metadata: SinapiMetadata,
    pub compositions: Vec<CompositionRecord>,
    pub prices: Vec<PriceRecord>,
}

/// Outcome of importing one workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub imported_compositions: usize,
    pub imported_prices: usize,
    pub metadata: SinapiMetadata,
}

/// A file that could not be imported as part of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file_name: String,
    pub error: String,
}

/// Aggregated outcome of a multi-file import.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportReport {
    pub status: String,
    pub imported_compositions: usize,
    pub imported_prices: usize,
    pub metadata_per_file: Vec<SinapiMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FileFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<String>,
}
