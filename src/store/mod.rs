//! Persistence of composition and price records
//!
//! Writes are idempotent upserts keyed by natural key, sent in chunks. A
//! failed chunk is logged and skipped; the batch reports how many rows the
//! store confirmed.

mod memory;
mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use crate::error::{SinapiError, SinapiResult};
use crate::types::{CompositionRecord, PriceRecord, PricingRegime, Region};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const COMPOSITION_TABLE: &str = "composicao";
pub const PRICE_TABLE: &str = "composicao_estados";

/// Connection settings for the remote row store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub chunk_size: usize,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn validate(&self) -> SinapiResult<()> {
        if self.url.trim().is_empty() {
            return Err(SinapiError::Config("store URL is empty".to_string()));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(SinapiError::Config(format!(
                "store URL must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(SinapiError::Config("store API key is empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(SinapiError::Config("chunk size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Row store for compositions and per-region prices.
///
/// Implementors provide single-chunk upserts and lookups; batching with
/// partial-success semantics comes for free.
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;

    fn chunk_size(&self) -> usize {
        DEFAULT_CHUNK_SIZE
    }

    /// Upsert on `(composition_code, reference_month)`; returns rows confirmed.
    fn upsert_composition_chunk(&self, chunk: &[CompositionRecord]) -> SinapiResult<usize>;

    /// Upsert on `(composition_code, reference_month, pricing_regime)`; returns rows confirmed.
    fn upsert_price_chunk(&self, chunk: &[PriceRecord]) -> SinapiResult<usize>;

    /// Price of one composition, only if `region` carries a value.
    fn find_price(
        &self,
        code: &str,
        region: Region,
        reference_month: &str,
        regime: PricingRegime,
    ) -> SinapiResult<Option<PriceRecord>>;

    fn upsert_compositions_batch(&self, records: &[CompositionRecord]) -> usize {
        upsert_in_chunks(COMPOSITION_TABLE, records, self.chunk_size(), |chunk| {
            self.upsert_composition_chunk(chunk)
        })
    }

    fn upsert_prices_batch(&self, records: &[PriceRecord]) -> usize {
        upsert_in_chunks(PRICE_TABLE, records, self.chunk_size(), |chunk| {
            self.upsert_price_chunk(chunk)
        })
    }
}

/// Send `records` in chunks, summing confirmed rows of the chunks that succeed.
pub fn upsert_in_chunks<T>(
    table: &str,
    records: &[T],
    chunk_size: usize,
    mut upsert: impl FnMut(&[T]) -> SinapiResult<usize>,
) -> usize {
    let mut confirmed = 0;
    for (index, chunk) in records.chunks(chunk_size.max(1)).enumerate() {
        match upsert(chunk) {
            Ok(rows) => {
                debug!(table, chunk = index, rows, "chunk upserted");
                confirmed += rows;
            }
            Err(e) => warn!(
                table,
                chunk = index,
                size = chunk.len(),
                "chunk upsert failed: {}",
                e
            ),
        }
    }
    confirmed
}
