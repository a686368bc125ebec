use super::{RecordStore, DEFAULT_CHUNK_SIZE};
use crate::error::SinapiResult;
use crate::types::{CompositionRecord, PriceRecord, PricingRegime, Region};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type CompositionKey = (String, String);
type PriceKey = (String, String, PricingRegime);

/// In-process store with the same upsert semantics as the remote one.
///
/// Used for dry runs and tests.
#[derive(Debug)]
pub struct MemoryStore {
    chunk_size: usize,
    compositions: Mutex<BTreeMap<CompositionKey, CompositionRecord>>,
    prices: Mutex<BTreeMap<PriceKey, PriceRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            compositions: Mutex::new(BTreeMap::new()),
            prices: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn composition_count(&self) -> usize {
        lock(&self.compositions).len()
    }

    pub fn price_count(&self) -> usize {
        lock(&self.prices).len()
    }

    /// Stored compositions ordered by code then month.
    pub fn compositions(&self) -> Vec<CompositionRecord> {
        lock(&self.compositions).values().cloned().collect()
    }

    pub fn prices(&self) -> Vec<PriceRecord> {
        lock(&self.prices).values().cloned().collect()
    }
}

// A panic while holding the lock leaves the maps intact.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn upsert_composition_chunk(&self, chunk: &[CompositionRecord]) -> SinapiResult<usize> {
        let mut map = lock(&self.compositions);
        for record in chunk {
            let key = (
                record.composition_code.clone(),
                record.reference_month.clone(),
            );
            map.insert(key, record.clone());
        }
        Ok(chunk.len())
    }

    fn upsert_price_chunk(&self, chunk: &[PriceRecord]) -> SinapiResult<usize> {
        let mut map = lock(&self.prices);
        for record in chunk {
            let (code, month, regime) = record.natural_key();
            map.insert((code.to_string(), month.to_string(), regime), record.clone());
        }
        Ok(chunk.len())
    }

    fn find_price(
        &self,
        code: &str,
        region: Region,
        reference_month: &str,
        regime: PricingRegime,
    ) -> SinapiResult<Option<PriceRecord>> {
        let key = (code.to_string(), reference_month.to_string(), regime);
        Ok(lock(&self.prices)
            .get(&key)
            .filter(|record| record.prices.get(region).is_some())
            .cloned())
    }
}
