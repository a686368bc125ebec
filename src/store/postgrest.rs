//! Supabase (PostgREST) row store
//!
//! Rows are sent with the Portuguese column names of the existing database:
//! `codigo_composicao`, `descricao`, `unidade`, `grupo`, `mes_referencia`,
//! `tipo_composicao` and one lowercase column per region.

use super::{RecordStore, StoreConfig, COMPOSITION_TABLE, PRICE_TABLE};
use crate::error::{SinapiError, SinapiResult};
use crate::types::{CompositionRecord, PriceRecord, PricingRegime, Region, RegionPrices};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

const COMPOSITION_CONFLICT: &str = "codigo_composicao,mes_referencia";
const PRICE_CONFLICT: &str = "codigo_composicao,mes_referencia,tipo_composicao";
const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=representation";

#[derive(Debug, Serialize)]
struct CompositionRow<'a> {
    codigo_composicao: &'a str,
    descricao: &'a str,
    unidade: &'a str,
    grupo: &'a str,
    mes_referencia: &'a str,
}

impl<'a> From<&'a CompositionRecord> for CompositionRow<'a> {
    fn from(record: &'a CompositionRecord) -> Self {
        Self {
            codigo_composicao: &record.composition_code,
            descricao: &record.description,
            unidade: &record.unit,
            grupo: &record.group,
            mes_referencia: &record.reference_month,
        }
    }
}

#[derive(Debug, Serialize)]
struct PriceRow<'a> {
    codigo_composicao: &'a str,
    mes_referencia: &'a str,
    tipo_composicao: &'static str,
    #[serde(flatten)]
    prices: &'a RegionPrices,
}

impl<'a> From<&'a PriceRecord> for PriceRow<'a> {
    fn from(record: &'a PriceRecord) -> Self {
        Self {
            codigo_composicao: &record.composition_code,
            mes_referencia: &record.reference_month,
            tipo_composicao: record.pricing_regime.label(),
            prices: &record.prices,
        }
    }
}

/// Price row as returned by a select; extra columns are ignored.
#[derive(Debug, Deserialize)]
struct StoredPriceRow {
    codigo_composicao: String,
    mes_referencia: String,
    tipo_composicao: Option<String>,
    #[serde(flatten)]
    prices: RegionPrices,
}

/// Blocking PostgREST client.
///
/// Must be created and used outside an async runtime context.
#[derive(Debug)]
pub struct PostgrestStore {
    client: Client,
    config: StoreConfig,
}

impl PostgrestStore {
    pub fn new(config: StoreConfig) -> SinapiResult<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, table: &str) -> String {
        table_endpoint(&self.config.url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    fn upsert_rows<T: Serialize>(
        &self,
        table: &str,
        on_conflict: &str,
        rows: &[T],
    ) -> SinapiResult<usize> {
        let request = self
            .client
            .post(self.endpoint(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", UPSERT_PREFER)
            .json(rows);
        let response = check_status(table, self.authorized(request).send()?)?;
        let returned: Vec<serde_json::Value> = response.json()?;
        debug!(table, sent = rows.len(), returned = returned.len(), "upsert response");
        Ok(returned.len())
    }
}

fn table_endpoint(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

fn check_status(table: &str, response: Response) -> SinapiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(SinapiError::Persistence {
        table: table.to_string(),
        message: format!("HTTP {}: {}", status, body.trim()),
    })
}

impl RecordStore for PostgrestStore {
    fn name(&self) -> &str {
        "postgrest"
    }

    fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    fn upsert_composition_chunk(&self, chunk: &[CompositionRecord]) -> SinapiResult<usize> {
        let rows: Vec<CompositionRow<'_>> = chunk.iter().map(CompositionRow::from).collect();
        self.upsert_rows(COMPOSITION_TABLE, COMPOSITION_CONFLICT, &rows)
    }

    fn upsert_price_chunk(&self, chunk: &[PriceRecord]) -> SinapiResult<usize> {
        let rows: Vec<PriceRow<'_>> = chunk.iter().map(PriceRow::from).collect();
        self.upsert_rows(PRICE_TABLE, PRICE_CONFLICT, &rows)
    }

    fn find_price(
        &self,
        code: &str,
        region: Region,
        reference_month: &str,
        regime: PricingRegime,
    ) -> SinapiResult<Option<PriceRecord>> {
        let query = price_query(code, region, reference_month, regime);
        let request = self.client.get(self.endpoint(PRICE_TABLE)).query(&query);
        let response = check_status(PRICE_TABLE, self.authorized(request).send()?)?;
        let rows: Vec<StoredPriceRow> = response.json()?;

        Ok(rows
            .into_iter()
            .map(|row| PriceRecord {
                composition_code: row.codigo_composicao,
                reference_month: row.mes_referencia,
                pricing_regime: row
                    .tipo_composicao
                    .and_then(|label| label.parse().ok())
                    .unwrap_or(regime),
                prices: row.prices,
            })
            .find(|record| record.prices.get(region).is_some()))
    }
}

fn price_query(
    code: &str,
    region: Region,
    reference_month: &str,
    regime: PricingRegime,
) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), "*".to_string()),
        ("codigo_composicao".to_string(), format!("eq.{}", code)),
        ("mes_referencia".to_string(), format!("eq.{}", reference_month)),
        ("tipo_composicao".to_string(), format!("eq.{}", regime.label())),
        (region.column(), "not.is.null".to_string()),
        ("limit".to_string(), "1".to_string()),
    ]
}
