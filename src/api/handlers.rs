//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{SinapiError, SinapiResult};
use crate::import::{ensure_supported_file, extract_metadata_from_bytes, import_batch, WorkbookUpload};
use crate::types::{BatchImportReport, PriceRecord, PricingRegime, Region, SinapiMetadata};

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Failed request: status code plus message, rendered in the standard envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<SinapiError> for ApiError {
    fn from(e: SinapiError) -> Self {
        if e.is_client_error() {
            ApiError::bad_request(e.to_string())
        } else {
            ApiError::internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, "request failed: {}", self.message);
        }
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Run blocking pipeline work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> SinapiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "SINAPI API Server".to_string(),
        version: state.version.clone(),
        description: "Import SINAPI reference price workbooks".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new(
                "POST",
                "/api/v1/sinapi/upload",
                "Read metadata of one SINAPI workbook",
            ),
            EndpointInfo::new(
                "POST",
                "/api/v1/sinapi/import",
                "Import one or more SINAPI workbooks",
            ),
            EndpointInfo::new(
                "GET",
                "/api/v1/sinapi/prices/{code}",
                "Look up a composition price by region, month and regime",
            ),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        store: state.store.name().to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub source: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        source: state.source.name().to_string(),
        features: vec![
            "upload".to_string(),
            "import".to_string(),
            "prices".to_string(),
        ],
    }))
}

/// Every part of the form that carries a file name.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<WorkbookUpload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        status: e.status(),
        message: format!("invalid multipart body: {}", e.body_text()),
    })? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| ApiError {
            status: e.status(),
            message: format!("failed to read '{}': {}", file_name, e.body_text()),
        })?;
        uploads.push(WorkbookUpload::new(file_name, bytes.to_vec()));
    }
    Ok(uploads)
}

/// POST /api/v1/sinapi/upload - Read workbook metadata without importing
pub async fn upload_metadata(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<SinapiMetadata> {
    let upload = read_uploads(multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("no file in request"))?;
    ensure_supported_file(&upload.file_name)?;

    info!(
        file = upload.file_name.as_str(),
        bytes = upload.bytes.len(),
        "metadata upload"
    );
    let source = state.source;
    let metadata =
        run_blocking(move || extract_metadata_from_bytes(upload.bytes, None, source)).await?;
    Ok(Json(ApiResponse::ok(metadata)))
}

/// POST /api/v1/sinapi/import - Import every uploaded workbook
pub async fn import_sinapi(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<BatchImportReport> {
    let uploads = read_uploads(multipart).await?;
    if uploads.is_empty() {
        return Err(ApiError::bad_request("no files in request"));
    }

    info!(files = uploads.len(), store = state.store.name(), "batch import");
    let report = run_blocking(move || {
        state
            .store
            .with_store(|store| Ok(import_batch(uploads, store)))
    })
    .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// Query string of the price lookup
#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub region: String,
    pub month: String,
    #[serde(default)]
    pub regime: Option<String>,
}

/// GET /api/v1/sinapi/prices/{code} - Price of one composition
pub async fn find_price(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<PriceQuery>,
) -> ApiResult<PriceRecord> {
    let region: Region = query
        .region
        .parse()
        .map_err(|e: SinapiError| ApiError::bad_request(e.to_string()))?;
    let regime: PricingRegime = match query.regime.as_deref() {
        Some(raw) => raw
            .parse()
            .map_err(|e: SinapiError| ApiError::bad_request(e.to_string()))?,
        None => PricingRegime::default(),
    };

    let lookup_code = code.clone();
    let month = query.month.clone();
    let found = run_blocking(move || {
        state
            .store
            .with_store(|store| store.find_price(&lookup_code, region, &month, regime))
    })
    .await?;

    found.map(|record| Json(ApiResponse::ok(record))).ok_or_else(|| {
        ApiError::not_found(format!(
            "no {} price for composition {} in {} ({})",
            region,
            code,
            query.month,
            regime.label()
        ))
    })
}
