//! SINAPI API Server module
//!
//! HTTP REST API for workbook uploads, imports and price lookups.
//! Run with `sinapi-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, ApiConfig, AppState, StoreBackend};
