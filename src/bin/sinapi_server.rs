//! SINAPI API Server binary
//!
//! HTTP REST API for SINAPI workbook uploads and imports.

use std::sync::Arc;

use clap::Parser;
use sinapi_forge::api::{run_api_server, ApiConfig, StoreBackend};
use sinapi_forge::store::{MemoryStore, StoreConfig, DEFAULT_CHUNK_SIZE};

#[derive(Parser, Debug)]
#[command(name = "sinapi-server")]
#[command(version)]
#[command(about = "SINAPI API Server - HTTP API for SINAPI workbook imports")]
#[command(long_about = r#"
SINAPI API Server - HTTP REST API

Endpoints:
  - POST /api/v1/sinapi/upload        - Read metadata of one workbook
  - POST /api/v1/sinapi/import        - Import one or more workbooks
  - GET  /api/v1/sinapi/prices/{code} - Price lookup (?region=SP&month=12/2025&regime=csd)

Additional endpoints:
  - GET  /health                      - Health check
  - GET  /version                     - Server version info
  - GET  /                            - API documentation

Without SUPABASE_URL, imports go to an in-memory store that lives as long as
the process. Settings are also read from a .env file.

Example usage:
  sinapi-server                           # Start on localhost:8080
  sinapi-server --host 0.0.0.0 --port 3000

  curl -F "files=@SINAPI_CSD.xlsx" -F "files=@SINAPI_CCD.xlsx" \
    http://localhost:8080/api/v1/sinapi/import
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SINAPI_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SINAPI_PORT")]
    port: u16,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase service role key
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,

    /// Rows per upsert request
    #[arg(long, env = "SINAPI_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Maximum request body size in megabytes
    #[arg(long, default_value = "50")]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let store = match args.supabase_url {
        Some(url) => {
            let config = StoreConfig::new(url, args.supabase_key.unwrap_or_default())
                .with_chunk_size(args.chunk_size);
            config.validate()?;
            StoreBackend::Postgrest(config)
        }
        None => StoreBackend::Memory(Arc::new(MemoryStore::with_chunk_size(args.chunk_size))),
    };

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        max_upload_bytes: args.max_upload_mb * 1024 * 1024,
    };

    run_api_server(config, store).await
}
