use clap::{Args, Parser, Subcommand};
use sinapi_forge::cli;
use sinapi_forge::store::{StoreConfig, DEFAULT_CHUNK_SIZE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sinapi")]
#[command(about = "Parse and import SINAPI reference price workbooks")]
#[command(long_about = "SINAPI - reference price workbook importer

Reads the monthly SINAPI Excel workbooks, finds composition and per-state
price tables in them, and upserts the records into Supabase.

COMMANDS:
  metadata  - Show reference month, region and pricing regime
  inspect   - List sheets, their role and detected header layout
  import    - Import workbooks (in-memory dry run without --supabase-url)
  export    - Write extracted records to .xlsx, .yaml or .json
  price     - Look up one composition price

EXAMPLES:
  sinapi metadata SINAPI_Referencia_2025_12.xlsx
  sinapi import SINAPI_CSD.xlsx SINAPI_CCD.xlsx --supabase-url https://x.supabase.co
  sinapi export SINAPI_CSD.xlsx records.yaml
  sinapi price 104658 --region SP --month 12/2025

Settings are also read from a .env file in the working directory.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection to the Supabase REST API
#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase service role key
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,

    /// Rows per upsert request
    #[arg(long, env = "SINAPI_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

impl StoreArgs {
    fn into_config(self) -> Option<StoreConfig> {
        let url = self.supabase_url?;
        Some(
            StoreConfig::new(url, self.supabase_key.unwrap_or_default())
                .with_chunk_size(self.chunk_size),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the metadata of a workbook
    Metadata {
        /// Path to the .xls/.xlsx workbook
        file: PathBuf,

        /// Sheet to read the header cells from
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// List sheets, selected price sheets and header layouts
    Inspect {
        /// Path to the .xls/.xlsx workbook
        file: PathBuf,

        /// Show pipeline logs
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Import one or more SINAPI workbooks.

Each file is processed independently: files with other extensions are skipped
and a file that fails to parse does not stop the others.

Without --supabase-url (or SUPABASE_URL) the records are written to an
in-memory store and only counted.")]
    /// Import workbooks into the database
    Import {
        /// Workbooks to import
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        store: StoreArgs,

        /// Show verbose import steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Export extracted records to .xlsx, .yaml or .json
    Export {
        /// Path to the .xls/.xlsx workbook
        input: PathBuf,

        /// Output file; the format follows its extension
        output: PathBuf,

        /// Show verbose export steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Look up the price of one composition
    Price {
        /// Composition code
        code: String,

        /// Region code (e.g. SP)
        #[arg(short, long)]
        region: String,

        /// Reference month (MM/YYYY)
        #[arg(short, long)]
        month: String,

        /// Pricing regime: csd, ccd or cse (default csd)
        #[arg(long)]
        regime: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Metadata { file, sheet } => cli::metadata(file, sheet)?,

        Commands::Inspect { file, verbose } => {
            cli::init_logging(verbose);
            cli::inspect(file)?
        }

        Commands::Import {
            files,
            store,
            verbose,
        } => {
            cli::init_logging(verbose);
            cli::import(files, store.into_config(), verbose)?
        }

        Commands::Export {
            input,
            output,
            verbose,
        } => {
            cli::init_logging(verbose);
            cli::export(input, output, verbose)?
        }

        Commands::Price {
            code,
            region,
            month,
            regime,
            store,
        } => {
            let config = store.into_config().ok_or_else(|| {
                anyhow::anyhow!("price lookups need --supabase-url or SUPABASE_URL")
            })?;
            cli::price(code, region, month, regime, config)?
        }
    }

    Ok(())
}
