use anyhow::Result;
use bank_reviews::cli::{load, preprocess, setup, test_connection, verify};
use bank_reviews::util::env as env_util;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bankrev", version, about = "Bank app review ETL: clean, load, verify")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Check server connectivity and report database/table state
    TestConnection,
    /// Create the target database (if needed) and apply the schema
    Setup {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Do not attempt CREATE DATABASE (managed servers)
        #[arg(long, default_value_t = false)]
        skip_create_database: bool,
    },
    /// Clean a raw scraped CSV into the loader's input format
    Preprocess {
        /// Raw CSV produced by the scraping stage
        #[arg(long, default_value = preprocess::DEFAULT_RAW_CSV)]
        input: PathBuf,
        /// Where to write the cleaned CSV
        #[arg(long, default_value = preprocess::DEFAULT_CLEANED_CSV)]
        output: PathBuf,
    },
    /// Bulk-load a cleaned/annotated review CSV into the database
    Load {
        /// Input CSV (defaults to the analyzed file, then the cleaned one)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Override max pool connections
        #[arg(long)]
        max_connections: Option<u32>,
    },
    /// Run read-only aggregate queries to verify the loaded data
    Verify {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::TestConnection => test_connection::run().await,
        Commands::Setup {
            db_url,
            skip_create_database,
        } => {
            setup::run(setup::SetupConfig {
                database_url: db_url,
                skip_create_database,
            })
            .await
        }
        Commands::Preprocess { input, output } => {
            preprocess::run(preprocess::PreprocessConfig { input, output }).await
        }
        Commands::Load {
            input,
            db_url,
            max_connections,
        } => {
            load::run(load::LoadConfig {
                input,
                database_url: db_url,
                max_connections,
            })
            .await
        }
        Commands::Verify { db_url } => {
            verify::run(verify::VerifyConfig {
                database_url: db_url,
            })
            .await
        }
    }
}
