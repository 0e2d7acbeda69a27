//! # PokeAPI Live Check
//!
//! Fetches one record from the public catalog, projects it and prints the
//! object key and body that an ingestion run would write. Nothing is stored.
//!
//! ```text
//! cargo run -p project_tests --bin test_pokeapi -- --id 3
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use clap::Parser;
use lib_common::catalog::{project, CatalogSource, PokeApiFetcher};
use lib_common::configs::config_etl::DEFAULT_FETCH_TIMEOUT_MS;
use lib_common::storage::StoredObjectKey;
use lib_common::LoggerLocal;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
struct Args {
    /// Record to fetch.
    #[clap(long, default_value_t = 1)]
    id: u64,

    /// Catalog base URL.
    #[clap(long, default_value = lib_common::catalog::pokeapi::DEFAULT_CATALOG_URL)]
    catalog_url: String,

    /// Fetch bound in milliseconds.
    #[clap(long, default_value_t = DEFAULT_FETCH_TIMEOUT_MS)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let logger = Arc::new(LoggerLocal::new("test_pokeapi".to_string(), None));
    let timeout = Duration::from_millis(args.timeout_ms);
    let fetcher = PokeApiFetcher::new(&args.catalog_url, timeout, logger)?;

    println!("--- Fetching {} ---", PokeApiFetcher::record_path(args.id));
    match fetcher.fetch_record(args.id).await {
        Ok(raw) => {
            let record = project(&raw)?;
            let key = StoredObjectKey::new(record.id, record.name.clone());
            println!("✅ {} ({} abilities)", key, record.abilities.len());
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Err(e) if e.is_not_found() => {
            println!("ℹ️  Record {} is not published: {}", args.id, e)
        }
        Err(e) => println!("❌ [{}] {}", e.kind(), e),
    }

    Ok(())
}
