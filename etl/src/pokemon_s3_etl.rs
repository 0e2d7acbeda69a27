//! Ingests the next PokeAPI record into S3, once, then exits.
//!
//! Exit status is 0 when a new object was written and 1 when the run aborted
//! at any stage (including "nothing new published yet").

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lib_common::configs::load_config;
use lib_common::ingestors::PokemonS3Ingestor;
use lib_common::loggers::loggerlocal::level_from_name;
use lib_common::{LoggerLocal, LoggerLocalOptions};
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;

const APP_NAME: &str = "pokemon_s3_etl";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let loaded = load_config().context("loading configuration")?;
    let config = loaded.config;

    let min_level = level_from_name(&config.log_level);
    let options = LoggerLocalOptions::from_min_level(min_level, config.log_dir.clone());
    let logger = Arc::new(LoggerLocal::new(APP_NAME.to_string(), Some(options)));

    for note in &loaded.notes {
        logger.info(note, None).await;
    }
    logger
        .debug(
            "Configuration resolved",
            Some(json!({
                "bucket": config.bucket,
                "region": config.region,
                "role_arn": config.role_arn,
                "catalog_url": config.catalog_url,
            })),
        )
        .await;

    let ingestor = PokemonS3Ingestor::from_config(&config, Arc::clone(&logger))
        .context("building the catalog client")?;

    match ingestor.run().await {
        Ok(report) => {
            let expires = report
                .session_expires_at
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            logger
                .info(
                    "Run complete",
                    Some(json!({
                        "previous_max_id": report.previous_max_id,
                        "ingested_id": report.ingested_id,
                        "name": report.name,
                        "key": report.key,
                        "bytes": report.bytes,
                        "session_expires_at": expires,
                    })),
                )
                .await;
            println!("{} uploaded to S3", report.key);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("{}", failure.diagnostic());
            Ok(ExitCode::FAILURE)
        }
    }
}
