//! # Role Exchange Live Check
//!
//! Uses the regular ETL configuration (`.env`, config file, flags) to assume
//! the bucket role and scan the bucket. Reports the session expiry and the
//! highest stored identifier. Read-only: nothing is written.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use lib_common::configs::load_config;
use lib_common::storage::broker::{CredentialBroker, StsBroker};
use lib_common::storage::inventory::scan_last_identifier;
use lib_common::storage::s3::{S3Connector, StoreConnector};
use lib_common::LoggerLocal;
use std::sync::Arc;
use std::time::SystemTime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = load_config()?;
    let config = loaded.config;
    let logger = Arc::new(LoggerLocal::new("test_assume_role".to_string(), None));
    for note in &loaded.notes {
        logger.info(note, None).await;
    }

    println!("--- Assuming {} in {} ---", config.role_arn, config.region);
    let broker = StsBroker::new(
        config.identity().ok(),
        config.role_target(),
        config.aws_timeout,
        Arc::clone(&logger),
    )
    .with_endpoint(config.broker_endpoint.clone());

    let session = match broker.exchange().await {
        Ok(session) => session,
        Err(e) => {
            println!("❌ [{}] {}", e.kind(), e);
            return Ok(());
        }
    };
    match session.expires_at().and_then(|t| t.duration_since(SystemTime::now()).ok()) {
        Some(left) => println!("✅ Session valid for another {}s", left.as_secs()),
        None => println!("✅ Session issued (no expiry reported)"),
    }

    println!("--- Scanning {} ---", config.bucket);
    let connector = S3Connector::new(config.aws_timeout, config.storage_endpoint.clone());
    let store = connector.connect(session)?;
    match scan_last_identifier(store.as_ref(), &config.bucket, &logger).await {
        Ok(last) => println!(
            "✅ Highest stored id: {} (next run fetches {})",
            last,
            last.saturating_add(1)
        ),
        Err(e) => println!("❌ [{}] {}", e.kind(), e),
    }

    Ok(())
}
