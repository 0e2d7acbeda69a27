//! # PokeAPI to S3 Ingestor
//!
//! Runs one incremental ingestion cycle:
//!
//! 1. **Authorize**: exchange identity credentials for a scoped session.
//! 2. **Scan**: connect to the bucket with that session and find the highest stored id.
//! 3. **Fetch**: request the record after it from the catalog.
//! 4. **Project**: keep `{id, name, abilities}`.
//! 5. **Persist**: write `{id}_{name}.json`.
//!
//! Every stage either hands its result to the next or aborts the run. Nothing
//! after a failed stage is attempted, and nothing is retried.

use crate::catalog::pokeapi::{fetch_next, CatalogSource, PokeApiFetcher};
use crate::catalog::record::project_requested;
use crate::configs::config_etl::ResolvedConfig;
use crate::errors::IngestError;
use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::RetrieveError;
use crate::storage::broker::{CredentialBroker, StsBroker};
use crate::storage::inventory::scan_last_identifier;
use crate::storage::s3::{S3Connector, StoreConnector};
use crate::storage::writer::commit_record;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// States of the ingestion cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Credential exchange.
    Authorize,
    /// Bucket inventory.
    Scan,
    /// Catalog request.
    Fetch,
    /// Field projection.
    Project,
    /// Object write.
    Persist,
    /// Terminal success.
    Done,
    /// Terminal failure.
    Aborted,
}

impl Stage {
    /// The state entered when this one succeeds.
    pub fn next(self) -> Stage {
        match self {
            Stage::Authorize => Stage::Scan,
            Stage::Scan => Stage::Fetch,
            Stage::Fetch => Stage::Project,
            Stage::Project => Stage::Persist,
            Stage::Persist => Stage::Done,
            Stage::Done => Stage::Done,
            Stage::Aborted => Stage::Aborted,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Authorize => "Authorize",
            Stage::Scan => "Scan",
            Stage::Fetch => "Fetch",
            Stage::Project => "Project",
            Stage::Persist => "Persist",
            Stage::Done => "Done",
            Stage::Aborted => "Aborted",
        };
        f.write_str(name)
    }
}

/// A run that ended in `Stage::Aborted`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Run aborted at {stage}: [{}] {error}", error.kind())]
pub struct StageFailure {
    /// The stage that failed.
    pub stage: Stage,
    /// Why it failed.
    pub error: IngestError,
}

impl StageFailure {
    /// One-line diagnostic for the operator. A `NotFound` reads as "nothing
    /// new yet" rather than as an outage.
    pub fn diagnostic(&self) -> String {
        if self.error.is_not_found() {
            format!("{}. No new record has been published yet; nothing was uploaded.", self)
        } else {
            format!("{}. Nothing was uploaded.", self)
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Highest identifier found in the bucket before the run.
    pub previous_max_id: u64,
    /// Identifier ingested by this run.
    pub ingested_id: u64,
    /// Name of the ingested record.
    pub name: String,
    /// Bucket written to.
    pub bucket: String,
    /// Key of the new object.
    pub key: String,
    /// Size of the new object.
    pub bytes: usize,
    /// When the session used for the run expires, if known.
    pub session_expires_at: Option<SystemTime>,
}

/// # PokeAPI to S3 Ingestor
///
/// Holds the three seams of the cycle (broker, store connector, catalog) and
/// the target bucket. Each call to `run` is an independent run with its own
/// credential exchange.
pub struct PokemonS3Ingestor {
    broker: Arc<dyn CredentialBroker>,
    connector: Arc<dyn StoreConnector>,
    catalog: Arc<dyn CatalogSource>,
    bucket: String,
    logger: Arc<LoggerLocal>,
}

impl fmt::Debug for PokemonS3Ingestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PokemonS3Ingestor")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl PokemonS3Ingestor {
    /// Assembles an ingestor from its seams.
    pub fn new(
        broker: Arc<dyn CredentialBroker>,
        connector: Arc<dyn StoreConnector>,
        catalog: Arc<dyn CatalogSource>,
        bucket: impl Into<String>,
        logger: Arc<LoggerLocal>,
    ) -> Self {
        Self {
            broker,
            connector,
            catalog,
            bucket: bucket.into(),
            logger,
        }
    }

    /// Wires STS, S3 and PokeAPI from the resolved configuration.
    ///
    /// # Errors
    /// `RetrieveError` when the catalog client cannot be built (bad URL).
    pub fn from_config(
        config: &ResolvedConfig,
        logger: Arc<LoggerLocal>,
    ) -> Result<Self, RetrieveError> {
        let broker = StsBroker::new(
            config.identity().ok(),
            config.role_target(),
            config.aws_timeout,
            Arc::clone(&logger),
        )
        .with_endpoint(config.broker_endpoint.clone());
        let connector = S3Connector::new(config.aws_timeout, config.storage_endpoint.clone());
        let catalog =
            PokeApiFetcher::new(&config.catalog_url, config.fetch_timeout, Arc::clone(&logger))?;

        Ok(Self::new(
            Arc::new(broker),
            Arc::new(connector),
            Arc::new(catalog),
            config.bucket.clone(),
            logger,
        ))
    }

    /// The bucket this ingestor writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn enter(&self, stage: Stage) {
        self.logger.debug(&format!("Stage {}", stage), None).await;
    }

    async fn abort(&self, stage: Stage, error: IngestError) -> StageFailure {
        let extras = Some(json!({"stage": stage.to_string(), "kind": error.kind()}));
        let message = format!("{} failed: {}", stage, error);
        if error.is_not_found() {
            self.logger.warn(&message, extras).await;
        } else {
            self.logger.error(&message, extras).await;
        }
        StageFailure { stage, error }
    }

    /// Runs one cycle.
    ///
    /// # Errors
    /// A `StageFailure` naming the first stage that failed.
    pub async fn run(&self) -> Result<IngestReport, StageFailure> {
        // --- Stage 1: Authorize ---
        let mut stage = Stage::Authorize;
        self.enter(stage).await;
        let session = match self.broker.exchange().await {
            Ok(session) => session,
            Err(e) => return Err(self.abort(stage, e).await),
        };
        let session_expires_at = session.expires_at();

        // --- Stage 2: Scan ---
        stage = stage.next();
        self.enter(stage).await;
        let store = match self.connector.connect(session) {
            Ok(store) => store,
            Err(e) => return Err(self.abort(stage, e).await),
        };
        let scanned = scan_last_identifier(store.as_ref(), &self.bucket, &self.logger).await;
        let previous_max_id = match scanned {
            Ok(id) => id,
            Err(e) => return Err(self.abort(stage, e).await),
        };

        // --- Stage 3: Fetch ---
        stage = stage.next();
        self.enter(stage).await;
        let (requested_id, raw) = match fetch_next(self.catalog.as_ref(), previous_max_id).await {
            Ok(fetched) => fetched,
            Err(e) => return Err(self.abort(stage, e).await),
        };

        // --- Stage 4: Project ---
        stage = stage.next();
        self.enter(stage).await;
        let record = match project_requested(&raw, requested_id) {
            Ok(record) => record,
            Err(e) => return Err(self.abort(stage, e).await),
        };

        // --- Stage 5: Persist ---
        stage = stage.next();
        self.enter(stage).await;
        let written = commit_record(store.as_ref(), &self.bucket, &record, &self.logger).await;
        let committed = match written {
            Ok(committed) => committed,
            Err(e) => return Err(self.abort(stage, e).await),
        };

        stage = stage.next();
        self.enter(stage).await;

        Ok(IngestReport {
            previous_max_id,
            ingested_id: record.id,
            name: record.name,
            bucket: committed.bucket,
            key: committed.key,
            bytes: committed.bytes,
            session_expires_at,
        })
    }
}
