//! # PokeAPI Catalog Client
//!
//! Fetches a single record from `GET {base}/api/v2/pokemon/{id}/`. The client
//! makes one attempt with a short bound and classifies every failure:
//!
//! - 4xx becomes `NotFound` (usually: the next id is not published yet);
//! - 5xx and other non-2xx statuses become `ServerError`;
//! - an expired bound becomes `Timeout`;
//! - connection failures become `Transport`;
//! - a 2xx body that is not JSON becomes `MalformedRecord`.

use crate::errors::{IngestError, ScanError};
use crate::loggers::loggerlocal::LoggerLocal;
use crate::retrieve::ky_http::{ApiClient, RetrieveError};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default public catalog host.
pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/";

/// Source of catalog records, keyed by identifier.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches the full record `id`.
    async fn fetch_record(&self, id: u64) -> Result<Value, IngestError>;
}

/// The identifier that follows `last`.
///
/// # Errors
/// `ScanError::IdentifierOverflow` when `last` is `u64::MAX`.
pub fn next_identifier(last: u64) -> Result<u64, IngestError> {
    last.checked_add(1)
        .ok_or_else(|| ScanError::IdentifierOverflow { last }.into())
}

/// Fetches the record after `last_known`, never `last_known` itself or
/// anything further ahead. Returns the identifier asked for with the body.
pub async fn fetch_next(
    source: &dyn CatalogSource,
    last_known: u64,
) -> Result<(u64, Value), IngestError> {
    let id = next_identifier(last_known)?;
    let body = source.fetch_record(id).await?;
    Ok((id, body))
}

/// # PokeAPI Fetcher
///
/// `CatalogSource` backed by the public PokeAPI REST service.
#[derive(Debug)]
pub struct PokeApiFetcher {
    /// HTTP client bound to the catalog base URL.
    client: ApiClient,
    /// A shared logger for recording the outcomes of API calls.
    logger: Arc<LoggerLocal>,
}

impl PokeApiFetcher {
    /// Creates a fetcher for `base_url` with `timeout` applied to connecting
    /// and to the whole request.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        logger: Arc<LoggerLocal>,
    ) -> Result<Self, RetrieveError> {
        Ok(Self {
            client: ApiClient::new(base_url, None, timeout)?,
            logger,
        })
    }

    /// Relative path of record `id`.
    pub fn record_path(id: u64) -> String {
        format!("api/v2/pokemon/{}/", id)
    }

    /// Maps a transport-level failure for record `id` onto the ingestion taxonomy.
    fn classify_failure(id: u64, err: RetrieveError) -> IngestError {
        match err {
            RetrieveError::Timeout(bound) => IngestError::Timeout {
                id,
                timeout_ms: bound.as_millis() as u64,
            },
            RetrieveError::Decode(msg) => {
                IngestError::MalformedRecord(format!("record {} is not valid JSON: {}", id, msg))
            }
            RetrieveError::Connect(msg)
            | RetrieveError::Other(msg)
            | RetrieveError::Build(msg)
            | RetrieveError::InvalidUrl(msg) => IngestError::Transport { id, message: msg },
        }
    }

    /// Maps a non-2xx status for record `id` onto the ingestion taxonomy.
    fn classify_status(id: u64, status: u16) -> IngestError {
        if (400..500).contains(&status) {
            IngestError::NotFound { id, status }
        } else {
            IngestError::ServerError { id, status }
        }
    }
}

#[async_trait]
impl CatalogSource for PokeApiFetcher {
    async fn fetch_record(&self, id: u64) -> Result<Value, IngestError> {
        let path = Self::record_path(id);
        self.logger
            .debug("Requesting catalog record", Some(json!({"id": id, "path": path})))
            .await;

        let sent = self.client.request::<Value, ()>(Method::GET, &path, None, None).await;
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let err = Self::classify_failure(id, e);
                self.logger
                    .error(
                        &format!("Catalog request for {} failed: {}", path, err),
                        Some(json!({"kind": err.kind()})),
                    )
                    .await;
                return Err(err);
            }
        };

        match (response.success, response.data) {
            (true, Some(body)) => Ok(body),
            (true, None) => Err(IngestError::MalformedRecord(format!(
                "record {} has an empty body",
                id
            ))),
            (false, _) => {
                let err = Self::classify_status(id, response.status);
                self.logger
                    .warn(
                        &format!("HTTP Request failed for {}: Status {}", path, response.status),
                        Some(json!({"kind": err.kind(), "body": response.error_body})),
                    )
                    .await;
                Err(err)
            }
        }
    }
}
