//! # Ingestion Errors
//!
//! One taxonomy for every stage of the ingestion cycle. Each stage maps its
//! own failures onto these variants and hands them back to the orchestrator,
//! which stops at the first one.

use thiserror::Error;

/// Problems found while deriving the last ingested identifier from the bucket.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The bucket has no objects, so there is no previous identifier to continue from.
    #[error("bucket '{bucket}' holds no objects")]
    EmptyBucket {
        /// The bucket that was listed.
        bucket: String,
    },

    /// A key does not follow the `{id}_{name}.json` layout.
    #[error("object key '{key}' is malformed: {reason}")]
    MalformedKey {
        /// The offending key as listed.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The highest identifier is already `u64::MAX`.
    #[error("identifier {last} has no successor")]
    IdentifierOverflow {
        /// The highest identifier found.
        last: u64,
    },
}

/// Errors that can abort an ingestion run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Identity credentials are missing or the broker refused the exchange.
    #[error("Access denied: {0}. Check your permissions.")]
    Authorization(String),

    /// The broker failed for any reason other than a permission problem.
    #[error("Credential broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// The bucket inventory could not be turned into a last identifier.
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// The catalog answered 4xx for the requested identifier.
    #[error("No record {id} published yet (HTTP {status})")]
    NotFound {
        /// The identifier that was requested.
        id: u64,
        /// The HTTP status returned.
        status: u16,
    },

    /// The catalog answered 5xx (or any other non-success status).
    #[error("Catalog server error for record {id}: HTTP {status}")]
    ServerError {
        /// The identifier that was requested.
        id: u64,
        /// The HTTP status returned.
        status: u16,
    },

    /// No response arrived within the fetch bound.
    #[error("Timed out fetching record {id} after {timeout_ms} ms")]
    Timeout {
        /// The identifier that was requested.
        id: u64,
        /// The bound that expired.
        timeout_ms: u64,
    },

    /// Connection-level failure talking to the catalog.
    #[error("Connection error fetching record {id}: {message}")]
    Transport {
        /// The identifier that was requested.
        id: u64,
        /// Transport diagnostic.
        message: String,
    },

    /// The fetched payload lacks one of the projected fields or is not JSON.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The object store rejected a list or put call.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl IngestError {
    /// Stable short name of the error kind, used in diagnostics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Authorization(_) => "AuthorizationError",
            IngestError::BrokerUnavailable(_) => "BrokerUnavailable",
            IngestError::Scan(_) => "ScanError",
            IngestError::NotFound { .. } => "NotFound",
            IngestError::ServerError { .. } => "ServerError",
            IngestError::Timeout { .. } => "Timeout",
            IngestError::Transport { .. } => "TransportError",
            IngestError::MalformedRecord(_) => "MalformedRecord",
            IngestError::Storage(_) => "StorageError",
        }
    }

    /// True when the catalog simply has nothing new yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IngestError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_for_no_new_record_and_infrastructure() {
        let not_found = IngestError::NotFound { id: 3, status: 404 };
        let broker = IngestError::BrokerUnavailable("dispatch failure".into());
        let storage = IngestError::Storage("quota".into());

        assert_eq!(not_found.kind(), "NotFound");
        assert_eq!(broker.kind(), "BrokerUnavailable");
        assert_eq!(storage.kind(), "StorageError");
        assert!(not_found.is_not_found());
        assert!(!storage.is_not_found());
        assert!(not_found.to_string().contains("published yet"));
    }

    #[test]
    fn scan_error_converts_into_ingest_error() {
        let err: IngestError = ScanError::EmptyBucket { bucket: "b".into() }.into();
        assert_eq!(err.kind(), "ScanError");
        assert_eq!(err.to_string(), "Scan error: bucket 'b' holds no objects");
    }
}
