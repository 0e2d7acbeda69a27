//! # Storage Inventory Scanner
//!
//! Derives the last ingested identifier from the keys already in the bucket.
//! Keys look like `{id}_{name}.json`; the identifier is everything before the
//! first `_` and is compared numerically, so `10` sorts after `9`.

use super::s3::ObjectStore;
use crate::errors::{IngestError, ScanError};
use crate::loggers::loggerlocal::LoggerLocal;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// Suffix every stored object carries.
pub const OBJECT_SUFFIX: &str = ".json";
/// Separator between identifier and name.
pub const KEY_DELIMITER: char = '_';

/// A parsed `{id}_{name}.json` object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObjectKey {
    /// Numeric identifier.
    pub id: u64,
    /// Record name, may itself contain the delimiter.
    pub name: String,
}

impl StoredObjectKey {
    /// Key for record `id` named `name`.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl fmt::Display for StoredObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", self.id, KEY_DELIMITER, self.name, OBJECT_SUFFIX)
    }
}

impl FromStr for StoredObjectKey {
    type Err = ScanError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ScanError::MalformedKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let (id_part, rest) = key
            .split_once(KEY_DELIMITER)
            .ok_or_else(|| malformed("no '_' delimiter"))?;

        if id_part.is_empty() || !id_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("identifier is not a decimal integer"));
        }
        let id = id_part
            .parse::<u64>()
            .map_err(|_| malformed("identifier does not fit in 64 bits"))?;

        let name = rest
            .strip_suffix(OBJECT_SUFFIX)
            .ok_or_else(|| malformed("missing .json suffix"))?;
        if name.is_empty() {
            return Err(malformed("empty name"));
        }

        Ok(Self::new(id, name))
    }
}

/// Highest identifier across `keys`.
///
/// # Errors
/// `ScanError::EmptyBucket` for no keys, `ScanError::MalformedKey` for the
/// first key that does not parse.
pub fn max_identifier(bucket: &str, keys: &[String]) -> Result<u64, ScanError> {
    let mut max: Option<u64> = None;
    for key in keys {
        let parsed: StoredObjectKey = key.parse()?;
        max = Some(max.map_or(parsed.id, |m| m.max(parsed.id)));
    }
    max.ok_or_else(|| ScanError::EmptyBucket {
        bucket: bucket.to_string(),
    })
}

/// Lists `bucket` and returns the last ingested identifier.
pub async fn scan_last_identifier(
    store: &dyn ObjectStore,
    bucket: &str,
    logger: &LoggerLocal,
) -> Result<u64, IngestError> {
    let keys = store.list_keys(bucket).await?;
    let last = max_identifier(bucket, &keys)?;
    logger
        .debug(
            "Bucket inventory scanned",
            Some(json!({"bucket": bucket, "objects": keys.len(), "max_id": last})),
        )
        .await;
    Ok(last)
}
