//! # Storage Writer
//!
//! Serializes a `ProjectedRecord` and commits it under `{id}_{name}.json`.
//! The put is unconditional: re-ingesting an identifier overwrites it.

use super::inventory::StoredObjectKey;
use super::s3::ObjectStore;
use crate::catalog::record::ProjectedRecord;
use crate::errors::IngestError;
use crate::loggers::loggerlocal::LoggerLocal;
use serde_json::json;

/// Content type of every stored object.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedObject {
    /// Bucket written to.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Body length in bytes.
    pub bytes: usize,
}

/// Compact UTF-8 JSON body for `record`.
pub fn serialize_record(record: &ProjectedRecord) -> Result<Vec<u8>, IngestError> {
    serde_json::to_vec(record).map_err(|e| {
        IngestError::MalformedRecord(format!("record {} does not serialize: {}", record.id, e))
    })
}

/// Writes `record` to `bucket`.
///
/// # Errors
/// `IngestError::MalformedRecord` when the key would not parse back as
/// `{id}_{name}.json`, `IngestError::Storage` when the store rejects the put.
pub async fn commit_record(
    store: &dyn ObjectStore,
    bucket: &str,
    record: &ProjectedRecord,
    logger: &LoggerLocal,
) -> Result<CommittedObject, IngestError> {
    let key = StoredObjectKey::new(record.id, record.name.clone()).to_string();
    // Anything written here must be readable by the next scan.
    if let Err(e) = key.parse::<StoredObjectKey>() {
        return Err(IngestError::MalformedRecord(format!(
            "record {} cannot be stored under a scannable key: {}",
            record.id, e
        )));
    }
    let body = serialize_record(record)?;
    let bytes = body.len();

    store.put_object(bucket, &key, body, JSON_CONTENT_TYPE).await?;

    logger
        .info(
            "Object committed",
            Some(json!({"bucket": bucket, "key": key, "bytes": bytes})),
        )
        .await;

    Ok(CommittedObject {
        bucket: bucket.to_string(),
        key,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::inventory::max_identifier;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Captured {
        puts: Mutex<Vec<(String, String, Vec<u8>, String)>>,
        reject: bool,
    }

    #[async_trait]
    impl ObjectStore for Captured {
        async fn list_keys(&self, _bucket: &str) -> Result<Vec<String>, IngestError> {
            Ok(Vec::new())
        }

        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<(), IngestError> {
            if self.reject {
                return Err(IngestError::Storage("AccessDenied".into()));
            }
            self.puts
                .lock()
                .unwrap()
                .push((bucket.into(), key.into(), body, content_type.into()));
            Ok(())
        }
    }

    fn record() -> ProjectedRecord {
        ProjectedRecord {
            id: 3,
            name: "venusaur".into(),
            abilities: vec![json!({"ability": {"name": "overgrow"}, "slot": 1})],
        }
    }

    #[tokio::test]
    async fn writes_json_under_id_and_name() {
        let store = Captured::default();
        let logger = LoggerLocal::silent("writer_test");

        let committed = commit_record(&store, "pokemon-api-json", &record(), &logger)
            .await
            .unwrap();

        assert_eq!(committed.key, "3_venusaur.json");
        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        let (bucket, key, body, content_type) = &puts[0];
        assert_eq!(bucket, "pokemon-api-json");
        assert_eq!(key, "3_venusaur.json");
        assert_eq!(content_type, JSON_CONTENT_TYPE);
        assert_eq!(committed.bytes, body.len());

        let text = std::str::from_utf8(body).unwrap();
        assert!(text.starts_with("{\"id\":3,\"name\":\"venusaur\",\"abilities\":["));
        let parsed: ProjectedRecord = serde_json::from_slice(body).unwrap();
        assert_eq!(parsed, record());
    }

    #[tokio::test]
    async fn unscannable_key_is_never_written() {
        let store = Captured::default();
        let logger = LoggerLocal::silent("writer_test");
        let nameless = ProjectedRecord {
            name: String::new(),
            ..record()
        };

        let err = commit_record(&store, "pokemon-api-json", &nameless, &logger).await.unwrap_err();

        assert_eq!(err.kind(), "MalformedRecord");
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn written_keys_scan_back_to_their_identifiers() {
        let store = Captured::default();
        let logger = LoggerLocal::silent("writer_test");
        let names = [
            (29, "nidoran-f"),
            (122, "mr_mime"),
            (250, "ho-oh"),
            (439, "mime.jr"),
            (10, "porygon_z.v2"),
        ];

        let mut keys = Vec::new();
        for (id, name) in names {
            let r = ProjectedRecord {
                id,
                name: name.to_string(),
                ..record()
            };
            let committed = commit_record(&store, "pokemon-api-json", &r, &logger).await.unwrap();
            let parsed: StoredObjectKey = committed.key.parse().unwrap();
            assert_eq!(parsed, StoredObjectKey::new(id, name));
            keys.push(committed.key);
        }

        assert_eq!(max_identifier("pokemon-api-json", &keys).unwrap(), 439);
    }

    #[tokio::test]
    async fn rejection_surfaces_as_storage_error() {
        let store = Captured { reject: true, ..Default::default() };
        let logger = LoggerLocal::silent("writer_test");

        let err = commit_record(&store, "pokemon-api-json", &record(), &logger).await.unwrap_err();
        assert_eq!(err.kind(), "StorageError");
    }
}
