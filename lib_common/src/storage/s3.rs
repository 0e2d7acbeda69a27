//! # S3 Object Store
//!
//! The `ObjectStore` seam used by the scanner and the writer, and its S3
//! implementation built from a `ScopedSession`.

use super::broker::ScopedSession;
use crate::errors::IngestError;
use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::time::Duration;

/// Minimal object store surface the ingestion cycle needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every key in `bucket`.
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, IngestError>;

    /// Unconditional create-or-overwrite of `key` in `bucket`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), IngestError>;
}

/// Builds the one store client a run uses, consuming the session.
pub trait StoreConnector: Send + Sync {
    /// Connects with the session's credentials.
    fn connect(&self, session: ScopedSession) -> Result<Box<dyn ObjectStore>, IngestError>;
}

/// `StoreConnector` producing `S3ObjectStore` clients.
#[derive(Debug, Clone)]
pub struct S3Connector {
    operation_timeout: Duration,
    endpoint: Option<String>,
}

impl S3Connector {
    /// Connector whose clients bound every S3 call by `operation_timeout`.
    pub fn new(operation_timeout: Duration, endpoint: Option<String>) -> Self {
        Self {
            operation_timeout,
            endpoint,
        }
    }
}

impl StoreConnector for S3Connector {
    fn connect(&self, session: ScopedSession) -> Result<Box<dyn ObjectStore>, IngestError> {
        Ok(Box::new(S3ObjectStore::from_session(
            session,
            self.operation_timeout,
            self.endpoint.as_deref(),
        )))
    }
}

/// `ObjectStore` backed by Amazon S3 (or an S3-compatible endpoint).
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Builds a client that signs with the session's temporary credentials only.
    pub fn from_session(
        session: ScopedSession,
        operation_timeout: Duration,
        endpoint: Option<&str>,
    ) -> Self {
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(session.region().to_string()))
            .credentials_provider(session.sdk_credentials())
            .retry_config(RetryConfig::disabled())
            .timeout_config(TimeoutConfig::builder().operation_timeout(operation_timeout).build());

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// The underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, IngestError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket);
            if let Some(t) = token.take() {
                req = req.continuation_token(t);
            }
            let resp = req.send().await.map_err(|e| {
                let context = DisplayErrorContext(&e);
                IngestError::Storage(format!("s3 list_objects_v2 {}: {}", bucket, context))
            })?;

            if let Some(contents) = resp.contents {
                keys.extend(contents.into_iter().filter_map(|obj| obj.key));
            }

            if resp.is_truncated.unwrap_or(false) {
                token = resp.next_continuation_token;
                if token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), IngestError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let context = DisplayErrorContext(&e);
                IngestError::Storage(format!("s3 put_object {}/{}: {}", bucket, key, context))
            })?;
        Ok(())
    }
}
