//! # Credential Broker
//!
//! Two-legged exchange of long-lived identity credentials for short-lived,
//! role-scoped ones:
//!
//! 1. authenticate to STS with the identity credentials and call `AssumeRole`;
//! 2. wrap only the returned temporary credentials in a `ScopedSession`.
//!
//! The identity credentials are never handed to any later call. The SDK retry
//! policy is disabled; the first failure is returned.

use crate::errors::IngestError;
use crate::loggers::loggerlocal::LoggerLocal;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sts::config::retry::RetryConfig;
use aws_sdk_sts::config::timeout::TimeoutConfig;
use aws_sdk_sts::config::{BehaviorVersion, Region};
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sts::operation::assume_role::AssumeRoleError;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Role assumed for storage access.
pub const DEFAULT_ROLE_ARN: &str = "arn:aws:iam::058264124972:role/S3AccessRole";
/// Session name reported to STS.
pub const DEFAULT_ROLE_SESSION_NAME: &str = "s3AccessRole";
/// Region of both the broker and the bucket.
pub const DEFAULT_REGION: &str = "eu-west-2";

/// Broker error codes that mean "you are not allowed", as opposed to "the
/// broker is broken".
const AUTHORIZATION_CODES: [&str; 5] = [
    "AccessDenied",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "UnrecognizedClientException",
];

const MISSING_IDENTITY: &str =
    "identity credentials not set (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)";

/// Long-lived key pair, used only to authenticate to the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityCredentials {
    access_key_id: String,
    secret_access_key: String,
}

impl IdentityCredentials {
    /// Wraps a key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Builds identity credentials from optional values, treating blank
    /// values as absent.
    ///
    /// # Errors
    /// `IngestError::Authorization` naming the missing values.
    pub fn from_parts(
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> Result<Self, IngestError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (present(access_key_id), present(secret_access_key)) {
            (Some(ak), Some(sk)) => Ok(Self::new(ak, sk)),
            (ak, sk) => {
                let mut missing = Vec::new();
                if ak.is_none() {
                    missing.push("AWS_ACCESS_KEY_ID");
                }
                if sk.is_none() {
                    missing.push("AWS_SECRET_ACCESS_KEY");
                }
                Err(IngestError::Authorization(format!(
                    "identity credentials not set ({})",
                    missing.join(", ")
                )))
            }
        }
    }

    /// The public half of the key pair.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }
}

impl fmt::Debug for IdentityCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// The role the broker is asked to assume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTarget {
    /// ARN of the restricted role.
    pub role_arn: String,
    /// Session name recorded by the broker.
    pub session_name: String,
    /// Region the broker and the store live in.
    pub region: String,
}

impl Default for RoleTarget {
    fn default() -> Self {
        Self {
            role_arn: DEFAULT_ROLE_ARN.to_string(),
            session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }
}

/// Short-lived, role-scoped credentials returned by the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    /// Temporary access key.
    pub access_key_id: String,
    /// Temporary secret key.
    pub secret_access_key: String,
    /// Session token binding the pair to the assumed role.
    pub session_token: String,
    /// When the broker says the credentials stop working.
    pub expiration: Option<SystemTime>,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Handle wrapping the temporary credentials for one run.
///
/// Not `Clone`: it is consumed when the store client is built, so a session
/// cannot leak into a second run.
#[derive(Debug)]
pub struct ScopedSession {
    credentials: TemporaryCredentials,
    region: String,
}

impl ScopedSession {
    /// Wraps temporary credentials for `region`.
    pub fn new(credentials: TemporaryCredentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// Region the session is pinned to.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// When the wrapped credentials expire, if known.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.credentials.expiration
    }

    /// The wrapped credentials as an SDK credentials provider.
    pub fn sdk_credentials(&self) -> Credentials {
        Credentials::new(
            self.credentials.access_key_id.clone(),
            self.credentials.secret_access_key.clone(),
            Some(self.credentials.session_token.clone()),
            self.credentials.expiration,
            "sts-assume-role",
        )
    }
}

/// Exchanges identity credentials for a scoped session.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Performs the exchange.
    ///
    /// # Errors
    /// `IngestError::Authorization` when identity is missing or refused,
    /// `IngestError::BrokerUnavailable` for anything else.
    async fn exchange(&self) -> Result<ScopedSession, IngestError>;
}

/// Maps a broker error code onto the ingestion taxonomy.
pub fn classify_broker_code(code: Option<&str>, detail: String) -> IngestError {
    match code {
        Some(c) if AUTHORIZATION_CODES.contains(&c) => {
            IngestError::Authorization(format!("{}: {}", c, detail))
        }
        _ => IngestError::BrokerUnavailable(detail),
    }
}

fn classify_assume_role_error(err: SdkError<AssumeRoleError>) -> IngestError {
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
    let detail = DisplayErrorContext(&err).to_string();
    classify_broker_code(code.as_deref(), detail)
}

/// # STS Broker
///
/// `CredentialBroker` backed by AWS STS `AssumeRole`.
#[derive(Debug)]
pub struct StsBroker {
    identity: Option<IdentityCredentials>,
    target: RoleTarget,
    endpoint: Option<String>,
    operation_timeout: Duration,
    logger: Arc<LoggerLocal>,
}

impl StsBroker {
    /// Creates a broker. A `None` identity makes every exchange fail with
    /// `IngestError::Authorization`.
    pub fn new(
        identity: Option<IdentityCredentials>,
        target: RoleTarget,
        operation_timeout: Duration,
        logger: Arc<LoggerLocal>,
    ) -> Self {
        Self {
            identity,
            target,
            endpoint: None,
            operation_timeout,
            logger,
        }
    }

    /// Sends broker calls to `endpoint` instead of the regional AWS endpoint.
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// The role this broker assumes.
    pub fn target(&self) -> &RoleTarget {
        &self.target
    }

    fn sts_client(&self, identity: &IdentityCredentials) -> aws_sdk_sts::Client {
        let long_lived = Credentials::new(
            identity.access_key_id.clone(),
            identity.secret_access_key.clone(),
            None,
            None,
            "identity",
        );

        let mut builder = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.target.region.clone()))
            .credentials_provider(long_lived)
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(self.operation_timeout)
                    .build(),
            );
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        aws_sdk_sts::Client::from_conf(builder.build())
    }
}

#[async_trait]
impl CredentialBroker for StsBroker {
    async fn exchange(&self) -> Result<ScopedSession, IngestError> {
        let identity = self.identity.as_ref().ok_or_else(|| {
            IngestError::Authorization(MISSING_IDENTITY.to_string())
        })?;

        self.logger
            .debug(
                "Assuming storage role",
                Some(json!({"role_arn": self.target.role_arn, "region": self.target.region})),
            )
            .await;

        let output = self
            .sts_client(identity)
            .assume_role()
            .role_arn(&self.target.role_arn)
            .role_session_name(&self.target.session_name)
            .send()
            .await
            .map_err(classify_assume_role_error)?;

        let issued = output
            .credentials()
            .ok_or_else(|| {
                IngestError::BrokerUnavailable("AssumeRole returned no credentials".to_string())
            })?;

        let temporary = TemporaryCredentials {
            access_key_id: issued.access_key_id().to_string(),
            secret_access_key: issued.secret_access_key().to_string(),
            session_token: issued.session_token().to_string(),
            expiration: SystemTime::try_from(*issued.expiration()).ok(),
        };

        self.logger
            .info(
                "Storage role assumed",
                Some(json!({
                    "role_arn": self.target.role_arn,
                    "expires_in_secs": temporary
                        .expiration
                        .and_then(|t| t.duration_since(SystemTime::now()).ok())
                        .map(|d| d.as_secs()),
                })),
            )
            .await;

        // The long-lived pair stops here; the session only sees the temporary one.
        Ok(ScopedSession::new(temporary, self.target.region.clone()))
    }
}
