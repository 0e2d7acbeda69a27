use crate::catalog::pokeapi::DEFAULT_CATALOG_URL;
use crate::errors::IngestError;
use crate::storage::broker::{
    IdentityCredentials, RoleTarget, DEFAULT_REGION, DEFAULT_ROLE_ARN, DEFAULT_ROLE_SESSION_NAME,
};
use crate::storage::DEFAULT_BUCKET;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "pokemon_s3_etl.conf";
/// Catalog fetch bound.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 1000;
/// Bound for each broker and storage call.
pub const DEFAULT_AWS_TIMEOUT_MS: u64 = 30_000;

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The command line could not be parsed.
    #[error("Invalid arguments: {0}")]
    Args(#[from] clap::Error),

    /// A value is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Ingest the next PokeAPI record into S3", version)]
#[serde(rename_all = "camelCase")]
pub struct EtlConfig {
    #[clap(long, env = "ETL_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(
        long,
        env = "AWS_ACCESS_KEY_ID",
        hide_env_values = true,
        help = "Long-lived access key used only for the role exchange."
    )]
    pub access_key_id: Option<String>,

    #[clap(
        long,
        env = "AWS_SECRET_ACCESS_KEY",
        hide_env_values = true,
        help = "Long-lived secret key used only for the role exchange."
    )]
    pub secret_access_key: Option<String>,

    #[clap(long, env = "ETL_ROLE_ARN", help = "Role assumed for bucket access.")]
    pub role_arn: Option<String>,

    #[clap(long, env = "ETL_ROLE_SESSION_NAME", help = "Session name reported to the broker.")]
    pub role_session_name: Option<String>,

    #[clap(long, env = "ETL_REGION", help = "Region of the broker and the bucket.")]
    pub region: Option<String>,

    #[clap(long, env = "ETL_BUCKET", help = "Bucket records are written to.")]
    pub bucket: Option<String>,

    #[clap(long, env = "ETL_BROKER_ENDPOINT", help = "Override the STS endpoint URL.")]
    pub broker_endpoint: Option<String>,

    #[clap(
        long,
        env = "ETL_STORAGE_ENDPOINT",
        help = "Override the S3 endpoint URL (path-style addressing)."
    )]
    pub storage_endpoint: Option<String>,

    #[clap(long, env = "ETL_CATALOG_URL", help = "Base URL of the catalog API.")]
    pub catalog_url: Option<String>,

    #[clap(
        long,
        env = "ETL_FETCH_TIMEOUT_MS",
        help = "Connect and read bound for the catalog fetch, in milliseconds."
    )]
    pub fetch_timeout_ms: Option<u64>,

    #[clap(
        long,
        env = "ETL_AWS_TIMEOUT_MS",
        help = "Bound for each broker and storage call, in milliseconds."
    )]
    pub aws_timeout_ms: Option<u64>,

    #[clap(long, env = "ETL_LOG_DIR", help = "Directory for log files. Console only when unset.")]
    pub log_dir: Option<PathBuf>,

    #[clap(
        long,
        env = "ETL_LOG_LEVEL",
        help = "Logging level (silly, trace, debug, info, warn, error, fatal)."
    )]
    pub log_level: Option<String>,
}

impl EtlConfig {
    /// Built-in defaults.
    pub fn defaults() -> Self {
        Self {
            role_arn: Some(DEFAULT_ROLE_ARN.to_string()),
            role_session_name: Some(DEFAULT_ROLE_SESSION_NAME.to_string()),
            region: Some(DEFAULT_REGION.to_string()),
            bucket: Some(DEFAULT_BUCKET.to_string()),
            catalog_url: Some(DEFAULT_CATALOG_URL.to_string()),
            fetch_timeout_ms: Some(DEFAULT_FETCH_TIMEOUT_MS),
            aws_timeout_ms: Some(DEFAULT_AWS_TIMEOUT_MS),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    // Merge two configs, where 'other' overrides 'self' for Some values
    fn merge(self, other: EtlConfig) -> EtlConfig {
        EtlConfig {
            config_path: other.config_path.or(self.config_path),
            access_key_id: other.access_key_id.or(self.access_key_id),
            secret_access_key: other.secret_access_key.or(self.secret_access_key),
            role_arn: other.role_arn.or(self.role_arn),
            role_session_name: other.role_session_name.or(self.role_session_name),
            region: other.region.or(self.region),
            bucket: other.bucket.or(self.bucket),
            broker_endpoint: other.broker_endpoint.or(self.broker_endpoint),
            storage_endpoint: other.storage_endpoint.or(self.storage_endpoint),
            catalog_url: other.catalog_url.or(self.catalog_url),
            fetch_timeout_ms: other.fetch_timeout_ms.or(self.fetch_timeout_ms),
            aws_timeout_ms: other.aws_timeout_ms.or(self.aws_timeout_ms),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    /// Turns the merged layers into concrete values.
    ///
    /// # Errors
    /// `ConfigError::Invalid` for zero timeouts or blank required values.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let d = EtlConfig::defaults();
        let required = |value: Option<String>,
                        fallback: Option<String>,
                        name: &str|
         -> Result<String, ConfigError> {
            let v = value.or(fallback).unwrap_or_default();
            if v.trim().is_empty() {
                Err(ConfigError::Invalid(format!("{} must not be empty", name)))
            } else {
                Ok(v)
            }
        };
        let millis = |value: Option<u64>,
                      fallback: Option<u64>,
                      name: &str|
         -> Result<Duration, ConfigError> {
            match value.or(fallback) {
                Some(0) | None => Err(ConfigError::Invalid(format!(
                    "{} must be greater than zero",
                    name
                ))),
                Some(ms) => Ok(Duration::from_millis(ms)),
            }
        };

        Ok(ResolvedConfig {
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            role_arn: required(self.role_arn, d.role_arn, "role_arn")?,
            role_session_name: required(
                self.role_session_name,
                d.role_session_name,
                "role_session_name",
            )?,
            region: required(self.region, d.region, "region")?,
            bucket: required(self.bucket, d.bucket, "bucket")?,
            broker_endpoint: self.broker_endpoint.filter(|s| !s.trim().is_empty()),
            storage_endpoint: self.storage_endpoint.filter(|s| !s.trim().is_empty()),
            catalog_url: required(self.catalog_url, d.catalog_url, "catalog_url")?,
            fetch_timeout: millis(self.fetch_timeout_ms, d.fetch_timeout_ms, "fetch_timeout_ms")?,
            aws_timeout: millis(self.aws_timeout_ms, d.aws_timeout_ms, "aws_timeout_ms")?,
            log_dir: self.log_dir,
            log_level: required(self.log_level, d.log_level, "log_level")?,
        })
    }
}

/// Concrete settings for one run.
#[derive(Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Long-lived access key, if provided.
    pub access_key_id: Option<String>,
    /// Long-lived secret key, if provided.
    pub secret_access_key: Option<String>,
    /// Role assumed for bucket access.
    pub role_arn: String,
    /// Session name reported to the broker.
    pub role_session_name: String,
    /// Region of broker and bucket.
    pub region: String,
    /// Target bucket.
    pub bucket: String,
    /// STS endpoint override.
    pub broker_endpoint: Option<String>,
    /// S3 endpoint override.
    pub storage_endpoint: Option<String>,
    /// Catalog base URL.
    pub catalog_url: String,
    /// Catalog fetch bound.
    pub fetch_timeout: Duration,
    /// Broker and storage call bound.
    pub aws_timeout: Duration,
    /// Log file directory.
    pub log_dir: Option<PathBuf>,
    /// Minimum log level name.
    pub log_level: String,
}

impl ResolvedConfig {
    /// The identity credentials, or the `AuthorizationError` their absence causes.
    pub fn identity(&self) -> Result<IdentityCredentials, IngestError> {
        IdentityCredentials::from_parts(self.access_key_id.clone(), self.secret_access_key.clone())
    }

    /// The role the broker should assume.
    pub fn role_target(&self) -> RoleTarget {
        RoleTarget {
            role_arn: self.role_arn.clone(),
            session_name: self.role_session_name.clone(),
            region: self.region.clone(),
        }
    }
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "** redacted **"))
            .field("role_arn", &self.role_arn)
            .field("role_session_name", &self.role_session_name)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("broker_endpoint", &self.broker_endpoint)
            .field("storage_endpoint", &self.storage_endpoint)
            .field("catalog_url", &self.catalog_url)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("aws_timeout", &self.aws_timeout)
            .field("log_dir", &self.log_dir)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// The resolved configuration plus notes about layers that were skipped.
///
/// Logging is not set up yet while loading, so the notes are handed back
/// for the caller to log once it is.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Settings for the run.
    pub config: ResolvedConfig,
    /// Human-readable remarks about the config file.
    pub notes: Vec<String>,
}

/// Loads `.env`, parses the process arguments and resolves the layers.
///
/// Exits the process on `--help`, `--version` or invalid arguments.
pub fn load_config() -> Result<LoadedConfig, ConfigError> {
    let _ = dotenvy::dotenv();
    layer(EtlConfig::parse())
}

/// Same as `load_config` for an explicit argument list, without touching `.env`.
pub fn load_config_from<I, T>(args: I) -> Result<LoadedConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    layer(EtlConfig::try_parse_from(args)?)
}

fn layer(cli: EtlConfig) -> Result<LoadedConfig, ConfigError> {
    let mut notes = Vec::new();
    let mut current = EtlConfig::defaults();

    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<EtlConfig>(&config_str) {
                Ok(file_config) => current = current.merge(file_config),
                Err(e) => notes.push(format!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                )),
            },
            Err(e) => notes.push(format!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                config_file_path.display(),
                e
            )),
        }
    } else {
        notes.push(format!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            config_file_path.display()
        ));
    }

    current = current.merge(cli);

    Ok(LoadedConfig {
        config: current.resolve()?,
        notes,
    })
}
