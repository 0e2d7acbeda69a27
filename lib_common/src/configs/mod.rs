//! # Configuration Modules
//!
//! Layered configuration for the ingestion binary: built-in defaults, an
//! optional JSON file, then environment variables and CLI flags.

/// Configuration of the PokeAPI to S3 ingestion run.
pub mod config_etl;

pub use config_etl::{
    load_config, load_config_from, ConfigError, EtlConfig, LoadedConfig, ResolvedConfig,
};
