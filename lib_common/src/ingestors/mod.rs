//! # Data Ingestors Module
//!
//! Ingestors tie a data source to a sink. Each submodule owns one workflow
//! end to end: credentials, reading prior state, fetching, shaping and
//! committing.
//!
//! ## Contained Modules:
//! - **`pokemon_s3`**: One-record-per-run ingestion of PokeAPI records into
//!   an S3 bucket, sequenced as `Authorize → Scan → Fetch → Project → Persist`.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The PokeAPI to S3 incremental ingestion cycle.
pub mod pokemon_s3;

pub use pokemon_s3::{IngestReport, PokemonS3Ingestor, Stage, StageFailure};
