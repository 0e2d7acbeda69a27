//! # lib_common
//!
//! Shared building blocks for the PokeAPI to S3 ingestion workflow. Each
//! folder is gated behind a cargo feature of the same name so that small
//! binaries only pull in what they use.

#![forbid(unsafe_code)]

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "catalog")]
pub mod errors;
#[cfg(feature = "catalog")]
pub mod catalog;
#[cfg(feature = "storage")]
pub mod storage;
#[cfg(feature = "ingestors")]
pub mod ingestors;

// Re-export the types most callers reach for.
#[cfg(feature = "catalog")]
pub use errors::{IngestError, ScanError};
#[cfg(feature = "loggers")]
pub use loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
