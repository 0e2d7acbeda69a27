//! # Storage Module
//!
//! Authorization and object storage for the ingestion cycle.
//!
//! ## Contained Modules:
//!
//! - **`broker`**: STS `AssumeRole` exchange producing a `ScopedSession`.
//! - **`s3`**: The `ObjectStore` seam and its S3 implementation.
//! - **`inventory`**: Key parsing and the numeric maximum identifier.
//! - **`writer`**: Serialization and the unconditional put.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Credential broker client and the scoped session it produces.
pub mod broker;
/// Bucket inventory scanning.
pub mod inventory;
/// Object store seam and S3 client.
pub mod s3;
/// Record commit.
pub mod writer;

/// Bucket every record is written to.
pub const DEFAULT_BUCKET: &str = "pokemon-api-json";

pub use broker::{
    CredentialBroker, IdentityCredentials, RoleTarget, ScopedSession, StsBroker,
    TemporaryCredentials,
};
pub use inventory::{max_identifier, scan_last_identifier, StoredObjectKey};
pub use s3::{ObjectStore, S3Connector, S3ObjectStore, StoreConnector};
pub use writer::{commit_record, CommittedObject};
