//! # Catalog Module
//!
//! Everything that talks to the external record catalog (PokeAPI) or shapes
//! what comes back from it.
//!
//! ## Contained Modules:
//!
//! - **`pokeapi`**: The `CatalogSource` seam and its PokeAPI implementation.
//!   Fetches one record by identifier and classifies every failure.
//! - **`record`**: The `ProjectedRecord` persisted to storage and the pure
//!   projection from a full catalog record.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// PokeAPI client and the catalog seam used by the orchestrator.
pub mod pokeapi;
/// The persisted record shape and its projection.
pub mod record;

pub use pokeapi::{fetch_next, next_identifier, CatalogSource, PokeApiFetcher};
pub use record::{project, project_requested, ProjectedRecord};
