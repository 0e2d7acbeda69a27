//! # Data Retrieval Module
//!
//! Generic HTTP clients used by the catalog fetchers. The client here owns the
//! concerns every fetcher shares: URL joining, header injection, bounded
//! timeouts and turning transport failures into typed errors. Fetchers on top
//! of it only decide what a given status code means for their API.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest`, with a
//!   connect timeout and a total request timeout. It never retries; callers
//!   see the first failure.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with bounded timeouts and classified errors.
pub mod ky_http;
