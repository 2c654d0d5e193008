//! Server access.
//!
//! - [`client`]: the [`ApiClient`] seam every component talks to
//! - [`http`]: the reqwest-backed implementation

pub mod client;
pub mod http;

pub use client::ApiClient;
pub use http::HttpApiClient;
