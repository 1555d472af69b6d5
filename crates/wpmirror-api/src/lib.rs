//! Remote content API for wpmirror.
//!
//! The mirror engine talks to the remote WordPress site only through the
//! [`ContentApi`] trait:
//!
//! - [`ContentApi::list_json`]: paginated REST collection queries
//! - [`ContentApi::get_json`] / [`ContentApi::post_json`]: single REST requests
//! - [`ContentApi::get_content`]: raw page markup and asset bytes
//!
//! [`WpClient`] implements it over HTTP with `ureq`. With the `mock` feature,
//! [`MockApi`] serves canned responses for tests.

mod client;
mod error;
#[cfg(feature = "mock")]
mod mock;
mod types;

pub use client::{ClientConfig, WpClient};
pub use error::ApiError;
#[cfg(feature = "mock")]
pub use mock::MockApi;
pub use types::{ContainerPage, PostLink, PostSummary, Rendered, Translations};

use serde_json::Value;

/// Query string pairs of a request.
pub type Query<'a> = [(&'a str, &'a str)];

/// Remote content API consumed by the mirror engine.
pub trait ContentApi: Send + Sync {
    /// Fetch every record of a REST collection.
    ///
    /// Implementations paginate transparently in ascending id order and return
    /// the concatenation of all pages.
    fn list_json(&self, path: &str, query: &Query<'_>) -> Result<Vec<Value>, ApiError>;

    /// Fetch a single REST resource.
    fn get_json(&self, path: &str, query: &Query<'_>) -> Result<Value, ApiError>;

    /// Send a JSON body to a REST resource and decode the answer.
    fn post_json(&self, path: &str, query: &Query<'_>, body: &Value) -> Result<Value, ApiError>;

    /// Fetch raw content (rendered page markup or a static asset).
    fn get_content(&self, path: &str, query: &Query<'_>) -> Result<Vec<u8>, ApiError>;
}
