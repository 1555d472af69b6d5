//! Mirror engine for wpmirror.
//!
//! This crate provides:
//! - [`Sitemap`] / [`SitemapBuilder`]: slug, translation and link maps of a route
//! - [`rewrite_page`]: the markup pipeline pointing links and assets at the mirror
//! - [`AssetRequest`]: validation and mapping of proxied assets
//! - [`Mirror`]: rendering, caching, warming and invalidation of one route
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use wpmirror_api::{ClientConfig, WpClient};
//! use wpmirror_cache::{Cache, CacheStore, MemoryCache};
//! use wpmirror_site::{Mirror, MirrorConfig, Rendered};
//!
//! let api = Arc::new(WpClient::new(ClientConfig {
//!     base_url: "https://cms.example.org".to_owned(),
//!     ..ClientConfig::default()
//! }));
//! let store = CacheStore::new(MemoryCache::new().bucket("indicators"), None);
//! let mirror = Mirror::new(api, store, MirrorConfig::new("indicators", "https://cms.example.org"));
//!
//! if let Rendered::Page(page) = mirror.render("indicators/gdp", Some("fr"))? {
//!     println!("{}", page.html);
//! }
//! # Ok(())
//! # }
//! ```

mod asset;
mod mirror;
mod rewrite;
mod route;
mod sitemap;
mod warm;

pub use asset::{Asset, AssetKind, AssetRequest, RemotePaths, content_type_for};
pub use mirror::{Mirror, MirrorConfig, PageSummary, PageView, RenderError, Rendered};
pub use rewrite::{AssetLog, RenderContext, RewriteError, RewrittenPage, rewrite_page};
pub use sitemap::{DEFAULT_LANG, INDEX_SLUG, Sitemap, SitemapBuilder, SitemapError, derive_slug};
pub use warm::{Progress, WarmSummary};
