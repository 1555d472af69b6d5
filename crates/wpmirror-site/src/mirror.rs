//! Mirror engine of one route.
//!
//! [`Mirror`] resolves route-relative paths to pages and assets, fetches them
//! from the remote site on cache misses and keeps the results in its
//! [`CacheStore`] namespace.

use std::sync::Arc;

use serde_json::{Value, json};
use wpmirror_api::{ApiError, ContentApi};
use wpmirror_cache::CacheStore;

use crate::asset::{Asset, AssetRequest, RemotePaths};
use crate::rewrite::{AssetLog, RenderContext, RewriteError, RewrittenPage, rewrite_page};
use crate::route::{self, Target};
use crate::sitemap::{Sitemap, SitemapBuilder, SitemapError};

/// Cache key of the sitemap.
pub(crate) const SITEMAP_KEY: &str = "sitemap";

/// Remote entry point rendering a page by id.
const PAGE_PATH: &str = "/index.php";

/// Error returned when rendering fails.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Remote request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Sitemap could not be built.
    #[error(transparent)]
    Sitemap(#[from] SitemapError),
    /// Page markup could not be rewritten.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    /// Cached value could not be encoded.
    #[error("Cache encoding error: {0}")]
    Cache(#[from] serde_json::Error),
}

/// Configuration of a [`Mirror`].
#[derive(Clone, Debug)]
pub struct MirrorConfig {
    /// Route segment served by the mirror.
    pub route: String,
    /// Remote post type (REST collection).
    pub post_type: String,
    /// Publication statuses included in the sitemap.
    pub statuses: Vec<String>,
    /// URL prefix of the mirror (empty or `/...`).
    pub prefix: String,
    /// Remote site base URL.
    pub remote_url: String,
    /// Remote asset base paths.
    pub paths: RemotePaths,
}

impl MirrorConfig {
    /// Configuration for `post_type` served under a route of the same name.
    pub fn new(post_type: &str, remote_url: &str) -> Self {
        Self {
            route: post_type.to_owned(),
            post_type: post_type.to_owned(),
            statuses: vec!["publish".to_owned()],
            prefix: String::new(),
            remote_url: remote_url.to_owned(),
            paths: RemotePaths::default(),
        }
    }
}

/// A rendered page with what the host shell needs to wrap it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageView {
    /// Slug of the page.
    pub slug: String,
    /// Remote page id.
    pub page_id: u64,
    /// Resolved language.
    pub lang: String,
    /// Display title (rendered HTML).
    pub title: Option<String>,
    /// Rewritten document container.
    pub html: String,
    /// Scripts removed from the page.
    pub scripts: Vec<String>,
}

/// Outcome of [`Mirror::render`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    Page(PageView),
    Asset(Asset),
    NotFound,
}

impl Rendered {
    /// HTTP status of the outcome.
    pub fn status(&self) -> u16 {
        match self {
            Self::Page(_) | Self::Asset(_) => 200,
            Self::NotFound => 404,
        }
    }
}

/// Slug and title of a page, as listed by [`Mirror::pages`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSummary {
    /// Page slug.
    pub slug: String,
    /// Display title.
    pub title: String,
}

/// Caching mirror of one route.
///
/// Thread-safe: all request state is passed explicitly, so a mirror can be
/// shared behind an `Arc`.
pub struct Mirror {
    api: Arc<dyn ContentApi>,
    pub(crate) store: CacheStore,
    config: MirrorConfig,
}

impl Mirror {
    /// Create a mirror.
    pub fn new(api: Arc<dyn ContentApi>, store: CacheStore, mut config: MirrorConfig) -> Self {
        config.prefix = config.prefix.trim_end_matches('/').to_owned();
        config.remote_url = config.remote_url.trim_end_matches('/').to_owned();
        Self { api, store, config }
    }

    /// Route segment served by this mirror.
    pub fn route(&self) -> &str {
        &self.config.route
    }

    /// Remote post type of this mirror.
    pub fn post_type(&self) -> &str {
        &self.config.post_type
    }

    /// The cached sitemap, built on a miss.
    pub fn sitemap(&self) -> Result<Sitemap, RenderError> {
        self.store.load_or_compute_json(SITEMAP_KEY, || {
            let builder =
                SitemapBuilder::new(self.api.as_ref(), &self.config.post_type, &self.config.statuses);
            Ok(builder.build()?)
        })
    }

    /// Every page slug with its display title.
    pub fn pages(&self) -> Result<Vec<PageSummary>, RenderError> {
        let sitemap = self.sitemap()?;
        Ok(sitemap
            .translation
            .keys()
            .map(|slug| PageSummary {
                slug: slug.clone(),
                title: sitemap.title(slug).unwrap_or_default().to_owned(),
            })
            .collect())
    }

    /// Resolve a slug and a language hint to `(page id, language)`.
    pub fn resolve(&self, slug: &str, lang: Option<&str>) -> Result<Option<(u64, String)>, RenderError> {
        Ok(self.sitemap()?.resolve(slug, lang))
    }

    /// Render a route-relative path.
    ///
    /// Pages resolve `lang` with English fallback. Asset paths are served from
    /// the cache or fetched; rejected or failing assets are not found.
    ///
    /// # Errors
    ///
    /// Returns the remote, sitemap or rewrite error of a page render.
    pub fn render(&self, path: &str, lang: Option<&str>) -> Result<Rendered, RenderError> {
        match route::parse(path, &self.config.route) {
            None => Ok(Rendered::NotFound),
            Some(Target::Page(slug)) => self.render_page(slug, lang),
            Some(Target::Asset { kind, path }) => Ok(self
                .asset(kind, path)
                .map_or(Rendered::NotFound, Rendered::Asset)),
        }
    }

    fn render_page(&self, slug: &str, lang: Option<&str>) -> Result<Rendered, RenderError> {
        let sitemap = self.sitemap()?;
        let Some((page_id, lang)) = sitemap.resolve(slug, lang) else {
            tracing::debug!(route = %self.config.route, slug, "Page not found");
            return Ok(Rendered::NotFound);
        };

        let page = self.load_page(page_id, &lang, &sitemap, &mut AssetLog::new())?;
        Ok(Rendered::Page(PageView {
            slug: slug.to_owned(),
            page_id,
            title: sitemap.title(slug).map(str::to_owned),
            lang,
            html: page.html,
            scripts: page.scripts,
        }))
    }

    /// Rewritten page `page_id` in `lang`, from the cache or fetched.
    pub fn page(&self, page_id: u64, lang: &str) -> Result<RewrittenPage, RenderError> {
        let sitemap = self.sitemap()?;
        self.load_page(page_id, lang, &sitemap, &mut AssetLog::new())
    }

    pub(crate) fn load_page(
        &self,
        page_id: u64,
        lang: &str,
        sitemap: &Sitemap,
        log: &mut AssetLog,
    ) -> Result<RewrittenPage, RenderError> {
        self.store
            .load_or_compute_json(&page_key(page_id), || {
                self.fetch_page(page_id, lang, sitemap, log)
            })
    }

    fn fetch_page(
        &self,
        page_id: u64,
        lang: &str,
        sitemap: &Sitemap,
        log: &mut AssetLog,
    ) -> Result<RewrittenPage, RenderError> {
        let id = page_id.to_string();
        let markup = self.api.get_content(PAGE_PATH, &[("page_id", id.as_str())])?;
        let markup = String::from_utf8_lossy(&markup);

        let ctx = RenderContext {
            sitemap,
            lang,
            route: &self.config.route,
            prefix: &self.config.prefix,
            remote_url: &self.config.remote_url,
            paths: &self.config.paths,
        };
        let page = rewrite_page(&markup, &ctx, log)?;
        tracing::info!(route = %self.config.route, page_id, lang, "Rewrote page");
        Ok(page)
    }

    /// Serve an asset: validate, then return cached or freshly fetched bytes.
    ///
    /// Rejected paths and fetch failures yield `None`.
    pub fn asset(&self, kind: &str, rel_path: &str) -> Option<Asset> {
        let request = AssetRequest::new(kind, rel_path, &self.config.paths)?;
        match self.load_asset(&request) {
            Ok(bytes) => Some(Asset {
                content_type: request.content_type,
                bytes,
            }),
            Err(e) => {
                tracing::warn!(path = %request.remote_path, error = %e, "Asset fetch failed");
                None
            }
        }
    }

    /// Populate the cache for a logical asset path (`<route>/<kind>/<rel>`).
    ///
    /// Returns `false` if the path is not a valid asset of this route.
    pub fn warm_asset(&self, path: &str) -> Result<bool, RenderError> {
        let Some(Target::Asset { kind, path }) = route::parse(path, &self.config.route) else {
            return Ok(false);
        };
        let Some(request) = AssetRequest::new(kind, path, &self.config.paths) else {
            return Ok(false);
        };
        self.load_asset(&request)?;
        Ok(true)
    }

    fn load_asset(&self, request: &AssetRequest) -> Result<Vec<u8>, ApiError> {
        self.store.load_or_compute(&request.cache_key(), || {
            self.api.get_content(&request.remote_path, &[])
        })
    }

    /// Evict every cache entry of this mirror.
    pub fn clean_cache(&self) {
        tracing::info!(route = %self.config.route, "Cleaning cache");
        self.store.clean_all();
    }

    /// Editable REST record of a page (`context=edit`).
    pub fn page_metadata(&self, page_id: u64) -> Result<Value, RenderError> {
        let path = self.record_path(page_id)?;
        Ok(self.api.get_json(&path, &[("context", "edit")])?)
    }

    /// Update the REST record of a page.
    pub fn update_metadata(&self, page_id: u64, data: &Value) -> Result<Value, RenderError> {
        let path = self.record_path(page_id)?;
        Ok(self.api.post_json(&path, &[], data)?)
    }

    /// Update the custom fields of an item.
    pub fn update_fields(&self, page_id: u64, fields: &Value) -> Result<Value, RenderError> {
        let path = format!("/wp-json/acf/v3/{}/{}", self.config.post_type, page_id);
        Ok(self.api.post_json(&path, &[], &json!({ "fields": fields }))?)
    }

    /// REST record path; index pages live in the `pages` collection.
    fn record_path(&self, page_id: u64) -> Result<String, RenderError> {
        let sitemap = self.sitemap()?;
        let collection = if sitemap.is_index_page(page_id) {
            "pages"
        } else {
            self.config.post_type.as_str()
        };
        Ok(format!("/wp-json/wp/v2/{collection}/{page_id}"))
    }
}

/// Cache key of a rewritten page.
pub(crate) fn page_key(page_id: u64) -> String {
    format!("page-{page_id}")
}
