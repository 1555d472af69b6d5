//! Page markup rewriting.
//!
//! Remote pages are parsed into a DOM tree, cleaned up, their internal links
//! and asset references pointed at the mirror, and the document container
//! serialized back. Asset references found along the way are recorded in an
//! [`AssetLog`] so cache warming can prefetch them.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use kuchikiki::traits::TendrilSink;
use kuchikiki::{ElementData, NodeDataRef, NodeRef};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetKind, RemotePaths};
use crate::sitemap::Sitemap;

static NAV_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bnav-link\b").unwrap());
static ACTIVE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bactive\b").unwrap());
static MSO_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bMso\w*").unwrap());

/// Container of the page content inside the remote theme.
const DOCUMENT_SELECTOR: &str = r#"html > body > div[role="document"]"#;

/// Error raised while rewriting a page.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// The markup has no document container.
    #[error("Page has no document container")]
    MissingDocument,
    /// An image refers to a location outside the known asset bases.
    #[error("Unrecognized asset URL: {0}")]
    UnknownAssetUrl(String),
    /// A CSS selector failed to compile.
    #[error("Invalid selector: {0}")]
    Selector(&'static str),
}

/// Request-scoped inputs of a rewrite.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    /// Sitemap of the route.
    pub sitemap: &'a Sitemap,
    /// Language of the page being rewritten, used for internal links.
    pub lang: &'a str,
    /// Route segment.
    pub route: &'a str,
    /// URL prefix of the mirror (empty or `/...`).
    pub prefix: &'a str,
    /// Remote site base URL, without trailing slash.
    pub remote_url: &'a str,
    /// Remote asset base paths.
    pub paths: &'a RemotePaths,
}

/// Logical asset paths (`<route>/<kind>/<relPath>`) referenced by rewritten pages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetLog {
    paths: BTreeSet<String>,
}

impl AssetLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path and hand it back.
    pub fn record(&mut self, path: String) -> String {
        self.paths.insert(path.clone());
        path
    }

    /// Whether `path` was recorded.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Number of distinct recorded paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Recorded paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Rewritten document container and the scripts removed from the page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenPage {
    /// Serialized `div[role="document"]`.
    pub html: String,
    /// `src` of every removed `<script>`, in document order.
    pub scripts: Vec<String>,
}

/// Rewrite remote page markup for the mirror.
///
/// # Errors
///
/// Fails if the document container is missing, or an image refers to a
/// location outside the known asset bases.
pub fn rewrite_page(
    markup: &str,
    ctx: &RenderContext<'_>,
    log: &mut AssetLog,
) -> Result<RewrittenPage, RewriteError> {
    let document = kuchikiki::parse_html().one(markup);

    remove_noise(&document)?;
    let scripts = extract_scripts(&document)?;
    move_active_nav_class(&document)?;
    rewrite_links(&document, ctx, log)?;
    rewrite_images(&document, ctx, log)?;
    strip_office_classes(&document)?;
    for table in select_all(&document, "table, td")? {
        table.attributes.borrow_mut().remove("width");
    }

    let container = document
        .select_first(DOCUMENT_SELECTOR)
        .map_err(|()| RewriteError::MissingDocument)?;

    Ok(RewrittenPage {
        html: container.as_node().to_string(),
        scripts,
    })
}

fn select_all(
    node: &NodeRef,
    selector: &'static str,
) -> Result<Vec<NodeDataRef<ElementData>>, RewriteError> {
    Ok(node
        .select(selector)
        .map_err(|()| RewriteError::Selector(selector))?
        .collect())
}

/// Drop comments and editor bookmark spans.
fn remove_noise(document: &NodeRef) -> Result<(), RewriteError> {
    let comments: Vec<NodeRef> = document
        .descendants()
        .filter(|node| node.as_comment().is_some())
        .collect();
    for comment in comments {
        comment.detach();
    }
    for span in select_all(document, r#"span[data-mce-type="bookmark"]"#)? {
        span.as_node().detach();
    }
    Ok(())
}

/// Remove external scripts, returning their sources.
fn extract_scripts(document: &NodeRef) -> Result<Vec<String>, RewriteError> {
    let mut scripts = Vec::new();
    for script in select_all(document, "script[src]")? {
        if let Some(src) = script.attributes.borrow().get("src") {
            scripts.push(src.to_owned());
        }
        script.as_node().detach();
    }
    Ok(scripts)
}

/// Move the `active` class of navigation links to their list item.
fn move_active_nav_class(document: &NodeRef) -> Result<(), RewriteError> {
    for anchor in select_all(document, "li > a")? {
        let mut attributes = anchor.attributes.borrow_mut();
        let Some(class) = attributes.get("class") else {
            continue;
        };
        if !NAV_LINK_RE.is_match(class) || !ACTIVE_RE.is_match(class) {
            continue;
        }
        let class = ACTIVE_RE.replace_all(class, "").trim().to_owned();
        attributes.insert("class", class);

        let Some(parent) = anchor.as_node().parent() else {
            continue;
        };
        let Some(item) = parent.as_element() else {
            continue;
        };
        let mut item_attributes = item.attributes.borrow_mut();
        let item_class = match item_attributes.get("class") {
            Some(class) if !class.trim().is_empty() => format!("{} active", class.trim()),
            _ => "active".to_owned(),
        };
        item_attributes.insert("class", item_class);
    }
    Ok(())
}

fn rewrite_links(
    document: &NodeRef,
    ctx: &RenderContext<'_>,
    log: &mut AssetLog,
) -> Result<(), RewriteError> {
    for anchor in select_all(document, "a[href]")? {
        let mut attributes = anchor.attributes.borrow_mut();
        let Some(href) = attributes.get("href") else {
            continue;
        };
        let href = strip_remote(href, ctx.remote_url);
        if !href.starts_with('/') {
            continue;
        }
        let converted = convert_href(href, ctx, log);
        attributes.insert("href", converted);
    }
    Ok(())
}

fn rewrite_images(
    document: &NodeRef,
    ctx: &RenderContext<'_>,
    log: &mut AssetLog,
) -> Result<(), RewriteError> {
    for image in select_all(document, "img")? {
        let mut attributes = image.attributes.borrow_mut();
        if let Some(src) = attributes.get("src") {
            let converted = convert_src(src, ctx, log)?;
            attributes.insert("src", converted);
        }
        if let Some(srcset) = attributes.get("srcset") {
            let converted = convert_srcset(srcset, ctx, log)?;
            attributes.insert("srcset", converted);
        }
    }
    Ok(())
}

/// Remove `Mso*` classes pasted from office documents.
fn strip_office_classes(document: &NodeRef) -> Result<(), RewriteError> {
    for element in select_all(document, "p, li, table")? {
        let mut attributes = element.attributes.borrow_mut();
        let Some(class) = attributes.get("class") else {
            continue;
        };
        if !MSO_CLASS_RE.is_match(class) {
            continue;
        }
        let class = MSO_CLASS_RE.replace_all(class, "").trim().to_owned();
        if class.is_empty() {
            attributes.remove("class");
        } else {
            attributes.insert("class", class);
        }
    }
    Ok(())
}

fn strip_remote<'a>(url: &'a str, remote_url: &str) -> &'a str {
    if remote_url.is_empty() {
        return url;
    }
    url.strip_prefix(remote_url).unwrap_or(url)
}

/// Mirror URL of a site-relative link.
///
/// Registered links point at the mirrored page in the current language,
/// downloads at the asset proxy. Anything else is dropped.
fn convert_href(href: &str, ctx: &RenderContext<'_>, log: &mut AssetLog) -> String {
    if let Some(slug) = ctx.sitemap.slug_for_link(href) {
        return format!("{}/{}/{}?lg={}", ctx.prefix, ctx.route, slug, ctx.lang);
    }
    if let Some(rest) = href.strip_prefix(ctx.paths.downloads.as_str()) {
        return asset_url(AssetKind::Downloads, rest, ctx, log);
    }
    tracing::debug!(href, "Dropping unknown link");
    String::new()
}

/// Mirror URL of an image or stylesheet reference.
fn convert_src(
    src: &str,
    ctx: &RenderContext<'_>,
    log: &mut AssetLog,
) -> Result<String, RewriteError> {
    let src = strip_remote(src, ctx.remote_url);
    for kind in [AssetKind::Images, AssetKind::Styles, AssetKind::Downloads] {
        if let Some(rest) = src.strip_prefix(kind.base_path(ctx.paths)) {
            return Ok(asset_url(kind, rest, ctx, log));
        }
    }
    Err(RewriteError::UnknownAssetUrl(src.to_owned()))
}

/// Rewrite the URL of every `url descriptor` candidate, keeping spacing.
fn convert_srcset(
    srcset: &str,
    ctx: &RenderContext<'_>,
    log: &mut AssetLog,
) -> Result<String, RewriteError> {
    let mut candidates = Vec::new();
    for candidate in srcset.split(',') {
        let mut terms: Vec<String> = candidate.split(' ').map(str::to_owned).collect();
        if let Some(url) = terms.iter_mut().find(|term| !term.is_empty()) {
            *url = convert_src(url, ctx, log)?;
        }
        candidates.push(terms.join(" "));
    }
    Ok(candidates.join(","))
}

fn asset_url(kind: AssetKind, rest: &str, ctx: &RenderContext<'_>, log: &mut AssetLog) -> String {
    let logical = log.record(format!("{}/{}/{}", ctx.route, kind.segment(), rest));
    format!("{}/{}", ctx.prefix, logical)
}
