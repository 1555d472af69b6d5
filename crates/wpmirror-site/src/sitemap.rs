//! Sitemap of a route: slugs, translations, titles and canonical links.
//!
//! The sitemap is built from three REST queries against the remote site and
//! cached as a whole under the `sitemap` key.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use wpmirror_api::{ApiError, ContainerPage, ContentApi, PostLink, PostSummary, Translations};

/// Slug of the route's index page.
pub const INDEX_SLUG: &str = "index.html";

/// Language used when a requested translation does not exist.
pub const DEFAULT_LANG: &str = "en";

/// Fallback slug when neither remote slug nor title yield one.
const UNNAMED_SLUG: &str = "unnamed";

/// Remote slugs of English items carry this prefix.
const ENGLISH_SLUG_PREFIX: &str = "en-";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static NON_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Error raised while building a sitemap.
#[derive(Debug, thiserror::Error)]
pub enum SitemapError {
    /// Remote query failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Two items share the same canonical link.
    #[error("Duplicate link {link} for item {id}")]
    DuplicateLink {
        /// Id of the second item claiming the link.
        id: u64,
        /// Canonical link path.
        link: String,
    },
    /// A record did not match the requested fields.
    #[error("Malformed record from {path}: {source}")]
    MalformedRecord {
        /// Collection path.
        path: String,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// A canonical link is not an absolute URL.
    #[error("Invalid link {link} for item {id}: {source}")]
    InvalidLink {
        /// Item id.
        id: u64,
        /// Link as returned by the API.
        link: String,
        /// Parse error.
        #[source]
        source: url::ParseError,
    },
}

/// Slug, translation and link maps of a route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitemap {
    /// Slug -> language -> remote page id.
    pub translation: BTreeMap<String, Translations>,
    /// Slug -> display title (rendered HTML).
    pub title: BTreeMap<String, String>,
    /// Canonical remote path (with query) -> slug.
    pub link: BTreeMap<String, String>,
}

impl Sitemap {
    /// Resolve a slug and a language hint to `(page id, language)`.
    ///
    /// The hint is used when the slug has a translation in that language,
    /// otherwise the English translation is chosen.
    pub fn resolve(&self, slug: &str, lang: Option<&str>) -> Option<(u64, String)> {
        let translations = self.translation.get(slug)?;
        let lang = lang
            .filter(|lang| translations.contains_key(*lang))
            .unwrap_or(DEFAULT_LANG);
        translations
            .get(lang)
            .map(|&id| (id, lang.to_owned()))
    }

    /// Display title of a slug.
    pub fn title(&self, slug: &str) -> Option<&str> {
        self.title.get(slug).map(String::as_str)
    }

    /// Slug registered for a canonical remote path.
    pub fn slug_for_link(&self, path: &str) -> Option<&str> {
        self.link.get(path).map(String::as_str)
    }

    /// Whether `id` is one of the index page's translations.
    pub fn is_index_page(&self, id: u64) -> bool {
        self.translation
            .get(INDEX_SLUG)
            .is_some_and(|translations| translations.values().any(|&page| page == id))
    }
}

/// Builds a [`Sitemap`] for one post type.
pub struct SitemapBuilder<'a> {
    api: &'a dyn ContentApi,
    post_type: &'a str,
    status: String,
}

impl<'a> SitemapBuilder<'a> {
    /// Create a builder for `post_type`, restricted to the given statuses.
    pub fn new(api: &'a dyn ContentApi, post_type: &'a str, statuses: &[String]) -> Self {
        Self {
            api,
            post_type,
            status: statuses.join(","),
        }
    }

    /// Query the remote site and assemble the sitemap.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError::DuplicateLink`] if two items resolve to the same
    /// canonical path, or the underlying API or decoding error.
    pub fn build(&self) -> Result<Sitemap, SitemapError> {
        tracing::info!(post_type = self.post_type, "Building sitemap");

        let mut sitemap = Sitemap::default();
        let collection = format!("/wp-json/wp/v2/{}", self.post_type);

        let containers: Vec<ContainerPage> = self.query(
            "/wp-json/wp/v2/pages",
            &[
                ("slug", self.post_type),
                ("parent", "0"),
                ("lang", DEFAULT_LANG),
                ("status", self.status.as_str()),
                ("_fields", "id,translations,title"),
            ],
        )?;
        for page in containers {
            sitemap
                .translation
                .insert(INDEX_SLUG.to_owned(), page.translations);
            sitemap
                .title
                .insert(INDEX_SLUG.to_owned(), page.title.rendered);
        }

        let posts: Vec<PostSummary> = self.query(
            &collection,
            &[
                ("lang", DEFAULT_LANG),
                ("status", self.status.as_str()),
                ("_fields", "slug,translations,title"),
            ],
        )?;
        let mut slugs: HashMap<u64, String> = HashMap::new();
        for post in posts {
            let slug = derive_slug(&post.slug, &post.title.rendered);
            for &id in post.translations.values() {
                slugs.insert(id, slug.clone());
            }
            sitemap.translation.insert(slug.clone(), post.translations);
            sitemap.title.insert(slug, post.title.rendered);
        }

        let links: Vec<PostLink> = self.query(
            &collection,
            &[("status", self.status.as_str()), ("_fields", "id,link")],
        )?;
        for post in links {
            let Some(slug) = slugs.get(&post.id) else {
                continue;
            };
            let path = link_path(&post.link).map_err(|source| SitemapError::InvalidLink {
                id: post.id,
                link: post.link.clone(),
                source,
            })?;
            if sitemap.link.contains_key(&path) {
                return Err(SitemapError::DuplicateLink {
                    id: post.id,
                    link: path,
                });
            }
            sitemap.link.insert(path, slug.clone());
        }

        tracing::info!(
            post_type = self.post_type,
            slugs = sitemap.translation.len(),
            links = sitemap.link.len(),
            "Sitemap built"
        );
        Ok(sitemap)
    }

    fn query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, SitemapError> {
        self.api
            .list_json(path, query)?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .map_err(|source| SitemapError::MalformedRecord {
                path: path.to_owned(),
                source,
            })
    }
}

/// Public slug of an item.
///
/// The remote slug loses its `en-` prefix. An empty slug is derived from the
/// title: tags stripped, ASCII lower-cased, runs of anything but `[a-z0-9]`
/// collapsed to `-`.
pub fn derive_slug(remote_slug: &str, title: &str) -> String {
    let slug = remote_slug
        .strip_prefix(ENGLISH_SLUG_PREFIX)
        .unwrap_or(remote_slug);
    if !slug.is_empty() {
        return slug.to_owned();
    }

    let text = TAG_RE.replace_all(title, "").to_ascii_lowercase();
    let slug = NON_SLUG_RE.replace_all(&text, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        UNNAMED_SLUG.to_owned()
    } else {
        slug.to_owned()
    }
}

/// Path of a canonical link, with `?query` if present.
fn link_path(link: &str) -> Result<String, url::ParseError> {
    let url = url::Url::parse(link)?;
    Ok(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wpmirror_api::MockApi;

    use super::*;

    fn statuses() -> Vec<String> {
        vec!["publish".to_owned(), "draft".to_owned()]
    }

    fn api() -> MockApi {
        MockApi::new()
            .with_list(
                "/wp-json/wp/v2/pages",
                &[("slug", "indicators"), ("parent", "0")],
                vec![json!({
                    "id": 1,
                    "translations": {"en": 1, "fr": 2},
                    "title": {"rendered": "Indicators"}
                })],
            )
            .with_list(
                "/wp-json/wp/v2/indicators",
                &[("lang", "en")],
                vec![
                    json!({
                        "slug": "en-gdp",
                        "translations": {"en": 10, "fr": 11},
                        "title": {"rendered": "GDP"}
                    }),
                    json!({
                        "slug": "",
                        "translations": {"en": 20},
                        "title": {"rendered": "<b>Über</b> Uns!!"}
                    }),
                ],
            )
            .with_list(
                "/wp-json/wp/v2/indicators",
                &[("_fields", "id,link")],
                vec![
                    json!({"id": 10, "link": "https://cms.example.org/indicators/gdp/"}),
                    json!({"id": 11, "link": "https://cms.example.org/fr/indicators/gdp/"}),
                    json!({"id": 20, "link": "https://cms.example.org/?p=20"}),
                    json!({"id": 99, "link": "https://cms.example.org/unrelated/"}),
                ],
            )
    }

    #[test]
    fn test_derive_slug_strips_english_prefix() {
        assert_eq!(derive_slug("en-gdp", "GDP"), "gdp");
        assert_eq!(derive_slug("inflation", "Inflation"), "inflation");
    }

    #[test]
    fn test_derive_slug_from_title() {
        assert_eq!(derive_slug("", "Über Uns!!"), "ber-uns");
        assert_eq!(derive_slug("en-", "Trade <em>balance</em> 2024"), "trade-balance-2024");
    }

    #[test]
    fn test_derive_slug_unnamed() {
        assert_eq!(derive_slug("", "!!!"), "unnamed");
        assert_eq!(derive_slug("", ""), "unnamed");
    }

    #[test]
    fn test_link_path_keeps_query() {
        assert_eq!(
            link_path("https://cms.example.org/?p=20").unwrap(),
            "/?p=20"
        );
        assert_eq!(
            link_path("https://cms.example.org/indicators/gdp/").unwrap(),
            "/indicators/gdp/"
        );
    }

    #[test]
    fn test_build_sitemap() {
        let api = api();
        let sitemap = SitemapBuilder::new(&api, "indicators", &statuses())
            .build()
            .unwrap();

        assert_eq!(
            sitemap.translation.keys().collect::<Vec<_>>(),
            vec!["ber-uns", "gdp", "index.html"]
        );
        assert_eq!(sitemap.title("index.html"), Some("Indicators"));
        assert_eq!(sitemap.title("ber-uns"), Some("<b>Über</b> Uns!!"));
        assert_eq!(sitemap.slug_for_link("/indicators/gdp/"), Some("gdp"));
        assert_eq!(sitemap.slug_for_link("/fr/indicators/gdp/"), Some("gdp"));
        assert_eq!(sitemap.slug_for_link("/?p=20"), Some("ber-uns"));
        assert_eq!(sitemap.slug_for_link("/unrelated/"), None);
    }

    #[test]
    fn test_build_sends_status_and_fields() {
        let api = api();
        SitemapBuilder::new(&api, "indicators", &statuses())
            .build()
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[0],
            "LIST /wp-json/wp/v2/pages?slug=indicators&parent=0&lang=en&status=publish,draft&_fields=id,translations,title"
        );
        assert_eq!(
            requests[2],
            "LIST /wp-json/wp/v2/indicators?status=publish,draft&_fields=id,link"
        );
    }

    #[test]
    fn test_duplicate_link_fails() {
        let api = api().with_list(
            "/wp-json/wp/v2/indicators",
            &[("status", "publish,draft"), ("_fields", "id,link")],
            vec![
                json!({"id": 10, "link": "https://cms.example.org/indicators/gdp/"}),
                json!({"id": 11, "link": "https://cms.example.org/indicators/gdp/"}),
            ],
        );

        let err = SitemapBuilder::new(&api, "indicators", &statuses())
            .build()
            .unwrap_err();

        assert!(matches!(err, SitemapError::DuplicateLink { id: 11, .. }));
    }

    #[test]
    fn test_resolve_falls_back_to_english() {
        let api = api();
        let sitemap = SitemapBuilder::new(&api, "indicators", &statuses())
            .build()
            .unwrap();

        assert_eq!(sitemap.resolve("gdp", Some("fr")), Some((11, "fr".to_owned())));
        assert_eq!(sitemap.resolve("gdp", Some("de")), Some((10, "en".to_owned())));
        assert_eq!(sitemap.resolve("gdp", None), Some((10, "en".to_owned())));
        assert_eq!(sitemap.resolve("missing", Some("en")), None);
    }

    #[test]
    fn test_is_index_page() {
        let api = api();
        let sitemap = SitemapBuilder::new(&api, "indicators", &statuses())
            .build()
            .unwrap();

        assert!(sitemap.is_index_page(2));
        assert!(!sitemap.is_index_page(10));
    }
}
