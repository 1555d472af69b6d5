//! Cache warming and invalidation.
//!
//! Both operations report line-oriented progress through a callback: section
//! headers (`Pages:`, `Assets:`), `<route>/<slug> <lang>` per page and the
//! logical path per asset.

use std::fmt;

use crate::mirror::{Mirror, RenderError, SITEMAP_KEY, page_key};
use crate::rewrite::AssetLog;
use crate::route::{self, Target};

/// Stylesheet of the remote theme, referenced by the host shell only.
const MAIN_STYLESHEET: &str = "styles/main.css";

/// Progress event of [`Mirror::warm_all`] and [`Mirror::invalidate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress<'a> {
    /// Start of the page section.
    Pages,
    /// A page is about to be rendered.
    Page {
        route: &'a str,
        slug: &'a str,
        lang: &'a str,
    },
    /// Start of the asset section.
    Assets,
    /// An asset is about to be fetched.
    Asset(&'a str),
}

impl fmt::Display for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pages => f.write_str("Pages:"),
            Self::Page { route, slug, lang } => write!(f, "{route}/{slug} {lang}"),
            Self::Assets => f.write_str("Assets:"),
            Self::Asset(path) => f.write_str(path),
        }
    }
}

/// Counts of a completed [`Mirror::warm_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WarmSummary {
    /// Pages rendered.
    pub pages: usize,
    /// Assets fetched or confirmed cached.
    pub assets: usize,
}

impl Mirror {
    /// Re-render the translations of one page.
    ///
    /// `path` is routed like [`Mirror::render`]; asset paths and other routes
    /// are ignored. With `lang`, only that translation is refreshed.
    ///
    /// Returns the number of refreshed translations.
    pub fn invalidate(
        &self,
        path: &str,
        lang: Option<&str>,
        mut progress: impl FnMut(Progress<'_>),
    ) -> Result<usize, RenderError> {
        let Some(Target::Page(slug)) = route::parse(path, self.route()) else {
            return Ok(0);
        };
        let sitemap = self.sitemap()?;
        let Some(translations) = sitemap.translation.get(slug) else {
            return Ok(0);
        };

        let mut refreshed = 0;
        for (page_lang, &page_id) in translations {
            if lang.is_some_and(|lang| lang != page_lang) {
                continue;
            }
            progress(Progress::Page {
                route: self.route(),
                slug,
                lang: page_lang,
            });
            tracing::info!(route = self.route(), slug, lang = %page_lang, "Invalidating page");
            self.store.remove(&page_key(page_id));
            self.load_page(page_id, page_lang, &sitemap, &mut AssetLog::new())?;
            refreshed += 1;
        }
        Ok(refreshed)
    }

    /// Rebuild the sitemap, re-render every page and prefetch every asset the
    /// pages reference.
    ///
    /// Runs sequentially and stops at the first error.
    pub fn warm_all(
        &self,
        mut progress: impl FnMut(Progress<'_>),
    ) -> Result<WarmSummary, RenderError> {
        let mut summary = WarmSummary::default();
        let mut log = AssetLog::new();

        progress(Progress::Pages);
        self.store.remove(SITEMAP_KEY);
        let sitemap = self.sitemap()?;
        for (slug, translations) in &sitemap.translation {
            for (lang, &page_id) in translations {
                progress(Progress::Page {
                    route: self.route(),
                    slug,
                    lang,
                });
                self.store.remove(&page_key(page_id));
                self.load_page(page_id, lang, &sitemap, &mut log)?;
                summary.pages += 1;
            }
        }

        progress(Progress::Assets);
        log.record(format!("{}/{MAIN_STYLESHEET}", self.route()));
        for path in log.iter() {
            progress(Progress::Asset(path));
            if self.warm_asset(path)? {
                summary.assets += 1;
            } else {
                tracing::warn!(path, "Skipping invalid asset reference");
            }
        }

        tracing::info!(
            route = self.route(),
            pages = summary.pages,
            assets = summary.assets,
            "Cache warmed"
        );
        Ok(summary)
    }
}
