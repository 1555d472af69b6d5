//! WordPress REST record types.
//!
//! Only the `_fields` requested by the sitemap queries are modelled.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Language code -> remote page id.
pub type Translations = BTreeMap<String, u64>;

/// A `{"rendered": "..."}` wrapper as returned for titles.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Rendered {
    /// Rendered HTML text.
    #[serde(default)]
    pub rendered: String,
}

/// Container page anchoring a route's index (`_fields=id,translations,title`).
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerPage {
    /// Page id.
    pub id: u64,
    /// Translation set.
    #[serde(default, deserialize_with = "translations")]
    pub translations: Translations,
    /// Page title.
    #[serde(default)]
    pub title: Rendered,
}

/// Content item in English (`_fields=slug,translations,title`).
#[derive(Debug, Clone, Deserialize)]
pub struct PostSummary {
    /// Remote slug.
    #[serde(default)]
    pub slug: String,
    /// Translation set.
    #[serde(default, deserialize_with = "translations")]
    pub translations: Translations,
    /// Item title.
    #[serde(default)]
    pub title: Rendered,
}

/// Content item in any language (`_fields=id,link`).
#[derive(Debug, Clone, Deserialize)]
pub struct PostLink {
    /// Item id.
    pub id: u64,
    /// Canonical link of the item.
    pub link: String,
}

/// Accept both `{"en": 1}` and the `[]` PHP emits for an empty map.
fn translations<'de, D>(deserializer: D) -> Result<Translations, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Map(Translations),
        List(Vec<serde_json::Value>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Map(map) => map,
        Raw::List(_) => Translations::new(),
    })
}
