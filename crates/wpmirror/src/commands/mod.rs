//! CLI command implementations.

pub(crate) mod clean;
pub(crate) mod invalidate;
pub(crate) mod pages;
pub(crate) mod serve;
pub(crate) mod warm;

use std::sync::Arc;

use wpmirror_api::{ClientConfig, ContentApi, WpClient};
use wpmirror_cache::{Cache, CacheStore, FileCache, MemoryCache};
use wpmirror_config::Config;
use wpmirror_site::{Mirror, MirrorConfig, RemotePaths};

use crate::error::CliError;

pub(crate) use clean::CleanArgs;
pub(crate) use invalidate::InvalidateArgs;
pub(crate) use pages::PagesArgs;
pub(crate) use serve::ServeArgs;
pub(crate) use warm::WarmArgs;

/// Build one mirror per configured route, or only the one serving `route`.
///
/// All mirrors share one remote client and one cache.
pub(crate) fn build_mirrors(
    config: &Config,
    version: &str,
    route: Option<&str>,
) -> Result<Vec<Arc<Mirror>>, CliError> {
    let api = config.require_api()?;
    if config.routes.is_empty() {
        return Err(CliError::Validation(
            "no [[routes]] configured".to_owned(),
        ));
    }
    if let Some(route) = route
        && config.route(route).is_none()
    {
        return Err(CliError::Validation(format!("unknown route: {route}")));
    }

    let client: Arc<dyn ContentApi> = Arc::new(WpClient::new(ClientConfig {
        base_url: api.url.clone(),
        user: api.user.clone(),
        password: api.password.clone(),
        key: api.api_key().to_owned(),
        use_login: config.requires_login(),
        timeout: api.timeout(),
    }));

    let cache: Box<dyn Cache> = match &config.cache_resolved.directory {
        Some(directory) => Box::new(FileCache::new(directory.clone(), version)),
        None => Box::new(MemoryCache::new()),
    };

    Ok(route_mirrors(config, &api.url, route, &client, cache.as_ref()))
}

/// Mirrors of the selected route bindings.
///
/// Each route gets the cache bucket named after the route, so bindings sharing
/// a post type never see each other's entries.
fn route_mirrors(
    config: &Config,
    remote_url: &str,
    route: Option<&str>,
    client: &Arc<dyn ContentApi>,
    cache: &dyn Cache,
) -> Vec<Arc<Mirror>> {
    let paths = RemotePaths {
        downloads: config.paths.downloads.clone(),
        images: config.paths.images.clone(),
        styles: config.paths.styles.clone(),
    };

    config
        .routes
        .iter()
        .filter(|binding| route.is_none_or(|route| binding.route() == route))
        .map(|binding| {
            let store = CacheStore::new(cache.bucket(binding.route()), config.cache_resolved.ttl);
            let mirror_config = MirrorConfig {
                route: binding.route().to_owned(),
                post_type: binding.post_type.clone(),
                statuses: config.status.clone(),
                prefix: config.prefix.clone(),
                remote_url: remote_url.to_owned(),
                paths: paths.clone(),
            };
            Arc::new(Mirror::new(Arc::clone(client), store, mirror_config))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wpmirror_api::MockApi;
    use wpmirror_site::Rendered;

    use super::*;

    const CONFIG: &str = r#"
[api]
url = "https://cms.example.org"
user = "mirror"
password = "secret"

[[routes]]
post_type = "indicators"

[[routes]]
post_type = "publication"
route = "publications"
"#;

    fn load(content: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("wpmirror.toml");
        std::fs::write(&path, content).unwrap();
        let config = Config::load(Some(&path), None).unwrap();
        (dir, config)
    }

    #[test]
    fn test_build_all_mirrors() {
        let (_dir, config) = load(CONFIG);

        let mirrors = build_mirrors(&config, "test", None).unwrap();

        let routes: Vec<_> = mirrors.iter().map(|m| m.route()).collect();
        assert_eq!(routes, vec!["indicators", "publications"]);
        assert_eq!(mirrors[1].post_type(), "publication");
    }

    #[test]
    fn test_build_single_route() {
        let (_dir, config) = load(CONFIG);

        let mirrors = build_mirrors(&config, "test", Some("publications")).unwrap();

        assert_eq!(mirrors.len(), 1);
        assert_eq!(mirrors[0].route(), "publications");
    }

    #[test]
    fn test_unknown_route() {
        let (_dir, config) = load(CONFIG);

        let err = build_mirrors(&config, "test", Some("nope")).err().unwrap();

        assert_eq!(err.to_string(), "unknown route: nope");
    }

    #[test]
    fn test_no_routes() {
        let (_dir, config) = load("[api]\nurl = \"https://cms.example.org\"\n");

        let err = build_mirrors(&config, "test", None).err().unwrap();

        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn test_missing_api_section() {
        let err = build_mirrors(&Config::default(), "test", None).err().unwrap();

        assert!(matches!(err, CliError::Config(_)));
    }

    const SHARED_POST_TYPE: &str = r#"
[api]
url = "https://cms.example.org"

[[routes]]
post_type = "indicators"

[[routes]]
post_type = "indicators"
route = "data"
"#;

    fn remote() -> MockApi {
        MockApi::new()
            .with_list(
                "/wp-json/wp/v2/pages",
                &[("slug", "indicators")],
                vec![json!({
                    "id": 1,
                    "translations": {"en": 1, "fr": 2},
                    "title": {"rendered": "Indicators"}
                })],
            )
            .with_list(
                "/wp-json/wp/v2/indicators",
                &[("lang", "en")],
                vec![json!({
                    "slug": "gdp",
                    "translations": {"en": 10, "fr": 11},
                    "title": {"rendered": "GDP"}
                })],
            )
            .with_list(
                "/wp-json/wp/v2/indicators",
                &[("_fields", "id,link")],
                vec![
                    json!({"id": 10, "link": "https://cms.example.org/indicators/gdp/"}),
                    json!({"id": 11, "link": "https://cms.example.org/fr/indicators/gdp/"}),
                ],
            )
            .with_content(
                "/index.php",
                &[("page_id", "2")],
                "<html><body><div role=\"document\">\
                 <a href=\"/fr/indicators/gdp/\">PIB</a></div></body></html>",
            )
    }

    fn index_html(mirror: &Mirror) -> String {
        match mirror.render(mirror.route(), Some("fr")).unwrap() {
            Rendered::Page(view) => view.html,
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[test]
    fn test_routes_sharing_post_type_use_separate_caches() {
        let (_dir, config) = load(SHARED_POST_TYPE);
        let api = Arc::new(remote());
        let client: Arc<dyn ContentApi> = Arc::clone(&api) as Arc<dyn ContentApi>;
        let cache = MemoryCache::new();

        let mirrors = route_mirrors(&config, "https://cms.example.org", None, &client, &cache);

        assert!(index_html(&mirrors[0]).contains(r#"href="/indicators/gdp?lg=fr""#));
        assert!(index_html(&mirrors[1]).contains(r#"href="/data/gdp?lg=fr""#));
        assert_eq!(api.content_requests(), 2);

        mirrors[0].clean_cache();
        index_html(&mirrors[1]);
        assert_eq!(api.content_requests(), 2);
    }
}
