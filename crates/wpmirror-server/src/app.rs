//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router, mounted at the state's prefix.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let routes = Router::new().route("/{*path}", get(handlers::get_path));

    let router = if state.prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&state.prefix, routes)
    };

    router
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;
    use wpmirror_api::{ContentApi, MockApi};
    use wpmirror_cache::{Cache, CacheStore, MemoryCache};
    use wpmirror_site::{Mirror, MirrorConfig};

    use super::*;

    fn markup(body: &str) -> String {
        format!(
            "<html><head><script src=\"/theme.js\"></script></head>\
             <body><div role=\"document\">{body}</div></body></html>"
        )
    }

    fn app() -> Router {
        let api = MockApi::new()
            .with_list("/wp-json/wp/v2/pages", &[("slug", "indicators")], vec![])
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
                        "slug": "en-broken",
                        "translations": {"en": 30},
                        "title": {"rendered": "Broken"}
                    }),
                ],
            )
            .with_list("/wp-json/wp/v2/indicators", &[("_fields", "id,link")], vec![])
            .with_content("/index.php", &[("page_id", "10")], markup("<p>GDP</p>"))
            .with_content("/index.php", &[("page_id", "11")], markup("<p>PIB</p>"))
            .with_content("/wp-content/uploads/f.csv", &[], "a,b\n");
        let api: Arc<dyn ContentApi> = Arc::new(api);

        let mut config = MirrorConfig::new("indicators", "https://cms.example.org");
        config.prefix = "/mirror".to_owned();
        let store = CacheStore::new(MemoryCache::new().bucket("indicators"), None);
        let mirror = Arc::new(Mirror::new(api, store, config));

        create_router(Arc::new(AppState {
            mirrors: vec![mirror],
            prefix: "/mirror".to_owned(),
        }))
    }

    async fn fetch(uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_page_in_requested_language() {
        let (status, headers, body) = fetch("/mirror/indicators/gdp?lg=fr").await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            headers
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(body.contains("<html lang=\"fr\">"));
        assert!(body.contains("<title>GDP</title>"));
        assert!(body.contains("<p>PIB</p>"));
        assert!(body.contains("<script src=\"/theme.js\"></script>"));
        assert!(body.contains("href=\"/mirror/indicators/styles/main.css\""));
    }

    #[tokio::test]
    async fn test_page_falls_back_to_english() {
        let (status, _, body) = fetch("/mirror/indicators/gdp?lg=de").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<html lang=\"en\">"));
        assert!(body.contains("<p>GDP</p>"));
    }

    #[tokio::test]
    async fn test_asset() {
        let (status, headers, body) = fetch("/mirror/indicators/downloads/f.csv").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/csv");
        assert_eq!(body, "a,b\n");
    }

    #[tokio::test]
    async fn test_not_found_cases() {
        for uri in [
            "/mirror/indicators/missing",
            "/mirror/other/gdp",
            "/indicators/gdp",
            "/mirror/indicators/downloads/..%2F..%2Fetc%2Fpasswd",
            "/mirror/indicators/images/missing.png",
        ] {
            let (status, headers, body) = fetch(uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
            assert_eq!(body, "");
        }
    }

    #[tokio::test]
    async fn test_render_failure_is_not_found() {
        let (status, _, body) = fetch("/mirror/indicators/broken").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn test_route_without_index_page() {
        let (status, _, _) = fetch("/mirror/indicators").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
