//! Request path routing.

use crate::sitemap::INDEX_SLUG;

/// What a route-relative path addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Target<'a> {
    /// A page, by slug.
    Page(&'a str),
    /// A proxied asset: kind segment and relative path.
    Asset { kind: &'a str, path: &'a str },
}

/// Split `path` into at most three segments and match the route.
///
/// `route` alone addresses the index page, `route/slug` a page and
/// `route/kind/rel/path` an asset. Other routes yield `None`.
pub(crate) fn parse<'a>(path: &'a str, route: &str) -> Option<Target<'a>> {
    let mut segments = path.trim_matches('/').splitn(3, '/');
    if segments.next()? != route {
        return None;
    }
    match (segments.next(), segments.next()) {
        (None, _) => Some(Target::Page(INDEX_SLUG)),
        (Some(slug), None) => Some(Target::Page(slug)),
        (Some(kind), Some(path)) => Some(Target::Asset { kind, path }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse("indicators", "indicators"), Some(Target::Page("index.html")));
        assert_eq!(parse("/indicators/", "indicators"), Some(Target::Page("index.html")));
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse("/indicators/gdp", "indicators"), Some(Target::Page("gdp")));
    }

    #[test]
    fn test_parse_asset_keeps_rest() {
        assert_eq!(
            parse("indicators/downloads/2024/01/f.csv", "indicators"),
            Some(Target::Asset {
                kind: "downloads",
                path: "2024/01/f.csv"
            })
        );
    }

    #[test]
    fn test_parse_other_route() {
        assert_eq!(parse("about/gdp", "indicators"), None);
        assert_eq!(parse("", "indicators"), None);
        assert_eq!(parse("indicatorsx", "indicators"), None);
    }
}
