//! Proxied remote assets.
//!
//! A logical asset path is `<route>/<kind>/<relPath>` where `kind` is one of
//! `downloads`, `images` or `styles`. Each kind maps to a remote base path.

/// Extension -> content type of every asset that may be proxied.
const CONTENT_TYPES: &[(&str, &str)] = &[
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("csv", "text/csv"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("css", "text/css"),
    ("jpg", "image/jpeg"),
    ("pdf", "application/pdf"),
];

/// Remote base paths of the three asset kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemotePaths {
    /// Uploaded files (`/wp-content/uploads/`).
    pub downloads: String,
    /// Theme images.
    pub images: String,
    /// Theme stylesheets.
    pub styles: String,
}

impl Default for RemotePaths {
    fn default() -> Self {
        Self {
            downloads: "/wp-content/uploads/".to_owned(),
            images: "/wp-content/themes/ezbdataviz/assets/images/".to_owned(),
            styles: "/wp-content/themes/ezbdataviz/assets/build/css/".to_owned(),
        }
    }
}

/// Kind of proxied asset, the second segment of a logical asset path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Downloads,
    Images,
    Styles,
}

impl AssetKind {
    /// Parse a path segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "downloads" => Some(Self::Downloads),
            "images" => Some(Self::Images),
            "styles" => Some(Self::Styles),
            _ => None,
        }
    }

    /// Path segment of this kind.
    pub fn segment(self) -> &'static str {
        match self {
            Self::Downloads => "downloads",
            Self::Images => "images",
            Self::Styles => "styles",
        }
    }

    /// Remote base path of this kind.
    pub fn base_path(self, paths: &RemotePaths) -> &str {
        match self {
            Self::Downloads => &paths.downloads,
            Self::Images => &paths.images,
            Self::Styles => &paths.styles,
        }
    }
}

/// A validated asset request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRequest {
    /// Asset kind.
    pub kind: AssetKind,
    /// Site-relative remote path (`<base><relPath>`).
    pub remote_path: String,
    /// Content type derived from the extension.
    pub content_type: &'static str,
}

impl AssetRequest {
    /// Validate `rel_path` and map it to the remote path of `kind`.
    ///
    /// Returns `None` for characters outside `[A-Za-z0-9./_-]`, for hidden
    /// segments (including `..`), for extensions outside the content type
    /// table and for unknown kinds.
    pub fn new(kind: &str, rel_path: &str, paths: &RemotePaths) -> Option<Self> {
        if !rel_path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '_' | '-'))
        {
            tracing::debug!(path = rel_path, "Rejected asset path characters");
            return None;
        }
        if rel_path.split('/').any(|segment| segment.starts_with('.')) {
            tracing::debug!(path = rel_path, "Rejected hidden asset path");
            return None;
        }
        let content_type = content_type_for(rel_path)?;
        let kind = AssetKind::from_segment(kind)?;

        Some(Self {
            kind,
            remote_path: format!("{}{}", kind.base_path(paths), rel_path),
            content_type,
        })
    }

    /// Cache key of the fetched bytes.
    pub fn cache_key(&self) -> String {
        format!("content-{}", self.remote_path)
    }
}

/// Content type of a path, by case-insensitive extension.
pub fn content_type_for(path: &str) -> Option<&'static str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

/// Fetched asset bytes with their content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    /// Content type header value.
    pub content_type: &'static str,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("report.PDF"), Some("application/pdf"));
        assert_eq!(content_type_for("2024/01/data.csv"), Some("text/csv"));
        assert_eq!(content_type_for("dir.png/file"), None);
        assert_eq!(content_type_for("script.js"), None);
        assert_eq!(content_type_for("noextension"), None);
    }

    #[test]
    fn test_request_maps_to_remote_path() {
        let paths = RemotePaths::default();
        let request = AssetRequest::new("images", "icons/x.png", &paths).unwrap();

        assert_eq!(request.kind, AssetKind::Images);
        assert_eq!(
            request.remote_path,
            "/wp-content/themes/ezbdataviz/assets/images/icons/x.png"
        );
        assert_eq!(request.content_type, "image/png");
        assert_eq!(
            request.cache_key(),
            "content-/wp-content/themes/ezbdataviz/assets/images/icons/x.png"
        );
    }

    #[test]
    fn test_request_rejects_traversal() {
        let paths = RemotePaths::default();
        assert_eq!(AssetRequest::new("downloads", "../../etc/passwd", &paths), None);
        assert_eq!(AssetRequest::new("downloads", "../../etc/passwd.csv", &paths), None);
        assert_eq!(AssetRequest::new("downloads", "a/.hidden.png", &paths), None);
    }

    #[test]
    fn test_request_rejects_characters() {
        let paths = RemotePaths::default();
        assert_eq!(AssetRequest::new("downloads", "a b.csv", &paths), None);
        assert_eq!(AssetRequest::new("downloads", "a%2e.csv", &paths), None);
        assert_eq!(AssetRequest::new("downloads", "daten-ü.csv", &paths), None);
    }

    #[test]
    fn test_request_rejects_extension_and_kind() {
        let paths = RemotePaths::default();
        assert_eq!(AssetRequest::new("downloads", "tool.exe", &paths), None);
        assert_eq!(AssetRequest::new("scripts", "main.css", &paths), None);
    }

    #[test]
    fn test_kind_segments() {
        for kind in [AssetKind::Downloads, AssetKind::Images, AssetKind::Styles] {
            assert_eq!(AssetKind::from_segment(kind.segment()), Some(kind));
        }
    }
}
