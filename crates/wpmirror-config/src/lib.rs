//! Configuration management for wpmirror.
//!
//! Parses `wpmirror.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `api.url`
//! - `api.user`
//! - `api.password`
//! - `api.key`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override cache directory.
    pub cache_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "wpmirror.toml";

/// Publication status that requires an authenticated content fetch.
const DRAFT_STATUS: &str = "draft";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL prefix the mirror is served under (e.g. `/mirror`, or empty).
    pub prefix: String,
    /// Publication statuses included in the mirror.
    pub status: Vec<String>,
    /// Remote site configuration.
    pub api: Option<ApiConfig>,
    /// Cache configuration (paths are relative strings from TOML).
    cache: CacheConfigRaw,
    /// Remote base paths for assets.
    pub paths: RemotePathsConfig,
    /// Server configuration.
    pub server: ServerConfig,
    /// Route bindings, one mirror engine each.
    pub routes: Vec<RouteConfig>,

    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            status: vec!["publish".to_owned()],
            api: None,
            cache: CacheConfigRaw::default(),
            paths: RemotePathsConfig::default(),
            server: ServerConfig::default(),
            routes: Vec::new(),
            cache_resolved: CacheConfig::default(),
            config_path: None,
        }
    }
}

/// Remote WordPress site.
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the remote site.
    pub url: String,
    /// User name for basic auth and login.
    #[serde(default)]
    pub user: String,
    /// Account password (used for the login form).
    #[serde(default)]
    pub password: String,
    /// Application password for REST requests (defaults to `password`).
    #[serde(default)]
    pub key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl ApiConfig {
    /// Credential used for REST API basic auth.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.password)
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.url, "api.url")?;
        require_http_url(&self.url, "api.url")?;
        if self.timeout == 0 {
            return Err(ConfigError::Validation(
                "api.timeout must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    30
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    directory: Option<String>,
    ttl: Option<u64>,
}

/// Resolved cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Cache directory. `None` selects the in-memory cache.
    pub directory: Option<PathBuf>,
    /// Lifetime of cache entries. `None` never expires.
    pub ttl: Option<Duration>,
}

/// Remote base paths for the three asset kinds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemotePathsConfig {
    /// Base path of uploaded downloads.
    pub downloads: String,
    /// Base path of theme images.
    pub images: String,
    /// Base path of theme stylesheets.
    pub styles: String,
}

impl Default for RemotePathsConfig {
    fn default() -> Self {
        Self {
            downloads: "/wp-content/uploads/".to_owned(),
            images: "/wp-content/themes/ezbdataviz/assets/images/".to_owned(),
            styles: "/wp-content/themes/ezbdataviz/assets/build/css/".to_owned(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7980,
        }
    }
}

/// Association between a route segment and a remote post type.
#[derive(Debug, Deserialize)]
pub struct RouteConfig {
    /// Remote post type (REST collection name).
    pub post_type: String,
    /// Route segment; defaults to the post type.
    #[serde(default)]
    pub route: Option<String>,
}

impl RouteConfig {
    /// Route segment served by this binding.
    #[must_use]
    pub fn route(&self) -> &str {
        self.route.as_deref().unwrap_or(&self.post_type)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`api.password`").
        field: String,
        /// Error message (e.g., "${`WP_PASSWORD`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require a remote base path to be absolute with a trailing slash.
fn require_base_path(path: &str, field: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') || !path.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "{field} must start and end with '/'"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `wpmirror.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(cache_dir) = &settings.cache_dir {
            self.cache_resolved.directory = Some(cache_dir.clone());
        }
    }

    /// Get validated remote site configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the `[api]` section is missing or invalid.
    pub fn require_api(&self) -> Result<&ApiConfig, ConfigError> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| ConfigError::Validation("[api] section required in config".into()))?;
        api.validate()?;
        Ok(api)
    }

    /// Find the binding serving `route`.
    #[must_use]
    pub fn route(&self, route: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| r.route() == route)
    }

    /// Whether content fetches must go through the login flow.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        self.status.iter().any(|s| s == DRAFT_STATUS)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_mirror()?;
        self.validate_routes()?;
        if let Some(api) = &self.api {
            api.validate()?;
        }
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_mirror(&self) -> Result<(), ConfigError> {
        if !self.prefix.is_empty() && (!self.prefix.starts_with('/') || self.prefix.ends_with('/'))
        {
            return Err(ConfigError::Validation(
                "prefix must be empty or start with '/' without a trailing '/'".to_owned(),
            ));
        }
        if self.status.is_empty() {
            return Err(ConfigError::Validation("status cannot be empty".to_owned()));
        }
        require_base_path(&self.paths.downloads, "paths.downloads")?;
        require_base_path(&self.paths.images, "paths.images")?;
        require_base_path(&self.paths.styles, "paths.styles")?;
        Ok(())
    }

    fn validate_routes(&self) -> Result<(), ConfigError> {
        for (i, binding) in self.routes.iter().enumerate() {
            require_non_empty(&binding.post_type, "routes.post_type")?;
            let route = binding.route();
            if route.is_empty() || route.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "route '{route}' must be a single non-empty path segment"
                )));
            }
            if self.routes[..i].iter().any(|other| other.route() == route) {
                return Err(ConfigError::Validation(format!(
                    "route '{route}' is bound more than once"
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref mut api) = self.api {
            api.url = expand::expand_env(&api.url, "api.url")?;
            api.user = expand::expand_env(&api.user, "api.user")?;
            api.password = expand::expand_env(&api.password, "api.password")?;
            if let Some(ref key) = api.key {
                api.key = Some(expand::expand_env(key, "api.key")?);
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.cache_resolved = CacheConfig {
            directory: self.cache.directory.as_deref().map(|d| config_dir.join(d)),
            ttl: self.cache.ttl.map(Duration::from_secs),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"
prefix = "/mirror"
status = ["publish", "draft"]

[api]
url = "https://cms.example.org"
user = "mirror"
password = "secret"
key = "app-key"

[cache]
directory = "cache"
ttl = 3600

[server]
host = "0.0.0.0"
port = 9000

[[routes]]
post_type = "indicators"

[[routes]]
post_type = "publication"
route = "publications"
"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.prefix, "");
        assert_eq!(config.status, vec!["publish".to_owned()]);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7980);
        assert_eq!(config.paths.downloads, "/wp-content/uploads/");
        assert!(config.cache_resolved.directory.is_none());
        assert!(config.api.is_none());
        assert!(!config.requires_login());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 7980);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let (dir, path) = write_config(FULL);
        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.prefix, "/mirror");
        assert!(config.requires_login());
        let api = config.require_api().unwrap();
        assert_eq!(api.url, "https://cms.example.org");
        assert_eq!(api.api_key(), "app-key");
        assert_eq!(api.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.cache_resolved.directory,
            Some(dir.path().join("cache"))
        );
        assert_eq!(config.cache_resolved.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.routes[0].route(), "indicators");
        assert_eq!(config.routes[1].route(), "publications");
        assert_eq!(
            config.route("publications").map(|r| r.post_type.as_str()),
            Some("publication")
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_api_key_defaults_to_password() {
        let api: ApiConfig = toml::from_str(
            r#"
url = "https://cms.example.org"
password = "secret"
"#,
        )
        .unwrap();
        assert_eq!(api.api_key(), "secret");
    }

    #[test]
    fn test_cli_settings_override() {
        let (_dir, path) = write_config(FULL);
        let settings = CliSettings {
            host: Some("localhost".to_owned()),
            port: Some(8081),
            cache_dir: Some(PathBuf::from("/tmp/wpmirror")),
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8081);
        assert_eq!(
            config.cache_resolved.directory,
            Some(PathBuf::from("/tmp/wpmirror"))
        );
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/wpmirror.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_require_api_missing_section() {
        let config = Config::default();
        assert!(matches!(
            config.require_api(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let (_dir, path) = write_config(
            r#"
[api]
url = "cms.example.org"
"#,
        );
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(err.to_string().contains("api.url"));
    }

    #[test]
    fn test_trailing_slash_prefix_rejected() {
        let (_dir, path) = write_config(r#"prefix = "/mirror/""#);
        assert!(matches!(
            Config::load(Some(&path), None),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let (_dir, path) = write_config(
            r#"
[[routes]]
post_type = "indicators"

[[routes]]
post_type = "indicator_v2"
route = "indicators"
"#,
        );
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(err.to_string().contains("bound more than once"));
    }

    #[test]
    fn test_route_with_slash_rejected() {
        let (_dir, path) = write_config(
            r#"
[[routes]]
post_type = "indicators"
route = "a/b"
"#,
        );
        assert!(Config::load(Some(&path), None).is_err());
    }

    #[test]
    fn test_base_path_without_trailing_slash_rejected() {
        let (_dir, path) = write_config(
            r#"
[paths]
downloads = "/wp-content/uploads"
"#,
        );
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(err.to_string().contains("paths.downloads"));
    }

    #[test]
    fn test_env_expansion_in_api() {
        let (_dir, path) = write_config(
            r#"
[api]
url = "${WPMIRROR_TEST_UNSET_URL:-https://fallback.example.org}"
password = "${WPMIRROR_TEST_UNSET_PASSWORD:-pw}"
"#,
        );
        let config = Config::load(Some(&path), None).unwrap();
        let api = config.require_api().unwrap();
        assert_eq!(api.url, "https://fallback.example.org");
        assert_eq!(api.password, "pw");
    }
}
