//! WordPress REST and content client.
//!
//! Provides a sync HTTP client for the WordPress REST API (basic auth with an
//! application password) and for raw content fetches, optionally through a
//! cookie session established by the login form.

mod session;

use std::sync::Mutex;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::{debug, info};
use ureq::http::Response;
use ureq::{Agent, ResponseExt as _};

use crate::error::ApiError;
use crate::{ContentApi, Query};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Records requested per page when listing collections.
const PER_PAGE: &str = "100";

/// Upper bound for a single content download.
const MAX_CONTENT_SIZE: u64 = 256 * 1024 * 1024;

/// Static files never need the login session.
const STATIC_PREFIX: &str = "/wp-content/";

const USER_AGENT: &str = "wpapi/1.0";

const LOGIN_PATH: &str = "/wp-login.php";

/// Connection settings for [`WpClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Remote site base URL.
    pub base_url: String,
    /// User name.
    pub user: String,
    /// Account password (login form).
    pub password: String,
    /// Application password (REST basic auth).
    pub key: String,
    /// Fetch content through a login session (needed for drafts).
    pub use_login: bool,
    /// Global request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user: String::new(),
            password: String::new(),
            key: String::new(),
            use_login: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
}

/// WordPress client.
pub struct WpClient {
    agent: Agent,
    /// Agent whose cookie jar holds the login session.
    session_agent: Agent,
    base_url: String,
    user: String,
    password: String,
    auth_header: String,
    use_login: bool,
    /// Whether the session agent went through a successful login.
    session: Mutex<bool>,
}

impl WpClient {
    /// Create a client from connection settings.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();
        let session_agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .max_redirects(session::MAX_LOGIN_REDIRECTS)
            .build()
            .into();

        let auth_header = format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", config.user, config.key))
        );

        Self {
            agent,
            session_agent,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            user: config.user,
            password: config.password,
            auth_header,
            use_login: config.use_login,
            session: Mutex::new(false),
        }
    }

    /// Absolute URL for a site-relative path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch one page of a REST collection.
    ///
    /// Returns the decoded body and the `X-WP-TotalPages` header, if present.
    fn get_json_page(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(Value, Option<u32>), ApiError> {
        let mut request = self
            .agent
            .get(&self.url(path))
            .header("User-Agent", USER_AGENT)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = check_status(request.call()?)?;
        let total_pages = response
            .headers()
            .get("X-WP-TotalPages")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        let json: Value = response.into_body().read_json()?;
        Ok((json, total_pages))
    }

    /// GET raw content with `agent`, bounded by [`MAX_CONTENT_SIZE`].
    ///
    /// Landing on the login form is an error: the content needs a session.
    fn fetch_content(
        &self,
        agent: &Agent,
        path: &str,
        query: &Query<'_>,
    ) -> Result<Vec<u8>, ApiError> {
        let mut request = agent.get(&self.url(path)).header("User-Agent", USER_AGENT);
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = check_status(request.call()?)?;
        if response.get_uri().path().ends_with(LOGIN_PATH) {
            return Err(ApiError::LoginRedirect);
        }
        let mut body = response.into_body();
        Ok(body.with_config().limit(MAX_CONTENT_SIZE).read_to_vec()?)
    }
}

impl ContentApi for WpClient {
    fn list_json(&self, path: &str, query: &Query<'_>) -> Result<Vec<Value>, ApiError> {
        let mut base: Vec<(&str, String)> = query
            .iter()
            .map(|(key, value)| (*key, (*value).to_owned()))
            .collect();
        base.push(("per_page", PER_PAGE.to_owned()));
        base.push(("order", "asc".to_owned()));
        base.push(("orderby", "id".to_owned()));

        info!("Listing {}", path);

        let mut records = Vec::new();
        let mut page: u32 = 1;
        loop {
            let mut paged = base.clone();
            if page > 1 {
                paged.push(("page", page.to_string()));
            }
            let (json, total_pages) = self.get_json_page(path, &paged)?;
            let Some(total_pages) = total_pages else {
                return Ok(into_records(json));
            };
            records.extend(into_records(json));
            page += 1;
            if total_pages < page {
                break;
            }
        }

        debug!("Listed {} records from {}", records.len(), path);
        Ok(records)
    }

    fn get_json(&self, path: &str, query: &Query<'_>) -> Result<Value, ApiError> {
        let owned: Vec<(&str, String)> = query
            .iter()
            .map(|(key, value)| (*key, (*value).to_owned()))
            .collect();
        let (json, _) = self.get_json_page(path, &owned)?;
        Ok(json)
    }

    fn post_json(&self, path: &str, query: &Query<'_>, body: &Value) -> Result<Value, ApiError> {
        let payload = serde_json::to_vec(body)?;

        info!("Posting to {}", path);

        let mut request = self
            .agent
            .post(&self.url(path))
            .header("User-Agent", USER_AGENT)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = check_status(request.send(&payload[..])?)?;
        Ok(response.into_body().read_json()?)
    }

    fn get_content(&self, path: &str, query: &Query<'_>) -> Result<Vec<u8>, ApiError> {
        if self.use_login && !path.starts_with(STATIC_PREFIX) {
            return self.get_session_content(path, query);
        }

        info!("Fetching {}", path);
        self.fetch_content(&self.agent, path, query)
    }
}

/// Turn error statuses into [`ApiError::HttpResponse`].
fn check_status(response: Response<ureq::Body>) -> Result<Response<ureq::Body>, ApiError> {
    let status = response.status().as_u16();
    if status >= 400 {
        let mut body_reader = response.into_body();
        let error_body = body_reader
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(ApiError::HttpResponse {
            status,
            body: error_body,
        });
    }
    Ok(response)
}

/// A collection page is a JSON array; anything else is a single record.
fn into_records(json: Value) -> Vec<Value> {
    match json {
        Value::Array(items) => items,
        other => vec![other],
    }
}
