//! Mock content API for testing.
//!
//! Provides [`MockApi`] for unit testing the mirror engine without a network.

use std::sync::{Mutex, RwLock};

use serde_json::Value;

use crate::error::ApiError;
use crate::{ContentApi, Query};

type OwnedQuery = Vec<(String, String)>;

/// A canned response, served when every registered query pair is present in
/// the request. Among several candidates the one with most pairs wins.
#[derive(Debug)]
struct Canned<T> {
    path: String,
    query: OwnedQuery,
    response: T,
}

/// Mock content API for testing.
///
/// Use the builder methods to register canned responses. Every request is
/// recorded and can be inspected afterwards.
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
/// use wpmirror_api::{ContentApi, MockApi};
///
/// let api = MockApi::new()
///     .with_list("/wp-json/wp/v2/indicators", &[("lang", "en")], vec![json!({"slug": "gdp"})])
///     .with_content("/index.php", &[("page_id", "10")], "<html>...</html>");
///
/// let html = api.get_content("/index.php", &[("page_id", "10")]).unwrap();
/// assert_eq!(api.content_requests(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockApi {
    lists: RwLock<Vec<Canned<Vec<Value>>>>,
    documents: RwLock<Vec<Canned<Value>>>,
    contents: RwLock<Vec<Canned<Vec<u8>>>>,
    requests: Mutex<Vec<String>>,
    posted: Mutex<Vec<(String, Value)>>,
}

impl MockApi {
    /// Create a mock without any responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection response for [`ContentApi::list_json`].
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_list(self, path: &str, query: &Query<'_>, records: Vec<Value>) -> Self {
        self.lists.write().unwrap().push(canned(path, query, records));
        self
    }

    /// Register a document for [`ContentApi::get_json`] and [`ContentApi::post_json`].
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_json(self, path: &str, query: &Query<'_>, document: Value) -> Self {
        self.documents
            .write()
            .unwrap()
            .push(canned(path, query, document));
        self
    }

    /// Register raw content for [`ContentApi::get_content`].
    #[must_use]
    pub fn with_content(self, path: &str, query: &Query<'_>, content: impl Into<Vec<u8>>) -> Self {
        self.set_content(path, query, content);
        self
    }

    /// Replace (or add) raw content after construction.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_content(&self, path: &str, query: &Query<'_>, content: impl Into<Vec<u8>>) {
        let entry = canned(path, query, content.into());
        let mut contents = self.contents.write().unwrap();
        contents.retain(|c| !(c.path == entry.path && c.query == entry.query));
        contents.push(entry);
    }

    /// Every request made so far, formatted as `METHOD path?query`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of [`ContentApi::get_content`] calls made so far.
    pub fn content_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with("CONTENT "))
            .count()
    }

    /// Bodies sent through [`ContentApi::post_json`], with their paths.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn posted(&self) -> Vec<(String, Value)> {
        self.posted.lock().unwrap().clone()
    }

    fn record(&self, method: &str, path: &str, query: &Query<'_>) {
        let query = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let line = if query.is_empty() {
            format!("{method} {path}")
        } else {
            format!("{method} {path}?{query}")
        };
        self.requests.lock().unwrap().push(line);
    }
}

fn canned<T>(path: &str, query: &Query<'_>, response: T) -> Canned<T> {
    Canned {
        path: path.to_owned(),
        query: query
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
        response,
    }
}

/// Find the most specific canned response matching a request.
fn find<'a, T>(entries: &'a [Canned<T>], path: &str, query: &Query<'_>) -> Option<&'a T> {
    entries
        .iter()
        .filter(|c| c.path == path)
        .filter(|c| {
            c.query
                .iter()
                .all(|(k, v)| query.iter().any(|(qk, qv)| *qk == k && *qv == v))
        })
        .max_by_key(|c| c.query.len())
        .map(|c| &c.response)
}

fn not_found(path: &str) -> ApiError {
    ApiError::HttpResponse {
        status: 404,
        body: format!("no mock response for {path}"),
    }
}

impl ContentApi for MockApi {
    fn list_json(&self, path: &str, query: &Query<'_>) -> Result<Vec<Value>, ApiError> {
        self.record("LIST", path, query);
        let lists = self.lists.read().unwrap();
        find(&lists, path, query)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn get_json(&self, path: &str, query: &Query<'_>) -> Result<Value, ApiError> {
        self.record("GET", path, query);
        let documents = self.documents.read().unwrap();
        find(&documents, path, query)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn post_json(&self, path: &str, query: &Query<'_>, body: &Value) -> Result<Value, ApiError> {
        self.record("POST", path, query);
        self.posted
            .lock()
            .unwrap()
            .push((path.to_owned(), body.clone()));
        let documents = self.documents.read().unwrap();
        Ok(find(&documents, path, query).cloned().unwrap_or_else(|| body.clone()))
    }

    fn get_content(&self, path: &str, query: &Query<'_>) -> Result<Vec<u8>, ApiError> {
        self.record("CONTENT", path, query);
        let contents = self.contents.read().unwrap();
        find(&contents, path, query)
            .cloned()
            .ok_or_else(|| not_found(path))
    }
}
