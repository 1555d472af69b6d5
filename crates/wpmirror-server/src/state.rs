//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use wpmirror_site::Mirror;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// One mirror per configured route.
    pub(crate) mirrors: Vec<Arc<Mirror>>,
    /// URL prefix the mirrors are mounted at.
    pub(crate) prefix: String,
}

impl AppState {
    /// Mirror serving the first segment of `path`.
    pub(crate) fn mirror_for(&self, path: &str) -> Option<Arc<Mirror>> {
        let route = path.trim_matches('/').split('/').next()?;
        self.mirrors
            .iter()
            .find(|mirror| mirror.route() == route)
            .map(Arc::clone)
    }
}
