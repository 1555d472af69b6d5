//! HTTP request handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use wpmirror_site::Rendered;

use crate::error::ServerError;
use crate::shell::page_shell;
use crate::state::AppState;

/// Query string of a mirror request.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LangQuery {
    /// Language hint.
    lg: Option<String>,
}

/// Handle GET /{route}[/{slug}|/{kind}/{path}].
pub(crate) async fn get_path(
    Path(path): Path<String>,
    Query(query): Query<LangQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServerError> {
    let Some(mirror) = state.mirror_for(&path) else {
        return Err(ServerError::NotFound(path));
    };
    let lang = query.lg.filter(|lang| !lang.is_empty());

    // Rendering does blocking remote calls and file I/O
    let rendered = {
        let mirror = Arc::clone(&mirror);
        let path = path.clone();
        tokio::task::spawn_blocking(move || mirror.render(&path, lang.as_deref())).await??
    };

    match rendered {
        Rendered::Page(page) => {
            let stylesheet = format!("{}/{}/styles/main.css", state.prefix, mirror.route());
            Ok(Html(page_shell(&page, &stylesheet)).into_response())
        }
        Rendered::Asset(asset) => {
            Ok(([(header::CONTENT_TYPE, asset.content_type)], asset.bytes).into_response())
        }
        Rendered::NotFound => Err(ServerError::NotFound(path)),
    }
}

/// Fallback for paths outside every route.
pub(crate) async fn not_found() -> ServerError {
    ServerError::NotFound(String::new())
}
