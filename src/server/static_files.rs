//! Serving the generated output tree.
//!
//! ```text
//! /blog/hello      → blog/hello/index.html, else blog/hello.html
//! /docs/           → docs/index.html
//! /css/site.css    → css/site.css
//! ```

use super::AppState;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use log::warn;
use std::path::{Component, Path, PathBuf};

/// Map a request path onto the output directory. `None` for anything that
/// would escape it.
fn join_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in request_path.split('/').filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return None,
        }
    }
    Some(path)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

/// The file that answers `request_path`, if any.
pub async fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let path = join_request_path(root, request_path)?;

    let last = request_path.rsplit('/').next().unwrap_or_default();
    if !last.contains('.') {
        let index = path.join("index.html");
        if is_file(&index).await {
            return Some(index);
        }
    }

    if is_file(&path).await {
        return Some(path);
    }
    if is_dir(&path).await {
        let index = path.join("index.html");
        return is_file(&index).await.then_some(index);
    }

    let mut html = path.into_os_string();
    html.push(".html");
    let html = PathBuf::from(html);
    is_file(&html).await.then_some(html)
}

fn content_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let textual = mime.type_() == mime_guess::mime::TEXT
        || matches!(mime.subtype().as_str(), "javascript" | "json" | "xml");
    if textual {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}

pub async fn serve(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(path) = resolve(&state.output_dir, uri.path()).await else {
        return (StatusCode::NOT_FOUND, "404 page not found").into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response(),
        Err(e) => {
            warn!("could not read {}: {e}", path.display());
            (StatusCode::NOT_FOUND, "404 page not found").into_response()
        }
    }
}
