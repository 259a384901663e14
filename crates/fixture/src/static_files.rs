//! Embedded page assets

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Static file handler
pub struct StaticFiles;

impl StaticFiles {
    /// Serve an embedded file by path relative to the site root
    pub fn serve(path: &str) -> Response {
        let content_type = guess_content_type(path);

        match path {
            "" | "index.html" => serve_embedded(INDEX_HTML, content_type),
            _ => (StatusCode::NOT_FOUND, "File not found").into_response(),
        }
    }
}

fn guess_content_type(path: &str) -> &'static str {
    if path.is_empty() || path.ends_with(".html") {
        "text/html; charset=utf-8"
    } else if path.ends_with(".js") {
        "application/javascript"
    } else if path.ends_with(".css") {
        "text/css"
    } else {
        "application/octet-stream"
    }
}

fn serve_embedded(content: &'static str, content_type: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response()
}
