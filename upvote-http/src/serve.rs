use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::{Response, StatusCode};

/// Serve a single file
pub async fn serve_file<P: AsRef<Path>>(path: P) -> Response {
    let path = path.as_ref();

    match tokio::fs::read(path).await {
        Ok(bytes) => {
            Response::new(StatusCode::Ok, bytes).with_header("Content-Type", guess_content_type(path))
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "static file not served");
            Response::text(StatusCode::NotFound, "File not found")
        }
    }
}

/// Serve `request_path` from inside `base_dir`, refusing to leave it.
pub async fn serve_static<P: AsRef<Path>>(base_dir: P, request_path: &str) -> Response {
    let relative = PathBuf::from(request_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Response::text(StatusCode::Forbidden, "Access denied");
    }

    let file_path = base_dir.as_ref().join(relative);
    if file_path.is_dir() {
        return Response::text(StatusCode::Forbidden, "Directory listing not allowed");
    }

    serve_file(file_path).await
}

fn guess_content_type(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
