use upvote_http::{serve_file, serve_static, StatusCode};

async fn fixture_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("upvote-http-{name}-{}", std::process::id()));
    tokio::fs::create_dir_all(dir.join("javascript")).await.unwrap();
    tokio::fs::write(dir.join("javascript/logout.js"), b"async function logout() {}")
        .await
        .unwrap();
    tokio::fs::write(dir.join("style.css"), b"body{}").await.unwrap();
    dir
}

#[tokio::test]
async fn test_serve_file_content_types() {
    let dir = fixture_dir("types").await;

    let js = serve_file(dir.join("javascript/logout.js")).await;
    assert_eq!(js.status, StatusCode::Ok);
    assert_eq!(
        js.header("Content-Type"),
        Some("application/javascript; charset=utf-8")
    );
    assert_eq!(js.body, b"async function logout() {}");

    let css = serve_file(dir.join("style.css")).await;
    assert_eq!(css.header("Content-Type"), Some("text/css; charset=utf-8"));

    tokio::fs::remove_dir_all(dir).await.ok();
}

#[tokio::test]
async fn test_serve_file_not_found() {
    let response = serve_file("definitely/not/here.txt").await;
    assert_eq!(response.status, StatusCode::NotFound);
}

#[tokio::test]
async fn test_serve_static_refuses_traversal_and_directories() {
    let dir = fixture_dir("security").await;

    let escaped = serve_static(&dir, "../../../etc/passwd").await;
    assert_eq!(escaped.status, StatusCode::Forbidden);

    let listing = serve_static(&dir, "javascript").await;
    assert_eq!(listing.status, StatusCode::Forbidden);

    let ok = serve_static(dir.join("javascript"), "/logout.js").await;
    assert_eq!(ok.status, StatusCode::Ok);

    tokio::fs::remove_dir_all(dir).await.ok();
}
