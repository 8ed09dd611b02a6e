use upvote_http::{html, serve_static, Request, Response, StatusCode};

use crate::error::AppResult;
use crate::{queries, session, views, AppState};

pub async fn homepage(req: Request, state: AppState) -> AppResult<Response> {
    let posts = queries::post_documents(state.db(), None).await?;
    let logged_in = session::current(state.db(), &req, &state.config.session)
        .await?
        .is_some_and(|s| s.logged_in);

    Ok(html!(views::homepage(&posts, logged_in)))
}

/// Files under `<public_dir>/javascript`.
pub async fn javascript(req: Request, state: AppState) -> Response {
    match req.param("file") {
        Some(file) => serve_static(state.config.server.public_dir.join("javascript"), file).await,
        None => Response::text(StatusCode::NotFound, "File not found"),
    }
}
