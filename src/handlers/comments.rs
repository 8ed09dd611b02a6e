use upvote_http::{json, Request, Response};

use crate::error::AppResult;
use crate::models::NewComment;
use crate::queries;
use crate::AppState;

pub async fn list(_req: Request, state: AppState) -> AppResult<Response> {
    let comments = queries::comment_listing(state.db()).await?;
    Ok(json!(comments))
}

pub async fn create(req: Request, state: AppState) -> AppResult<Response> {
    let input: NewComment = req.json()?;
    let comment = queries::create_comment(state.db(), input).await?;
    Ok(json!(comment))
}

pub async fn delete(req: Request, state: AppState) -> AppResult<Response> {
    let id: i32 = req.param_as("id")?;
    queries::delete_comment(state.db(), id).await?;
    Ok(super::deleted())
}
