use upvote_http::{json, Request, Response};

use crate::error::{AppError, AppResult};
use crate::models::{NewPost, UpdatePost, UpvoteInput};
use crate::queries::{self, POST_NOT_FOUND};
use crate::AppState;

pub async fn list(_req: Request, state: AppState) -> AppResult<Response> {
    let posts = queries::post_documents(state.db(), None).await?;
    Ok(json!(posts))
}

pub async fn detail(req: Request, state: AppState) -> AppResult<Response> {
    let id: i32 = req.param_as("id")?;
    let post = queries::post_document(state.db(), id)
        .await?
        .ok_or_else(|| AppError::not_found(POST_NOT_FOUND))?;
    Ok(json!(post))
}

pub async fn create(req: Request, state: AppState) -> AppResult<Response> {
    let input: NewPost = req.json()?;
    let post = queries::create_post(state.db(), input).await?;
    Ok(json!(post))
}

pub async fn upvote(req: Request, state: AppState) -> AppResult<Response> {
    let input: UpvoteInput = req.json()?;
    let post = queries::upvote(state.db(), input).await?;
    Ok(json!(post))
}

pub async fn update(req: Request, state: AppState) -> AppResult<Response> {
    let id: i32 = req.param_as("id")?;
    let input: UpdatePost = req.json()?;
    let post = queries::update_post(state.db(), id, input).await?;
    Ok(json!(post))
}

pub async fn delete(req: Request, state: AppState) -> AppResult<Response> {
    let id: i32 = req.param_as("id")?;
    queries::delete_post(state.db(), id).await?;
    Ok(super::deleted())
}
