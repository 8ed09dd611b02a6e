use tracing::{debug, info};
use upvote_http::{json, Request, Response, StatusCode};

use crate::auth::verify_password;
use crate::error::{AppError, AppResult};
use crate::models::{Login, NewUser, UpdateUser, UserRow};
use crate::queries::{self, USER_NOT_FOUND};
use crate::{session, AppState};

pub async fn list(_req: Request, state: AppState) -> AppResult<Response> {
    let users = queries::list_users(state.db()).await?;
    Ok(json!(users))
}

pub async fn detail(req: Request, state: AppState) -> AppResult<Response> {
    let id: i32 = req.param_as("id")?;
    let user = queries::user_document(state.db(), id)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
    Ok(json!(user))
}

/// Sign up, then log the new user in.
pub async fn create(req: Request, state: AppState) -> AppResult<Response> {
    let input: NewUser = req.json()?;
    let user = queries::create_user(state.db(), input, state.config.auth.bcrypt_cost).await?;
    let session = session::start(state.db(), &user, &state.config.session).await?;

    Ok(session::set_cookie(
        json!(UserRow::from(user)),
        &state.config.session,
        &session,
    ))
}

pub async fn login(req: Request, state: AppState) -> AppResult<Response> {
    let input: Login = req.json()?;
    let user = queries::find_user_by_email(state.db(), &input.email)
        .await?
        .ok_or_else(|| AppError::bad_request("No user with that email address!"))?;

    if !verify_password(input.password, user.password.clone()).await? {
        debug!(user_id = user.id, "rejected login");
        return Err(AppError::bad_request("Incorrect password!"));
    }

    if let Some(previous) = req.cookie(&state.config.session.cookie_name) {
        session::destroy(state.db(), previous).await?;
    }
    let session = session::start(state.db(), &user, &state.config.session).await?;
    info!(user_id = user.id, "logged in");

    let body = serde_json::json!({
        "user": UserRow::from(user),
        "message": "You are now logged in!",
    });
    Ok(session::set_cookie(json!(body), &state.config.session, &session))
}

pub async fn logout(req: Request, state: AppState) -> AppResult<Response> {
    match session::current(state.db(), &req, &state.config.session).await? {
        Some(current) if current.logged_in => {
            session::destroy(state.db(), &current.sid).await?;
            Ok(session::clear_cookie(
                Response::empty(StatusCode::NoContent),
                &state.config.session,
            ))
        }
        _ => Ok(Response::empty(StatusCode::NotFound)),
    }
}

pub async fn update(req: Request, state: AppState) -> AppResult<Response> {
    let id: i32 = req.param_as("id")?;
    let input: UpdateUser = req.json()?;
    let user = queries::update_user(state.db(), id, input, state.config.auth.bcrypt_cost).await?;
    Ok(json!(UserRow::from(user)))
}

pub async fn delete(req: Request, state: AppState) -> AppResult<Response> {
    let id: i32 = req.param_as("id")?;
    queries::delete_user(state.db(), id).await?;
    Ok(super::deleted())
}
