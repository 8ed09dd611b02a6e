//! Server-side sessions stored in the `session` table and keyed by a cookie.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use tracing::debug;
use upvote_http::{Request, Response};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::entities::{prelude::Sessions, session, user};

pub use session::Model as Session;

/// The live session named by the request's cookie, if any.
pub async fn current<C>(db: &C, req: &Request, config: &SessionConfig) -> Result<Option<Session>, DbErr>
where
    C: ConnectionTrait,
{
    match req.cookie(&config.cookie_name) {
        Some(sid) if !sid.is_empty() => load(db, sid).await,
        _ => Ok(None),
    }
}

/// Expired rows count as absent and are removed on sight.
pub async fn load<C: ConnectionTrait>(db: &C, sid: &str) -> Result<Option<Session>, DbErr> {
    match Sessions::find_by_id(sid.to_string()).one(db).await? {
        Some(session) if session.expires_at > Utc::now() => Ok(Some(session)),
        Some(expired) => {
            debug!("dropping expired session");
            Sessions::delete_by_id(expired.sid).exec(db).await?;
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Open a logged-in session for `user`.
pub async fn start<C: ConnectionTrait>(
    db: &C,
    user: &user::Model,
    config: &SessionConfig,
) -> Result<Session, DbErr> {
    let expires_at = Utc::now() + Duration::seconds(config.max_age_secs as i64);
    let session = session::ActiveModel {
        sid: Set(Uuid::new_v4().to_string()),
        user_id: Set(Some(user.id)),
        username: Set(Some(user.username.clone())),
        logged_in: Set(true),
        expires_at: Set(expires_at),
    }
    .insert(db)
    .await?;

    debug!(user_id = user.id, "session started");
    Ok(session)
}

/// Returns whether a row was removed.
pub async fn destroy<C: ConnectionTrait>(db: &C, sid: &str) -> Result<bool, DbErr> {
    let result = Sessions::delete_by_id(sid.to_string()).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Delete every expired row and return how many went.
pub async fn prune_expired<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let result = Sessions::delete_many()
        .filter(session::Column::ExpiresAt.lt(Utc::now()))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        debug!(count = result.rows_affected, "pruned expired sessions");
    }
    Ok(result.rows_affected)
}

pub fn set_cookie(response: Response, config: &SessionConfig, session: &Session) -> Response {
    response.with_cookie(&config.cookie_name, &session.sid, config.max_age_secs)
}

pub fn clear_cookie(response: Response, config: &SessionConfig) -> Response {
    response.clear_cookie(&config.cookie_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_user;
    use crate::Store;
    use sea_orm::{IntoActiveModel, PaginatorTrait};
    use upvote_http::StatusCode;

    async fn ada(store: &Store) -> user::Model {
        let id = seed_user(store.conn(), "ada").await;
        crate::entities::prelude::Users::find_by_id(id)
            .one(store.conn())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_load_destroy() {
        let store = Store::in_memory().await.unwrap();
        let config = SessionConfig::default();
        let user = ada(&store).await;

        let session = start(store.conn(), &user, &config).await.unwrap();
        assert!(session.logged_in);
        assert_eq!(session.username.as_deref(), Some("ada"));

        let loaded = load(store.conn(), &session.sid).await.unwrap().unwrap();
        assert_eq!(loaded.user_id, Some(user.id));

        assert!(destroy(store.conn(), &session.sid).await.unwrap());
        assert!(!destroy(store.conn(), &session.sid).await.unwrap());
        assert!(load(store.conn(), &session.sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_absent() {
        let store = Store::in_memory().await.unwrap();
        let user = ada(&store).await;
        let session = start(store.conn(), &user, &SessionConfig::default()).await.unwrap();

        let mut stale = session.clone().into_active_model();
        stale.expires_at = Set(Utc::now() - Duration::seconds(1));
        stale.update(store.conn()).await.unwrap();

        assert!(load(store.conn(), &session.sid).await.unwrap().is_none());
        assert_eq!(Sessions::find().count(store.conn()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_expired_keeps_live_sessions() {
        let store = Store::in_memory().await.unwrap();
        let config = SessionConfig::default();
        let user = ada(&store).await;

        let live = start(store.conn(), &user, &config).await.unwrap();
        for _ in 0..3 {
            let session = start(store.conn(), &user, &config).await.unwrap();
            let mut stale = session.into_active_model();
            stale.expires_at = Set(Utc::now() - Duration::seconds(60));
            stale.update(store.conn()).await.unwrap();
        }

        assert_eq!(prune_expired(store.conn()).await.unwrap(), 3);
        assert_eq!(prune_expired(store.conn()).await.unwrap(), 0);
        assert_eq!(Sessions::find().count(store.conn()).await.unwrap(), 1);
        assert!(load(store.conn(), &live.sid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleting_the_user_ends_their_sessions() {
        let store = Store::in_memory().await.unwrap();
        let user = ada(&store).await;
        let session = start(store.conn(), &user, &SessionConfig::default()).await.unwrap();

        crate::queries::delete_user(store.conn(), user.id).await.unwrap();
        assert!(load(store.conn(), &session.sid).await.unwrap().is_none());
    }

    #[test]
    fn test_cookie_round_trip() {
        let config = SessionConfig::default();
        let session = Session {
            sid: "abc".into(),
            user_id: Some(1),
            username: Some("ada".into()),
            logged_in: true,
            expires_at: Utc::now(),
        };

        let response = set_cookie(Response::empty(StatusCode::Ok), &config, &session);
        let cookie = response.header("set-cookie").unwrap();
        assert!(cookie.starts_with("sid=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));

        let cleared = clear_cookie(Response::empty(StatusCode::NoContent), &config);
        assert!(cleared.header("set-cookie").unwrap().contains("Max-Age=0"));
    }
}
