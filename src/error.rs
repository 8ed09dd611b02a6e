use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;
use upvote_http::{IntoResponse, Response, StatusCode};

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a handler can surface to a client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A row referenced a missing parent, or broke a uniqueness rule.
    #[error("{0}")]
    Integrity(String),

    #[error(transparent)]
    Http(#[from] upvote_http::Error),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    /// Classify a failed insert or update: constraint violations are the
    /// caller's fault, anything else is ours.
    pub fn from_write(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message))
            | Some(SqlErr::ForeignKeyConstraintViolation(message)) => AppError::Integrity(message),
            _ => AppError::Database(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NotFound,
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::Integrity(_) => {
                StatusCode::BadRequest
            }
            AppError::Http(e) => e.status(),
            AppError::Database(_) | AppError::Hashing(_) | AppError::Task(_) => {
                StatusCode::InternalServerError
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        Response::json(status, &serde_json::json!({ "message": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_keep_their_message() {
        let response = AppError::not_found("No post found with this id").into_response();
        assert_eq!(response.status, StatusCode::NotFound);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["message"], "No post found with this id");

        let response = AppError::Integrity("FOREIGN KEY constraint failed".into()).into_response();
        assert_eq!(response.status, StatusCode::BadRequest);
    }

    #[test]
    fn test_store_failures_are_server_errors() {
        let err = AppError::from_write(DbErr::Custom("disk on fire".into()));
        assert!(matches!(err, AppError::Database(_)));

        let response = err.into_response();
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert!(String::from_utf8_lossy(&response.body).contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_constraint_violations_from_the_store_are_integrity_errors() {
        use crate::entities::vote;
        use crate::testing::{seed_post, seed_user, seed_vote};
        use sea_orm::{ActiveModelTrait, Set};

        let store = crate::Store::in_memory().await.unwrap();
        let db = store.conn();
        let ada = seed_user(db, "ada").await;
        let post = seed_post(db, ada, "first").await;
        seed_vote(db, ada, post).await;

        let duplicate = vote::ActiveModel {
            user_id: Set(ada),
            post_id: Set(post),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap_err();
        let err = AppError::from_write(duplicate);
        assert!(matches!(err, AppError::Integrity(_)), "{err:?}");
        assert_eq!(err.status(), StatusCode::BadRequest);

        let dangling = vote::ActiveModel {
            user_id: Set(ada),
            post_id: Set(post + 100),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap_err();
        assert!(matches!(AppError::from_write(dangling), AppError::Integrity(_)));
    }

    #[test]
    fn test_http_errors_keep_their_status() {
        let err: AppError = upvote_http::Error::BadRequest("Invalid id".into()).into();
        assert_eq!(err.status(), StatusCode::BadRequest);
    }
}
