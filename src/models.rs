use sea_orm::entity::prelude::DateTimeUtc;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::associations::{EntityKind, Projection};
use crate::entities::user;

// request bodies

#[derive(Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 4, message = "password must be at least 4 characters"))]
    pub password: String,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 4, message = "password must be at least 4 characters"))]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPost {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(
        url(message = "post_url must be a valid URL"),
        custom(function = "web_link")
    )]
    pub post_url: String,
    pub user_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePost {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(min = 1, message = "comment_text must not be empty"))]
    pub comment_text: String,
    pub user_id: i32,
    pub post_id: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpvoteInput {
    pub user_id: i32,
    pub post_id: i32,
}

/// Only `http` and `https` links may be posted; anything else would land in
/// an `href` on the homepage.
pub fn web_link(url: &str) -> Result<(), ValidationError> {
    let scheme = url.split_once(':').map(|(scheme, _)| scheme.to_ascii_lowercase());
    match scheme.as_deref() {
        Some("http") | Some("https") => Ok(()),
        _ => Err(ValidationError::new("web_link").with_message("post_url must be an http or https link".into())),
    }
}

// projections

macro_rules! projection {
    ($name:ident, $entity:expr, [$($column:literal),+ $(,)?]) => {
        impl Projection for $name {
            const ENTITY: EntityKind = $entity;
            const COLUMNS: &'static [&'static str] = &[$($column),+];
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct Username {
    pub username: String,
}
projection!(Username, EntityKind::User, ["username"]);

/// A user without credentials.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub email: String,
}
projection!(UserRow, EntityKind::User, ["id", "username", "email"]);

impl From<user::Model> for UserRow {
    fn from(user: user::Model) -> Self {
        UserRow {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct PostTitle {
    pub title: String,
}
projection!(PostTitle, EntityKind::Post, ["title"]);

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub post_url: String,
    pub created_at: DateTimeUtc,
}
projection!(PostSummary, EntityKind::Post, ["id", "title", "post_url", "created_at"]);

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: i32,
    pub comment_text: String,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: DateTimeUtc,
}
projection!(CommentRow, EntityKind::Comment, ["id", "comment_text", "post_id", "user_id", "created_at"]);

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct VoteRow {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
}
projection!(VoteRow, EntityKind::Vote, ["id", "user_id", "post_id"]);

/// A post row with its vote count attached.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct PostTally {
    pub id: i32,
    pub post_url: String,
    pub title: String,
    pub created_at: DateTimeUtc,
    pub user_id: i32,
    pub vote_count: i64,
}

// documents served to clients

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDocument {
    pub id: i32,
    pub comment_text: String,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: DateTimeUtc,
    pub user: Option<Username>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDocument {
    pub id: i32,
    pub post_url: String,
    pub title: String,
    pub created_at: DateTimeUtc,
    pub vote_count: i64,
    pub user: Option<Username>,
    pub comments: Vec<CommentDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserComment {
    pub id: i32,
    pub comment_text: String,
    pub post_id: i32,
    pub user_id: i32,
    pub created_at: DateTimeUtc,
    pub post: Option<PostSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub posts: Vec<PostSummary>,
    pub voted_posts: Vec<PostTitle>,
    pub comments: Vec<UserComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListing {
    pub id: i32,
    pub comment_text: String,
    pub user: Option<Username>,
    pub post: Option<PostTitle>,
}
