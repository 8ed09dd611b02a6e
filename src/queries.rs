//! Vote aggregation, document composition and every write the routes make.

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, Query, SimpleExpr, SubQueryStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use tracing::{debug, info};
use validator::Validate;

use crate::associations::{fetch_many, fetch_one, EntityKind};
use crate::auth::hash_password;
use crate::entities::{comment, post, prelude::*, user, vote};
use crate::error::{AppError, AppResult};
use crate::models::*;

pub const USER_NOT_FOUND: &str = "No user found with this id.";
pub const POST_NOT_FOUND: &str = "No post found with this id";
pub const COMMENT_NOT_FOUND: &str = "No comment found with this id.";

/// `(SELECT COUNT(vote.id) FROM vote WHERE vote.post_id = post.id)`
pub fn vote_count() -> SimpleExpr {
    SimpleExpr::SubQuery(
        None,
        Box::new(SubQueryStatement::SelectStatement(
            Query::select()
                .expr(Func::count(Expr::col((Votes, vote::Column::Id))))
                .from(Votes)
                .and_where(
                    Expr::col((Votes, vote::Column::PostId)).equals((Posts, post::Column::Id)),
                )
                .to_owned(),
        )),
    )
}

fn tally_select() -> Select<post::Entity> {
    Posts::find()
        .select_only()
        .columns([
            post::Column::Id,
            post::Column::PostUrl,
            post::Column::Title,
            post::Column::CreatedAt,
            post::Column::UserId,
        ])
        .column_as(vote_count(), "vote_count")
}

/// Posts with their vote counts, newest first. `None` selects every post.
pub async fn post_tallies<C>(db: &C, ids: Option<&[i32]>) -> Result<Vec<PostTally>, DbErr>
where
    C: ConnectionTrait,
{
    let mut select = tally_select();
    if let Some(ids) = ids {
        select = select.filter(post::Column::Id.is_in(ids.iter().copied()));
    }

    select
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
        .into_model::<PostTally>()
        .all(db)
        .await
}

pub async fn find_tally<C>(db: &C, id: i32) -> Result<Option<PostTally>, DbErr>
where
    C: ConnectionTrait,
{
    tally_select()
        .filter(post::Column::Id.eq(id))
        .into_model::<PostTally>()
        .one(db)
        .await
}

/// Post documents, author and comments (each with its author) attached.
pub async fn post_documents<C>(db: &C, ids: Option<&[i32]>) -> Result<Vec<PostDocument>, DbErr>
where
    C: ConnectionTrait,
{
    let tallies = post_tallies(db, ids).await?;
    let post_ids: Vec<i32> = tallies.iter().map(|p| p.id).collect();

    let mut authors = fetch_one::<Username, _>(db, EntityKind::Post, "user", &post_ids).await?;
    let mut comments =
        fetch_many::<CommentRow, _>(db, EntityKind::Post, "comments", &post_ids).await?;

    let comment_ids: Vec<i32> = comments.values().flatten().map(|c| c.id).collect();
    let mut commenters =
        fetch_one::<Username, _>(db, EntityKind::Comment, "user", &comment_ids).await?;

    Ok(tallies
        .into_iter()
        .map(|post| PostDocument {
            user: authors.remove(&post.id),
            comments: comments
                .remove(&post.id)
                .unwrap_or_default()
                .into_iter()
                .map(|c| CommentDocument {
                    user: commenters.remove(&c.id),
                    id: c.id,
                    comment_text: c.comment_text,
                    post_id: c.post_id,
                    user_id: c.user_id,
                    created_at: c.created_at,
                })
                .collect(),
            id: post.id,
            post_url: post.post_url,
            title: post.title,
            created_at: post.created_at,
            vote_count: post.vote_count,
        })
        .collect())
}

pub async fn post_document<C>(db: &C, id: i32) -> Result<Option<PostDocument>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(post_documents(db, Some(&[id][..])).await?.pop())
}

pub async fn list_users<C>(db: &C) -> Result<Vec<UserRow>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(Users::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(UserRow::from)
        .collect())
}

/// A user with their posts, voted posts and comments (each with its post).
pub async fn user_document<C>(db: &C, id: i32) -> Result<Option<UserDocument>, DbErr>
where
    C: ConnectionTrait,
{
    let Some(user) = Users::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let owner = [user.id];
    let posts = fetch_many::<PostSummary, _>(db, EntityKind::User, "posts", &owner).await?;
    let voted = fetch_many::<PostTitle, _>(db, EntityKind::User, "voted_posts", &owner).await?;
    let mut comments =
        fetch_many::<CommentRow, _>(db, EntityKind::User, "comments", &owner).await?;

    let comments = comments.remove(&user.id).unwrap_or_default();
    let comment_ids: Vec<i32> = comments.iter().map(|c| c.id).collect();
    let mut comment_posts =
        fetch_one::<PostSummary, _>(db, EntityKind::Comment, "post", &comment_ids).await?;

    Ok(Some(UserDocument {
        posts: posts.into_values().flatten().collect(),
        voted_posts: voted.into_values().flatten().collect(),
        comments: comments
            .into_iter()
            .map(|c| UserComment {
                post: comment_posts.remove(&c.id),
                id: c.id,
                comment_text: c.comment_text,
                post_id: c.post_id,
                user_id: c.user_id,
                created_at: c.created_at,
            })
            .collect(),
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}

/// Every comment, newest first, with its author and post title.
pub async fn comment_listing<C>(db: &C) -> Result<Vec<CommentListing>, DbErr>
where
    C: ConnectionTrait,
{
    let comments = Comments::find()
        .order_by_desc(comment::Column::CreatedAt)
        .order_by_desc(comment::Column::Id)
        .all(db)
        .await?;

    let ids: Vec<i32> = comments.iter().map(|c| c.id).collect();
    let mut users = fetch_one::<Username, _>(db, EntityKind::Comment, "user", &ids).await?;
    let mut posts = fetch_one::<PostTitle, _>(db, EntityKind::Comment, "post", &ids).await?;

    Ok(comments
        .into_iter()
        .map(|c| CommentListing {
            user: users.remove(&c.id),
            post: posts.remove(&c.id),
            id: c.id,
            comment_text: c.comment_text,
        })
        .collect())
}

pub async fn find_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>, DbErr>
where
    C: ConnectionTrait,
{
    Users::find().filter(user::Column::Email.eq(email)).one(db).await
}

async fn ensure_user<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
    match Users::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Integrity(format!("user {id} does not exist"))),
    }
}

async fn ensure_post<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
    match Posts::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Integrity(format!("post {id} does not exist"))),
    }
}

async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<()> {
    match find_user_by_email(db, email).await? {
        Some(_) => Err(AppError::Integrity(format!("{email} is already registered"))),
        None => Ok(()),
    }
}

/// Record `input.user_id`'s vote on `input.post_id` and return the post with
/// its new count. Nothing is written unless every step succeeds.
pub async fn upvote(db: &DatabaseConnection, input: UpvoteInput) -> AppResult<PostTally> {
    let txn = db.begin().await?;

    ensure_user(&txn, input.user_id).await?;
    ensure_post(&txn, input.post_id).await?;

    let already = Votes::find()
        .filter(vote::Column::UserId.eq(input.user_id))
        .filter(vote::Column::PostId.eq(input.post_id))
        .one(&txn)
        .await?;
    if already.is_some() {
        return Err(AppError::Integrity(format!(
            "user {} already voted on post {}",
            input.user_id, input.post_id
        )));
    }

    vote::ActiveModel {
        user_id: Set(input.user_id),
        post_id: Set(input.post_id),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(AppError::from_write)?;

    let tally = find_tally(&txn, input.post_id)
        .await?
        .ok_or_else(|| AppError::not_found(POST_NOT_FOUND))?;

    txn.commit().await?;
    info!(user_id = input.user_id, post_id = input.post_id, votes = tally.vote_count, "upvoted");
    Ok(tally)
}

pub async fn create_user<C>(db: &C, input: NewUser, bcrypt_cost: u32) -> AppResult<user::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    ensure_email_free(db, &input.email).await?;
    let password = hash_password(input.password, bcrypt_cost).await?;

    let user = user::ActiveModel {
        username: Set(input.username),
        email: Set(input.email),
        password: Set(password),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(AppError::from_write)?;

    info!(user_id = user.id, "user created");
    Ok(user)
}

pub async fn update_user<C>(
    db: &C,
    id: i32,
    input: UpdateUser,
    bcrypt_cost: u32,
) -> AppResult<user::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    let user = Users::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    let mut active = user.clone().into_active_model();
    if let Some(username) = input.username {
        active.username = Set(username);
    }
    if let Some(email) = input.email {
        if email != user.email {
            ensure_email_free(db, &email).await?;
        }
        active.email = Set(email);
    }
    if let Some(password) = input.password {
        active.password = Set(hash_password(password, bcrypt_cost).await?);
    }

    let user = active.update(db).await.map_err(AppError::from_write)?;
    debug!(user_id = user.id, "user updated");
    Ok(user)
}

pub async fn delete_user<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
    let result = Users::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found(USER_NOT_FOUND));
    }
    info!(user_id = id, "user deleted");
    Ok(())
}

pub async fn create_post<C: ConnectionTrait>(db: &C, input: NewPost) -> AppResult<post::Model> {
    input.validate()?;
    ensure_user(db, input.user_id).await?;

    let now = Utc::now();
    let post = post::ActiveModel {
        title: Set(input.title),
        post_url: Set(input.post_url),
        user_id: Set(input.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(AppError::from_write)?;

    info!(post_id = post.id, user_id = post.user_id, "post created");
    Ok(post)
}

/// Retitle a post. The title is the only mutable field.
pub async fn update_post<C>(db: &C, id: i32, input: UpdatePost) -> AppResult<post::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    let post = Posts::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(POST_NOT_FOUND))?;

    let mut active = post.into_active_model();
    active.title = Set(input.title);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

pub async fn delete_post<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
    let result = Posts::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found(POST_NOT_FOUND));
    }
    info!(post_id = id, "post deleted");
    Ok(())
}

pub async fn create_comment<C>(db: &C, input: NewComment) -> AppResult<comment::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    ensure_user(db, input.user_id).await?;
    ensure_post(db, input.post_id).await?;

    let now = Utc::now();
    let comment = comment::ActiveModel {
        comment_text: Set(input.comment_text),
        user_id: Set(input.user_id),
        post_id: Set(input.post_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(AppError::from_write)?;

    debug!(comment_id = comment.id, post_id = comment.post_id, "comment created");
    Ok(comment)
}

pub async fn delete_comment<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
    let result = Comments::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found(COMMENT_NOT_FOUND));
    }
    Ok(())
}
