//! A link-sharing board: users post links, comment on them and upvote them.
//!
//! The interesting part lives in [`queries`] and [`associations`]: vote
//! counts are computed by a correlated subquery on the post row, and nested
//! documents are assembled from one batched statement per association.

pub mod associations;
pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod models;
pub mod queries;
pub mod session;
pub mod store;
pub mod views;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use upvote_http::Server;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use store::Store;

use handlers::{comments, pages, posts, users};

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.store.conn()
    }
}

/// The full route table.
pub fn app(state: AppState) -> Server<AppState> {
    Server::new(state)
        .get("/", pages::homepage)
        .get("/javascript/:file", pages::javascript)
        .scope("/api/users", |scope| {
            scope
                .get("/", users::list)
                .post("/", users::create)
                .post("/login", users::login)
                .post("/logout", users::logout)
                .get("/:id", users::detail)
                .put("/:id", users::update)
                .delete("/:id", users::delete)
        })
        .scope("/api/posts", |scope| {
            scope
                .get("/", posts::list)
                .post("/", posts::create)
                .put("/upvote", posts::upvote)
                .get("/:id", posts::detail)
                .put("/:id", posts::update)
                .delete("/:id", posts::delete)
        })
        .scope("/api/comments", |scope| {
            scope
                .get("/", comments::list)
                .post("/", comments::create)
                .delete("/:id", comments::delete)
        })
}
