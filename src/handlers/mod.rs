pub mod comments;
pub mod pages;
pub mod posts;
pub mod users;

use upvote_http::Response;

/// Body returned by every successful delete.
fn deleted() -> Response {
    upvote_http::json!(serde_json::json!({ "deleted": 1 }))
}
