pub mod comment;
pub mod post;
pub mod session;
pub mod user;
pub mod vote;

pub mod prelude {
    pub use super::comment::Entity as Comments;
    pub use super::post::Entity as Posts;
    pub use super::session::Entity as Sessions;
    pub use super::user::Entity as Users;
    pub use super::vote::Entity as Votes;
}
