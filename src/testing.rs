//! Row seeding for unit tests. Writes go straight through the entities so no
//! test pays for bcrypt.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::entities::{comment, post, user, vote};

pub async fn seed_user(db: &DatabaseConnection, name: &str) -> i32 {
    user::ActiveModel {
        username: Set(name.to_string()),
        email: Set(format!("{name}@example.com")),
        password: Set("not-a-hash".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed user")
    .id
}

pub async fn seed_post(db: &DatabaseConnection, user_id: i32, title: &str) -> i32 {
    let now = Utc::now();
    post::ActiveModel {
        title: Set(title.to_string()),
        post_url: Set(format!("https://example.com/{title}")),
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed post")
    .id
}

pub async fn seed_comment(db: &DatabaseConnection, user_id: i32, post_id: i32, text: &str) -> i32 {
    let now = Utc::now();
    comment::ActiveModel {
        comment_text: Set(text.to_string()),
        user_id: Set(user_id),
        post_id: Set(post_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed comment")
    .id
}

pub async fn seed_vote(db: &DatabaseConnection, user_id: i32, post_id: i32) -> i32 {
    vote::ActiveModel {
        user_id: Set(user_id),
        post_id: Set(post_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed vote")
    .id
}
