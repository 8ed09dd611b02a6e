//! Database handle shared by every handler.

use std::time::Duration;

use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Schema,
};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::entities::{prelude::*, vote};

pub const UNIQUE_VOTE_INDEX: &str = "idx-vote-user_id-post_id";

#[derive(Clone, Debug)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open the connection pool described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(config.sqlx_logging);

        // every pooled connection to `sqlite::memory:` would get its own empty database
        if config.url.starts_with("sqlite::memory:") {
            options.max_connections(1).min_connections(1);
        }

        info!(backend = scheme(&config.url), "connecting to database");
        let db = Database::connect(options).await?;
        info!("database connected");
        Ok(Self::new(db))
    }

    /// Fresh in-memory SQLite store with the schema already created.
    pub async fn in_memory() -> Result<Self, DbErr> {
        let store = Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        })
        .await?;
        store.sync_schema().await?;
        Ok(store)
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create missing tables and indexes, parents before children.
    pub async fn sync_schema(&self) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        if backend == DatabaseBackend::Sqlite {
            self.db.execute_unprepared("PRAGMA foreign_keys = ON").await?;
        }

        let tables = [
            schema.create_table_from_entity(Users),
            schema.create_table_from_entity(Posts),
            schema.create_table_from_entity(Comments),
            schema.create_table_from_entity(Votes),
            schema.create_table_from_entity(Sessions),
        ];
        for mut table in tables {
            table.if_not_exists();
            self.db.execute(backend.build(&table)).await?;
        }

        for mut index in schema.create_index_from_entity(Votes) {
            index.if_not_exists();
            self.db.execute(backend.build(&index)).await?;
        }

        let unique_vote = Index::create()
            .name(UNIQUE_VOTE_INDEX)
            .table(Votes)
            .col(vote::Column::UserId)
            .col(vote::Column::PostId)
            .unique()
            .if_not_exists()
            .to_owned();
        self.db.execute(backend.build(&unique_vote)).await?;

        debug!("schema in sync");
        Ok(())
    }

    pub async fn close(self) -> Result<(), DbErr> {
        info!("closing database connection");
        self.db.close().await
    }
}

fn scheme(url: &str) -> &str {
    url.split(':').next().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};

    use crate::entities::user;

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        store.sync_schema().await.unwrap();

        user::ActiveModel {
            username: Set("ada".into()),
            email: Set("ada@example.com".into()),
            password: Set("hash".into()),
            ..Default::default()
        }
        .insert(store.conn())
        .await
        .unwrap();

        store.sync_schema().await.unwrap();
        assert_eq!(Users::find().all(store.conn()).await.unwrap().len(), 1);
    }

    #[test]
    fn test_scheme_hides_credentials() {
        assert_eq!(scheme("postgres://admin:secret@db/app"), "postgres");
        assert_eq!(scheme("sqlite::memory:"), "sqlite");
    }
}
