//! Declared relationships between entities and the batched fetches built
//! from them.
//!
//! Every association is a row of [`ASSOCIATIONS`]. Given a set of owner ids,
//! [`fetch_many`] and [`fetch_one`] issue a single statement per association
//! and hand back the typed rows grouped by owner, so composing a nested
//! document never loops over the database.

use std::collections::{BTreeSet, HashMap};

use sea_orm::sea_query::{Alias, Expr, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult};
use tracing::trace;

const OWNER_KEY: &str = "owner_key";

/// Owner ids bound per statement, kept well under SQLite's host parameter
/// limit.
const OWNER_CHUNK: usize = 900;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Post,
    Comment,
    Vote,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Post => "post",
            EntityKind::Comment => "comment",
            EntityKind::Vote => "vote",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Join {
    /// The target holds `foreign_key` pointing back at the source.
    HasMany { foreign_key: &'static str },
    /// The source holds `foreign_key` pointing at the target.
    BelongsTo { foreign_key: &'static str },
    /// Many-to-many through `junction`, which holds both keys.
    Through {
        junction: EntityKind,
        source_key: &'static str,
        target_key: &'static str,
    },
}

impl Join {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Join::BelongsTo { .. } => Cardinality::One,
            Join::HasMany { .. } | Join::Through { .. } => Cardinality::Many,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Association {
    pub source: EntityKind,
    pub name: &'static str,
    pub target: EntityKind,
    pub join: Join,
}

const fn has_many(
    source: EntityKind,
    name: &'static str,
    target: EntityKind,
    foreign_key: &'static str,
) -> Association {
    Association { source, name, target, join: Join::HasMany { foreign_key } }
}

const fn belongs_to(
    source: EntityKind,
    name: &'static str,
    target: EntityKind,
    foreign_key: &'static str,
) -> Association {
    Association { source, name, target, join: Join::BelongsTo { foreign_key } }
}

const fn through(
    source: EntityKind,
    name: &'static str,
    target: EntityKind,
    source_key: &'static str,
    target_key: &'static str,
) -> Association {
    Association {
        source,
        name,
        target,
        join: Join::Through { junction: EntityKind::Vote, source_key, target_key },
    }
}

use EntityKind::{Comment, Post, User, Vote};

pub static ASSOCIATIONS: &[Association] = &[
    has_many(User, "posts", Post, "user_id"),
    has_many(User, "comments", Comment, "user_id"),
    has_many(User, "votes", Vote, "user_id"),
    through(User, "voted_posts", Post, "user_id", "post_id"),
    belongs_to(Post, "user", User, "user_id"),
    has_many(Post, "comments", Comment, "post_id"),
    has_many(Post, "votes", Vote, "post_id"),
    through(Post, "voters", User, "post_id", "user_id"),
    belongs_to(Comment, "user", User, "user_id"),
    belongs_to(Comment, "post", Post, "post_id"),
    belongs_to(Vote, "user", User, "user_id"),
    belongs_to(Vote, "post", Post, "post_id"),
];

/// Look up a declared association.
///
/// # Panics
///
/// When `source` declares nothing called `name`.
pub fn association(source: EntityKind, name: &str) -> &'static Association {
    ASSOCIATIONS
        .iter()
        .find(|a| a.source == source && a.name == name)
        .unwrap_or_else(|| panic!("{source:?} declares no association named `{name}`"))
}

/// A typed slice of a target entity's columns.
pub trait Projection: FromQueryResult + Send {
    const ENTITY: EntityKind;
    const COLUMNS: &'static [&'static str];
}

/// Fetch `(owner id, row)` pairs for every owner in `owners`, ordered by the
/// target's id within each owner.
pub async fn fetch_related<M, C>(
    db: &C,
    source: EntityKind,
    name: &str,
    owners: &[i32],
) -> Result<Vec<(i32, M)>, DbErr>
where
    M: Projection,
    C: ConnectionTrait,
{
    let assoc = association(source, name);
    assert_eq!(
        M::ENTITY,
        assoc.target,
        "{source:?}.{name} yields {:?} rows",
        assoc.target
    );

    let owners: Vec<i32> = owners.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

    let mut rows = Vec::new();
    for chunk in owners.chunks(OWNER_CHUNK) {
        let statement = db
            .get_database_backend()
            .build(&select_for(source, assoc, M::COLUMNS, chunk));
        trace!(sql = %statement, owners = chunk.len(), "fetching {source:?}.{name}");

        for row in db.query_all(statement).await? {
            rows.push((row.try_get::<i32>("", OWNER_KEY)?, M::from_query_result(&row, "")?));
        }
    }
    Ok(rows)
}

fn select_for(
    source: EntityKind,
    assoc: &Association,
    columns: &[&str],
    owners: &[i32],
) -> SelectStatement {
    let target = Alias::new(assoc.target.table());
    let mut select = Query::select();
    for column in columns {
        select.column((target.clone(), Alias::new(*column)));
    }

    let (owner_table, owner_column) = match assoc.join {
        Join::HasMany { foreign_key } => {
            select.from(target.clone());
            (target.clone(), foreign_key)
        }
        Join::BelongsTo { foreign_key } => {
            let owner = Alias::new(source.table());
            select.from(owner.clone()).inner_join(
                target.clone(),
                Expr::col((target.clone(), Alias::new("id")))
                    .equals((owner.clone(), Alias::new(foreign_key))),
            );
            (owner, "id")
        }
        Join::Through { junction, source_key, target_key } => {
            let junction = Alias::new(junction.table());
            select.from(junction.clone()).inner_join(
                target.clone(),
                Expr::col((target.clone(), Alias::new("id")))
                    .equals((junction.clone(), Alias::new(target_key))),
            );
            (junction, source_key)
        }
    };

    select
        .expr_as(
            Expr::col((owner_table.clone(), Alias::new(owner_column))),
            Alias::new(OWNER_KEY),
        )
        .and_where(
            Expr::col((owner_table, Alias::new(owner_column))).is_in(owners.iter().copied()),
        )
        .order_by((target, Alias::new("id")), Order::Asc);
    select
}

/// Rows of a to-many association grouped by owner. Owners with no rows are
/// absent, so read with `remove(&id).unwrap_or_default()`.
pub async fn fetch_many<M, C>(
    db: &C,
    source: EntityKind,
    name: &str,
    owners: &[i32],
) -> Result<HashMap<i32, Vec<M>>, DbErr>
where
    M: Projection,
    C: ConnectionTrait,
{
    assert_eq!(
        association(source, name).join.cardinality(),
        Cardinality::Many,
        "{source:?}.{name} is not a to-many association"
    );

    let mut grouped: HashMap<i32, Vec<M>> = HashMap::new();
    for (owner, row) in fetch_related(db, source, name, owners).await? {
        grouped.entry(owner).or_default().push(row);
    }
    Ok(grouped)
}

/// The single row of a to-one association for each owner that has one.
pub async fn fetch_one<M, C>(
    db: &C,
    source: EntityKind,
    name: &str,
    owners: &[i32],
) -> Result<HashMap<i32, M>, DbErr>
where
    M: Projection,
    C: ConnectionTrait,
{
    assert_eq!(
        association(source, name).join.cardinality(),
        Cardinality::One,
        "{source:?}.{name} is not a to-one association"
    );

    Ok(fetch_related(db, source, name, owners).await?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentRow, PostSummary, PostTitle, UserRow, Username, VoteRow};
    use crate::testing::{seed_comment, seed_post, seed_user, seed_vote};
    use crate::entities::user::VotedPosts;
    use crate::Store;
    use sea_orm::{EntityTrait, ModelTrait};

    #[test]
    fn test_every_declaration_is_unique() {
        for (i, a) in ASSOCIATIONS.iter().enumerate() {
            assert!(
                ASSOCIATIONS[i + 1..]
                    .iter()
                    .all(|b| (a.source, a.name) != (b.source, b.name)),
                "{:?}.{} declared twice",
                a.source,
                a.name
            );
        }
        assert_eq!(ASSOCIATIONS.len(), 12);
        assert_eq!(association(User, "voted_posts").target, Post);
        assert_eq!(association(Comment, "post").join.cardinality(), Cardinality::One);
    }

    #[test]
    #[should_panic(expected = "declares no association named `followers`")]
    fn test_undeclared_association_panics() {
        association(User, "followers");
    }

    #[tokio::test]
    #[should_panic(expected = "yields Post rows")]
    async fn test_wrong_projection_panics() {
        let store = Store::in_memory().await.unwrap();
        let _ = fetch_many::<Username, _>(store.conn(), User, "posts", &[1]).await;
    }

    #[tokio::test]
    async fn test_has_many_groups_by_owner() {
        let store = Store::in_memory().await.unwrap();
        let db = store.conn();
        let ada = seed_user(db, "ada").await;
        let bob = seed_user(db, "bob").await;
        let first = seed_post(db, ada, "first").await;
        let second = seed_post(db, ada, "second").await;

        let mut posts = fetch_many::<PostSummary, _>(db, User, "posts", &[ada, bob])
            .await
            .unwrap();

        let ids: Vec<_> = posts.remove(&ada).unwrap_or_default().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(posts.remove(&bob).unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_belongs_to_resolves_one_row() {
        let store = Store::in_memory().await.unwrap();
        let db = store.conn();
        let ada = seed_user(db, "ada").await;
        let bob = seed_user(db, "bob").await;
        let post = seed_post(db, ada, "first").await;
        let by_ada = seed_comment(db, ada, post, "mine").await;
        let by_bob = seed_comment(db, bob, post, "yours").await;

        let authors = fetch_one::<Username, _>(db, Comment, "user", &[by_ada, by_bob, by_ada])
            .await
            .unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[&by_ada].username, "ada");
        assert_eq!(authors[&by_bob].username, "bob");

        let posts = fetch_one::<PostTitle, _>(db, Comment, "post", &[by_bob]).await.unwrap();
        assert_eq!(posts[&by_bob].title, "first");

        let comments = fetch_many::<CommentRow, _>(db, Post, "comments", &[post]).await.unwrap();
        assert_eq!(comments[&post].len(), 2);
    }

    #[tokio::test]
    async fn test_through_walks_the_junction() {
        let store = Store::in_memory().await.unwrap();
        let db = store.conn();
        let ada = seed_user(db, "ada").await;
        let bob = seed_user(db, "bob").await;
        let first = seed_post(db, ada, "first").await;
        let second = seed_post(db, ada, "second").await;
        seed_vote(db, ada, first).await;
        seed_vote(db, bob, first).await;
        seed_vote(db, bob, second).await;

        let mut voted = fetch_many::<PostTitle, _>(db, User, "voted_posts", &[ada, bob])
            .await
            .unwrap();
        let bob_titles: Vec<_> = voted.remove(&bob).unwrap_or_default().into_iter().map(|p| p.title).collect();
        assert_eq!(bob_titles, vec!["first", "second"]);
        assert_eq!(voted.remove(&ada).unwrap_or_default().len(), 1);

        // same answer as the entity-level link
        let bob_row = crate::entities::prelude::Users::find_by_id(bob)
            .one(db)
            .await
            .unwrap()
            .unwrap();
        let linked = bob_row.find_linked(VotedPosts).all(db).await.unwrap();
        assert_eq!(linked.len(), 2);

        let voters = fetch_many::<UserRow, _>(db, Post, "voters", &[first]).await.unwrap();
        let names: Vec<_> = voters[&first].iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["ada", "bob"]);

        let votes = fetch_many::<VoteRow, _>(db, Post, "votes", &[second]).await.unwrap();
        assert_eq!(votes[&second].len(), 1);
        assert_eq!(votes[&second][0].user_id, bob);
    }

    #[tokio::test]
    async fn test_no_owners_means_no_query() {
        let store = Store::in_memory().await.unwrap();
        let rows = fetch_many::<PostSummary, _>(store.conn(), User, "posts", &[]).await.unwrap();
        assert!(rows.is_empty());
    }
}
