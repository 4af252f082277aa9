//! SQLite persistence for the dynamic layer.
//!
//! One database file holds everything the server writes and the build's
//! search index:
//!
//! | Table          | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | `users`        | OAuth identities, upserted on every login            |
//! | `sessions`     | cookie token → user id, with expiry                  |
//! | `reactions`    | (user, post, emoji), unique; inserting again removes |
//! | `comments`     | free text per (user, post)                           |
//! | `search_index` | FTS5 table rebuilt by every site build               |
//!
//! The schema is created with `CREATE … IF NOT EXISTS` on open, so a fresh
//! path is a valid database.

mod models;

pub use models::{ALLOWED_EMOJIS, Comment, CommentWithUser, ReactionCount, SearchResult, User, is_allowed_emoji};

use crate::search::{IndexRecord, SearchError, SearchIndex};
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use thiserror::Error;
use tokio::runtime::Handle;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("not found")]
    NotFound,
}

const SCHEMA: [&str; 9] = [
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        name TEXT,
        avatar_url TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS reactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id),
        post_slug TEXT NOT NULL,
        emoji TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(user_id, post_slug, emoji)
    )",
    "CREATE INDEX IF NOT EXISTS idx_reactions_post ON reactions(post_slug)",
    "CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        expires_at DATETIME NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id),
        post_slug TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_slug)",
    "CREATE INDEX IF NOT EXISTS idx_comments_created ON comments(post_slug, created_at DESC)",
    "CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(
        slug UNINDEXED,
        collection_slug UNINDEXED,
        title,
        description,
        content,
        type UNINDEXED,
        url UNINDEXED,
        date UNINDEXED
    )",
];

pub const SEARCH_LIMIT: i64 = 20;
const REACTION_NAMES: i64 = 3;

/// Handle to the database. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at `path`, then bootstrap the schema.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        debug!("opened store at {}", path.display());
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Users and sessions
    // =========================================================================

    /// Insert a user, or refresh email/name/avatar for an existing id.
    pub async fn upsert_user(&self, id: &str, email: &str, name: &str, avatar_url: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, email, name, avatar_url, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 name = excluded.name,
                 avatar_url = excluded.avatar_url",
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(avatar_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, COALESCE(name, '') AS name, COALESCE(avatar_url, '') AS avatar_url, created_at
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            avatar_url: row.get("avatar_url"),
            created_at: row.get("created_at"),
        }))
    }

    pub async fn create_session(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// User id behind `token`. An expired session is deleted and reads as absent.
    pub async fn get_session(&self, token: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if Utc::now() > expires_at {
            self.delete_session(token).await?;
            return Ok(None);
        }
        Ok(Some(row.get("user_id")))
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clean_expired_sessions(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Reactions
    // =========================================================================

    /// Add the reaction, or remove it if the user already left it.
    /// Returns `true` when the reaction now exists.
    pub async fn toggle_reaction(&self, user_id: &str, post_slug: &str, emoji: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM reactions WHERE user_id = ? AND post_slug = ? AND emoji = ?")
            .bind(user_id)
            .bind(post_slug)
            .bind(emoji)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query("INSERT INTO reactions (user_id, post_slug, emoji, created_at) VALUES (?, ?, ?, ?)")
                .bind(user_id)
                .bind(post_slug)
                .bind(emoji)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(removed == 0)
    }

    /// Per-emoji totals for a post, each with the latest few reactor names.
    pub async fn reaction_counts(&self, post_slug: &str) -> Result<Vec<ReactionCount>, StoreError> {
        let rows = sqlx::query(
            "SELECT emoji, COUNT(*) AS count FROM reactions
             WHERE post_slug = ? GROUP BY emoji ORDER BY MIN(id)",
        )
        .bind(post_slug)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let emoji: String = row.get("emoji");
            let users = sqlx::query_scalar(
                "SELECT COALESCE(u.name, '') FROM reactions r
                 JOIN users u ON r.user_id = u.id
                 WHERE r.post_slug = ? AND r.emoji = ?
                 ORDER BY r.created_at DESC, r.id DESC
                 LIMIT ?",
            )
            .bind(post_slug)
            .bind(&emoji)
            .bind(REACTION_NAMES)
            .fetch_all(&self.pool)
            .await?;
            counts.push(ReactionCount {
                emoji,
                count: row.get("count"),
                users,
            });
        }
        Ok(counts)
    }

    pub async fn user_reactions(&self, user_id: &str, post_slug: &str) -> Result<Vec<String>, StoreError> {
        let emojis = sqlx::query_scalar("SELECT emoji FROM reactions WHERE user_id = ? AND post_slug = ? ORDER BY id")
            .bind(user_id)
            .bind(post_slug)
            .fetch_all(&self.pool)
            .await?;
        Ok(emojis)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Swap the whole index for `records` in one transaction.
    pub async fn replace_search_index(&self, records: &[IndexRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM search_index").execute(&mut *tx).await?;
        for record in records {
            sqlx::query(
                "INSERT INTO search_index (slug, collection_slug, title, description, content, type, url, date)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.slug)
            .bind(&record.collection_slug)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.content)
            .bind(&record.kind)
            .bind(&record.url)
            .bind(&record.date)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!("search index now holds {} posts", records.len());
        Ok(())
    }

    /// Ranked prefix search. Queries FTS5 cannot parse yield no results.
    pub async fn search(&self, query: &str, limit: i64) -> Vec<SearchResult> {
        let Some(fts_query) = fuzzy_query(query) else {
            return Vec::new();
        };
        let rows = sqlx::query(
            "SELECT slug, collection_slug, title, description,
                    snippet(search_index, 4, '<mark>', '</mark>', '...', 32) AS snippet,
                    type, url, date
             FROM search_index
             WHERE search_index MATCH ?
             ORDER BY rank
             LIMIT ?",
        )
        .bind(&fts_query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows.iter().map(search_result).collect(),
            Err(e) => {
                debug!("search for {fts_query:?} failed: {e}");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn create_comment(&self, user_id: &str, post_slug: &str, content: &str) -> Result<Comment, StoreError> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO comments (user_id, post_slug, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(post_slug)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Comment {
            id,
            user_id: user_id.to_string(),
            post_slug: post_slug.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Comments on a post with author details, newest first.
    pub async fn list_comments(&self, post_slug: &str) -> Result<Vec<CommentWithUser>, StoreError> {
        let rows = sqlx::query(
            "SELECT c.id, c.user_id, c.post_slug, c.content, c.created_at, c.updated_at,
                    COALESCE(u.name, '') AS user_name, COALESCE(u.avatar_url, '') AS user_avatar
             FROM comments c
             JOIN users u ON c.user_id = u.id
             WHERE c.post_slug = ?
             ORDER BY c.created_at DESC, c.id DESC",
        )
        .bind(post_slug)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CommentWithUser {
                comment: comment(row),
                user_name: row.get("user_name"),
                user_avatar: row.get("user_avatar"),
            })
            .collect())
    }

    pub async fn get_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, post_slug, content, created_at, updated_at FROM comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(comment))
    }

    /// Replace a comment's text. [`StoreError::NotFound`] unless `user_id` owns it.
    pub async fn update_comment(&self, id: i64, user_id: &str, content: &str) -> Result<(), StoreError> {
        let affected = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ? AND user_id = ?")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// [`StoreError::NotFound`] unless `user_id` owns the comment.
    pub async fn delete_comment(&self, id: i64, user_id: &str) -> Result<(), StoreError> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Remove every comment, reaction and session belonging to `user_id`.
    pub async fn purge_user_data(&self, user_id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for table in ["comments", "reactions", "sessions"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        post_slug: row.get("post_slug"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn search_result(row: &SqliteRow) -> SearchResult {
    SearchResult {
        slug: row.get("slug"),
        collection_slug: row.get("collection_slug"),
        title: row.get("title"),
        description: row.get("description"),
        snippet: row.get("snippet"),
        kind: row.get("type"),
        url: row.get("url"),
        date: row.get("date"),
    }
}

/// Quote a token for FTS5 when it contains syntax characters.
fn escape_token(token: &str) -> String {
    let token = token.replace('"', "\"\"");
    if token.contains([' ', ':', '"', '*']) {
        format!("\"{token}\"")
    } else {
        token
    }
}

/// `rust own` → `rust* OR own*`. `None` for a blank query.
fn fuzzy_query(query: &str) -> Option<String> {
    let parts: Vec<String> = query
        .split_whitespace()
        .map(|token| format!("{}*", escape_token(token)))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" OR "))
}

/// Lets the synchronous build pipeline write the index through an async store.
///
/// Must be used from a thread that may block, such as a `spawn_blocking` task.
pub struct BlockingIndex {
    store: Store,
    handle: Handle,
}

impl BlockingIndex {
    pub fn new(store: Store, handle: Handle) -> Self {
        Self { store, handle }
    }
}

impl SearchIndex for BlockingIndex {
    fn replace_all(&self, records: &[IndexRecord]) -> Result<(), SearchError> {
        self.handle
            .block_on(self.store.replace_search_index(records))
            .map_err(|e| SearchError(Box::new(e)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    pub async fn open_temp() -> (TempDir, Store) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("data/site.db")).await.unwrap();
        (tmp, store)
    }

    async fn with_users(store: &Store) {
        store.upsert_user("github:1", "ada@example.com", "Ada", "https://a/ada.png").await.unwrap();
        store.upsert_user("google:2", "bob@example.com", "Bob", "").await.unwrap();
    }

    fn record(slug: &str, title: &str, content: &str) -> IndexRecord {
        IndexRecord {
            slug: slug.into(),
            collection_slug: "blog".into(),
            title: title.into(),
            description: String::new(),
            content: content.into(),
            kind: "blog".into(),
            url: format!("/blog/{slug}"),
            date: String::new(),
        }
    }

    // =========================================================================
    // Users and sessions
    // =========================================================================

    #[tokio::test]
    async fn open_creates_parent_directory_and_is_reopenable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/site.db");
        let store = Store::open(&path).await.unwrap();
        store.close().await;
        assert!(path.is_file());
        Store::open(&path).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_refreshes_profile() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        store.upsert_user("github:1", "new@example.com", "Ada L", "").await.unwrap();

        let user = store.get_user("github:1").await.unwrap().unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.name, "Ada L");
        assert!(store.get_user("github:404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        let later = Utc::now() + Duration::days(30);
        store.create_session("tok", "github:1", later).await.unwrap();

        assert_eq!(store.get_session("tok").await.unwrap().as_deref(), Some("github:1"));
        store.delete_session("tok").await.unwrap();
        assert_eq!(store.get_session("tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_session_deleted_on_read() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        store.create_session("old", "github:1", Utc::now() - Duration::hours(1)).await.unwrap();
        store.create_session("old2", "github:1", Utc::now() - Duration::hours(1)).await.unwrap();

        assert_eq!(store.get_session("old").await.unwrap(), None);
        assert_eq!(store.clean_expired_sessions().await.unwrap(), 1);
    }

    // =========================================================================
    // Reactions
    // =========================================================================

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        assert!(store.toggle_reaction("github:1", "blog/a", "👍").await.unwrap());
        assert_eq!(store.user_reactions("github:1", "blog/a").await.unwrap(), vec!["👍"]);
        assert!(!store.toggle_reaction("github:1", "blog/a", "👍").await.unwrap());
        assert!(store.user_reactions("github:1", "blog/a").await.unwrap().is_empty());
        assert!(store.reaction_counts("blog/a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn counts_list_recent_names() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        store.toggle_reaction("github:1", "blog/a", "💡").await.unwrap();
        store.toggle_reaction("google:2", "blog/a", "💡").await.unwrap();
        store.toggle_reaction("google:2", "blog/a", "😂").await.unwrap();
        store.toggle_reaction("google:2", "blog/b", "😂").await.unwrap();

        let counts = store.reaction_counts("blog/a").await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].emoji, "💡");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[0].users, vec!["Bob", "Ada"]);
        assert_eq!(counts[1].count, 1);
    }

    // =========================================================================
    // Search
    // =========================================================================

    #[test]
    fn query_building() {
        assert_eq!(fuzzy_query("   "), None);
        assert_eq!(fuzzy_query("rust").as_deref(), Some("rust*"));
        assert_eq!(fuzzy_query("rust own").as_deref(), Some("rust* OR own*"));
        assert_eq!(fuzzy_query("a:b").as_deref(), Some("\"a:b\"*"));
        assert_eq!(fuzzy_query("say\"hi").as_deref(), Some("\"say\"\"hi\"*"));
    }

    #[tokio::test]
    async fn search_prefix_and_snippet() {
        let (_tmp, store) = open_temp().await;
        store
            .replace_search_index(&[
                record("ownership", "Ownership", "Borrowing rules keep memory safe"),
                record("cargo", "Cargo", "Build tooling for crates"),
            ])
            .await
            .unwrap();

        let hits = store.search("borrow", SEARCH_LIMIT).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "ownership");
        assert!(hits[0].snippet.contains("<mark>Borrowing</mark>"));

        let either = store.search("borrow crates", SEARCH_LIMIT).await;
        assert_eq!(either.len(), 2);
    }

    #[tokio::test]
    async fn replace_drops_old_records() {
        let (_tmp, store) = open_temp().await;
        store.replace_search_index(&[record("old", "Old", "legacy words")]).await.unwrap();
        store.replace_search_index(&[record("new", "New", "fresh words")]).await.unwrap();
        assert!(store.search("legacy", SEARCH_LIMIT).await.is_empty());
        assert_eq!(store.search("fresh", SEARCH_LIMIT).await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_query_is_empty() {
        let (_tmp, store) = open_temp().await;
        store.replace_search_index(&[record("a", "A", "text")]).await.unwrap();
        assert!(store.search("AND", SEARCH_LIMIT).await.is_empty());
        assert!(store.search("", SEARCH_LIMIT).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_index_from_blocking_thread() {
        let (_tmp, store) = open_temp().await;
        let index = BlockingIndex::new(store.clone(), Handle::current());
        tokio::task::spawn_blocking(move || index.replace_all(&[record("a", "Alpha", "words")]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.search("alpha", SEARCH_LIMIT).await.len(), 1);
    }

    // =========================================================================
    // Comments
    // =========================================================================

    #[tokio::test]
    async fn comments_newest_first_with_author() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        let first = store.create_comment("github:1", "blog/a", "first").await.unwrap();
        let second = store.create_comment("google:2", "blog/a", "second").await.unwrap();
        store.create_comment("google:2", "blog/b", "elsewhere").await.unwrap();

        let comments = store.list_comments("blog/a").await.unwrap();
        let ids: Vec<i64> = comments.iter().map(|c| c.comment.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(comments[1].user_name, "Ada");
        assert_eq!(comments[1].user_avatar, "https://a/ada.png");
    }

    #[tokio::test]
    async fn only_owner_edits_or_deletes() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        let c = store.create_comment("github:1", "blog/a", "hello").await.unwrap();

        assert!(matches!(store.update_comment(c.id, "google:2", "hijack").await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete_comment(c.id, "google:2").await, Err(StoreError::NotFound)));

        store.update_comment(c.id, "github:1", "edited").await.unwrap();
        let stored = store.get_comment(c.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "edited");
        assert!(stored.updated_at >= stored.created_at);

        store.delete_comment(c.id, "github:1").await.unwrap();
        assert!(store.get_comment(c.id).await.unwrap().is_none());
        assert!(matches!(store.delete_comment(c.id, "github:1").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn purge_removes_everything_for_user() {
        let (_tmp, store) = open_temp().await;
        with_users(&store).await;
        store.create_comment("github:1", "blog/a", "x").await.unwrap();
        store.create_comment("google:2", "blog/a", "y").await.unwrap();
        store.toggle_reaction("github:1", "blog/a", "👍").await.unwrap();
        store.create_session("t", "github:1", Utc::now() + Duration::days(1)).await.unwrap();

        store.purge_user_data("github:1").await.unwrap();

        assert_eq!(store.list_comments("blog/a").await.unwrap().len(), 1);
        assert!(store.reaction_counts("blog/a").await.unwrap().is_empty());
        assert_eq!(store.get_session("t").await.unwrap(), None);
    }
}
