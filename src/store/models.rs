//! Rows the store hands back.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Reactions a visitor may leave on a post.
pub const ALLOWED_EMOJIS: [&str; 5] = ["👍", "\u{2764}\u{FE0F}", "😂", "💡", "😢"];

pub fn is_allowed_emoji(emoji: &str) -> bool {
    ALLOWED_EMOJIS.contains(&emoji)
}

/// An authenticated identity. `id` is `provider:provider_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionCount {
    pub emoji: String,
    pub count: i64,
    /// Up to three most recent reactors, newest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub user_id: String,
    pub post_slug: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment joined with its author's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentWithUser {
    pub comment: Comment,
    pub user_name: String,
    pub user_avatar: String,
}

/// One full-text hit. Field names are the wire format of `/api/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResult {
    pub slug: String,
    pub collection_slug: String,
    pub title: String,
    pub description: String,
    /// Content excerpt with matches wrapped in `<mark>`.
    pub snippet: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub date: String,
}
