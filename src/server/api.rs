//! JSON API and profile redirects.
//!
//! Bodies are parsed by hand after the auth check so an anonymous write is a
//! 401 regardless of what it sent.

use super::AppState;
use super::auth::{current_user, require_user};
use super::error::ApiError;
use crate::markdown::render_comment;
use crate::store::{Comment, ReactionCount, SEARCH_LIMIT, SearchResult, StoreError, User, is_allowed_emoji};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on a comment body, in bytes, after trimming.
pub const MAX_COMMENT_BYTES: usize = 10 * 1024;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("Invalid request body"))
}

#[derive(Deserialize)]
pub struct PostQuery {
    post: Option<String>,
}

impl PostQuery {
    fn require(self) -> Result<String, ApiError> {
        self.post
            .filter(|p| !p.is_empty())
            .ok_or(ApiError::BadRequest("Missing post parameter"))
    }
}

// =========================================================================
// Reactions
// =========================================================================

pub async fn reaction_counts(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<ReactionCount>>, ApiError> {
    let post = query.require()?;
    Ok(Json(state.store.reaction_counts(&post).await?))
}

#[derive(Deserialize)]
struct ReactionRequest {
    #[serde(default)]
    post: String,
    #[serde(default)]
    emoji: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    added: bool,
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ToggleResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let request: ReactionRequest = parse_body(&body)?;
    if request.post.is_empty() || request.emoji.is_empty() {
        return Err(ApiError::BadRequest("Missing post or emoji"));
    }
    if !is_allowed_emoji(&request.emoji) {
        return Err(ApiError::BadRequest("Invalid emoji"));
    }
    let added = state
        .store
        .toggle_reaction(&user.id, &request.post, &request.emoji)
        .await?;
    Ok(Json(ToggleResponse { added }))
}

pub async fn user_reactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let post = query.require()?;
    Ok(Json(state.store.user_reactions(&user.id, &post).await?))
}

// =========================================================================
// Current user, search
// =========================================================================

#[derive(Serialize)]
pub struct MeResponse {
    id: String,
    email: String,
    name: String,
    avatar: String,
}

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<MeResponse>, ApiError> {
    let user = current_user(&state, &headers).await?.ok_or(ApiError::Unauthorized)?;
    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        avatar: user.avatar_url,
    }))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Json<Vec<SearchResult>> {
    if query.q.trim().is_empty() {
        return Json(Vec::new());
    }
    Json(state.store.search(&query.q, SEARCH_LIMIT).await)
}

// =========================================================================
// Comments
// =========================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    id: i64,
    content: String,
    content_html: String,
    created_at: String,
    updated_at: String,
    user_id: String,
    user_name: String,
    user_avatar: String,
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl CommentResponse {
    fn new(comment: Comment, user_name: String, user_avatar: String) -> Self {
        Self {
            id: comment.id,
            content_html: render_comment(&comment.content),
            created_at: rfc3339(comment.created_at),
            updated_at: rfc3339(comment.updated_at),
            user_id: comment.user_id,
            content: comment.content,
            user_name,
            user_avatar,
        }
    }

    fn by(comment: Comment, user: &User) -> Self {
        Self::new(comment, user.name.clone(), user.avatar_url.clone())
    }
}

/// Trimmed comment text, rejected when empty or over the size cap.
fn comment_text(raw: &str, empty: &'static str) -> Result<String, ApiError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest(empty));
    }
    if text.len() > MAX_COMMENT_BYTES {
        return Err(ApiError::BadRequest("Content too long"));
    }
    Ok(text.to_string())
}

fn comment_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::BadRequest("Invalid comment ID"))
}

fn not_owned(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("Comment not found or not owned by user"),
        other => other.into(),
    }
}

pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let post = query.require()?;
    let comments = state
        .store
        .list_comments(&post)
        .await?
        .into_iter()
        .map(|c| CommentResponse::new(c.comment, c.user_name, c.user_avatar))
        .collect();
    Ok(Json(comments))
}

#[derive(Deserialize)]
struct NewComment {
    #[serde(default)]
    post: String,
    #[serde(default)]
    content: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let user = require_user(&state, &headers).await?;
    let request: NewComment = parse_body(&body)?;
    if request.post.is_empty() {
        return Err(ApiError::BadRequest("Missing post or content"));
    }
    let content = comment_text(&request.content, "Missing post or content")?;

    let comment = state.store.create_comment(&user.id, &request.post, &content).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::by(comment, &user))).into_response())
}

#[derive(Deserialize)]
struct EditComment {
    #[serde(default)]
    content: String,
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CommentResponse>, ApiError> {
    let id = comment_id(&id)?;
    let user = require_user(&state, &headers).await?;
    let request: EditComment = parse_body(&body)?;
    let content = comment_text(&request.content, "Content cannot be empty")?;

    state.store.update_comment(id, &user.id, &content).await.map_err(not_owned)?;
    let comment = state
        .store
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("comment {id} vanished after update")))?;
    Ok(Json(CommentResponse::by(comment, &user)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let id = comment_id(&id)?;
    let user = require_user(&state, &headers).await?;
    state.store.delete_comment(id, &user.id).await.map_err(not_owned)?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Profile redirects
// =========================================================================

fn moved_permanently(location: String) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

pub async fn github(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.profile.github.as_str() {
        "" => Err(ApiError::NotFound("GitHub profile not configured")),
        url => Ok(moved_permanently(url.to_string())),
    }
}

pub async fn linkedin(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.profile.linkedin.as_str() {
        "" => Err(ApiError::NotFound("LinkedIn profile not configured")),
        url => Ok(moved_permanently(url.to_string())),
    }
}

pub async fn email(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.profile.email.as_str() {
        "" => Err(ApiError::NotFound("Email not configured")),
        address => Ok(moved_permanently(format!("mailto:{address}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_rules() {
        assert_eq!(comment_text("  hi  ", "empty").unwrap(), "hi");
        assert!(matches!(comment_text("   ", "empty"), Err(ApiError::BadRequest("empty"))));

        let at_limit = "a".repeat(MAX_COMMENT_BYTES);
        assert!(comment_text(&at_limit, "empty").is_ok());
        let over = "a".repeat(MAX_COMMENT_BYTES + 1);
        assert!(matches!(comment_text(&over, "empty"), Err(ApiError::BadRequest("Content too long"))));
    }

    #[test]
    fn comment_ids() {
        assert_eq!(comment_id("42").unwrap(), 42);
        assert!(matches!(comment_id("abc"), Err(ApiError::BadRequest("Invalid comment ID"))));
    }

    #[test]
    fn comment_response_escapes_markup() {
        let now = Utc::now();
        let comment = Comment {
            id: 7,
            user_id: "github:1".into(),
            post_slug: "hello".into(),
            content: "<script>alert(1)</script> **hi**".into(),
            created_at: now,
            updated_at: now,
        };
        let response = CommentResponse::new(comment, "Ada".into(), String::new());
        assert!(!response.content_html.contains("<script>"));
        assert!(response.content_html.contains("&lt;script&gt;"));
        assert!(response.content_html.contains("<strong>hi</strong>"));
        assert!(response.created_at.ends_with('Z'));

        let json = serde_json::to_value(&response).unwrap();
        for key in ["id", "content", "contentHtml", "createdAt", "updatedAt", "userId", "userName", "userAvatar"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
