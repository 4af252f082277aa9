//! Sessions and OAuth login.
//!
//! ```text
//! GET /auth/{provider}?redirect=/blog/x   → 307 to the provider, state = base64url("/blog/x")
//! GET /auth/{provider}/callback?code&state → upsert user, set `session` cookie, 307 to state
//! GET /auth/logout?redirect=/              → drop session, clear cookie, 307
//! GET /api/auth/providers                  → {"providers":[{"id":"google","name":"Google"}]}
//! ```
//!
//! User ids are `<provider>:<provider user id>`. In dev mode a request without
//! a valid session is treated as the ephemeral dev user.

use super::AppState;
use super::error::ApiError;
use crate::store::{Store, User};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use log::{info, warn};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenResponse, TokenUrl};
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_DAYS: i64 = 30;

pub const DEV_USER_ID: &str = "dev:ephemeral";
const DEV_USER_NAME: &str = "Test User";
const DEV_USER_EMAIL: &str = "dev@localhost";
const DEV_USER_AVATAR: &str = "https://avatar.vercel.sh/dev-user.svg?text=DU";

const USER_AGENT: &str = concat!("blogsmith/", env!("CARGO_PKG_VERSION"));

// =========================================================================
// Providers and credentials
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    GitHub,
}

impl Provider {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "google" => Some(Provider::Google),
            "github" => Some(Provider::GitHub),
            _ => None,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::GitHub => "GitHub",
        }
    }

    fn endpoints(self) -> (&'static str, &'static str) {
        match self {
            Provider::Google => (
                "https://accounts.google.com/o/oauth2/auth",
                "https://oauth2.googleapis.com/token",
            ),
            Provider::GitHub => (
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
            ),
        }
    }

    fn scopes(self) -> &'static [&'static str] {
        match self {
            Provider::Google => &[
                "https://www.googleapis.com/auth/userinfo.email",
                "https://www.googleapis.com/auth/userinfo.profile",
            ],
            Provider::GitHub => &["user:email"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// OAuth apps, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, Default)]
pub struct OAuthSettings {
    /// Origin the callbacks are registered under.
    pub base_url: String,
    pub google: Option<OAuthCredentials>,
    pub github: Option<OAuthCredentials>,
}

fn credentials_from_env(id_var: &str, secret_var: &str) -> Option<OAuthCredentials> {
    let client_id = std::env::var(id_var).ok().filter(|v| !v.is_empty())?;
    let client_secret = std::env::var(secret_var).ok().filter(|v| !v.is_empty())?;
    Some(OAuthCredentials {
        client_id,
        client_secret,
    })
}

impl OAuthSettings {
    pub fn from_env(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            google: credentials_from_env("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            github: credentials_from_env("GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"),
        }
    }

    pub fn credentials(&self, provider: Provider) -> Option<&OAuthCredentials> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::GitHub => self.github.as_ref(),
        }
    }

    pub fn configured(&self) -> Vec<Provider> {
        [Provider::Google, Provider::GitHub]
            .into_iter()
            .filter(|p| self.credentials(*p).is_some())
            .collect()
    }

    fn client(&self, provider: Provider) -> Result<BasicClient, ApiError> {
        let creds = self
            .credentials(provider)
            .ok_or(ApiError::Unavailable("OAuth not configured"))?;
        let (auth_url, token_url) = provider.endpoints();
        let redirect = format!("{}/auth/{}/callback", self.base_url, provider.slug());
        let invalid = |e: oauth2::url::ParseError| ApiError::Internal(format!("OAuth URL: {e}"));

        Ok(BasicClient::new(
            ClientId::new(creds.client_id.clone()),
            Some(ClientSecret::new(creds.client_secret.clone())),
            AuthUrl::new(auth_url.to_string()).map_err(invalid)?,
            Some(TokenUrl::new(token_url.to_string()).map_err(invalid)?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect).map_err(invalid)?))
    }
}

// =========================================================================
// Tokens, state, cookies
// =========================================================================

/// 32 random bytes, base64url.
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

pub fn encode_state(redirect: &str) -> String {
    URL_SAFE.encode(redirect.as_bytes())
}

/// Decoded redirect from an OAuth `state`, or `/` if it is unusable.
pub fn decode_state(state: &str) -> String {
    let decoded = URL_SAFE
        .decode(state)
        .or_else(|_| URL_SAFE_NO_PAD.decode(state))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    safe_redirect(decoded.as_deref())
}

/// Only same-site absolute paths are followed; anything else becomes `/`.
pub fn safe_redirect(target: Option<&str>) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => "/".to_string(),
    }
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    let expires = Utc::now() + Duration::days(SESSION_DAYS);
    format!(
        "{SESSION_COOKIE}={token}; Path=/; Expires={}; Max-Age={}; HttpOnly; SameSite=Lax",
        expires.format("%a, %d %b %Y %H:%M:%S GMT"),
        SESSION_DAYS * 24 * 60 * 60
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Lax")
}

// =========================================================================
// Current user
// =========================================================================

/// The dev user exists in the store for the lifetime of a dev server.
pub async fn ensure_dev_user(store: &Store) -> Result<(), ApiError> {
    store
        .upsert_user(DEV_USER_ID, DEV_USER_EMAIL, DEV_USER_NAME, DEV_USER_AVATAR)
        .await?;
    Ok(())
}

/// Id of the signed-in user, falling back to the dev user in dev mode.
pub async fn current_user_id(state: &AppState, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    if let Some(token) = session_token(headers) {
        if let Some(user_id) = state.store.get_session(&token).await? {
            return Ok(Some(user_id));
        }
    }
    Ok(state.dev_mode.then(|| DEV_USER_ID.to_string()))
}

/// The signed-in user's row. A session whose user no longer exists counts as
/// signed out.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    match current_user_id(state, headers).await? {
        Some(id) => Ok(state.store.get_user(&id).await?),
        None => Ok(None),
    }
}

pub async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    current_user(state, headers).await?.ok_or(ApiError::Unauthorized)
}

// =========================================================================
// Provider user info
// =========================================================================

/// Identity fields common to both providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
}

#[derive(Deserialize)]
struct GoogleUser {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

#[derive(Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    #[serde(default)]
    avatar_url: String,
}

#[derive(Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn fetch_profile(http: &reqwest::Client, provider: Provider, access_token: &str) -> Result<OAuthProfile, ApiError> {
    match provider {
        Provider::Google => {
            let user: GoogleUser = http
                .get("https://www.googleapis.com/oauth2/v2/userinfo")
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(OAuthProfile {
                id: format!("google:{}", user.id),
                email: user.email,
                name: user.name,
                avatar: user.picture,
            })
        }
        Provider::GitHub => {
            let user: GitHubUser = github_get(http, "https://api.github.com/user", access_token).await?;
            let email = match non_empty(user.email) {
                Some(email) => email,
                None => {
                    let emails: Vec<GitHubEmail> =
                        github_get(http, "https://api.github.com/user/emails", access_token).await?;
                    emails
                        .into_iter()
                        .find(|e| e.primary)
                        .map(|e| e.email)
                        .unwrap_or_default()
                }
            };
            Ok(OAuthProfile {
                id: format!("github:{}", user.id),
                email,
                name: non_empty(user.name).unwrap_or_else(|| user.login.clone()),
                avatar: user.avatar_url,
            })
        }
    }
}

async fn github_get<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    access_token: &str,
) -> Result<T, ApiError> {
    Ok(http
        .get(url)
        .bearer_auth(access_token)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?)
}

// =========================================================================
// Handlers
// =========================================================================

#[derive(Deserialize)]
pub struct RedirectQuery {
    redirect: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

fn provider_or_404(slug: &str) -> Result<Provider, ApiError> {
    Provider::from_slug(slug).ok_or(ApiError::NotFound("Unknown provider"))
}

pub async fn start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> Result<Redirect, ApiError> {
    let provider = provider_or_404(&provider)?;
    let client = state.oauth.client(provider)?;
    let csrf = encode_state(&safe_redirect(query.redirect.as_deref()));

    let mut request = client.authorize_url(move || CsrfToken::new(csrf));
    for scope in provider.scopes() {
        request = request.add_scope(Scope::new(scope.to_string()));
    }
    if provider == Provider::Google {
        request = request.add_extra_param("access_type", "offline");
    }
    let (url, _) = request.url();
    Ok(Redirect::temporary(url.as_str()))
}

pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let provider = provider_or_404(&provider)?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::BadRequest("Missing code"))?;
    let client = state.oauth.client(provider)?;

    let token = client
        .exchange_code(AuthorizationCode::new(code))
        .request_async(async_http_client)
        .await
        .map_err(|e| ApiError::Internal(format!("{} token exchange: {e}", provider.slug())))?;
    let profile = fetch_profile(&state.http, provider, token.access_token().secret()).await?;

    state
        .store
        .upsert_user(&profile.id, &profile.email, &profile.name, &profile.avatar)
        .await?;
    let session = new_session_token();
    state
        .store
        .create_session(&session, &profile.id, Utc::now() + Duration::days(SESSION_DAYS))
        .await?;
    info!("{} signed in via {}", profile.id, provider.display_name());

    let target = query.state.as_deref().map(decode_state).unwrap_or_else(|| "/".to_string());
    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie(&session))]),
        Redirect::temporary(&target),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RedirectQuery>,
) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.store.delete_session(&token).await {
            warn!("could not delete session: {e}");
        }
    }
    let target = safe_redirect(query.redirect.as_deref());
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Redirect::temporary(&target),
    )
        .into_response()
}

#[derive(Serialize)]
struct ProviderInfo {
    id: &'static str,
    name: &'static str,
}

#[derive(Serialize)]
pub struct ProvidersResponse {
    providers: Vec<ProviderInfo>,
}

pub async fn providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let providers = state
        .oauth
        .configured()
        .into_iter()
        .map(|p| ProviderInfo {
            id: p.slug(),
            name: p.display_name(),
        })
        .collect();
    Json(ProvidersResponse { providers })
}
