//! HTTP server: generated site plus the comments/reactions/search API.
//!
//! ## Routes
//!
//! ```text
//! GET  /api/reactions?post=         counts per emoji
//! POST /api/reactions               toggle {post, emoji}           (auth)
//! GET  /api/reactions/user?post=    the caller's emojis            (auth)
//! GET  /api/me                      {id, email, name, avatar}      (auth)
//! GET  /api/search?q=               ranked hits
//! GET  /api/comments?post=          newest first
//! POST /api/comments                {post, content}  → 201         (auth)
//! PUT  /api/comments/{id}           {content}                      (auth, owner)
//! DEL  /api/comments/{id}           → 204                          (auth, owner)
//! GET  /api/auth/providers          configured OAuth providers
//! GET  /auth/{provider}[/callback]  OAuth login
//! GET  /auth/logout
//! GET  /github /linkedin /email     301 to the profile links
//! GET  /ws                          live reload (dev only)
//! *    everything else              files from the output directory
//! ```
//!
//! ## Lifecycle
//!
//! `serve` answers from an existing output directory. `dev` additionally
//! builds once at startup, watches the inputs, and signs every visitor in as
//! an ephemeral test user whose data is purged on shutdown.

mod api;
mod auth;
mod error;
mod reload;
mod static_files;

pub use auth::{DEV_USER_ID, OAuthCredentials, OAuthSettings, Provider};
pub use error::ApiError;

use crate::config::{BuildConfig, ProfileConfig};
use crate::pipeline::{self, BuildError};
use crate::store::{BlockingIndex, Store, StoreError};
use axum::Router;
use axum::routing::{get, put};
use log::{error, info, warn};
use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Bound on draining in-flight requests after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct ServeConfig {
    pub build: BuildConfig,
    pub port: u16,
    pub db_path: PathBuf,
    pub oauth: OAuthSettings,
}

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub output_dir: Arc<PathBuf>,
    pub profile: Arc<ProfileConfig>,
    pub oauth: Arc<OAuthSettings>,
    pub dev_mode: bool,
    /// Present in dev mode; each send tells `/ws` clients to reload.
    pub reload: Option<broadcast::Sender<()>>,
    pub http: reqwest::Client,
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/reactions", get(api::reaction_counts).post(api::toggle_reaction))
        .route("/api/reactions/user", get(api::user_reactions))
        .route("/api/me", get(api::me))
        .route("/api/search", get(api::search))
        .route("/api/comments", get(api::list_comments).post(api::create_comment))
        .route("/api/comments/{id}", put(api::update_comment).delete(api::delete_comment))
        .route("/api/auth/providers", get(auth::providers))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/{provider}", get(auth::start))
        .route("/auth/{provider}/callback", get(auth::callback))
        .route("/github", get(api::github))
        .route("/linkedin", get(api::linkedin))
        .route("/email", get(api::email));
    if state.dev_mode {
        app = app.route("/ws", get(reload::websocket));
    }
    app.fallback(static_files::serve).with_state(state)
}

/// Run until SIGINT/SIGTERM.
pub async fn run(config: ServeConfig) -> Result<(), ServerError> {
    let store = Store::open(&config.db_path).await?;
    let expired = store.clean_expired_sessions().await?;
    if expired > 0 {
        info!("removed {expired} expired sessions");
    }

    let dev_mode = config.build.dev_mode;
    let mut reload = None;
    let mut _watcher = None;
    if dev_mode {
        auth::ensure_dev_user(&store).await?;
        initial_build(&config.build, &store).await;

        let (tx, _) = broadcast::channel(16);
        _watcher = Some(reload::spawn_watcher(
            config.build.clone(),
            store.clone(),
            Handle::current(),
            tx.clone(),
        )?);
        reload = Some(tx);
    }

    let state = AppState {
        store: store.clone(),
        output_dir: Arc::new(config.build.output_dir.clone()),
        profile: Arc::new(config.build.site.profile.clone()),
        oauth: Arc::new(config.oauth),
        dev_mode,
        reload,
        http: reqwest::Client::new(),
    };

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        "serving {} on http://localhost:{}{}",
        config.build.output_dir.display(),
        config.port,
        if dev_mode { " (dev mode)" } else { "" }
    );

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let shutdown_store = store.clone();
    let server = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutting down");
            if dev_mode {
                match shutdown_store.purge_user_data(DEV_USER_ID).await {
                    Ok(()) => info!("purged dev user data"),
                    Err(e) => warn!("could not purge dev user data: {e}"),
                }
            }
            let _ = signalled_tx.send(());
        })
        .into_future();

    // The grace timer only starts once a signal has arrived.
    let drain_timeout = async {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => result?,
        _ = drain_timeout => warn!("in-flight requests still open after {SHUTDOWN_GRACE:?}, exiting"),
    }

    store.close().await;
    Ok(())
}

/// First dev build. A failure is logged; the server still starts so the
/// watcher can pick up the fix.
async fn initial_build(config: &BuildConfig, store: &Store) {
    let config = config.clone();
    let index = BlockingIndex::new(store.clone(), Handle::current());
    let result = tokio::task::spawn_blocking(move || pipeline::build(&config, Some(&index))).await;
    match result {
        Ok(Ok(report)) => info!("initial build: {} pages", report.pages),
        Ok(Err(e)) => error!("initial build failed: {e}"),
        Err(e) => error!("initial build panicked: {e}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("could not listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("could not listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
