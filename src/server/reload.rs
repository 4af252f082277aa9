//! Dev-mode live reload.
//!
//! ```text
//! notify ──► watcher thread ──(100ms quiet)──► pipeline::build ──► broadcast ──► /ws clients
//! ```
//!
//! The watcher runs on its own OS thread so a rebuild never occupies a
//! request worker. A failed rebuild is logged and leaves the previous output
//! in place; clients are only told to reload after a successful one.

use super::AppState;
use crate::config::BuildConfig;
use crate::pipeline;
use crate::store::{BlockingIndex, Store};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub const DEBOUNCE: Duration = Duration::from_millis(100);

// =========================================================================
// WebSocket
// =========================================================================

pub async fn websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    match state.reload {
        Some(reload) => ws.on_upgrade(move |socket| reload_client(socket, reload.subscribe())),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn reload_client(socket: WebSocket, mut reloads: broadcast::Receiver<()>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            signal = reloads.recv() => match signal {
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    if sender.send(Message::Text("reload".into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("reload client disconnected");
}

// =========================================================================
// Watcher
// =========================================================================

/// Editor swap and backup files.
fn is_editor_artifact(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(ext, "swp" | "swo" | "swx" | "tmp" | "bak") || name.ends_with('~') || name.starts_with(".#")
}

/// Creates, writes and removes trigger a rebuild; metadata and access
/// events do not.
pub fn is_relevant(event: &Event) -> bool {
    let kind_matters = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    kind_matters && (event.paths.is_empty() || event.paths.iter().any(|p| !is_editor_artifact(p)))
}

/// Start watching the build inputs. The returned watcher must be kept alive;
/// dropping it stops the rebuild thread.
pub fn spawn_watcher(
    config: BuildConfig,
    store: Store,
    handle: Handle,
    reloads: broadcast::Sender<()>,
) -> notify::Result<RecommendedWatcher> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;

    for dir in [&config.content_dir, &config.template_dir, &config.static_dir] {
        if dir.exists() {
            watcher.watch(dir, RecursiveMode::Recursive)?;
            debug!("watching {}", dir.display());
        }
    }

    std::thread::Builder::new()
        .name("rebuild".into())
        .spawn(move || {
            let index = BlockingIndex::new(store, handle);
            while let Ok(first) = rx.recv() {
                match first {
                    Ok(event) if is_relevant(&event) => {}
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("watch error: {e}");
                        continue;
                    }
                }
                // Swallow the rest of the burst.
                loop {
                    match rx.recv_timeout(DEBOUNCE) {
                        Ok(_) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                rebuild(&config, &index, &reloads);
            }
        })?;

    Ok(watcher)
}

fn rebuild(config: &BuildConfig, index: &BlockingIndex, reloads: &broadcast::Sender<()>) {
    let started = Instant::now();
    match pipeline::build(config, Some(index)) {
        Ok(report) => {
            info!("rebuilt {} pages in {:.2?}", report.pages, started.elapsed());
            // No receivers just means no open tabs.
            let _ = reloads.send(());
        }
        Err(e) => error!("rebuild failed: {e}"),
    }
}
