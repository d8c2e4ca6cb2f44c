//! Workspace file watcher feeding the context store
//!
//! The notify callback runs on its own thread and only forwards raw events
//! into a channel. A tokio task consumes that channel, filters and reads the
//! files, updates the [`ContextStore`] and hands the resulting update to the
//! [`BroadcastDispatcher`] without waiting for delivery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ContextStore, Upserted, should_track};
use crate::chat::WsOutgoing;
use crate::sessions::BroadcastDispatcher;
use crate::{Error, Result};

/// Applies filesystem changes under a workspace root to the context store
#[derive(Debug, Clone)]
pub struct ChangeHandler {
    root: PathBuf,
    store: Arc<ContextStore>,
    dispatcher: Arc<BroadcastDispatcher>,
}

impl ChangeHandler {
    /// Create a handler for paths under `root`
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        store: Arc<ContextStore>,
        dispatcher: Arc<BroadcastDispatcher>,
    ) -> Self {
        Self {
            root: root.into(),
            store,
            dispatcher,
        }
    }

    /// Workspace root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply one notify event; failures are logged and the event dropped
    pub async fn handle_event(&self, event: &Event) {
        match event.kind {
            EventKind::Create(CreateKind::Folder)
            | EventKind::Modify(ModifyKind::Metadata(_))
            | EventKind::Access(_)
            | EventKind::Any
            | EventKind::Other => {}
            EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To) | ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any | ModifyKind::Other) => {
                for path in &event.paths {
                    self.write_logged(path).await;
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
                for path in &event.paths {
                    self.record_removal(path);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let [from, to] = event.paths.as_slice() {
                    self.record_removal(from);
                    self.write_logged(to).await;
                }
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                for path in &event.paths {
                    if path.exists() {
                        self.write_logged(path).await;
                    } else {
                        self.record_removal(path);
                    }
                }
            }
        }
    }

    async fn write_logged(&self, path: &Path) {
        match self.record_write(path).await {
            Ok(Some(upserted)) => {
                tracing::debug!(
                    path = %path.display(),
                    size = upserted.file.size,
                    evicted = ?upserted.evicted,
                    "context updated"
                );
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping file change"),
        }
    }

    /// Read a created or modified file into the store and publish the update
    ///
    /// Returns `Ok(None)` for paths outside the root, untracked paths and
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns `Error::Filesystem` if the file cannot be read or is not UTF-8;
    /// the store is left unchanged.
    pub async fn record_write(&self, path: &Path) -> Result<Option<Upserted>> {
        let Some(key) = self.tracked_key(path) else {
            return Ok(None);
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::Filesystem(format!("{key}: {e}")))?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Filesystem(format!("{key}: {e}")))?;
        let raw = String::from_utf8(bytes)
            .map_err(|e| Error::Filesystem(format!("{key}: not valid UTF-8: {e}")))?;

        let upserted = self.store.upsert(key.clone(), &raw, Utc::now());

        if let Some(evicted) = &upserted.evicted {
            self.dispatcher
                .publish(WsOutgoing::context_removed(evicted.clone(), upserted.file.modified));
        }
        self.dispatcher.publish(WsOutgoing::context_update(
            key,
            upserted.file.content.clone(),
            upserted.file.modified,
        ));

        Ok(Some(upserted))
    }

    /// Evict a deleted or renamed-away file and publish the removal
    ///
    /// Returns whether the path was tracked.
    pub fn record_removal(&self, path: &Path) -> bool {
        let Some(key) = self.tracked_key(path) else {
            return false;
        };
        if self.store.remove(&key).is_none() {
            return false;
        }
        tracing::debug!(path = %key, "context entry removed");
        self.dispatcher
            .publish(WsOutgoing::context_removed(key, Utc::now()));
        true
    }

    /// Workspace-relative `/`-joined key for a trackable path
    fn tracked_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if !should_track(relative) {
            return None;
        }
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Some(key)
    }
}

/// Running recursive watch over a workspace directory
pub struct WorkspaceWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WorkspaceWatcher {
    /// Start watching `root` recursively
    ///
    /// # Errors
    ///
    /// Returns error if the root cannot be resolved or the OS watch fails
    pub fn start(
        root: &Path,
        store: Arc<ContextStore>,
        dispatcher: Arc<BroadcastDispatcher>,
    ) -> Result<Self> {
        let root = std::fs::canonicalize(root)?;
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.send(res);
            },
            notify::Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let handler = ChangeHandler::new(root.clone(), store, dispatcher);
        let task = tokio::spawn(async move {
            while let Some(res) = event_rx.recv().await {
                match res {
                    Ok(event) => handler.handle_event(&event).await,
                    Err(e) => tracing::warn!(error = %e, "watch error"),
                }
            }
        });

        tracing::info!(root = %root.display(), "watching workspace");

        Ok(Self {
            root,
            _watcher: watcher,
            task,
        })
    }

    /// Canonical workspace root being watched
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching and end the event task
    pub fn stop(self) {
        self.task.abort();
        tracing::info!(root = %self.root.display(), "workspace watcher stopped");
    }
}
