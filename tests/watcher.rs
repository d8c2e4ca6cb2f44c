//! Workspace change handling

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mentor_gateway::context::{ChangeHandler, ContextStore, WorkspaceWatcher};
use mentor_gateway::{BroadcastDispatcher, Error, SessionRegistry, WsOutgoing};
use notify::event::{CreateKind, RemoveKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc;
use uuid::Uuid;

mod common;
use common::next_event;

struct Fixture {
    dir: tempfile::TempDir,
    root: PathBuf,
    store: Arc<ContextStore>,
    dispatcher: Arc<BroadcastDispatcher>,
    rx: mpsc::Receiver<WsOutgoing>,
    task: tokio::task::JoinHandle<()>,
}

impl Fixture {
    async fn new(max_files: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let store = Arc::new(ContextStore::new(max_files, 10_000));
        let registry = Arc::new(SessionRegistry::new());
        let (tx, rx) = mpsc::channel(32);
        registry.register(Uuid::new_v4(), tx).await;
        let dispatcher = Arc::new(BroadcastDispatcher::new(registry, 16));
        let task = dispatcher.spawn();

        Self {
            dir,
            root,
            store,
            dispatcher,
            rx,
            task,
        }
    }

    fn handler(&self) -> ChangeHandler {
        ChangeHandler::new(
            self.root.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.dispatcher),
        )
    }

    fn write(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[tokio::test]
async fn write_updates_store_and_broadcasts() {
    let mut fx = Fixture::new(5).await;
    let path = fx.write("src/solution.py", b"print('hi')");

    let upserted = fx.handler().record_write(&path).await.unwrap().unwrap();
    assert!(upserted.evicted.is_none());
    assert_eq!(fx.store.get("src/solution.py").unwrap().content, "print('hi')");

    match next_event(&mut fx.rx).await {
        WsOutgoing::ContextUpdate {
            filename, content, ..
        } => {
            assert_eq!(filename, "src/solution.py");
            assert_eq!(content, "print('hi')");
        }
        other => panic!("expected context_update, got {other:?}"),
    }
}

#[tokio::test]
async fn untracked_paths_are_ignored() {
    let fx = Fixture::new(5).await;
    let handler = fx.handler();

    for relative in ["node_modules/pkg/index.js", ".env.py", "README.md"] {
        let path = fx.write(relative, b"x");
        assert!(handler.record_write(&path).await.unwrap().is_none());
    }
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn non_utf8_file_is_rejected_without_touching_store() {
    let fx = Fixture::new(5).await;
    let path = fx.write("blob.c", &[0xff, 0xfe, 0x00, 0x80]);

    let err = fx.handler().record_write(&path).await.unwrap_err();
    assert!(matches!(err, Error::Filesystem(_)));
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn eviction_and_delete_publish_removals() {
    let mut fx = Fixture::new(1).await;
    let handler = fx.handler();

    let first = fx.write("a.rs", b"fn a() {}");
    handler.record_write(&first).await.unwrap();
    let second = fx.write("b.rs", b"fn b() {}");
    handler.record_write(&second).await.unwrap();

    assert!(matches!(
        next_event(&mut fx.rx).await,
        WsOutgoing::ContextUpdate { filename, .. } if filename == "a.rs"
    ));
    assert!(matches!(
        next_event(&mut fx.rx).await,
        WsOutgoing::ContextRemoved { filename, .. } if filename == "a.rs"
    ));
    assert!(matches!(
        next_event(&mut fx.rx).await,
        WsOutgoing::ContextUpdate { filename, .. } if filename == "b.rs"
    ));

    std::fs::remove_file(&second).unwrap();
    handler
        .handle_event(&Event::new(EventKind::Remove(RemoveKind::File)).add_path(second))
        .await;

    assert!(fx.store.is_empty());
    assert!(matches!(
        next_event(&mut fx.rx).await,
        WsOutgoing::ContextRemoved { filename, .. } if filename == "b.rs"
    ));
}

#[tokio::test]
async fn create_event_is_applied() {
    let fx = Fixture::new(5).await;
    let path = fx.write("pkg/main.go", b"package main");

    fx.handler()
        .handle_event(&Event::new(EventKind::Create(CreateKind::File)).add_path(path))
        .await;

    assert!(fx.store.get("pkg/main.go").is_some());
}

#[tokio::test]
async fn live_watcher_picks_up_new_files() {
    let fx = Fixture::new(5).await;
    let watcher = WorkspaceWatcher::start(
        fx.dir.path(),
        Arc::clone(&fx.store),
        Arc::clone(&fx.dispatcher),
    )
    .unwrap();

    // Give the OS watch a moment to settle
    tokio::time::sleep(Duration::from_millis(100)).await;
    fx.write("watched.py", b"x = 42");

    let mut found = false;
    for _ in 0..50 {
        if fx.store.get("watched.py").is_some_and(|f| f.content == "x = 42") {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    watcher.stop();

    assert!(found, "watcher never recorded watched.py");
}
