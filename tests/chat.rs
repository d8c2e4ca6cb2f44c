//! Chat session behaviour

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use mentor_gateway::chat::ChatSession;
use mentor_gateway::{ContextStore, Error, WsOutgoing};
use tokio::sync::mpsc;
use uuid::Uuid;

mod common;
use common::{FakeModel, drain, next_event, provider_error, services, user_message};

fn session_with(
    store: &Arc<ContextStore>,
    llm: Option<Arc<FakeModel>>,
) -> (ChatSession, mpsc::Receiver<WsOutgoing>) {
    let (tx, rx) = mpsc::channel(32);
    (ChatSession::new(Uuid::new_v4(), services(store, llm), tx), rx)
}

#[tokio::test]
async fn blank_message_yields_single_error() {
    let store = Arc::new(ContextStore::default());
    let model = FakeModel::with_script(vec![]);
    let (mut session, mut rx) = session_with(&store, Some(Arc::clone(&model)));

    session
        .handle_frame(r#"{"type":"user_message","text":"  "}"#)
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        WsOutgoing::Error { code, message }
            if code == "empty_message" && message == "Empty message."
    ));
    assert!(session.history().is_empty());
    assert!(model.seen().is_empty());
}

#[tokio::test]
async fn missing_text_is_treated_as_empty() {
    let store = Arc::new(ContextStore::default());
    let (mut session, mut rx) = session_with(&store, None);

    session.handle_frame(r#"{"type":"user_message"}"#).await.unwrap();

    assert!(matches!(
        next_event(&mut rx).await,
        WsOutgoing::Error { code, .. } if code == "empty_message"
    ));
}

#[tokio::test]
async fn request_context_on_empty_store() {
    let store = Arc::new(ContextStore::default());
    let (mut session, mut rx) = session_with(&store, None);

    session
        .handle_frame(r#"{"type":"request_context"}"#)
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        WsOutgoing::ContextSync {
            files: vec![],
            context: String::new(),
        }
    );
}

#[tokio::test]
async fn provider_failure_keeps_session_usable() {
    let store = Arc::new(ContextStore::default());
    let model = FakeModel::with_script(vec![
        provider_error("upstream 503"),
        Ok("What is the brute-force approach?".to_string()),
    ]);
    let (mut session, mut rx) = session_with(&store, Some(Arc::clone(&model)));

    session.handle_frame(&user_message("two sum?")).await.unwrap();

    assert!(matches!(
        next_event(&mut rx).await,
        WsOutgoing::Status { message } if message == "thinking"
    ));
    match next_event(&mut rx).await {
        WsOutgoing::Error { code, message } => {
            assert_eq!(code, "llm_error");
            assert!(message.contains("upstream 503"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(session.history().is_empty());

    session.handle_frame(&user_message("two sum?")).await.unwrap();

    assert!(matches!(next_event(&mut rx).await, WsOutgoing::Status { .. }));
    assert_eq!(
        next_event(&mut rx).await,
        WsOutgoing::LlmMessage {
            text: "What is the brute-force approach?".to_string(),
        }
    );
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].user, "two sum?");
}

#[tokio::test]
async fn reply_uses_tracked_context() {
    let store = Arc::new(ContextStore::default());
    store.upsert(
        "solution.py",
        "def two_sum(nums, target):\n    pass",
        Utc.timestamp_opt(100, 0).unwrap(),
    );
    let model = FakeModel::with_script(vec![]);
    let (mut session, _rx) = session_with(&store, Some(Arc::clone(&model)));

    session
        .handle_frame(&user_message("  is this right?  "))
        .await
        .unwrap();

    let seen = model.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].user_text, "is this right?");
    assert!(seen[0].context.starts_with("### File: solution.py\n```\n"));
}

#[tokio::test]
async fn explicit_context_overrides_store() {
    let store = Arc::new(ContextStore::default());
    store.upsert("a.py", "x = 1", Utc.timestamp_opt(100, 0).unwrap());
    let model = FakeModel::with_script(vec![]);
    let (mut session, _rx) = session_with(&store, Some(Arc::clone(&model)));

    let frame = serde_json::json!({
        "type": "user_message",
        "text": "why?",
        "code_context": "print('pasted')",
    })
    .to_string();
    session.handle_frame(&frame).await.unwrap();

    assert_eq!(model.seen()[0].context, "print('pasted')");
}

#[tokio::test]
async fn history_window_limits_turns_sent() {
    let store = Arc::new(ContextStore::default());
    let model = FakeModel::with_script(vec![]);
    let (tx, _rx) = mpsc::channel(64);
    let mut svc = services(&store, Some(Arc::clone(&model)));
    svc.history_window = 2;
    let mut session = ChatSession::new(Uuid::new_v4(), svc, tx);

    for text in ["one", "two", "three", "four"] {
        session.handle_frame(&user_message(text)).await.unwrap();
    }

    let lens: Vec<usize> = model.seen().iter().map(|s| s.history_len).collect();
    assert_eq!(lens, [0, 1, 2, 2]);
    assert_eq!(session.history().len(), 4);
}

#[tokio::test]
async fn unconfigured_llm_reports_error() {
    let store = Arc::new(ContextStore::default());
    let (mut session, mut rx) = session_with(&store, None);

    session.handle_frame(&user_message("hello")).await.unwrap();

    assert!(matches!(next_event(&mut rx).await, WsOutgoing::Status { .. }));
    assert!(matches!(
        next_event(&mut rx).await,
        WsOutgoing::Error { message, .. } if message.contains("NVIDIA_API_KEY")
    ));
}

#[tokio::test]
async fn bad_frames_report_errors() {
    let store = Arc::new(ContextStore::default());
    let (mut session, mut rx) = session_with(&store, None);

    session.handle_frame("not json").await.unwrap();
    session.handle_frame(r#"{"type":"dance"}"#).await.unwrap();
    session.handle_frame(r#"{"type":"ping"}"#).await.unwrap();

    assert!(matches!(
        next_event(&mut rx).await,
        WsOutgoing::Error { message, .. } if message == "Invalid JSON payload."
    ));
    assert!(matches!(
        next_event(&mut rx).await,
        WsOutgoing::Error { message, .. } if message == "Unsupported message type."
    ));
    assert_eq!(next_event(&mut rx).await, WsOutgoing::Pong);
}

#[tokio::test]
async fn binary_frame_is_unsupported() {
    let store = Arc::new(ContextStore::default());
    let (session, mut rx) = session_with(&store, None);

    session.handle_binary().await.unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        WsOutgoing::Error {
            code: "unsupported_type".to_string(),
            message: "Unsupported message type.".to_string(),
        }
    );
}

#[tokio::test]
async fn on_connect_syncs_only_when_store_has_files() {
    let store = Arc::new(ContextStore::default());
    let (session, mut rx) = session_with(&store, None);
    session.on_connect().await.unwrap();
    assert!(drain(&mut rx).is_empty());

    store.upsert("main.rs", "fn main() {}", Utc.timestamp_opt(5, 0).unwrap());
    let (session, mut rx) = session_with(&store, None);
    session.on_connect().await.unwrap();

    match next_event(&mut rx).await {
        WsOutgoing::ContextSync { files, context } => {
            assert_eq!(files, ["main.rs"]);
            assert_eq!(context, "### File: main.rs\n```\nfn main() {}\n```");
        }
        other => panic!("expected context_sync, got {other:?}"),
    }
}

#[tokio::test]
async fn closed_client_ends_session() {
    let store = Arc::new(ContextStore::default());
    let (mut session, rx) = session_with(&store, None);
    drop(rx);

    let err = session.handle_frame(r#"{"type":"ping"}"#).await.unwrap_err();
    assert!(matches!(err, Error::ChannelClosed));
}
