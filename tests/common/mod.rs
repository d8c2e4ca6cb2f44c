//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mentor_gateway::chat::{ChatModel, ChatServices, CompletionRequest};
use mentor_gateway::{ContextStore, Error, Result, WsOutgoing};
use tokio::sync::mpsc;

/// What a fake model saw on one call
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub history_len: usize,
    pub context: String,
    pub user_text: String,
}

/// Scripted `ChatModel`: pops replies in order, echoing once the script runs out
#[derive(Default)]
pub struct FakeModel {
    script: Mutex<VecDeque<Result<String>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl FakeModel {
    pub fn with_script(script: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeModel {
    fn model_id(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        self.seen.lock().unwrap().push(SeenRequest {
            history_len: request.history.len(),
            context: request.context.to_string(),
            user_text: request.user_text.to_string(),
        });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("What do you think about {}?", request.user_text)))
    }
}

/// A provider failure for scripting
pub fn provider_error(detail: &str) -> Result<String> {
    Err(Error::Provider(detail.to_string()))
}

/// Session services over `store` with an optional fake model
pub fn services(store: &Arc<ContextStore>, llm: Option<Arc<FakeModel>>) -> ChatServices {
    ChatServices::new(
        Arc::clone(store),
        llm.map(|m| m as Arc<dyn ChatModel>),
    )
}

/// Receive the next event or fail after a second
pub async fn next_event(rx: &mut mpsc::Receiver<WsOutgoing>) -> WsOutgoing {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

/// Everything already queued on `rx`
pub fn drain(rx: &mut mpsc::Receiver<WsOutgoing>) -> Vec<WsOutgoing> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Short JSON `user_message` frame
pub fn user_message(text: &str) -> String {
    serde_json::json!({ "type": "user_message", "text": text }).to_string()
}
