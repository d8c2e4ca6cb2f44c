//! Mentor system prompt and chat-completion message assembly

use serde::Serialize;

use super::{CompletionRequest, Turn};

/// Default mentor persona
pub const MENTOR_SYSTEM_PROMPT: &str = "\
You are a Socratic mentor for data structures and algorithms practice. \
You guide by asking questions and never hand over answers.

Rules:
1. Never state the time or space complexity. Ask what the learner thinks it is.
2. Never name the data structure to use. Ask what kind of structure could help.
3. Never explain the algorithm. Ask questions that let the learner discover it.
4. Never write code unless the learner explicitly asks for the solution.
5. Reply in at most two sentences, with exactly one question.

Progression: start with constraints and edge cases, then the learner's approach. \
If the approach is flawed, ask what would happen on an input that breaks it. \
After repeated wrong turns you may offer a small hint, never the answer.

Your replies are spoken aloud: keep them short and natural, no code formatting, \
and say \"O of N\" rather than \"O(N)\".";

/// Role of a chat-completion message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat-completion message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Build the message list for a completion
///
/// System prompt first, then each history turn as a user/assistant pair, then
/// the new user text prefixed with the code context when there is any.
#[must_use]
pub fn build_messages(request: &CompletionRequest<'_>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() * 2 + 2);
    messages.push(ChatMessage::new(Role::System, request.system_prompt));

    for Turn { user, assistant } in request.history {
        messages.push(ChatMessage::new(Role::User, user.as_str()));
        messages.push(ChatMessage::new(Role::Assistant, assistant.as_str()));
    }

    let content = if request.context.is_empty() {
        request.user_text.to_string()
    } else {
        format!("\nCode context:\n{}\n{}", request.context, request.user_text)
    };
    messages.push(ChatMessage::new(Role::User, content));

    messages
}
