//! Connected chat sessions and update fan-out

mod broadcast;
mod registry;

pub use broadcast::{BroadcastDispatcher, BroadcastReport, DEFAULT_QUEUE_CAPACITY};
pub use registry::{SessionId, SessionRegistry, SessionSender};
