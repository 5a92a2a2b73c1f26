//! Async sessions driving the inbox core against platform collaborators.
//!
//! [`ConversationSession`] owns the loaded state of one conversation.
//! [`RefreshPoller`] and [`RefreshSession`] run the template refresh job on
//! tokio with cooperative cancellation.

mod conversation;
mod poller;

pub use conversation::{ConversationSession, SERVER_PAGE_CAP};
pub use poller::{RefreshPoller, RefreshSession};
