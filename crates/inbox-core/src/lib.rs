//! Client-side state reconciliation for the inbox.
//!
//! This crate holds the pure pieces: message identity and ordering, reaction
//! and message page merging, date-pin resolution, and the template refresh job
//! state machine. Async drivers live in `inbox-runtime`.

/// Publish/subscribe event hub.
pub mod channel;
/// Date separator pinning and day boundaries.
pub mod date_pin;
/// Stable error types and HTTP classification helpers.
pub mod error;
/// Message identity, ordering and delivery-status helpers.
pub mod message;
/// Fetch-result normalization (reaction splitting, template filtering, notices).
pub mod normalization;
/// Loaded message window with last-write-wins page merges.
pub mod page_store;
/// Order-preserving reaction list merging.
pub mod reactions;
/// Fixed-interval retry budget.
pub mod retry;
/// Template refresh job state machine.
pub mod state_machine;
/// Data model and published event types.
pub mod types;

pub use channel::{EventHub, EventStream};
pub use date_pin::{DatePinTracker, DaySeparator, day_separators, resolve_pinned};
pub use error::{ErrorCategory, InboxError, classify_http_status};
pub use message::{
    MISSING_TIMESTAMP, StatusFlags, compare_for_display, has_any_status, message_id,
    message_timestamp, sort_for_display,
};
pub use normalization::{approved_templates, failure_notice, split_fetched_messages};
pub use page_store::MessagePageStore;
pub use reactions::{group_reactions, merge_reaction_lists, reaction_count};
pub use retry::RetryPolicy;
pub use state_machine::{RefreshJob, StatusOutcome, StatusTransition};
pub use types::{
    ConversationEvent, DateAnchor, DeliveryStatuses, DynamicFilters, FetchParams, FetchedPage,
    Message, MessagePage, PageCursor, ReactionEvent, ReactionList, ReactionPayload, RefreshEvent,
    RefreshFailure, RefreshJobState, RefreshStatus, Template, TemplateList,
};
