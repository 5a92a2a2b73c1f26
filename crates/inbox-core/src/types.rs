use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Page of messages keyed by message ID, as returned by one fetch.
///
/// Insertion order carries no display meaning; display order is always
/// re-derived from timestamps.
pub type MessagePage = IndexMap<String, Message>;

/// Reaction events keyed by the ID of the message they react to.
pub type ReactionList = IndexMap<String, Vec<ReactionEvent>>;

/// Approved templates keyed by template name.
pub type TemplateList = IndexMap<String, Template>;

/// Free-form extra query filters forwarded to the chat listing endpoint.
pub type DynamicFilters = std::collections::BTreeMap<String, String>;

/// Per-stage delivery timestamps (seconds since Unix epoch).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeliveryStatuses {
    /// Accepted by the messaging provider.
    pub sent: Option<i64>,
    /// Delivered to the recipient device.
    pub delivered: Option<i64>,
    /// Read by the recipient.
    pub read: Option<i64>,
}

/// Payload carried by a message that is itself a reaction to another message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionPayload {
    /// ID of the message being reacted to.
    pub message_id: String,
    /// Reaction emoji. Empty when the emitter removed their reaction.
    #[serde(default)]
    pub emoji: String,
}

/// Minimal message record needed to identify, order and deduplicate messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Opaque, stable message ID.
    pub id: String,
    /// Conversation the message belongs to.
    #[serde(default)]
    pub conversation_id: String,
    /// Sender identity, when known.
    #[serde(default)]
    pub sender_id: Option<String>,
    /// Message timestamp in seconds since Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Whether the message was sent by the current actor.
    #[serde(default)]
    pub from_us: bool,
    /// Whether sending the message failed.
    #[serde(default)]
    pub is_failed: bool,
    /// Delivery status timestamps.
    #[serde(default)]
    pub statuses: DeliveryStatuses,
    /// Present when this message is a reaction to another message.
    #[serde(default)]
    pub reaction: Option<ReactionPayload>,
}

/// One reaction emitted on a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionEvent {
    /// ID of the message reacted to.
    pub message_id: String,
    /// Identity of whoever reacted.
    pub emitter_id: String,
    /// Reaction emoji; empty means the emitter withdrew a reaction.
    pub emoji: String,
    /// Reaction timestamp in seconds since Unix epoch.
    pub timestamp: Option<i64>,
}

/// Result of one paginated chat fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchedPage {
    /// Messages and reaction messages in server order.
    pub results: Vec<Message>,
    /// Opaque server cursor for the next page, if any.
    pub next_cursor: Option<String>,
}

/// Where the next page of history should start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageCursor {
    /// Nothing loaded yet; fetch the newest page.
    Start,
    /// Fetch messages strictly older than this timestamp.
    BeforeTime(i64),
    /// Skip this many messages; used when timestamps are ambiguous.
    Offset(usize),
}

/// Query parameters for a chat page fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchParams {
    /// Conversation to list.
    pub conversation_id: String,
    /// Page size.
    pub limit: u16,
    /// Timestamp cursor (exclusive upper bound).
    pub before_time: Option<i64>,
    /// Offset cursor.
    pub offset: Option<usize>,
}

impl FetchParams {
    /// Build fetch parameters for a cursor.
    pub fn for_cursor(conversation_id: impl Into<String>, limit: u16, cursor: PageCursor) -> Self {
        let (before_time, offset) = match cursor {
            PageCursor::Start => (None, None),
            PageCursor::BeforeTime(ts) => (Some(ts), None),
            PageCursor::Offset(offset) => (None, Some(offset)),
        };
        Self {
            conversation_id: conversation_id.into(),
            limit,
            before_time,
            offset,
        }
    }
}

/// Vertical position of one rendered date separator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateAnchor {
    /// Offset from the top of the scroll container.
    pub offset: f32,
    /// Rendered date text.
    pub label: String,
}

impl DateAnchor {
    pub fn new(offset: f32, label: impl Into<String>) -> Self {
        Self {
            offset,
            label: label.into(),
        }
    }
}

/// Message template as returned by the template listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    /// Unique template name.
    pub name: String,
    /// Review status reported by the provider, for example `approved`.
    pub status: String,
    /// Template language code, when present.
    #[serde(default)]
    pub language: Option<String>,
}

/// Status of the server-side template refresh job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshStatus {
    /// `true` while the server is still synchronizing templates.
    pub currently_refreshing: bool,
}

/// Lifecycle of one template refresh job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefreshJobState {
    /// No job has been issued.
    Idle,
    /// The start-refresh request is in flight.
    Issuing,
    /// Waiting for the server job to finish.
    Polling,
    /// The server job finished and a reload was triggered.
    Succeeded,
    /// The job failed; it can be issued again.
    Failed,
    /// The job was cancelled; no further transitions happen.
    Cancelled,
}

impl RefreshJobState {
    /// Whether a job in this state is still doing work.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Issuing | Self::Polling)
    }
}

/// Why a refresh job failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The start-refresh request failed.
    IssueRejected,
    /// A status check failed with a non-transient error.
    StatusCheckFailed,
    /// The server kept refreshing for the whole attempt budget.
    AttemptsExhausted,
}

/// Events published by a template refresh session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefreshEvent {
    /// Job state transition.
    StateChanged {
        /// New state.
        state: RefreshJobState,
        /// Attempt counter after the transition.
        attempt: u32,
    },
    /// Another status check will run after `delay_ms`.
    RetryScheduled {
        /// Attempts used so far.
        attempt: u32,
        /// Attempt budget.
        max_attempts: u32,
        /// Delay before the next check.
        delay_ms: u64,
    },
    /// The job failed.
    Failed {
        /// Failure reason.
        reason: RefreshFailure,
        /// Stable error code.
        error_code: String,
    },
    /// Full template list replacement after a reload.
    TemplatesReloaded {
        /// Approved templates only.
        templates: TemplateList,
    },
    /// Reloading the template list failed.
    ReloadFailed {
        /// Stable error code.
        error_code: String,
    },
}

/// Events published by a conversation session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConversationEvent {
    /// Snapshot of all loaded messages in display order.
    MessagesUpdated {
        /// Conversation ID.
        conversation_id: String,
        /// Messages sorted by timestamp, then ID.
        messages: Vec<Message>,
    },
    /// Merged reaction events after a page was applied.
    ReactionsUpdated {
        /// Conversation ID.
        conversation_id: String,
        /// All reactions accumulated so far.
        reactions: ReactionList,
    },
    /// Pinned date label changed.
    PinnedDateChanged {
        /// Conversation ID.
        conversation_id: String,
        /// Label of the pinned separator.
        label: String,
    },
}
