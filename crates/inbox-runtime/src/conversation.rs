use inbox_core::{
    ConversationEvent, DateAnchor, DatePinTracker, DynamicFilters, EventHub, EventStream,
    FetchParams, FetchedPage, InboxError, Message, MessagePageStore, PageCursor, ReactionEvent,
    ReactionList, merge_reaction_lists, split_fetched_messages,
};
use inbox_platform::ChatApi;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Largest page the chat backend serves.
pub const SERVER_PAGE_CAP: u16 = 100;

/// Loaded state for one open conversation.
///
/// Owns the message window, grouped reactions and the pinned date label, and
/// publishes a [`ConversationEvent`] whenever one of them changes. Closing the
/// session discards every in-flight fetch.
pub struct ConversationSession {
    conversation_id: String,
    page_size: u16,
    store: MessagePageStore,
    reactions: ReactionList,
    date_pin: DatePinTracker,
    has_more: bool,
    events: EventHub<ConversationEvent>,
    stop: CancellationToken,
}

impl ConversationSession {
    pub fn new(conversation_id: impl Into<String>, page_size: u16, event_buffer: usize) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            page_size: MessagePageStore::bounded_page_limit(page_size, SERVER_PAGE_CAP),
            store: MessagePageStore::new(),
            reactions: ReactionList::new(),
            date_pin: DatePinTracker::new(),
            has_more: true,
            events: EventHub::new(event_buffer),
            stop: CancellationToken::new(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn page_size(&self) -> u16 {
        self.page_size
    }

    pub fn subscribe(&self) -> EventStream<ConversationEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &MessagePageStore {
        &self.store
    }

    /// Loaded messages in display order.
    pub fn messages(&self) -> Vec<&Message> {
        self.store.ordered()
    }

    pub fn reactions(&self) -> &ReactionList {
        &self.reactions
    }

    pub fn reactions_for(&self, message_id: &str) -> &[ReactionEvent] {
        self.reactions
            .get(message_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn pinned_date(&self) -> Option<&str> {
        self.date_pin.current()
    }

    /// `false` once the backend reported the last page of history.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_closed(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Close the session. Pending and later fetch results are discarded.
    pub fn close(&self) {
        self.stop.cancel();
        debug!(conversation_id = %self.conversation_id, "conversation session closed");
    }

    /// Whether the window checked for the next cursor shares one timestamp.
    pub fn is_homogeneous_window(&self) -> bool {
        self.store
            .is_homogeneous_window(usize::from(self.page_size), true)
    }

    /// Cursor for the next page of older history.
    pub fn next_cursor(&self) -> PageCursor {
        self.store
            .pagination_cursor(usize::from(self.page_size), true)
    }

    /// Merge a fetched page and publish the new state.
    ///
    /// Returns the number of plain messages merged. Ignored once closed.
    pub fn apply_page(&mut self, page: FetchedPage) -> usize {
        if self.is_closed() {
            debug!(
                conversation_id = %self.conversation_id,
                "discarding page for closed conversation"
            );
            return 0;
        }

        let (messages, reactions) = split_fetched_messages(page.results);
        let merged = messages.len();
        self.store.merge_page(messages);

        let reactions_changed = !reactions.is_empty();
        if reactions_changed {
            let existing = std::mem::take(&mut self.reactions);
            self.reactions = merge_reaction_lists(existing, reactions);
        }
        if self.events.subscriber_count() == 0 {
            return merged;
        }

        if reactions_changed {
            self.events.emit(ConversationEvent::ReactionsUpdated {
                conversation_id: self.conversation_id.clone(),
                reactions: self.reactions.clone(),
            });
        }

        self.events.emit(ConversationEvent::MessagesUpdated {
            conversation_id: self.conversation_id.clone(),
            messages: self.store.ordered().into_iter().cloned().collect(),
        });
        merged
    }

    /// Apply a single pushed message, such as a delivery status update.
    pub fn upsert_message(&mut self, message: Message) -> usize {
        self.apply_page(FetchedPage {
            results: vec![message],
            next_cursor: None,
        })
    }

    /// Fetch and merge the next page of older history.
    pub async fn load_older<C: ChatApi>(
        &mut self,
        api: &C,
        filters: &DynamicFilters,
    ) -> Result<usize, InboxError> {
        if self.is_closed() {
            return Err(InboxError::cancelled("load_older"));
        }

        let cursor = self.next_cursor();
        let params = FetchParams::for_cursor(&self.conversation_id, self.page_size, cursor);
        debug!(
            conversation_id = %self.conversation_id,
            ?cursor,
            limit = params.limit,
            "loading older messages"
        );

        let page = tokio::select! {
            biased;
            _ = self.stop.cancelled() => return Err(InboxError::cancelled("load_older")),
            page = api.fetch_messages(&params, filters, &self.stop) => page?,
        };
        if self.is_closed() {
            return Err(InboxError::cancelled("load_older"));
        }

        let reached_end = page.next_cursor.is_none();
        let merged = self.apply_page(page);
        if reached_end {
            self.has_more = false;
            info!(
                conversation_id = %self.conversation_id,
                loaded = self.store.len(),
                "reached start of conversation history"
            );
        }
        Ok(merged)
    }

    /// Re-resolve the pinned date label after a scroll or layout change.
    ///
    /// Returns and publishes the label only when it changed.
    pub fn on_scroll(&mut self, anchors: &[DateAnchor], scroll_offset: f32) -> Option<String> {
        if self.is_closed() {
            return None;
        }

        let label = self.date_pin.update(anchors, scroll_offset)?.to_owned();
        trace!(conversation_id = %self.conversation_id, %label, "pinned date changed");
        self.events.emit(ConversationEvent::PinnedDateChanged {
            conversation_id: self.conversation_id.clone(),
            label: label.clone(),
        });
        Some(label)
    }
}
