use indexmap::IndexMap;

use crate::{
    message::{MISSING_TIMESTAMP, compare_for_display, message_timestamp},
    types::{Message, MessagePage, PageCursor},
};

/// Loaded window of messages for one conversation, keyed by message ID.
#[derive(Debug, Clone, Default)]
pub struct MessagePageStore {
    messages: IndexMap<String, Message>,
}

impl MessagePageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    /// Messages in store (merge) order. Not a display order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Messages in display order (timestamp, then ID).
    pub fn ordered(&self) -> Vec<&Message> {
        let mut ordered: Vec<&Message> = self.messages.values().collect();
        ordered.sort_by(|a, b| compare_for_display(a, b));
        ordered
    }

    /// Merge one fetched page.
    ///
    /// An ID that is already stored has its value replaced in place; other
    /// entries keep their position. New IDs are appended.
    pub fn merge_page(&mut self, page: MessagePage) {
        for (id, message) in page {
            self.messages.insert(id, message);
        }
    }

    /// Whether the first `page_size` messages in store order (or the last
    /// `page_size`, newest first, when `from_end`) all share one timestamp.
    ///
    /// Returns `false` when fewer than `page_size` messages are loaded, and for
    /// a zero-sized window.
    pub fn is_homogeneous_window(&self, page_size: usize, from_end: bool) -> bool {
        if page_size == 0 || self.messages.len() < page_size {
            return false;
        }

        let mut timestamps: Box<dyn Iterator<Item = i64> + '_> = if from_end {
            Box::new(self.messages.values().rev().take(page_size).map(message_timestamp))
        } else {
            Box::new(self.messages.values().take(page_size).map(message_timestamp))
        };

        let Some(first) = timestamps.next() else {
            return false;
        };
        timestamps.all(|ts| ts == first)
    }

    /// Cursor for the next page of older history.
    ///
    /// A homogeneous window makes timestamp cursors ambiguous, so the offset of
    /// already loaded messages is used instead.
    pub fn pagination_cursor(&self, page_size: usize, from_end: bool) -> PageCursor {
        if self.messages.is_empty() {
            return PageCursor::Start;
        }
        if self.is_homogeneous_window(page_size, from_end) {
            return PageCursor::Offset(self.messages.len());
        }

        let oldest = self
            .messages
            .values()
            .map(message_timestamp)
            .min()
            .unwrap_or(MISSING_TIMESTAMP);
        PageCursor::BeforeTime(oldest)
    }

    /// Clamp a requested page size against safety and server caps.
    ///
    /// The result is always in `1..=100`.
    pub fn bounded_page_limit(requested: u16, server_cap: u16) -> u16 {
        let safe_requested = requested.max(1);
        let safe_cap = server_cap.max(1);
        safe_requested.min(safe_cap).min(100)
    }
}
