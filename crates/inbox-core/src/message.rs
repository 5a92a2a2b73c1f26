//! Identity, ordering and delivery-status helpers for [`Message`] records.
//!
//! Everything here is total: missing fields degrade to sentinels or `false`.

use std::cmp::Ordering;

use crate::types::Message;

/// Timestamp used for comparisons when a message carries none.
pub const MISSING_TIMESTAMP: i64 = -1;

/// Message timestamp in seconds, or [`MISSING_TIMESTAMP`].
pub fn message_timestamp(message: &Message) -> i64 {
    message.timestamp.unwrap_or(MISSING_TIMESTAMP)
}

/// Stable message ID.
pub fn message_id(message: &Message) -> &str {
    &message.id
}

/// Whether any delivery stage (sent, delivered, read) was reported.
pub fn has_any_status(message: &Message) -> bool {
    let statuses = &message.statuses;
    statuses.sent.is_some() || statuses.delivered.is_some() || statuses.read.is_some()
}

/// Delivery indicators shown next to a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub pending: bool,
    pub sent: bool,
    pub delivered_or_read: bool,
    pub read: bool,
    pub failed: bool,
}

impl StatusFlags {
    /// Derive indicators for `message`.
    ///
    /// Delivery indicators only apply to messages sent by the current actor, and
    /// a failed send hides them unless the provider still reported a status.
    pub fn of(message: &Message) -> Self {
        let any_status = has_any_status(message);
        let statuses = &message.statuses;
        let shows_delivery = message.from_us && (!message.is_failed || any_status);

        Self {
            pending: shows_delivery && !any_status,
            sent: shows_delivery
                && statuses.sent.is_some()
                && statuses.delivered.is_none()
                && statuses.read.is_none(),
            delivered_or_read: shows_delivery
                && (statuses.delivered.is_some() || statuses.read.is_some()),
            read: message.from_us && statuses.read.is_some(),
            failed: message.is_failed && !any_status,
        }
    }
}

/// Display order: timestamp ascending, ties broken by ID.
pub fn compare_for_display(a: &Message, b: &Message) -> Ordering {
    message_timestamp(a)
        .cmp(&message_timestamp(b))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort message references into display order.
pub fn sort_for_display(messages: &mut [&Message]) {
    messages.sort_by(|a, b| compare_for_display(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeliveryStatuses;

    fn message(id: &str, timestamp: Option<i64>) -> Message {
        Message {
            id: id.to_owned(),
            conversation_id: "c1".to_owned(),
            sender_id: None,
            timestamp,
            from_us: true,
            is_failed: false,
            statuses: DeliveryStatuses::default(),
            reaction: None,
        }
    }

    #[test]
    fn missing_timestamp_degrades_to_sentinel() {
        assert_eq!(message_timestamp(&message("a", None)), MISSING_TIMESTAMP);
        assert_eq!(message_timestamp(&message("a", Some(42))), 42);
    }

    #[test]
    fn own_message_without_status_is_pending() {
        let flags = StatusFlags::of(&message("a", Some(1)));
        assert!(flags.pending);
        assert!(!flags.sent);
        assert!(!flags.failed);
    }

    #[test]
    fn sent_and_delivered_flags_are_exclusive() {
        let mut sent = message("a", Some(1));
        sent.statuses.sent = Some(2);
        let flags = StatusFlags::of(&sent);
        assert!(flags.sent && !flags.delivered_or_read && !flags.pending);

        let mut read = sent.clone();
        read.statuses.delivered = Some(3);
        read.statuses.read = Some(4);
        let flags = StatusFlags::of(&read);
        assert!(!flags.sent && flags.delivered_or_read && flags.read);
    }

    #[test]
    fn incoming_messages_get_no_delivery_indicators() {
        let mut incoming = message("a", Some(1));
        incoming.from_us = false;
        incoming.statuses.read = Some(5);

        assert_eq!(StatusFlags::of(&incoming), StatusFlags::default());
    }

    #[test]
    fn failed_send_without_status_is_flagged_failed() {
        let mut failed = message("a", Some(1));
        failed.is_failed = true;
        let flags = StatusFlags::of(&failed);
        assert!(flags.failed);
        assert!(!flags.pending);

        failed.statuses.sent = Some(2);
        let flags = StatusFlags::of(&failed);
        assert!(!flags.failed);
        assert!(flags.sent);
    }

    #[test]
    fn display_order_breaks_timestamp_ties_by_id() {
        let b = message("b", Some(10));
        let a = message("a", Some(10));
        let early = message("z", None);
        let mut refs = vec![&b, &a, &early];
        sort_for_display(&mut refs);

        let ids: Vec<_> = refs.iter().map(|m| message_id(m)).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }
}
