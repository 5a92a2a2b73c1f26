use chrono::{DateTime, NaiveDate, TimeZone};

use crate::types::{DateAnchor, Message};

/// Resolve the date separator that should stay pinned at the top of the viewport.
///
/// `anchors` must be ordered top to bottom. The first anchor is always a
/// candidate so a label is shown as soon as scrolling begins; later anchors
/// qualify while their offset is at or above `scroll_offset`.
pub fn resolve_pinned(anchors: &[DateAnchor], scroll_offset: f32) -> Option<&str> {
    let mut pinned: Option<&DateAnchor> = None;
    for anchor in anchors {
        if pinned.is_none() || anchor.offset <= scroll_offset {
            pinned = Some(anchor);
        } else {
            break;
        }
    }
    pinned.map(|anchor| anchor.label.as_str())
}

/// Remembers the last pinned label so unchanged results are not republished.
#[derive(Debug, Clone, Default)]
pub struct DatePinTracker {
    last_label: Option<String>,
}

impl DatePinTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last label reported by [`DatePinTracker::update`].
    pub fn current(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    /// Re-resolve after a scroll or layout change.
    ///
    /// Returns the new label only when it differs from the previous one. An
    /// empty anchor set keeps the previous label.
    pub fn update(&mut self, anchors: &[DateAnchor], scroll_offset: f32) -> Option<&str> {
        let resolved = resolve_pinned(anchors, scroll_offset)?;
        if self.last_label.as_deref() == Some(resolved) {
            return None;
        }
        self.last_label = Some(resolved.to_owned());
        self.last_label.as_deref()
    }

    pub fn reset(&mut self) {
        self.last_label = None;
    }
}

/// Marks a message that starts a new calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySeparator {
    pub message_id: String,
    pub date: NaiveDate,
}

/// Find the messages that open a new calendar day in `tz`.
///
/// `messages` must already be in display order. Messages without a usable
/// timestamp never start a day.
pub fn day_separators<'a, I, Tz>(messages: I, tz: &Tz) -> Vec<DaySeparator>
where
    I: IntoIterator<Item = &'a Message>,
    Tz: TimeZone,
{
    let mut separators = Vec::new();
    let mut current_day: Option<NaiveDate> = None;

    for message in messages {
        let Some(date) = message
            .timestamp
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|utc| utc.with_timezone(tz).date_naive())
        else {
            continue;
        };

        if current_day != Some(date) {
            current_day = Some(date);
            separators.push(DaySeparator {
                message_id: message.id.clone(),
                date,
            });
        }
    }

    separators
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;
    use crate::types::DeliveryStatuses;

    fn anchors() -> Vec<DateAnchor> {
        vec![
            DateAnchor::new(0.0, "Monday"),
            DateAnchor::new(100.0, "Tuesday"),
            DateAnchor::new(300.0, "Today"),
        ]
    }

    fn message(id: &str, timestamp: Option<i64>) -> Message {
        Message {
            id: id.to_owned(),
            conversation_id: "c1".to_owned(),
            sender_id: None,
            timestamp,
            from_us: false,
            is_failed: false,
            statuses: DeliveryStatuses::default(),
            reaction: None,
        }
    }

    #[test]
    fn pins_last_anchor_at_or_above_offset() {
        assert_eq!(resolve_pinned(&anchors(), 150.0), Some("Tuesday"));
        assert_eq!(resolve_pinned(&anchors(), 300.0), Some("Today"));
        assert_eq!(resolve_pinned(&anchors(), 0.0), Some("Monday"));
    }

    #[test]
    fn first_anchor_is_pinned_even_above_it() {
        let anchors = vec![DateAnchor::new(40.0, "Monday"), DateAnchor::new(90.0, "Tuesday")];
        assert_eq!(resolve_pinned(&anchors, 10.0), Some("Monday"));
    }

    #[test]
    fn empty_anchor_set_pins_nothing() {
        assert_eq!(resolve_pinned(&[], 0.0), None);
        assert_eq!(resolve_pinned(&[], 5_000.0), None);
    }

    #[test]
    fn tracker_reports_only_changes() {
        let mut tracker = DatePinTracker::new();
        assert_eq!(tracker.update(&anchors(), 10.0), Some("Monday"));
        assert_eq!(tracker.update(&anchors(), 20.0), None);
        assert_eq!(tracker.update(&anchors(), 120.0), Some("Tuesday"));
        assert_eq!(tracker.update(&[], 120.0), None);
        assert_eq!(tracker.current(), Some("Tuesday"));

        tracker.reset();
        assert_eq!(tracker.update(&anchors(), 120.0), Some("Tuesday"));
    }

    #[test]
    fn separators_mark_first_message_of_each_day() {
        let day = 86_400;
        let messages = vec![
            message("a", Some(day)),
            message("b", Some(day + 60)),
            message("c", None),
            message("d", Some(2 * day + 5)),
        ];

        let separators = day_separators(&messages, &Utc);
        let ids: Vec<_> = separators.iter().map(|s| s.message_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(
            separators[0].date,
            NaiveDate::from_ymd_opt(1970, 1, 2).expect("valid date")
        );
    }

    #[test]
    fn separators_respect_timezone() {
        let messages = vec![
            message("late", Some(86_400 - 60)),
            message("early", Some(86_400 + 60)),
        ];
        let plus_two = FixedOffset::east_opt(2 * 3600).expect("valid offset");

        assert_eq!(day_separators(&messages, &Utc).len(), 2);
        assert_eq!(day_separators(&messages, &plus_two).len(), 1);
    }
}
