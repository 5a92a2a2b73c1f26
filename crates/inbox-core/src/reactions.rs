use crate::types::{ReactionEvent, ReactionList};

/// Merge a newly fetched reaction list into the accumulated one.
///
/// Keys present in both lists keep `existing` events first, followed by
/// `incoming` events. The merge is not idempotent: applying the same page twice
/// duplicates its events, so each page must be merged at most once.
pub fn merge_reaction_lists(mut existing: ReactionList, incoming: ReactionList) -> ReactionList {
    for (message_id, events) in incoming {
        existing.entry(message_id).or_default().extend(events);
    }
    existing
}

/// Group reaction events by target message, preserving arrival order.
pub fn group_reactions<I>(events: I) -> ReactionList
where
    I: IntoIterator<Item = ReactionEvent>,
{
    let mut grouped = ReactionList::new();
    for event in events {
        grouped
            .entry(event.message_id.clone())
            .or_default()
            .push(event);
    }
    grouped
}

/// Total number of reaction events across all messages.
pub fn reaction_count(reactions: &ReactionList) -> usize {
    reactions.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(message_id: &str, emitter: &str, emoji: &str, ts: i64) -> ReactionEvent {
        ReactionEvent {
            message_id: message_id.to_owned(),
            emitter_id: emitter.to_owned(),
            emoji: emoji.to_owned(),
            timestamp: Some(ts),
        }
    }

    fn emojis(list: &ReactionList, key: &str) -> Vec<String> {
        list.get(key)
            .map(|events| events.iter().map(|e| e.emoji.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn keeps_existing_first_for_shared_keys() {
        let existing = group_reactions([reaction("m1", "alice", "👍", 1)]);
        let incoming = group_reactions([
            reaction("m1", "bob", "🎉", 2),
            reaction("m2", "bob", "❤️", 3),
        ]);

        let merged = merge_reaction_lists(existing, incoming);

        assert_eq!(emojis(&merged, "m1"), vec!["👍", "🎉"]);
        assert_eq!(emojis(&merged, "m2"), vec!["❤️"]);
    }

    #[test]
    fn retains_keys_missing_from_incoming() {
        let existing = group_reactions([reaction("m1", "alice", "👍", 1)]);
        let merged = merge_reaction_lists(existing.clone(), ReactionList::new());
        assert_eq!(merged, existing);
    }

    #[test]
    fn incremental_merges_equal_concatenation_in_call_order() {
        let a = group_reactions([reaction("m1", "alice", "1", 1), reaction("m2", "x", "2", 2)]);
        let b = group_reactions([reaction("m1", "bob", "3", 3)]);
        let c = group_reactions([reaction("m1", "carol", "4", 4), reaction("m3", "y", "5", 5)]);

        let stepwise = merge_reaction_lists(
            merge_reaction_lists(merge_reaction_lists(ReactionList::new(), a.clone()), b.clone()),
            c.clone(),
        );
        let grouped = merge_reaction_lists(a, merge_reaction_lists(b, c));

        assert_eq!(emojis(&stepwise, "m1"), vec!["1", "3", "4"]);
        assert_eq!(emojis(&stepwise, "m1"), emojis(&grouped, "m1"));
        assert_eq!(emojis(&stepwise, "m2"), emojis(&grouped, "m2"));
        assert_eq!(emojis(&stepwise, "m3"), emojis(&grouped, "m3"));
    }

    #[test]
    fn merging_the_same_page_twice_duplicates_events() {
        let page = group_reactions([reaction("m1", "alice", "👍", 1)]);
        let merged = merge_reaction_lists(page.clone(), page);
        assert_eq!(reaction_count(&merged), 2);
    }
}
