use crate::{
    reactions::group_reactions,
    types::{
        Message, MessagePage, ReactionEvent, ReactionList, RefreshFailure, Template, TemplateList,
    },
};

/// Template status kept when publishing a reloaded template list.
pub const APPROVED_STATUS: &str = "approved";

pub const REFRESH_SUCCEEDED_NOTICE: &str = "Templates are refreshed successfully.";
pub const RELOAD_FAILED_NOTICE: &str = "Failed to load templates. Please try again in a while.";

/// Split a fetched page into plain messages and reaction events.
///
/// Reaction messages are regrouped under the ID of the message they react to.
pub fn split_fetched_messages(results: Vec<Message>) -> (MessagePage, ReactionList) {
    let mut page = MessagePage::with_capacity(results.len());
    let mut reactions = Vec::new();

    for message in results {
        match message.reaction {
            Some(payload) => reactions.push(ReactionEvent {
                message_id: payload.message_id,
                emitter_id: message.sender_id.unwrap_or_default(),
                emoji: payload.emoji,
                timestamp: message.timestamp,
            }),
            None => {
                page.insert(message.id.clone(), message);
            }
        }
    }

    (page, group_reactions(reactions))
}

/// Keep only approved templates, keyed by name. Later duplicates win.
pub fn approved_templates(results: Vec<Template>) -> TemplateList {
    results
        .into_iter()
        .filter(|template| template.status == APPROVED_STATUS)
        .map(|template| (template.name.clone(), template))
        .collect()
}

/// User-visible text for a failed refresh job.
pub fn failure_notice(reason: RefreshFailure) -> &'static str {
    match reason {
        RefreshFailure::IssueRejected => {
            "Failed to issue a template refresh request. Please try again in a while."
        }
        RefreshFailure::StatusCheckFailed => {
            "Failed to check the template refresh status. Please try again in a while."
        }
        RefreshFailure::AttemptsExhausted => {
            "Too many attempts to refresh templates! Please try again in a while."
        }
    }
}
