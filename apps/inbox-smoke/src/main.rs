mod config;
mod logging;

use inbox_core::{
    DynamicFilters, InboxError, Message, RefreshEvent, RefreshJobState, StatusFlags, Template,
    reaction_count,
};
use inbox_platform::{InMemoryChatApi, Notifier, ScriptedTemplateApi, TokioScheduler};
use inbox_runtime::{ConversationSession, RefreshPoller, RefreshSession};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::SmokeConfig;

const SMOKE_CONVERSATION: &str = "smoke-conversation";

#[derive(Debug, Error)]
enum SmokeError {
    #[error(transparent)]
    Inbox(#[from] InboxError),
    #[error("failed to encode smoke output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("template refresh ended in {0:?}")]
    Refresh(RefreshJobState),
}

/// Reports user-visible notices through tracing.
#[derive(Debug, Default, Clone, Copy)]
struct LogNotifier;

impl Notifier for LogNotifier {
    fn display_error(&self, message: &str) {
        warn!(notice = message, "user-visible error");
    }

    fn display_success(&self, message: &str) {
        info!(notice = message, "user-visible success");
    }
}

#[tokio::main]
async fn main() {
    let filter = logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(2);
        }
    };

    debug!(%filter, ?config, "starting inbox smoke run");

    if let Err(err) = run(&config).await {
        error!(error = %err, "smoke run failed");
        eprintln!("Smoke run failed: {err}");
        std::process::exit(1);
    }
}

async fn run(config: &SmokeConfig) -> Result<(), SmokeError> {
    load_conversation(config).await?;
    refresh_templates(config).await
}

async fn load_conversation(config: &SmokeConfig) -> Result<(), SmokeError> {
    let api = InMemoryChatApi::new(seed_messages()?);
    let mut session =
        ConversationSession::new(SMOKE_CONVERSATION, config.messages_per_page, config.event_buffer);
    let filters = DynamicFilters::new();

    while session.has_more() {
        let merged = session.load_older(&api, &filters).await?;
        if merged == 0 {
            break;
        }
    }

    for message in session.messages() {
        let flags = StatusFlags::of(message);
        info!(
            id = %message.id,
            timestamp = ?message.timestamp,
            reactions = session.reactions_for(&message.id).len(),
            read = flags.read,
            failed = flags.failed,
            "loaded message"
        );
    }
    println!(
        "Loaded {} messages and {} reactions in {} fetches",
        session.store().len(),
        reaction_count(session.reactions()),
        api.fetch_calls()
    );

    session.close();
    Ok(())
}

async fn refresh_templates(config: &SmokeConfig) -> Result<(), SmokeError> {
    let api = ScriptedTemplateApi::new(seed_templates()?).with_pending_polls(config.pending_polls);
    let poller = RefreshPoller::with_event_buffer(
        api.clone(),
        LogNotifier,
        TokioScheduler,
        config.retry_policy(),
        config.event_buffer,
    );
    let session = RefreshSession::new(poller);
    let mut events = session.subscribe();

    session.start();
    let state = session.wait().await.unwrap_or(RefreshJobState::Failed);

    while let Ok(event) = events.try_recv() {
        if let RefreshEvent::RetryScheduled { attempt, max_attempts, .. } = event {
            info!(attempt, max_attempts, "template refresh still running");
        }
    }

    let templates = session.poller().templates();
    info!(
        ?state,
        status_checks = api.status_calls(),
        published = templates.len(),
        "template refresh settled"
    );
    session.shutdown().await;

    if state != RefreshJobState::Succeeded {
        return Err(SmokeError::Refresh(state));
    }
    println!("{}", serde_json::to_string_pretty(&templates)?);
    Ok(())
}

fn seed_messages() -> Result<Vec<Message>, serde_json::Error> {
    serde_json::from_value(json!([
        {
            "id": "m1",
            "conversation_id": SMOKE_CONVERSATION,
            "sender_id": "15550001",
            "timestamp": 1_700_000_000
        },
        {
            "id": "m2",
            "conversation_id": SMOKE_CONVERSATION,
            "from_us": true,
            "timestamp": 1_700_000_060,
            "statuses": { "sent": 1_700_000_061, "delivered": 1_700_000_062, "read": 1_700_000_090 }
        },
        {
            "id": "m3",
            "conversation_id": SMOKE_CONVERSATION,
            "from_us": true,
            "timestamp": 1_700_086_400,
            "is_failed": true
        },
        {
            "id": "r1",
            "conversation_id": SMOKE_CONVERSATION,
            "sender_id": "15550001",
            "timestamp": 1_700_086_401,
            "reaction": { "message_id": "m2", "emoji": "👍" }
        },
        {
            "id": "m4",
            "conversation_id": SMOKE_CONVERSATION,
            "sender_id": "15550001",
            "timestamp": 1_700_086_500
        }
    ]))
}

fn seed_templates() -> Result<Vec<Template>, serde_json::Error> {
    serde_json::from_value(json!([
        { "name": "order_update", "status": "approved", "language": "en_US" },
        { "name": "spring_sale", "status": "pending", "language": "en_US" },
        { "name": "welcome", "status": "approved", "language": "en_US" }
    ]))
}
