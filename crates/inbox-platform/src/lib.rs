use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use inbox_core::{
    DynamicFilters, FetchParams, FetchedPage, InboxError, Message, RefreshStatus, Template,
    compare_for_display, message_timestamp,
};
use tokio_util::sync::CancellationToken;

/// Template refresh transport.
#[async_trait]
pub trait TemplateApi: Send + Sync {
    /// Ask the server to start synchronizing templates.
    async fn issue_refresh(&self) -> Result<(), InboxError>;

    /// Poll the server-side refresh job.
    async fn check_refresh_status(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RefreshStatus, InboxError>;

    /// Load the full template list.
    async fn fetch_templates(&self) -> Result<Vec<Template>, InboxError>;
}

/// Paginated chat history transport.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch_messages(
        &self,
        params: &FetchParams,
        filters: &DynamicFilters,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, InboxError>;
}

/// User-visible success/error side channel.
pub trait Notifier: Send + Sync {
    fn display_error(&self, message: &str);
    fn display_success(&self, message: &str);
}

/// Timer used between status polls.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Scheduler backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Scheduler that records requested delays and returns without waiting.
#[derive(Debug, Default, Clone)]
pub struct RecordingScheduler {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingScheduler {
    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.delays).clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn sleep(&self, delay: Duration) {
        lock(&self.delays).push(delay);
        tokio::task::yield_now().await;
    }
}

/// One message shown through the [`Notifier`] side channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Success(String),
}

/// Notifier that keeps every notice in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notices: Arc<RwLock<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Error(message) => Some(message),
                Notice::Success(_) => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Success(message) => Some(message),
                Notice::Error(_) => None,
            })
            .collect()
    }

    fn push(&self, notice: Notice) {
        self.notices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

impl Notifier for RecordingNotifier {
    fn display_error(&self, message: &str) {
        self.push(Notice::Error(message.to_owned()));
    }

    fn display_success(&self, message: &str) {
        self.push(Notice::Success(message.to_owned()));
    }
}

#[derive(Debug, Default)]
struct TemplateScript {
    issue_error: Option<InboxError>,
    fetch_error: Option<InboxError>,
    statuses: VecDeque<Result<RefreshStatus, InboxError>>,
    templates: Vec<Template>,
    issue_calls: usize,
    status_calls: usize,
    fetch_calls: usize,
}

/// In-memory template transport replaying a scripted sequence of status results.
///
/// Once the script is used up every status check reports the job as finished.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTemplateApi {
    script: Arc<Mutex<TemplateScript>>,
}

impl ScriptedTemplateApi {
    pub fn new(templates: Vec<Template>) -> Self {
        let api = Self::default();
        lock(&api.script).templates = templates;
        api
    }

    /// Make the start-refresh request fail.
    pub fn with_issue_error(self, error: InboxError) -> Self {
        lock(&self.script).issue_error = Some(error);
        self
    }

    /// Make the template reload fail.
    pub fn with_fetch_error(self, error: InboxError) -> Self {
        lock(&self.script).fetch_error = Some(error);
        self
    }

    /// Report "still refreshing" for the next `polls` status checks.
    pub fn with_pending_polls(self, polls: usize) -> Self {
        for _ in 0..polls {
            self.push_status(Ok(RefreshStatus {
                currently_refreshing: true,
            }));
        }
        self
    }

    /// Queue one status check result.
    pub fn push_status(&self, result: Result<RefreshStatus, InboxError>) {
        lock(&self.script).statuses.push_back(result);
    }

    pub fn issue_calls(&self) -> usize {
        lock(&self.script).issue_calls
    }

    pub fn status_calls(&self) -> usize {
        lock(&self.script).status_calls
    }

    pub fn fetch_calls(&self) -> usize {
        lock(&self.script).fetch_calls
    }
}

#[async_trait]
impl TemplateApi for ScriptedTemplateApi {
    async fn issue_refresh(&self) -> Result<(), InboxError> {
        let mut script = lock(&self.script);
        script.issue_calls += 1;
        match &script.issue_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn check_refresh_status(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RefreshStatus, InboxError> {
        if cancel.is_cancelled() {
            return Err(InboxError::cancelled("check_refresh_status"));
        }
        let mut script = lock(&self.script);
        script.status_calls += 1;
        script.statuses.pop_front().unwrap_or(Ok(RefreshStatus {
            currently_refreshing: false,
        }))
    }

    async fn fetch_templates(&self) -> Result<Vec<Template>, InboxError> {
        let mut script = lock(&self.script);
        script.fetch_calls += 1;
        match &script.fetch_error {
            Some(error) => Err(error.clone()),
            None => Ok(script.templates.clone()),
        }
    }
}

/// In-memory chat history serving newest-first pages.
///
/// Supports timestamp and offset cursors plus `sender_id` / `from_us` dynamic
/// filters; other filter keys are ignored.
#[derive(Debug, Default, Clone)]
pub struct InMemoryChatApi {
    messages: Arc<RwLock<Vec<Message>>>,
    fetch_calls: Arc<Mutex<usize>>,
}

impl InMemoryChatApi {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: Arc::new(RwLock::new(messages)),
            fetch_calls: Arc::default(),
        }
    }

    pub fn fetch_calls(&self) -> usize {
        *lock(&self.fetch_calls)
    }
}

#[async_trait]
impl ChatApi for InMemoryChatApi {
    async fn fetch_messages(
        &self,
        params: &FetchParams,
        filters: &DynamicFilters,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, InboxError> {
        if cancel.is_cancelled() {
            return Err(InboxError::cancelled("fetch_messages"));
        }
        *lock(&self.fetch_calls) += 1;

        let messages = self.messages.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<&Message> = messages
            .iter()
            .filter(|message| message.conversation_id == params.conversation_id)
            .filter(|message| matches_filters(message, filters))
            .filter(|message| {
                params
                    .before_time
                    .is_none_or(|before| message_timestamp(message) < before)
            })
            .collect();
        matching.sort_by(|a, b| compare_for_display(b, a));

        let skip = params.offset.unwrap_or(0);
        let limit = usize::from(params.limit.max(1));
        let results: Vec<Message> = matching
            .iter()
            .skip(skip)
            .take(limit)
            .map(|message| (*message).clone())
            .collect();
        let consumed = skip + results.len();
        let next_cursor = (consumed < matching.len()).then(|| consumed.to_string());

        Ok(FetchedPage {
            results,
            next_cursor,
        })
    }
}

fn matches_filters(message: &Message, filters: &DynamicFilters) -> bool {
    filters.iter().all(|(key, value)| match key.as_str() {
        "sender_id" => message.sender_id.as_deref() == Some(value.as_str()),
        "from_us" => value.parse::<bool>().is_ok_and(|from_us| message.from_us == from_us),
        _ => true,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
