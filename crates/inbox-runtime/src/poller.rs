use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use inbox_core::{
    EventHub, EventStream, InboxError, RefreshEvent, RefreshJob, RefreshJobState, RetryPolicy,
    StatusOutcome, TemplateList, approved_templates, failure_notice,
    normalization::{REFRESH_SUCCEEDED_NOTICE, RELOAD_FAILED_NOTICE},
};
use inbox_platform::{Notifier, Scheduler, TemplateApi};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_EVENT_BUFFER: usize = 64;

/// Drives one template refresh target: issue, poll, reload.
///
/// Job state sits behind a short-held lock. [`RefreshPoller::cancel`] takes
/// the same lock, so once it returns no pending request or timer can apply a
/// result or publish an event.
pub struct RefreshPoller<A, N, S> {
    api: A,
    notifier: N,
    scheduler: S,
    job: Mutex<RefreshJob>,
    templates: Mutex<TemplateList>,
    events: EventHub<RefreshEvent>,
    stop: CancellationToken,
}

impl<A, N, S> RefreshPoller<A, N, S>
where
    A: TemplateApi,
    N: Notifier,
    S: Scheduler,
{
    pub fn new(api: A, notifier: N, scheduler: S, policy: RetryPolicy) -> Self {
        Self::with_event_buffer(api, notifier, scheduler, policy, DEFAULT_EVENT_BUFFER)
    }

    pub fn with_event_buffer(
        api: A,
        notifier: N,
        scheduler: S,
        policy: RetryPolicy,
        event_buffer: usize,
    ) -> Self {
        Self {
            api,
            notifier,
            scheduler,
            job: Mutex::new(RefreshJob::new(policy)),
            templates: Mutex::new(TemplateList::new()),
            events: EventHub::new(event_buffer),
            stop: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> EventStream<RefreshEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> RefreshJobState {
        lock(&self.job).state()
    }

    pub fn attempt(&self) -> u32 {
        lock(&self.job).attempt()
    }

    /// Last published approved template list.
    pub fn templates(&self) -> TemplateList {
        lock(&self.templates).clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Cancel the poller. Pending requests and timers are abandoned and their
    /// results discarded. Terminal for this poller.
    pub fn cancel(&self) {
        let mut job = lock(&self.job);
        let events = job.cancel();
        self.stop.cancel();
        self.events.emit_all(events);
        debug!("template refresh poller cancelled");
    }

    /// Issue a refresh and drive it until it settles.
    ///
    /// A call while a job is already issuing or polling is rejected and
    /// returns the current state.
    pub async fn issue(&self) -> RefreshJobState {
        let accepted = self.apply(|job| match job.issue() {
            Ok(events) => (Ok(()), events),
            Err(err) => (Err(err), Vec::new()),
        });
        match accepted {
            None => return RefreshJobState::Cancelled,
            Some(Err(err)) => {
                warn!(
                    code = %err.code,
                    state = ?self.state(),
                    "template refresh already in progress; ignoring issue"
                );
                return self.state();
            }
            Some(Ok(())) => {}
        }

        info!("issuing template refresh request");
        let result = tokio::select! {
            biased;
            _ = self.stop.cancelled() => return RefreshJobState::Cancelled,
            result = self.api.issue_refresh() => result,
        };
        if let Err(err) = &result {
            warn!(error = %err, "failed to issue template refresh request");
        }

        let state = self.apply(|job| {
            let events = job.on_issue_result(result.as_ref().map(|_| ()));
            (job.state(), events)
        });
        match state {
            Some(RefreshJobState::Polling) => self.poll_until_settled().await,
            Some(state) => state,
            None => RefreshJobState::Cancelled,
        }
    }

    /// Reload the template list and publish the approved entries.
    ///
    /// Used after a successful refresh and for the initial load. Returns the
    /// number of published templates.
    pub async fn reload(&self, announce: bool) -> Result<usize, InboxError> {
        let fetched = tokio::select! {
            biased;
            _ = self.stop.cancelled() => return Err(InboxError::cancelled("reload_templates")),
            fetched = self.api.fetch_templates() => fetched,
        };

        let published = self.apply(|_| match fetched {
            Ok(results) => {
                let templates = approved_templates(results);
                let count = templates.len();
                *lock(&self.templates) = templates.clone();
                info!(count, "loaded templates");
                if announce {
                    self.notifier.display_success(REFRESH_SUCCEEDED_NOTICE);
                }
                (Ok(count), vec![RefreshEvent::TemplatesReloaded { templates }])
            }
            Err(err) => {
                warn!(error = %err, "failed to load templates");
                self.notifier.display_error(RELOAD_FAILED_NOTICE);
                let event = RefreshEvent::ReloadFailed {
                    error_code: err.code.clone(),
                };
                (Err(err), vec![event])
            }
        });

        published.unwrap_or_else(|| Err(InboxError::cancelled("reload_templates")))
    }

    async fn poll_until_settled(&self) -> RefreshJobState {
        loop {
            debug!(attempt = self.attempt(), "checking template refresh status");
            let status = tokio::select! {
                biased;
                _ = self.stop.cancelled() => return RefreshJobState::Cancelled,
                status = self.api.check_refresh_status(&self.stop) => status,
            };
            if let Err(err) = &status {
                debug!(
                    error = %err,
                    transient = err.is_transient(),
                    "template refresh status check failed"
                );
            }

            let outcome = self.apply(|job| {
                let transition = job.on_status(status.as_ref().copied());
                (transition.outcome, transition.events)
            });

            match outcome {
                Some(StatusOutcome::Retry { delay }) => {
                    debug!(
                        attempt = self.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "templates are still being refreshed"
                    );
                    tokio::select! {
                        biased;
                        _ = self.stop.cancelled() => return RefreshJobState::Cancelled,
                        _ = self.scheduler.sleep(delay) => {}
                    }
                }
                Some(StatusOutcome::Reload) => {
                    info!("templates are ready to be loaded");
                    let _ = self.reload(true).await;
                    return self.state();
                }
                Some(StatusOutcome::Stop(reason)) => {
                    warn!(?reason, "template refresh stopped");
                    return self.state();
                }
                Some(StatusOutcome::Ignored) => return self.state(),
                None => return RefreshJobState::Cancelled,
            }
        }
    }

    /// Run `f` against the job under the lock and publish its events.
    ///
    /// Returns `None` without running `f` once the poller is cancelled. Failure
    /// events are reported through the notifier while the lock is held.
    fn apply<T, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&mut RefreshJob) -> (T, Vec<RefreshEvent>),
    {
        let mut job = lock(&self.job);
        if self.stop.is_cancelled() {
            return None;
        }

        let (value, events) = f(&mut job);
        for event in &events {
            if let RefreshEvent::Failed { reason, .. } = event {
                self.notifier.display_error(failure_notice(*reason));
            }
        }
        self.events.emit_all(events);
        Some(value)
    }
}

/// Owns a shared poller and the task currently driving it.
pub struct RefreshSession<A, N, S> {
    poller: Arc<RefreshPoller<A, N, S>>,
    task: Mutex<Option<JoinHandle<RefreshJobState>>>,
}

impl<A, N, S> RefreshSession<A, N, S>
where
    A: TemplateApi + 'static,
    N: Notifier + 'static,
    S: Scheduler + 'static,
{
    pub fn new(poller: RefreshPoller<A, N, S>) -> Self {
        Self {
            poller: Arc::new(poller),
            task: Mutex::new(None),
        }
    }

    pub fn poller(&self) -> &Arc<RefreshPoller<A, N, S>> {
        &self.poller
    }

    pub fn subscribe(&self) -> EventStream<RefreshEvent> {
        self.poller.subscribe()
    }

    /// Spawn a refresh run.
    ///
    /// Returns `false` when a run is still in progress or the poller was
    /// cancelled.
    pub fn start(&self) -> bool {
        if self.poller.is_cancelled() {
            warn!("template refresh poller is cancelled; not starting");
            return false;
        }

        let mut task = lock(&self.task);
        let running = task.as_ref().is_some_and(|running| !running.is_finished());
        if running || self.poller.state().is_active() {
            warn!(state = ?self.poller.state(), "template refresh task is already running");
            return false;
        }

        let poller = Arc::clone(&self.poller);
        *task = Some(tokio::spawn(async move { poller.issue().await }));
        true
    }

    /// Wait for the current run, if any, and return its final state.
    pub async fn wait(&self) -> Option<RefreshJobState> {
        let running = lock(&self.task).take();
        match running {
            Some(task) => task.await.ok(),
            None => None,
        }
    }

    /// Cancel the poller and wait for the running task to unwind.
    pub async fn shutdown(self) -> RefreshJobState {
        self.poller.cancel();
        let running = lock(&self.task).take();
        if let Some(task) = running {
            let _ = task.await;
        }
        self.poller.state()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
