use std::time::Duration;

use crate::{
    error::InboxError,
    retry::RetryPolicy,
    types::{RefreshEvent, RefreshFailure, RefreshJobState, RefreshStatus},
};

/// What the driver should do after a status check was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Check again after `delay`.
    Retry { delay: Duration },
    /// The server job finished; reload the refreshed resource.
    Reload,
    /// The job failed; stop polling.
    Stop(RefreshFailure),
    /// The job is not polling (for example it was cancelled); discard the result.
    Ignored,
}

/// Result of applying a status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub outcome: StatusOutcome,
    pub events: Vec<RefreshEvent>,
}

/// Pure state machine for one template refresh job.
#[derive(Debug, Clone)]
pub struct RefreshJob {
    state: RefreshJobState,
    attempt: u32,
    policy: RetryPolicy,
}

impl Default for RefreshJob {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RefreshJob {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: RefreshJobState::Idle,
            attempt: 0,
            policy,
        }
    }

    pub fn state(&self) -> RefreshJobState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Start a new job.
    ///
    /// Only an idle job issues directly. A settled job (`Succeeded` or
    /// `Failed`) first returns to `Idle`, so reissuing yields two state
    /// changes. Issuing, polling and cancelled jobs reject the call.
    pub fn issue(&mut self) -> Result<Vec<RefreshEvent>, InboxError> {
        if self.state.is_active() || self.state == RefreshJobState::Cancelled {
            return Err(InboxError::invalid_state(self.state, "issue"));
        }

        let mut events = Vec::with_capacity(2);
        self.attempt = 0;
        if self.state != RefreshJobState::Idle {
            events.push(self.enter(RefreshJobState::Idle));
        }
        events.push(self.enter(RefreshJobState::Issuing));
        Ok(events)
    }

    /// Apply the result of the start-refresh request.
    pub fn on_issue_result(&mut self, result: Result<(), &InboxError>) -> Vec<RefreshEvent> {
        if self.state != RefreshJobState::Issuing {
            return Vec::new();
        }

        match result {
            Ok(()) => {
                self.attempt = 0;
                vec![self.enter(RefreshJobState::Polling)]
            }
            Err(err) => self.fail(RefreshFailure::IssueRejected, &err.code),
        }
    }

    /// Apply the result of one status check.
    ///
    /// "Still refreshing" and transient transport errors both consume one
    /// attempt. The job fails once `max_attempts` checks have been used.
    pub fn on_status(&mut self, result: Result<RefreshStatus, &InboxError>) -> StatusTransition {
        if self.state != RefreshJobState::Polling {
            return StatusTransition {
                outcome: StatusOutcome::Ignored,
                events: Vec::new(),
            };
        }

        match result {
            Ok(status) if !status.currently_refreshing => {
                self.attempt = 0;
                StatusTransition {
                    outcome: StatusOutcome::Reload,
                    events: vec![self.enter(RefreshJobState::Succeeded)],
                }
            }
            Err(err) if !err.is_transient() => StatusTransition {
                outcome: StatusOutcome::Stop(RefreshFailure::StatusCheckFailed),
                events: self.fail(RefreshFailure::StatusCheckFailed, &err.code),
            },
            _ => self.consume_attempt(),
        }
    }

    /// Cancel the job. Terminal: every later call is rejected or ignored.
    pub fn cancel(&mut self) -> Vec<RefreshEvent> {
        if self.state == RefreshJobState::Cancelled {
            return Vec::new();
        }
        vec![self.enter(RefreshJobState::Cancelled)]
    }

    fn consume_attempt(&mut self) -> StatusTransition {
        self.attempt = self.attempt.saturating_add(1);
        if self.policy.is_exhausted(self.attempt) {
            let events = self.fail(RefreshFailure::AttemptsExhausted, "too_many_attempts");
            return StatusTransition {
                outcome: StatusOutcome::Stop(RefreshFailure::AttemptsExhausted),
                events,
            };
        }

        let delay = self.policy.retry_delay();
        StatusTransition {
            outcome: StatusOutcome::Retry { delay },
            events: vec![RefreshEvent::RetryScheduled {
                attempt: self.attempt,
                max_attempts: self.policy.max_attempts(),
                delay_ms: self.policy.retry_delay_ms(),
            }],
        }
    }

    fn fail(&mut self, reason: RefreshFailure, code: &str) -> Vec<RefreshEvent> {
        self.attempt = 0;
        vec![
            self.enter(RefreshJobState::Failed),
            RefreshEvent::Failed {
                reason,
                error_code: code.to_owned(),
            },
        ]
    }

    fn enter(&mut self, next: RefreshJobState) -> RefreshEvent {
        self.state = next;
        RefreshEvent::StateChanged {
            state: next,
            attempt: self.attempt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNNING: RefreshStatus = RefreshStatus {
        currently_refreshing: true,
    };
    const DONE: RefreshStatus = RefreshStatus {
        currently_refreshing: false,
    };

    fn polling_job(max_attempts: u32) -> RefreshJob {
        let mut job = RefreshJob::new(RetryPolicy::new(max_attempts, 1_000));
        job.issue().expect("idle job should issue");
        job.on_issue_result(Ok(()));
        assert_eq!(job.state(), RefreshJobState::Polling);
        job
    }

    #[test]
    fn runs_happy_path_transitions() {
        let mut job = RefreshJob::default();
        let events = job.issue().expect("issue must work");
        assert_eq!(
            events,
            vec![RefreshEvent::StateChanged {
                state: RefreshJobState::Issuing,
                attempt: 0
            }]
        );

        job.on_issue_result(Ok(()));
        assert_eq!(job.state(), RefreshJobState::Polling);

        let transition = job.on_status(Ok(RUNNING));
        assert_eq!(
            transition.outcome,
            StatusOutcome::Retry {
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(job.attempt(), 1);

        let transition = job.on_status(Ok(DONE));
        assert_eq!(transition.outcome, StatusOutcome::Reload);
        assert_eq!(job.state(), RefreshJobState::Succeeded);
        assert_eq!(job.attempt(), 0);
    }

    #[test]
    fn issue_failure_is_terminal_until_reissued() {
        let mut job = RefreshJob::default();
        job.issue().expect("issue must work");
        let err = InboxError::from_http_status(500, "boom");
        let events = job.on_issue_result(Err(&err));

        assert_eq!(job.state(), RefreshJobState::Failed);
        assert!(events.contains(&RefreshEvent::Failed {
            reason: RefreshFailure::IssueRejected,
            error_code: "http_error".to_owned(),
        }));

        assert_eq!(job.on_status(Ok(DONE)).outcome, StatusOutcome::Ignored);
        let events = job.issue().expect("failed job can be reissued");
        assert_eq!(
            events,
            vec![
                RefreshEvent::StateChanged {
                    state: RefreshJobState::Idle,
                    attempt: 0,
                },
                RefreshEvent::StateChanged {
                    state: RefreshJobState::Issuing,
                    attempt: 0,
                },
            ]
        );
        assert_eq!(job.state(), RefreshJobState::Issuing);
    }

    #[test]
    fn exhausts_budget_after_max_attempts_checks() {
        let mut job = polling_job(3);

        assert!(matches!(job.on_status(Ok(RUNNING)).outcome, StatusOutcome::Retry { .. }));
        assert!(matches!(job.on_status(Ok(RUNNING)).outcome, StatusOutcome::Retry { .. }));
        let last = job.on_status(Ok(RUNNING));

        assert_eq!(
            last.outcome,
            StatusOutcome::Stop(RefreshFailure::AttemptsExhausted)
        );
        assert_eq!(job.state(), RefreshJobState::Failed);
        assert_eq!(job.attempt(), 0);
        assert!(last.events.contains(&RefreshEvent::Failed {
            reason: RefreshFailure::AttemptsExhausted,
            error_code: "too_many_attempts".to_owned(),
        }));
    }

    #[test]
    fn attempt_never_exceeds_budget() {
        let mut job = polling_job(2);
        for _ in 0..5 {
            job.on_status(Ok(RUNNING));
            assert!(job.attempt() <= job.policy().max_attempts());
        }
    }

    #[test]
    fn transient_errors_count_as_still_running() {
        let mut job = polling_job(5);
        let timeout = InboxError::timeout("slow");
        let gateway = InboxError::from_http_status(504, "gateway timeout");

        assert!(matches!(job.on_status(Err(&timeout)).outcome, StatusOutcome::Retry { .. }));
        assert!(matches!(job.on_status(Err(&gateway)).outcome, StatusOutcome::Retry { .. }));
        assert_eq!(job.attempt(), 2);
        assert_eq!(job.state(), RefreshJobState::Polling);
    }

    #[test]
    fn non_transient_error_fails_immediately() {
        let mut job = polling_job(5);
        let err = InboxError::from_http_status(401, "denied");
        let transition = job.on_status(Err(&err));

        assert_eq!(
            transition.outcome,
            StatusOutcome::Stop(RefreshFailure::StatusCheckFailed)
        );
        assert_eq!(job.state(), RefreshJobState::Failed);
    }

    #[test]
    fn rejects_issue_while_active() {
        let mut job = polling_job(5);
        let err = job.issue().expect_err("second issue must be rejected");
        assert_eq!(err.code, "invalid_state_transition");
        assert_eq!(job.state(), RefreshJobState::Polling);
    }

    #[test]
    fn cancelled_job_ignores_everything() {
        let mut job = polling_job(5);
        let events = job.cancel();
        assert_eq!(
            events,
            vec![RefreshEvent::StateChanged {
                state: RefreshJobState::Cancelled,
                attempt: 0
            }]
        );

        assert_eq!(job.on_status(Ok(DONE)).outcome, StatusOutcome::Ignored);
        assert!(job.on_issue_result(Ok(())).is_empty());
        assert!(job.cancel().is_empty());
        assert!(job.issue().is_err());
        assert_eq!(job.state(), RefreshJobState::Cancelled);
    }
}
