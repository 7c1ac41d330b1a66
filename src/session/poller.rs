// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Job status polling.
//!
//! After a processing job is started the poller asks for its status on a
//! fixed interval until it reports `completed` or `error`. On completion it
//! schedules a single navigation to the results view. At most one job is
//! tracked; answers for any other case are ignored.

use crate::models::case::{CaseStatus, JobStatus};
use std::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const REDIRECT_DELAY: Duration = Duration::from_millis(2000);

/// Lifecycle of the tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPhase {
    NotStarted,
    Running,
    Completed,
    Failed(String),
}

/// Work the poller wants done, returned from [`JobPoller::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    /// Issue a status query for this case
    Query(String),
    /// Show the results view for this case
    Navigate(String),
}

/// Reaction to an accepted status answer.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Progress(JobStatus),
    Completed(String),
    Failed { case: String, message: String },
}

#[derive(Debug)]
struct TrackedJob {
    case: String,
    phase: JobPhase,
    next_poll: Instant,
    awaiting_reply: bool,
    redirect_at: Option<Instant>,
}

#[derive(Debug)]
pub struct JobPoller {
    tracked: Option<TrackedJob>,
    interval: Duration,
    redirect_delay: Duration,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self::new(POLL_INTERVAL, REDIRECT_DELAY)
    }
}

impl JobPoller {
    pub fn new(interval: Duration, redirect_delay: Duration) -> Self {
        Self {
            tracked: None,
            interval,
            redirect_delay,
        }
    }

    /// Begin tracking a job that the service just accepted.
    pub fn start(&mut self, case: &str, now: Instant) {
        if let Some(ref old) = self.tracked {
            log::warn!("Replacing poller for {} with {}", old.case, case);
        }
        log::info!("Polling job status for {}", case);
        self.tracked = Some(TrackedJob {
            case: case.to_string(),
            phase: JobPhase::Running,
            next_poll: now + self.interval,
            awaiting_reply: false,
            redirect_at: None,
        });
    }

    /// Stop everything immediately. Later answers are ignored.
    pub fn cancel(&mut self) {
        if let Some(job) = self.tracked.take() {
            log::info!("Stopped polling {}", job.case);
        }
    }

    /// Cancel only if `case` is the tracked one.
    pub fn cancel_case(&mut self, case: &str) {
        if self.tracks(case) {
            self.cancel();
        }
    }

    pub fn tracks(&self, case: &str) -> bool {
        self.tracked.as_ref().is_some_and(|job| job.case == case)
    }

    pub fn tracked_case(&self) -> Option<&str> {
        self.tracked.as_ref().map(|job| job.case.as_str())
    }

    /// Whether a job is still running (processing is disabled meanwhile).
    pub fn is_active(&self) -> bool {
        self.tracked
            .as_ref()
            .is_some_and(|job| job.phase == JobPhase::Running)
    }

    pub fn phase(&self) -> JobPhase {
        self.tracked
            .as_ref()
            .map(|job| job.phase.clone())
            .unwrap_or(JobPhase::NotStarted)
    }

    /// Advance timers. Returns at most one action per call.
    pub fn tick(&mut self, now: Instant) -> Option<PollAction> {
        let job = self.tracked.as_mut()?;
        match job.phase {
            JobPhase::Running if !job.awaiting_reply && now >= job.next_poll => {
                job.awaiting_reply = true;
                Some(PollAction::Query(job.case.clone()))
            }
            JobPhase::Completed => {
                if !job.redirect_at.is_some_and(|at| now >= at) {
                    return None;
                }
                let case = job.case.clone();
                self.tracked = None;
                Some(PollAction::Navigate(case))
            }
            _ => None,
        }
    }

    /// Next instant at which [`tick`](Self::tick) may have work.
    pub fn deadline(&self) -> Option<Instant> {
        let job = self.tracked.as_ref()?;
        match job.phase {
            JobPhase::Running if !job.awaiting_reply => Some(job.next_poll),
            JobPhase::Completed => job.redirect_at,
            _ => None,
        }
    }

    /// Feed a status answer. Answers for untracked cases or settled jobs
    /// are dropped and yield `None`.
    pub fn on_status(&mut self, case: &str, status: JobStatus, now: Instant) -> Option<PollEvent> {
        let job = self.tracked.as_mut().filter(|job| job.case == case)?;
        if job.phase != JobPhase::Running {
            return None;
        }
        job.awaiting_reply = false;

        match status.status {
            CaseStatus::Completed => {
                job.phase = JobPhase::Completed;
                job.redirect_at = Some(now + self.redirect_delay);
                Some(PollEvent::Completed(job.case.clone()))
            }
            CaseStatus::Error => {
                job.phase = JobPhase::Failed(status.message.clone());
                Some(PollEvent::Failed {
                    case: job.case.clone(),
                    message: status.message,
                })
            }
            CaseStatus::Uploaded | CaseStatus::Running | CaseStatus::Unknown => {
                job.next_poll = now + self.interval;
                Some(PollEvent::Progress(status))
            }
        }
    }

    /// A status query failed in transport; try again next interval.
    pub fn on_query_failed(&mut self, case: &str, now: Instant) {
        if let Some(job) = self.tracked.as_mut().filter(|job| job.case == case) {
            job.awaiting_reply = false;
            job.next_poll = now + self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: CaseStatus, message: &str) -> JobStatus {
        JobStatus {
            status,
            message: message.to_string(),
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_query_after_interval() {
        let t0 = Instant::now();
        let mut poller = JobPoller::default();
        poller.start("B", t0);

        assert_eq!(poller.tick(t0 + ms(1999)), None);
        assert_eq!(poller.tick(t0 + ms(2000)), Some(PollAction::Query("B".into())));
        // one query outstanding at a time
        assert_eq!(poller.tick(t0 + ms(5000)), None);
    }

    #[test]
    fn test_running_running_completed_navigates_once() {
        let t0 = Instant::now();
        let mut poller = JobPoller::default();
        poller.start("B", t0);

        let mut t = t0;
        for _ in 0..2 {
            t += ms(2000);
            assert_eq!(poller.tick(t), Some(PollAction::Query("B".into())));
            let event = poller.on_status("B", status(CaseStatus::Running, "Running inference..."), t);
            assert!(matches!(event, Some(PollEvent::Progress(_))));
        }

        t += ms(2000);
        assert_eq!(poller.tick(t), Some(PollAction::Query("B".into())));
        let completed_at = t;
        assert_eq!(
            poller.on_status("B", status(CaseStatus::Completed, "done"), completed_at),
            Some(PollEvent::Completed("B".into()))
        );

        // no more queries, navigation exactly at +2000 ms
        assert_eq!(poller.tick(completed_at + ms(1999)), None);
        assert_eq!(
            poller.tick(completed_at + ms(2000)),
            Some(PollAction::Navigate("B".into()))
        );
        assert_eq!(poller.tick(completed_at + ms(4000)), None);
        assert_eq!(poller.tick(completed_at + ms(10000)), None);
    }

    #[test]
    fn test_error_stops_polling() {
        let t0 = Instant::now();
        let mut poller = JobPoller::default();
        poller.start("B", t0);
        poller.tick(t0 + ms(2000));

        let event = poller.on_status("B", status(CaseStatus::Error, "Docker failed"), t0 + ms(2100));
        assert_eq!(
            event,
            Some(PollEvent::Failed {
                case: "B".into(),
                message: "Docker failed".into()
            })
        );
        assert_eq!(poller.phase(), JobPhase::Failed("Docker failed".into()));
        assert!(!poller.is_active());
        assert_eq!(poller.tick(t0 + ms(60_000)), None);
        assert_eq!(poller.deadline(), None);
    }

    #[test]
    fn test_late_answer_after_terminal_is_ignored() {
        let t0 = Instant::now();
        let mut poller = JobPoller::default();
        poller.start("B", t0);
        poller.tick(t0 + ms(2000));
        poller.on_status("B", status(CaseStatus::Completed, ""), t0 + ms(2100));

        assert_eq!(poller.on_status("B", status(CaseStatus::Running, ""), t0 + ms(2200)), None);
        assert_eq!(poller.phase(), JobPhase::Completed);
    }

    #[test]
    fn test_cancel_drops_late_answers() {
        let t0 = Instant::now();
        let mut poller = JobPoller::default();
        poller.start("A", t0);
        poller.tick(t0 + ms(2000));

        poller.cancel();
        assert_eq!(poller.on_status("A", status(CaseStatus::Completed, ""), t0 + ms(2100)), None);
        assert_eq!(poller.tick(t0 + ms(10_000)), None);
        assert_eq!(poller.phase(), JobPhase::NotStarted);
    }

    #[test]
    fn test_answer_for_other_case_is_ignored() {
        let t0 = Instant::now();
        let mut poller = JobPoller::default();
        poller.start("B", t0);
        assert_eq!(poller.on_status("A", status(CaseStatus::Error, "x"), t0), None);
        assert!(poller.is_active());
    }

    #[test]
    fn test_transport_failure_retries() {
        let t0 = Instant::now();
        let mut poller = JobPoller::default();
        poller.start("B", t0);
        assert!(poller.tick(t0 + ms(2000)).is_some());
        poller.on_query_failed("B", t0 + ms(2050));
        assert_eq!(poller.tick(t0 + ms(3000)), None);
        assert_eq!(poller.tick(t0 + ms(4050)), Some(PollAction::Query("B".into())));
    }
}
