// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interactive segmentation session controller.
//!
//! The controller owns the session state of the selected case, the point
//! store, the slice presenter, the job poller and the notification slot.
//! User actions and service replies are the only inputs; I/O is requested
//! by queuing [`Request`]s which the app hands to the worker.
//!
//! Per case, at most one mask-mutating call (interact or clear) is in
//! flight. Local state changes only after the service accepted a call.

use crate::error::SessionError;
use crate::models::case::{Case, CaseStatus, JobStatus, SegmentationStats, VolumeInfo};
use crate::models::point::{InteractionMode, InteractionPoint, PointsExport};
use crate::session::notify::{Notification, NotificationQueue, Severity};
use crate::session::points::InteractionPointStore;
use crate::session::poller::{JobPoller, PollAction, PollEvent};
use crate::session::presenter::{DisplayedSlice, LoadOutcome, SlicePresenter};
use crate::session::request::{Reply, Request};
use crate::util::geometry::{pointer_to_voxel, DisplayRect};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Timer settings of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub poll_interval: Duration,
    pub redirect_delay: Duration,
    pub notification_ttl: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            poll_interval: crate::session::poller::POLL_INTERVAL,
            redirect_delay: crate::session::poller::REDIRECT_DELAY,
            notification_ttl: crate::session::notify::NOTIFICATION_TTL,
        }
    }
}

/// State of the selected case.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub case: String,
    pub volume: Option<VolumeInfo>,
    pub current_slice: u32,
    pub mode: InteractionMode,
    /// An interact or clear call for this case is in flight
    pub requesting: bool,
    pub stats: Option<SegmentationStats>,
    pub last_error: Option<SessionError>,
}

impl SessionState {
    fn new(case: &str, mode: InteractionMode, requesting: bool) -> Self {
        Self {
            case: case.to_string(),
            volume: None,
            current_slice: 0,
            mode,
            requesting,
            stats: None,
            last_error: None,
        }
    }
}

/// Which top-level view the app should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Viewer,
    Results(String),
}

pub struct SessionController {
    session: Option<SessionState>,
    mode: InteractionMode,
    cases: Vec<Case>,
    points: InteractionPointStore,
    presenter: SlicePresenter,
    poller: JobPoller,
    notifications: NotificationQueue,
    /// Cases with an interact/clear call in flight
    in_flight: HashSet<String>,
    job_status: Option<(String, JobStatus)>,
    logs: Option<(String, Vec<String>)>,
    view: View,
    outbox: Vec<Request>,
    shut_down: bool,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(SessionTimings::default())
    }
}

impl SessionController {
    pub fn new(timings: SessionTimings) -> Self {
        Self::with_presenter(timings, SlicePresenter::default())
    }

    /// Controller using a specific presenter (deterministic tokens in tests).
    pub fn with_presenter(timings: SessionTimings, presenter: SlicePresenter) -> Self {
        Self {
            session: None,
            mode: InteractionMode::default(),
            cases: Vec::new(),
            points: InteractionPointStore::new(),
            presenter,
            poller: JobPoller::new(timings.poll_interval, timings.redirect_delay),
            notifications: NotificationQueue::new(timings.notification_ttl),
            in_flight: HashSet::new(),
            job_status: None,
            logs: None,
            view: View::Viewer,
            outbox: Vec::new(),
            shut_down: false,
        }
    }

    // ----- accessors -------------------------------------------------------

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn selected_case(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.case.as_str())
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn points(&self) -> &InteractionPointStore {
        &self.points
    }

    /// Points of the displayed slice of the selected case.
    pub fn current_points(&self) -> &[InteractionPoint] {
        match self.session {
            Some(ref s) => self.points.get_points(&s.case, s.current_slice),
            None => &[],
        }
    }

    /// Snapshot of every accepted point of the selected case.
    pub fn export_points(&self) -> Option<PointsExport> {
        let case = self.selected_case()?;
        Some(PointsExport {
            case: case.to_string(),
            points: self.points.all_points(case),
        })
    }

    pub fn displayed_slice(&self) -> Option<&DisplayedSlice> {
        self.presenter.displayed()
    }

    pub fn image_loading(&self) -> bool {
        self.presenter.is_loading()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    pub fn dismiss_notification(&mut self) {
        self.notifications.dismiss();
    }

    /// Status of the tracked processing job.
    pub fn job_status(&self) -> Option<(&str, &JobStatus)> {
        self.job_status.as_ref().map(|(case, s)| (case.as_str(), s))
    }

    pub fn processing_active(&self) -> bool {
        self.poller.is_active()
    }

    pub fn logs(&self) -> Option<(&str, &[String])> {
        self.logs
            .as_ref()
            .map(|(case, lines)| (case.as_str(), lines.as_slice()))
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn show_viewer(&mut self) {
        self.view = View::Viewer;
    }

    /// Whether the selected case has a mutating call in flight.
    pub fn is_busy(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.requesting)
    }

    /// Hand the queued requests to the caller for execution.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    /// Earliest instant at which [`tick`](Self::tick) has timer work.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.notifications.deadline(), self.poller.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ----- user actions ----------------------------------------------------

    /// Write the points of the selected case to a YAML or JSON file.
    /// The outcome is reported as a notification.
    pub fn export_points_to(&mut self, path: &Path, now: Instant) -> anyhow::Result<usize> {
        let export = self
            .export_points()
            .ok_or_else(|| SessionError::NotReady("Please select a case first".into()))?;
        match crate::io::serialization::export(&export, path) {
            Ok(()) => {
                let message = format!(
                    "Exported {} points of {} to {}",
                    export.points.len(),
                    export.case,
                    path.display()
                );
                self.notifications.notify(message, Severity::Success, now);
                Ok(export.points.len())
            }
            Err(e) => {
                self.notifications.notify(
                    format!("Failed to export points: {:#}", e),
                    Severity::Error,
                    now,
                );
                Err(e)
            }
        }
    }

    /// Ask the service for the list of uploaded cases.
    pub fn refresh_cases(&mut self) {
        self.outbox.push(Request::ListCases);
    }

    /// Open a case: fresh session, volume info fetch, mid-slice once loaded.
    ///
    /// Selecting the open case again only retries a failed volume info fetch.
    pub fn select_case(&mut self, name: &str) {
        if let Some(session) = self.session.as_mut().filter(|s| s.case == name) {
            if session.volume.is_none() && session.last_error.take().is_some() {
                log::info!("Retrying volume info for {}", name);
                self.outbox.push(Request::VolumeInfo {
                    case: name.to_string(),
                });
            }
            return;
        }
        if let Some(tracked) = self
            .poller
            .tracked_case()
            .filter(|tracked| *tracked != name)
            .map(str::to_string)
        {
            self.poller.cancel();
            self.job_status = None;
            if self.cases.iter().any(|c| c.name == tracked && c.status == CaseStatus::Running) {
                self.set_case_status(&tracked, CaseStatus::Unknown, "Status polling stopped");
            }
        }
        self.presenter.reset();
        self.session = Some(SessionState::new(
            name,
            self.mode,
            self.in_flight.contains(name),
        ));
        log::info!("Selected case {}", name);
        self.outbox.push(Request::VolumeInfo {
            case: name.to_string(),
        });
    }

    /// Close the viewer: stop polling and ignore every later reply.
    pub fn shutdown(&mut self) {
        self.poller.cancel();
        self.session = None;
        self.presenter.reset();
        self.outbox.clear();
        self.shut_down = true;
    }

    /// Show another slice of the same volume. The mask is kept.
    pub fn change_slice(&mut self, index: i64) -> Result<(), SessionError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SessionError::NotReady("no case selected".into()))?;
        let volume = session
            .volume
            .as_ref()
            .ok_or_else(|| SessionError::NotReady("volume info not loaded".into()))?;
        if index < 0 || index > volume.max_slice as i64 {
            let err = SessionError::InvalidSlice {
                index,
                max: volume.max_slice,
            };
            log::debug!("{}", err);
            return Err(err);
        }
        session.current_slice = index as u32;
        self.reload_slice();
        Ok(())
    }

    /// Polarity of future points.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        if let Some(ref mut session) = self.session {
            session.mode = mode;
        }
    }

    /// Handle a click on the displayed slice image.
    ///
    /// Local rejections (`NotReady`, `Busy`, `OutOfBounds`) are also shown
    /// as a warning notification.
    pub fn click(
        &mut self,
        pointer_x: f32,
        pointer_y: f32,
        rect: &DisplayRect,
        now: Instant,
    ) -> Result<InteractionPoint, SessionError> {
        let result = self.try_click(pointer_x, pointer_y, rect);
        if let Err(ref err) = result {
            self.notifications
                .notify(err.to_string(), Severity::Warning, now);
        }
        result
    }

    fn try_click(
        &mut self,
        pointer_x: f32,
        pointer_y: f32,
        rect: &DisplayRect,
    ) -> Result<InteractionPoint, SessionError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SessionError::NotReady("Please select a case first".into()))?;
        let volume = session
            .volume
            .as_ref()
            .ok_or_else(|| SessionError::NotReady("Image information not loaded yet".into()))?;
        if self.in_flight.contains(&session.case) {
            return Err(SessionError::Busy(session.case.clone()));
        }

        let (x, y) = pointer_to_voxel(pointer_x, pointer_y, rect, Some(volume))?.within(volume)?;
        let point = InteractionPoint::new(x, y, session.current_slice, session.mode);

        log::debug!(
            "Click at ({:.1}, {:.1}) in {:?} -> voxel ({}, {}, {})",
            pointer_x,
            pointer_y,
            rect,
            point.x,
            point.y,
            point.z
        );

        session.requesting = true;
        self.in_flight.insert(session.case.clone());
        self.outbox.push(Request::Interact {
            case: session.case.clone(),
            point,
        });
        Ok(point)
    }

    /// Discard the mask and points of the selected case.
    pub fn clear_segmentation(&mut self, now: Instant) -> Result<(), SessionError> {
        let result = self.try_clear();
        if let Err(ref err) = result {
            self.notifications
                .notify(err.to_string(), Severity::Warning, now);
        }
        result
    }

    fn try_clear(&mut self) -> Result<(), SessionError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SessionError::NotReady("no case selected".into()))?;
        if self.in_flight.contains(&session.case) {
            return Err(SessionError::Busy(session.case.clone()));
        }
        session.requesting = true;
        self.in_flight.insert(session.case.clone());
        self.outbox.push(Request::ClearSegmentation {
            case: session.case.clone(),
        });
        Ok(())
    }

    /// Launch the external processing job for a case.
    pub fn start_processing(&mut self, case: &str, now: Instant) -> Result<(), SessionError> {
        if let Some(tracked) = self.poller.tracked_case().filter(|_| self.poller.is_active()) {
            let err = SessionError::Busy(tracked.to_string());
            self.notifications
                .notify(err.to_string(), Severity::Warning, now);
            return Err(err);
        }
        self.outbox.push(Request::StartProcessing {
            case: case.to_string(),
        });
        Ok(())
    }

    pub fn fetch_logs(&mut self, case: &str) {
        self.outbox.push(Request::Logs {
            case: case.to_string(),
        });
    }

    pub fn delete_case(&mut self, case: &str) {
        self.outbox.push(Request::DeleteCase {
            case: case.to_string(),
        });
    }

    pub fn download_results(&mut self, case: &str, destination: PathBuf) {
        self.outbox.push(Request::DownloadResults {
            case: case.to_string(),
            destination,
        });
    }

    // ----- timers and replies ----------------------------------------------

    /// Advance notification expiry, status polling and navigation.
    pub fn tick(&mut self, now: Instant) {
        if self.shut_down {
            return;
        }
        self.notifications.expire(now);
        while let Some(action) = self.poller.tick(now) {
            match action {
                PollAction::Query(case) => self.outbox.push(Request::JobStatus { case }),
                PollAction::Navigate(case) => {
                    log::info!("Showing results for {}", case);
                    self.view = View::Results(case);
                }
            }
        }
    }

    /// Apply a reply from the worker.
    pub fn handle(&mut self, reply: Reply, now: Instant) {
        if self.shut_down {
            log::debug!("Ignoring reply after shutdown: {:?}", reply);
            return;
        }
        match reply {
            Reply::Cases(result) => self.on_cases(result, now),
            Reply::VolumeInfo { case, result } => self.on_volume_info(&case, result, now),
            Reply::SliceImage { ticket, result } => match self.presenter.on_loaded(&ticket, result) {
                LoadOutcome::Fallback(fallback) => self.outbox.push(Request::SliceImage(fallback)),
                LoadOutcome::Failed(_) => self.notifications.notify(
                    "Failed to load CT slice image. Please check if the case exists.",
                    Severity::Error,
                    now,
                ),
                LoadOutcome::Displayed | LoadOutcome::Superseded => {}
            },
            Reply::InteractionPoints {
                case,
                slice,
                revision,
                result,
            } => match result {
                Ok(points) if self.selected_case() == Some(case.as_str()) => {
                    self.points.replace_slice(&case, slice, points, revision);
                }
                Ok(_) => log::debug!("Dropping point listing for deselected case {}", case),
                Err(err) => log::warn!("Error loading interaction points for {}: {}", case, err),
            },
            Reply::Interact {
                case,
                point,
                result,
            } => self.on_interact(&case, point, result, now),
            Reply::ClearSegmentation { case, result } => self.on_cleared(&case, result, now),
            Reply::StartProcessing { case, result } => match result {
                Ok(()) => {
                    self.poller.start(&case, now);
                    self.set_case_status(&case, CaseStatus::Running, "Processing started");
                    self.job_status = Some((
                        case.clone(),
                        JobStatus {
                            status: CaseStatus::Running,
                            message: "Processing started".into(),
                        },
                    ));
                    self.logs = None;
                    self.notifications
                        .notify("Processing started...", Severity::Info, now);
                }
                Err(err) => self.notifications.notify(
                    format!("Failed to start processing: {}", err),
                    Severity::Error,
                    now,
                ),
            },
            Reply::JobStatus { case, result } => self.on_job_status(&case, result, now),
            Reply::Logs { case, result } => match result {
                Ok(lines) => self.logs = Some((case, lines)),
                Err(err) => log::warn!("Error loading logs for {}: {}", case, err),
            },
            Reply::DeleteCase { case, result } => self.on_deleted(&case, result, now),
            Reply::DownloadResults { case, result } => match result {
                Ok(path) => self.notifications.notify(
                    format!("Results for {} saved to {}", case, path.display()),
                    Severity::Success,
                    now,
                ),
                Err(err) => self.notifications.notify(
                    format!("Download failed: {}", err),
                    Severity::Error,
                    now,
                ),
            },
        }
    }

    fn reload_slice(&mut self) {
        let Some(ref session) = self.session else {
            return;
        };
        if session.volume.is_none() {
            return;
        }
        let ticket = self.presenter.request(&session.case, session.current_slice);
        self.outbox.push(Request::SliceImage(ticket));
        self.outbox.push(Request::InteractionPoints {
            case: session.case.clone(),
            slice: session.current_slice,
            revision: self.points.revision(&session.case),
        });
    }

    fn session_for(&mut self, case: &str) -> Option<&mut SessionState> {
        self.session.as_mut().filter(|s| s.case == case)
    }

    fn set_case_status(&mut self, case: &str, status: CaseStatus, message: &str) {
        if let Some(entry) = self.cases.iter_mut().find(|c| c.name == case) {
            entry.status = status;
            entry.message = message.to_string();
        }
    }

    fn on_cases(&mut self, result: Result<Vec<Case>, SessionError>, now: Instant) {
        match result {
            Ok(mut cases) => {
                for case in cases.iter_mut() {
                    let known = self.cases.iter().find(|c| c.name == case.name);
                    if let Some(known) = known {
                        // Running is only trusted while the poller still follows the job
                        if known.status == CaseStatus::Running && !self.poller.tracks(&case.name) {
                            continue;
                        }
                        case.status = known.status;
                        case.message = known.message.clone();
                    }
                }
                log::info!("Loaded {} cases", cases.len());
                self.cases = cases;
            }
            Err(err) => self.notifications.notify(
                format!("Error loading cases: {}", err),
                Severity::Error,
                now,
            ),
        }
    }

    fn on_volume_info(
        &mut self,
        case: &str,
        result: Result<VolumeInfo, SessionError>,
        now: Instant,
    ) {
        let Some(session) = self.session_for(case) else {
            log::debug!("Dropping volume info for deselected case {}", case);
            return;
        };
        match result {
            Ok(info) => {
                let info = info.normalized();
                session.current_slice = info.mid_slice();
                let message = format!("Loaded case {} with {} slices", case, info.slice_count());
                session.volume = Some(info);
                self.notifications.notify(message, Severity::Success, now);
                self.reload_slice();
            }
            Err(err) => {
                let message = format!("Failed to load image info: {}", err);
                session.last_error = Some(err);
                self.notifications.notify(message, Severity::Error, now);
            }
        }
    }

    fn on_interact(
        &mut self,
        case: &str,
        point: InteractionPoint,
        result: Result<SegmentationStats, SessionError>,
        now: Instant,
    ) {
        self.in_flight.remove(case);
        if let Some(session) = self.session_for(case) {
            session.requesting = false;
        }

        match result {
            Ok(stats) => {
                // accepted by the service, so it belongs in the cache
                self.points.add_point(case, point);
                let Some(session) = self.session_for(case) else {
                    log::info!("Interaction on {} finished after it was deselected", case);
                    return;
                };
                session.stats = Some(stats);
                session.last_error = None;
                let polarity = if point.positive { "Positive" } else { "Negative" };
                self.notifications.notify(
                    format!("{} point added at ({}, {})", polarity, point.x, point.y),
                    Severity::Success,
                    now,
                );
                self.reload_slice();
            }
            Err(err) => {
                let message = format!("Segmentation failed: {}", err);
                if let Some(session) = self.session_for(case) {
                    session.last_error = Some(err);
                    self.notifications.notify(message, Severity::Error, now);
                } else {
                    log::warn!("{} (case {})", message, case);
                }
            }
        }
    }

    fn on_cleared(&mut self, case: &str, result: Result<(), SessionError>, now: Instant) {
        self.in_flight.remove(case);
        if let Some(session) = self.session_for(case) {
            session.requesting = false;
        }

        match result {
            Ok(()) => {
                self.points.clear(case);
                if let Some(session) = self.session_for(case) {
                    session.stats = None;
                    session.last_error = None;
                    self.notifications
                        .notify("Segmentation cleared", Severity::Success, now);
                    self.reload_slice();
                }
            }
            Err(err) => {
                let message = format!("Error clearing segmentation: {}", err);
                if let Some(session) = self.session_for(case) {
                    session.last_error = Some(err);
                }
                self.notifications.notify(message, Severity::Error, now);
            }
        }
    }

    fn on_job_status(&mut self, case: &str, result: Result<JobStatus, SessionError>, now: Instant) {
        let status = match result {
            Ok(status) => status,
            Err(err) => {
                log::warn!("Error checking status of {}: {}", case, err);
                self.poller.on_query_failed(case, now);
                return;
            }
        };

        let Some(event) = self.poller.on_status(case, status.clone(), now) else {
            log::debug!("Ignoring status for untracked job {}", case);
            return;
        };
        self.set_case_status(case, status.status, &status.message);
        self.job_status = Some((case.to_string(), status));

        match event {
            PollEvent::Progress(_) => {}
            PollEvent::Completed(case) => {
                log::info!("Processing of {} completed", case);
                self.notifications.notify(
                    "Processing completed! Redirecting to results...",
                    Severity::Success,
                    now,
                );
            }
            PollEvent::Failed { message, .. } => {
                self.notifications.notify(
                    format!("Processing failed: {}", message),
                    Severity::Error,
                    now,
                );
            }
        }
    }

    fn on_deleted(&mut self, case: &str, result: Result<(), SessionError>, now: Instant) {
        if let Err(err) = result {
            self.notifications.notify(
                format!("Failed to delete {}: {}", case, err),
                Severity::Error,
                now,
            );
            return;
        }

        self.cases.retain(|c| c.name != case);
        self.points.remove_case(case);
        self.in_flight.remove(case);
        self.poller.cancel_case(case);
        if self.job_status.as_ref().is_some_and(|(c, _)| c == case) {
            self.job_status = None;
        }
        if self.logs.as_ref().is_some_and(|(c, _)| c == case) {
            self.logs = None;
        }
        if self.selected_case() == Some(case) {
            self.session = None;
            self.presenter.reset();
        }
        if self.view == View::Results(case.to_string()) {
            self.view = View::Viewer;
        }
        self.notifications.notify(
            format!("{} deleted successfully", case),
            Severity::Success,
            now,
        );
        self.refresh_cases();
    }
}
