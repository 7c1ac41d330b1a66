// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Single-slot, auto-expiring user notifications.
//!
//! The newest notification replaces the visible one and restarts its
//! timer. There is no backlog.

use std::time::{Duration, Instant};

/// Default lifetime of a notification.
pub const NOTIFICATION_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub created: Instant,
}

#[derive(Debug)]
pub struct NotificationQueue {
    current: Option<Notification>,
    ttl: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(NOTIFICATION_TTL)
    }
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self { current: None, ttl }
    }

    /// Show a message, superseding whatever is visible.
    pub fn notify(&mut self, message: impl Into<String>, severity: Severity, now: Instant) {
        let message = message.into();
        match severity {
            Severity::Error => log::error!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Info | Severity::Success => log::info!("{}", message),
        }
        self.current = Some(Notification {
            message,
            severity,
            created: now,
        });
    }

    /// User-triggered dismissal.
    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Drop the visible notification once its lifetime has elapsed.
    pub fn expire(&mut self, now: Instant) {
        if let Some(ref n) = self.current {
            if now.saturating_duration_since(n.created) >= self.ttl {
                self.current = None;
            }
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// When the visible notification will expire, for repaint scheduling.
    pub fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|n| n.created + self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_ttl() {
        let start = Instant::now();
        let mut queue = NotificationQueue::default();
        queue.notify("Segmentation cleared", Severity::Success, start);

        queue.expire(start + Duration::from_millis(4999));
        assert!(queue.current().is_some());

        queue.expire(start + Duration::from_millis(5000));
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_newer_notification_restarts_timer() {
        let start = Instant::now();
        let mut queue = NotificationQueue::default();
        queue.notify("first", Severity::Info, start);
        queue.notify("second", Severity::Error, start + Duration::from_secs(3));

        queue.expire(start + Duration::from_secs(6));
        let current = queue.current().unwrap();
        assert_eq!(current.message, "second");
        assert_eq!(current.severity, Severity::Error);

        queue.expire(start + Duration::from_secs(8));
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_dismiss() {
        let mut queue = NotificationQueue::default();
        queue.notify("hello", Severity::Info, Instant::now());
        queue.dismiss();
        assert!(queue.current().is_none());
        assert!(queue.deadline().is_none());
    }
}
