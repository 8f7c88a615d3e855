//! User-facing notifications and the audit trail.
//!
//! Mutations push a toast-style [`Notification`] and, for schedule changes,
//! an [`AuditEntry`]. The front end drains notifications after each action.

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::models::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Label shown in front of the notification.
    pub fn name(&self) -> &str {
        match self {
            Severity::Success => "SUCCESS",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Moved,
    Edited,
    Cancelled,
    Deleted,
    Pinned,
    Waitlisted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub appointment_id: String,
    pub recorded_at: NaiveDateTime,
    /// Copy of the record as it left the schedule, kept for cancellations.
    pub snapshot: Option<Appointment>,
}

/// Pending notifications plus the append-only audit log.
#[derive(Debug, Default)]
pub struct ActivityLog {
    notifications: Vec<Notification>,
    audit: Vec<AuditEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Warning | Severity::Error => warn!(severity = severity.name(), "{}", message),
            Severity::Success | Severity::Info => info!(severity = severity.name(), "{}", message),
        }
        self.notifications.push(Notification { message, severity });
    }

    pub fn record(&mut self, action: AuditAction, appointment_id: &str, snapshot: Option<Appointment>) {
        self.audit.push(AuditEntry {
            action,
            appointment_id: appointment_id.to_string(),
            recorded_at: Local::now().naive_local(),
            snapshot,
        });
    }

    /// Take all pending notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }
}
