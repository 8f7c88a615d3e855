//! Error types for the appointment book.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("a patient must be selected before saving an appointment")]
    MissingPatient,

    #[error("unknown patient: {0}")]
    UnknownPatient(String),

    #[error("a treatment or procedure must be chosen before saving an appointment")]
    MissingTreatment,

    #[error("a block requires a reason")]
    MissingBlockReason,

    #[error("duration must be positive, got {0} minutes")]
    InvalidDuration(u32),

    #[error("operatory must be 1 or higher, got {0}")]
    InvalidOperatory(u32),

    #[error("invalid time label '{0}', expected HH:MM")]
    InvalidTimeLabel(String),

    #[error("invalid status '{0}', expected one of: unconfirmed, confirmed, arrived, seated, ready, completed, broken, cancelled")]
    InvalidStatus(String),

    #[error("appointment not found: {0}")]
    NotFound(String),

    #[error("appointment {0} is a block and has no visit fields")]
    NotAVisit(String),

    #[error("slot unavailable, overlaps appointment {conflicting_id}")]
    SlotUnavailable { conflicting_id: String },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
