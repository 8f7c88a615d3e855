//! Data models for the appointment book.
//!
//! - AppointmentStatus: status codes shown on appointment cards
//! - Provider: the fixed roster of clinicians and their colors
//! - Patient: opaque patient record, looked up by id
//! - Appointment: a scheduled visit or a provider block
//! - VisitDraft / BlockDraft: unsaved appointments coming from the booking forms

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use crate::error::{SchedulerError, SchedulerResult};

/// Patient id reported for block entries, which never reference a patient.
pub const BLOCK_PATIENT_ID: &str = "BLOCK";

/// Color used when a provider is not on the roster.
pub const FALLBACK_COLOR: &str = "gray";

/// Status codes for a patient visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppointmentStatus {
    #[default]
    Unconfirmed,
    Confirmed,
    Arrived,
    Seated,
    Ready,
    Completed,
    Broken,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 8] = [
        AppointmentStatus::Unconfirmed,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Arrived,
        AppointmentStatus::Seated,
        AppointmentStatus::Ready,
        AppointmentStatus::Completed,
        AppointmentStatus::Broken,
        AppointmentStatus::Cancelled,
    ];

    /// Parse a status from its name or short code, ignoring case.
    pub fn from_string(value: &str) -> SchedulerResult<Self> {
        let needle = value.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name().to_lowercase() == needle || s.code().to_lowercase() == needle)
            .ok_or_else(|| SchedulerError::InvalidStatus(value.to_string()))
    }

    /// Upper-case status name.
    pub fn name(&self) -> &'static str {
        match self {
            AppointmentStatus::Unconfirmed => "UNCONFIRMED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Arrived => "ARRIVED",
            AppointmentStatus::Seated => "SEATED",
            AppointmentStatus::Ready => "READY",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Broken => "BROKEN",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Two-letter code printed on grid cells.
    pub fn code(&self) -> &'static str {
        match self {
            AppointmentStatus::Unconfirmed => "UC",
            AppointmentStatus::Confirmed => "CF",
            AppointmentStatus::Arrived => "AR",
            AppointmentStatus::Seated => "ST",
            AppointmentStatus::Ready => "RD",
            AppointmentStatus::Completed => "CP",
            AppointmentStatus::Broken => "BR",
            AppointmentStatus::Cancelled => "CX",
        }
    }
}

/// A clinician on the practice roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    pub name: &'static str,
    pub role: &'static str,
    pub color: &'static str,
}

pub const PROVIDERS: [Provider; 5] = [
    Provider { name: "Dr. Smith", role: "Dentist", color: "blue" },
    Provider { name: "Dr. Jones", role: "Dentist", color: "green" },
    Provider { name: "Dr. Patel", role: "Oral Surgeon", color: "purple" },
    Provider { name: "Sarah RDH", role: "Hygienist", color: "teal" },
    Provider { name: "Mike RDH", role: "Hygienist", color: "orange" },
];

/// Look up a roster entry by name.
pub fn find_provider(name: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.name == name)
}

/// Color token for a provider, falling back to a neutral color.
pub fn provider_color(name: &str) -> &'static str {
    find_provider(name).map(|p| p.color).unwrap_or(FALLBACK_COLOR)
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsuranceSummary {
    pub carrier: String,
    pub plan: String,
    pub eligibility: String,
}

/// Represents a patient. The appointment book only reads these.
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub insurance: Vec<InsuranceSummary>,
    pub alerts: Vec<String>,
    pub balance: f64,
}

impl Patient {
    /// "Last, First" as shown in the patient picker.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Patient lookup used by the booking flow.
pub trait PatientLookup {
    fn find_by_id(&self, id: &str) -> Option<&Patient>;
}

/// In-memory patient directory keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PatientRegistry {
    patients: HashMap<String, Patient>,
}

impl PatientRegistry {
    pub fn new(patients: Vec<Patient>) -> Self {
        PatientRegistry {
            patients: patients.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

}

impl PatientLookup for PatientRegistry {
    fn find_by_id(&self, id: &str) -> Option<&Patient> {
        self.patients.get(id)
    }
}

/// Visit-only fields of an appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub patient_id: String,
    pub additional_provider: Option<String>,
    pub treatment: String,
    pub procedure_code: Option<String>,
    pub fee: Option<f64>,
    pub status: AppointmentStatus,
    pub appointment_type: String,
    pub notes: String,
    pub is_new_patient: bool,
    pub has_note: bool,
    pub insurance_eligibility: Option<String>,
    pub lab_case: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentKind {
    Visit(Visit),
    /// Provider unavailability.
    Block { reason: String },
}

/// An entry on the appointment book.
///
/// Occupies the half-open interval `[start_time, start_time + duration)` in
/// exactly one operatory.
#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub start_time: NaiveDateTime,
    pub duration: u32,
    pub operatory: u32,
    pub provider: String,
    pub color: String,
    pub kind: AppointmentKind,
}

impl Appointment {
    /// Exclusive end of the appointment.
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(i64::from(self.duration))
    }

    /// Whether this entry blocks out time rather than seeing a patient.
    pub fn is_block(&self) -> bool {
        matches!(self.kind, AppointmentKind::Block { .. })
    }

    /// Visit fields, or `None` for a block.
    pub fn visit(&self) -> Option<&Visit> {
        match &self.kind {
            AppointmentKind::Visit(visit) => Some(visit),
            AppointmentKind::Block { .. } => None,
        }
    }

    /// Mutable visit fields, or `None` for a block.
    pub fn visit_mut(&mut self) -> Option<&mut Visit> {
        match &mut self.kind {
            AppointmentKind::Visit(visit) => Some(visit),
            AppointmentKind::Block { .. } => None,
        }
    }

    /// Reason text for blocks.
    pub fn block_reason(&self) -> Option<&str> {
        match &self.kind {
            AppointmentKind::Block { reason } => Some(reason),
            AppointmentKind::Visit(_) => None,
        }
    }

    /// Patient id, or [`BLOCK_PATIENT_ID`] for blocks.
    pub fn patient_id(&self) -> &str {
        match &self.kind {
            AppointmentKind::Visit(visit) => &visit.patient_id,
            AppointmentKind::Block { .. } => BLOCK_PATIENT_ID,
        }
    }

    /// Check if this appointment's time range overlaps with another's.
    ///
    /// Touching endpoints do not overlap.
    pub fn overlaps_with(&self, other: &Appointment) -> bool {
        self.start_time < other.end_time() && self.end_time() > other.start_time
    }

    /// Check if an instant falls within this appointment.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start_time <= at && at < self.end_time()
    }

    /// Short label printed on calendar cells.
    pub fn label(&self) -> String {
        match &self.kind {
            AppointmentKind::Visit(visit) => {
                format!("{} {} [{}]", visit.patient_id, visit.treatment, visit.status.code())
            }
            AppointmentKind::Block { reason } => format!("BLOCK: {}", reason),
        }
    }
}

/// Unsaved visit coming out of the new-appointment form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisitDraft {
    pub patient_id: String,
    pub start_time: NaiveDateTime,
    pub duration: u32,
    pub operatory: u32,
    pub provider: String,
    pub additional_provider: Option<String>,
    pub treatment: String,
    pub procedure_code: Option<String>,
    pub fee: Option<f64>,
    pub status: AppointmentStatus,
    pub appointment_type: String,
    pub notes: String,
    pub is_new_patient: bool,
    pub insurance_eligibility: Option<String>,
    pub lab_case: Option<String>,
}

impl VisitDraft {
    /// Check the form's required fields and the patient reference.
    pub fn validate(&self, patients: &impl PatientLookup) -> SchedulerResult<()> {
        if self.patient_id.trim().is_empty() {
            return Err(SchedulerError::MissingPatient);
        }
        if self.treatment.trim().is_empty() {
            return Err(SchedulerError::MissingTreatment);
        }
        if patients.find_by_id(&self.patient_id).is_none() {
            return Err(SchedulerError::UnknownPatient(self.patient_id.clone()));
        }
        validate_placement(self.duration, self.operatory)
    }

    /// Turn the draft into a stored appointment with the given id.
    pub fn into_appointment(self, id: String) -> Appointment {
        let has_note = !self.notes.trim().is_empty();
        Appointment {
            id,
            start_time: self.start_time,
            duration: self.duration,
            operatory: self.operatory,
            color: provider_color(&self.provider).to_string(),
            provider: self.provider,
            kind: AppointmentKind::Visit(Visit {
                patient_id: self.patient_id,
                additional_provider: self.additional_provider,
                treatment: self.treatment,
                procedure_code: self.procedure_code,
                fee: self.fee,
                status: self.status,
                appointment_type: self.appointment_type,
                notes: self.notes,
                is_new_patient: self.is_new_patient,
                has_note,
                insurance_eligibility: self.insurance_eligibility,
                lab_case: self.lab_case,
            }),
        }
    }
}

/// Unsaved provider block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockDraft {
    pub operatory: u32,
    pub start_time: NaiveDateTime,
    pub provider: String,
    pub duration: u32,
    pub reason: String,
}

impl BlockDraft {
    /// A block needs a reason and a valid placement.
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.reason.trim().is_empty() {
            return Err(SchedulerError::MissingBlockReason);
        }
        validate_placement(self.duration, self.operatory)
    }

    /// Turn the draft into a stored block with the given id.
    pub fn into_appointment(self, id: String) -> Appointment {
        Appointment {
            id,
            start_time: self.start_time,
            duration: self.duration,
            operatory: self.operatory,
            color: provider_color(&self.provider).to_string(),
            provider: self.provider,
            kind: AppointmentKind::Block { reason: self.reason },
        }
    }
}

fn validate_placement(duration: u32, operatory: u32) -> SchedulerResult<()> {
    if duration == 0 {
        return Err(SchedulerError::InvalidDuration(duration));
    }
    if operatory == 0 {
        return Err(SchedulerError::InvalidOperatory(operatory));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn registry() -> PatientRegistry {
        PatientRegistry::new(vec![Patient {
            id: "P001".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 2).unwrap(),
            insurance: Vec::new(),
            alerts: Vec::new(),
            balance: 0.0,
        }])
    }

    fn draft() -> VisitDraft {
        VisitDraft {
            patient_id: "P001".to_string(),
            start_time: at(9, 0),
            duration: 60,
            operatory: 1,
            provider: "Dr. Smith".to_string(),
            treatment: "Prophy".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn status_parses_names_and_codes() {
        assert_eq!(
            AppointmentStatus::from_string("seated").unwrap(),
            AppointmentStatus::Seated
        );
        assert_eq!(
            AppointmentStatus::from_string(" BR ").unwrap(),
            AppointmentStatus::Broken
        );
        assert!(AppointmentStatus::from_string("teleported").is_err());
    }

    #[test]
    fn unknown_provider_gets_fallback_color() {
        assert_eq!(provider_color("Dr. Jones"), "green");
        assert_eq!(provider_color("Dr. Nobody"), FALLBACK_COLOR);
    }

    #[test]
    fn visit_draft_requires_patient_and_treatment() {
        let patients = registry();

        let mut missing_patient = draft();
        missing_patient.patient_id = String::new();
        assert_eq!(
            missing_patient.validate(&patients),
            Err(SchedulerError::MissingPatient)
        );

        let mut missing_treatment = draft();
        missing_treatment.treatment = "  ".to_string();
        assert_eq!(
            missing_treatment.validate(&patients),
            Err(SchedulerError::MissingTreatment)
        );

        let mut unknown = draft();
        unknown.patient_id = "P999".to_string();
        assert_eq!(
            unknown.validate(&patients),
            Err(SchedulerError::UnknownPatient("P999".to_string()))
        );

        assert!(draft().validate(&patients).is_ok());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut d = draft();
        d.duration = 0;
        assert_eq!(d.validate(&registry()), Err(SchedulerError::InvalidDuration(0)));
    }

    #[test]
    fn block_has_sentinel_patient_and_reason() {
        let block = BlockDraft {
            operatory: 2,
            start_time: at(12, 0),
            provider: "Dr. Patel".to_string(),
            duration: 60,
            reason: "Lunch".to_string(),
        }
        .into_appointment("b1".to_string());

        assert!(block.is_block());
        assert_eq!(block.patient_id(), BLOCK_PATIENT_ID);
        assert_eq!(block.block_reason(), Some("Lunch"));
        assert_eq!(block.color, "purple");
        assert!(block.visit().is_none());
    }

    #[test]
    fn overlap_is_half_open() {
        let a = draft().into_appointment("a".to_string());
        let mut b = draft();
        b.start_time = at(10, 0);
        let b = b.into_appointment("b".to_string());

        assert!(!a.overlaps_with(&b));
        assert!(a.contains(at(9, 50)));
        assert!(!a.contains(at(10, 0)));
    }

    #[test]
    fn has_note_follows_notes() {
        let mut d = draft();
        d.notes = "Premedicate".to_string();
        let appt = d.into_appointment("x".to_string());
        assert!(appt.visit().unwrap().has_note);
    }
}
