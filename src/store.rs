//! The appointment store: the single write surface of the appointment book.
//!
//! Holds the active schedule plus the pinboard and waitlist side collections.
//! Every appointment lives in exactly one of the three; moving between them
//! is a transfer. Views borrow the store immutably and never mutate it.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calendar::check_availability;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{Appointment, AppointmentStatus, BlockDraft, PatientLookup, VisitDraft};
use crate::notify::{ActivityLog, AuditAction, AuditEntry, Notification, Severity};

/// Where an appointment currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Schedule,
    Pinboard,
    Waitlist,
}

impl Collection {
    /// Lower-case collection name used in logs.
    pub fn name(&self) -> &str {
        match self {
            Collection::Schedule => "schedule",
            Collection::Pinboard => "pinboard",
            Collection::Waitlist => "waitlist",
        }
    }
}

/// What a drag carries: the record and where it was picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub appointment_id: String,
    pub source: Collection,
}

/// The grid cell an appointment was dropped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub start_time: NaiveDateTime,
    pub operatory: u32,
}

/// Field changes from the edit form. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentEdit {
    pub status: Option<AppointmentStatus>,
    pub provider: Option<String>,
    /// `Some(None)` clears the secondary provider.
    pub additional_provider: Option<Option<String>>,
    pub start_time: Option<NaiveDateTime>,
    pub operatory: Option<u32>,
}

impl AppointmentEdit {
    fn touches_visit_fields(&self) -> bool {
        self.status.is_some() || self.additional_provider.is_some()
    }
}

#[derive(Debug, Default)]
pub struct AppointmentStore {
    schedule: Vec<Appointment>,
    pinboard: Vec<Appointment>,
    waitlist: Vec<Appointment>,
    enforce_availability: bool,
    revision: u64,
    activity: ActivityLog,
}

impl AppointmentStore {
    /// Create an empty store.
    ///
    /// With `enforce_availability` set, creating or moving an appointment
    /// onto a slot that overlaps another booking in the same operatory or
    /// for the same provider is refused.
    pub fn new(enforce_availability: bool) -> Self {
        AppointmentStore {
            enforce_availability,
            ..Default::default()
        }
    }

    /// Create a store whose active schedule starts with `appointments`.
    pub fn with_appointments(appointments: Vec<Appointment>, enforce_availability: bool) -> Self {
        AppointmentStore {
            schedule: appointments,
            enforce_availability,
            ..Default::default()
        }
    }

    /// Appointments on the grid.
    pub fn active(&self) -> &[Appointment] {
        &self.schedule
    }

    /// Appointments held off the grid for rebooking.
    pub fn pinboard(&self) -> &[Appointment] {
        &self.pinboard
    }

    /// Patients waiting for an earlier slot.
    pub fn waitlist(&self) -> &[Appointment] {
        &self.waitlist
    }

    /// Number of appointments on the active schedule.
    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }

    /// Incremented on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Get an appointment from the active schedule.
    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.schedule.iter().find(|a| a.id == id)
    }

    /// Find an appointment in any collection, along with where it lives.
    pub fn find(&self, id: &str) -> Option<(Collection, &Appointment)> {
        [Collection::Schedule, Collection::Pinboard, Collection::Waitlist]
            .into_iter()
            .find_map(|c| self.collection(c).iter().find(|a| a.id == id).map(|a| (c, a)))
    }

    /// Active appointments starting on `date`, sorted by start then operatory.
    pub fn appointments_on(&self, date: NaiveDate) -> Vec<&Appointment> {
        let mut appointments: Vec<&Appointment> = self
            .schedule
            .iter()
            .filter(|a| a.start_time.date() == date)
            .collect();
        appointments.sort_by_key(|a| (a.start_time, a.operatory));
        appointments
    }

    /// Audit entries, oldest first.
    pub fn audit(&self) -> &[AuditEntry] {
        self.activity.audit()
    }

    /// Take the pending user-facing notifications.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.activity.drain_notifications()
    }

    /// Save one or more visits from a single booking form submission.
    ///
    /// Either every draft is saved or none is.
    pub fn create_appointments(
        &mut self,
        drafts: Vec<VisitDraft>,
        patients: &impl PatientLookup,
    ) -> SchedulerResult<Vec<String>> {
        if drafts.is_empty() {
            debug!("Empty booking submitted, nothing to save");
            return Ok(Vec::new());
        }
        for draft in &drafts {
            if let Err(e) = draft.validate(patients) {
                return Err(self.reject(e));
            }
        }

        let stamp = Uuid::new_v4().simple().to_string();
        let appointments: Vec<Appointment> = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| draft.into_appointment(format!("{}-{}", &stamp[..12], index)))
            .collect();

        if self.enforce_availability {
            for (i, appointment) in appointments.iter().enumerate() {
                let existing = self.schedule.iter().chain(&appointments[..i]);
                if let Err(e) = check_availability(
                    &appointment.provider,
                    appointment.operatory,
                    appointment.start_time,
                    appointment.duration,
                    existing,
                    None,
                ) {
                    return Err(self.reject(e));
                }
            }
        }

        let ids: Vec<String> = appointments.iter().map(|a| a.id.clone()).collect();
        for appointment in appointments {
            info!(
                id = %appointment.id,
                operatory = appointment.operatory,
                provider = %appointment.provider,
                start = %appointment.start_time,
                "Appointment created"
            );
            self.activity.record(AuditAction::Created, &appointment.id, None);
            self.schedule.push(appointment);
        }

        let message = if ids.len() == 1 {
            "Appointment scheduled".to_string()
        } else {
            format!("{} appointments scheduled", ids.len())
        };
        self.activity.notify(message, Severity::Success);
        self.bump();
        Ok(ids)
    }

    /// Block out a provider's time in an operatory.
    pub fn create_block(&mut self, draft: BlockDraft) -> SchedulerResult<String> {
        if let Err(e) = draft.validate() {
            return Err(self.reject(e));
        }
        if self.enforce_availability {
            if let Err(e) = check_availability(
                &draft.provider,
                draft.operatory,
                draft.start_time,
                draft.duration,
                &self.schedule,
                None,
            ) {
                return Err(self.reject(e));
            }
        }

        let appointment = draft.into_appointment(Uuid::new_v4().to_string());
        let id = appointment.id.clone();
        info!(id = %id, operatory = appointment.operatory, "Block created");
        self.activity.record(AuditAction::Created, &id, None);
        self.activity
            .notify(format!("Time blocked for {}", appointment.provider), Severity::Success);
        self.schedule.push(appointment);
        self.bump();
        Ok(id)
    }

    /// Move an appointment to a new start time and operatory.
    ///
    /// If it was on the pinboard or waitlist it is transferred onto the
    /// active schedule. Returns `Ok(None)` without changing anything when
    /// `id` is not in `source`.
    pub fn move_appointment(
        &mut self,
        id: &str,
        source: Collection,
        start_time: NaiveDateTime,
        operatory: u32,
    ) -> SchedulerResult<Option<&Appointment>> {
        let Some(index) = self.collection(source).iter().position(|a| a.id == id) else {
            debug!(id, source = source.name(), "Move ignored, appointment not found");
            return Ok(None);
        };
        if operatory == 0 {
            return Err(self.reject(SchedulerError::InvalidOperatory(operatory)));
        }
        let duration = self.collection(source)[index].duration;
        self.check_slot(id, start_time, operatory, duration, None)?;

        let mut appointment = self.collection_mut(source).remove(index);
        appointment.start_time = start_time;
        appointment.operatory = operatory;

        info!(id, from = source.name(), operatory, start = %start_time, "Appointment moved");
        self.activity.record(AuditAction::Moved, id, None);
        self.activity.notify(
            format!("Appointment moved to operatory {} at {}", operatory, start_time.format("%H:%M")),
            Severity::Success,
        );
        self.bump();

        let slot = if source == Collection::Schedule {
            self.schedule.insert(index, appointment);
            index
        } else {
            self.schedule.push(appointment);
            self.schedule.len() - 1
        };
        Ok(Some(&self.schedule[slot]))
    }

    /// Pick up an appointment for dragging. Blocks cannot be dragged.
    pub fn begin_drag(&self, id: &str) -> Option<DragPayload> {
        let (source, appointment) = self.find(id)?;
        if appointment.is_block() {
            return None;
        }
        Some(DragPayload {
            appointment_id: appointment.id.clone(),
            source,
        })
    }

    /// Complete a drag by dropping it on a grid cell.
    ///
    /// Drops that reference unknown records or blocks are ignored.
    pub fn drop_on(
        &mut self,
        payload: &DragPayload,
        target: DropTarget,
    ) -> SchedulerResult<Option<&Appointment>> {
        let draggable = self
            .collection(payload.source)
            .iter()
            .any(|a| a.id == payload.appointment_id && !a.is_block());
        if !draggable {
            debug!(id = %payload.appointment_id, "Drop ignored");
            return Ok(None);
        }
        self.move_appointment(
            &payload.appointment_id,
            payload.source,
            target.start_time,
            target.operatory,
        )
    }

    /// Update fields of an active appointment in place.
    ///
    /// Id, color and patient are never changed.
    pub fn edit(&mut self, id: &str, edit: AppointmentEdit) -> SchedulerResult<&Appointment> {
        let Some(index) = self.schedule.iter().position(|a| a.id == id) else {
            return Err(self.reject(SchedulerError::NotFound(id.to_string())));
        };
        if self.schedule[index].is_block() && edit.touches_visit_fields() {
            return Err(self.reject(SchedulerError::NotAVisit(id.to_string())));
        }
        if edit.operatory == Some(0) {
            return Err(self.reject(SchedulerError::InvalidOperatory(0)));
        }

        let current = &self.schedule[index];
        let start_time = edit.start_time.unwrap_or(current.start_time);
        let operatory = edit.operatory.unwrap_or(current.operatory);
        let duration = current.duration;
        let provider = edit.provider.clone().unwrap_or_else(|| current.provider.clone());
        self.check_slot(id, start_time, operatory, duration, Some(&provider))?;

        let appointment = &mut self.schedule[index];
        appointment.start_time = start_time;
        appointment.operatory = operatory;
        appointment.provider = provider;
        if let Some(visit) = appointment.visit_mut() {
            if let Some(status) = edit.status {
                visit.status = status;
            }
            if let Some(additional) = edit.additional_provider {
                visit.additional_provider = additional;
            }
        }

        info!(id, "Appointment updated");
        self.activity.record(AuditAction::Edited, id, None);
        self.activity.notify("Appointment updated", Severity::Success);
        self.bump();
        Ok(&self.schedule[index])
    }

    /// Cancel an appointment. It leaves the schedule and a cancelled
    /// snapshot is kept in the audit log.
    pub fn cancel(&mut self, id: &str) -> SchedulerResult<Appointment> {
        let mut appointment = self.take_active(id)?;
        if let Some(visit) = appointment.visit_mut() {
            visit.status = AppointmentStatus::Cancelled;
        }

        info!(id, "Appointment cancelled");
        self.activity
            .record(AuditAction::Cancelled, id, Some(appointment.clone()));
        self.activity.notify("Appointment cancelled", Severity::Info);
        self.bump();
        Ok(appointment)
    }

    /// Delete an appointment outright.
    pub fn delete(&mut self, id: &str) -> SchedulerResult<Appointment> {
        let appointment = self.take_active(id)?;

        info!(id, "Appointment deleted");
        self.activity.record(AuditAction::Deleted, id, None);
        self.activity.notify("Appointment deleted", Severity::Warning);
        self.bump();
        Ok(appointment)
    }

    /// Take an appointment off the grid and hold it on the pinboard.
    pub fn pin(&mut self, id: &str) -> SchedulerResult<()> {
        let appointment = self.take_active(id)?;

        info!(id, "Appointment pinned");
        self.activity.record(AuditAction::Pinned, id, None);
        self.activity.notify("Appointment moved to pinboard", Severity::Info);
        self.pinboard.push(appointment);
        self.bump();
        Ok(())
    }

    /// Send a patient appointment to the waitlist.
    pub fn send_to_waitlist(&mut self, id: &str) -> SchedulerResult<()> {
        if self.get(id).is_some_and(Appointment::is_block) {
            return Err(self.reject(SchedulerError::NotAVisit(id.to_string())));
        }
        let appointment = self.take_active(id)?;

        info!(id, "Appointment waitlisted");
        self.activity.record(AuditAction::Waitlisted, id, None);
        self.activity.notify("Appointment added to waitlist", Severity::Info);
        self.waitlist.push(appointment);
        self.bump();
        Ok(())
    }

    fn take_active(&mut self, id: &str) -> SchedulerResult<Appointment> {
        match self.schedule.iter().position(|a| a.id == id) {
            Some(index) => Ok(self.schedule.remove(index)),
            None => Err(self.reject(SchedulerError::NotFound(id.to_string()))),
        }
    }

    fn check_slot(
        &mut self,
        id: &str,
        start_time: NaiveDateTime,
        operatory: u32,
        duration: u32,
        provider: Option<&str>,
    ) -> SchedulerResult<()> {
        if !self.enforce_availability {
            return Ok(());
        }
        let provider = match provider {
            Some(p) => p.to_string(),
            None => match self.find(id) {
                Some((_, a)) => a.provider.clone(),
                None => return Ok(()),
            },
        };
        let result = check_availability(
            &provider,
            operatory,
            start_time,
            duration,
            &self.schedule,
            Some(id),
        );
        result.map_err(|e| self.reject(e))
    }

    fn reject(&mut self, error: SchedulerError) -> SchedulerError {
        warn!(error = %error, "Schedule change refused");
        self.activity.notify(error.to_string(), Severity::Error);
        error
    }

    fn collection(&self, collection: Collection) -> &Vec<Appointment> {
        match collection {
            Collection::Schedule => &self.schedule,
            Collection::Pinboard => &self.pinboard,
            Collection::Waitlist => &self.waitlist,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Appointment> {
        match collection {
            Collection::Schedule => &mut self.schedule,
            Collection::Pinboard => &mut self.pinboard,
            Collection::Waitlist => &mut self.waitlist,
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
