//! Occupancy and conflict computations for the appointment book.
//!
//! Everything here is derived from the store on demand. The grid asks the
//! [`OccupancyResolver`] which appointment covers a cell, and the conflict
//! detector flags overlapping bookings that share a room or a provider.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::Appointment;
use crate::slots::{row_span, TimeLabel};
use crate::store::AppointmentStore;

/// Answers "what is in this room at this time" for a single day.
pub struct OccupancyResolver<'a> {
    date: NaiveDate,
    by_operatory: HashMap<u32, Vec<&'a Appointment>>,
}

impl<'a> OccupancyResolver<'a> {
    /// Index the appointments that start on `date`.
    pub fn for_day<I>(appointments: I, date: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        let mut by_operatory: HashMap<u32, Vec<&'a Appointment>> = HashMap::new();
        for appointment in appointments
            .into_iter()
            .filter(|a| a.start_time.date() == date)
        {
            by_operatory
                .entry(appointment.operatory)
                .or_default()
                .push(appointment);
        }
        for list in by_operatory.values_mut() {
            list.sort_by_key(|a| a.start_time);
        }

        OccupancyResolver { date, by_operatory }
    }

    /// The appointment covering `label` in `operatory`, if any.
    pub fn resolve(&self, operatory: u32, label: TimeLabel) -> Option<&'a Appointment> {
        let at = label.on(self.date);
        self.by_operatory
            .get(&operatory)?
            .iter()
            .copied()
            .find(|a| a.contains(at))
    }

    /// Like [`resolve`](Self::resolve) but takes a raw `HH:MM` label.
    pub fn resolve_label(&self, operatory: u32, label: &str) -> SchedulerResult<Option<&'a Appointment>> {
        let label: TimeLabel = label.parse()?;
        Ok(self.resolve(operatory, label))
    }

    /// Whether `label` is the exact start slot of `appointment` on this day.
    pub fn is_start(&self, appointment: &Appointment, label: TimeLabel) -> bool {
        appointment.start_time == label.on(self.date)
    }

    /// Every appointment covering `label` in any operatory, ordered by room
    /// then start. Overlapping bookings in one room are all returned.
    pub fn covering(&self, label: TimeLabel) -> Vec<&'a Appointment> {
        let at = label.on(self.date);
        let mut rooms: Vec<&u32> = self.by_operatory.keys().collect();
        rooms.sort();
        rooms
            .into_iter()
            .flat_map(|room| self.by_operatory[room].iter().copied())
            .filter(|a| a.contains(at))
            .collect()
    }

    /// Start a fresh render pass over this day.
    pub fn render_pass(&self) -> RenderPass<'_, 'a> {
        RenderPass {
            resolver: self,
            emitted: HashSet::new(),
        }
    }
}

/// What the grid should draw in one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellState<'a> {
    /// First slot of an appointment: draw a block spanning `rows` rows.
    Start { appointment: &'a Appointment, rows: u32 },
    /// Covered by an appointment already drawn above.
    Covered { appointment: &'a Appointment },
    /// Free; clicking creates an appointment at this time.
    Empty,
}

/// Tracks which appointments have been drawn during one walk of the grid.
pub struct RenderPass<'r, 'a> {
    resolver: &'r OccupancyResolver<'a>,
    emitted: HashSet<&'a str>,
}

impl<'r, 'a> RenderPass<'r, 'a> {
    /// Classify the cell for `operatory` at `label`.
    ///
    /// Only the first appointment covering the cell is drawn; a booking nested
    /// inside another in the same room shows up through the conflict set.
    pub fn cell(&mut self, operatory: u32, label: TimeLabel) -> CellState<'a> {
        match self.resolver.resolve(operatory, label) {
            Some(appointment) => self.place(appointment, label),
            None => CellState::Empty,
        }
    }

    /// Classify a specific appointment known to cover `label`: the first
    /// call for it is its start, later calls are covered.
    pub fn place(&mut self, appointment: &'a Appointment, label: TimeLabel) -> CellState<'a> {
        if self.emitted.contains(appointment.id.as_str()) {
            return CellState::Covered { appointment };
        }

        self.emitted.insert(appointment.id.as_str());
        if self.resolver.is_start(appointment, label) {
            CellState::Start {
                appointment,
                rows: row_span(appointment.duration),
            }
        } else {
            // Started off-grid (before opening or between labels); draw the
            // remainder from here.
            let remaining = (appointment.end_time() - label.on(self.resolver.date)).num_minutes();
            CellState::Start {
                appointment,
                rows: row_span(remaining.max(1) as u32),
            }
        }
    }

    /// Number of appointments drawn so far.
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }
}

/// Ids of appointments that overlap another appointment in the same
/// operatory or with the same provider.
pub fn detect_conflicts<'a, I>(appointments: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let appointments: Vec<&Appointment> = appointments.into_iter().collect();
    let mut conflicts = HashSet::new();

    for (i, a) in appointments.iter().enumerate() {
        for b in &appointments[i + 1..] {
            let shares_resource = a.operatory == b.operatory || a.provider == b.provider;
            if shares_resource && a.overlaps_with(b) {
                conflicts.insert(a.id.clone());
                conflicts.insert(b.id.clone());
            }
        }
    }

    debug!(
        scanned = appointments.len(),
        conflicts = conflicts.len(),
        "Conflict scan complete"
    );
    conflicts
}

/// Conflicts among the active appointments on `date`.
pub fn day_conflicts(store: &AppointmentStore, date: NaiveDate) -> HashSet<String> {
    detect_conflicts(store.appointments_on(date))
}

/// Check that a booking would not overlap anything sharing its room or provider.
///
/// `exclude_id` skips the appointment being moved.
pub fn check_availability<'a, I>(
    provider: &str,
    operatory: u32,
    start: NaiveDateTime,
    duration: u32,
    existing: I,
    exclude_id: Option<&str>,
) -> SchedulerResult<()>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let end = start + chrono::Duration::minutes(i64::from(duration));

    for other in existing {
        if Some(other.id.as_str()) == exclude_id {
            continue;
        }
        let shares_resource = other.operatory == operatory || other.provider == provider;
        if shares_resource && start < other.end_time() && end > other.start_time {
            return Err(SchedulerError::SlotUnavailable {
                conflicting_id: other.id.clone(),
            });
        }
    }

    Ok(())
}

/// Remembers the last conflict scan per day until the store changes.
#[derive(Debug, Default)]
pub struct ConflictCache {
    entries: HashMap<NaiveDate, (u64, HashSet<String>)>,
    scans: usize,
}

impl ConflictCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conflicts on `date`, rescanning only if the store has changed.
    pub fn get(&mut self, store: &AppointmentStore, date: NaiveDate) -> &HashSet<String> {
        let revision = store.revision();
        let stale = self
            .entries
            .get(&date)
            .map_or(true, |(cached_at, _)| *cached_at != revision);

        if stale {
            self.scans += 1;
            self.entries
                .insert(date, (revision, day_conflicts(store, date)));
        } else {
            debug!(%date, revision, "Conflict cache hit");
        }

        &self.entries[&date].1
    }

    /// Number of scans actually performed.
    pub fn scans(&self) -> usize {
        self.scans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentKind, AppointmentStatus, Visit};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn label(s: &str) -> TimeLabel {
        s.parse().unwrap()
    }

    fn appt(id: &str, operatory: u32, provider: &str, start: NaiveDateTime, duration: u32) -> Appointment {
        Appointment {
            id: id.to_string(),
            start_time: start,
            duration,
            operatory,
            provider: provider.to_string(),
            color: "blue".to_string(),
            kind: AppointmentKind::Visit(Visit {
                patient_id: "P001".to_string(),
                additional_provider: None,
                treatment: "Exam".to_string(),
                procedure_code: None,
                fee: None,
                status: AppointmentStatus::Confirmed,
                appointment_type: "General".to_string(),
                notes: String::new(),
                is_new_patient: false,
                has_note: false,
                insurance_eligibility: None,
                lab_case: None,
            }),
        }
    }

    fn ids(set: &HashSet<String>) -> Vec<&str> {
        let mut ids: Vec<&str> = set.iter().map(String::as_str).collect();
        ids.sort();
        ids
    }

    #[test]
    fn resolver_covers_half_open_range() {
        let x = appt("X", 3, "Dr. Smith", at(9, 0), 60);
        let appts = vec![x];
        let resolver = OccupancyResolver::for_day(&appts, day());

        assert_eq!(resolver.resolve(3, label("09:20")).map(|a| a.id.as_str()), Some("X"));
        assert_eq!(resolver.resolve(3, label("09:50")).map(|a| a.id.as_str()), Some("X"));
        assert!(resolver.resolve(3, label("10:00")).is_none());
        assert!(resolver.resolve(3, label("08:50")).is_none());
        assert!(resolver.resolve(4, label("09:20")).is_none());
    }

    #[test]
    fn resolver_ignores_other_days() {
        let mut x = appt("X", 1, "Dr. Smith", at(9, 0), 60);
        x.start_time = x.start_time + chrono::Duration::days(1);
        let appts = vec![x];
        let resolver = OccupancyResolver::for_day(&appts, day());
        assert!(resolver.resolve(1, label("09:00")).is_none());
    }

    #[test]
    fn resolve_label_rejects_garbage() {
        let appts: Vec<Appointment> = Vec::new();
        let resolver = OccupancyResolver::for_day(&appts, day());
        assert_eq!(
            resolver.resolve_label(1, "nine").unwrap_err(),
            SchedulerError::InvalidTimeLabel("nine".to_string())
        );
    }

    #[test]
    fn render_pass_emits_each_appointment_once() {
        let appts = vec![
            appt("X", 1, "Dr. Smith", at(9, 0), 45),
            appt("Y", 1, "Dr. Smith", at(10, 0), 20),
        ];
        let resolver = OccupancyResolver::for_day(&appts, day());
        let mut pass = resolver.render_pass();

        let mut starts = Vec::new();
        let mut covered = 0;
        for l in crate::slots::time_labels() {
            match pass.cell(1, l) {
                CellState::Start { appointment, rows } => starts.push((appointment.id.clone(), l.to_string(), rows)),
                CellState::Covered { .. } => covered += 1,
                CellState::Empty => {}
            }
        }

        assert_eq!(
            starts,
            vec![
                ("X".to_string(), "09:00".to_string(), 5),
                ("Y".to_string(), "10:00".to_string(), 2),
            ]
        );
        // 45 minutes covers 09:00..09:40 (5 labels), 20 minutes covers 2.
        assert_eq!(covered, 4 + 1);
        assert_eq!(pass.emitted_count(), 2);
    }

    #[test]
    fn covering_lists_nested_bookings_in_one_room() {
        let appts = vec![
            appt("X", 1, "Dr. Smith", at(9, 0), 120),
            appt("Y", 1, "Dr. Jones", at(9, 30), 30),
            appt("Z", 2, "Mike RDH", at(9, 0), 60),
        ];
        let resolver = OccupancyResolver::for_day(&appts, day());

        let ids: Vec<&str> = resolver.covering(label("09:40")).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["X", "Y", "Z"]);
        let ids: Vec<&str> = resolver.covering(label("10:00")).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["X"]);
    }

    #[test]
    fn exactly_one_start_slot() {
        let appts = vec![appt("X", 2, "Dr. Smith", at(13, 0), 90)];
        let resolver = OccupancyResolver::for_day(&appts, day());
        let starts = crate::slots::time_labels()
            .into_iter()
            .filter(|l| {
                resolver
                    .resolve(2, *l)
                    .is_some_and(|a| resolver.is_start(a, *l))
            })
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn shared_operatory_overlap_conflicts() {
        let appts = vec![
            appt("X", 1, "Dr. Smith", at(9, 0), 60),
            appt("Y", 1, "Dr. Jones", at(9, 30), 60),
        ];
        assert_eq!(ids(&detect_conflicts(&appts)), vec!["X", "Y"]);
    }

    #[test]
    fn shared_provider_overlap_conflicts() {
        let appts = vec![
            appt("X", 1, "Dr. Smith", at(9, 0), 60),
            appt("Y", 4, "Dr. Smith", at(9, 50), 30),
        ];
        assert_eq!(ids(&detect_conflicts(&appts)), vec!["X", "Y"]);
    }

    #[test]
    fn no_shared_resource_no_conflict() {
        let appts = vec![
            appt("X", 1, "Dr. Smith", at(9, 0), 60),
            appt("Z", 2, "Dr. Jones", at(9, 0), 60),
        ];
        assert!(detect_conflicts(&appts).is_empty());
    }

    #[test]
    fn touching_endpoints_do_not_conflict() {
        let appts = vec![
            appt("X", 1, "Dr. Smith", at(9, 0), 60),
            appt("Y", 1, "Dr. Smith", at(10, 0), 60),
        ];
        assert!(detect_conflicts(&appts).is_empty());
    }

    #[test]
    fn blocks_take_part_in_conflicts() {
        let mut block = appt("B", 1, "Dr. Patel", at(12, 0), 60);
        block.kind = AppointmentKind::Block { reason: "Lunch".to_string() };
        let appts = vec![block, appt("X", 1, "Dr. Smith", at(12, 30), 30)];
        assert_eq!(ids(&detect_conflicts(&appts)), vec!["B", "X"]);
    }

    #[test]
    fn conflict_from_one_pair_only_flags_that_pair() {
        let appts = vec![
            appt("X", 1, "Dr. Smith", at(9, 0), 60),
            appt("Y", 1, "Dr. Jones", at(9, 30), 60),
            appt("Z", 2, "Mike RDH", at(9, 0), 60),
        ];
        assert_eq!(ids(&detect_conflicts(&appts)), vec!["X", "Y"]);
    }

    #[test]
    fn availability_check_respects_exclusion() {
        let appts = vec![appt("X", 1, "Dr. Smith", at(9, 0), 60)];

        assert_eq!(
            check_availability("Dr. Jones", 1, at(9, 30), 30, &appts, None),
            Err(SchedulerError::SlotUnavailable { conflicting_id: "X".to_string() })
        );
        assert!(check_availability("Dr. Smith", 1, at(9, 30), 30, &appts, Some("X")).is_ok());
        assert!(check_availability("Dr. Jones", 2, at(9, 30), 30, &appts, None).is_ok());
        assert!(check_availability("Dr. Smith", 1, at(10, 0), 30, &appts, None).is_ok());
    }
}
