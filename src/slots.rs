//! Grid rows and columns for the appointment book.
//!
//! Rows are 10-minute time labels between opening and closing. Columns are
//! operatories: the physical rooms 1..8 plus any higher room the data uses.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::SchedulerError;
use crate::models::Appointment;

pub const SLOT_MINUTES: u32 = 10;
pub const DAY_START_HOUR: u32 = 7;
pub const DAY_END_HOUR: u32 = 18;
pub const PHYSICAL_OPERATORIES: u32 = 8;

/// A row of the appointment grid, printed as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeLabel(NaiveTime);

impl TimeLabel {
    /// `None` if the hour or minute is out of range.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeLabel)
    }

    /// The instant this label denotes on `date`.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.0)
    }

    /// Whether the label falls on a half-hour mark.
    pub fn is_display_mark(&self) -> bool {
        self.0.minute() % 30 == 0
    }
}

impl fmt::Display for TimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for TimeLabel {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(TimeLabel)
            .map_err(|_| SchedulerError::InvalidTimeLabel(s.to_string()))
    }
}

/// Every 10-minute label from 07:00 up to, not including, 18:00.
pub fn time_labels() -> Vec<TimeLabel> {
    let mut labels = Vec::new();
    let mut minutes = DAY_START_HOUR * 60;
    while minutes < DAY_END_HOUR * 60 {
        if let Some(label) = TimeLabel::new(minutes / 60, minutes % 60) {
            labels.push(label);
        }
        minutes += SLOT_MINUTES;
    }
    labels
}

/// The `:00` and `:30` labels used as row headers.
pub fn display_labels() -> Vec<TimeLabel> {
    time_labels()
        .into_iter()
        .filter(TimeLabel::is_display_mark)
        .collect()
}

/// Rooms 1..8 plus every operatory referenced by `appointments`, ascending.
pub fn operatories<'a, I>(appointments: I) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut rooms: BTreeSet<u32> = (1..=PHYSICAL_OPERATORIES).collect();
    rooms.extend(appointments.into_iter().map(|a| a.operatory));
    rooms.into_iter().collect()
}

/// Number of grid rows an appointment spans.
pub fn row_span(duration: u32) -> u32 {
    duration.div_ceil(SLOT_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, AppointmentKind};

    fn in_room(operatory: u32) -> Appointment {
        Appointment {
            id: format!("op{}", operatory),
            start_time: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            duration: 30,
            operatory,
            provider: "Dr. Smith".to_string(),
            color: "blue".to_string(),
            kind: AppointmentKind::Block { reason: "Meeting".to_string() },
        }
    }

    #[test]
    fn labels_cover_the_working_day() {
        let labels = time_labels();
        assert_eq!(labels.len(), 66);
        assert_eq!(labels[0].to_string(), "07:00");
        assert_eq!(labels[1].to_string(), "07:10");
        assert_eq!(labels[65].to_string(), "17:50");
    }

    #[test]
    fn display_labels_are_half_hours() {
        let labels = display_labels();
        assert_eq!(labels.len(), 22);
        assert!(labels.iter().all(|l| l.to_string().ends_with(":00")
            || l.to_string().ends_with(":30")));
    }

    #[test]
    fn label_parsing() {
        let label: TimeLabel = "09:20".parse().unwrap();
        assert_eq!(label, TimeLabel::new(9, 20).unwrap());
        assert!("9h20".parse::<TimeLabel>().is_err());
        assert!("25:00".parse::<TimeLabel>().is_err());
    }

    #[test]
    fn operatories_always_include_physical_rooms() {
        assert_eq!(operatories(std::iter::empty()), (1..=8).collect::<Vec<_>>());

        let appts = vec![in_room(3), in_room(11), in_room(11)];
        assert_eq!(operatories(&appts), vec![1, 2, 3, 4, 5, 6, 7, 8, 11]);
    }

    #[test]
    fn row_span_rounds_up() {
        assert_eq!(row_span(60), 6);
        assert_eq!(row_span(45), 5);
        assert_eq!(row_span(5), 1);
    }
}
