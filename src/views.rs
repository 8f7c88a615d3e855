//! Day, week and month views of the appointment book.
//!
//! These are pure derivations over a borrowed store. The day and week views
//! both go through the [`OccupancyResolver`] so they agree on which slots an
//! appointment covers.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashSet;
use std::fmt;

use crate::calendar::{CellState, OccupancyResolver};
use crate::models::Appointment;
use crate::slots::{operatories, time_labels, TimeLabel};
use crate::store::AppointmentStore;

/// Month cells show at most this many appointments before "+N more".
pub const MONTH_DISPLAY_CAP: usize = 5;

const CELL_WIDTH: usize = 16;

pub struct DayRow<'a> {
    pub label: TimeLabel,
    pub cells: Vec<CellState<'a>>,
}

/// One column per operatory, one row per 10-minute label.
pub struct DayGrid<'a> {
    pub date: NaiveDate,
    pub operatories: Vec<u32>,
    pub rows: Vec<DayRow<'a>>,
    conflicts: HashSet<String>,
}

impl<'a> DayGrid<'a> {
    pub fn build(store: &'a AppointmentStore, date: NaiveDate, conflicts: &HashSet<String>) -> Self {
        let rooms = operatories(store.active());
        let resolver = OccupancyResolver::for_day(store.active(), date);
        let mut pass = resolver.render_pass();

        let rows = time_labels()
            .into_iter()
            .map(|label| DayRow {
                label,
                cells: rooms.iter().map(|&room| pass.cell(room, label)).collect(),
            })
            .collect();

        DayGrid {
            date,
            operatories: rooms,
            rows,
            conflicts: conflicts.clone(),
        }
    }

    /// Cells a click would create a new appointment in.
    pub fn empty_slots(&self) -> Vec<(u32, TimeLabel)> {
        self.rows
            .iter()
            .flat_map(|row| {
                self.operatories
                    .iter()
                    .zip(&row.cells)
                    .filter(|(_, cell)| matches!(cell, CellState::Empty))
                    .map(move |(&room, _)| (room, row.label))
            })
            .collect()
    }

    /// Whether the appointment is in this day's conflict set.
    pub fn is_conflicting(&self, appointment: &Appointment) -> bool {
        self.conflicts.contains(&appointment.id)
    }
}

impl fmt::Display for DayGrid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.date.format("%A, %Y-%m-%d"))?;
        write!(f, "{:6}", "")?;
        for room in &self.operatories {
            write!(f, "| {:<width$}", format!("Op {}", room), width = CELL_WIDTH - 2)?;
        }
        writeln!(f)?;

        for row in &self.rows {
            let header = if row.label.is_display_mark() {
                row.label.to_string()
            } else {
                String::new()
            };
            write!(f, "{:6}", header)?;
            for cell in &row.cells {
                let text = match cell {
                    CellState::Start { appointment, .. } => {
                        let mark = if self.is_conflicting(appointment) { "!" } else { "" };
                        format!("{}{}", mark, appointment.label())
                    }
                    CellState::Covered { .. } => "  :".to_string(),
                    CellState::Empty => String::new(),
                };
                write!(f, "| {:<width$}", truncate(&text, CELL_WIDTH - 2), width = CELL_WIDTH - 2)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A week cell: appointments starting at this label and the number that
/// only pass through it.
#[derive(Default)]
pub struct WeekCell<'a> {
    pub starts: Vec<&'a Appointment>,
    pub covered: usize,
}

pub struct WeekDay<'a> {
    pub date: NaiveDate,
    pub cells: Vec<(TimeLabel, WeekCell<'a>)>,
}

/// Monday-to-Sunday grid for the week containing a date.
pub struct WeekGrid<'a> {
    pub days: Vec<WeekDay<'a>>,
    conflicts: HashSet<String>,
}

impl<'a> WeekGrid<'a> {
    pub fn build(store: &'a AppointmentStore, date: NaiveDate, conflicts: &HashSet<String>) -> Self {
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let labels = time_labels();

        let days = (0..7)
            .map(|offset| {
                let day = monday + Duration::days(offset);
                let resolver = OccupancyResolver::for_day(store.active(), day);
                let mut pass = resolver.render_pass();
                let cells = labels
                    .iter()
                    .map(|&label| {
                        let mut cell = WeekCell::default();
                        for appointment in resolver.covering(label) {
                            match pass.place(appointment, label) {
                                CellState::Start { appointment, .. } => cell.starts.push(appointment),
                                CellState::Covered { .. } => cell.covered += 1,
                                CellState::Empty => {}
                            }
                        }
                        (label, cell)
                    })
                    .collect();
                WeekDay { date: day, cells }
            })
            .collect();

        WeekGrid {
            days,
            conflicts: conflicts.clone(),
        }
    }
}

impl fmt::Display for WeekGrid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in &self.days {
            writeln!(f, "{}", day.date.format("%a %Y-%m-%d"))?;
            let mut any = false;
            for (label, cell) in &day.cells {
                for appointment in &cell.starts {
                    any = true;
                    let mark = if self.conflicts.contains(&appointment.id) { "!" } else { " " };
                    writeln!(
                        f,
                        "  {}{} Op {:<2} {:>3}m {:<10} {}",
                        mark,
                        label,
                        appointment.operatory,
                        appointment.duration,
                        appointment.provider,
                        appointment.label()
                    )?;
                }
            }
            if !any {
                writeln!(f, "  (no appointments)")?;
            }
        }
        Ok(())
    }
}

pub struct MonthDay<'a> {
    pub date: NaiveDate,
    pub shown: Vec<&'a Appointment>,
    pub overflow: usize,
}

/// Appointments bucketed by calendar day for one month.
pub struct MonthGrid<'a> {
    pub year: i32,
    pub month: u32,
    pub days: Vec<MonthDay<'a>>,
}

impl<'a> MonthGrid<'a> {
    pub fn build(store: &'a AppointmentStore, date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let days = first
            .iter_days()
            .take_while(|d| d.month() == first.month())
            .map(|day| {
                let appointments = store.appointments_on(day);
                let overflow = appointments.len().saturating_sub(MONTH_DISPLAY_CAP);
                MonthDay {
                    date: day,
                    shown: appointments.into_iter().take(MONTH_DISPLAY_CAP).collect(),
                    overflow,
                }
            })
            .collect();

        MonthGrid {
            year: first.year(),
            month: first.month(),
            days,
        }
    }
}

impl fmt::Display for MonthGrid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:04}-{:02}", self.year, self.month)?;
        for day in self.days.iter().filter(|d| !d.shown.is_empty()) {
            writeln!(f, "{}", day.date.format("%a %d"))?;
            for appointment in &day.shown {
                writeln!(
                    f,
                    "    {} {}",
                    appointment.start_time.format("%H:%M"),
                    appointment.label()
                )?;
            }
            if day.overflow > 0 {
                writeln!(f, "    +{} more", day.overflow)?;
            }
        }
        Ok(())
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        text.chars().take(width).collect()
    }
}
