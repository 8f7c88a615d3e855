//! Deterministic mock data for the simulator.
//!
//! Patients get synthetic names, birth dates, insurance and alerts.
//! Appointments are dealt round-robin across the provider roster and the
//! physical operatories, starting at the opening time; each room's next
//! slot begins 15 minutes after its previous appointment ends.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::warn;

use crate::models::{
    Appointment, AppointmentStatus, InsuranceSummary, Patient, VisitDraft, PROVIDERS,
};
use crate::slots::{DAY_END_HOUR, DAY_START_HOUR, PHYSICAL_OPERATORIES};

pub const BUFFER_MINUTES: i64 = 15;

const FIRST_NAMES: [&str; 12] = [
    "Olivia", "Liam", "Emma", "Noah", "Ava", "Elijah", "Sophia", "James", "Mia", "Lucas",
    "Amelia", "Mateo",
];

const LAST_NAMES: [&str; 10] = [
    "Garcia", "Nguyen", "Okafor", "Schmidt", "Rossi", "Kim", "Haddad", "Silva", "Cohen", "Walsh",
];

const CARRIERS: [(&str, &str); 4] = [
    ("Delta Dental", "PPO Plus"),
    ("MetLife", "PDP"),
    ("Cigna", "DHMO"),
    ("Aetna", "Dental Preferred"),
];

const ELIGIBILITY: [&str; 3] = ["Verified", "Pending", "Ineligible"];

const ALERTS: [&str; 4] = ["Latex allergy", "Premedicate", "Anxious patient", "Hypertension"];

/// Treatment name, procedure code, fee, duration in minutes, appointment type.
const TREATMENTS: [(&str, &str, f64, u32, &str); 8] = [
    ("Periodic Exam", "D0120", 65.0, 30, "Recall"),
    ("Adult Prophylaxis", "D1110", 120.0, 60, "Hygiene"),
    ("Comprehensive Exam", "D0150", 110.0, 40, "New Patient"),
    ("Composite Filling", "D2392", 210.0, 50, "Restorative"),
    ("Crown Prep", "D2740", 1250.0, 90, "Restorative"),
    ("Root Canal - Molar", "D3330", 1100.0, 90, "Endo"),
    ("Simple Extraction", "D7140", 180.0, 30, "Surgery"),
    ("Scaling & Root Planing", "D4341", 260.0, 60, "Perio"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SeedConfig {
    pub date: NaiveDate,
    pub patients: usize,
    pub appointments: usize,
    pub opening_time: NaiveTime,
}

impl SeedConfig {
    pub fn new(date: NaiveDate) -> Self {
        SeedConfig {
            date,
            patients: 40,
            appointments: 48,
            opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedData {
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
}

/// Whether `time` falls on the grid, 07:00 up to but not including 18:00.
pub fn within_working_day(time: NaiveTime) -> bool {
    (DAY_START_HOUR..DAY_END_HOUR).contains(&time.hour())
}

/// Generate the startup data set. Same config, same output.
pub fn generate(config: &SeedConfig) -> SeedData {
    let patients = generate_patients(config);
    let appointments = if patients.is_empty() {
        Vec::new()
    } else if !within_working_day(config.opening_time) {
        warn!(opening = %config.opening_time, "Opening time is off the grid, no appointments seeded");
        Vec::new()
    } else {
        generate_appointments(config, &patients)
    };
    SeedData {
        patients,
        appointments,
    }
}

fn generate_patients(config: &SeedConfig) -> Vec<Patient> {
    (0..config.patients)
        .map(|i| {
            let birth_year = 1945 + (i * 7 % 70) as i32;
            let month = (i % 12) as u32 + 1;
            let day = (i * 3 % 28) as u32 + 1;
            let (carrier, plan) = CARRIERS[i % CARRIERS.len()];
            let insurance = if i % 5 == 4 {
                Vec::new()
            } else {
                vec![InsuranceSummary {
                    carrier: carrier.to_string(),
                    plan: plan.to_string(),
                    eligibility: ELIGIBILITY[i % ELIGIBILITY.len()].to_string(),
                }]
            };
            let alerts = if i % 4 == 0 {
                vec![ALERTS[(i / 4) % ALERTS.len()].to_string()]
            } else {
                Vec::new()
            };

            Patient {
                id: format!("P{:03}", i + 1),
                first_name: FIRST_NAMES[i % FIRST_NAMES.len()].to_string(),
                last_name: LAST_NAMES[(i / FIRST_NAMES.len() + i) % LAST_NAMES.len()].to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(birth_year, month, day)
                    .unwrap_or(NaiveDate::MIN),
                insurance,
                alerts,
                balance: ((i * 37) % 400) as f64 + if i % 3 == 0 { 0.5 } else { 0.0 },
            }
        })
        .collect()
}

fn generate_appointments(config: &SeedConfig, patients: &[Patient]) -> Vec<Appointment> {
    let rooms = PHYSICAL_OPERATORIES as usize;
    let opening = config.date.and_time(config.opening_time);
    let mut next_start: Vec<NaiveDateTime> = vec![opening; rooms];
    let mut appointments = Vec::with_capacity(config.appointments);

    for i in 0..config.appointments {
        let room = i % rooms;
        let provider = PROVIDERS[i % PROVIDERS.len()];
        let patient = &patients[i % patients.len()];
        let (treatment, code, fee, duration, kind) = TREATMENTS[i % TREATMENTS.len()];

        let mut start = next_start[room];
        if start + Duration::minutes(i64::from(duration)) > closing(start) {
            let next_day = start.date() + Duration::days(1);
            start = next_day.and_time(config.opening_time);
        }
        // A late opening can leave less room than the treatment needs.
        let left = (closing(start) - start).num_minutes().max(1) as u32;
        let duration = duration.min(left);

        let draft = VisitDraft {
            patient_id: patient.id.clone(),
            start_time: start,
            duration,
            operatory: room as u32 + 1,
            provider: provider.name.to_string(),
            additional_provider: None,
            treatment: treatment.to_string(),
            procedure_code: Some(code.to_string()),
            fee: Some(fee),
            status: AppointmentStatus::ALL[i % 5],
            appointment_type: kind.to_string(),
            notes: if patient.alerts.is_empty() {
                String::new()
            } else {
                patient.alerts.join("; ")
            },
            is_new_patient: kind == "New Patient",
            insurance_eligibility: patient.insurance.first().map(|ins| ins.eligibility.clone()),
            lab_case: (code == "D2740").then(|| format!("LAB-{:04}", i + 1)),
        };
        let appointment = draft.into_appointment(format!("seed-{:04}", i + 1));

        next_start[room] = appointment.end_time() + Duration::minutes(BUFFER_MINUTES);
        appointments.push(appointment);
    }

    appointments
}

fn closing(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_hms_opt(DAY_END_HOUR, 0, 0).unwrap_or(at)
}
