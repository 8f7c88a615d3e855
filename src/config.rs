//! Simulator configuration.
//!
//! Resolved once at startup and passed into the store and seed generator.
//! Values come from the process environment (the binary loads `.env` first).

use chrono::{Local, NaiveDate, NaiveTime};

use crate::error::{SchedulerError, SchedulerResult};
use crate::seed::{within_working_day, SeedConfig};

pub const ENV_SEED_DATE: &str = "DENTBOOK_SEED_DATE";
pub const ENV_SEED_PATIENTS: &str = "DENTBOOK_SEED_PATIENTS";
pub const ENV_SEED_APPOINTMENTS: &str = "DENTBOOK_SEED_APPOINTMENTS";
pub const ENV_OPENING_TIME: &str = "DENTBOOK_OPENING_TIME";
pub const ENV_ENFORCE_AVAILABILITY: &str = "DENTBOOK_ENFORCE_AVAILABILITY";

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub seed: SeedConfig,
    pub enforce_availability: bool,
}

impl SimulatorConfig {
    /// Defaults: seed for today, availability not enforced.
    pub fn new(today: NaiveDate) -> Self {
        SimulatorConfig {
            seed: SeedConfig::new(today),
            enforce_availability: false,
        }
    }

    /// Read the configuration from environment variables.
    pub fn from_env() -> SchedulerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> SchedulerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SimulatorConfig::new(Local::now().date_naive());

        if let Some(raw) = lookup(ENV_SEED_DATE) {
            config.seed.date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| invalid(ENV_SEED_DATE, &raw, "expected YYYY-MM-DD"))?;
        }
        if let Some(raw) = lookup(ENV_SEED_PATIENTS) {
            config.seed.patients = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_SEED_PATIENTS, &raw, "expected a count"))?;
        }
        if let Some(raw) = lookup(ENV_SEED_APPOINTMENTS) {
            config.seed.appointments = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_SEED_APPOINTMENTS, &raw, "expected a count"))?;
        }
        if let Some(raw) = lookup(ENV_OPENING_TIME) {
            let opening = NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                .map_err(|_| invalid(ENV_OPENING_TIME, &raw, "expected HH:MM"))?;
            if !within_working_day(opening) {
                return Err(invalid(ENV_OPENING_TIME, &raw, "must be between 07:00 and 17:59"));
            }
            config.seed.opening_time = opening;
        }
        if let Some(raw) = lookup(ENV_ENFORCE_AVAILABILITY) {
            config.enforce_availability = parse_bool(&raw)
                .ok_or_else(|| invalid(ENV_ENFORCE_AVAILABILITY, &raw, "expected true or false"))?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, raw: &str, hint: &str) -> SchedulerError {
    SchedulerError::Config(format!("{}='{}': {}", key, raw, hint))
}
