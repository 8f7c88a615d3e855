//! Interactive appointment book for the practice-management simulator.
//!
//! Stands in for the browser front end: renders the day/week/month grids as
//! text and routes every menu action through the store's mutation surface.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dentbook::models::PROVIDERS;
use dentbook::seed;
use dentbook::slots::TimeLabel;
use dentbook::views::{DayGrid, MonthGrid, WeekGrid};
use dentbook::{
    AppointmentEdit, AppointmentStatus, AppointmentStore, BlockDraft, Collection, ConflictCache,
    DropTarget, PatientLookup, PatientRegistry, SimulatorConfig, VisitDraft,
};

struct AppointmentCLI {
    store: AppointmentStore,
    patients: PatientRegistry,
    conflicts: ConflictCache,
    date: NaiveDate,
    running: bool,
}

impl AppointmentCLI {
    fn new(config: SimulatorConfig) -> Self {
        let data = seed::generate(&config.seed);
        tracing::info!(
            patients = data.patients.len(),
            appointments = data.appointments.len(),
            date = %config.seed.date,
            "Seed data loaded"
        );

        AppointmentCLI {
            store: AppointmentStore::with_appointments(data.appointments, config.enforce_availability),
            patients: PatientRegistry::new(data.patients),
            conflicts: ConflictCache::new(),
            date: config.seed.date,
            running: true,
        }
    }

    fn print_header(&self) {
        println!("\n{}", "=".repeat(60));
        println!("       DENTAL APPOINTMENT BOOK");
        println!("{}", "=".repeat(60));
    }

    fn print_menu(&self) {
        println!("\n--- {} ---", self.date.format("%A, %Y-%m-%d"));
        println!(" 1. Day view          2. Week view         3. Month view");
        println!(" 4. Go to date        5. New appointment   6. New block");
        println!(" 7. Move appointment  8. Edit appointment  9. Cancel appointment");
        println!("10. Delete           11. Pin              12. Send to waitlist");
        println!("13. Pinboard/waitlist 14. Conflicts       15. Exit");
        println!("{}", "-".repeat(20));
    }

    fn get_input(&mut self, prompt: &str, default: Option<&str>) -> String {
        if let Some(def) = default {
            print!("{} [{}]: ", prompt, def);
        } else {
            print!("{}: ", prompt);
        }
        let _ = io::stdout().flush();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => {
                self.running = false;
                return default.unwrap_or("").to_string();
            }
            Ok(_) => {}
        }
        let input = input.trim();

        if input.is_empty() {
            default.unwrap_or("").to_string()
        } else {
            input.to_string()
        }
    }

    fn get_int_input(&mut self, prompt: &str, default: Option<u32>) -> u32 {
        loop {
            let default_str = default.map(|d| d.to_string());
            let input = self.get_input(prompt, default_str.as_deref());

            if let Ok(value) = input.parse::<u32>() {
                return value;
            }
            if !self.running {
                return default.unwrap_or(0);
            }
            println!("Please enter a valid number");
        }
    }

    fn get_time_input(&mut self, prompt: &str, default: &str) -> Option<NaiveDateTime> {
        let raw = self.get_input(prompt, Some(default));
        match raw.parse::<TimeLabel>() {
            Ok(label) => Some(label.on(self.date)),
            Err(e) => {
                println!("{}", e);
                None
            }
        }
    }

    fn flush_notifications(&mut self) {
        for note in self.store.drain_notifications() {
            println!("[{}] {}", note.severity.name(), note.message);
        }
    }

    fn view_day(&mut self) {
        let conflicts = self.conflicts.get(&self.store, self.date).clone();
        println!("\n{}", DayGrid::build(&self.store, self.date, &conflicts));
    }

    fn view_week(&mut self) {
        let monday = self.date - Duration::days(i64::from(self.date.weekday().num_days_from_monday()));
        let mut conflicts = HashSet::new();
        for offset in 0..7 {
            let day = monday + Duration::days(offset);
            conflicts.extend(self.conflicts.get(&self.store, day).iter().cloned());
        }
        println!("\n{}", WeekGrid::build(&self.store, self.date, &conflicts));
    }

    fn view_month(&self) {
        println!("\n{}", MonthGrid::build(&self.store, self.date));
    }

    fn go_to_date(&mut self) {
        let default = self.date.format("%Y-%m-%d").to_string();
        let raw = self.get_input("Date (YYYY-MM-DD)", Some(&default));
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => self.date = date,
            Err(_) => println!("Invalid date"),
        }
    }

    fn choose_provider(&mut self) -> String {
        println!("\nProviders:");
        for (i, provider) in PROVIDERS.iter().enumerate() {
            println!("  {}. {} ({})", i + 1, provider.name, provider.role);
        }
        let choice = self.get_int_input("Select provider", Some(1)) as usize;
        PROVIDERS
            .get(choice.saturating_sub(1))
            .unwrap_or(&PROVIDERS[0])
            .name
            .to_string()
    }

    fn new_appointment(&mut self) {
        println!("\n--- New Appointment ---");

        let patient_id = self.get_input("Patient id (e.g. P001)", None);
        if let Some(patient) = self.patients.find_by_id(&patient_id) {
            println!("Patient: {}", patient.display_name());
            for alert in &patient.alerts {
                println!("  ALERT: {}", alert);
            }
        }

        let Some(start_time) = self.get_time_input("Start time (HH:MM)", "09:00") else {
            return;
        };
        let operatory = self.get_int_input("Operatory", Some(1));
        let duration = self.get_int_input("Duration (minutes)", Some(30));
        let provider = self.choose_provider();
        let treatment = self.get_input("Treatment", None);
        let code = self.get_input("Procedure code (optional)", Some(""));
        let notes = self.get_input("Notes (optional)", Some(""));

        let draft = VisitDraft {
            patient_id,
            start_time,
            duration,
            operatory,
            provider,
            treatment,
            procedure_code: (!code.is_empty()).then_some(code),
            appointment_type: "General".to_string(),
            notes,
            ..Default::default()
        };

        if let Ok(ids) = self.store.create_appointments(vec![draft], &self.patients) {
            println!("Created appointment {}", ids[0]);
        }
        self.flush_notifications();
    }

    fn new_block(&mut self) {
        println!("\n--- New Block ---");

        let Some(start_time) = self.get_time_input("Start time (HH:MM)", "12:00") else {
            return;
        };
        let operatory = self.get_int_input("Operatory", Some(1));
        let duration = self.get_int_input("Duration (minutes)", Some(60));
        let provider = self.choose_provider();
        let reason = self.get_input("Reason", None);

        let draft = BlockDraft {
            operatory,
            start_time,
            provider,
            duration,
            reason,
        };
        if let Ok(id) = self.store.create_block(draft) {
            println!("Created block {}", id);
        }
        self.flush_notifications();
    }

    fn move_appointment(&mut self) {
        println!("\n--- Move Appointment ---");

        let id = self.get_input("Appointment id", None);
        let Some(payload) = self.store.begin_drag(&id) else {
            println!("Nothing to move (unknown id or a block)");
            return;
        };
        let Some(start_time) = self.get_time_input("New start time (HH:MM)", "09:00") else {
            return;
        };
        let operatory = self.get_int_input("New operatory", Some(1));

        match self.store.drop_on(&payload, DropTarget { start_time, operatory }) {
            Ok(Some(moved)) => println!(
                "Moved to operatory {} at {}",
                moved.operatory,
                moved.start_time.format("%Y-%m-%d %H:%M")
            ),
            Ok(None) => println!("Nothing moved"),
            Err(_) => {}
        }
        self.flush_notifications();
    }

    fn edit_appointment(&mut self) {
        println!("\n--- Edit Appointment ---");

        let id = self.get_input("Appointment id", None);
        let status = self.get_input("New status (blank to keep)", Some(""));
        let status = if status.is_empty() {
            None
        } else {
            match AppointmentStatus::from_string(&status) {
                Ok(s) => Some(s),
                Err(e) => {
                    println!("{}", e);
                    return;
                }
            }
        };
        let additional = self.get_input("Secondary provider (blank to keep, '-' to clear)", Some(""));
        let additional_provider = match additional.as_str() {
            "" => None,
            "-" => Some(None),
            name => Some(Some(name.to_string())),
        };

        let edit = AppointmentEdit {
            status,
            additional_provider,
            ..Default::default()
        };
        if let Ok(updated) = self.store.edit(&id, edit) {
            println!("Updated: {}", updated.label());
        }
        self.flush_notifications();
    }

    fn remove_appointment(&mut self, action: &str) {
        let id = self.get_input(&format!("Appointment id to {}", action), None);
        let result = match action {
            "cancel" => self.store.cancel(&id).map(|_| ()),
            "delete" => self.store.delete(&id).map(|_| ()),
            "pin" => self.store.pin(&id),
            _ => self.store.send_to_waitlist(&id),
        };
        if result.is_ok() {
            println!("Done");
        }
        self.flush_notifications();
    }

    fn view_holding_areas(&self) {
        for (title, collection) in [
            ("Pinboard", self.store.pinboard()),
            ("Waitlist", self.store.waitlist()),
        ] {
            println!("\n--- {} ({}) ---", title, collection.len());
            for appointment in collection {
                println!(
                    "  {}  {} ({} min)",
                    appointment.id,
                    appointment.label(),
                    appointment.duration
                );
            }
        }
        println!(
            "\nUse option 7 to place a {} or {} entry back on the schedule.",
            Collection::Pinboard.name(),
            Collection::Waitlist.name()
        );
    }

    fn view_conflicts(&mut self) {
        let mut ids: Vec<String> = self
            .conflicts
            .get(&self.store, self.date)
            .iter()
            .cloned()
            .collect();
        ids.sort();

        if ids.is_empty() {
            println!("\nNo conflicts on {}", self.date);
            return;
        }
        println!("\n--- Conflicts on {} ({}) ---", self.date, ids.len());
        for id in ids {
            if let Some(appointment) = self.store.get(&id) {
                println!(
                    "  {} Op {} {} {}",
                    appointment.start_time.format("%H:%M"),
                    appointment.operatory,
                    appointment.provider,
                    appointment.label()
                );
            }
        }
    }

    fn run(&mut self) {
        self.print_header();

        while self.running {
            self.print_menu();

            let choice = self.get_int_input("Enter choice", Some(1));
            if !self.running {
                break;
            }

            match choice {
                1 => self.view_day(),
                2 => self.view_week(),
                3 => self.view_month(),
                4 => self.go_to_date(),
                5 => self.new_appointment(),
                6 => self.new_block(),
                7 => self.move_appointment(),
                8 => self.edit_appointment(),
                9 => self.remove_appointment("cancel"),
                10 => self.remove_appointment("delete"),
                11 => self.remove_appointment("pin"),
                12 => self.remove_appointment("waitlist"),
                13 => self.view_holding_areas(),
                14 => self.view_conflicts(),
                15 => {
                    self.running = false;
                    println!("\nGoodbye!");
                }
                _ => println!("Invalid choice"),
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("dentbook=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = SimulatorConfig::from_env()?;
    let mut cli = AppointmentCLI::new(config);
    cli.run();
    Ok(())
}
