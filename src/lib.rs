//! Appointment-book core for a dental practice training simulator.
//!
//! The [`store::AppointmentStore`] owns every appointment and is the only
//! place they are changed. Grids are derived from it on demand through the
//! [`calendar`] resolvers and the [`views`] builders.

pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod seed;
pub mod slots;
pub mod store;
pub mod views;

pub use calendar::{
    check_availability, day_conflicts, detect_conflicts, CellState, ConflictCache,
    OccupancyResolver,
};
pub use config::SimulatorConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use models::{
    Appointment, AppointmentKind, AppointmentStatus, BlockDraft, Patient, PatientLookup,
    PatientRegistry, Visit, VisitDraft,
};
pub use store::{AppointmentEdit, AppointmentStore, Collection, DragPayload, DropTarget};
