//! Appointment Manager
//! Mission: One appointment per user, never more than a hospital can take

pub mod api;
pub mod models;
pub mod store;

pub use models::{Appointment, AppointmentChanges, AppointmentFilter, NewAppointment};
pub use store::AppointmentStore;
