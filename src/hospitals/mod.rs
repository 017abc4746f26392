//! Hospital Directory
//! Mission: Hospital records and the vaccine-center listing

pub mod api;
pub mod models;
pub mod store;

pub use models::{Hospital, HospitalInput, VacCenter};
pub use store::HospitalStore;
