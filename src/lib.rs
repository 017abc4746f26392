//! VacQ Backend Library
//!
//! Hospital directory and vaccination appointment booking API.
//! The binary in `main.rs` wires these modules into a server; tests build
//! the same router against an in-memory database.

pub mod api;
pub mod appointments;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod hospitals;
pub mod middleware;
pub mod state;

pub use api::create_router;
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
