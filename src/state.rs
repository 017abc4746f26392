//! Shared application state handed to every handler

use crate::appointments::AppointmentStore;
use crate::auth::{JwtHandler, UserStore};
use crate::config::AppConfig;
use crate::db::Database;
use crate::hospitals::HospitalStore;
use anyhow::Result;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: UserStore,
    pub hospitals: HospitalStore,
    pub appointments: AppointmentStore,
    pub jwt_handler: Arc<JwtHandler>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let jwt_handler = Arc::new(JwtHandler::new(
            config.jwt_secret.clone(),
            config.jwt_expire_hours,
        ));

        Self {
            users: UserStore::new(db.clone(), config.bcrypt_cost),
            hospitals: HospitalStore::new(db.clone()),
            appointments: AppointmentStore::new(db),
            jwt_handler,
            config: Arc::new(config),
        }
    }

    /// Open the configured database and build state from it.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        Ok(Self::new(db, config))
    }
}

impl FromRef<AppState> for Arc<JwtHandler> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_handler.clone()
    }
}
