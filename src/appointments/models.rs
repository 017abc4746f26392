//! Appointment records, payloads and access rules

use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appointment as returned by the API, with a hospital summary embedded
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub appt_date: DateTime<Utc>,
    pub user: Uuid,
    pub hospital: HospitalSummary,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HospitalSummary {
    pub id: Uuid,
    pub name: String,
    pub province: Option<String>,
    pub tel: Option<String>,
}

/// Booking / update payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub appt_date: Option<String>,
    pub hospital: Option<String>,
    /// Admins may book on behalf of another user
    pub user: Option<String>,
}

/// Which appointments a listing covers
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentFilter {
    pub user: Option<Uuid>,
    pub hospital: Option<Uuid>,
}

/// Validated booking
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user: Uuid,
    pub hospital: Uuid,
    pub appt_date: DateTime<Utc>,
}

/// Validated update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct AppointmentChanges {
    pub hospital: Option<Uuid>,
    pub appt_date: Option<DateTime<Utc>>,
}

/// Owners and admins may touch an appointment; everyone else is refused.
pub fn ensure_access(claims: &Claims, appointment: &Appointment) -> ApiResult<()> {
    if claims.is_admin() || claims.user_id() == Some(appointment.user) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User {} is not authorized to access appointment {}",
            claims.sub, appointment.id
        )))
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) or `YYYY-MM-DD` (midnight UTC).
pub fn parse_appt_date(raw: &str) -> ApiResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(ApiError::validation(format!(
        "Invalid appointment date: {}",
        raw
    )))
}

pub(crate) fn format_appt_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
