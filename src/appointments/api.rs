//! Appointment API Endpoints
//! Mission: Booking endpoints, top-level and nested under a hospital

use crate::api::{parse_id, DataResponse, ListResponse};
use crate::appointments::models::{
    ensure_access, parse_appt_date, Appointment, AppointmentChanges, AppointmentFilter,
    AppointmentInput, NewAppointment,
};
use crate::auth::{Claims, CurrentUser};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

/// GET /api/v1/appointments
pub async fn get_appointments(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> ApiResult<Json<ListResponse<Appointment>>> {
    list_for(&state, &claims, None).await
}

/// GET /api/v1/hospitals/:hospitalId/appointments
pub async fn get_hospital_appointments(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(hospital_id): Path<String>,
) -> ApiResult<Json<ListResponse<Appointment>>> {
    let hospital_id = parse_id(&hospital_id, "hospital")?;
    // 404 for an unknown hospital rather than an empty list
    state.hospitals.get(&hospital_id).await?;
    list_for(&state, &claims, Some(hospital_id)).await
}

/// GET /api/v1/appointments/:id
pub async fn get_appointment(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Appointment>>> {
    let id = parse_id(&id, "appointment")?;
    let appointment = state.appointments.get(&id).await?;
    ensure_access(&claims, &appointment)?;
    Ok(Json(DataResponse::new(appointment)))
}

/// POST /api/v1/appointments
pub async fn add_appointment(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    ApiJson(input): ApiJson<AppointmentInput>,
) -> ApiResult<(StatusCode, Json<DataResponse<Appointment>>)> {
    let hospital = input
        .hospital
        .as_deref()
        .ok_or_else(|| ApiError::validation("Please specify a hospital"))?;
    let hospital = parse_id(hospital, "hospital")?;
    book(&state, &claims, hospital, &input).await
}

/// POST /api/v1/hospitals/:hospitalId/appointments
pub async fn add_hospital_appointment(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(hospital_id): Path<String>,
    ApiJson(input): ApiJson<AppointmentInput>,
) -> ApiResult<(StatusCode, Json<DataResponse<Appointment>>)> {
    let hospital = parse_id(&hospital_id, "hospital")?;
    book(&state, &claims, hospital, &input).await
}

/// PUT /api/v1/appointments/:id
pub async fn update_appointment(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<AppointmentInput>,
) -> ApiResult<Json<DataResponse<Appointment>>> {
    let id = parse_id(&id, "appointment")?;
    let current = state.appointments.get(&id).await?;
    ensure_access(&claims, &current)?;

    let changes = AppointmentChanges {
        hospital: input
            .hospital
            .as_deref()
            .map(|h| parse_id(h, "hospital"))
            .transpose()?,
        appt_date: input.appt_date.as_deref().map(parse_appt_date).transpose()?,
    };

    let appointment = state.appointments.update(&id, changes).await?;
    Ok(Json(DataResponse::new(appointment)))
}

/// DELETE /api/v1/appointments/:id
pub async fn delete_appointment(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<serde_json::Value>>> {
    let id = parse_id(&id, "appointment")?;
    let appointment = state.appointments.get(&id).await?;
    ensure_access(&claims, &appointment)?;

    state.appointments.delete(&id).await?;
    Ok(Json(DataResponse::new(json!({}))))
}

async fn list_for(
    state: &AppState,
    claims: &Claims,
    hospital: Option<Uuid>,
) -> ApiResult<Json<ListResponse<Appointment>>> {
    let user = if claims.is_admin() {
        None
    } else {
        Some(requester_id(claims)?)
    };

    let appointments = state
        .appointments
        .list(AppointmentFilter { user, hospital })
        .await?;
    Ok(Json(ListResponse::new(appointments)))
}

async fn book(
    state: &AppState,
    claims: &Claims,
    hospital: Uuid,
    input: &AppointmentInput,
) -> ApiResult<(StatusCode, Json<DataResponse<Appointment>>)> {
    let appt_date = input
        .appt_date
        .as_deref()
        .ok_or_else(|| ApiError::validation("Please add an appointment date"))
        .and_then(parse_appt_date)?;

    // Only admins may book for someone else
    let user = match input.user.as_deref() {
        Some(other) if claims.is_admin() => parse_id(other, "user")?,
        Some(other) if other != claims.sub => {
            return Err(ApiError::forbidden(format!(
                "User {} is not authorized to book for another user",
                claims.sub
            )))
        }
        _ => requester_id(claims)?,
    };

    let appointment = state
        .appointments
        .create(NewAppointment {
            user,
            hospital,
            appt_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(appointment))))
}

fn requester_id(claims: &Claims) -> ApiResult<Uuid> {
    claims
        .user_id()
        .ok_or(ApiError::Unauthorized("Not authorized to access this route"))
}
