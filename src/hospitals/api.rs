//! Hospital API Endpoints
//! Mission: Public reads, admin-only writes

use crate::api::{parse_id, DataResponse, ListResponse};
use crate::error::{ApiJson, ApiResult};
use crate::hospitals::models::{Hospital, HospitalInput, VacCenter};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

/// GET /api/v1/hospitals
pub async fn get_hospitals(
    State(state): State<AppState>,
) -> ApiResult<Json<ListResponse<Hospital>>> {
    let hospitals = state.hospitals.list().await?;
    Ok(Json(ListResponse::new(hospitals)))
}

/// GET /api/v1/hospitals/:id
pub async fn get_hospital(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Hospital>>> {
    let id = parse_id(&id, "hospital")?;
    let hospital = state.hospitals.get(&id).await?;
    Ok(Json(DataResponse::new(hospital)))
}

/// POST /api/v1/hospitals (admin)
pub async fn create_hospital(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<HospitalInput>,
) -> ApiResult<(StatusCode, Json<DataResponse<Hospital>>)> {
    let hospital = state.hospitals.create(&input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(hospital))))
}

/// PUT /api/v1/hospitals/:id (admin)
pub async fn update_hospital(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<HospitalInput>,
) -> ApiResult<Json<DataResponse<Hospital>>> {
    let id = parse_id(&id, "hospital")?;
    let hospital = state.hospitals.update(&id, &input).await?;
    Ok(Json(DataResponse::new(hospital)))
}

/// DELETE /api/v1/hospitals/:id (admin)
pub async fn delete_hospital(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<serde_json::Value>>> {
    let id = parse_id(&id, "hospital")?;
    state.hospitals.delete(&id).await?;
    Ok(Json(DataResponse::new(json!({}))))
}

/// GET /api/v1/hospitals/vacCenters
pub async fn get_vac_centers(
    State(state): State<AppState>,
) -> ApiResult<Json<ListResponse<VacCenter>>> {
    let centers = state.hospitals.vac_centers().await?;
    Ok(Json(ListResponse::new(centers)))
}
