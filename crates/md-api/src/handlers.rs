//! # md-api Handlers
//!
//! Thin adapters between HTTP requests and `FleetService`. Validation and
//! business rules live in md-core; these only translate shapes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use md_core::models::{CargoItem, Drone, DroneStatusUpdate, Medication, NewDrone};
use md_core::traits::MediaStore;
use serde::Serialize;

use crate::error::{upload_error, ApiError};
use crate::payload::{CargoForm, JsonBody, LoadRequest};
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// A medication as returned to clients, with its image as a URL.
#[derive(Debug, Serialize)]
pub struct MedicationView {
    pub id: i64,
    pub name: String,
    pub weight: i64,
    pub code: String,
    pub image: String,
    pub drone: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicationView {
    fn render(med: Medication, media: &dyn MediaStore) -> Self {
        MedicationView {
            image: media.url_for(&med.image),
            id: med.id,
            name: med.name,
            weight: med.weight,
            code: med.code,
            drone: med.drone_id,
            created_at: med.created_at,
            updated_at: med.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatteryView {
    pub serial_number: String,
    /// Rendered as a percentage string, e.g. `"80%"`.
    pub battery_level: String,
}

#[derive(Debug, Serialize)]
pub struct LoadView {
    pub message: String,
    pub drone: Drone,
    pub total_weight: i64,
    pub medications: Vec<MedicationView>,
}

/// `POST /api/drones/register/`
pub async fn register_drone(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewDrone>,
) -> ApiResult<(StatusCode, Json<Drone>)> {
    let drone = state.fleet.register_drone(body).await?;
    Ok((StatusCode::CREATED, Json(drone)))
}

/// `GET /api/drones/available/`
pub async fn list_available(State(state): State<AppState>) -> ApiResult<Json<Vec<Drone>>> {
    Ok(Json(state.fleet.list_available().await?))
}

/// `GET /api/drones/{id}/battery/`
pub async fn get_battery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BatteryView>> {
    let level = state.fleet.get_battery(id).await?;
    Ok(Json(BatteryView {
        serial_number: level.serial_number,
        battery_level: format!("{}%", level.battery_capacity),
    }))
}

/// `GET /api/drones/{id}/medications/`
pub async fn list_medications(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<MedicationView>>> {
    let meds = state.fleet.list_medications(id).await?;
    let media = state.media.as_ref();
    Ok(Json(meds.into_iter().map(|m| MedicationView::render(m, media)).collect()))
}

/// `POST /api/drones/{id}/load/`
///
/// Accepts a JSON object, a JSON array, or a multipart form describing one
/// item with its image file.
pub async fn load_medications(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    request: LoadRequest,
) -> ApiResult<(StatusCode, Json<LoadView>)> {
    let cargo = match request {
        LoadRequest::Json(items) => items,
        LoadRequest::Form(form) => vec![cargo_from_form(&state, form).await?],
    };

    let result = state.fleet.load_medications(id, cargo).await?;
    let media = state.media.as_ref();
    Ok((
        StatusCode::CREATED,
        Json(LoadView {
            message: format!("Successfully loaded {} medications", result.loaded),
            drone: result.drone,
            total_weight: result.total_weight,
            medications: result
                .medications
                .into_iter()
                .map(|m| MedicationView::render(m, media))
                .collect(),
        }),
    ))
}

async fn cargo_from_form(state: &AppState, form: axum::extract::Multipart) -> ApiResult<CargoItem> {
    let CargoForm { item, upload } = CargoForm::read(form).await?;
    let mut cargo = item.into_cargo();
    if let Some(upload) = upload {
        cargo.image = state
            .media
            .save_upload(upload.bytes.to_vec(), &upload.content_type)
            .await
            .map_err(upload_error)?;
    }
    Ok(cargo)
}

/// `PATCH /api/drones/{id}/status/`
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<DroneStatusUpdate>,
) -> ApiResult<Json<Drone>> {
    Ok(Json(state.fleet.update_drone_status(id, update).await?))
}
