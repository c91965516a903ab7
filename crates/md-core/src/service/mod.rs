//! # FleetService
//!
//! The operations the API layer calls. Each one takes plain input and returns
//! `Result<_, AppError>`; nothing here knows about HTTP.

mod availability;
mod drones;
mod loading;

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::locks::DroneLocks;
use crate::models::Drone;
use crate::traits::{CommitConflict, FleetRepo};

pub struct FleetService {
    repo: Arc<dyn FleetRepo>,
    locks: DroneLocks,
}

impl FleetService {
    pub fn new(repo: Arc<dyn FleetRepo>) -> Self {
        Self { repo, locks: DroneLocks::new() }
    }

    async fn require_drone(&self, id: i64) -> Result<Drone> {
        self.repo
            .find_drone_by_id(id)
            .await?
            .ok_or(AppError::NotFound("drone", id))
    }
}

/// Turns a conflict detected inside a repository transaction back into the
/// domain error the pre-checks would have produced.
fn commit_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<CommitConflict>() {
        Some(CommitConflict::DuplicateCode(code)) => {
            AppError::Conflict(format!("medication code must be unique, already in use: {}", code))
        }
        Some(CommitConflict::DuplicateSerial(serial)) => {
            AppError::Conflict(format!("drone with serial number '{}' already exists", serial))
        }
        Some(CommitConflict::StateChanged { actual, .. }) => AppError::InvalidState(*actual),
        None => AppError::Internal(err),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::models::{CargoItem, Drone, DroneModel, DroneState, Medication};

    pub fn drone(id: i64, state: DroneState, battery: i32, limit: i64) -> Drone {
        let now = Utc::now();
        Drone {
            id,
            serial_number: format!("SN{id:04}"),
            model: DroneModel::Light,
            weight_limit: limit,
            battery_capacity: battery,
            state,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn cargo(name: &str, weight: &str, code: &str) -> CargoItem {
        CargoItem {
            name: name.into(),
            weight: weight.into(),
            code: code.into(),
            image: format!("{}.jpg", name.to_lowercase()),
        }
    }

    pub fn medication(id: i64, drone_id: i64, weight: i64, code: &str) -> Medication {
        let now = Utc::now();
        Medication {
            id,
            name: "Existing".into(),
            weight,
            code: code.into(),
            image: "existing.jpg".into(),
            drone_id,
            created_at: now,
            updated_at: now,
        }
    }
}
