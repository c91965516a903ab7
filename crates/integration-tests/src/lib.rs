//! Shared fixtures for the integration tests: a fleet service backed by an
//! in-memory SQLite database, plus helpers to put drones into a given state.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use fake::faker::lorem::en::Word;
use fake::Fake;
use md_core::models::{CargoItem, Drone, DroneModel, DroneState, DroneStatusUpdate, NewDrone};
use md_core::FleetService;
use md_db_sqlite::SqliteFleetRepo;

static SERIALS: AtomicU32 = AtomicU32::new(1);

/// Smallest byte sequence `image::guess_format` recognises as PNG.
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

pub struct TestFleet {
    pub service: Arc<FleetService>,
    pub repo: Arc<SqliteFleetRepo>,
}

pub async fn fleet() -> anyhow::Result<TestFleet> {
    let repo = Arc::new(SqliteFleetRepo::new("sqlite::memory:").await?);
    Ok(TestFleet { service: Arc::new(FleetService::new(repo.clone())), repo })
}

impl TestFleet {
    /// A second service over the same database, with its own lock table.
    /// Stands in for another process sharing the store.
    pub fn sibling(&self) -> FleetService {
        FleetService::new(self.repo.clone())
    }

    /// Registers a drone and moves it into `state` through the admin override.
    pub async fn drone(&self, state: DroneState, battery: i32, weight_limit: i64) -> anyhow::Result<Drone> {
        let drone = self
            .service
            .register_drone(NewDrone {
                serial_number: next_serial(),
                model: DroneModel::Middle,
                weight_limit,
                battery_capacity: battery,
            })
            .await?;
        if state == DroneState::Idle {
            return Ok(drone);
        }
        let update = DroneStatusUpdate { state: Some(state), battery_capacity: None };
        Ok(self.service.update_drone_status(drone.id, update).await?)
    }
}

pub fn next_serial() -> String {
    format!("SN-{:06}", SERIALS.fetch_add(1, Ordering::Relaxed))
}

/// A well-formed cargo item with a generated name.
pub fn item(weight: &str, code: &str) -> CargoItem {
    named_item(&Word().fake::<String>(), weight, code)
}

pub fn named_item(name: &str, weight: &str, code: &str) -> CargoItem {
    CargoItem {
        name: name.to_string(),
        weight: weight.to_string(),
        code: code.to_string(),
        image: format!("{}.png", code.to_lowercase()),
    }
}
