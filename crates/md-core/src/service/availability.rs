use super::FleetService;
use crate::error::Result;
use crate::models::{Drone, DroneState};
use crate::validation::MIN_LOAD_BATTERY;

impl FleetService {
    /// Drones that can take new cargo: IDLE or LOADING with at least 25% battery,
    /// ordered by id. A single repository query, so the result is one snapshot.
    #[tracing::instrument(skip(self))]
    pub async fn list_available(&self) -> Result<Vec<Drone>> {
        let drones = self
            .repo
            .find_drones_by_state_and_battery(&DroneState::AVAILABLE, MIN_LOAD_BATTERY)
            .await?;
        tracing::debug!(count = drones.len(), "available drones");
        Ok(drones)
    }
}
