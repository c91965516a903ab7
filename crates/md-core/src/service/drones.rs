//! Registration, read operations and the administrative status override.

use chrono::Utc;
use tracing::info;

use super::{commit_error, FleetService};
use crate::error::{AppError, Result};
use crate::models::{BatteryLevel, Drone, DroneStatusUpdate, Medication, NewDrone};
use crate::validation::{validate_battery, validate_registration};

impl FleetService {
    /// Registers a drone in IDLE state.
    #[tracing::instrument(skip(self, spec), fields(serial_number = %spec.serial_number))]
    pub async fn register_drone(&self, spec: NewDrone) -> Result<Drone> {
        let errors = validate_registration(&spec);
        if !errors.is_empty() {
            return Err(AppError::ValidationError(errors));
        }

        let spec = NewDrone {
            serial_number: spec.serial_number.trim().to_string(),
            ..spec
        };

        if self.repo.serial_exists(&spec.serial_number).await? {
            return Err(AppError::Conflict(format!(
                "drone with serial number '{}' already exists",
                spec.serial_number
            )));
        }

        let drone = self.repo.create_drone(spec).await.map_err(commit_error)?;
        info!(drone_id = drone.id, model = %drone.model, "drone registered");
        Ok(drone)
    }

    pub async fn get_drone(&self, id: i64) -> Result<Drone> {
        self.require_drone(id).await
    }

    pub async fn get_battery(&self, id: i64) -> Result<BatteryLevel> {
        let drone = self.require_drone(id).await?;
        Ok(BatteryLevel {
            serial_number: drone.serial_number,
            battery_capacity: drone.battery_capacity,
        })
    }

    pub async fn list_medications(&self, id: i64) -> Result<Vec<Medication>> {
        self.require_drone(id).await?;
        Ok(self.repo.find_medications_by_drone(id).await?)
    }

    /// Overwrites state and/or battery level without enforcing transition
    /// rules. Serialised with loads through the same per-drone lock.
    #[tracing::instrument(skip(self))]
    pub async fn update_drone_status(&self, id: i64, update: DroneStatusUpdate) -> Result<Drone> {
        if let Some(battery) = update.battery_capacity {
            let errors = validate_battery(battery);
            if !errors.is_empty() {
                return Err(AppError::ValidationError(errors));
            }
        }

        let _guard = self.locks.acquire(id).await;
        let mut drone = self.require_drone(id).await?;
        let previous = drone.state;

        if let Some(state) = update.state {
            drone.state = state;
        }
        if let Some(battery) = update.battery_capacity {
            drone.battery_capacity = battery;
        }
        drone.updated_at = Utc::now();

        self.repo.save_drone(&drone).await?;
        info!(
            drone_id = id,
            from = %previous,
            to = %drone.state,
            battery = drone.battery_capacity,
            "drone status updated"
        );
        Ok(drone)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{DroneModel, DroneState};
    use crate::service::test_support::{drone, medication};
    use crate::traits::{CommitConflict, MockFleetRepo};

    fn spec(serial: &str) -> NewDrone {
        NewDrone {
            serial_number: serial.into(),
            model: DroneModel::Cruiser,
            weight_limit: 400,
            battery_capacity: 70,
        }
    }

    #[tokio::test]
    async fn register_rejects_out_of_range_fields_without_touching_storage() {
        let svc = FleetService::new(Arc::new(MockFleetRepo::new()));

        let err = svc
            .register_drone(NewDrone { weight_limit: 600, ..spec("SN1") })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
        assert_eq!(err.field_errors()[0].field, "weight_limit");
    }

    #[tokio::test]
    async fn register_rejects_taken_serial() {
        let mut repo = MockFleetRepo::new();
        repo.expect_serial_exists().returning(|s| Ok(s == "SN1"));
        repo.expect_create_drone().never();
        let svc = FleetService::new(Arc::new(repo));

        let err = svc.register_drone(spec("  SN1 ")).await.unwrap_err();
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[tokio::test]
    async fn register_maps_storage_race_to_conflict() {
        let mut repo = MockFleetRepo::new();
        repo.expect_serial_exists().returning(|_| Ok(false));
        repo.expect_create_drone()
            .returning(|d| Err(CommitConflict::DuplicateSerial(d.serial_number).into()));
        let svc = FleetService::new(Arc::new(repo));

        let err = svc.register_drone(spec("SN2")).await.unwrap_err();
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[tokio::test]
    async fn register_trims_serial_and_starts_idle() {
        let mut repo = MockFleetRepo::new();
        repo.expect_serial_exists().returning(|_| Ok(false));
        repo.expect_create_drone()
            .withf(|d| d.serial_number == "SN3")
            .returning(|d| {
                let mut created = drone(7, DroneState::Idle, d.battery_capacity, d.weight_limit);
                created.serial_number = d.serial_number;
                Ok(created)
            });
        let svc = FleetService::new(Arc::new(repo));

        let created = svc.register_drone(spec(" SN3 ")).await.unwrap();
        assert_eq!(created.state, DroneState::Idle);
        assert_eq!(created.serial_number, "SN3");
    }

    #[tokio::test]
    async fn battery_reports_serial_and_level() {
        let mut repo = MockFleetRepo::new();
        repo.expect_find_drone_by_id()
            .returning(|id| Ok(Some(drone(id, DroneState::Idle, 64, 100))));
        let svc = FleetService::new(Arc::new(repo));

        let level = svc.get_battery(5).await.unwrap();
        assert_eq!(level.serial_number, "SN0005");
        assert_eq!(level.battery_capacity, 64);
    }

    #[tokio::test]
    async fn medications_of_unknown_drone_is_not_found() {
        let mut repo = MockFleetRepo::new();
        repo.expect_find_drone_by_id().returning(|_| Ok(None));
        repo.expect_find_medications_by_drone().never();
        let svc = FleetService::new(Arc::new(repo));

        assert_eq!(svc.list_medications(1).await.unwrap_err().kind(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn medications_are_listed_for_known_drone() {
        let mut repo = MockFleetRepo::new();
        repo.expect_find_drone_by_id()
            .returning(|id| Ok(Some(drone(id, DroneState::Loaded, 80, 300))));
        repo.expect_find_medications_by_drone()
            .returning(|id| Ok(vec![medication(1, id, 10, "A"), medication(2, id, 20, "B")]));
        let svc = FleetService::new(Arc::new(repo));

        let meds = svc.list_medications(2).await.unwrap();
        assert_eq!(meds.iter().map(|m| m.weight).sum::<i64>(), 30);
    }

    #[tokio::test]
    async fn status_update_writes_given_fields_only() {
        let mut repo = MockFleetRepo::new();
        repo.expect_find_drone_by_id()
            .returning(|id| Ok(Some(drone(id, DroneState::Idle, 50, 300))));
        repo.expect_save_drone()
            .withf(|d| d.state == DroneState::Loading && d.battery_capacity == 50)
            .times(1)
            .returning(|_| Ok(()));
        let svc = FleetService::new(Arc::new(repo));

        let update = DroneStatusUpdate { state: Some(DroneState::Loading), battery_capacity: None };
        let drone = svc.update_drone_status(1, update).await.unwrap();
        assert_eq!(drone.state, DroneState::Loading);
    }

    #[tokio::test]
    async fn status_update_rejects_battery_over_100() {
        let mut repo = MockFleetRepo::new();
        repo.expect_save_drone().never();
        let svc = FleetService::new(Arc::new(repo));

        let update = DroneStatusUpdate { state: None, battery_capacity: Some(101) };
        assert_eq!(svc.update_drone_status(1, update).await.unwrap_err().kind(), "VALIDATION_ERROR");
    }
}
