//! md-core
//!
//! The central domain logic and interface definitions for the medication
//! drone fleet: entity models, the loading engine and the availability query.

pub mod error;
pub mod locks;
pub mod models;
pub mod service;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use service::FleetService;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn enums_use_upper_case_wire_names() {
        assert_eq!(serde_json::to_value(DroneState::Loading).unwrap(), "LOADING");
        assert_eq!(serde_json::to_value(DroneModel::Cruiser).unwrap(), "CRUISER");
        let state: DroneState = serde_json::from_value(serde_json::json!("RETURNING")).unwrap();
        assert_eq!(state, DroneState::Returning);
    }

    #[test]
    fn state_round_trips_through_str() {
        for state in [
            DroneState::Idle,
            DroneState::Loading,
            DroneState::Loaded,
            DroneState::Delivering,
            DroneState::Delivered,
            DroneState::Returning,
        ] {
            assert_eq!(state.as_str().parse::<DroneState>(), Ok(state));
        }
        assert!("FLYING".parse::<DroneState>().is_err());
        assert!("light".parse::<DroneModel>().is_err());
    }

    #[test]
    fn only_loading_accepts_cargo() {
        assert!(DroneState::Loading.can_accept_cargo());
        assert!(!DroneState::Loaded.can_accept_cargo());
        assert!(!DroneState::Idle.can_accept_cargo());
        assert!(DroneState::Idle.is_available());
        assert!(!DroneState::Delivered.is_available());
    }

    #[test]
    fn medication_serializes_owner_as_drone() {
        let now = chrono::Utc::now();
        let med = Medication {
            id: 1,
            name: "Aspirin".into(),
            weight: 50,
            code: "ASP_001".into(),
            image: "ab/cd/abcd".into(),
            drone_id: 4,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&med).unwrap();
        assert_eq!(json["drone"], 4);
        assert!(json.get("drone_id").is_none());
    }
}
