//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Drone, DroneState, Medication, NewDrone, NewMedication, Transition};

/// Data persistence contract for drones and medications.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FleetRepo: Send + Sync {
    // Drone Operations
    /// Inserts a new drone in IDLE state. A serial number taken in the meantime
    /// is reported as [`CommitConflict::DuplicateSerial`].
    async fn create_drone(&self, drone: NewDrone) -> anyhow::Result<Drone>;
    async fn serial_exists(&self, serial_number: &str) -> anyhow::Result<bool>;
    async fn find_drone_by_id(&self, id: i64) -> anyhow::Result<Option<Drone>>;
    /// Persists the mutable fields (state, battery, updated_at) of an existing drone.
    async fn save_drone(&self, drone: &Drone) -> anyhow::Result<()>;
    /// Drones in any of `states` with at least `min_battery` percent, ordered by id.
    async fn find_drones_by_state_and_battery(
        &self,
        states: &[DroneState],
        min_battery: i32,
    ) -> anyhow::Result<Vec<Drone>>;

    // Medication Operations
    /// Medications owned by a drone, ordered by id.
    async fn find_medications_by_drone(&self, drone_id: i64) -> anyhow::Result<Vec<Medication>>;
    async fn code_exists(&self, code: &str) -> anyhow::Result<bool>;

    /// Inserts every medication for `drone_id` and applies `transition` to the
    /// drone in a single transaction. Nothing is written if any part fails.
    ///
    /// Implementations report a drone that is no longer in `transition.from`,
    /// or a duplicate code caught by the storage layer, as a [`CommitConflict`]
    /// inside the returned error.
    async fn create_medications(
        &self,
        drone_id: i64,
        items: Vec<NewMedication>,
        transition: Transition,
    ) -> anyhow::Result<Vec<Medication>>;
}

/// Media storage contract for medication images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns a media_id for the Medication model.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
    /// Public URL for a stored media id.
    fn url_for(&self, media_id: &str) -> String;
}

/// Commit-time conflicts a repository detects inside its transaction.
///
/// Repositories wrap these in `anyhow::Error`; the service downcasts them back
/// into domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitConflict {
    #[error("medication code '{0}' already exists")]
    DuplicateCode(String),

    #[error("serial number '{0}' already exists")]
    DuplicateSerial(String),

    #[error("drone {drone_id} is in state {actual}, expected {expected}")]
    StateChanged {
        drone_id: i64,
        expected: DroneState,
        actual: DroneState,
    },
}

/// Rejection from a `MediaStore` when the payload is not something it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported media: {0}")]
pub struct UnsupportedMedia(pub String);
