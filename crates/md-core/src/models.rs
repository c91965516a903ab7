//! # Domain Models
//!
//! These structs represent the core entities of the medication drone fleet.
//! Ids are numeric and assigned by the repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weight class of a drone. Classification only; the engine never compares it
/// against `weight_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneModel {
    Light,
    Middle,
    Cruiser,
    Heavy,
}

impl DroneModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DroneModel::Light => "LIGHT",
            DroneModel::Middle => "MIDDLE",
            DroneModel::Cruiser => "CRUISER",
            DroneModel::Heavy => "HEAVY",
        }
    }
}

/// Operational state of a drone.
///
/// Only LOADING -> LOADED is driven by this crate (a successful load); every
/// other transition happens outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneState {
    Idle,
    Loading,
    Loaded,
    Delivering,
    Delivered,
    Returning,
}

impl DroneState {
    /// States a drone may be listed as available in.
    pub const AVAILABLE: [DroneState; 2] = [DroneState::Idle, DroneState::Loading];

    pub fn as_str(&self) -> &'static str {
        match self {
            DroneState::Idle => "IDLE",
            DroneState::Loading => "LOADING",
            DroneState::Loaded => "LOADED",
            DroneState::Delivering => "DELIVERING",
            DroneState::Delivered => "DELIVERED",
            DroneState::Returning => "RETURNING",
        }
    }

    /// Cargo may only be put on a drone that is currently LOADING.
    pub fn can_accept_cargo(&self) -> bool {
        matches!(self, DroneState::Loading)
    }

    pub fn is_available(&self) -> bool {
        Self::AVAILABLE.contains(self)
    }
}

impl fmt::Display for DroneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DroneModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or submitted enum name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for DroneState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(DroneState::Idle),
            "LOADING" => Ok(DroneState::Loading),
            "LOADED" => Ok(DroneState::Loaded),
            "DELIVERING" => Ok(DroneState::Delivering),
            "DELIVERED" => Ok(DroneState::Delivered),
            "RETURNING" => Ok(DroneState::Returning),
            other => Err(UnknownVariant { kind: "drone state", value: other.to_string() }),
        }
    }
}

impl FromStr for DroneModel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIGHT" => Ok(DroneModel::Light),
            "MIDDLE" => Ok(DroneModel::Middle),
            "CRUISER" => Ok(DroneModel::Cruiser),
            "HEAVY" => Ok(DroneModel::Heavy),
            other => Err(UnknownVariant { kind: "drone model", value: other.to_string() }),
        }
    }
}

/// A registered drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: i64,
    /// Assigned at registration, never changes.
    pub serial_number: String,
    pub model: DroneModel,
    /// Maximum total cargo in grams.
    pub weight_limit: i64,
    /// Percent, 0-100.
    pub battery_capacity: i32,
    pub state: DroneState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A medication loaded onto a drone. Owned by exactly one drone for its whole life.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    pub name: String,
    /// Grams.
    pub weight: i64,
    pub code: String,
    /// Reference handed out by the `MediaStore`; opaque here.
    pub image: String,
    #[serde(rename = "drone")]
    pub drone_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration request for a new drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDrone {
    pub serial_number: String,
    pub model: DroneModel,
    pub weight_limit: i64,
    pub battery_capacity: i32,
}

/// One medication as submitted in a load request, before validation.
///
/// `weight` is kept raw so the engine can report exactly what the caller sent
/// when it is not a non-negative integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoItem {
    pub name: String,
    pub weight: String,
    pub code: String,
    pub image: String,
}

/// A validated cargo item, ready to be written by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMedication {
    pub name: String,
    pub weight: i64,
    pub code: String,
    pub image: String,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResult {
    /// The drone after the transition to LOADED.
    pub drone: Drone,
    pub loaded: usize,
    /// Weight of everything on the drone after the load, in grams.
    pub total_weight: i64,
    pub medications: Vec<Medication>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryLevel {
    pub serial_number: String,
    pub battery_capacity: i32,
}

/// Administrative override of a drone's mutable fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroneStatusUpdate {
    pub state: Option<DroneState>,
    pub battery_capacity: Option<i32>,
}

/// A state change applied by the repository in the same transaction as the
/// medication inserts. The repository must refuse it if the drone is not in
/// `from` any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DroneState,
    pub to: DroneState,
}

impl Transition {
    pub const LOAD: Transition = Transition { from: DroneState::Loading, to: DroneState::Loaded };
}
