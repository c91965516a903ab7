//! The loading engine: validates a load request against one drone and commits
//! the new medications together with the LOADING -> LOADED transition.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{info, warn};

use super::{commit_error, FleetService};
use crate::error::{AppError, FieldError, Result};
use crate::models::{CargoItem, Drone, LoadResult, NewMedication, Transition};
use crate::validation::{duplicate_codes, parse_weight, validate_cargo_format, MIN_LOAD_BATTERY};

impl FleetService {
    /// Loads `cargo` onto a drone.
    ///
    /// Checks run in a fixed order and the first failing step decides the
    /// error: existence, state, battery, non-empty cargo, weights, name/code
    /// format, code uniqueness, total weight. On any error nothing is written.
    #[tracing::instrument(skip(self, cargo), fields(items = cargo.len()))]
    pub async fn load_medications(&self, drone_id: i64, cargo: Vec<CargoItem>) -> Result<LoadResult> {
        let _guard = self.locks.acquire(drone_id).await;

        match self.try_load(drone_id, cargo).await {
            Ok(result) => {
                info!(
                    drone_id,
                    loaded = result.loaded,
                    total_weight = result.total_weight,
                    "drone loaded"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(drone_id, kind = err.kind(), "load rejected: {}", err);
                Err(err)
            }
        }
    }

    async fn try_load(&self, drone_id: i64, cargo: Vec<CargoItem>) -> Result<LoadResult> {
        // 1. Existence, state and battery
        let drone = self.require_drone(drone_id).await?;
        if !drone.state.can_accept_cargo() {
            return Err(AppError::InvalidState(drone.state));
        }
        if drone.battery_capacity < MIN_LOAD_BATTERY {
            return Err(AppError::LowBattery {
                level: drone.battery_capacity,
                minimum: MIN_LOAD_BATTERY,
            });
        }
        if cargo.is_empty() {
            return Err(AppError::ValidationError(vec![FieldError::new(
                "cargo",
                "at least one medication is required",
            )]));
        }

        // 2. Per-item input checks
        let weights = cargo
            .iter()
            .map(|item| parse_weight(&item.weight).ok_or_else(|| AppError::InvalidWeight(item.weight.clone())))
            .collect::<Result<Vec<_>>>()?;

        let format_errors = validate_cargo_format(&cargo);
        if !format_errors.is_empty() {
            return Err(AppError::InvalidFormat(format_errors));
        }

        self.ensure_codes_unique(&cargo).await?;

        // 3. Capacity
        let current: i64 = self
            .repo
            .find_medications_by_drone(drone_id)
            .await?
            .iter()
            .map(|m| m.weight)
            .sum();
        let total = match weights.iter().try_fold(current, |acc, w| acc.checked_add(*w)) {
            Some(total) if total <= drone.weight_limit => total,
            total => {
                return Err(AppError::WeightExceeded {
                    total: total.unwrap_or(i64::MAX),
                    limit: drone.weight_limit,
                })
            }
        };

        // 4. Commit
        let items = cargo
            .into_iter()
            .zip(weights)
            .map(|(item, weight)| NewMedication {
                name: item.name,
                weight,
                code: item.code,
                image: item.image,
            })
            .collect();

        let medications = self
            .repo
            .create_medications(drone_id, items, Transition::LOAD)
            .await
            .map_err(commit_error)?;

        // Committed. The transition is known, so report it without another read.
        let drone = Drone {
            state: Transition::LOAD.to,
            updated_at: Utc::now(),
            ..drone
        };

        Ok(LoadResult {
            drone,
            loaded: medications.len(),
            total_weight: total,
            medications,
        })
    }

    /// Rejects codes repeated inside the request and codes already stored, in one pass.
    async fn ensure_codes_unique(&self, cargo: &[CargoItem]) -> Result<()> {
        let mut conflicts = duplicate_codes(cargo);

        let distinct: BTreeSet<&str> = cargo.iter().map(|item| item.code.as_str()).collect();
        for code in distinct {
            if self.repo.code_exists(code).await? {
                conflicts.insert(code.to_string());
            }
        }

        if conflicts.is_empty() {
            return Ok(());
        }
        let codes: Vec<String> = conflicts.into_iter().collect();
        Err(AppError::Conflict(format!(
            "medication code must be unique, already in use: {}",
            codes.join(", ")
        )))
    }
}
