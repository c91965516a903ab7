//! # md-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `md-core` domain models.

use std::str::FromStr;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use md_core::models::{Drone, DroneState, Medication, NewDrone, NewMedication, Transition};
use md_core::traits::{CommitConflict, FleetRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

const DRONE_COLUMNS: &str =
    "id, serial_number, model, weight_limit, battery_capacity, state, created_at, updated_at";
const MEDICATION_COLUMNS: &str = "id, name, weight, code, image, drone_id, created_at, updated_at";

pub struct SqliteFleetRepo {
    pool: SqlitePool,
}

impl SqliteFleetRepo {
    /// Connects to `url` and applies the embedded migrations.
    ///
    /// In-memory databases live only as long as their connection, so they get
    /// a single connection that is never recycled.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("sqlite fleet repository ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn drone_from_row(row: &SqliteRow) -> anyhow::Result<Drone> {
    Ok(Drone {
        id: row.try_get("id")?,
        serial_number: row.try_get("serial_number")?,
        model: row.try_get::<String, _>("model")?.parse()?,
        weight_limit: row.try_get("weight_limit")?,
        battery_capacity: row.try_get("battery_capacity")?,
        state: row.try_get::<String, _>("state")?.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn medication_from_row(row: &SqliteRow) -> anyhow::Result<Medication> {
    Ok(Medication {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        weight: row.try_get("weight")?,
        code: row.try_get("code")?,
        image: row.try_get("image")?,
        drone_id: row.try_get("drone_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl FleetRepo for SqliteFleetRepo {
    async fn create_drone(&self, drone: NewDrone) -> anyhow::Result<Drone> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO drones (serial_number, model, weight_limit, battery_capacity, state, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&drone.serial_number)
        .bind(drone.model.as_str())
        .bind(drone.weight_limit)
        .bind(drone.battery_capacity)
        .bind(DroneState::Idle.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let result = match result {
            Err(e) if is_unique_violation(&e) => {
                return Err(CommitConflict::DuplicateSerial(drone.serial_number).into())
            }
            other => other?,
        };

        Ok(Drone {
            id: result.last_insert_rowid(),
            serial_number: drone.serial_number,
            model: drone.model,
            weight_limit: drone.weight_limit,
            battery_capacity: drone.battery_capacity,
            state: DroneState::Idle,
            created_at: now,
            updated_at: now,
        })
    }

    async fn serial_exists(&self, serial_number: &str) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drones WHERE serial_number = ?")
            .bind(serial_number)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn find_drone_by_id(&self, id: i64) -> anyhow::Result<Option<Drone>> {
        let row = sqlx::query(&format!("SELECT {DRONE_COLUMNS} FROM drones WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(drone_from_row).transpose()
    }

    async fn save_drone(&self, drone: &Drone) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE drones SET state = ?, battery_capacity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(drone.state.as_str())
        .bind(drone.battery_capacity)
        .bind(drone.updated_at)
        .bind(drone.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("drone {} does not exist", drone.id));
        }
        Ok(())
    }

    async fn find_drones_by_state_and_battery(
        &self,
        states: &[DroneState],
        min_battery: i32,
    ) -> anyhow::Result<Vec<Drone>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {DRONE_COLUMNS} FROM drones WHERE state IN ("));
        let mut separated = query.separated(", ");
        for state in states {
            separated.push_bind(state.as_str());
        }
        separated.push_unseparated(") AND battery_capacity >= ");
        query.push_bind(min_battery);
        query.push(" ORDER BY id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(drone_from_row).collect()
    }

    async fn find_medications_by_drone(&self, drone_id: i64) -> anyhow::Result<Vec<Medication>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE drone_id = ? ORDER BY id ASC"
        ))
        .bind(drone_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(medication_from_row).collect()
    }

    async fn code_exists(&self, code: &str) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medications WHERE code = ?")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Applies the transition and inserts every medication in one transaction.
    ///
    /// The state guard lives in the UPDATE's WHERE clause, so a second writer
    /// that got past its own checks still cannot commit against a drone that
    /// has already moved on.
    async fn create_medications(
        &self,
        drone_id: i64,
        items: Vec<NewMedication>,
        transition: Transition,
    ) -> anyhow::Result<Vec<Medication>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // 1. Transition, guarded on the expected state
        let updated = sqlx::query("UPDATE drones SET state = ?, updated_at = ? WHERE id = ? AND state = ?")
            .bind(transition.to.as_str())
            .bind(now)
            .bind(drone_id)
            .bind(transition.from.as_str())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() != 1 {
            let actual: Option<String> = sqlx::query_scalar("SELECT state FROM drones WHERE id = ?")
                .bind(drone_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return match actual {
                Some(actual) => Err(CommitConflict::StateChanged {
                    drone_id,
                    expected: transition.from,
                    actual: actual.parse()?,
                }
                .into()),
                None => Err(anyhow!("drone {} does not exist", drone_id)),
            };
        }

        // 2. Medications
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let result = sqlx::query(
                "INSERT INTO medications (name, weight, code, image, drone_id, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&item.name)
            .bind(item.weight)
            .bind(&item.code)
            .bind(&item.image)
            .bind(drone_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await;

            // Dropping `tx` on the early return rolls everything back.
            let result = match result {
                Err(e) if is_unique_violation(&e) => return Err(CommitConflict::DuplicateCode(item.code).into()),
                other => other?,
            };

            created.push(Medication {
                id: result.last_insert_rowid(),
                name: item.name,
                weight: item.weight,
                code: item.code,
                image: item.image,
                drone_id,
                created_at: now,
                updated_at: now,
            });
        }

        tx.commit().await?;
        debug!(drone_id, count = created.len(), "medications committed");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_core::models::DroneModel;

    async fn repo() -> SqliteFleetRepo {
        SqliteFleetRepo::new("sqlite::memory:").await.unwrap()
    }

    async fn drone_in(repo: &SqliteFleetRepo, serial: &str, state: DroneState, battery: i32) -> Drone {
        let mut drone = repo
            .create_drone(NewDrone {
                serial_number: serial.into(),
                model: DroneModel::Light,
                weight_limit: 300,
                battery_capacity: 100,
            })
            .await
            .unwrap();
        drone.state = state;
        drone.battery_capacity = battery;
        repo.save_drone(&drone).await.unwrap();
        drone
    }

    fn med(code: &str, weight: i64) -> NewMedication {
        NewMedication {
            name: "Aspirin".into(),
            weight,
            code: code.into(),
            image: "ab/cd/abcd".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_drone() {
        let repo = repo().await;
        let created = drone_in(&repo, "SN-1", DroneState::Idle, 90).await;

        let found = repo.find_drone_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.serial_number, "SN-1");
        assert_eq!(found.state, DroneState::Idle);
        assert_eq!(found.battery_capacity, 90);
        assert!(repo.serial_exists("SN-1").await.unwrap());
        assert!(repo.find_drone_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_serial_is_a_commit_conflict() {
        let repo = repo().await;
        drone_in(&repo, "SN-1", DroneState::Idle, 90).await;

        let err = repo
            .create_drone(NewDrone {
                serial_number: "SN-1".into(),
                model: DroneModel::Heavy,
                weight_limit: 500,
                battery_capacity: 50,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommitConflict>(),
            Some(&CommitConflict::DuplicateSerial("SN-1".into()))
        );
    }

    #[tokio::test]
    async fn test_create_medications_applies_transition() {
        let repo = repo().await;
        let drone = drone_in(&repo, "SN-1", DroneState::Loading, 80).await;

        let created = repo
            .create_medications(drone.id, vec![med("A_1", 10), med("A_2", 20)], Transition::LOAD)
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let stored = repo.find_medications_by_drone(drone.id).await.unwrap();
        let ids = |meds: &[Medication]| meds.iter().map(|m| (m.id, m.code.clone())).collect::<Vec<_>>();
        assert_eq!(ids(&stored), ids(&created));
        assert!(repo.code_exists("A_2").await.unwrap());

        let drone = repo.find_drone_by_id(drone.id).await.unwrap().unwrap();
        assert_eq!(drone.state, DroneState::Loaded);
    }

    #[tokio::test]
    async fn test_state_guard_rejects_and_writes_nothing() {
        let repo = repo().await;
        let drone = drone_in(&repo, "SN-1", DroneState::Delivering, 80).await;

        let err = repo
            .create_medications(drone.id, vec![med("A_1", 10)], Transition::LOAD)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommitConflict>(),
            Some(CommitConflict::StateChanged { actual: DroneState::Delivering, .. })
        ));
        assert!(repo.find_medications_by_drone(drone.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_code_rolls_back_the_batch() {
        let repo = repo().await;
        let first = drone_in(&repo, "SN-1", DroneState::Loading, 80).await;
        let second = drone_in(&repo, "SN-2", DroneState::Loading, 80).await;
        repo.create_medications(first.id, vec![med("TAKEN", 10)], Transition::LOAD)
            .await
            .unwrap();

        let err = repo
            .create_medications(second.id, vec![med("FRESH", 10), med("TAKEN", 10)], Transition::LOAD)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommitConflict>(),
            Some(&CommitConflict::DuplicateCode("TAKEN".into()))
        );

        assert!(repo.find_medications_by_drone(second.id).await.unwrap().is_empty());
        assert!(!repo.code_exists("FRESH").await.unwrap());
        let second = repo.find_drone_by_id(second.id).await.unwrap().unwrap();
        assert_eq!(second.state, DroneState::Loading);
    }

    #[tokio::test]
    async fn test_availability_filter_and_order() {
        let repo = repo().await;
        let a = drone_in(&repo, "A", DroneState::Loading, 25).await;
        drone_in(&repo, "B", DroneState::Idle, 24).await;
        drone_in(&repo, "C", DroneState::Loaded, 90).await;
        let d = drone_in(&repo, "D", DroneState::Idle, 100).await;
        drone_in(&repo, "E", DroneState::Returning, 100).await;

        let found = repo
            .find_drones_by_state_and_battery(&DroneState::AVAILABLE, 25)
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a.id, d.id]);

        assert!(repo.find_drones_by_state_and_battery(&[], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_a_drone_cascades_to_medications() {
        let repo = repo().await;
        let drone = drone_in(&repo, "SN-1", DroneState::Loading, 80).await;
        repo.create_medications(drone.id, vec![med("A_1", 10)], Transition::LOAD)
            .await
            .unwrap();

        sqlx::query("DELETE FROM drones WHERE id = ?")
            .bind(drone.id)
            .execute(repo.pool())
            .await
            .unwrap();

        assert!(!repo.code_exists("A_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_unknown_drone_fails() {
        let repo = repo().await;
        let mut ghost = drone_in(&repo, "SN-1", DroneState::Idle, 50).await;
        ghost.id = 4242;
        assert!(repo.save_drone(&ghost).await.is_err());
    }
}
