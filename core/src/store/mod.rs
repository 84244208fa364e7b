//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine reads and writes through the `TickStore` trait; external
//! operations (colonize, dispatch, recall, upgrade) are inherent methods.

use crate::{
    combat::Arrival,
    error::GameResult,
    fleet::{FleetRow, FleetState},
    planet::PlanetRow,
    resources::Stockpile,
    tick_log::{TickFailure, TickLog},
    types::{FleetId, PlanetId, Timestamp},
};
use rusqlite::Connection;

mod fleet;
mod planet;
mod tick;
mod tick_log;

/// The narrow read-modify-write contract the tick engine depends on.
pub trait TickStore: Send {
    /// Every planet, as stored.
    fn load_planets(&self) -> GameResult<Vec<PlanetRow>>;

    /// Fleets in the `travelling` state only.
    fn load_travelling_fleets(&self) -> GameResult<Vec<FleetRow>>;

    /// Apply the whole batch in one transaction and append its TickLog.
    ///
    /// Records whose version no longer matches are skipped and reported
    /// as conflicts. Any other failure rolls everything back.
    fn commit_tick(&self, batch: &TickBatch) -> GameResult<CommitReport>;

    /// Arrivals committed but not yet handed to the arrival hook.
    fn pending_arrivals(&self) -> GameResult<Vec<Arrival>>;

    fn resolve_arrival(&self, arrival_id: i64, at: Timestamp) -> GameResult<()>;

    fn record_tick_failure(&self, failure: &TickFailure) -> GameResult<i64>;
}

/// New tick-derived values for one planet.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetUpdate {
    pub planet_id:        PlanetId,
    pub expected_version: i64,
    pub stockpile:        Stockpile,
    pub last_tick_at:     Timestamp,
}

/// New tick-derived values for one travelling fleet.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetUpdate {
    pub fleet_id:         FleetId,
    pub expected_version: i64,
    pub state:            FleetState,
    pub remaining_ms:     u64,
    pub arrived_at:       Option<Timestamp>,
    /// Needed for the outbox row when the fleet arrives.
    pub destination_id:   PlanetId,
    pub mission:          crate::fleet::MissionKind,
}

/// Everything one tick wants to write.
#[derive(Debug, Clone)]
pub struct TickBatch {
    pub executed_at:     Timestamp,
    pub planets:         Vec<PlanetUpdate>,
    pub fleets:          Vec<FleetUpdate>,
    pub records_skipped: u64,
    pub duration_ms:     u64,
}

/// What actually landed.
#[derive(Debug, Clone)]
pub struct CommitReport {
    pub tick_log:  TickLog,
    /// Arrivals written to the outbox by this commit.
    pub arrivals:  Vec<Arrival>,
    /// Ids of records skipped because of a version mismatch.
    pub conflicts: Vec<String>,
}

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // External writers hold the same file; wait for their locks.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    /// Run raw SQL against the database. Operator and test escape hatch;
    /// tick code never uses it.
    pub fn execute_script(&self, sql: &str) -> GameResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
