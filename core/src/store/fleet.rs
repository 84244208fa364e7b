//! Store methods for fleets. Dispatch, launch and recall live here;
//! the tick-side transition to `arrived` is in tick.rs.

use super::SimStore;
use crate::{
    error::{GameError, GameResult},
    fleet::{Fleet, FleetRow, FleetState},
    types::{to_millis, Timestamp},
};
use rusqlite::{params, OptionalExtension, Row};

const FLEET_COLUMNS: &str = "fleet_id, owner_id, origin_id, destination_id, ships_json,
    mission, state, departed_at, eta, remaining_ms, arrived_at, version";

fn fleet_row(row: &Row<'_>) -> rusqlite::Result<FleetRow> {
    Ok(FleetRow {
        fleet_id:       row.get(0)?,
        owner_id:       row.get(1)?,
        origin_id:      row.get(2)?,
        destination_id: row.get(3)?,
        ships_json:     row.get(4)?,
        mission:        row.get(5)?,
        state:          row.get(6)?,
        departed_at:    row.get(7)?,
        eta:            row.get(8)?,
        remaining_ms:   row.get(9)?,
        arrived_at:     row.get(10)?,
        version:        row.get(11)?,
    })
}

impl SimStore {
    // ── Fleet ─────────────────────────────────────────────────────

    pub fn insert_fleet(&self, f: &Fleet) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO fleet (
                fleet_id, owner_id, origin_id, destination_id, ships_json,
                mission, state, departed_at, eta, remaining_ms, arrived_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                &f.fleet_id,
                &f.owner_id,
                &f.origin_id,
                &f.destination_id,
                serde_json::to_string(&f.ships)?,
                f.mission.as_str(),
                f.state.as_str(),
                to_millis(f.departed_at),
                to_millis(f.eta),
                f.remaining_ms as i64,
                f.arrived_at.map(to_millis),
                f.version,
            ],
        )?;
        Ok(())
    }

    pub(super) fn fleet_rows_in_state(&self, state: FleetState) -> GameResult<Vec<FleetRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FLEET_COLUMNS} FROM fleet WHERE state = ?1 ORDER BY eta ASC, fleet_id ASC"
        ))?;
        let rows = stmt.query_map(params![state.as_str()], fleet_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn fleet(&self, fleet_id: &str) -> GameResult<Fleet> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {FLEET_COLUMNS} FROM fleet WHERE fleet_id = ?1"),
                params![fleet_id],
                fleet_row,
            )
            .optional()?
            .ok_or_else(|| GameError::NotFound { kind: "fleet", id: fleet_id.to_string() })?;
        Fleet::try_from(row)
    }

    pub fn fleet_count(&self, state: FleetState) -> GameResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM fleet WHERE state = ?1",
            params![state.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Move a queued fleet into flight. The ETA keeps its flight duration
    /// and is re-anchored to `now`. Returns false if it was not queued.
    pub fn launch_fleet(&self, fleet_id: &str, now: Timestamp) -> GameResult<bool> {
        let now_ms = to_millis(now);
        let changed = self.conn.execute(
            "UPDATE fleet
             SET state = 'travelling',
                 eta = ?1 + (eta - departed_at),
                 departed_at = ?1,
                 version = version + 1
             WHERE fleet_id = ?2 AND state = 'queued'",
            params![now_ms, fleet_id],
        )?;
        Ok(changed == 1)
    }

    /// Recall a travelling fleet. Terminal for the tick core: a recalled
    /// fleet never arrives. Returns false if the fleet was not travelling.
    pub fn recall_fleet(&self, fleet_id: &str) -> GameResult<bool> {
        let changed = self.conn.execute(
            "UPDATE fleet SET state = 'recalled', version = version + 1
             WHERE fleet_id = ?1 AND state = 'travelling'",
            params![fleet_id],
        )?;
        if changed == 0 {
            // Distinguish "no such fleet" from "wrong state".
            self.fleet(fleet_id)?;
        }
        Ok(changed == 1)
    }
}
