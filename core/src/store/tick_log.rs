//! Store methods for the tick log, failure log and arrival outbox.

use super::SimStore;
use crate::{
    combat::Arrival,
    error::GameResult,
    fleet::MissionKind,
    tick_log::{TickFailure, TickLog},
    types::{from_millis, to_millis, Timestamp},
};
use rusqlite::{params, types::Type, OptionalExtension, Row};

fn tick_log_row(row: &Row<'_>) -> rusqlite::Result<TickLog> {
    Ok(TickLog {
        id:              Some(row.get(0)?),
        tick:            row.get::<_, i64>(1)? as u64,
        executed_at:     from_millis(row.get(2)?),
        planets_updated: row.get::<_, i64>(3)? as u64,
        fleets_advanced: row.get::<_, i64>(4)? as u64,
        fleets_arrived:  row.get::<_, i64>(5)? as u64,
        records_skipped: row.get::<_, i64>(6)? as u64,
        conflicts:       row.get::<_, i64>(7)? as u64,
        duration_ms:     row.get::<_, i64>(8)? as u64,
    })
}

fn arrival_row(row: &Row<'_>) -> rusqlite::Result<Arrival> {
    let mission: String = row.get(3)?;
    let mission = MissionKind::parse(&mission).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown mission '{mission}'").into(),
        )
    })?;
    Ok(Arrival {
        arrival_id:     Some(row.get(0)?),
        fleet_id:       row.get(1)?,
        destination_id: row.get(2)?,
        mission,
        tick:           row.get::<_, i64>(4)? as u64,
        arrived_at:     from_millis(row.get(5)?),
    })
}

impl SimStore {
    // ── Tick log ──────────────────────────────────────────────────

    pub fn latest_tick_log(&self) -> GameResult<Option<TickLog>> {
        let log = self
            .conn
            .query_row(
                "SELECT id, tick, executed_at, planets_updated, fleets_advanced,
                        fleets_arrived, records_skipped, conflicts, duration_ms
                 FROM tick_log ORDER BY id DESC LIMIT 1",
                [],
                tick_log_row,
            )
            .optional()?;
        Ok(log)
    }

    /// Tick logs with id greater than `after_id`, oldest first.
    /// Readers tail the log by passing the last id they saw.
    pub fn tick_logs_since(&self, after_id: i64, limit: usize) -> GameResult<Vec<TickLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tick, executed_at, planets_updated, fleets_advanced,
                    fleets_arrived, records_skipped, conflicts, duration_ms
             FROM tick_log WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![after_id, limit as i64], tick_log_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn tick_log_count(&self) -> GameResult<i64> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM tick_log", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Failure log ───────────────────────────────────────────────

    pub(super) fn insert_tick_failure(&self, failure: &TickFailure) -> GameResult<i64> {
        self.conn.execute(
            "INSERT INTO tick_failure (attempted_at, reason) VALUES (?1, ?2)",
            params![to_millis(failure.attempted_at), &failure.reason],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn tick_failures(&self) -> GameResult<Vec<TickFailure>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, attempted_at, reason FROM tick_failure ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TickFailure {
                id:           Some(row.get(0)?),
                attempted_at: from_millis(row.get(1)?),
                reason:       row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Arrival outbox ────────────────────────────────────────────

    /// Corrupt rows stay unresolved and are left out, so a bad row never
    /// reaches the hook and never blocks the rest of the outbox.
    pub(super) fn unresolved_arrivals(&self) -> GameResult<Vec<Arrival>> {
        let mut stmt = self.conn.prepare(
            "SELECT arrival_id, fleet_id, destination_id, mission, tick, arrived_at
             FROM arrival WHERE resolved_at IS NULL ORDER BY arrival_id ASC",
        )?;
        let mut arrivals = Vec::new();
        for row in stmt.query_map([], arrival_row)? {
            match row {
                Ok(arrival) => arrivals.push(arrival),
                Err(err @ rusqlite::Error::FromSqlConversionFailure(..)) => {
                    log::warn!("skipping unreadable arrival in the outbox: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(arrivals)
    }

    pub(super) fn mark_arrival_resolved(&self, arrival_id: i64, at: Timestamp) -> GameResult<()> {
        self.conn.execute(
            "UPDATE arrival SET resolved_at = ?1 WHERE arrival_id = ?2 AND resolved_at IS NULL",
            params![to_millis(at), arrival_id],
        )?;
        Ok(())
    }

    pub fn arrival_count(&self) -> GameResult<i64> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM arrival", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn unresolved_arrival_count(&self) -> GameResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM arrival WHERE resolved_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
