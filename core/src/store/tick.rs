//! The tick's write path: one transaction per tick.

use super::{CommitReport, SimStore, TickBatch, TickStore};
use crate::{
    combat::Arrival,
    error::GameResult,
    fleet::{FleetRow, FleetState},
    planet::PlanetRow,
    tick_log::{TickFailure, TickLog},
    types::{to_millis, Timestamp},
};
use rusqlite::params;

impl SimStore {
    fn commit_batch(&self, batch: &TickBatch) -> GameResult<CommitReport> {
        // Dropping the transaction without commit() rolls it back, so every
        // early return below leaves the database exactly as it was.
        let tx = self.conn.unchecked_transaction()?;

        let tick: i64 = tx.query_row(
            "SELECT COALESCE(MAX(tick), 0) + 1 FROM tick_log",
            [],
            |row| row.get(0),
        )?;

        let mut conflicts = Vec::new();
        let mut planets_updated = 0u64;
        for p in &batch.planets {
            let changed = tx.execute(
                "UPDATE planet
                 SET metal = ?1, crystal = ?2, deuterium = ?3,
                     last_tick_at = ?4, version = version + 1
                 WHERE planet_id = ?5 AND version = ?6",
                params![
                    p.stockpile.metal,
                    p.stockpile.crystal,
                    p.stockpile.deuterium,
                    to_millis(p.last_tick_at),
                    &p.planet_id,
                    p.expected_version,
                ],
            )?;
            if changed == 1 {
                planets_updated += 1;
            } else {
                conflicts.push(p.planet_id.clone());
            }
        }

        let mut fleets_advanced = 0u64;
        let mut arrivals = Vec::new();
        for f in &batch.fleets {
            let changed = tx.execute(
                "UPDATE fleet
                 SET state = ?1, remaining_ms = ?2, arrived_at = ?3, version = version + 1
                 WHERE fleet_id = ?4 AND version = ?5 AND state = 'travelling'",
                params![
                    f.state.as_str(),
                    f.remaining_ms as i64,
                    f.arrived_at.map(to_millis),
                    &f.fleet_id,
                    f.expected_version,
                ],
            )?;
            if changed != 1 {
                conflicts.push(f.fleet_id.clone());
                continue;
            }
            match (f.state, f.arrived_at) {
                (FleetState::Arrived, Some(arrived_at)) => {
                    tx.execute(
                        "INSERT INTO arrival (fleet_id, destination_id, mission, tick, arrived_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            &f.fleet_id,
                            &f.destination_id,
                            f.mission.as_str(),
                            tick,
                            to_millis(arrived_at),
                        ],
                    )?;
                    arrivals.push(Arrival {
                        arrival_id:     Some(tx.last_insert_rowid()),
                        fleet_id:       f.fleet_id.clone(),
                        destination_id: f.destination_id.clone(),
                        mission:        f.mission,
                        tick:           tick as u64,
                        arrived_at,
                    });
                }
                _ => fleets_advanced += 1,
            }
        }

        let mut tick_log = TickLog {
            id:              None,
            tick:            tick as u64,
            executed_at:     batch.executed_at,
            planets_updated,
            fleets_advanced,
            fleets_arrived:  arrivals.len() as u64,
            records_skipped: batch.records_skipped,
            conflicts:       conflicts.len() as u64,
            duration_ms:     batch.duration_ms,
        };
        tx.execute(
            "INSERT INTO tick_log (
                tick, executed_at, planets_updated, fleets_advanced, fleets_arrived,
                records_skipped, conflicts, duration_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tick,
                to_millis(tick_log.executed_at),
                tick_log.planets_updated as i64,
                tick_log.fleets_advanced as i64,
                tick_log.fleets_arrived as i64,
                tick_log.records_skipped as i64,
                tick_log.conflicts as i64,
                tick_log.duration_ms as i64,
            ],
        )?;
        tick_log.id = Some(tx.last_insert_rowid());

        tx.commit()?;

        Ok(CommitReport { tick_log, arrivals, conflicts })
    }
}

impl TickStore for SimStore {
    fn load_planets(&self) -> GameResult<Vec<PlanetRow>> {
        self.all_planet_rows()
    }

    fn load_travelling_fleets(&self) -> GameResult<Vec<FleetRow>> {
        self.fleet_rows_in_state(FleetState::Travelling)
    }

    fn commit_tick(&self, batch: &TickBatch) -> GameResult<CommitReport> {
        self.commit_batch(batch)
    }

    fn pending_arrivals(&self) -> GameResult<Vec<Arrival>> {
        self.unresolved_arrivals()
    }

    fn resolve_arrival(&self, arrival_id: i64, at: Timestamp) -> GameResult<()> {
        self.mark_arrival_resolved(arrival_id, at)
    }

    fn record_tick_failure(&self, failure: &TickFailure) -> GameResult<i64> {
        self.insert_tick_failure(failure)
    }
}
