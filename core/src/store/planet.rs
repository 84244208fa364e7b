//! Store methods for planets.

use super::SimStore;
use crate::{
    error::{GameError, GameResult},
    planet::{Planet, PlanetRow},
    resources::Building,
    types::to_millis,
};
use rusqlite::{params, OptionalExtension, Row};

const PLANET_COLUMNS: &str = "planet_id, owner_id, name, galaxy, system, position,
    metal, crystal, deuterium,
    metal_mine, crystal_mine, deuterium_synthesizer,
    metal_storage, crystal_storage, deuterium_tank,
    last_tick_at, version";

fn planet_row(row: &Row<'_>) -> rusqlite::Result<PlanetRow> {
    Ok(PlanetRow {
        planet_id:             row.get(0)?,
        owner_id:              row.get(1)?,
        name:                  row.get(2)?,
        galaxy:                row.get(3)?,
        system:                row.get(4)?,
        position:              row.get(5)?,
        metal:                 row.get(6)?,
        crystal:               row.get(7)?,
        deuterium:             row.get(8)?,
        metal_mine:            row.get(9)?,
        crystal_mine:          row.get(10)?,
        deuterium_synthesizer: row.get(11)?,
        metal_storage:         row.get(12)?,
        crystal_storage:       row.get(13)?,
        deuterium_tank:        row.get(14)?,
        last_tick_at:          row.get(15)?,
        version:               row.get(16)?,
    })
}

impl SimStore {
    // ── Planet ────────────────────────────────────────────────────

    pub fn insert_planet(&self, p: &Planet) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO planet (
                planet_id, owner_id, name, galaxy, system, position,
                metal, crystal, deuterium,
                metal_mine, crystal_mine, deuterium_synthesizer,
                metal_storage, crystal_storage, deuterium_tank,
                last_tick_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                &p.planet_id,
                &p.owner_id,
                &p.name,
                p.galaxy,
                p.system,
                p.position,
                p.stockpile.metal,
                p.stockpile.crystal,
                p.stockpile.deuterium,
                p.buildings.metal_mine,
                p.buildings.crystal_mine,
                p.buildings.deuterium_synthesizer,
                p.buildings.metal_storage,
                p.buildings.crystal_storage,
                p.buildings.deuterium_tank,
                to_millis(p.last_tick_at),
                p.version,
            ],
        )?;
        Ok(())
    }

    pub(super) fn all_planet_rows(&self) -> GameResult<Vec<PlanetRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLANET_COLUMNS} FROM planet ORDER BY planet_id ASC"
        ))?;
        let rows = stmt.query_map([], planet_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn planet(&self, planet_id: &str) -> GameResult<Planet> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PLANET_COLUMNS} FROM planet WHERE planet_id = ?1"),
                params![planet_id],
                planet_row,
            )
            .optional()?
            .ok_or_else(|| GameError::NotFound { kind: "planet", id: planet_id.to_string() })?;
        Planet::try_from(row)
    }

    pub fn planet_count(&self) -> GameResult<i64> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM planet", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Raise one building by a level. Bumps the planet's version so a tick
    /// that read the old row cannot overwrite it. Returns the new level.
    pub fn upgrade_building(&self, planet_id: &str, building: Building) -> GameResult<u32> {
        // Column name comes from a closed enum, never from input.
        let column = building.as_str();
        let changed = self.conn.execute(
            &format!(
                "UPDATE planet SET {column} = {column} + 1, version = version + 1
                 WHERE planet_id = ?1"
            ),
            params![planet_id],
        )?;
        if changed == 0 {
            return Err(GameError::NotFound { kind: "planet", id: planet_id.to_string() });
        }
        let level: u32 = self.conn.query_row(
            &format!("SELECT {column} FROM planet WHERE planet_id = ?1"),
            params![planet_id],
            |row| row.get(0),
        )?;
        Ok(level)
    }
}
