//! Planet records as the tick core sees them.

use crate::{
    error::{GameError, GameResult},
    resources::{Building, BuildingLevels, Stockpile},
    types::{from_millis, new_id, PlanetId, Timestamp, UserId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Planet {
    pub planet_id:    PlanetId,
    pub owner_id:     UserId,
    pub name:         String,
    /// Galaxy coordinates, used for fleet travel distance.
    pub galaxy:       u32,
    pub system:       u32,
    pub position:     u32,
    pub stockpile:    Stockpile,
    pub buildings:    BuildingLevels,
    /// Production has been credited up to this instant.
    pub last_tick_at: Timestamp,
    pub version:      i64,
}

impl Planet {
    /// A freshly colonized planet. Production starts accruing at `now`.
    pub fn colonize(
        owner_id: &str,
        name:     &str,
        coords:   (u32, u32, u32),
        now:      Timestamp,
    ) -> Self {
        Self {
            planet_id:    new_id("planet"),
            owner_id:     owner_id.to_string(),
            name:         name.to_string(),
            galaxy:       coords.0,
            system:       coords.1,
            position:     coords.2,
            stockpile:    Stockpile::new(500.0, 500.0, 0.0),
            buildings:    BuildingLevels::default(),
            last_tick_at: now,
            version:      0,
        }
    }

    pub fn with_building(mut self, building: Building, level: u32) -> Self {
        *self.buildings.level_mut(building) = level;
        self
    }

    pub fn with_stockpile(mut self, stockpile: Stockpile) -> Self {
        self.stockpile = stockpile;
        self
    }

    pub fn coords(&self) -> (u32, u32, u32) {
        (self.galaxy, self.system, self.position)
    }
}

/// Raw planet row as read from the store. Levels are signed here because
/// the column type allows it; `Planet::try_from` rejects bad rows.
#[derive(Debug, Clone)]
pub struct PlanetRow {
    pub planet_id:             String,
    pub owner_id:              String,
    pub name:                  String,
    pub galaxy:                i64,
    pub system:                i64,
    pub position:              i64,
    pub metal:                 f64,
    pub crystal:               f64,
    pub deuterium:             f64,
    pub metal_mine:            i64,
    pub crystal_mine:          i64,
    pub deuterium_synthesizer: i64,
    pub metal_storage:         i64,
    pub crystal_storage:       i64,
    pub deuterium_tank:        i64,
    pub last_tick_at:          i64,
    pub version:               i64,
}

fn level(row: &PlanetRow, name: &str, value: i64) -> GameResult<u32> {
    u32::try_from(value).map_err(|_| {
        GameError::invalid("planet", &row.planet_id, format!("{name} level {value} out of range"))
    })
}

fn coord(row: &PlanetRow, name: &str, value: i64) -> GameResult<u32> {
    u32::try_from(value).map_err(|_| {
        GameError::invalid("planet", &row.planet_id, format!("{name} coordinate {value} out of range"))
    })
}

impl TryFrom<PlanetRow> for Planet {
    type Error = GameError;

    fn try_from(row: PlanetRow) -> GameResult<Self> {
        let buildings = BuildingLevels {
            metal_mine:            level(&row, "metal_mine", row.metal_mine)?,
            crystal_mine:          level(&row, "crystal_mine", row.crystal_mine)?,
            deuterium_synthesizer: level(&row, "deuterium_synthesizer", row.deuterium_synthesizer)?,
            metal_storage:         level(&row, "metal_storage", row.metal_storage)?,
            crystal_storage:       level(&row, "crystal_storage", row.crystal_storage)?,
            deuterium_tank:        level(&row, "deuterium_tank", row.deuterium_tank)?,
        };
        let stockpile = Stockpile::new(row.metal, row.crystal, row.deuterium);
        if !stockpile.is_valid() {
            return Err(GameError::invalid(
                "planet",
                &row.planet_id,
                format!("stockpile {stockpile:?} is negative or not finite"),
            ));
        }
        let (galaxy, system, position) = (
            coord(&row, "galaxy", row.galaxy)?,
            coord(&row, "system", row.system)?,
            coord(&row, "position", row.position)?,
        );
        Ok(Planet {
            galaxy,
            system,
            position,
            last_tick_at: from_millis(row.last_tick_at),
            planet_id:    row.planet_id,
            owner_id:     row.owner_id,
            name:         row.name,
            version:      row.version,
            stockpile,
            buildings,
        })
    }
}
