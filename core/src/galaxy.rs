//! Seeded galaxy generation for the runner and for tests.
//!
//! Stands in for the external colonize/dispatch operations: it writes
//! planets and fleets through the same store methods those would use.

use crate::{
    config::FleetConfig,
    error::GameResult,
    fleet::{Fleet, MissionKind, ShipType},
    name_generator::NameGenerator,
    planet::Planet,
    resources::{Building, Stockpile},
    rng::{RngBank, SeedSlot},
    store::SimStore,
    types::Timestamp,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct GalaxySpec {
    pub seed:               u64,
    pub players:            usize,
    pub planets_per_player: usize,
    /// Fleets dispatched per player at seeding time.
    pub fleets_per_player:  usize,
}

impl Default for GalaxySpec {
    fn default() -> Self {
        Self { seed: 42, players: 4, planets_per_player: 3, fleets_per_player: 2 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeededGalaxy {
    pub planets: Vec<Planet>,
    pub fleets:  Vec<Fleet>,
}

/// Populate `store` with a deterministic galaxy. Ids are random, layout
/// and levels are a pure function of `layout.seed`.
pub fn seed_galaxy(
    store:  &SimStore,
    layout: &GalaxySpec,
    now:    Timestamp,
    fleet:  &FleetConfig,
) -> GameResult<SeededGalaxy> {
    let bank = RngBank::new(layout.seed);
    let mut planet_rng = bank.stream(SeedSlot::Planets);
    let mut building_rng = bank.stream(SeedSlot::Buildings);
    let mut fleet_rng = bank.stream(SeedSlot::Fleets);

    let mut galaxy = SeededGalaxy::default();
    for _ in 0..layout.players {
        let owner = NameGenerator::commander_name(&mut planet_rng);
        for _ in 0..layout.planets_per_player {
            let coords = (
                planet_rng.range_u32(1, 3),
                planet_rng.range_u32(1, 499),
                planet_rng.range_u32(1, 15),
            );
            let name = NameGenerator::planet_name(&mut planet_rng);
            let planet = Planet::colonize(&owner, &name, coords, now)
                .with_building(Building::MetalMine, building_rng.range_u32(1, 12))
                .with_building(Building::CrystalMine, building_rng.range_u32(0, 10))
                .with_building(Building::DeuteriumSynthesizer, building_rng.range_u32(0, 8))
                .with_building(Building::MetalStorage, building_rng.range_u32(0, 4))
                .with_building(Building::CrystalStorage, building_rng.range_u32(0, 4))
                .with_building(Building::DeuteriumTank, building_rng.range_u32(0, 4))
                .with_stockpile(Stockpile::new(
                    building_rng.range_u32(500, 5_000) as f64,
                    building_rng.range_u32(200, 3_000) as f64,
                    building_rng.range_u32(0, 1_000) as f64,
                ));
            store.insert_planet(&planet)?;
            galaxy.planets.push(planet);
        }
    }

    if galaxy.planets.len() < 2 {
        return Ok(galaxy);
    }
    let missions = [MissionKind::Attack, MissionKind::Transport, MissionKind::Deploy];
    let hulls = [ShipType::SmallCargo, ShipType::LightFighter, ShipType::Cruiser];
    for p in 0..layout.players {
        for _ in 0..layout.fleets_per_player {
            let first = p * layout.planets_per_player;
            let origin = &galaxy.planets[first.min(galaxy.planets.len() - 1)];
            let destination = loop {
                let candidate = fleet_rng.pick(&galaxy.planets);
                if candidate.planet_id != origin.planet_id {
                    break candidate;
                }
            };
            let ships = BTreeMap::from([(
                *fleet_rng.pick(&hulls),
                fleet_rng.range_u32(1, 50) as u64,
            )]);
            let mission = *fleet_rng.pick(&missions);
            let f = Fleet::dispatch(origin, destination, ships, mission, now, fleet)?;
            store.insert_fleet(&f)?;
            galaxy.fleets.push(f);
        }
    }

    log::info!(
        "seeded galaxy {}: {} planets, {} fleets",
        layout.seed,
        galaxy.planets.len(),
        galaxy.fleets.len()
    );
    Ok(galaxy)
}
