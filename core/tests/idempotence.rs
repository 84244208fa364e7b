//! Re-running a tick at (almost) the same instant must change nothing.

use starlane_core::{
    clock::{GameClock, ManualClock},
    combat::RecordingHook,
    config::TickConfig,
    engine::TickEngine,
    fleet::{Fleet, FleetState, MissionKind, ShipType},
    planet::Planet,
    resources::{Building, Stockpile},
    store::SimStore,
    types::from_millis,
};
use chrono::Duration;
use std::collections::BTreeMap;

fn build(clock: &ManualClock, hook: RecordingHook) -> (TickEngine<SimStore>, Planet, Fleet) {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let engine = TickEngine::new(store, clock.clone(), TickConfig::default())
        .expect("engine")
        .with_hook(hook);

    let planet = Planet::colonize("u-1", "Planet A", (1, 1, 1), clock.now())
        .with_building(Building::MetalMine, 5)
        .with_stockpile(Stockpile::new(1000.0, 0.0, 0.0));
    let other = Planet::colonize("u-1", "Planet B", (1, 1, 5), clock.now());
    engine.store().insert_planet(&planet).unwrap();
    engine.store().insert_planet(&other).unwrap();

    let mut fleet = Fleet::dispatch(
        &planet,
        &other,
        BTreeMap::from([(ShipType::SmallCargo, 1)]),
        MissionKind::Deploy,
        clock.now(),
        &engine.config().fleet,
    )
    .unwrap();
    fleet.eta = from_millis(300_000);
    fleet.remaining_ms = 300_000;
    engine.store().insert_fleet(&fleet).unwrap();
    (engine, planet, fleet)
}

#[test]
fn immediate_rerun_is_a_noop() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let (mut engine, planet, fleet) = build(&clock, hook.clone());

    clock.set_secs(300);
    let first = engine.run_tick().unwrap();
    assert_eq!(first.fleets_arrived, 1);
    let after_first = engine.store().planet(&planet.planet_id).unwrap();

    let second = engine.run_tick().unwrap();
    assert!(second.is_noop(), "second tick wrote state: {second:?}");
    assert_eq!(second.tick, 2, "the no-op run is still logged");

    let after_second = engine.store().planet(&planet.planet_id).unwrap();
    assert_eq!(after_second, after_first);
    assert_eq!(after_second.stockpile.metal, 1030.0);
    assert_eq!(hook.calls_for(&fleet.fleet_id), 1);
}

/// Within min_elapsed_ms nothing is written, and the skipped time is not
/// lost: it is credited by the next real tick.
#[test]
fn near_zero_elapsed_defers_instead_of_dropping() {
    let clock = ManualClock::at_epoch();
    let (mut engine, planet, fleet) = build(&clock, RecordingHook::new());

    clock.set_secs(100);
    engine.run_tick().unwrap();
    let before = engine.store().planet(&planet.planet_id).unwrap();

    clock.advance(Duration::milliseconds(400));
    let log = engine.run_tick().unwrap();
    assert_eq!(log.planets_updated, 0);
    let unchanged = engine.store().planet(&planet.planet_id).unwrap();
    assert_eq!(unchanged.stockpile, before.stockpile);
    assert_eq!(unchanged.last_tick_at, before.last_tick_at);
    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Travelling);

    clock.set_secs(200);
    engine.run_tick().unwrap();
    let later = engine.store().planet(&planet.planet_id).unwrap();
    assert!((later.stockpile.metal - 1020.0).abs() < 1e-9, "got {}", later.stockpile.metal);
}
