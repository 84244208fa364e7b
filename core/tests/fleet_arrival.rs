//! Fleet movement tests, phase: arrival processing.
//!
//! Tests cover: ETA countdown, exactly-once arrival and hook invocation,
//! recalled fleets, corrupt fleet rows, and hook retries through the
//! arrival outbox.

use starlane_core::{
    clock::{GameClock, ManualClock},
    combat::{Arrival, ArrivalHook, RecordingHook},
    config::TickConfig,
    engine::TickEngine,
    error::{GameError, GameResult},
    fleet::{Fleet, FleetState, MissionKind, ShipType},
    planet::Planet,
    store::SimStore,
    types::from_millis,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

fn build(clock: &ManualClock, hook: impl ArrivalHook + 'static) -> TickEngine<SimStore> {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    TickEngine::new(store, clock.clone(), TickConfig::default())
        .expect("engine")
        .with_hook(hook)
}

/// Two planets and one attack fleet departing at t=0 with the given ETA.
fn launch(engine: &TickEngine<SimStore>, clock: &ManualClock, eta_secs: i64) -> Fleet {
    let home = Planet::colonize("u-1", "Home", (1, 1, 1), clock.now());
    let target = Planet::colonize("u-2", "Target", (1, 1, 8), clock.now());
    engine.store().insert_planet(&home).unwrap();
    engine.store().insert_planet(&target).unwrap();

    let mut fleet = Fleet::dispatch(
        &home,
        &target,
        BTreeMap::from([(ShipType::LightFighter, 12)]),
        MissionKind::Attack,
        clock.now(),
        &engine.config().fleet,
    )
    .unwrap();
    fleet.eta = from_millis(eta_secs * 1_000);
    fleet.remaining_ms = (eta_secs * 1_000) as u64;
    engine.store().insert_fleet(&fleet).unwrap();
    fleet
}

/// Fleet F: departs t=0, ETA t=600. t=300 → travelling with 300 s left;
/// t=650 → arrived, hook once; t=900 → no second call.
#[test]
fn fleet_arrives_once_and_hook_fires_once() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let mut engine = build(&clock, hook.clone());
    let fleet = launch(&engine, &clock, 600);

    clock.set_secs(300);
    let log = engine.run_tick().unwrap();
    let f = engine.store().fleet(&fleet.fleet_id).unwrap();
    assert_eq!(f.state, FleetState::Travelling);
    assert_eq!(f.remaining_ms, 300_000);
    assert_eq!(log.fleets_advanced, 1);
    assert_eq!(hook.calls_for(&fleet.fleet_id), 0);

    clock.set_secs(650);
    let log = engine.run_tick().unwrap();
    let f = engine.store().fleet(&fleet.fleet_id).unwrap();
    assert_eq!(f.state, FleetState::Arrived);
    assert_eq!(f.remaining_ms, 0);
    assert_eq!(f.arrived_at, Some(from_millis(600_000)), "landing time is the ETA");
    assert_eq!(f.eta, fleet.eta, "ETA must never move");
    assert_eq!(log.fleets_arrived, 1);
    assert_eq!(hook.calls_for(&fleet.fleet_id), 1);

    clock.set_secs(900);
    let log = engine.run_tick().unwrap();
    assert_eq!(log.fleets_arrived, 0);
    assert_eq!(hook.calls_for(&fleet.fleet_id), 1);
    assert_eq!(engine.store().arrival_count().unwrap(), 1);
    assert_eq!(engine.store().unresolved_arrival_count().unwrap(), 0);
}

/// Crossing the ETA inside one long tick arrives exactly once as well.
#[test]
fn single_tick_crossing_arrives_once() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let mut engine = build(&clock, hook.clone());
    let fleet = launch(&engine, &clock, 600);

    clock.set_secs(5_000);
    engine.run_tick().unwrap();
    clock.set_secs(5_300);
    engine.run_tick().unwrap();

    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Arrived);
    assert_eq!(hook.total_calls(), 1);
}

/// Arriving exactly at the ETA counts as arrived.
#[test]
fn arrival_at_exact_eta() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let mut engine = build(&clock, hook.clone());
    let fleet = launch(&engine, &clock, 600);

    clock.set_secs(600);
    engine.run_tick().unwrap();
    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Arrived);
    assert_eq!(hook.calls_for(&fleet.fleet_id), 1);
}

/// A recalled fleet never arrives, even long after its original ETA.
#[test]
fn recalled_fleet_never_arrives() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let mut engine = build(&clock, hook.clone());
    let fleet = launch(&engine, &clock, 600);

    clock.set_secs(100);
    engine.run_tick().unwrap();
    assert!(engine.store().recall_fleet(&fleet.fleet_id).unwrap());

    clock.set_secs(1_000);
    let log = engine.run_tick().unwrap();

    assert_eq!(log.fleets_arrived, 0);
    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Recalled);
    assert_eq!(hook.total_calls(), 0);
    assert_eq!(engine.store().arrival_count().unwrap(), 0);
}

/// Recall lands between the tick's read and its write: the stale arrival
/// is rejected by the version check.
#[test]
fn recall_racing_a_tick_wins() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let mut engine = build(&clock, hook.clone());
    let fleet = launch(&engine, &clock, 600);

    clock.set_secs(700);
    let plan = engine.plan_tick().unwrap();
    assert_eq!(plan.batch.fleets.len(), 1);
    assert!(engine.store().recall_fleet(&fleet.fleet_id).unwrap());

    let log = engine.commit_plan(plan).unwrap();
    assert_eq!(log.fleets_arrived, 0);
    assert_eq!(log.conflicts, 1);
    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Recalled);
    assert_eq!(hook.total_calls(), 0);
}

/// Queued fleets are not the engine's to move.
#[test]
fn queued_fleet_is_left_alone_until_launched() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let mut engine = build(&clock, hook.clone());
    let home = Planet::colonize("u-1", "Home", (1, 1, 1), clock.now());
    let target = Planet::colonize("u-1", "Moon", (1, 1, 2), clock.now());
    engine.store().insert_planet(&home).unwrap();
    engine.store().insert_planet(&target).unwrap();
    let fleet = Fleet::dispatch(
        &home,
        &target,
        BTreeMap::from([(ShipType::SmallCargo, 2)]),
        MissionKind::Transport,
        clock.now(),
        &engine.config().fleet,
    )
    .unwrap()
    .queued();
    engine.store().insert_fleet(&fleet).unwrap();
    let flight = fleet.eta - fleet.departed_at;

    clock.set_secs(10_000);
    engine.run_tick().unwrap();
    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Queued);

    assert!(engine.store().launch_fleet(&fleet.fleet_id, clock.now()).unwrap());
    let launched = engine.store().fleet(&fleet.fleet_id).unwrap();
    assert_eq!(launched.eta - launched.departed_at, flight);

    clock.set_secs(10_000 + flight.num_seconds() + 1);
    engine.run_tick().unwrap();
    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Arrived);
    assert_eq!(hook.total_calls(), 1);
}

/// Fails the first `failures` calls, then succeeds.
#[derive(Clone)]
struct FlakyHook {
    failures:  u32,
    attempts:  Arc<Mutex<u32>>,
    successes: Arc<Mutex<u32>>,
}

impl ArrivalHook for FlakyHook {
    fn on_fleet_arrival(&self, arrival: &Arrival) -> GameResult<()> {
        let mut attempts = self.attempts.lock().unwrap();
        *attempts += 1;
        if *attempts <= self.failures {
            return Err(GameError::Other(anyhow::anyhow!(
                "combat service unavailable for {}",
                arrival.fleet_id
            )));
        }
        *self.successes.lock().unwrap() += 1;
        Ok(())
    }
}

/// A hook failure leaves the arrival in the outbox; the next tick retries
/// it and the fleet itself is not arrived a second time.
#[test]
fn failed_hook_is_retried_from_outbox() {
    let clock = ManualClock::at_epoch();
    let hook = FlakyHook {
        failures:  1,
        attempts:  Arc::new(Mutex::new(0)),
        successes: Arc::new(Mutex::new(0)),
    };
    let mut engine = build(&clock, hook.clone());
    let fleet = launch(&engine, &clock, 600);

    clock.set_secs(650);
    let log = engine.run_tick().unwrap();
    assert_eq!(log.fleets_arrived, 1);
    assert_eq!(engine.store().unresolved_arrival_count().unwrap(), 1);
    assert_eq!(*hook.successes.lock().unwrap(), 0);

    clock.set_secs(950);
    let log = engine.run_tick().unwrap();
    assert_eq!(log.fleets_arrived, 0);
    assert_eq!(engine.store().unresolved_arrival_count().unwrap(), 0);
    assert_eq!(*hook.successes.lock().unwrap(), 1);
    assert_eq!(*hook.attempts.lock().unwrap(), 2);
    assert_eq!(engine.store().fleet(&fleet.fleet_id).unwrap().state, FleetState::Arrived);
}

/// Corrupt travelling fleets are skipped and counted; the healthy fleet in
/// the same tick still lands.
#[test]
fn corrupt_fleet_rows_are_skipped_not_fatal() {
    let clock = ManualClock::at_epoch();
    let hook = RecordingHook::new();
    let mut engine = build(&clock, hook.clone());
    let good = launch(&engine, &clock, 600);
    let garbled = launch(&engine, &clock, 600);
    let unknown_mission = launch(&engine, &clock, 600);
    let time_travel = launch(&engine, &clock, 600);

    let corrupt = [
        ("ships_json = 'not json'", &garbled),
        ("mission = 'boarding'", &unknown_mission),
        ("eta = -1", &time_travel),
    ];
    for (set, fleet) in corrupt {
        engine
            .store()
            .execute_script(&format!(
                "UPDATE fleet SET {set} WHERE fleet_id = '{}'",
                fleet.fleet_id
            ))
            .unwrap();
    }

    clock.set_secs(650);
    let log = engine.run_tick().unwrap();

    assert_eq!(log.records_skipped, 3);
    assert_eq!(log.fleets_arrived, 1);
    assert_eq!(hook.total_calls(), 1);
    assert_eq!(hook.calls_for(&good.fleet_id), 1);
    assert_eq!(engine.store().fleet(&good.fleet_id).unwrap().state, FleetState::Arrived);
    assert_eq!(engine.store().fleet_count(FleetState::Travelling).unwrap(), 3);
}

/// An outbox row whose mission no longer parses is never handed to the
/// hook as some other mission, and does not stop the tick.
#[test]
fn unreadable_outbox_row_is_held_back() {
    let clock = ManualClock::at_epoch();
    let hook = FlakyHook {
        failures:  1,
        attempts:  Arc::new(Mutex::new(0)),
        successes: Arc::new(Mutex::new(0)),
    };
    let mut engine = build(&clock, hook.clone());
    let fleet = launch(&engine, &clock, 600);

    clock.set_secs(650);
    engine.run_tick().unwrap();
    assert_eq!(engine.store().unresolved_arrival_count().unwrap(), 1);

    engine
        .store()
        .execute_script(&format!(
            "UPDATE arrival SET mission = 'boarding' WHERE fleet_id = '{}'",
            fleet.fleet_id
        ))
        .unwrap();

    clock.set_secs(950);
    let log = engine.run_tick().unwrap();
    assert_eq!(log.tick, 2);
    assert_eq!(*hook.attempts.lock().unwrap(), 1);
    assert_eq!(*hook.successes.lock().unwrap(), 0);
    assert_eq!(engine.store().unresolved_arrival_count().unwrap(), 1);
}
