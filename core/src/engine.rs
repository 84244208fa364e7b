//! The tick engine: one consistent advancement step over the galaxy.
//!
//! TICK ORDER (fixed, documented, never reordered):
//!   1. Drain arrivals left unresolved by an earlier tick.
//!   2. Read a snapshot: all planets, all travelling fleets.
//!   3. Credit production for the time elapsed since each planet's
//!      last_tick_at.
//!   4. Advance fleets; fleets at or past their ETA arrive.
//!   5. Commit planets, fleets, arrival outbox and TickLog in one
//!      transaction.
//!   6. Hand this tick's arrivals to the arrival hook.
//!
//! RULES:
//!   - Advancement is computed from elapsed wall-clock time, never from
//!     "a tick happened". Running twice at the same instant is a no-op.
//!   - A record that fails validation is skipped, not fatal.
//!   - A failed commit applies nothing and is recorded as a TickFailure.

use crate::{
    clock::GameClock,
    combat::{Arrival, ArrivalHook, CombatPlaceholder},
    config::TickConfig,
    error::GameResult,
    fleet::{Fleet, FleetProgress, FleetState},
    planet::Planet,
    resources::{apply_production, ProductionTable, StorageCap, StorageDepots, Unbounded},
    store::{FleetUpdate, PlanetUpdate, TickBatch, TickStore},
    tick_log::{TickFailure, TickLog},
    types::{elapsed_ms, Timestamp},
};
use std::time::Instant;

/// A computed but not yet committed tick.
#[derive(Debug, Clone)]
pub struct TickPlan {
    pub batch: TickBatch,
    started:   Instant,
}

pub struct TickEngine<S: TickStore> {
    store:      S,
    clock:      Box<dyn GameClock>,
    config:     TickConfig,
    production: ProductionTable,
    storage:    Box<dyn StorageCap>,
    hook:       Box<dyn ArrivalHook>,
    slow_ticks: u64,
}

impl<S: TickStore> TickEngine<S> {
    /// Engine with the combat placeholder hook and the storage policy
    /// named in `config`.
    pub fn new(store: S, clock: impl GameClock + 'static, config: TickConfig) -> GameResult<Self> {
        config.validate()?;
        let storage: Box<dyn StorageCap> = match config.storage {
            Some(storage) => Box::new(StorageDepots::from(storage)),
            None => Box::new(Unbounded),
        };
        Ok(Self {
            production: ProductionTable::new(config.production.clone()),
            clock: Box::new(clock),
            hook: Box::new(CombatPlaceholder),
            slow_ticks: 0,
            storage,
            config,
            store,
        })
    }

    pub fn with_hook(mut self, hook: impl ArrivalHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn with_storage_cap(mut self, cap: impl StorageCap + 'static) -> Self {
        self.storage = Box::new(cap);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Successful ticks that overran `slow_tick_budget_ms` since startup.
    pub fn slow_tick_count(&self) -> u64 {
        self.slow_ticks
    }

    /// Execute one full tick. This is the single entry point for both the
    /// scheduled and the manual trigger.
    pub fn run_tick(&mut self) -> GameResult<TickLog> {
        let started = Instant::now();
        match self.try_tick() {
            Ok(log) => {
                let took = started.elapsed();
                if took > self.config.slow_tick_budget() {
                    self.slow_ticks += 1;
                    log::warn!(
                        "tick={} slow: took {}ms (budget {}ms)",
                        log.tick,
                        took.as_millis(),
                        self.config.slow_tick_budget_ms
                    );
                }
                Ok(log)
            }
            Err(err) => {
                log::error!("tick failed, nothing applied: {err}");
                let failure = TickFailure {
                    id:           None,
                    attempted_at: self.clock.now(),
                    reason:       err.to_string(),
                };
                if let Err(record_err) = self.store.record_tick_failure(&failure) {
                    log::error!("could not record tick failure: {record_err}");
                }
                Err(err)
            }
        }
    }

    fn try_tick(&mut self) -> GameResult<TickLog> {
        self.drain_pending_arrivals()?;
        let plan = self.plan_tick()?;
        self.commit_plan(plan)
    }

    /// Read a snapshot and compute every update the tick would write.
    pub fn plan_tick(&self) -> GameResult<TickPlan> {
        let started = Instant::now();
        let now = self.clock.now();
        let mut records_skipped = 0u64;

        let mut planets = Vec::new();
        for row in self.store.load_planets()? {
            let planet = match Planet::try_from(row) {
                Ok(p) => p,
                Err(err) => {
                    log::warn!("skipping planet this tick: {err}");
                    records_skipped += 1;
                    continue;
                }
            };
            if let Some(update) = self.plan_planet(&planet, now) {
                planets.push(update);
            }
        }

        let mut fleets = Vec::new();
        for row in self.store.load_travelling_fleets()? {
            let fleet = match Fleet::try_from(row) {
                Ok(f) => f,
                Err(err) => {
                    log::warn!("skipping fleet this tick: {err}");
                    records_skipped += 1;
                    continue;
                }
            };
            if let Some(update) = plan_fleet(&fleet, now) {
                fleets.push(update);
            }
        }

        log::debug!(
            "planned tick at {now}: {} planet updates, {} fleet updates, {records_skipped} skipped",
            planets.len(),
            fleets.len()
        );

        Ok(TickPlan {
            batch: TickBatch {
                executed_at: now,
                planets,
                fleets,
                records_skipped,
                duration_ms: 0,
            },
            started,
        })
    }

    /// Write a plan back and fire the arrival hook for what landed.
    pub fn commit_plan(&mut self, mut plan: TickPlan) -> GameResult<TickLog> {
        plan.batch.duration_ms = plan.started.elapsed().as_millis() as u64;
        let report = self.store.commit_tick(&plan.batch)?;

        if !report.conflicts.is_empty() {
            log::warn!(
                "tick={} {} record(s) changed during the tick and were left for the next one: {:?}",
                report.tick_log.tick,
                report.conflicts.len(),
                report.conflicts
            );
        }

        self.fire_arrivals(&report.arrivals);

        let log = &report.tick_log;
        log::info!(
            "tick={} planets={} fleets_advanced={} fleets_arrived={} skipped={} conflicts={}",
            log.tick,
            log.planets_updated,
            log.fleets_advanced,
            log.fleets_arrived,
            log.records_skipped,
            log.conflicts
        );
        Ok(report.tick_log)
    }

    fn plan_planet(&self, planet: &Planet, now: Timestamp) -> Option<PlanetUpdate> {
        let elapsed = elapsed_ms(planet.last_tick_at, now);
        // Too soon: leave last_tick_at alone so the time keeps accruing.
        if elapsed == 0 || elapsed < self.config.min_elapsed_ms {
            return None;
        }
        let stockpile = apply_production(
            &planet.stockpile,
            &planet.buildings,
            elapsed,
            self.config.interval_ms(),
            &self.production,
            &*self.storage,
        );
        Some(PlanetUpdate {
            planet_id:        planet.planet_id.clone(),
            expected_version: planet.version,
            stockpile,
            last_tick_at:     now,
        })
    }

    /// Retry hook calls that did not complete in an earlier tick.
    fn drain_pending_arrivals(&mut self) -> GameResult<()> {
        let pending = self.store.pending_arrivals()?;
        if !pending.is_empty() {
            log::info!("resolving {} arrival(s) left by an earlier tick", pending.len());
            self.fire_arrivals(&pending);
        }
        Ok(())
    }

    fn fire_arrivals(&mut self, arrivals: &[Arrival]) {
        for arrival in arrivals {
            let Some(arrival_id) = arrival.arrival_id else { continue };
            if let Err(err) = self.hook.on_fleet_arrival(arrival) {
                log::warn!(
                    "arrival hook failed for fleet {}; will retry next tick: {err}",
                    arrival.fleet_id
                );
                continue;
            }
            if let Err(err) = self.store.resolve_arrival(arrival_id, self.clock.now()) {
                log::error!("could not mark arrival {arrival_id} resolved: {err}");
            }
        }
    }
}

fn plan_fleet(fleet: &Fleet, now: Timestamp) -> Option<FleetUpdate> {
    let update = |state: FleetState, remaining_ms: u64, arrived_at: Option<Timestamp>| FleetUpdate {
        fleet_id:         fleet.fleet_id.clone(),
        expected_version: fleet.version,
        state,
        remaining_ms,
        arrived_at,
        destination_id:   fleet.destination_id.clone(),
        mission:          fleet.mission,
    };
    match fleet.progress(now)? {
        // Landing time is the ETA itself, however late the tick runs.
        FleetProgress::Arrived => Some(update(FleetState::Arrived, 0, Some(fleet.eta))),
        FleetProgress::Travelling { remaining_ms } if remaining_ms != fleet.remaining_ms => {
            Some(update(FleetState::Travelling, remaining_ms, None))
        }
        FleetProgress::Travelling { .. } => None,
    }
}
