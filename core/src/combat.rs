//! Fleet arrival hook: the extension point for combat resolution.
//!
//! Arrivals are written to an outbox in the same transaction that marks
//! the fleet arrived. The engine calls the hook from the outbox after
//! commit, then marks the row resolved, so each arrival reaches the hook
//! once even when a tick fails or the process restarts in between.

use crate::{
    error::GameResult,
    fleet::MissionKind,
    types::{FleetId, PlanetId, TickNumber, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Arrival {
    pub arrival_id:     Option<i64>,
    pub fleet_id:       FleetId,
    pub destination_id: PlanetId,
    pub mission:        MissionKind,
    pub tick:           TickNumber,
    pub arrived_at:     Timestamp,
}

pub trait ArrivalHook: Send {
    fn on_fleet_arrival(&self, arrival: &Arrival) -> GameResult<()>;
}

/// Combat is not resolved yet. Arrivals are logged and otherwise ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatPlaceholder;

impl ArrivalHook for CombatPlaceholder {
    fn on_fleet_arrival(&self, arrival: &Arrival) -> GameResult<()> {
        log::info!(
            "tick={} fleet {} arrived at {} ({}); combat placeholder",
            arrival.tick,
            arrival.fleet_id,
            arrival.destination_id,
            arrival.mission.as_str()
        );
        Ok(())
    }
}

/// Counts hook calls per fleet. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct RecordingHook {
    calls: Arc<Mutex<HashMap<FleetId, u32>>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls_for(&self, fleet_id: &str) -> u32 {
        self.calls
            .lock()
            .map(|c| c.get(fleet_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().map(|c| c.values().sum()).unwrap_or(0)
    }
}

impl ArrivalHook for RecordingHook {
    fn on_fleet_arrival(&self, arrival: &Arrival) -> GameResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(arrival.fleet_id.clone()).or_insert(0) += 1;
        }
        Ok(())
    }
}
