//! Fleet movement tracker.
//!
//! State machine: `queued → travelling → {arrived, recalled}`.
//! The tick engine only ever moves `travelling → arrived`. Dispatch,
//! launch and recall are external operations.

use crate::{
    config::FleetConfig,
    error::{GameError, GameResult},
    planet::Planet,
    types::{elapsed_ms, from_millis, new_id, FleetId, PlanetId, Timestamp, UserId},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShipType {
    SmallCargo,
    LargeCargo,
    LightFighter,
    HeavyFighter,
    Cruiser,
    Battleship,
    ColonyShip,
    Recycler,
    EspionageProbe,
}

impl ShipType {
    /// Base drive speed in distance units per hour-equivalent.
    pub fn speed(&self) -> u64 {
        match self {
            Self::SmallCargo     => 5_000,
            Self::LargeCargo     => 7_500,
            Self::LightFighter   => 12_500,
            Self::HeavyFighter   => 10_000,
            Self::Cruiser        => 15_000,
            Self::Battleship     => 10_000,
            Self::ColonyShip     => 2_500,
            Self::Recycler       => 2_000,
            Self::EspionageProbe => 100_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Attack,
    Transport,
    Deploy,
}

impl MissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack    => "attack",
            Self::Transport => "transport",
            Self::Deploy    => "deploy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attack"    => Some(Self::Attack),
            "transport" => Some(Self::Transport),
            "deploy"    => Some(Self::Deploy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FleetState {
    Queued,
    Travelling,
    Arrived,
    Recalled,
}

impl FleetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued     => "queued",
            Self::Travelling => "travelling",
            Self::Arrived    => "arrived",
            Self::Recalled   => "recalled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued"     => Some(Self::Queued),
            "travelling" => Some(Self::Travelling),
            "arrived"    => Some(Self::Arrived),
            "recalled"   => Some(Self::Recalled),
            _ => None,
        }
    }
}

/// Where a travelling fleet stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetProgress {
    Travelling { remaining_ms: u64 },
    Arrived,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fleet {
    pub fleet_id:       FleetId,
    pub owner_id:       UserId,
    pub origin_id:      PlanetId,
    pub destination_id: PlanetId,
    pub ships:          BTreeMap<ShipType, u64>,
    pub mission:        MissionKind,
    pub state:          FleetState,
    pub departed_at:    Timestamp,
    /// Fixed at dispatch. Nothing in the core moves it.
    pub eta:            Timestamp,
    pub remaining_ms:   u64,
    pub arrived_at:     Option<Timestamp>,
    pub version:        i64,
}

impl Fleet {
    /// Dispatch `ships` from `origin` to `destination`, departing at `now`.
    pub fn dispatch(
        origin:      &Planet,
        destination: &Planet,
        ships:       BTreeMap<ShipType, u64>,
        mission:     MissionKind,
        now:         Timestamp,
        config:      &FleetConfig,
    ) -> GameResult<Self> {
        let fleet_id = new_id("fleet");
        let travel_ms = travel_time_ms(origin.coords(), destination.coords(), &ships, config)
            .ok_or_else(|| GameError::invalid("fleet", &fleet_id, "fleet has no ships"))?;
        let eta = i64::try_from(travel_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|flight| now.checked_add_signed(flight))
            .ok_or_else(|| {
                GameError::invalid("fleet", &fleet_id, format!("travel time {travel_ms}ms out of range"))
            })?;
        Ok(Self {
            fleet_id,
            owner_id:       origin.owner_id.clone(),
            origin_id:      origin.planet_id.clone(),
            destination_id: destination.planet_id.clone(),
            ships,
            mission,
            state:          FleetState::Travelling,
            departed_at:    now,
            eta,
            remaining_ms:   travel_ms,
            arrived_at:     None,
            version:        0,
        })
    }

    /// Hold the fleet on the ground until it is launched.
    pub fn queued(mut self) -> Self {
        self.state = FleetState::Queued;
        self
    }

    /// Progress at `now`, or None if the fleet is not travelling.
    /// Recalled and arrived fleets never report `Arrived` again.
    pub fn progress(&self, now: Timestamp) -> Option<FleetProgress> {
        if self.state != FleetState::Travelling {
            return None;
        }
        if now >= self.eta {
            Some(FleetProgress::Arrived)
        } else {
            Some(FleetProgress::Travelling { remaining_ms: elapsed_ms(now, self.eta) })
        }
    }
}

/// Abstract distance between two coordinates.
pub fn distance(a: (u32, u32, u32), b: (u32, u32, u32)) -> u64 {
    let diff = |x: u32, y: u32| x.abs_diff(y) as u64;
    if a.0 != b.0 {
        20_000 * diff(a.0, b.0)
    } else if a.1 != b.1 {
        2_700 + 95 * diff(a.1, b.1)
    } else if a.2 != b.2 {
        1_000 + 5 * diff(a.2, b.2)
    } else {
        5
    }
}

/// Flight time in ms at the slowest ship's speed. None for an empty fleet.
pub fn travel_time_ms(
    from:   (u32, u32, u32),
    to:     (u32, u32, u32),
    ships:  &BTreeMap<ShipType, u64>,
    config: &FleetConfig,
) -> Option<u64> {
    let slowest = ships
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(ship, _)| ship.speed())
        .min()?;
    let d = distance(from, to) as f64;
    let secs = config.base_travel_secs
        + 3_500.0 * (10.0 * d / slowest as f64).sqrt() / config.universe_speed;
    Some((secs * 1_000.0).round() as u64)
}

/// Raw fleet row as read from the store.
#[derive(Debug, Clone)]
pub struct FleetRow {
    pub fleet_id:       String,
    pub owner_id:       String,
    pub origin_id:      String,
    pub destination_id: String,
    pub ships_json:     String,
    pub mission:        String,
    pub state:          String,
    pub departed_at:    i64,
    pub eta:            i64,
    pub remaining_ms:   i64,
    pub arrived_at:     Option<i64>,
    pub version:        i64,
}

impl TryFrom<FleetRow> for Fleet {
    type Error = GameError;

    fn try_from(row: FleetRow) -> GameResult<Self> {
        let bad = |reason: String| GameError::invalid("fleet", &row.fleet_id, reason);
        let ships: BTreeMap<ShipType, u64> = serde_json::from_str(&row.ships_json)
            .map_err(|e| bad(format!("ship list: {e}")))?;
        let mission = MissionKind::parse(&row.mission)
            .ok_or_else(|| bad(format!("unknown mission '{}'", row.mission)))?;
        let state = FleetState::parse(&row.state)
            .ok_or_else(|| bad(format!("unknown state '{}'", row.state)))?;
        if row.eta < row.departed_at {
            return Err(bad(format!("eta {} before departure {}", row.eta, row.departed_at)));
        }
        let remaining_ms = u64::try_from(row.remaining_ms)
            .map_err(|_| bad(format!("remaining time {} is negative", row.remaining_ms)))?;
        Ok(Fleet {
            departed_at:    from_millis(row.departed_at),
            eta:            from_millis(row.eta),
            arrived_at:     row.arrived_at.map(from_millis),
            fleet_id:       row.fleet_id,
            owner_id:       row.owner_id,
            origin_id:      row.origin_id,
            destination_id: row.destination_id,
            version:        row.version,
            ships,
            mission,
            state,
            remaining_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TickConfig;

    fn planet(coords: (u32, u32, u32)) -> Planet {
        Planet::colonize("u-1", "P", coords, from_millis(0))
    }

    fn cargo(n: u64) -> BTreeMap<ShipType, u64> {
        BTreeMap::from([(ShipType::SmallCargo, n)])
    }

    #[test]
    fn eta_is_departure_plus_travel_time() {
        let config = TickConfig::default().fleet;
        let fleet = Fleet::dispatch(
            &planet((1, 1, 1)),
            &planet((1, 5, 1)),
            cargo(3),
            MissionKind::Transport,
            from_millis(0),
            &config,
        )
        .unwrap();
        let expected = travel_time_ms((1, 1, 1), (1, 5, 1), &cargo(3), &config).unwrap();
        assert_eq!((fleet.eta - fleet.departed_at).num_milliseconds() as u64, expected);
        assert_eq!(fleet.state, FleetState::Travelling);
    }

    #[test]
    fn slowest_ship_sets_the_pace() {
        let config = TickConfig::default().fleet;
        let fast = BTreeMap::from([(ShipType::Cruiser, 5)]);
        let mixed = BTreeMap::from([(ShipType::Cruiser, 5), (ShipType::Recycler, 1)]);
        let a = travel_time_ms((1, 1, 1), (2, 1, 1), &fast, &config).unwrap();
        let b = travel_time_ms((1, 1, 1), (2, 1, 1), &mixed, &config).unwrap();
        assert!(b > a);
    }

    #[test]
    fn empty_fleet_cannot_be_dispatched() {
        let config = TickConfig::default().fleet;
        let result = Fleet::dispatch(
            &planet((1, 1, 1)),
            &planet((1, 1, 2)),
            BTreeMap::new(),
            MissionKind::Attack,
            from_millis(0),
            &config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn runaway_travel_time_is_an_error() {
        let config = FleetConfig { universe_speed: 1e-300, base_travel_secs: 10.0 };
        let result = Fleet::dispatch(
            &planet((1, 1, 1)),
            &planet((3, 1, 1)),
            cargo(1),
            MissionKind::Attack,
            from_millis(0),
            &config,
        );
        assert!(matches!(result, Err(GameError::InvalidRecord { .. })));
    }

    #[test]
    fn progress_follows_eta() {
        let config = TickConfig::default().fleet;
        let mut fleet = Fleet::dispatch(
            &planet((1, 1, 1)),
            &planet((1, 1, 2)),
            cargo(1),
            MissionKind::Deploy,
            from_millis(0),
            &config,
        )
        .unwrap();
        fleet.eta = from_millis(600_000);

        assert_eq!(
            fleet.progress(from_millis(300_000)),
            Some(FleetProgress::Travelling { remaining_ms: 300_000 })
        );
        assert_eq!(fleet.progress(from_millis(600_000)), Some(FleetProgress::Arrived));

        fleet.state = FleetState::Recalled;
        assert_eq!(fleet.progress(from_millis(900_000)), None);
    }

    #[test]
    fn distance_tiers() {
        assert_eq!(distance((1, 1, 1), (1, 1, 1)), 5);
        assert_eq!(distance((1, 1, 1), (1, 1, 4)), 1_015);
        assert_eq!(distance((1, 10, 1), (1, 12, 9)), 2_890);
        assert_eq!(distance((1, 1, 1), (3, 1, 1)), 40_000);
    }
}
