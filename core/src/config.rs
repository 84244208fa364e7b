//! Tick configuration: interval, production balance, storage, fleet speed.
//!
//! Loaded from `data/tick_config.json`. In tests, use `TickConfig::default()`.

use crate::error::{GameError, GameResult};
use crate::resources::Resource;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Nominal period between scheduled ticks. Production rates are
    /// expressed per one of these intervals.
    pub interval_secs: u64,
    /// Planets with less elapsed time than this are left for a later tick.
    #[serde(default = "default_min_elapsed_ms")]
    pub min_elapsed_ms: u64,
    /// Ticks that take longer than this are logged as slow.
    #[serde(default = "default_slow_tick_budget_ms")]
    pub slow_tick_budget_ms: u64,
    pub production: ProductionConfig,
    /// None = unbounded stockpiles.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    pub fleet: FleetConfig,
}

/// One week. Longer periods are not a game tick.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 3_600;

/// Below this a single flight outlasts the game.
pub const MIN_UNIVERSE_SPEED: f64 = 0.01;

/// Upper bound on the flat per-flight overhead (one week).
pub const MAX_BASE_TRAVEL_SECS: f64 = 7.0 * 24.0 * 3_600.0;

fn default_min_elapsed_ms() -> u64 { 1_000 }
fn default_slow_tick_budget_ms() -> u64 { 2_000 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    pub metal:     ResourceRateConfig,
    pub crystal:   ResourceRateConfig,
    pub deuterium: ResourceRateConfig,
}

impl ProductionConfig {
    pub fn for_resource(&self, resource: Resource) -> &ResourceRateConfig {
        match resource {
            Resource::Metal     => &self.metal,
            Resource::Crystal   => &self.crystal,
            Resource::Deuterium => &self.deuterium,
        }
    }
}

/// `rate(level) = per_level * level * growth^level` units per interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceRateConfig {
    pub per_level: f64,
    #[serde(default = "default_growth")]
    pub growth:    f64,
}

fn default_growth() -> f64 { 1.0 }

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Capacity of a level-0 storage building. Each level doubles it.
    pub base_capacity: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Global speed multiplier; 2.0 halves every travel time.
    pub universe_speed: f64,
    /// Fixed launch/landing overhead added to every flight.
    pub base_travel_secs: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_secs:       300,
            min_elapsed_ms:      default_min_elapsed_ms(),
            slow_tick_budget_ms: default_slow_tick_budget_ms(),
            production: ProductionConfig {
                metal:     ResourceRateConfig { per_level: 6.0, growth: 1.0 },
                crystal:   ResourceRateConfig { per_level: 4.0, growth: 1.0 },
                deuterium: ResourceRateConfig { per_level: 2.0, growth: 1.0 },
            },
            storage: None,
            fleet: FleetConfig {
                universe_speed:   1.0,
                base_travel_secs: 10.0,
            },
        }
    }
}

impl TickConfig {
    /// Load and validate a config file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: TickConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.interval_secs == 0 || self.interval_secs > MAX_INTERVAL_SECS {
            return Err(GameError::InvalidConfig(format!(
                "interval_secs must be in 1..={MAX_INTERVAL_SECS}, got {}",
                self.interval_secs
            )));
        }
        for resource in Resource::ALL {
            let rate = self.production.for_resource(resource);
            if !(rate.per_level >= 0.0) {
                return Err(GameError::InvalidConfig(format!(
                    "{} per_level must be >= 0, got {}",
                    resource.as_str(),
                    rate.per_level
                )));
            }
            // growth below 1 would make high levels produce less than low ones
            if !(rate.growth >= 1.0) {
                return Err(GameError::InvalidConfig(format!(
                    "{} growth must be >= 1, got {}",
                    resource.as_str(),
                    rate.growth
                )));
            }
        }
        if let Some(storage) = &self.storage {
            if !(storage.base_capacity > 0.0) {
                return Err(GameError::InvalidConfig("storage.base_capacity must be > 0".into()));
            }
        }
        let speed = self.fleet.universe_speed;
        if !(speed >= MIN_UNIVERSE_SPEED && speed.is_finite()) {
            return Err(GameError::InvalidConfig(format!(
                "fleet.universe_speed must be finite and >= {MIN_UNIVERSE_SPEED}, got {speed}"
            )));
        }
        if !(0.0..=MAX_BASE_TRAVEL_SECS).contains(&self.fleet.base_travel_secs) {
            return Err(GameError::InvalidConfig(format!(
                "fleet.base_travel_secs must be in 0..={MAX_BASE_TRAVEL_SECS}, got {}",
                self.fleet.base_travel_secs
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_secs.saturating_mul(1_000)
    }

    pub fn slow_tick_budget(&self) -> Duration {
        Duration::from_millis(self.slow_tick_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        TickConfig::default().validate().unwrap();
    }

    #[test]
    fn shrinking_growth_is_rejected() {
        let mut config = TickConfig::default();
        config.production.crystal.growth = 0.9;
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = TickConfig { interval_secs: 0, ..TickConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_interval_is_rejected() {
        let config = TickConfig { interval_secs: u64::MAX / 100, ..TickConfig::default() };
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        let week = TickConfig { interval_secs: MAX_INTERVAL_SECS, ..TickConfig::default() };
        week.validate().unwrap();
        assert_eq!(week.interval_ms(), MAX_INTERVAL_SECS * 1_000);
    }

    #[test]
    fn crawling_universe_is_rejected() {
        let mut config = TickConfig::default();
        config.fleet.universe_speed = 1e-300;
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        config.fleet.universe_speed = f64::INFINITY;
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn unbounded_travel_overhead_is_rejected() {
        let mut config = TickConfig::default();
        config.fleet.base_travel_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        config.fleet.base_travel_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_minimal_json_with_defaults() {
        let json = r#"{
            "interval_secs": 60,
            "production": {
                "metal":     { "per_level": 10 },
                "crystal":   { "per_level": 5, "growth": 1.1 },
                "deuterium": { "per_level": 1 }
            },
            "fleet": { "universe_speed": 2.0, "base_travel_secs": 5.0 }
        }"#;
        let config: TickConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.min_elapsed_ms, 1_000);
        assert_eq!(config.production.metal.growth, 1.0);
        assert!(config.storage.is_none());
        config.validate().unwrap();
    }
}
