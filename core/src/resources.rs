//! Resource ledger: production rates and stockpile growth.
//!
//! RULE: production is a pure function of building level and elapsed time.
//! No randomness, no I/O. The engine is the only caller that persists
//! the result.

use crate::config::{ProductionConfig, StorageConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Metal,
    Crystal,
    Deuterium,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Metal, Resource::Crystal, Resource::Deuterium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metal     => "metal",
            Self::Crystal   => "crystal",
            Self::Deuterium => "deuterium",
        }
    }

    /// Building whose level sets this resource's production rate.
    pub fn producer(&self) -> Building {
        match self {
            Self::Metal     => Building::MetalMine,
            Self::Crystal   => Building::CrystalMine,
            Self::Deuterium => Building::DeuteriumSynthesizer,
        }
    }

    /// Building whose level sets this resource's storage capacity.
    pub fn store(&self) -> Building {
        match self {
            Self::Metal     => Building::MetalStorage,
            Self::Crystal   => Building::CrystalStorage,
            Self::Deuterium => Building::DeuteriumTank,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Building {
    MetalMine,
    CrystalMine,
    DeuteriumSynthesizer,
    MetalStorage,
    CrystalStorage,
    DeuteriumTank,
}

impl Building {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetalMine            => "metal_mine",
            Self::CrystalMine          => "crystal_mine",
            Self::DeuteriumSynthesizer => "deuterium_synthesizer",
            Self::MetalStorage         => "metal_storage",
            Self::CrystalStorage       => "crystal_storage",
            Self::DeuteriumTank        => "deuterium_tank",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "metal_mine"            => Some(Self::MetalMine),
            "crystal_mine"          => Some(Self::CrystalMine),
            "deuterium_synthesizer" => Some(Self::DeuteriumSynthesizer),
            "metal_storage"         => Some(Self::MetalStorage),
            "crystal_storage"       => Some(Self::CrystalStorage),
            "deuterium_tank"        => Some(Self::DeuteriumTank),
            _ => None,
        }
    }
}

/// Per-resource amounts. Stockpiles are fractional so sub-interval
/// production is never rounded away.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Stockpile {
    pub metal:     f64,
    pub crystal:   f64,
    pub deuterium: f64,
}

impl Stockpile {
    pub fn new(metal: f64, crystal: f64, deuterium: f64) -> Self {
        Self { metal, crystal, deuterium }
    }

    pub fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Metal     => self.metal,
            Resource::Crystal   => self.crystal,
            Resource::Deuterium => self.deuterium,
        }
    }

    pub fn set(&mut self, resource: Resource, amount: f64) {
        match resource {
            Resource::Metal     => self.metal = amount,
            Resource::Crystal   => self.crystal = amount,
            Resource::Deuterium => self.deuterium = amount,
        }
    }

    pub fn is_valid(&self) -> bool {
        Resource::ALL.iter().all(|r| {
            let v = self.get(*r);
            v.is_finite() && v >= 0.0
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildingLevels {
    pub metal_mine:            u32,
    pub crystal_mine:          u32,
    pub deuterium_synthesizer: u32,
    pub metal_storage:         u32,
    pub crystal_storage:       u32,
    pub deuterium_tank:        u32,
}

impl BuildingLevels {
    pub fn level(&self, building: Building) -> u32 {
        match building {
            Building::MetalMine            => self.metal_mine,
            Building::CrystalMine          => self.crystal_mine,
            Building::DeuteriumSynthesizer => self.deuterium_synthesizer,
            Building::MetalStorage         => self.metal_storage,
            Building::CrystalStorage       => self.crystal_storage,
            Building::DeuteriumTank        => self.deuterium_tank,
        }
    }

    pub fn level_mut(&mut self, building: Building) -> &mut u32 {
        match building {
            Building::MetalMine            => &mut self.metal_mine,
            Building::CrystalMine          => &mut self.crystal_mine,
            Building::DeuteriumSynthesizer => &mut self.deuterium_synthesizer,
            Building::MetalStorage         => &mut self.metal_storage,
            Building::CrystalStorage       => &mut self.crystal_storage,
            Building::DeuteriumTank        => &mut self.deuterium_tank,
        }
    }
}

/// Production rates per interval, derived from the balance config.
#[derive(Debug, Clone)]
pub struct ProductionTable {
    config: ProductionConfig,
}

impl ProductionTable {
    pub fn new(config: ProductionConfig) -> Self {
        Self { config }
    }

    /// Units of `resource` produced per interval at building `level`.
    pub fn rate(&self, resource: Resource, level: u32) -> f64 {
        let c = self.config.for_resource(resource);
        c.per_level * level as f64 * c.growth.powi(level as i32)
    }
}

/// Storage ceiling consulted before a new stockpile is finalized.
pub trait StorageCap: Send {
    /// Maximum amount of `resource` the planet may hold, or None.
    fn capacity(&self, resource: Resource, levels: &BuildingLevels) -> Option<f64>;
}

/// No ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl StorageCap for Unbounded {
    fn capacity(&self, _resource: Resource, _levels: &BuildingLevels) -> Option<f64> {
        None
    }
}

/// Capacity `base * 2^level` from each resource's storage building.
#[derive(Debug, Clone, Copy)]
pub struct StorageDepots {
    pub base_capacity: f64,
}

impl From<StorageConfig> for StorageDepots {
    fn from(c: StorageConfig) -> Self {
        Self { base_capacity: c.base_capacity }
    }
}

impl StorageCap for StorageDepots {
    fn capacity(&self, resource: Resource, levels: &BuildingLevels) -> Option<f64> {
        let level = levels.level(resource.store());
        Some(self.base_capacity * 2f64.powi(level as i32))
    }
}

/// Credit `elapsed_ms` worth of production to `stockpile`.
///
/// The result is never below the input: a cap stops growth but never
/// removes stock that already sits above it.
pub fn apply_production(
    stockpile:   &Stockpile,
    levels:      &BuildingLevels,
    elapsed_ms:  u64,
    interval_ms: u64,
    table:       &ProductionTable,
    cap:         &dyn StorageCap,
) -> Stockpile {
    let mut next = *stockpile;
    if interval_ms == 0 || elapsed_ms == 0 {
        return next;
    }
    let intervals = elapsed_ms as f64 / interval_ms as f64;
    for resource in Resource::ALL {
        let before = stockpile.get(resource);
        let produced = table.rate(resource, levels.level(resource.producer())) * intervals;
        let mut after = before + produced.max(0.0);
        if let Some(limit) = cap.capacity(resource, levels) {
            after = after.min(limit.max(before));
        }
        next.set(resource, after);
    }
    next
}
