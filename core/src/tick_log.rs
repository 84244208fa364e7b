//! Append-only tick audit records.
//!
//! RULE: one TickLog per committed tick, one TickFailure per failed tick.
//! Neither is ever updated or deleted by the core.

use crate::types::{TickNumber, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickLog {
    /// None until the store has assigned a row id.
    pub id:              Option<i64>,
    pub tick:            TickNumber,
    pub executed_at:     Timestamp,
    pub planets_updated: u64,
    pub fleets_advanced: u64,
    pub fleets_arrived:  u64,
    /// Records rejected as invalid and left for an operator.
    pub records_skipped: u64,
    /// Records changed externally between read and write.
    pub conflicts:       u64,
    pub duration_ms:     u64,
}

impl TickLog {
    /// True when this tick wrote no planet or fleet state.
    pub fn is_noop(&self) -> bool {
        self.planets_updated == 0 && self.fleets_advanced == 0 && self.fleets_arrived == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickFailure {
    pub id:           Option<i64>,
    pub attempted_at: Timestamp,
    pub reason:       String,
}
