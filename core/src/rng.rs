//! Deterministic random number generation for galaxy seeding.
//!
//! RULE: the tick itself never draws random numbers. Randomness is only
//! used to lay out demo and test galaxies, and all of it flows through
//! SeedRng streams derived from one master seed.
//!
//! Each stream is seeded from (master_seed XOR stream_index), so adding
//! a stream never changes the values an existing stream produces.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

pub struct SeedRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SeedRng {
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a u32 in [lo, hi].
    pub fn range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        assert!(lo <= hi, "empty range {lo}..={hi}");
        lo + self.next_u64_below((hi - lo) as u64 + 1) as u32
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }
}

/// All seeding streams for one galaxy, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn stream(&self, slot: SeedSlot) -> SeedRng {
        SeedRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries; only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SeedSlot {
    Planets = 0,
    Buildings = 1,
    Fleets = 2,
}

impl SeedSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Planets => "planets",
            Self::Buildings => "buildings",
            Self::Fleets => "fleets",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RngBank::new(7).stream(SeedSlot::Planets);
        let mut b = RngBank::new(7).stream(SeedSlot::Planets);
        for _ in 0..32 {
            assert_eq!(a.next_u64_below(1_000), b.next_u64_below(1_000));
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut a = RngBank::new(7).stream(SeedSlot::Planets);
        let mut b = RngBank::new(7).stream(SeedSlot::Fleets);
        let xs: Vec<u64> = (0..8).map(|_| a.next_u64_below(u64::MAX)).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.next_u64_below(u64::MAX)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn range_is_inclusive() {
        let mut rng = RngBank::new(1).stream(SeedSlot::Buildings);
        for _ in 0..200 {
            let v = rng.range_u32(3, 5);
            assert!((3..=5).contains(&v));
        }
    }
}
