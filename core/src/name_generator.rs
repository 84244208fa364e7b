//! Deterministic planet and commander names for seeded galaxies.
//!
//! Same RNG seed = same names.

use crate::rng::SeedRng;

pub struct NameGenerator;

impl NameGenerator {
    /// "Root Suffix", e.g. "Kepheus Prime".
    pub fn planet_name(rng: &mut SeedRng) -> String {
        let root = rng.pick(Self::planet_roots());
        if rng.chance(0.3) {
            let numeral = rng.pick(Self::numerals());
            format!("{root} {numeral}")
        } else {
            let suffix = rng.pick(Self::planet_suffixes());
            format!("{root} {suffix}")
        }
    }

    /// Player handle used as the owner id in demo galaxies.
    pub fn commander_name(rng: &mut SeedRng) -> String {
        let rank = rng.pick(Self::ranks());
        let call_sign = rng.pick(Self::call_signs());
        format!("{rank}-{call_sign}")
    }

    fn planet_roots() -> &'static [&'static str] {
        &[
            "Kepheus", "Aldara", "Vossk", "Tarsis", "Meridian", "Ophion", "Calyx",
            "Durnhold", "Iskra", "Nereid", "Thessaly", "Vantor", "Eridane", "Koth",
            "Lumen", "Sarakos", "Helion", "Marrow", "Quill", "Zephyra", "Obsidia",
            "Tyrran", "Ventis", "Carrow", "Ysolde", "Brannoc", "Pellucid", "Arkon",
        ]
    }

    fn planet_suffixes() -> &'static [&'static str] {
        &[
            "Prime", "Minor", "Major", "Reach", "Station", "Colony", "Outpost",
            "Gate", "Deep", "Landing", "Haven", "Forge",
        ]
    }

    fn numerals() -> &'static [&'static str] {
        &["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"]
    }

    fn ranks() -> &'static [&'static str] {
        &["admiral", "captain", "commodore", "marshal", "warden", "pilot"]
    }

    fn call_signs() -> &'static [&'static str] {
        &[
            "nova", "ember", "rook", "vesper", "halcyon", "drift", "sable", "cinder",
            "quasar", "talon", "aurora", "mistral", "onyx", "pulsar", "solace",
        ]
    }
}
