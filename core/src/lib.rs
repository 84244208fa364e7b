//! Starlane tick core: resource production, fleet movement and the
//! periodic tick that advances both.

pub mod clock;
pub mod combat;
pub mod config;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod galaxy;
pub mod name_generator;
pub mod planet;
pub mod resources;
pub mod rng;
pub mod scheduler;
pub mod store;
pub mod tick_log;
pub mod types;
