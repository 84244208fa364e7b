//! Tick scheduler: drives the engine on a fixed period and exposes the
//! manual trigger.
//!
//! RULES:
//!   - Both triggers go through one gate (a mutex around the engine).
//!     A second caller waits, then runs against near-zero elapsed time.
//!   - Ticks are strictly serialized. A slow tick delays the next firing;
//!     missed periods are never queued up. Elapsed-time accounting makes
//!     the next tick catch up.
//!   - A failed scheduled tick is logged and the timer keeps running.
//!   - A panicking tick is caught at the gate and reported as an error.
//!     The store rolls back what it had not committed, so the engine is
//!     still usable and the gate is never left poisoned.

use crate::{
    engine::TickEngine,
    error::{GameError, GameResult},
    store::TickStore,
    tick_log::TickLog,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Shutdown {
    stopped: Mutex<bool>,
    wake:    Condvar,
}

impl Shutdown {
    fn set(&self, value: bool) {
        *self.stopped.lock().unwrap_or_else(|p| p.into_inner()) = value;
        self.wake.notify_all();
    }

    /// Sleep for `period` or until stopped. Returns true if stopped.
    fn wait(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut stopped = self.stopped.lock().unwrap_or_else(|p| p.into_inner());
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            stopped = match self.wake.wait_timeout(stopped, deadline - now) {
                Ok((guard, _)) => guard,
                Err(p) => p.into_inner().0,
            };
        }
        true
    }
}

pub struct TickScheduler<S: TickStore + 'static> {
    gate:     Arc<Mutex<TickEngine<S>>>,
    period:   Duration,
    shutdown: Arc<Shutdown>,
    worker:   Mutex<Option<JoinHandle<()>>>,
}

impl<S: TickStore + 'static> TickScheduler<S> {
    /// Scheduler firing every `interval_secs` from the engine's config.
    pub fn new(engine: TickEngine<S>) -> Self {
        let period = engine.config().interval();
        Self {
            gate:     Arc::new(Mutex::new(engine)),
            period,
            shutdown: Arc::new(Shutdown::default()),
            worker:   Mutex::new(None),
        }
    }

    /// Override the firing period. Production rates stay per configured
    /// interval; only how often the timer fires changes.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start the background timer. Starting twice is a no-op.
    pub fn start(&self) -> GameResult<()> {
        let mut worker = self.worker.lock().map_err(|_| GameError::GatePoisoned)?;
        if worker.is_some() {
            return Ok(());
        }
        self.shutdown.set(false);

        let gate = Arc::clone(&self.gate);
        let shutdown = Arc::clone(&self.shutdown);
        let period = self.period;
        let handle = thread::Builder::new()
            .name("tick-scheduler".into())
            .spawn(move || {
                log::info!("tick scheduler started, period {}ms", period.as_millis());
                while !shutdown.wait(period) {
                    // Errors are already logged and recorded by the engine.
                    if let Err(err) = run_gated(&gate) {
                        log::error!("scheduled tick failed: {err}");
                    }
                }
                log::info!("tick scheduler stopped");
            })
            .map_err(|e| GameError::Other(anyhow::anyhow!("cannot spawn scheduler thread: {e}")))?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stop the timer and wait for an in-flight tick to finish.
    /// A tick is never cut off mid-write.
    pub fn stop(&self) {
        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(p) => p.into_inner().take(),
        };
        let Some(handle) = handle else { return };
        self.shutdown.set(true);
        if handle.join().is_err() {
            log::error!("tick scheduler thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().map(|w| w.is_some()).unwrap_or(false)
    }

    /// Manual trigger. Same gate, same engine entry point as the timer;
    /// the failure, if any, is returned to the caller.
    pub fn trigger(&self) -> GameResult<TickLog> {
        run_gated(&self.gate)
    }

    /// Exclusive access to the engine, e.g. to read the store between ticks.
    /// Holding the guard blocks both triggers.
    pub fn lock_engine(&self) -> GameResult<MutexGuard<'_, TickEngine<S>>> {
        Ok(enter_gate(&self.gate))
    }
}

impl<S: TickStore + 'static> Drop for TickScheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_gated<S: TickStore>(gate: &Mutex<TickEngine<S>>) -> GameResult<TickLog> {
    let mut engine = enter_gate(gate);
    match panic::catch_unwind(AssertUnwindSafe(|| engine.run_tick())) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_reason(&*payload);
            log::error!("tick panicked, engine kept for the next tick: {reason}");
            Err(GameError::TickPanicked(reason))
        }
    }
}

/// Poison only means a holder of the guard panicked. Uncommitted tick
/// writes were already rolled back, so the engine is taken back as is.
fn enter_gate<S: TickStore>(gate: &Mutex<TickEngine<S>>) -> MutexGuard<'_, TickEngine<S>> {
    gate.lock().unwrap_or_else(|poisoned| {
        log::warn!("tick gate was poisoned by a panic; recovering");
        poisoned.into_inner()
    })
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
