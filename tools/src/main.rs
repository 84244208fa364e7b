//! tick-runner: headless driver for the Starlane tick core.
//!
//! Usage:
//!   tick-runner --seed 42 --ticks 12 --db run.db
//!   tick-runner --seed 42 --ipc-mode --period-ms 5000
//!
//! Fast-forward mode drives a manual clock one interval per tick.
//! IPC mode runs the real scheduler on the wall clock and reads one JSON
//! command per stdin line (the debug trigger endpoint).

use anyhow::Result;
use starlane_core::{
    clock::{GameClock, ManualClock, SystemClock},
    config::TickConfig,
    engine::TickEngine,
    fleet::FleetState,
    galaxy::{seed_galaxy, GalaxySpec},
    resources::Building,
    scheduler::TickScheduler,
    store::SimStore,
    tick_log::TickLog,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::time::Duration;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Trigger,
    GetState,
    Logs {
        #[serde(default)]
        after: i64,
    },
    Recall {
        fleet_id: String,
    },
    Upgrade {
        planet_id: String,
        building: String,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct GalaxyState {
    now: String,
    planets: i64,
    fleets_travelling: i64,
    fleets_arrived: i64,
    fleets_recalled: i64,
    ticks_logged: i64,
    failures: usize,
    last_tick: Option<TickLog>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 12u64);
    let players = parse_arg(&args, "--players", 4usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let config_path = str_arg(&args, "--config").unwrap_or("./data/tick_config.json");

    let config = match TickConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("{e}; falling back to built-in defaults");
            TickConfig::default()
        }
    };
    let period_ms = parse_arg(&args, "--period-ms", config.interval_ms());

    if !ipc_mode {
        println!("Starlane tick-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  interval:  {}s", config.interval_secs);
        println!();
    }

    // For :memory: use SQLite shared-memory URI so a second connection
    // (e.g. an operator shell) can attach to the same database.
    let db_effective: String = if db == ":memory:" {
        format!("file:starlane_{}?mode=memory&cache=shared", unix_secs())
    } else {
        db.to_string()
    };
    let store = SimStore::open(&db_effective)?;
    store.migrate()?;

    let layout = GalaxySpec { seed, players, ..GalaxySpec::default() };

    if ipc_mode {
        let clock = SystemClock;
        seed_galaxy(&store, &layout, clock.now(), &config.fleet)?;
        let engine = TickEngine::new(store, clock, config)?;
        let scheduler = TickScheduler::new(engine).with_period(Duration::from_millis(period_ms));
        scheduler.start()?;
        let outcome = run_ipc_loop(&scheduler);
        scheduler.stop();
        outcome
    } else {
        let clock = ManualClock::new(chrono::Utc::now());
        seed_galaxy(&store, &layout, clock.now(), &config.fleet)?;
        let step = chrono::Duration::milliseconds(config.interval_ms() as i64);
        let engine = TickEngine::new(store, clock.clone(), config)?;
        let scheduler = TickScheduler::new(engine);
        for _ in 0..ticks {
            clock.advance(step);
            if let Err(e) = scheduler.trigger() {
                log::error!("tick failed: {e}");
            }
        }
        print_summary(&scheduler, ticks)
    }
}

fn run_ipc_loop(scheduler: &TickScheduler<SimStore>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Trigger => match scheduler.trigger() {
                Ok(log) => serde_json::to_value(&log)?,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
            IpcCommand::GetState => serde_json::to_value(build_state(scheduler)?)?,
            IpcCommand::Logs { after } => {
                let engine = scheduler.lock_engine()?;
                serde_json::to_value(engine.store().tick_logs_since(after, 100)?)?
            }
            IpcCommand::Recall { fleet_id } => {
                let engine = scheduler.lock_engine()?;
                match engine.store().recall_fleet(&fleet_id) {
                    Ok(recalled) => serde_json::json!({ "recalled": recalled }),
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                }
            }
            IpcCommand::Upgrade { planet_id, building } => match Building::parse(&building) {
                Some(b) => {
                    let engine = scheduler.lock_engine()?;
                    match engine.store().upgrade_building(&planet_id, b) {
                        Ok(level) => serde_json::json!({ "level": level }),
                        Err(e) => serde_json::json!({ "error": e.to_string() }),
                    }
                }
                None => serde_json::json!({ "error": format!("unknown building '{building}'") }),
            },
        };
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}

fn build_state(scheduler: &TickScheduler<SimStore>) -> Result<GalaxyState> {
    let engine = scheduler.lock_engine()?;
    let store = engine.store();
    Ok(GalaxyState {
        now: engine.now().to_rfc3339(),
        planets: store.planet_count()?,
        fleets_travelling: store.fleet_count(FleetState::Travelling)?,
        fleets_arrived: store.fleet_count(FleetState::Arrived)?,
        fleets_recalled: store.fleet_count(FleetState::Recalled)?,
        ticks_logged: store.tick_log_count()?,
        failures: store.tick_failures()?.len(),
        last_tick: store.latest_tick_log()?,
    })
}

fn print_summary(scheduler: &TickScheduler<SimStore>, ticks: u64) -> Result<()> {
    let state = build_state(scheduler)?;
    let engine = scheduler.lock_engine()?;
    let logs = engine.store().tick_logs_since(0, ticks as usize)?;

    println!("=== RUN SUMMARY ===");
    println!("  ticks run:         {ticks}");
    println!("  ticks logged:      {}", state.ticks_logged);
    println!("  failures:          {}", state.failures);
    println!("  planets:           {}", state.planets);
    println!("  fleets travelling: {}", state.fleets_travelling);
    println!("  fleets arrived:    {}", state.fleets_arrived);

    println!();
    println!("=== TICK LOG (last 5) ===");
    if logs.is_empty() {
        println!("  (No ticks committed)");
    } else {
        for log in logs.iter().rev().take(5).collect::<Vec<_>>().into_iter().rev() {
            println!(
                "  #{:<4} planets {:>3} | advanced {:>3} | arrived {:>3} | conflicts {} | {}ms",
                log.tick,
                log.planets_updated,
                log.fleets_advanced,
                log.fleets_arrived,
                log.conflicts,
                log.duration_ms
            );
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn unix_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
