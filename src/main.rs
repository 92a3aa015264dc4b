//! Sled Rush headless runner
//!
//! Plays a level with a simple autopilot and logs how the run went.
//!
//! # Usage
//!
//! ```bash
//! sled-rush                        # generated course
//! sled-rush level.json
//! sled-rush --seed 7 --length 800
//! RUST_LOG=debug sled-rush         # also log every game event
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sled_rush::consts::{DEFAULT_COURSE_LEN, SIM_DT};
use sled_rush::effects::LogDiagnostics;
use sled_rush::records::{BestTimes, format_time};
use sled_rush::sim::{Command, GameEvent, GamePhase, GameState, Key, Level, LevelError, generate_course};
use sled_rush::{Game, Settings, Tuning};

#[derive(Parser)]
#[command(name = "sled-rush")]
#[command(version, about = "Sled Rush - headless autopilot runner")]
struct Args {
    /// Level JSON to play (default: a generated course)
    level: Option<PathBuf>,

    /// Seed for the generated course
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Generated course length in segments
    #[arg(long, default_value_t = DEFAULT_COURSE_LEN)]
    length: usize,

    /// Tuning overrides (JSON, missing fields keep defaults)
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Settings file (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Best times file, updated after a finish
    #[arg(long)]
    records: Option<PathBuf>,

    /// Give up after this many simulated seconds
    #[arg(long, default_value_t = 300.0)]
    max_seconds: f32,

    /// Give up after this many crashes
    #[arg(long, default_value_t = 25)]
    max_crashes: u32,
}

fn load_level(args: &Args) -> Result<Level, LevelError> {
    match &args.level {
        Some(path) => Level::load(path),
        None => generate_course(args.seed, args.length),
    }
}

/// Jump for gaps and lethal objects just ahead
fn autopilot_wants_jump(level: &Level, tuning: &Tuning, state: &GameState) -> bool {
    let p = &state.player;
    if !p.grounded {
        return false;
    }
    let reach = 16.0 + p.vx.max(0.0) * 0.12;
    let probe = p.x + tuning.half_width + reach;
    let gap_ahead = probe < level.terrain.world_width() && level.terrain.height_at(probe).is_none();
    let threat_ahead = level.objects().iter().any(|obj| {
        let dx = level.object_x(obj) - p.x;
        obj.kind.is_lethal() && dx > 0.0 && dx < reach + 2.0 * tuning.half_width
    });
    gap_ahead || threat_ahead
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let tuning = args.tuning.as_ref().map(Tuning::load).unwrap_or_default();
    let settings = args.settings.as_ref().map(Settings::load).unwrap_or_default();
    let records = args.records.as_ref().map(BestTimes::load).unwrap_or_default();

    let level = match load_level(&args) {
        Ok(level) => level,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let title = level.title().to_string();

    let mut game = match Game::new(vec![level], tuning, settings) {
        Ok(game) => game
            .with_diagnostics(Box::new(LogDiagnostics))
            .with_records(records),
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Sled Rush (headless) starting '{}'", title);
    game.command(Command::Start);
    game.press(Key::Right);

    let mut simulated = 0.0;
    let mut crashes = 0;
    let mut finish_time = None;
    while simulated < args.max_seconds {
        match game.state().phase {
            GamePhase::Dead => {
                if crashes >= args.max_crashes {
                    break;
                }
                game.press(Key::Restart);
            }
            GamePhase::Complete => break,
            _ => {
                game.release(Key::Restart);
                if autopilot_wants_jump(game.level(), game.tuning(), game.state()) {
                    game.request_jump();
                }
            }
        }

        game.frame(SIM_DT);
        simulated += SIM_DT;

        for event in game.drain_events() {
            match event {
                GameEvent::Crashed { cause } => {
                    crashes += 1;
                    log::info!("Crash #{} ({:?}) at x={:.0}", crashes, cause, game.state().player.x);
                }
                GameEvent::Finished { time } => finish_time = Some(time),
                _ => {}
            }
        }
    }

    if let Some(path) = &args.records {
        game.records().save(path);
    }

    match finish_time {
        Some(time) => {
            println!("'{}' finished in {} with {} crash(es)", title, format_time(time), crashes);
            if let Some(best) = game.records().best(&title) {
                println!("Best: {}", format_time(best));
            }
            ExitCode::SUCCESS
        }
        None => {
            println!(
                "'{}' not finished after {:.0}s ({} crash(es), reached x={:.0})",
                title,
                simulated,
                crashes,
                game.state().furthest_checkpoint_x
            );
            ExitCode::FAILURE
        }
    }
}
