use anyhow::{Context, Result};
use bulletcore::components::{Enemy, InputState, Transform};
use bulletcore::config::{SimulationConfig, TICK_RATE};
use bulletcore::events::FrameEvent;
use bulletcore::progress::{Booster, ProgressStore, RedbStore};
use bulletcore::session::{GameSession, RunPhase};
use bulletcore::simulation::GameSimulation;
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "headless")]
#[command(about = "Runs a seeded autopilot game without a renderer and banks the result")]
struct Args {
    /// Ticks to simulate before quitting (60 per second)
    #[arg(long, default_value_t = 3600)]
    ticks: u64,
    #[arg(long)]
    seed: Option<u64>,
    /// redb file holding progress and the leaderboard
    #[arg(long, default_value = "bulletcore.redb")]
    db: PathBuf,
    /// Ids starting with `guest_` are never persisted
    #[arg(long, default_value = "pilot")]
    player: String,
    #[arg(long, value_enum)]
    booster: Option<CliBooster>,
    /// Use the smaller wave profile for low-power devices
    #[arg(long, default_value_t = false)]
    constrained: bool,
    /// JSON file overriding simulation tunables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the final snapshot here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    leaderboard: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliBooster {
    Shield,
    RapidFire,
    DoubleCredits,
}

impl From<CliBooster> for Booster {
    fn from(value: CliBooster) -> Self {
        match value {
            CliBooster::Shield => Booster::Shield,
            CliBooster::RapidFire => Booster::RapidFire,
            CliBooster::DoubleCredits => Booster::DoubleCredits,
        }
    }
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None if args.constrained => SimulationConfig::constrained(),
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;
    Ok(config)
}

/// Chases the lowest enemy (or the boss) horizontally and never stops firing.
fn autopilot(simulation: &GameSimulation) -> InputState {
    let player_x = simulation.player.position[0];
    let target_x = simulation
        .world
        .query::<(&Transform, &Enemy)>()
        .iter()
        .map(|(_, (transform, _))| transform.position)
        .max_by(|a, b| a[1].total_cmp(&b[1]))
        .map(|position| position[0])
        .or_else(|| simulation.boss.as_ref().map(|boss| boss.position[0]));

    let mut input = InputState {
        fire: true,
        ..InputState::default()
    };
    if let Some(x) = target_x {
        input.left = x < player_x - 4.0;
        input.right = x > player_x + 4.0;
    }
    input
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let store = RedbStore::open(&args.db)
        .with_context(|| format!("failed to open {}", args.db.display()))?;
    let mut session = GameSession::new(args.player.clone(), config, store);

    session.start_run(args.booster.map(Booster::from));

    for _ in 0..args.ticks {
        let Some(input) = session.simulation().map(autopilot) else {
            break;
        };
        let Some(result) = session.tick(&input) else {
            break;
        };
        for event in &result.events {
            match event {
                FrameEvent::WaveStarted { wave, enemies } => {
                    info!("Wave {} started with {} enemies", wave, enemies)
                }
                FrameEvent::BossSpawned { wave } => info!("Boss arrived on wave {}", wave),
                FrameEvent::BossDefeated { points, .. } => {
                    info!("Boss defeated for {} points", points)
                }
                FrameEvent::GameOver => info!("Game over at tick {}", result.tick),
                _ => {}
            }
        }
        if result.tick % (TICK_RATE as u64 * 10) == 0 {
            info!(
                "tick {} | {} entities | step took {:?}",
                result.tick, result.entity_count, result.step_duration
            );
        }
    }

    let snapshot = session
        .snapshot()
        .context("no run was started")?;
    let json = serde_json::to_string_pretty(&snapshot)?;

    if session.phase() == RunPhase::Running {
        warn!("Tick limit reached before game over; run discarded");
        session.quit();
    } else if let Some(summary) = session.last_summary() {
        info!(
            "Run banked: score {} credits +{} wave {} levels +{}",
            summary.score, summary.credits_earned, summary.wave, summary.levels_gained
        );
    }

    match &args.output {
        Some(path) => fs::write(path, &json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }

    for (rank, entry) in session.store().top_runs(args.leaderboard)?.iter().enumerate() {
        info!(
            "#{} {} score {} wave {}",
            rank + 1,
            entry.player_name,
            entry.score,
            entry.wave
        );
    }
    Ok(())
}
