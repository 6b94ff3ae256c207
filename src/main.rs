use clap::Parser;
use std::fs;
use terradrive::{ControlInput, SimConfig, Simulation, Throttle};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to terradrive.toml configuration file
    #[arg(short, long, default_value = "./terradrive.toml")]
    config: String,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the terrain seed
    #[arg(short, long)]
    seed: Option<u32>,

    /// Frames to simulate at 60 Hz
    #[arg(long, default_value_t = 600)]
    steps: u32,

    /// Write the final simulation snapshot to this JSON file
    #[arg(long)]
    snapshot: Option<String>,
}

/// Scripted driver input for the headless run: settle, accelerate, weave
/// both ways, then brake to a stop.
fn script_input(frame: u32, total: u32) -> ControlInput {
    let phase = frame as f32 / total.max(1) as f32;
    if phase < 0.15 {
        ControlInput::released()
    } else if phase < 0.5 {
        ControlInput::full_throttle()
    } else if phase < 0.7 {
        ControlInput { throttle: Throttle::Forward, steer: 0.6, brake: false }
    } else if phase < 0.9 {
        ControlInput { throttle: Throttle::Forward, steer: -0.4, brake: false }
    } else {
        ControlInput { throttle: Throttle::Neutral, steer: 0.0, brake: true }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config first: its logging section seeds the filter unless the flag or
    // RUST_LOG overrides it
    let loaded = SimConfig::load(&args.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => SimConfig::default(),
    };

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    info!("Starting TerraDrive simulation v0.1.0");
    match &loaded {
        Ok(_) => info!("Configuration loaded from: {}", args.config),
        Err(e) => warn!("Config {} not loaded ({}), using defaults", args.config, e),
    }

    if let Some(seed) = args.seed {
        config.terrain.seed = seed;
    }
    info!(
        "Terrain: {}x{} grid over {}x{} m, seed {}",
        config.terrain.grid_width,
        config.terrain.grid_depth,
        config.terrain.width,
        config.terrain.depth,
        config.terrain.seed
    );

    let mut sim = Simulation::new(config)?;
    info!(
        "Vehicle spawned at {:?}, valley floor at {:.1} m",
        sim.vehicle().spawn_position(),
        sim.terrain().floor_height()
    );

    const FRAME: f32 = 1.0 / 60.0;
    for frame in 0..args.steps {
        sim.apply_control(script_input(frame, args.steps));
        sim.tick(FRAME);

        if frame % 60 == 59 {
            let snapshot = sim.snapshot();
            info!(
                "t={:>5.1}s speed={:>5.1} m/s displaced={:>6.1} m state={:?}",
                (frame + 1) as f32 * FRAME,
                snapshot.speed,
                snapshot.true_displacement.length(),
                snapshot.drive_state,
            );
        }
    }

    let snapshot = sim.snapshot();
    info!(
        "Run complete: {} frames, displacement {:.1} m, terrain revision {}",
        args.steps,
        snapshot.true_displacement.length(),
        snapshot.terrain_revision
    );

    if let Some(path) = &args.snapshot {
        fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        info!("Snapshot written to {}", path);
    }

    Ok(())
}
