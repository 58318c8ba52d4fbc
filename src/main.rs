use anyhow::{Context, Result};
use clap::Parser;
use flock_engine::output::{save_final_agents, save_snapshots};
use flock_engine::{FlockConfig, FlockSimulation, OutputFormat};
use log::{debug, info, trace, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Headless driver: runs a flock for a fixed number of steps and saves what it recorded.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of steps to run
    #[arg(long)]
    steps: Option<u32>,

    /// Override the initial placement seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the snapshot output format (json, bincode, messagepack)
    #[arg(long)]
    format: Option<String>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Flock Engine...");

    // --- Load Configuration ---
    let mut config = match &args.config {
        Some(path) => FlockConfig::load(path)?,
        None => {
            warn!("No config file given; using the built-in defaults.");
            FlockConfig::default()
        }
    };
    if let Some(steps) = args.steps {
        config.run.total_steps = steps;
    }
    if let Some(seed) = args.seed {
        config.initial_conditions.seed = Some(seed);
    }
    if let Some(format) = args.format {
        config.output.format = Some(format);
    }
    debug!("Effective configuration:\n{}", config.to_json()?);

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Flock ---
    let mut sim = FlockSimulation::new(config).context("Failed to construct the flock")?;
    info!("Flock initialized with {} agents.", sim.agent_count());

    // --- Simulation Loop ---
    let total_steps = sim.config().run.total_steps;
    let mut record_interval_steps = sim.config().run.record_interval_steps;
    if record_interval_steps == 0 {
        warn!("Record interval is 0 steps. Recording every step.");
        record_interval_steps = 1;
    }
    info!("Recording snapshot every {} steps.", record_interval_steps);

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // --- Initial Snapshot (step 0) ---
    sim.record_snapshot();

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        sim.advance();
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let print_interval_secs = 5.0;
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= print_interval_secs;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if is_record_step || is_last_step {
            let snapshot = sim.record_snapshot();
            trace!(
                "Recorded step {}: mean speed {:.3}, mean neighbors {:.2}",
                snapshot.step,
                snapshot.mean_speed,
                snapshot.mean_neighbor_count
            );
        }

        if should_print_status || is_last_step {
            info!(
                "Step [{}/{}] | Agents: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                sim.agent_count(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;
        } else {
            trace!(
                "Step [{}/{}] completed in {:.2} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    let output = sim.config().output.clone();
    if output.save_stats {
        let format = output.format.as_deref().map(OutputFormat::from_name).unwrap_or_default();
        save_snapshots(sim.recorded_snapshots(), &output.base_filename, format)?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    // Save final agent states if requested (separate from full snapshots)
    if output.save_positions {
        save_final_agents(&sim.get_results(), &output.base_filename)?;
    } else {
        info!("Skipping saving final agent states as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
