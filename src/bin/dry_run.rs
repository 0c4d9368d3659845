// dry_run.rs
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use signal_rl_env::{Action, Actions, EnvConfig, Environment, Script, ScriptedSimulator};
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

const USAGE: &str = "usage: dry_run <env_config.json> <script.json> [seed] [steps.csv]";

#[derive(Debug, Serialize)]
struct StepRecord {
    step_index: u64,
    sim_time: f64,
    total_stopped: u32,
    mean_reward: f64,
    done: bool,
}

/// Appends one record to a CSV file, writing the header only for a new file.
fn log_to_csv<T: Serialize>(filename: &str, record: &T) -> Result<(), Box<dyn Error>> {
    let file_exists = Path::new(filename).exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(filename)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Dry run error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        return Err(USAGE.into());
    }
    let config = EnvConfig::load(&args[1])?;
    let script = Script::load(&args[2])?;
    let seed = match args.get(3) {
        Some(raw) => raw.parse::<u64>()?,
        None => 0,
    };
    let csv_path = args.get(4).cloned().unwrap_or_else(|| "dry_run_steps.csv".to_string());

    let mut env = Environment::new(ScriptedSimulator::new(script), config)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let first = env.reset()?;
    log::info!("Initial states: {:?}", first);

    let mut step_index = 0;
    loop {
        let actions: Actions = env
            .intersection_ids()
            .map(|id| {
                let action = if rng.random_bool(0.5) { Action::Keep } else { Action::Change };
                (id.clone(), action)
            })
            .collect();
        let result = env.step(&actions)?;
        step_index += 1;

        let mean_reward = if result.rewards.is_empty() {
            0.0
        } else {
            result.rewards.values().sum::<f64>() / result.rewards.len() as f64
        };
        log::debug!(
            "Step {} at {:.1}s: states {:?}, rewards {:?}",
            step_index, result.info.step, result.observations, result.rewards
        );
        log_to_csv(
            &csv_path,
            &StepRecord {
                step_index,
                sim_time: result.info.step,
                total_stopped: result.info.total_stopped,
                mean_reward,
                done: result.done,
            },
        )?;

        if result.done {
            break;
        }
    }

    env.close()?;
    println!(
        "Dry run finished after {} steps, per-step records in {}",
        step_index, csv_path
    );
    Ok(())
}
