#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Wave Defence level headlessly.

mod level;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wave_defence_core::{Event, WELCOME_BANNER};

use crate::{
    level::{seconds, Level, DEFAULT_LEVEL},
    simulation::{RunOptions, Summary},
};

/// Plays a level's enemy waves against a fixed defence and reports progression.
#[derive(Debug, Parser)]
#[command(name = "wave-defence", version, about)]
struct Cli {
    /// Level file to play; the bundled level is used when omitted.
    #[arg(long, value_name = "PATH")]
    level: Option<PathBuf>,
    /// Seed for spawn-point selection.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Stop after this many ticks even if waves remain.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,
    /// Remove enemies that survive this many seconds, as if they reached the goal.
    #[arg(long, value_name = "SECONDS")]
    leak_after: Option<f64>,
}

/// Entry point for the Wave Defence command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    ensure!(cli.tick_ms > 0, "--tick-ms must be greater than zero");

    let level = match &cli.level {
        Some(path) => Level::load(path)?,
        None => Level::parse(DEFAULT_LEVEL).context("bundled level is invalid")?,
    };
    let leak_after = cli
        .leak_after
        .map(seconds)
        .transpose()
        .context("--leak-after must be a non-negative number of seconds")?;
    let options = RunOptions {
        seed: cli.seed,
        tick: Duration::from_millis(cli.tick_ms),
        max_ticks: cli.max_ticks,
        leak_after,
    };

    println!("{WELCOME_BANNER}");
    for enemy in level.roster() {
        println!(
            "{} ({} hp): {}",
            enemy.name(),
            enemy.health().get(),
            enemy.description()
        );
    }
    let summary = simulation::run(level, options, print_event)?;
    print_summary(&summary);
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::WaveStarted { wave } => println!("== wave {} ==", wave.get()),
        Event::SetStarted {
            set, enemy_count, ..
        } => println!("   set {}: {enemy_count} enemies", set.get()),
        Event::WaveCompleted { wave } => println!("   wave {} cleared", wave.get()),
        Event::LevelFinished { final_wave } => {
            println!("level finished after wave {}", final_wave.get());
        }
        _ => {}
    }
}

fn print_summary(summary: &Summary) {
    let outcome = if summary.completed {
        "victory"
    } else {
        "stopped"
    };
    println!();
    println!("outcome:        {outcome}");
    println!("hud:            {}", summary.wave_label);
    if let Some(final_wave) = summary.final_wave {
        println!("final wave:     {}", final_wave.get());
    }
    println!(
        "ticks:          {} ({:.1}s)",
        summary.ticks,
        summary.elapsed.as_secs_f64()
    );
    println!(
        "enemies:        {} of {} spawned",
        summary.progress.spawned, summary.progress.total_enemy_count
    );
    println!("defeated:       {}", summary.defeated);
    println!("leaked:         {}", summary.leaked);
    if summary.spawn_failures > 0 {
        println!("spawn retries:  {}", summary.spawn_failures);
    }
    if summary.stale_removals > 0 {
        println!("stale removals: {}", summary.stale_removals);
    }
    if summary.abandoned > 0 {
        println!("abandoned:      {}", summary.abandoned);
    }
}
