//! Headless loop that drives the world and the wave scheduler tick by tick.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use wave_defence_core::{Command, EnemyFactory, EnemyId, Event, WaveNumber};
use wave_defence_system_waves::{ProgressSnapshot, SchedulerError, WaveScheduler};
use wave_defence_world::{self as world, query, EnemyStatus, PlayerStats, World};

use crate::level::Level;

/// Knobs controlling a simulation run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunOptions {
    pub(crate) seed: u64,
    pub(crate) tick: Duration,
    pub(crate) max_ticks: u64,
    pub(crate) leak_after: Option<Duration>,
}

/// Outcome of a simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) completed: bool,
    pub(crate) final_wave: Option<WaveNumber>,
    pub(crate) ticks: u64,
    pub(crate) elapsed: Duration,
    pub(crate) defeated: u64,
    pub(crate) leaked: u64,
    pub(crate) spawn_failures: u64,
    pub(crate) stale_removals: u64,
    pub(crate) abandoned: usize,
    pub(crate) progress: ProgressSnapshot,
    pub(crate) wave_label: String,
}

/// Plays the level until the final wave is cleared or the tick budget runs out.
///
/// Every scheduler and world event is passed to `on_event` as it happens.
pub(crate) fn run(
    level: Level,
    options: RunOptions,
    mut on_event: impl FnMut(&Event),
) -> Result<Summary> {
    let mut world = World::new(level.world);
    let mut scheduler = WaveScheduler::new(
        PlayerStats::new(),
        ChaCha8Rng::seed_from_u64(options.seed),
    );

    let mut progress = Vec::new();
    scheduler
        .initialize(level.catalog, &world, &mut progress)
        .context("failed to start level")?;
    progress.iter().for_each(&mut on_event);

    let mut summary = Summary {
        completed: false,
        final_wave: None,
        ticks: 0,
        elapsed: Duration::ZERO,
        defeated: 0,
        leaked: 0,
        spawn_failures: 0,
        stale_removals: 0,
        abandoned: 0,
        progress: scheduler.progress(),
        wave_label: String::new(),
    };

    let mut world_events = Vec::new();
    while summary.ticks < options.max_ticks && !scheduler.phase().is_terminal() {
        summary.ticks += 1;
        world_events.clear();
        world::apply(
            &mut world,
            Command::Tick { dt: options.tick },
            &mut world_events,
        );
        if let Some(leak_after) = options.leak_after {
            leak_stragglers(&mut world, leak_after, &mut world_events);
        }

        for event in &world_events {
            on_event(event);
            progress.clear();
            match *event {
                Event::TimeAdvanced { now, .. } => {
                    summary.elapsed = now;
                    match scheduler.on_tick(now, &mut world, &mut progress) {
                        Ok(()) => {}
                        Err(error @ SchedulerError::Spawn { .. }) => {
                            summary.spawn_failures += 1;
                            warn!(error = %error, "spawn deferred to a later tick");
                        }
                        Err(error) => return Err(error.into()),
                    }
                }
                Event::EnemyDefeated { enemy } => {
                    summary.defeated += 1;
                    let counted = scheduler.on_enemy_removed(enemy, &mut world, &mut progress);
                    note_removal(&mut summary, enemy, counted);
                }
                Event::EnemyLeaked { enemy } => {
                    summary.leaked += 1;
                    let counted = scheduler.on_enemy_removed(enemy, &mut world, &mut progress);
                    note_removal(&mut summary, enemy, counted);
                }
                _ => {}
            }

            for update in &progress {
                if let Event::LevelFinished { final_wave } = update {
                    summary.completed = true;
                    summary.final_wave = Some(*final_wave);
                }
                on_event(update);
            }
        }
    }

    if !summary.completed {
        let outstanding = scheduler.teardown();
        summary.abandoned = outstanding.len();
        for enemy in outstanding {
            world.release(enemy);
        }
        info!(
            ticks = summary.ticks,
            abandoned = summary.abandoned,
            "simulation stopped before the level finished"
        );
    }

    summary.progress = scheduler.progress();
    summary.wave_label = scheduler.stats().wave_label();
    Ok(summary)
}

fn note_removal(summary: &mut Summary, enemy: EnemyId, counted: bool) {
    if !counted {
        summary.stale_removals += 1;
        debug!(enemy = enemy.get(), "removal was not tracked by the scheduler");
    }
}

fn leak_stragglers(world: &mut World, leak_after: Duration, out_events: &mut Vec<Event>) {
    let now = query::clock(world);
    let stragglers: Vec<_> = query::enemy_view(world)
        .iter()
        .filter(|enemy| enemy.status == EnemyStatus::Alive)
        .filter(|enemy| now.saturating_sub(enemy.spawned_at) >= leak_after)
        .map(|enemy| enemy.id)
        .collect();
    for enemy in stragglers {
        world::apply(world, Command::RemoveEnemy { enemy }, out_events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::DEFAULT_LEVEL;
    use wave_defence_system_waves::Phase;

    fn options(seed: u64) -> RunOptions {
        RunOptions {
            seed,
            tick: Duration::from_millis(100),
            max_ticks: 10_000,
            leak_after: None,
        }
    }

    #[test]
    fn default_level_runs_to_completion() {
        let level = Level::parse(DEFAULT_LEVEL).expect("default level");
        let mut finished = 0;
        let summary = run(level, options(7), |event| {
            if matches!(event, Event::LevelFinished { .. }) {
                finished += 1;
            }
        })
        .expect("simulation runs");

        assert!(summary.completed);
        assert_eq!(finished, 1);
        assert_eq!(summary.final_wave, Some(WaveNumber::new(3)));
        assert_eq!(summary.defeated, 37);
        assert_eq!(summary.leaked, 0);
        assert_eq!(summary.stale_removals, 0);
        assert_eq!(summary.progress.spawned, 37);
        assert_eq!(summary.progress.removed, 37);
        assert_eq!(summary.progress.phase, Phase::LevelComplete);
        assert_eq!(summary.wave_label, "Wave 3/3");
    }

    #[test]
    fn runs_replay_identically_for_a_seed() {
        let record = |seed| {
            let level = Level::parse(DEFAULT_LEVEL).expect("default level");
            let mut spawns = Vec::new();
            let _ = run(level, options(seed), |event| {
                if let Event::EnemySpawned { spawn_point, .. } = event {
                    spawns.push(*spawn_point);
                }
            })
            .expect("simulation runs");
            spawns
        };

        assert_eq!(record(11), record(11));
    }

    #[test]
    fn leaking_enemies_still_clear_sets() {
        let level = Level::parse(DEFAULT_LEVEL).expect("default level");
        let summary = run(
            level,
            RunOptions {
                leak_after: Some(Duration::from_millis(500)),
                ..options(3)
            },
            |_| {},
        )
        .expect("simulation runs");

        assert!(summary.completed);
        assert!(summary.leaked > 0, "brutes outlive the leak timer");
        assert_eq!(summary.defeated + summary.leaked, 37);
    }

    #[test]
    fn tick_budget_tears_the_scheduler_down() {
        let level = Level::parse(DEFAULT_LEVEL).expect("default level");
        let summary = run(
            level,
            RunOptions {
                max_ticks: 15,
                ..options(1)
            },
            |_| {},
        )
        .expect("simulation runs");

        assert!(!summary.completed);
        assert_eq!(summary.progress.phase, Phase::TornDown);
        assert_eq!(summary.wave_label, "Wave 1/3");
        assert!(summary.abandoned > 0);
    }

    #[test]
    fn untracked_removals_are_tallied() {
        let level = Level::parse(DEFAULT_LEVEL).expect("default level");
        let mut summary = run(
            level,
            RunOptions {
                max_ticks: 1,
                ..options(2)
            },
            |_| {},
        )
        .expect("simulation runs");
        assert_eq!(summary.stale_removals, 0);

        note_removal(&mut summary, EnemyId::new(4), true);
        note_removal(&mut summary, EnemyId::new(4), false);
        assert_eq!(summary.stale_removals, 1);
    }

    #[test]
    fn invalid_level_fails_to_start() {
        let level = Level::parse("version = 1").expect("minimal level parses");
        let error = run(level, options(0), |_| {}).expect_err("empty catalog must fail");
        assert!(format!("{error:#}").contains("wave catalog contains no waves"));
    }
}
