#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick-driven wave scheduler that decides when and where enemies enter play.
//!
//! The scheduler walks a [`WaveCatalog`] one enemy set at a time. Each call to
//! [`WaveScheduler::on_tick`] spawns at most one enemy from the active set once
//! the wave's spawn interval has elapsed. Every spawned enemy is registered
//! with the scheduler's death observer; [`WaveScheduler::on_enemy_removed`]
//! counts removals and, once the whole set has left play, activates the next
//! set or wave. Progress is reported through the injected [`StatsSink`] and
//! as [`Event`] values pushed into caller-provided buffers.

mod progression;

use std::collections::BTreeSet;
use std::time::Duration;

use rand::{seq::SliceRandom, RngCore};
use thiserror::Error;
use tracing::{debug, info, warn};
use wave_defence_core::{
    CellCoord, EnemyFactory, EnemyId, EnemySetDefinition, Event, SetNumber, SpawnError,
    SpawnPointProvider, StatsSink, WaveCatalog, WaveNumber,
};

pub use progression::{Phase, ProgressSnapshot, ProgressionState};

/// Reasons a level configuration is rejected at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The catalog does not contain any waves.
    #[error("wave catalog contains no waves")]
    EmptyCatalog,
    /// A wave does not contain any enemy sets.
    #[error("wave {} contains no enemy sets", .wave.get())]
    EmptyWave {
        /// Offending wave.
        wave: WaveNumber,
    },
    /// An enemy set would spawn no enemies.
    #[error("set {} of wave {} spawns no enemies", .set.get(), .wave.get())]
    EmptySet {
        /// Wave containing the offending set.
        wave: WaveNumber,
        /// Offending set.
        set: SetNumber,
    },
    /// The spawn-point provider yielded no entry locations.
    #[error("no spawn points are available")]
    NoSpawnPoints,
}

/// Failures surfaced by the wave scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The level cannot start with the supplied catalog or spawn points.
    #[error("invalid level configuration")]
    Configuration(#[from] ConfigurationError),
    /// The enemy factory refused a spawn; counters were left untouched.
    #[error("failed to spawn enemy for wave {} set {}", .wave.get(), .set.get())]
    Spawn {
        /// Wave the spawn belonged to.
        wave: WaveNumber,
        /// Set the spawn belonged to.
        set: SetNumber,
        /// Error reported by the factory.
        #[source]
        source: SpawnError,
    },
    /// The enemy factory returned a handle that is still registered; counters were left untouched.
    #[error("enemy factory reused live handle {} in wave {} set {}", .enemy.get(), .wave.get(), .set.get())]
    DuplicateHandle {
        /// Wave the spawn belonged to.
        wave: WaveNumber,
        /// Set the spawn belonged to.
        set: SetNumber,
        /// Handle the factory handed out twice.
        enemy: EnemyId,
    },
}

/// Progression state machine driving enemy waves through a level.
#[derive(Debug)]
pub struct WaveScheduler<S, R> {
    stats: S,
    rng: R,
    catalog: WaveCatalog,
    spawn_points: Vec<CellCoord>,
    state: ProgressionState,
    phase: Phase,
    observers: BTreeSet<EnemyId>,
    spawned: u64,
    removed: u64,
}

impl<S, R> WaveScheduler<S, R>
where
    S: StatsSink,
    R: RngCore,
{
    /// Creates an idle scheduler reporting to `stats` and choosing spawn points with `rng`.
    #[must_use]
    pub fn new(stats: S, rng: R) -> Self {
        Self {
            stats,
            rng,
            catalog: WaveCatalog::default(),
            spawn_points: Vec::new(),
            state: ProgressionState::default(),
            phase: Phase::Uninitialized,
            observers: BTreeSet::new(),
            spawned: 0,
            removed: 0,
        }
    }

    /// Accepts the level's wave catalog and begins the first wave.
    ///
    /// Spawn points are queried from `spawn_points` exactly once. The catalog
    /// and spawn points are validated before any state changes, so a rejected
    /// configuration leaves the scheduler untouched and the stats sink
    /// uninformed. Calling this again after a successful initialization does
    /// nothing.
    pub fn initialize<P>(
        &mut self,
        catalog: WaveCatalog,
        spawn_points: &P,
        out: &mut Vec<Event>,
    ) -> Result<(), SchedulerError>
    where
        P: SpawnPointProvider + ?Sized,
    {
        if self.state.is_initialized() {
            debug!("wave scheduler already initialized; ignoring");
            return Ok(());
        }

        let points = spawn_points.spawn_points();
        validate(&catalog, &points)?;

        let total_waves = u32::try_from(catalog.len()).unwrap_or(u32::MAX);
        self.state.total_enemy_count = catalog.total_enemy_count();
        self.state.initialized = true;
        self.catalog = catalog;
        self.spawn_points = points;

        info!(
            waves = total_waves,
            enemies = self.state.total_enemy_count,
            spawn_points = self.spawn_points.len(),
            "wave catalog loaded"
        );
        self.stats.set_total_waves(total_waves);
        self.advance_wave(out);
        Ok(())
    }

    /// Evaluates spawn timing for the current frame.
    ///
    /// Spawns at most one enemy per call, even if several spawn intervals
    /// elapsed since the previous call. A factory failure, or a handle that is
    /// already registered, is returned without consuming the pending spawn, so
    /// the next tick retries it.
    pub fn on_tick<F>(
        &mut self,
        now: Duration,
        factory: &mut F,
        out: &mut Vec<Event>,
    ) -> Result<(), SchedulerError>
    where
        F: EnemyFactory + ?Sized,
    {
        if self.phase != Phase::SpawningSet || !self.state.spawn_ready(now) {
            return Ok(());
        }

        let wave = self.state.current_wave();
        let set = self.state.current_set();
        let Some(wave_definition) = self.catalog.wave(wave) else {
            return Ok(());
        };
        let Some(set_definition) = wave_definition.set(set) else {
            return Ok(());
        };
        let Some(spawn_point) = self.spawn_points.choose(&mut self.rng).copied() else {
            return Ok(());
        };

        let enemy = match factory.spawn(set_definition.enemy(), spawn_point) {
            Ok(enemy) => enemy,
            Err(source) => {
                warn!(
                    wave = wave.get(),
                    set = set.get(),
                    error = %source,
                    "enemy factory rejected spawn"
                );
                return Err(SchedulerError::Spawn { wave, set, source });
            }
        };

        if self.observers.contains(&enemy) {
            warn!(
                enemy = enemy.get(),
                wave = wave.get(),
                set = set.get(),
                "enemy factory reused a live handle"
            );
            return Err(SchedulerError::DuplicateHandle { wave, set, enemy });
        }

        self.state
            .record_spawn(now, wave_definition.time_between_spawns());
        let _ = self.observers.insert(enemy);
        self.spawned = self.spawned.saturating_add(1);

        debug!(
            enemy = enemy.get(),
            wave = wave.get(),
            set = set.get(),
            column = spawn_point.column(),
            row = spawn_point.row(),
            remaining = self.state.remaining_to_spawn,
            "enemy spawned"
        );
        out.push(Event::EnemySpawned {
            enemy,
            wave,
            set,
            spawn_point,
        });
        Ok(())
    }

    /// Death observer invoked when a spawned enemy leaves play.
    ///
    /// Each registered enemy is counted once; the observer is deregistered on
    /// the first notification. Returns `false` for unknown, repeated, or
    /// post-teardown notifications, which leave the scheduler unchanged.
    pub fn on_enemy_removed<F>(
        &mut self,
        enemy: EnemyId,
        factory: &mut F,
        out: &mut Vec<Event>,
    ) -> bool
    where
        F: EnemyFactory + ?Sized,
    {
        if !self.observers.remove(&enemy) {
            warn!(
                enemy = enemy.get(),
                "ignoring removal of enemy without a registered observer"
            );
            return false;
        }

        self.removed = self.removed.saturating_add(1);
        factory.release(enemy);
        out.push(Event::EnemyRemoved { enemy });

        if self.state.record_removal() {
            self.advance_set(out);
        }
        true
    }

    /// Deregisters every outstanding death observer and stops the scheduler.
    ///
    /// Returns the handles of enemies that were still in play, in ascending
    /// order, so the caller can dispose of them.
    pub fn teardown(&mut self) -> Vec<EnemyId> {
        let outstanding: Vec<EnemyId> = std::mem::take(&mut self.observers).into_iter().collect();
        self.state.halt();
        self.phase = Phase::TornDown;
        info!(outstanding = outstanding.len(), "wave scheduler torn down");
        outstanding
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Reports whether the final wave has been cleared.
    #[must_use]
    pub fn is_level_complete(&self) -> bool {
        self.phase == Phase::LevelComplete
    }

    /// Read-only access to the progression cursors and counters.
    #[must_use]
    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    /// Captures a summary of the scheduler's progress.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: self.phase,
            wave: self.state.current_wave(),
            set: self.state.current_set(),
            total_waves: u32::try_from(self.catalog.len()).unwrap_or(u32::MAX),
            remaining_to_spawn: self.state.remaining_to_spawn(),
            remaining_alive: self.state.remaining_alive(),
            total_enemy_count: self.state.total_enemy_count(),
            spawned: self.spawned,
            removed: self.removed,
        }
    }

    /// Enemies whose death observer is still registered, in ascending order.
    pub fn registered_enemies(&self) -> impl Iterator<Item = EnemyId> + '_ {
        self.observers.iter().copied()
    }

    /// Borrows the injected stats sink.
    #[must_use]
    pub fn stats(&self) -> &S {
        &self.stats
    }

    fn advance_set(&mut self, out: &mut Vec<Event>) {
        let wave = self.state.current_wave();
        let next = SetNumber::new(self.state.current_set.saturating_add(1));
        let enemy_count = self
            .catalog
            .wave(wave)
            .and_then(|definition| definition.set(next))
            .map(EnemySetDefinition::enemy_count);

        match enemy_count {
            Some(enemy_count) => {
                self.state.activate_set(next.get(), enemy_count);
                self.phase = Phase::SpawningSet;
                debug!(
                    wave = wave.get(),
                    set = next.get(),
                    enemies = enemy_count,
                    "enemy set started"
                );
                out.push(Event::SetStarted {
                    wave,
                    set: next,
                    enemy_count,
                });
            }
            None => {
                info!(wave = wave.get(), "wave completed");
                out.push(Event::WaveCompleted { wave });
                self.advance_wave(out);
            }
        }
    }

    fn advance_wave(&mut self, out: &mut Vec<Event>) {
        let next = WaveNumber::new(self.state.current_wave.saturating_add(1));
        if self.catalog.wave(next).is_none() {
            let final_wave = self.state.current_wave();
            self.state.halt();
            self.phase = Phase::LevelComplete;
            info!(final_wave = final_wave.get(), "level finished");
            out.push(Event::LevelFinished { final_wave });
            return;
        }

        self.state.activate_wave(next.get());
        self.stats.set_current_wave(next.get());
        info!(wave = next.get(), "wave started");
        out.push(Event::WaveStarted { wave: next });
        self.advance_set(out);
    }
}

fn validate(catalog: &WaveCatalog, spawn_points: &[CellCoord]) -> Result<(), ConfigurationError> {
    if catalog.is_empty() {
        return Err(ConfigurationError::EmptyCatalog);
    }

    for (wave_index, wave) in (1u32..).zip(catalog.waves()) {
        let wave_number = WaveNumber::new(wave_index);
        if wave.sets().is_empty() {
            return Err(ConfigurationError::EmptyWave { wave: wave_number });
        }
        for (set_index, set) in (1u32..).zip(wave.sets()) {
            if set.enemy_count() == 0 {
                return Err(ConfigurationError::EmptySet {
                    wave: wave_number,
                    set: SetNumber::new(set_index),
                });
            }
        }
    }

    if spawn_points.is_empty() {
        return Err(ConfigurationError::NoSpawnPoints);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wave_defence_core::{EnemyTemplate, Health, WaveDefinition};

    fn wave(counts: &[u32]) -> WaveDefinition {
        WaveDefinition::new(
            counts
                .iter()
                .map(|&count| {
                    EnemySetDefinition::new(
                        count,
                        EnemyTemplate::new("grunt", Health::new(1), ""),
                    )
                })
                .collect(),
            Duration::from_secs(1),
            Duration::from_secs(3),
        )
    }

    #[test]
    fn validation_reports_first_offending_entry() {
        let spawn_points = [CellCoord::new(0, 0)];

        assert_eq!(
            validate(&WaveCatalog::default(), &spawn_points),
            Err(ConfigurationError::EmptyCatalog),
        );
        assert_eq!(
            validate(&WaveCatalog::new(vec![wave(&[2]), wave(&[])]), &spawn_points),
            Err(ConfigurationError::EmptyWave {
                wave: WaveNumber::new(2)
            }),
        );
        assert_eq!(
            validate(&WaveCatalog::new(vec![wave(&[2, 0])]), &spawn_points),
            Err(ConfigurationError::EmptySet {
                wave: WaveNumber::new(1),
                set: SetNumber::new(2),
            }),
        );
        assert_eq!(
            validate(&WaveCatalog::new(vec![wave(&[1])]), &[]),
            Err(ConfigurationError::NoSpawnPoints),
        );
        assert_eq!(
            validate(&WaveCatalog::new(vec![wave(&[1, 4])]), &spawn_points),
            Ok(())
        );
    }

    #[test]
    fn configuration_errors_describe_location() {
        let error = ConfigurationError::EmptySet {
            wave: WaveNumber::new(3),
            set: SetNumber::new(2),
        };
        assert_eq!(error.to_string(), "set 2 of wave 3 spawns no enemies");
    }
}
