#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Wave Defence engine.
//!
//! This crate defines the message surface and the static wave catalog that
//! connect adapters, the authoritative world, and the wave scheduler.
//! Adapters submit [`Command`] values describing desired world mutations, the
//! world executes them via its `apply` entry point and broadcasts [`Event`]
//! values. The scheduler reacts to those events, talks to the world through
//! the collaborator traits defined here ([`SpawnPointProvider`],
//! [`EnemyFactory`], [`StatsSink`]), and reports its own progression as
//! further [`Event`] values.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Wave Defence.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Applies damage to a single live enemy.
    DamageEnemy {
        /// Identifier of the enemy being hit.
        enemy: EnemyId,
        /// Amount of health removed by the hit.
        amount: Health,
    },
    /// Removes an enemy that slipped past the defences and reached the goal.
    RemoveEnemy {
        /// Identifier of the enemy leaving the playfield.
        enemy: EnemyId,
    },
}

/// Events broadcast by the world and the wave scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Level time after applying the tick.
        now: Duration,
    },
    /// Reports that an enemy lost all of its health and left play.
    EnemyDefeated {
        /// Identifier of the defeated enemy.
        enemy: EnemyId,
    },
    /// Reports that an enemy reached the goal and left play.
    EnemyLeaked {
        /// Identifier of the leaking enemy.
        enemy: EnemyId,
    },
    /// Announces that a wave became the current wave.
    WaveStarted {
        /// Number of the wave that started.
        wave: WaveNumber,
    },
    /// Announces that an enemy set became active.
    SetStarted {
        /// Wave containing the set.
        wave: WaveNumber,
        /// Number of the set within its wave.
        set: SetNumber,
        /// Enemies the set will spawn.
        enemy_count: u32,
    },
    /// Confirms that the scheduler spawned an enemy.
    EnemySpawned {
        /// Handle returned by the enemy factory.
        enemy: EnemyId,
        /// Wave the enemy belongs to.
        wave: WaveNumber,
        /// Set the enemy belongs to.
        set: SetNumber,
        /// Entry point the enemy was placed at.
        spawn_point: CellCoord,
    },
    /// Confirms that the scheduler accounted for an enemy leaving play.
    EnemyRemoved {
        /// Handle of the enemy that was released.
        enemy: EnemyId,
    },
    /// Announces that every set of a wave has been cleared.
    WaveCompleted {
        /// Number of the completed wave.
        wave: WaveNumber,
    },
    /// Announces that the final wave has been cleared.
    LevelFinished {
        /// Number of the last wave in the level.
        final_wave: WaveNumber,
    },
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Unique handle assigned to an enemy by the enemy factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One-based position of a wave within the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// Creates a new wave number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric wave number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One-based position of an enemy set within its wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetNumber(u32);

impl SetNumber {
    /// Creates a new set number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric set number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Hit points carried by an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric health value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no health remains.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts damage, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(self, damage: Health) -> Self {
        Self(self.0.saturating_sub(damage.0))
    }
}

/// Visual and stat template shared by every enemy of one type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    name: String,
    health: Health,
    description: String,
}

impl EnemyTemplate {
    /// Creates a new enemy template.
    #[must_use]
    pub fn new(name: impl Into<String>, health: Health, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            health,
            description: description.into(),
        }
    }

    /// Display name of the enemy type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Health each enemy of this type starts with.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Short description shown when the enemy is inspected.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Homogeneous batch of enemies spawned one after another within a wave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySetDefinition {
    enemy_count: u32,
    enemy: EnemyTemplate,
}

impl EnemySetDefinition {
    /// Creates a set of `enemy_count` enemies sharing one template.
    #[must_use]
    pub const fn new(enemy_count: u32, enemy: EnemyTemplate) -> Self {
        Self { enemy_count, enemy }
    }

    /// Number of enemies the set spawns.
    #[must_use]
    pub const fn enemy_count(&self) -> u32 {
        self.enemy_count
    }

    /// Template used for every enemy in the set.
    #[must_use]
    pub const fn enemy(&self) -> &EnemyTemplate {
        &self.enemy
    }
}

/// Ordered group of enemy sets sharing spawn pacing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDefinition {
    sets: Vec<EnemySetDefinition>,
    time_between_spawns: Duration,
    time_between_sets: Duration,
}

impl WaveDefinition {
    /// Creates a new wave definition.
    #[must_use]
    pub fn new(
        sets: Vec<EnemySetDefinition>,
        time_between_spawns: Duration,
        time_between_sets: Duration,
    ) -> Self {
        Self {
            sets,
            time_between_spawns,
            time_between_sets,
        }
    }

    /// Enemy sets in spawn order.
    #[must_use]
    pub fn sets(&self) -> &[EnemySetDefinition] {
        &self.sets
    }

    /// Looks up a set by its one-based number.
    #[must_use]
    pub fn set(&self, number: SetNumber) -> Option<&EnemySetDefinition> {
        let index = usize::try_from(number.get()).ok()?.checked_sub(1)?;
        self.sets.get(index)
    }

    /// Delay between individual spawns within any set of this wave.
    #[must_use]
    pub const fn time_between_spawns(&self) -> Duration {
        self.time_between_spawns
    }

    /// Configured pause between sets.
    ///
    /// Progression never waits on this value: the next set starts spawning
    /// as soon as the previous one is cleared.
    #[must_use]
    pub const fn time_between_sets(&self) -> Duration {
        self.time_between_sets
    }

    /// Number of enemies spawned across every set of the wave.
    #[must_use]
    pub fn enemy_count(&self) -> u64 {
        self.sets
            .iter()
            .map(|set| u64::from(set.enemy_count()))
            .sum()
    }
}

/// Ordered list of waves making up a level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveCatalog {
    waves: Vec<WaveDefinition>,
}

impl WaveCatalog {
    /// Creates a catalog from waves in play order.
    #[must_use]
    pub fn new(waves: Vec<WaveDefinition>) -> Self {
        Self { waves }
    }

    /// Waves in play order.
    #[must_use]
    pub fn waves(&self) -> &[WaveDefinition] {
        &self.waves
    }

    /// Looks up a wave by its one-based number.
    #[must_use]
    pub fn wave(&self, number: WaveNumber) -> Option<&WaveDefinition> {
        let index = usize::try_from(number.get()).ok()?.checked_sub(1)?;
        self.waves.get(index)
    }

    /// Number of waves in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    /// Reports whether the catalog holds no waves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Sum of every set's enemy count across every wave.
    #[must_use]
    pub fn total_enemy_count(&self) -> u64 {
        self.waves.iter().map(WaveDefinition::enemy_count).sum()
    }
}

/// Read-only source of the cells where enemies may enter the playfield.
pub trait SpawnPointProvider {
    /// Enumerates every valid entry location.
    fn spawn_points(&self) -> Vec<CellCoord>;
}

/// Creates enemies on request and disposes of them once they leave play.
pub trait EnemyFactory {
    /// Instantiates an enemy of the given type at the provided entry point.
    fn spawn(&mut self, enemy: &EnemyTemplate, at: CellCoord) -> Result<EnemyId, SpawnError>;

    /// Releases a removed enemy so its entity can be torn down.
    fn release(&mut self, enemy: EnemyId);
}

/// Receives wave-count updates for the HUD and scoring.
pub trait StatsSink {
    /// Records how many waves the level contains.
    fn set_total_waves(&mut self, total: u32);

    /// Records which wave is currently being played.
    fn set_current_wave(&mut self, wave: u32);
}

/// Reasons an enemy factory may refuse to instantiate an enemy.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// The requested entry point is not part of the playfield.
    #[error("cell ({}, {}) is not a spawn point", .spawn_point.column(), .spawn_point.row())]
    UnknownSpawnPoint {
        /// Cell that was requested.
        spawn_point: CellCoord,
    },
    /// The playfield already holds as many enemies as it supports.
    #[error("enemy population cap of {cap} reached")]
    PopulationCap {
        /// Maximum number of enemies supported at once.
        cap: usize,
    },
    /// Every enemy handle the factory can issue has been handed out.
    #[error("enemy handles exhausted")]
    HandlesExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str) -> EnemyTemplate {
        EnemyTemplate::new(name, Health::new(10), "test enemy")
    }

    fn catalog() -> WaveCatalog {
        WaveCatalog::new(vec![
            WaveDefinition::new(
                vec![
                    EnemySetDefinition::new(3, template("grunt")),
                    EnemySetDefinition::new(2, template("runner")),
                ],
                Duration::from_secs(1),
                Duration::from_secs(5),
            ),
            WaveDefinition::new(
                vec![EnemySetDefinition::new(7, template("brute"))],
                Duration::from_millis(500),
                Duration::ZERO,
            ),
        ])
    }

    #[test]
    fn total_enemy_count_sums_every_set() {
        let catalog = catalog();
        assert_eq!(catalog.total_enemy_count(), 12);
        assert_eq!(catalog.waves()[0].enemy_count(), 5);
    }

    #[test]
    fn lookups_are_one_based() {
        let catalog = catalog();
        assert!(catalog.wave(WaveNumber::new(0)).is_none());
        assert!(catalog.wave(WaveNumber::new(3)).is_none());

        let wave = catalog.wave(WaveNumber::new(1)).expect("first wave");
        assert!(wave.set(SetNumber::new(0)).is_none());
        assert_eq!(
            wave.set(SetNumber::new(2)).map(|set| set.enemy().name()),
            Some("runner"),
        );
        assert!(wave.set(SetNumber::new(3)).is_none());
    }

    #[test]
    fn health_subtraction_clamps_at_zero() {
        let health = Health::new(4).saturating_sub(Health::new(9));
        assert!(health.is_zero());
    }

    #[test]
    fn catalog_round_trips_through_bincode() {
        let catalog = catalog();
        let bytes = bincode::serialize(&catalog).expect("serialize");
        let restored: WaveCatalog = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, catalog);
    }

    #[test]
    fn spawn_errors_describe_the_failure() {
        let error = SpawnError::UnknownSpawnPoint {
            spawn_point: CellCoord::new(2, 7),
        };
        assert_eq!(error.to_string(), "cell (2, 7) is not a spawn point");
        assert_eq!(
            SpawnError::PopulationCap { cap: 4 }.to_string(),
            "enemy population cap of 4 reached",
        );
    }
}
