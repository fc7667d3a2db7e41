#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for Wave Defence.
//!
//! The world owns the playfield's spawn points and every enemy entity. It
//! mutates only through [`apply`], reports what happened as [`Event`] values,
//! and acts as the enemy factory and spawn-point provider for the wave
//! scheduler. Enemies that leave play stay behind as corpses until the
//! scheduler releases them through [`EnemyFactory::release`].

mod stats;

use std::time::Duration;

use tracing::{debug, trace};
use wave_defence_core::{
    CellCoord, Command, EnemyFactory, EnemyId, EnemyTemplate, Event, Health, SpawnError,
    SpawnPointProvider, WELCOME_BANNER,
};

pub use stats::PlayerStats;

const DEFAULT_POPULATION_CAP: usize = 256;
const MILLIS_PER_SECOND: u128 = 1_000;

/// Configuration parameters required to construct the world.
#[derive(Clone, Debug)]
pub struct Config {
    spawn_points: Vec<CellCoord>,
    damage_per_second: u32,
    population_cap: usize,
}

impl Config {
    /// Creates a configuration with the provided entry points and no defences.
    #[must_use]
    pub fn new(spawn_points: Vec<CellCoord>) -> Self {
        Self {
            spawn_points,
            damage_per_second: 0,
            population_cap: DEFAULT_POPULATION_CAP,
        }
    }

    /// Sets the damage every live enemy takes per second of simulated time.
    #[must_use]
    pub fn with_damage_per_second(mut self, damage_per_second: u32) -> Self {
        self.damage_per_second = damage_per_second;
        self
    }

    /// Limits how many enemies may occupy the playfield at once.
    #[must_use]
    pub fn with_population_cap(mut self, population_cap: usize) -> Self {
        self.population_cap = population_cap;
        self
    }
}

/// Represents the authoritative Wave Defence level state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    clock: Duration,
    spawn_points: Vec<CellCoord>,
    damage_per_second: u32,
    population_cap: usize,
    enemies: Vec<Enemy>,
    next_enemy_id: u32,
}

impl World {
    /// Creates a new world using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            banner: WELCOME_BANNER,
            clock: Duration::ZERO,
            spawn_points: config.spawn_points,
            damage_per_second: config.damage_per_second,
            population_cap: config.population_cap,
            enemies: Vec::new(),
            next_enemy_id: 0,
        }
    }

    fn enemy_mut(&mut self, enemy: EnemyId) -> Option<&mut Enemy> {
        self.enemies
            .binary_search_by_key(&enemy, |candidate| candidate.id)
            .ok()
            .map(|index| &mut self.enemies[index])
    }

    fn live_count(&self) -> usize {
        self.enemies.iter().filter(|enemy| enemy.is_alive()).count()
    }
}

impl SpawnPointProvider for World {
    fn spawn_points(&self) -> Vec<CellCoord> {
        self.spawn_points.clone()
    }
}

impl EnemyFactory for World {
    fn spawn(&mut self, template: &EnemyTemplate, at: CellCoord) -> Result<EnemyId, SpawnError> {
        if !self.spawn_points.contains(&at) {
            return Err(SpawnError::UnknownSpawnPoint { spawn_point: at });
        }
        if self.live_count() >= self.population_cap {
            return Err(SpawnError::PopulationCap {
                cap: self.population_cap,
            });
        }

        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self
            .next_enemy_id
            .checked_add(1)
            .ok_or(SpawnError::HandlesExhausted)?;
        trace!(enemy = id.get(), kind = template.name(), "enemy entity created");
        self.enemies.push(Enemy {
            id,
            kind: template.name().to_owned(),
            cell: at,
            health: template.health(),
            spawned_at: self.clock,
            exposure: Duration::ZERO,
            exposure_damage: 0,
            status: EnemyStatus::Alive,
        });
        Ok(id)
    }

    fn release(&mut self, enemy: EnemyId) {
        if let Ok(index) = self
            .enemies
            .binary_search_by_key(&enemy, |candidate| candidate.id)
        {
            let released = self.enemies.remove(index);
            trace!(enemy = released.id.get(), "enemy entity released");
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced {
                dt,
                now: world.clock,
            });

            let damage_per_second = world.damage_per_second;
            if damage_per_second == 0 {
                return;
            }
            for enemy in world.enemies.iter_mut().filter(|enemy| enemy.is_alive()) {
                enemy.expose(dt, damage_per_second);
                if enemy.health.is_zero() {
                    enemy.status = EnemyStatus::Defeated;
                    debug!(enemy = enemy.id.get(), "enemy defeated by defences");
                    out_events.push(Event::EnemyDefeated { enemy: enemy.id });
                }
            }
        }
        Command::DamageEnemy { enemy, amount } => {
            let Some(target) = world.enemy_mut(enemy) else {
                return;
            };
            if !target.is_alive() {
                return;
            }
            target.health = target.health.saturating_sub(amount);
            if target.health.is_zero() {
                target.status = EnemyStatus::Defeated;
                debug!(enemy = enemy.get(), "enemy defeated");
                out_events.push(Event::EnemyDefeated { enemy });
            }
        }
        Command::RemoveEnemy { enemy } => {
            let Some(target) = world.enemy_mut(enemy) else {
                return;
            };
            if !target.is_alive() {
                return;
            }
            target.status = EnemyStatus::Leaked;
            debug!(enemy = enemy.get(), "enemy reached the goal");
            out_events.push(Event::EnemyLeaked { enemy });
        }
    }
}

/// Whether an enemy is still in play or how it left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyStatus {
    /// The enemy is on the playfield.
    Alive,
    /// The enemy ran out of health and awaits release.
    Defeated,
    /// The enemy reached the goal and awaits release.
    Leaked,
}

#[derive(Clone, Debug)]
struct Enemy {
    id: EnemyId,
    kind: String,
    cell: CellCoord,
    health: Health,
    spawned_at: Duration,
    exposure: Duration,
    exposure_damage: u128,
    status: EnemyStatus,
}

impl Enemy {
    fn is_alive(&self) -> bool {
        self.status == EnemyStatus::Alive
    }

    fn expose(&mut self, dt: Duration, damage_per_second: u32) {
        self.exposure = self.exposure.saturating_add(dt);
        let due = self.exposure.as_millis() * u128::from(damage_per_second) / MILLIS_PER_SECOND;
        let delta = due.saturating_sub(self.exposure_damage);
        self.exposure_damage = due;
        let delta = u32::try_from(delta).unwrap_or(u32::MAX);
        self.health = self.health.saturating_sub(Health::new(delta));
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{EnemyStatus, World};
    use wave_defence_core::{CellCoord, EnemyId, Health};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Level time accumulated from every applied tick.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of enemies still in play, excluding unreleased corpses.
    #[must_use]
    pub fn live_enemy_count(world: &World) -> usize {
        world.live_count()
    }

    /// Captures a read-only view of every enemy entity, live or awaiting release.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots = world
            .enemies
            .iter()
            .map(|enemy| EnemySnapshot {
                id: enemy.id,
                kind: enemy.kind.clone(),
                cell: enemy.cell,
                health: enemy.health,
                spawned_at: enemy.spawned_at,
                status: enemy.status,
            })
            .collect();
        EnemyView { snapshots }
    }

    /// Looks up a single enemy entity.
    #[must_use]
    pub fn enemy(world: &World, enemy: EnemyId) -> Option<EnemySnapshot> {
        enemy_view(world).into_vec().into_iter().find(|snapshot| snapshot.id == enemy)
    }

    /// Read-only snapshot describing all enemy entities.
    #[derive(Clone, Debug)]
    pub struct EnemyView {
        snapshots: Vec<EnemySnapshot>,
    }

    impl EnemyView {
        /// Iterator over the captured snapshots in ascending id order.
        pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<EnemySnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single enemy used for queries.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct EnemySnapshot {
        /// Handle assigned when the enemy was spawned.
        pub id: EnemyId,
        /// Name of the enemy template.
        pub kind: String,
        /// Entry point the enemy was spawned at.
        pub cell: CellCoord,
        /// Health remaining.
        pub health: Health,
        /// Level time at which the enemy was spawned.
        pub spawned_at: Duration,
        /// Whether the enemy is in play or awaiting release.
        pub status: EnemyStatus,
    }
}
