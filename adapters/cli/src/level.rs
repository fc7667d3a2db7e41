//! TOML level files describing spawn points, defences, and the wave catalog.

use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use wave_defence_core::{
    CellCoord, EnemySetDefinition, EnemyTemplate, Health, WaveCatalog, WaveDefinition,
};
use wave_defence_world::Config as WorldConfig;

const SUPPORTED_LEVEL_VERSION: u32 = 1;

/// Level bundled with the binary and used when no file is given.
pub(crate) const DEFAULT_LEVEL: &str = include_str!("../levels/default.toml");

/// Fully resolved level ready to seed the world and the scheduler.
#[derive(Clone, Debug)]
pub(crate) struct Level {
    pub(crate) world: WorldConfig,
    pub(crate) catalog: WaveCatalog,
}

impl Level {
    /// Reads and resolves a level file from disk.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read level file at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to load level from {}", path.display()))
    }

    /// Resolves a level from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file: LevelFile =
            toml::from_str(contents).context("failed to parse level toml contents")?;
        if file.version != SUPPORTED_LEVEL_VERSION {
            bail!(
                "unsupported level version {}; expected {}",
                file.version,
                SUPPORTED_LEVEL_VERSION
            );
        }

        let spawn_points = file
            .spawn_points
            .iter()
            .map(|point| CellCoord::new(point.column, point.row))
            .collect();
        let mut world = WorldConfig::new(spawn_points).with_damage_per_second(file.damage_per_second);
        if let Some(cap) = file.population_cap {
            world = world.with_population_cap(cap);
        }

        let templates: HashMap<&str, EnemyTemplate> = file
            .enemies
            .iter()
            .map(|(name, entry)| {
                (
                    name.as_str(),
                    EnemyTemplate::new(
                        name.as_str(),
                        Health::new(entry.health),
                        entry.description.as_str(),
                    ),
                )
            })
            .collect();

        let mut waves = Vec::with_capacity(file.waves.len());
        for (wave_index, wave) in file.waves.iter().enumerate() {
            let wave_number = wave_index + 1;
            let mut sets = Vec::with_capacity(wave.sets.len());
            for set in &wave.sets {
                let Some(template) = templates.get(set.enemy.as_str()) else {
                    bail!(
                        "wave {wave_number} references unknown enemy `{}`",
                        set.enemy
                    );
                };
                sets.push(EnemySetDefinition::new(set.count, template.clone()));
            }
            let time_between_spawns = seconds(wave.time_between_spawns)
                .with_context(|| format!("wave {wave_number} has an invalid spawn interval"))?;
            let time_between_sets = seconds(wave.time_between_sets)
                .with_context(|| format!("wave {wave_number} has an invalid set interval"))?;
            waves.push(WaveDefinition::new(
                sets,
                time_between_spawns,
                time_between_sets,
            ));
        }

        Ok(Self {
            world,
            catalog: WaveCatalog::new(waves),
        })
    }

    /// Enemy templates the catalog uses, in order of first appearance.
    pub(crate) fn roster(&self) -> Vec<&EnemyTemplate> {
        let mut roster: Vec<&EnemyTemplate> = Vec::new();
        for set in self.catalog.waves().iter().flat_map(WaveDefinition::sets) {
            let enemy = set.enemy();
            if roster.iter().all(|known| known.name() != enemy.name()) {
                roster.push(enemy);
            }
        }
        roster
    }
}

/// Converts a non-negative number of seconds into a [`Duration`].
pub(crate) fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("`{value}` is not a non-negative number of seconds"))
}

#[derive(Debug, Deserialize)]
struct LevelFile {
    version: u32,
    #[serde(default)]
    damage_per_second: u32,
    population_cap: Option<usize>,
    #[serde(default)]
    spawn_points: Vec<SpawnPointEntry>,
    #[serde(default)]
    enemies: HashMap<String, EnemyEntry>,
    #[serde(default)]
    waves: Vec<WaveEntry>,
}

#[derive(Debug, Deserialize)]
struct SpawnPointEntry {
    column: u32,
    row: u32,
}

#[derive(Debug, Deserialize)]
struct EnemyEntry {
    health: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WaveEntry {
    time_between_spawns: f64,
    #[serde(default)]
    time_between_sets: f64,
    #[serde(default)]
    sets: Vec<SetEntry>,
}

#[derive(Debug, Deserialize)]
struct SetEntry {
    enemy: String,
    count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wave_defence_core::{SetNumber, SpawnPointProvider, WaveNumber};
    use wave_defence_world::World;

    #[test]
    fn default_level_resolves() {
        let level = Level::parse(DEFAULT_LEVEL).expect("default level parses");
        assert_eq!(level.catalog.len(), 3);
        assert_eq!(level.catalog.total_enemy_count(), 37);

        let first = level.catalog.wave(WaveNumber::new(1)).expect("first wave");
        assert_eq!(first.time_between_spawns(), Duration::from_secs(1));
        assert_eq!(first.time_between_sets(), Duration::from_secs(4));
        let set = first.set(SetNumber::new(2)).expect("second set");
        assert_eq!(set.enemy().name(), "swarmer");
        assert_eq!(set.enemy().health(), Health::new(4));

        let world = World::new(level.world);
        assert_eq!(
            world.spawn_points(),
            vec![CellCoord::new(0, 2), CellCoord::new(0, 7)],
        );
    }

    #[test]
    fn roster_lists_each_enemy_once_with_its_description() {
        let level = Level::parse(DEFAULT_LEVEL).expect("default level parses");
        let roster = level.roster();

        let names: Vec<_> = roster.iter().map(|enemy| enemy.name()).collect();
        assert_eq!(names, vec!["crawler", "swarmer", "brute"]);
        assert_eq!(roster[2].description(), "Slow, heavily armoured. Soaks up damage.");
    }

    #[test]
    fn unknown_enemy_is_rejected() {
        let contents = r#"
            version = 1

            [[waves]]
            time_between_spawns = 1.0

            [[waves.sets]]
            enemy = "ghost"
            count = 2
        "#;
        let error = Level::parse(contents).expect_err("unknown enemy must fail");
        assert!(
            error.to_string().contains("unknown enemy `ghost`"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let error = Level::parse("version = 7").expect_err("version 7 must fail");
        assert!(error.to_string().contains("unsupported level version 7"));
    }

    #[test]
    fn negative_intervals_are_rejected() {
        let contents = r#"
            version = 1

            [enemies.grunt]
            health = 3

            [[waves]]
            time_between_spawns = -1.0

            [[waves.sets]]
            enemy = "grunt"
            count = 1
        "#;
        let error = Level::parse(contents).expect_err("negative interval must fail");
        assert!(error.to_string().contains("invalid spawn interval"));
    }

    #[test]
    fn empty_sections_are_left_to_scheduler_validation() {
        let level = Level::parse("version = 1").expect("minimal level parses");
        assert!(level.catalog.is_empty());
    }
}
