//! Mutable cursor into the wave catalog plus the live enemy counters.

use std::time::Duration;

use wave_defence_core::{SetNumber, WaveNumber};

/// Lifecycle stage of the wave scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No catalog has been accepted yet.
    Uninitialized,
    /// An enemy set is active and spawning or waiting to be cleared.
    SpawningSet,
    /// Every wave has been cleared; no further spawns occur.
    LevelComplete,
    /// The scheduler was torn down and ignores further input.
    TornDown,
}

impl Phase {
    /// Reports whether the phase can never be left again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::LevelComplete | Self::TornDown)
    }
}

/// Progression cursors and counters owned exclusively by the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressionState {
    pub(crate) current_wave: u32,
    pub(crate) current_set: u32,
    pub(crate) remaining_to_spawn: u32,
    pub(crate) remaining_alive: u32,
    pub(crate) next_spawn_eligible: Option<Duration>,
    pub(crate) total_enemy_count: u64,
    pub(crate) initialized: bool,
}

impl ProgressionState {
    /// One-based number of the active wave, zero before initialization.
    #[must_use]
    pub const fn current_wave(&self) -> WaveNumber {
        WaveNumber::new(self.current_wave)
    }

    /// One-based number of the active set within its wave, zero before initialization.
    #[must_use]
    pub const fn current_set(&self) -> SetNumber {
        SetNumber::new(self.current_set)
    }

    /// Enemies in the active set that have not been instantiated yet.
    #[must_use]
    pub const fn remaining_to_spawn(&self) -> u32 {
        self.remaining_to_spawn
    }

    /// Enemies in the active set that have not reported removal yet.
    #[must_use]
    pub const fn remaining_alive(&self) -> u32 {
        self.remaining_alive
    }

    /// Earliest level time at which the next spawn may happen.
    ///
    /// `None` means the next spawn is eligible immediately.
    #[must_use]
    pub const fn next_spawn_eligible(&self) -> Option<Duration> {
        self.next_spawn_eligible
    }

    /// Sum of every set's enemy count across the whole catalog.
    #[must_use]
    pub const fn total_enemy_count(&self) -> u64 {
        self.total_enemy_count
    }

    /// Reports whether a catalog has been accepted.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn spawn_ready(&self, now: Duration) -> bool {
        if self.remaining_to_spawn == 0 {
            return false;
        }
        self.next_spawn_eligible
            .map_or(true, |eligible| now >= eligible)
    }

    pub(crate) fn record_spawn(&mut self, now: Duration, time_between_spawns: Duration) {
        debug_assert!(self.remaining_to_spawn > 0, "record_spawn requires pending enemies");
        self.remaining_to_spawn -= 1;
        self.next_spawn_eligible = Some(now.saturating_add(time_between_spawns));
    }

    /// Counts one removal and reports whether the active set is now cleared.
    pub(crate) fn record_removal(&mut self) -> bool {
        self.remaining_alive = self.remaining_alive.saturating_sub(1);
        self.remaining_alive == 0
    }

    pub(crate) fn activate_set(&mut self, set: u32, enemy_count: u32) {
        self.current_set = set;
        self.remaining_to_spawn = enemy_count;
        self.remaining_alive = enemy_count;
    }

    pub(crate) fn activate_wave(&mut self, wave: u32) {
        self.current_wave = wave;
        self.current_set = 0;
    }

    pub(crate) fn halt(&mut self) {
        self.remaining_to_spawn = 0;
    }
}

/// Read-only summary of the scheduler's progress for HUD and scoring consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Lifecycle stage of the scheduler.
    pub phase: Phase,
    /// Active wave, or the final wave once the level is complete.
    pub wave: WaveNumber,
    /// Active set within the wave.
    pub set: SetNumber,
    /// Number of waves in the catalog.
    pub total_waves: u32,
    /// Enemies of the active set still waiting to spawn.
    pub remaining_to_spawn: u32,
    /// Enemies of the active set that have not been removed yet.
    pub remaining_alive: u32,
    /// Sum of all enemies across the catalog.
    pub total_enemy_count: u64,
    /// Enemies spawned since initialization.
    pub spawned: u64,
    /// Enemies whose removal has been accounted for since initialization.
    pub removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_spawn_is_eligible_immediately() {
        let mut state = ProgressionState::default();
        assert!(!state.spawn_ready(Duration::ZERO), "nothing pending yet");

        state.activate_set(1, 2);
        assert!(state.spawn_ready(Duration::ZERO));

        state.record_spawn(Duration::ZERO, Duration::from_secs(1));
        assert!(!state.spawn_ready(Duration::from_millis(999)));
        assert!(state.spawn_ready(Duration::from_secs(1)));
    }

    #[test]
    fn removal_counter_never_underflows() {
        let mut state = ProgressionState::default();
        state.activate_set(1, 1);
        assert!(state.record_removal());
        assert!(state.record_removal());
        assert_eq!(state.remaining_alive(), 0);
    }

    #[test]
    fn activating_a_wave_rewinds_the_set_cursor() {
        let mut state = ProgressionState::default();
        state.activate_wave(1);
        state.activate_set(3, 4);
        state.activate_wave(2);
        assert_eq!(state.current_wave(), WaveNumber::new(2));
        assert_eq!(state.current_set(), SetNumber::new(0));
        assert_eq!(state.remaining_to_spawn(), 4, "counters belong to the set");
    }

    #[test]
    fn terminal_phases() {
        assert!(Phase::LevelComplete.is_terminal());
        assert!(Phase::TornDown.is_terminal());
        assert!(!Phase::SpawningSet.is_terminal());
        assert!(!Phase::Uninitialized.is_terminal());
    }
}
