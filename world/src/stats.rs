//! Player-facing wave counters fed by the wave scheduler.

use wave_defence_core::StatsSink;

/// Wave counters displayed on the HUD.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerStats {
    waves_total: u32,
    current_wave: u32,
}

impl PlayerStats {
    /// Creates counters with no waves reported.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            waves_total: 0,
            current_wave: 0,
        }
    }

    /// Text shown by the HUD wave counter.
    #[must_use]
    pub fn wave_label(&self) -> String {
        format!("Wave {}/{}", self.current_wave, self.waves_total)
    }
}

impl StatsSink for PlayerStats {
    fn set_total_waves(&mut self, total: u32) {
        self.waves_total = total;
    }

    fn set_current_wave(&mut self, wave: u32) {
        self.current_wave = wave;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_label_tracks_updates() {
        let mut stats = PlayerStats::new();
        assert_eq!(stats.wave_label(), "Wave 0/0");

        stats.set_total_waves(5);
        stats.set_current_wave(2);
        assert_eq!(stats.wave_label(), "Wave 2/5");
    }
}
