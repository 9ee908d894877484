//! Lifetime run statistics

use serde::{Deserialize, Serialize};

use super::{KeyValueStore, StoreError, load_json, save_json};

/// Largest integer a browser can store losslessly
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub best_distance: u64,
    pub cumulative_distance: u64,
    pub stars_earned: u64,
    pub stars_collected: u64,
}

impl Stats {
    /// Everything unlocked
    pub fn unlocked() -> Self {
        Self {
            stars_earned: MAX_SAFE_INTEGER,
            stars_collected: MAX_SAFE_INTEGER,
            ..Default::default()
        }
    }

    /// Fold one finished run in. Returns true on a new best distance.
    pub fn record_run(&mut self, distance: u32, stars_earned: u32, stars_collected: u32) -> bool {
        let distance = distance as u64;
        let best = distance > self.best_distance;
        self.best_distance = self.best_distance.max(distance);
        self.cumulative_distance = self.cumulative_distance.saturating_add(distance).min(MAX_SAFE_INTEGER);
        self.stars_earned = self.stars_earned.saturating_add(stars_earned as u64).min(MAX_SAFE_INTEGER);
        self.stars_collected = self
            .stars_collected
            .saturating_add(stars_collected as u64)
            .min(MAX_SAFE_INTEGER);
        best
    }
}

/// Stats persisted under the `stats` key
pub struct StatsStore<S> {
    store: S,
}

impl<S: KeyValueStore> StatsStore<S> {
    pub const KEY: &'static str = "stats";

    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn load(&self) -> Stats {
        load_json(&self.store, Self::KEY).unwrap_or_default()
    }

    pub fn save(&mut self, stats: &Stats) -> Result<(), StoreError> {
        save_json(&mut self.store, Self::KEY, stats)
    }

    /// Load, fold in one run and save
    pub fn record_run(&mut self, distance: u32, stars_earned: u32, stars_collected: u32) -> Result<Stats, StoreError> {
        let mut stats = self.load();
        if stats.record_run(distance, stars_earned, stars_collected) {
            log::info!("New best distance: {}", distance);
        }
        self.save(&stats)?;
        Ok(stats)
    }

    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.store.delete(Self::KEY)
    }
}
