//! Saved player setups
//!
//! Up to `MAX_SETUPS` named presets live under `Setup0`..`Setup9`. One
//! extra scratch slot carries the setup the preview hands to a new game
//! without occupying a numbered slot.

use serde::{Deserialize, Serialize};

use super::{KeyValueStore, StoreError};
use crate::sim::effects::EffectParams;
use crate::sim::player::PlayerProps;

pub const MAX_SETUPS: u64 = 10;
/// Slot used for one-off hand-over
pub const SCRATCH_SLOT: u64 = super::stats::MAX_SAFE_INTEGER;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPreset {
    pub player_props: PlayerProps,
    pub effect_props: EffectParams,
    #[serde(default)]
    pub setup_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("setup {0} not found")]
    NotFound(u64),
    #[error("all {MAX_SETUPS} setup slots are occupied")]
    SlotsFull,
    #[error("setup {slot} is unreadable: {source}")]
    Serde { slot: u64, source: serde_json::Error },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn slot_key(slot: u64) -> String {
    format!("Setup{}", slot)
}

pub struct SetupStore<S> {
    store: S,
}

impl<S: KeyValueStore> SetupStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// First free numbered slot
    fn free_slot(&self) -> Option<u64> {
        (0..MAX_SETUPS).find(|&slot| !self.store.contains(&slot_key(slot)))
    }

    fn write(&mut self, slot: u64, preset: &SetupPreset) -> Result<(), SetupError> {
        let json = serde_json::to_string(preset).map_err(|source| SetupError::Serde { slot, source })?;
        self.store.set(&slot_key(slot), &json)?;
        Ok(())
    }

    /// Save into the first free slot and return it
    pub fn save(&mut self, preset: &SetupPreset) -> Result<u64, SetupError> {
        let slot = self.free_slot().ok_or(SetupError::SlotsFull)?;
        self.write(slot, preset)?;
        log::info!("Saved setup {:?} to slot {}", preset.setup_name, slot);
        Ok(slot)
    }

    /// Overwrite the scratch slot
    pub fn save_scratch(&mut self, preset: &SetupPreset) -> Result<u64, SetupError> {
        self.write(SCRATCH_SLOT, preset)?;
        Ok(SCRATCH_SLOT)
    }

    pub fn retrieve(&self, slot: u64) -> Result<SetupPreset, SetupError> {
        let raw = self.store.get(&slot_key(slot)).ok_or(SetupError::NotFound(slot))?;
        serde_json::from_str(&raw).map_err(|source| SetupError::Serde { slot, source })
    }

    pub fn delete(&mut self, slot: u64) -> Result<(), SetupError> {
        self.store.delete(&slot_key(slot))?;
        Ok(())
    }

    /// Occupied numbered slots in order. Unreadable slots are skipped.
    pub fn list(&self) -> Vec<(u64, SetupPreset)> {
        (0..MAX_SETUPS)
            .filter_map(|slot| match self.retrieve(slot) {
                Ok(preset) => Some((slot, preset)),
                Err(SetupError::NotFound(_)) => None,
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::sim::effects::{BubbleParams, TrailKind};
    use crate::sim::player::{PlayerMode, PlayerShape};

    fn preset(name: &str) -> SetupPreset {
        SetupPreset {
            player_props: PlayerProps::defaults(PlayerShape::Ball, PlayerMode::Preview),
            effect_props: EffectParams::Bubble(BubbleParams::default()),
            setup_name: name.to_string(),
        }
    }

    #[test]
    fn test_save_fills_first_free_slot() {
        let mut setups = SetupStore::new(MemoryStore::new());
        assert_eq!(setups.save(&preset("a")).unwrap(), 0);
        assert_eq!(setups.save(&preset("b")).unwrap(), 1);
        assert_eq!(setups.save(&preset("c")).unwrap(), 2);
        setups.delete(1).unwrap();
        assert_eq!(setups.save(&preset("d")).unwrap(), 1);
        assert_eq!(setups.retrieve(1).unwrap().setup_name, "d");
    }

    #[test]
    fn test_slots_full() {
        let mut setups = SetupStore::new(MemoryStore::new());
        for i in 0..MAX_SETUPS {
            assert_eq!(setups.save(&preset("x")).unwrap(), i);
        }
        assert!(matches!(setups.save(&preset("y")), Err(SetupError::SlotsFull)));
        // The scratch slot is always available
        assert_eq!(setups.save_scratch(&preset("y")).unwrap(), SCRATCH_SLOT);
        assert_eq!(setups.list().len(), MAX_SETUPS as usize);
    }

    #[test]
    fn test_missing_and_broken_slots() {
        let mut store = MemoryStore::new();
        store.set("Setup3", "nope").unwrap();
        let setups = SetupStore::new(store);
        assert!(matches!(setups.retrieve(0), Err(SetupError::NotFound(0))));
        assert!(matches!(setups.retrieve(3), Err(SetupError::Serde { slot: 3, .. })));
        assert!(setups.list().is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut setups = SetupStore::new(MemoryStore::new());
        setups.save_scratch(&preset("mine")).unwrap();
        let raw = setups.into_inner().get("Setup9007199254740991").unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["setupName"], "mine");
        assert_eq!(json["playerProps"]["playerType"], "ball");
        assert_eq!(json["effectProps"]["trailName"], TrailKind::Bubble.as_str());
        assert_eq!(json["effectProps"]["trailHue"], 185.0);
    }
}
