//! Game settings and preferences
//!
//! Persisted separately from stats and setups, and home of the maintenance
//! codes that edit those other blobs.

use serde::{Deserialize, Serialize};

use crate::persistence::{KeyValueStore, Stats, StatsStore, StoreError, load_json, save_json};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Multiplier on bubble caps
    pub fn particle_scale(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.3,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }

    /// Tracer length multiplier (1.0 = full)
    pub fn trail_quality(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }

    /// Whether to generate the noise background at all
    pub fn background_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Bubble particles
    pub particles: bool,
    /// Fire and golden tracers
    pub trails: bool,
    /// Worley-noise parallax
    pub background: bool,

    // === HUD ===
    /// Speed, distance and frame rate overlay
    pub show_stats: bool,

    /// Pause when the page loses focus
    pub pause_on_blur: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            trails: true,
            background: true,
            show_stats: true,
            pause_on_blur: true,
        }
    }
}

/// Result of entering a maintenance code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOutcome {
    /// Stats deleted
    ProgressReset,
    /// `reset` entered without confirmation
    Cancelled,
    BackgroundsUnlocked,
    BetaTesterEnabled,
    BetaTesterDisabled,
    Unknown,
}

impl CodeOutcome {
    /// Whether the host should reload to pick up the change
    pub fn requires_reload(&self) -> bool {
        !matches!(self, CodeOutcome::Cancelled | CodeOutcome::Unknown)
    }

    pub fn message(&self) -> &'static str {
        match self {
            CodeOutcome::ProgressReset => "Your progress is deleted!",
            CodeOutcome::Cancelled => "Reset cancelled",
            CodeOutcome::BackgroundsUnlocked => "Backgrounds Unlocked!",
            CodeOutcome::BetaTesterEnabled => "You are a Beta Tester!",
            CodeOutcome::BetaTesterDisabled => "You opted out as a Beta Tester!",
            CodeOutcome::Unknown => "Code Unavailable!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BetaTester {
    beta_tester: bool,
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "speedball_settings";
    pub const BETA_TESTER_KEY: &'static str = "betaTester";

    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;
        self.background = preset.background_enabled();
    }

    /// Effective particle cap multiplier
    pub fn particle_scale(&self) -> f32 {
        if self.particles {
            self.quality.particle_scale()
        } else {
            0.0
        }
    }

    /// Effective tracer length multiplier
    pub fn trail_scale(&self) -> f32 {
        if self.trails {
            self.quality.trail_quality()
        } else {
            0.0
        }
    }

    pub fn background_enabled(&self) -> bool {
        self.background && self.quality.background_enabled()
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        match load_json(store, Self::STORAGE_KEY) {
            Some(settings) => {
                log::info!("Loaded settings");
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }

    pub fn is_beta_tester<S: KeyValueStore + ?Sized>(store: &S) -> bool {
        load_json::<BetaTester, S>(store, Self::BETA_TESTER_KEY).is_some_and(|b| b.beta_tester)
    }

    /// Apply a maintenance code. `reset` only takes effect when
    /// `confirm_reset` is set.
    pub fn apply_code<S: KeyValueStore>(code: &str, confirm_reset: bool, store: &mut S) -> Result<CodeOutcome, StoreError> {
        let outcome = match code {
            "reset" if confirm_reset => {
                StatsStore::new(&mut *store).reset()?;
                CodeOutcome::ProgressReset
            }
            "reset" => CodeOutcome::Cancelled,
            "unlockBackgrounds" => {
                StatsStore::new(&mut *store).save(&Stats::unlocked())?;
                CodeOutcome::BackgroundsUnlocked
            }
            "betaTesting" => {
                save_json(store, Self::BETA_TESTER_KEY, &BetaTester { beta_tester: true })?;
                CodeOutcome::BetaTesterEnabled
            }
            "normalUser" => {
                store.delete(Self::BETA_TESTER_KEY)?;
                CodeOutcome::BetaTesterDisabled
            }
            _ => CodeOutcome::Unknown,
        };
        log::info!("Code {:?}: {:?}", code, outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_effective_scales() {
        let mut settings = Settings::from_preset(QualityPreset::High);
        assert_eq!(settings.particle_scale(), 1.0);
        assert_eq!(settings.trail_scale(), 1.0);
        settings.particles = false;
        assert_eq!(settings.particle_scale(), 0.0);

        let low = Settings::from_preset(QualityPreset::Low);
        assert!(!low.background_enabled());
        assert_eq!(low.trail_scale(), 0.25);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());

        let mut settings = Settings::from_preset(QualityPreset::Low);
        settings.show_stats = false;
        settings.save(&mut store).unwrap();
        assert_eq!(Settings::load(&store), settings);

        // Missing fields fall back to defaults
        store.set(Settings::STORAGE_KEY, r#"{"quality":"High"}"#).unwrap();
        let loaded = Settings::load(&store);
        assert_eq!(loaded.quality, QualityPreset::High);
        assert!(loaded.pause_on_blur);
    }

    #[test]
    fn test_quality_names() {
        assert_eq!(QualityPreset::from_str("MED"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::from_str(QualityPreset::High.as_str()), Some(QualityPreset::High));
        assert_eq!(QualityPreset::from_str("ultra"), None);
    }

    #[test]
    fn test_reset_code() {
        let mut store = MemoryStore::new();
        StatsStore::new(&mut store).record_run(100, 0, 0).unwrap();

        let outcome = Settings::apply_code("reset", false, &mut store).unwrap();
        assert_eq!(outcome, CodeOutcome::Cancelled);
        assert!(!outcome.requires_reload());
        assert!(store.contains("stats"));

        let outcome = Settings::apply_code("reset", true, &mut store).unwrap();
        assert_eq!(outcome, CodeOutcome::ProgressReset);
        assert!(!store.contains("stats"));
    }

    #[test]
    fn test_unlock_and_beta_codes() {
        let mut store = MemoryStore::new();
        assert_eq!(
            Settings::apply_code("unlockBackgrounds", false, &mut store).unwrap(),
            CodeOutcome::BackgroundsUnlocked
        );
        assert_eq!(StatsStore::new(&mut store).load(), Stats::unlocked());

        assert!(!Settings::is_beta_tester(&store));
        Settings::apply_code("betaTesting", false, &mut store).unwrap();
        assert!(Settings::is_beta_tester(&store));
        assert_eq!(store.get("betaTester").as_deref(), Some(r#"{"betaTester":true}"#));
        Settings::apply_code("normalUser", false, &mut store).unwrap();
        assert!(!Settings::is_beta_tester(&store));

        let outcome = Settings::apply_code("moonJump", true, &mut store).unwrap();
        assert_eq!(outcome, CodeOutcome::Unknown);
        assert_eq!(outcome.message(), "Code Unavailable!");
    }
}
