//! SpeedBall - a zig-zag track racer
//!
//! Core modules:
//! - `noise`: Quadtree spatial index, Worley noise field, parallax background
//! - `sim`: Frame-driven simulation (track stream, player, trails, power-ups)
//! - `persistence`: Injected key-value store, run stats, setup presets
//! - `settings`: Player preferences and quality presets
//! - `preview`: Customisation session for players and trails
//! - `platform`: Clock and browser storage glue

pub mod noise;
pub mod persistence;
pub mod platform;
pub mod preview;
pub mod settings;
pub mod sim;

pub use settings::{QualityPreset, Settings};

/// Game configuration constants
pub mod consts {
    /// Frame duration (ms) that maps to a loop factor of 1.0
    pub const REFERENCE_FRAME_MS: f32 = 16.0;

    /// Track defaults
    pub const TRACK_WIDTH: f32 = 150.0;
    pub const MIN_TRACK_SEGMENTS: usize = 4;

    /// Player defaults
    pub const PLAYER_SIZE: f32 = 60.0;
    pub const PLAYER_BASE_SPEED: f32 = 5.0;
    pub const PLAYER_MAX_SPEED: f32 = 10.0;
    /// Absolute speed cap (max speed never ramps past this)
    pub const PLAYER_MAXED_OUT_SPEED: f32 = 15.0;
    pub const PLAYER_SPEED_INCREASE: f32 = 2.0;
    /// Distance units between max speed increases
    pub const PLAYER_DISTANCE_MARK: u32 = 500;
    /// Per-frame compounding of base speed toward max speed
    pub const PLAYER_ACCELERATION: f32 = 1.0002;

    /// World units per reported distance unit
    pub const WORLD_UNITS_PER_DISTANCE: f32 = 100.0;

    /// Collision correction never steps back further than this
    pub const MAX_CORRECTION_STEPS: u32 = 10_000;

    /// Power-up defaults
    pub const POWERUP_SIZE: f32 = 20.0;
    pub const POWERUP_INTERVAL: f32 = 1500.0;
    pub const POWERUP_MIN_LOOKAHEAD: f32 = 600.0;
    pub const POWERUP_MAX_LOOKAHEAD: f32 = 1500.0;

    /// Background scroll speed without player movement
    pub const BACKGROUND_WIND_SPEED: f32 = 10.0;
}

/// Loop factor for a frame: elapsed time normalised to a 16 ms frame,
/// rounded to one decimal.
#[inline]
pub fn loop_factor(delta_ms: f32) -> f32 {
    (delta_ms / consts::REFERENCE_FRAME_MS * 10.0).round() / 10.0
}

/// Compounding factor `base^lf`, so decay and growth are framerate independent
#[inline]
pub fn compound(base: f32, lf: f32) -> f32 {
    base.powf(lf)
}

/// Round to `places` decimals
#[inline]
pub fn round_off(value: f32, places: i32) -> f32 {
    let scale = 10f32.powi(places);
    (value * scale).round() / scale
}
