//! Game simulation
//!
//! Everything here is deterministic for a given seed and frame timing and
//! free of any rendering or platform dependency.

pub mod autopilot;
pub mod collision;
pub mod effects;
pub mod player;
pub mod powerup;
pub mod property;
pub mod stars;
pub mod state;
pub mod style;
pub mod tick;
pub mod track;

pub use collision::{CollisionOutcome, SegmentPath, TrackBoundary, resolve_track_collision};
pub use effects::{Effect, EffectLayer, EffectParams, TrailKind};
pub use player::{Player, PlayerMode, PlayerProps, PlayerShape};
pub use powerup::{PowerUp, PowerUps};
pub use property::PropertyDescriptor;
pub use state::{Camera, FrameView, GameConfig, GameEvent, GamePhase, GameState, Loadout, RngState};
pub use tick::{TickInput, tick};
pub use track::{MILESTONES, Track, TrackSegment, stars_earned};
