//! Game state and core simulation types
//!
//! Everything one run owns lives in `GameState`; `view()` turns it into a
//! plain render snapshot so drawing never touches simulation internals.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::effects::{Effect, EffectLayer, EffectParams, TrailKind, TrailLine};
use super::player::{Player, PlayerProps, PlayerShape, StarFace};
use super::powerup::{PowerUp, PowerUps};
use super::stars::{StarReveal, StarRevealView};
use super::style::Hsl;
use super::track::{MILESTONES, Track, TrackSegment, stars_earned};
use crate::consts::*;
use crate::persistence::setups::SetupPreset;
use crate::round_off;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Player placed on the track, waiting for the first toggle
    Ready,
    /// Active gameplay
    Running,
    /// Window lost focus mid-run
    Paused,
    /// Left the track
    GameOver,
}

/// Something the host may want to react to (sound, storage, UI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    Started,
    Paused,
    Resumed,
    MilestoneReached { index: usize },
    PowerUpCollected { total: u32 },
    GameOver {
        distance: u32,
        stars_earned: u32,
        stars_collected: u32,
    },
    Restarted,
}

/// Tunables for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Canvas size in pixels
    pub viewport: Vec2,
    pub track_width: f32,
    pub powerup_interval: f32,
    pub powerup_min_lookahead: f32,
    pub powerup_max_lookahead: f32,
    /// Multiplier on particle caps, from the quality preset
    pub particle_scale: f32,
    /// Multiplier on tracer lengths, from the quality preset
    pub trail_scale: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            viewport: Vec2::new(1280.0, 720.0),
            track_width: TRACK_WIDTH,
            powerup_interval: POWERUP_INTERVAL,
            powerup_min_lookahead: POWERUP_MIN_LOOKAHEAD,
            powerup_max_lookahead: POWERUP_MAX_LOOKAHEAD,
            particle_scale: 1.0,
            trail_scale: 1.0,
        }
    }
}

impl GameConfig {
    pub fn with_viewport(width: f32, height: f32) -> Self {
        Self {
            viewport: Vec2::new(width, height),
            ..Default::default()
        }
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream)
    }

    /// State for the run after this one
    pub fn next_run(&self) -> Self {
        Self {
            seed: self.seed,
            stream: self.stream.wrapping_add(1),
        }
    }
}

/// Player loadout a run starts with
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Loadout {
    pub player: PlayerProps,
    pub effect: Option<EffectParams>,
}

impl From<&SetupPreset> for Loadout {
    fn from(setup: &SetupPreset) -> Self {
        Self {
            player: setup.player_props.clone(),
            effect: Some(setup.effect_props.clone()),
        }
    }
}

/// Screen placement of the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    /// Screen point the target is drawn at
    pub origin: Vec2,
    pub rotation: f32,
    /// World point under `origin`
    pub target: Vec2,
}

impl Camera {
    /// Player sits at 50% width, 70% height, track running up the screen
    pub fn follow(viewport: Vec2, target: Vec2) -> Self {
        Self {
            origin: Vec2::new(viewport.x * 0.5, viewport.y * 0.7),
            rotation: -0.75 * std::f32::consts::PI,
            target,
        }
    }

    pub fn world_to_screen(&self, p: Vec2) -> Vec2 {
        self.origin + Vec2::from_angle(self.rotation).rotate(p - self.target)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub shape: PlayerShape,
    pub pos: Vec2,
    pub angle: f32,
    pub size: f32,
    pub hue: f32,
    /// Outline relative to `pos`, before rotation
    pub body: Vec<Vec2>,
    pub face: Option<StarFace>,
}

impl PlayerView {
    pub fn of(player: &Player) -> Self {
        Self {
            shape: player.shape(),
            pos: player.pos(),
            angle: player.angle(),
            size: player.size(),
            hue: player.hue(),
            body: player.body().to_vec(),
            face: player.face(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParticleView {
    pub pos: Vec2,
    pub size: f32,
    pub color: Hsl,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrailView {
    pub kind: TrailKind,
    pub layer: EffectLayer,
    pub hue: f32,
    pub blur: f32,
    pub lines: Vec<TrailLine>,
    pub particles: Vec<ParticleView>,
}

impl TrailView {
    pub fn of(effect: &Effect) -> Self {
        Self {
            kind: effect.kind(),
            layer: effect.layer(),
            hue: effect.hue(),
            blur: effect.blur(),
            lines: effect.trail_lines().to_vec(),
            particles: effect
                .particles()
                .iter()
                .map(|p| ParticleView {
                    pos: p.pos,
                    size: p.size,
                    color: p.color.with_alpha(p.alpha()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hud {
    /// Base speed, one decimal
    pub speed: f32,
    pub distance: u32,
    pub frame_rate: u32,
    pub stars_collected: u32,
    /// Milestones passed this run
    pub milestone: usize,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameView {
    pub phase: GamePhase,
    pub camera: Camera,
    pub segments: Vec<TrackSegment>,
    pub player: PlayerView,
    pub trail: TrailView,
    pub powerups: Vec<PowerUp>,
    pub hud: Hud,
    /// Present once the run is over
    pub stars: Option<StarRevealView>,
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: GameConfig,
    pub loadout: Loadout,
    /// Run seed for reproducibility
    pub rng_state: RngState,
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub track: Track,
    pub player: Player,
    pub powerups: PowerUps,
    pub reveal: Option<StarReveal>,
    /// Simulated time this run
    pub time_ms: f64,
    /// Completed runs before this one
    pub runs: u32,
}

impl GameState {
    pub fn new(config: GameConfig, setup: Option<&SetupPreset>, seed: u64) -> Self {
        let loadout = setup.map(Loadout::from).unwrap_or_default();
        Self::with_loadout(config, loadout, RngState::new(seed))
    }

    pub fn with_loadout(config: GameConfig, loadout: Loadout, rng_state: RngState) -> Self {
        let mut rng = rng_state.to_rng();
        let mut track = Track::new(config.track_width, loadout.player.size, config.viewport.y, &mut rng);
        let mut player = Player::new(&loadout.player, loadout.effect.as_ref(), track.start_position());
        player.effect_mut().set_quality(config.particle_scale, config.trail_scale);
        track.set_start_distance(player.start_distance());

        let powerups = PowerUps::new(
            config.powerup_interval,
            config.powerup_min_lookahead,
            config.powerup_max_lookahead,
        );

        log::info!(
            "New run: seed {} stream {}, {} player, {} trail",
            rng_state.seed,
            rng_state.stream,
            loadout.player.player_type.as_str(),
            player.effect().kind().as_str()
        );

        Self {
            config,
            loadout,
            rng_state,
            rng,
            phase: GamePhase::Ready,
            track,
            player,
            powerups,
            reveal: None,
            time_ms: 0.0,
            runs: 0,
        }
    }

    /// Fresh run with the same loadout and the next RNG stream
    pub fn restart(&mut self) {
        let runs = self.runs + 1;
        *self = Self::with_loadout(self.config.clone(), self.loadout.clone(), self.rng_state.next_run());
        self.runs = runs;
    }

    /// Cull distance behind the player
    pub fn offscreen(&self) -> Vec2 {
        self.config.viewport
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.config.viewport = Vec2::new(width, height);
        self.track.resize(height);
    }

    pub fn apply_quality(&mut self, particle_scale: f32, trail_scale: f32) {
        self.config.particle_scale = particle_scale;
        self.config.trail_scale = trail_scale;
        self.player.effect_mut().set_quality(particle_scale, trail_scale);
    }

    pub fn distance(&self) -> u32 {
        self.player.distance_covered()
    }

    pub fn stars_earned(&self) -> u32 {
        stars_earned(self.distance())
    }

    /// Enter `GameOver` and start the stars reveal
    pub(crate) fn finish_run(&mut self) -> GameEvent {
        let distance = self.distance();
        let earned = stars_earned(distance);
        let collected = self.powerups.collected();
        self.phase = GamePhase::GameOver;
        self.reveal = Some(StarReveal::new(earned, MILESTONES.len() as u32));
        log::info!(
            "Game over at distance {}: {} stars earned, {} collected",
            distance,
            earned,
            collected
        );
        GameEvent::GameOver {
            distance,
            stars_earned: earned,
            stars_collected: collected,
        }
    }

    /// Extra background scroll while the player moves: the ramping base
    /// speed, not the speed set at the last turn
    pub fn scroll_speed(&self) -> Option<f32> {
        self.player.is_moving().then(|| self.player.base_speed())
    }

    pub fn view(&self) -> FrameView {
        let player = &self.player;
        let speed = player.base_speed();
        let viewport = self.config.viewport;

        FrameView {
            phase: self.phase,
            camera: Camera::follow(viewport, player.pos()),
            segments: self.track.segments().to_vec(),
            player: PlayerView::of(player),
            trail: TrailView::of(player.effect()),
            powerups: self.powerups.items().to_vec(),
            hud: Hud {
                speed: round_off(speed, 1),
                distance: self.distance(),
                frame_rate: player.frame_rate(),
                stars_collected: self.powerups.collected(),
                milestone: self.track.milestone_index(),
            },
            stars: self
                .reveal
                .as_ref()
                .map(|r| r.view(Vec2::new(viewport.x * 0.5, viewport.y * 0.6))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::effects::FireParams;

    fn config() -> GameConfig {
        GameConfig::with_viewport(800.0, 600.0)
    }

    #[test]
    fn test_new_game_is_ready_at_start() {
        let state = GameState::new(config(), None, 42);
        assert_eq!(state.phase, GamePhase::Ready);
        assert_eq!(state.player.pos(), state.track.start_position());
        assert_eq!(state.player.shape(), PlayerShape::Star);
        assert_eq!(state.distance(), 0);
        assert!(state.reveal.is_none());
    }

    #[test]
    fn test_setup_drives_loadout() {
        let setup = SetupPreset {
            player_props: PlayerProps {
                player_type: PlayerShape::Ball,
                size: 40.0,
                hue: 120.0,
            },
            effect_props: EffectParams::Fire(FireParams::default()),
            setup_name: "fire ball".into(),
        };
        let state = GameState::new(config(), Some(&setup), 7);
        assert_eq!(state.player.shape(), PlayerShape::Ball);
        assert_eq!(state.player.size(), 40.0);
        assert_eq!(state.player.effect().kind(), TrailKind::Fire);
        assert_eq!(state.track.player_size(), 40.0);
    }

    #[test]
    fn test_same_seed_same_track() {
        let a = GameState::new(config(), None, 99);
        let b = GameState::new(config(), None, 99);
        assert_eq!(a.track.segments(), b.track.segments());
    }

    #[test]
    fn test_restart_keeps_loadout_and_advances_stream() {
        let mut state = GameState::new(config(), None, 5);
        state.phase = GamePhase::GameOver;
        state.restart();
        assert_eq!(state.phase, GamePhase::Ready);
        assert_eq!(state.runs, 1);
        assert_eq!(state.rng_state, RngState { seed: 5, stream: 1 });
        assert_eq!(state.loadout, Loadout::default());
    }

    #[test]
    fn test_view_reflects_state() {
        let state = GameState::new(config(), None, 3);
        let view = state.view();
        assert_eq!(view.phase, GamePhase::Ready);
        assert_eq!(view.segments.len(), state.track.segments().len());
        assert_eq!(view.player.pos, state.player.pos());
        assert!(view.player.face.is_some());
        assert_eq!(view.hud.speed, 5.0);
        assert!(view.stars.is_none());
        // The camera puts the player at its screen anchor
        assert!(view.camera.world_to_screen(view.player.pos).distance(Vec2::new(400.0, 420.0)) < 1e-3);
    }

    #[test]
    fn test_hud_and_scroll_follow_base_speed() {
        let mut state = GameState::new(config(), None, 3);
        assert_eq!(state.scroll_speed(), None);

        state.player.toggle_move();
        for _ in 0..200 {
            state.player.advance(16.0, 1.0);
        }
        // The axis speed stays at the value set on the turn while the base
        // speed keeps ramping
        let base = state.player.base_speed();
        assert_eq!(state.player.speed().max_element(), 5.0);
        assert!(base > 5.15);
        assert_eq!(state.view().hud.speed, round_off(base, 1));
        assert_eq!(state.scroll_speed(), Some(base));
    }

    #[test]
    fn test_finish_run_reports_stars() {
        let mut state = GameState::new(config(), None, 3);
        let event = state.finish_run();
        assert_eq!(
            event,
            GameEvent::GameOver {
                distance: 0,
                stars_earned: 0,
                stars_collected: 0
            }
        );
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.view().stars.is_some());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"track_width": 120.0}"#).unwrap();
        assert_eq!(config.track_width, 120.0);
        assert_eq!(config.powerup_interval, POWERUP_INTERVAL);
    }
}
