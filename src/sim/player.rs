//! Player kinematics and body shapes
//!
//! One `Player` serves both the game and the customisation preview; the
//! preview mode only scrolls along x and drives the trail, without the
//! speed ramp or track collision.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effects::{Effect, EffectAnchor, EffectParams, TrailKind};
use crate::compound;
use crate::consts::*;

const BALL_BODY_POINTS: usize = 20;
const STAR_ROTATION_SPEED: f32 = 0.2;
const FRAME_RATE_INTERVAL_MS: f32 = 500.0;
const PREVIEW_SPEED: f32 = 5.0;
/// Largest size the customisation slider allows
pub const PLAYER_SIZE_LIMIT: f32 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerShape {
    Ball,
    Star,
}

impl PlayerShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerShape::Ball => "ball",
            PlayerShape::Star => "star",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ball" => Some(PlayerShape::Ball),
            "star" => Some(PlayerShape::Star),
            _ => None,
        }
    }

    pub fn default_hue(&self) -> f32 {
        match self {
            PlayerShape::Ball => 185.0,
            PlayerShape::Star => 60.0,
        }
    }

    pub fn default_size(&self, mode: PlayerMode) -> f32 {
        match (self, mode) {
            (PlayerShape::Ball, PlayerMode::InGame) => 35.0,
            (PlayerShape::Ball, PlayerMode::Preview) => 30.0,
            (PlayerShape::Star, _) => 60.0,
        }
    }

    pub fn default_trail(&self) -> TrailKind {
        match self {
            PlayerShape::Ball => TrailKind::Bubble,
            PlayerShape::Star => TrailKind::Golden,
        }
    }
}

/// Persisted player configuration (`playerProps` of a setup)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProps {
    pub player_type: PlayerShape,
    pub size: f32,
    pub hue: f32,
}

impl PlayerProps {
    pub fn defaults(shape: PlayerShape, mode: PlayerMode) -> Self {
        Self {
            player_type: shape,
            size: shape.default_size(mode),
            hue: shape.default_hue(),
        }
    }
}

impl Default for PlayerProps {
    /// The game's default player: a star sized to the track
    fn default() -> Self {
        Self {
            player_type: PlayerShape::Star,
            size: PLAYER_SIZE,
            hue: PlayerShape::Star.default_hue(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerMode {
    InGame,
    Preview,
}

/// Star face geometry, relative to the star centre before rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StarFace {
    pub eyes: [Vec2; 2],
    pub eye_radius: f32,
    pub smile_from: Vec2,
    pub smile_to: Vec2,
    pub smile_control: Vec2,
    pub line_width: f32,
}

impl StarFace {
    pub fn for_size(size: f32) -> Self {
        let f = size * 0.025;
        Self {
            eyes: [Vec2::new(3.0 * f, -3.0 * f), Vec2::new(3.0 * f, 3.0 * f)],
            eye_radius: 1.5,
            smile_from: Vec2::new(-3.0 * f, -3.0 * f),
            smile_to: Vec2::new(-3.0 * f, 3.0 * f),
            smile_control: Vec2::new(-6.0 * f, 0.0),
            line_width: 1.5,
        }
    }
}

/// Outline points of a shape, relative to its centre
pub fn body_points(shape: PlayerShape, size: f32) -> Vec<Vec2> {
    match shape {
        PlayerShape::Ball => {
            let r = size * 0.5;
            (0..BALL_BODY_POINTS)
                .map(|k| Vec2::from_angle(k as f32 * 0.1 * PI) * r)
                .collect()
        }
        PlayerShape::Star => star_points(size * 0.5, size * 0.25, 0.0),
    }
}

/// Five-pointed star outline: alternating outer and inner vertices,
/// closed by repeating the first pair
pub fn star_points(radius: f32, inner_radius: f32, start_angle: f32) -> Vec<Vec2> {
    (0..=5)
        .flat_map(|k| {
            let a = start_angle + k as f32 * 0.4 * PI;
            [
                Vec2::from_angle(a) * radius,
                Vec2::from_angle(a + 0.2 * PI) * inner_radius,
            ]
        })
        .collect()
}

/// Frames per second, sampled every 500 ms
#[derive(Debug, Clone, Default)]
pub struct FrameRateCounter {
    elapsed: f32,
    frames: u32,
    rate: u32,
}

impl FrameRateCounter {
    pub fn tick(&mut self, delta_ms: f32) {
        self.elapsed += delta_ms;
        if self.elapsed >= FRAME_RATE_INTERVAL_MS {
            self.rate = (self.frames as f32 / (FRAME_RATE_INTERVAL_MS * 0.001)).round() as u32;
            self.elapsed -= FRAME_RATE_INTERVAL_MS;
            self.frames = 0;
        }
        self.frames += 1;
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    shape: PlayerShape,
    mode: PlayerMode,
    pos: Vec2,
    size: f32,
    hue: f32,
    speed: Vec2,
    base_speed: f32,
    max_speed: f32,
    distance_marked: u32,
    start_distance: f32,
    started: bool,
    angle: f32,
    body: Vec<Vec2>,
    effect: Effect,
    frame_rate: FrameRateCounter,
}

impl Player {
    /// In-game player at `start`. Without `effect` the shape's default
    /// trail is used.
    pub fn new(props: &PlayerProps, effect: Option<&EffectParams>, start: Vec2) -> Self {
        Self::build(props, effect, start, PlayerMode::InGame)
    }

    /// Preview player: starts at the origin already moving along x
    pub fn preview(props: &PlayerProps, effect: Option<&EffectParams>) -> Self {
        let mut player = Self::build(props, effect, Vec2::ZERO, PlayerMode::Preview);
        player.speed = Vec2::new(PREVIEW_SPEED, 0.0);
        player.started = true;
        player
    }

    fn build(props: &PlayerProps, effect: Option<&EffectParams>, start: Vec2, mode: PlayerMode) -> Self {
        let shape = props.player_type;
        let anchor = EffectAnchor {
            pos: start,
            speed: Vec2::ZERO,
            size: props.size,
        };
        let effect = match effect {
            Some(params) => Effect::new(params, &anchor),
            None => Effect::new(&EffectParams::default_for(shape.default_trail()), &anchor),
        };
        Self {
            shape,
            mode,
            pos: start,
            size: props.size,
            hue: props.hue,
            speed: Vec2::ZERO,
            base_speed: PLAYER_BASE_SPEED,
            max_speed: PLAYER_MAX_SPEED,
            distance_marked: 0,
            start_distance: start.x + start.y,
            started: false,
            angle: 0.0,
            body: body_points(shape, props.size),
            effect,
            frame_rate: FrameRateCounter::default(),
        }
    }

    pub fn shape(&self) -> PlayerShape {
        self.shape
    }

    pub fn mode(&self) -> PlayerMode {
        self.mode
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn speed(&self) -> Vec2 {
        self.speed
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_moving(&self) -> bool {
        self.speed.x != 0.0 || self.speed.y != 0.0
    }

    pub fn start_distance(&self) -> f32 {
        self.start_distance
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate.rate()
    }

    pub fn body(&self) -> &[Vec2] {
        &self.body
    }

    /// Body outline in world coordinates
    pub fn world_body(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.body.iter().map(move |p| self.pos + *p)
    }

    pub fn face(&self) -> Option<StarFace> {
        (self.shape == PlayerShape::Star).then(|| StarFace::for_size(self.size))
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut Effect {
        &mut self.effect
    }

    pub fn set_effect(&mut self, effect: Effect) {
        self.effect = effect;
    }

    pub fn anchor(&self) -> EffectAnchor {
        EffectAnchor {
            pos: self.pos,
            speed: self.speed,
            size: self.size,
        }
    }

    pub fn props(&self) -> PlayerProps {
        PlayerProps {
            player_type: self.shape,
            size: self.size,
            hue: self.hue,
        }
    }

    pub fn set_hue(&mut self, hue: f32) {
        self.hue = hue;
    }

    /// Resize and rebuild the collision body
    pub fn set_size(&mut self, size: f32) {
        self.size = size;
        self.body = body_points(self.shape, size);
    }

    /// Reported distance: world travel since the start, in hundreds
    pub fn distance_covered(&self) -> u32 {
        let travel = self.pos.x + self.pos.y - self.start_distance;
        (travel / WORLD_UNITS_PER_DISTANCE).ceil().max(0.0) as u32
    }

    /// World units travelled since the start
    pub fn travel(&self) -> f32 {
        self.pos.x + self.pos.y - self.start_distance
    }

    /// Movement key. The first press starts along x; later presses swap
    /// the moving axis.
    pub fn toggle_move(&mut self) {
        if self.started {
            self.speed.x = if self.speed.x > 0.0 { 0.0 } else { self.base_speed };
            self.speed.y = if self.speed.y > 0.0 { 0.0 } else { self.base_speed };
        } else {
            self.speed.x = self.base_speed;
            self.started = true;
        }
    }

    /// Integrate position and ramp speeds
    pub fn advance(&mut self, delta_ms: f32, lf: f32) {
        match self.mode {
            PlayerMode::Preview => {
                self.pos.x += self.speed.x * lf;
            }
            PlayerMode::InGame => {
                self.frame_rate.tick(delta_ms);
                if self.started {
                    self.pos += self.speed * lf;
                    self.ramp_speed(lf);
                }
            }
        }
    }

    fn ramp_speed(&mut self, lf: f32) {
        if self.base_speed >= self.max_speed {
            self.base_speed = self.max_speed;
        } else {
            self.base_speed *= compound(PLAYER_ACCELERATION, lf);
        }

        if self.max_speed <= PLAYER_MAXED_OUT_SPEED
            && self.distance_covered().saturating_sub(self.distance_marked) >= PLAYER_DISTANCE_MARK
        {
            self.max_speed = (self.max_speed + PLAYER_SPEED_INCREASE).min(PLAYER_MAXED_OUT_SPEED);
            self.distance_marked += PLAYER_DISTANCE_MARK;
            log::debug!("Max speed raised to {}", self.max_speed);
        }
    }

    /// Stars turn to face their direction of travel
    pub fn update_rotation(&mut self, lf: f32) {
        if self.shape != PlayerShape::Star {
            return;
        }
        let target = if self.speed.x > 0.0 || self.speed.y == 0.0 {
            0.0
        } else {
            FRAC_PI_2
        };
        let step = STAR_ROTATION_SPEED * lf;
        if (self.angle - target).abs() <= step {
            self.angle = target;
        } else if target > self.angle {
            self.angle += step;
        } else {
            self.angle -= step;
        }
        self.angle %= TAU;
    }

    pub fn update_effect<R: Rng + ?Sized>(&mut self, delta_ms: f32, lf: f32, rng: &mut R) {
        let anchor = self.anchor();
        self.effect.update(&anchor, delta_ms, lf, rng);
    }

    /// One unit back along every moving axis
    pub fn step_back(&mut self) {
        if self.speed.x > 0.0 {
            self.pos.x -= 1.0;
        }
        if self.speed.y > 0.0 {
            self.pos.y -= 1.0;
        }
    }

    pub fn stop(&mut self) {
        self.speed = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn star_at(x: f32, y: f32) -> Player {
        Player::new(&PlayerProps::default(), None, Vec2::new(x, y))
    }

    #[test]
    fn test_toggle_swaps_axes() {
        let mut p = star_at(0.0, 0.0);
        assert!(!p.is_started());
        p.toggle_move();
        assert_eq!(p.speed(), Vec2::new(5.0, 0.0));
        p.toggle_move();
        assert_eq!(p.speed(), Vec2::new(0.0, 5.0));
        p.toggle_move();
        assert_eq!(p.speed(), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_not_moving_before_start() {
        let mut p = star_at(10.0, 10.0);
        p.advance(16.0, 1.0);
        assert_eq!(p.pos(), Vec2::new(10.0, 10.0));
        assert_eq!(p.base_speed(), 5.0);
    }

    #[test]
    fn test_advance_scales_by_loop_factor() {
        let mut p = star_at(0.0, 0.0);
        p.toggle_move();
        p.advance(32.0, 2.0);
        assert_eq!(p.pos(), Vec2::new(10.0, 0.0));
        assert!((p.base_speed() - 5.0 * 1.0002f32.powf(2.0)).abs() < 1e-5);
    }

    #[test]
    fn test_distance_covered() {
        let mut p = star_at(100.0, 200.0);
        assert_eq!(p.distance_covered(), 0);
        p.pos = Vec2::new(150.0, 200.0);
        assert_eq!(p.distance_covered(), 1);
        p.pos = Vec2::new(300.0, 400.0);
        assert_eq!(p.distance_covered(), 4);
        p.pos = Vec2::new(100.0 + 3.0 * WORLD_UNITS_PER_DISTANCE, 200.0);
        assert_eq!(p.distance_covered(), 3);
    }

    #[test]
    fn test_max_speed_steps_each_mark() {
        let mut p = star_at(0.0, 0.0);
        p.toggle_move();
        p.pos = Vec2::new(50_000.0, 0.0);
        p.ramp_speed(1.0);
        assert_eq!(p.max_speed(), 12.0);
        // Same distance, no second step
        p.ramp_speed(1.0);
        assert_eq!(p.max_speed(), 12.0);
        p.pos = Vec2::new(100_000.0, 0.0);
        p.ramp_speed(1.0);
        assert_eq!(p.max_speed(), 14.0);
        p.pos = Vec2::new(150_000.0, 0.0);
        p.ramp_speed(1.0);
        assert_eq!(p.max_speed(), 15.0);
    }

    #[test]
    fn test_base_speed_capped_at_max() {
        let mut p = star_at(0.0, 0.0);
        p.toggle_move();
        for _ in 0..20_000 {
            p.ramp_speed(1.0);
        }
        assert_eq!(p.base_speed(), p.max_speed());
    }

    #[test]
    fn test_body_shapes() {
        let ball = body_points(PlayerShape::Ball, 40.0);
        assert_eq!(ball.len(), 20);
        assert!(ball.iter().all(|p| (p.length() - 20.0).abs() < 1e-4));

        let star = body_points(PlayerShape::Star, 60.0);
        assert_eq!(star.len(), 12);
        assert!((star[0] - Vec2::new(30.0, 0.0)).length() < 1e-4);
        assert!((star[1].length() - 15.0).abs() < 1e-4);
        // Closed outline
        assert!((star[10] - star[0]).length() < 1e-3);
    }

    #[test]
    fn test_star_rotation_follows_direction() {
        let mut p = star_at(0.0, 0.0);
        p.toggle_move();
        p.toggle_move(); // now moving on y
        for _ in 0..7 {
            p.update_rotation(1.0);
        }
        assert!((p.angle() - 1.4).abs() < 1e-4);
        p.update_rotation(1.0);
        assert_eq!(p.angle(), FRAC_PI_2);
        p.toggle_move();
        for _ in 0..10 {
            p.update_rotation(1.0);
        }
        assert_eq!(p.angle(), 0.0);
    }

    #[test]
    fn test_preview_mode() {
        let props = PlayerProps::defaults(PlayerShape::Ball, PlayerMode::Preview);
        let mut p = Player::preview(&props, None);
        assert_eq!(p.size(), 30.0);
        assert_eq!(p.effect().kind(), TrailKind::Bubble);
        p.advance(16.0, 1.0);
        assert_eq!(p.pos(), Vec2::new(5.0, 0.0));
        // No ramp in preview
        assert_eq!(p.base_speed(), 5.0);
    }

    #[test]
    fn test_frame_rate_counter() {
        let mut c = FrameRateCounter::default();
        for _ in 0..31 {
            c.tick(16.0);
        }
        // 500 ms reached on the 32nd tick
        assert_eq!(c.rate(), 0);
        c.tick(16.0);
        assert_eq!(c.rate(), 62);
    }

    #[test]
    fn test_props_json() {
        let json = serde_json::to_string(&PlayerProps::default()).unwrap();
        assert_eq!(json, r#"{"playerType":"star","size":60.0,"hue":60.0}"#);
    }

    proptest! {
        #[test]
        fn prop_max_speed_never_exceeds_cap(
            steps in prop::collection::vec((0.0f32..20_000.0, 0.1f32..4.0), 1..300),
        ) {
            let mut p = star_at(0.0, 0.0);
            p.toggle_move();
            for (dx, lf) in steps {
                p.pos.x += dx;
                p.ramp_speed(lf);
                prop_assert!(p.max_speed() <= PLAYER_MAXED_OUT_SPEED);
                prop_assert!(p.base_speed() <= PLAYER_MAXED_OUT_SPEED);
            }
        }
    }
}
