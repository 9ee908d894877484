//! Distance-gated power-ups
//!
//! Every `interval` world units of player travel registers one spawn
//! trigger. A trigger places a power-up on the first segment lying further
//! ahead than a random lookahead, so power-ups appear before the player
//! reaches them. Collected power-ups grow and fade out, then are culled.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::track::TrackSegment;
use crate::compound;
use crate::consts::{POWERUP_INTERVAL, POWERUP_MAX_LOOKAHEAD, POWERUP_MIN_LOOKAHEAD, POWERUP_SIZE};

const TAKEN_GROWTH: f32 = 1.05;
const TAKEN_FADE: f32 = 0.9;
const CULL_ALPHA: f32 = 0.02;
/// Spin in radians per reference frame
const SPIN_SPEED: f32 = 0.03;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerUp {
    pub pos: Vec2,
    pub size: f32,
    pub angle: f32,
    pub alpha: f32,
    pub taken: bool,
}

impl PowerUp {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            size: POWERUP_SIZE,
            angle: 0.0,
            alpha: 1.0,
            taken: false,
        }
    }

    /// Squared distance against the combined radii
    pub fn touches(&self, player_pos: Vec2, player_size: f32) -> bool {
        let reach = player_size * 0.5 + self.size * 0.5;
        self.pos.distance_squared(player_pos) <= reach * reach
    }

    fn update(&mut self, lf: f32) {
        self.angle = (self.angle + SPIN_SPEED * lf) % std::f32::consts::TAU;
        if self.taken {
            self.size *= compound(TAKEN_GROWTH, lf);
            self.alpha *= compound(TAKEN_FADE, lf);
        }
    }
}

/// Turns player travel into spawn triggers
#[derive(Debug, Clone)]
pub struct PowerUpSpawner {
    interval: f32,
    next_mark: f32,
    triggers: u64,
}

impl PowerUpSpawner {
    pub fn new(interval: f32) -> Self {
        let interval = interval.max(1.0);
        Self {
            interval,
            next_mark: interval,
            triggers: 0,
        }
    }

    /// Triggers registered by reaching `travel`: one per crossed multiple
    /// of the interval
    pub fn check(&mut self, travel: f32) -> u32 {
        let mut crossed = 0;
        while travel >= self.next_mark {
            crossed += 1;
            self.next_mark += self.interval;
        }
        self.triggers += crossed as u64;
        crossed
    }

    pub fn total_triggers(&self) -> u64 {
        self.triggers
    }
}

/// What one `PowerUps::update` call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerUpUpdate {
    pub triggers: u32,
    pub placed: u32,
    pub collected: u32,
}

#[derive(Debug, Clone)]
pub struct PowerUps {
    spawner: PowerUpSpawner,
    min_lookahead: f32,
    max_lookahead: f32,
    items: Vec<PowerUp>,
    collected: u32,
}

impl Default for PowerUps {
    fn default() -> Self {
        Self::new(POWERUP_INTERVAL, POWERUP_MIN_LOOKAHEAD, POWERUP_MAX_LOOKAHEAD)
    }
}

impl PowerUps {
    pub fn new(interval: f32, min_lookahead: f32, max_lookahead: f32) -> Self {
        Self {
            spawner: PowerUpSpawner::new(interval),
            min_lookahead: min_lookahead.min(max_lookahead),
            max_lookahead: max_lookahead.max(min_lookahead),
            items: Vec::new(),
            collected: 0,
        }
    }

    pub fn items(&self) -> &[PowerUp] {
        &self.items
    }

    /// Power-ups picked up this run
    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn spawner(&self) -> &PowerUpSpawner {
        &self.spawner
    }

    /// Place one power-up ahead of the player. Returns false when no live
    /// segment lies far enough ahead.
    pub fn place<R: Rng + ?Sized>(&mut self, player_pos: Vec2, player_size: f32, segments: &[TrackSegment], rng: &mut R) -> bool {
        let lookahead = if self.max_lookahead > self.min_lookahead {
            rng.random_range(self.min_lookahead..=self.max_lookahead)
        } else {
            self.min_lookahead
        };
        let threshold = player_pos.x + player_pos.y + lookahead;
        let Some(seg) = segments.iter().find(|s| s.x + s.y > threshold) else {
            log::debug!("No segment beyond lookahead {:.0}, power-up skipped", lookahead);
            return false;
        };

        let margin = player_size * 0.5;
        let pos = Vec2::new(
            seg.x + margin + rng.random::<f32>() * (seg.width - margin * 2.0).max(0.0),
            seg.y + margin + rng.random::<f32>() * (seg.height - margin * 2.0).max(0.0),
        );
        log::debug!("Power-up placed at {:?} on segment {}", pos, seg.index);
        self.items.push(PowerUp::new(pos));
        true
    }

    /// Spawn on crossed intervals, detect pickups, animate and cull
    #[allow(clippy::too_many_arguments)]
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        travel: f32,
        player_pos: Vec2,
        player_size: f32,
        segments: &[TrackSegment],
        offscreen: Vec2,
        lf: f32,
        rng: &mut R,
    ) -> PowerUpUpdate {
        let mut result = PowerUpUpdate {
            triggers: self.spawner.check(travel),
            ..Default::default()
        };
        for _ in 0..result.triggers {
            if self.place(player_pos, player_size, segments, rng) {
                result.placed += 1;
            }
        }

        for item in self.items.iter_mut().filter(|p| !p.taken) {
            if item.touches(player_pos, player_size) {
                item.taken = true;
                result.collected += 1;
            }
        }
        self.collected += result.collected;

        for item in &mut self.items {
            item.update(lf);
        }
        self.items.retain(|p| {
            let faded = p.taken && p.alpha < CULL_ALPHA;
            let behind = player_pos.x - (p.pos.x + p.size) > offscreen.x
                || player_pos.y - (p.pos.y + p.size) > offscreen.y;
            !faded && !behind
        });
        result
    }
}
