//! Earned-stars reveal shown on the game-over screen
//!
//! Stars fly in one at a time: each starts large and shrinks toward its
//! slot while spinning, then locks in and the next one begins.

use glam::Vec2;
use serde::Serialize;

use super::player::star_points;
use crate::{compound, loop_factor};

pub const REVEAL_STAR_SIZE: f32 = 25.0;
const START_SIZE: f32 = 300.0;
const SHRINK: f32 = 0.96;
const SPIN_AMPLITUDE: f32 = 2.5;
const SLOT_PADDING: f32 = 10.0;
const INTERVAL_MS: f32 = 50.0;

#[derive(Debug, Clone, Serialize)]
pub struct StarReveal {
    total: u32,
    to_show: u32,
    shown: u32,
    star_size: f32,
    current_size: f32,
    angle: f32,
    timer: f32,
}

/// Render snapshot of the reveal
#[derive(Debug, Clone, Serialize)]
pub struct StarRevealView {
    /// Slot centres, left to right
    pub slots: Vec<Vec2>,
    /// Slots already filled
    pub shown: u32,
    /// Outline of a slot star, relative to its centre
    pub outline: Vec<Vec2>,
    /// Star currently flying in: `(slot, size, angle)`
    pub incoming: Option<(usize, f32, f32)>,
}

impl StarReveal {
    pub fn new(earned: u32, total: u32) -> Self {
        Self {
            total,
            to_show: earned.min(total),
            shown: 0,
            star_size: REVEAL_STAR_SIZE,
            current_size: START_SIZE,
            angle: 0.0,
            timer: 0.0,
        }
    }

    pub fn shown(&self) -> u32 {
        self.shown
    }

    pub fn is_done(&self) -> bool {
        self.shown >= self.to_show
    }

    fn is_animating(&self) -> bool {
        self.timer >= INTERVAL_MS && !self.is_done()
    }

    pub fn update(&mut self, delta_ms: f32) {
        self.timer += delta_ms;
        if !self.is_animating() {
            return;
        }
        // The reveal runs at twice the game's frame normalisation
        let lf = loop_factor(delta_ms * 2.0);
        if self.current_size > self.star_size {
            self.current_size *= compound(SHRINK, lf);
            self.angle = (self.star_size / self.current_size - 1.0) * SPIN_AMPLITUDE;
        } else {
            self.shown += 1;
            self.current_size = START_SIZE;
            self.angle = 0.0;
            self.timer = 0.0;
        }
    }

    /// Slot centres laid out symmetrically around `pivot`
    pub fn slots(&self, pivot: Vec2) -> Vec<Vec2> {
        let half = (self.total as f32 - 1.0) * 0.5;
        (0..self.total)
            .map(|i| {
                let offset = (i as f32 - half) * (self.star_size * 2.0 + SLOT_PADDING);
                Vec2::new(pivot.x + offset, pivot.y)
            })
            .collect()
    }

    pub fn view(&self, pivot: Vec2) -> StarRevealView {
        StarRevealView {
            slots: self.slots(pivot),
            shown: self.shown,
            outline: star_points(self.star_size, self.star_size * 0.5, -std::f32::consts::FRAC_PI_2),
            incoming: self
                .is_animating()
                .then_some((self.shown as usize, self.current_size, self.angle)),
        }
    }
}
