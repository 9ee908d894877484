//! Track boundary test and collision correction
//!
//! The player is on track while every body point lies inside the union of
//! the live segments. When a point leaves, the player is walked back one
//! unit at a time along its moving axes until the whole body is inside
//! again. A malformed track could make that walk endless, so it is capped.

use glam::Vec2;

use super::player::Player;
use super::track::TrackSegment;
use crate::consts::MAX_CORRECTION_STEPS;

/// Point-in-path capability used by collision
pub trait TrackBoundary {
    fn contains(&self, point: Vec2) -> bool;
}

/// Union of segment rectangles, each shrunk by `inset`
#[derive(Debug, Clone, Copy)]
pub struct SegmentPath<'a> {
    segments: &'a [TrackSegment],
    inset: f32,
}

impl<'a> SegmentPath<'a> {
    pub fn new(segments: &'a [TrackSegment]) -> Self {
        Self { segments, inset: 0.0 }
    }

    pub fn with_inset(segments: &'a [TrackSegment], inset: f32) -> Self {
        Self { segments, inset }
    }
}

impl TrackBoundary for SegmentPath<'_> {
    fn contains(&self, point: Vec2) -> bool {
        self.segments.iter().any(|s| s.contains_inset(point, self.inset))
    }
}

impl<F: Fn(Vec2) -> bool> TrackBoundary for F {
    fn contains(&self, point: Vec2) -> bool {
        self(point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// Whole body inside the track
    OnTrack,
    /// Left the track; walked back inside in `steps` units
    Corrected { steps: u32 },
    /// Left the track and no in-bounds position was found within the cap
    Stuck { steps: u32 },
}

impl CollisionOutcome {
    /// Any outcome other than `OnTrack` ends the run
    pub fn is_game_over(&self) -> bool {
        !matches!(self, CollisionOutcome::OnTrack)
    }
}

pub fn body_inside<B: TrackBoundary + ?Sized>(player: &Player, boundary: &B) -> bool {
    player.world_body().all(|p| boundary.contains(p))
}

/// Check the player against `boundary` and push it back inside if needed.
/// Speeds are zeroed whenever the player left the track.
pub fn resolve_track_collision<B: TrackBoundary + ?Sized>(player: &mut Player, boundary: &B) -> CollisionOutcome {
    if body_inside(player, boundary) {
        return CollisionOutcome::OnTrack;
    }

    let mut steps = 0;
    let outcome = loop {
        if !player.is_moving() || steps >= MAX_CORRECTION_STEPS {
            log::warn!(
                "Collision correction gave up after {} steps at {:?}",
                steps,
                player.pos()
            );
            break CollisionOutcome::Stuck { steps };
        }
        player.step_back();
        steps += 1;
        if body_inside(player, boundary) {
            break CollisionOutcome::Corrected { steps };
        }
    };

    player.stop();
    outcome
}
