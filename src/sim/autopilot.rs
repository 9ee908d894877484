//! Demo-mode steering
//!
//! Looks a few frames ahead along the current axis and turns when the wall
//! is close and the other axis is open.

use glam::Vec2;

use super::collision::{SegmentPath, TrackBoundary};
use super::state::{GamePhase, GameState};
use super::tick::TickInput;

/// Frames of travel checked ahead of the body
const LOOKAHEAD_FRAMES: f32 = 3.0;
const LOOKAHEAD_MARGIN: f32 = 2.0;

fn clear_ahead(state: &GameState, dir: Vec2, reach: f32) -> bool {
    let path = SegmentPath::new(state.track.segments());
    state.player.world_body().all(|p| path.contains(p + dir * reach))
}

/// Whether the demo driver wants to toggle this frame
pub fn wants_toggle(state: &GameState) -> bool {
    let player = &state.player;
    if !player.is_started() {
        return true;
    }
    if !player.is_moving() {
        return false;
    }
    let speed = player.speed();
    let (ahead, other) = if speed.x > 0.0 { (Vec2::X, Vec2::Y) } else { (Vec2::Y, Vec2::X) };
    let reach = speed.max_element() * LOOKAHEAD_FRAMES + LOOKAHEAD_MARGIN;
    !clear_ahead(state, ahead, reach) && clear_ahead(state, other, reach)
}

/// Input for one demo frame: steer while running, restart after a crash
pub fn demo_input(state: &GameState) -> TickInput {
    TickInput {
        toggle_move: state.phase != GamePhase::GameOver && wants_toggle(state),
        restart: state.phase == GamePhase::GameOver && state.reveal.as_ref().is_some_and(|r| r.is_done()),
        ..Default::default()
    }
}
