//! Per-frame simulation step
//!
//! Advances a `GameState` by one wall-clock frame. Movement scales with the
//! loop factor, timers with the raw delta.

use super::collision::{SegmentPath, resolve_track_collision};
use super::state::{GameEvent, GamePhase, GameState};
use crate::loop_factor;

/// Input gathered since the previous frame
#[derive(Debug, Clone)]
pub struct TickInput {
    /// Start moving, or swap the moving axis
    pub toggle_move: bool,
    /// Whether the page currently has focus
    pub focused: bool,
    /// Start a new run from the game-over screen
    pub restart: bool,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            toggle_move: false,
            focused: true,
            restart: false,
        }
    }
}

/// Advance the game by `delta_ms` of wall time
pub fn tick(state: &mut GameState, input: &TickInput, delta_ms: f32) -> Vec<GameEvent> {
    let mut events = Vec::new();

    match state.phase {
        GamePhase::GameOver => {
            if input.restart {
                state.restart();
                events.push(GameEvent::Restarted);
            } else if let Some(reveal) = state.reveal.as_mut() {
                reveal.update(delta_ms);
            }
            return events;
        }
        GamePhase::Paused => {
            if !input.focused {
                return events;
            }
            state.phase = GamePhase::Running;
            events.push(GameEvent::Resumed);
        }
        GamePhase::Running if !input.focused => {
            state.phase = GamePhase::Paused;
            log::debug!("Paused at distance {}", state.distance());
            events.push(GameEvent::Paused);
            return events;
        }
        _ => {}
    }

    if input.toggle_move {
        state.player.toggle_move();
        if state.phase == GamePhase::Ready {
            state.phase = GamePhase::Running;
            events.push(GameEvent::Started);
        }
    }

    step(state, delta_ms, &mut events);
    events
}

fn step(state: &mut GameState, delta_ms: f32, events: &mut Vec<GameEvent>) {
    let lf = loop_factor(delta_ms);
    state.time_ms += delta_ms as f64;
    let offscreen = state.offscreen();

    let player = &mut state.player;
    player.advance(delta_ms, lf);

    let mut game_over = false;
    if player.is_started() {
        let outcome = resolve_track_collision(player, &SegmentPath::new(state.track.segments()));
        game_over = outcome.is_game_over();
    }
    if !game_over {
        player.update_rotation(lf);
    }
    player.update_effect(delta_ms, lf, &mut state.rng);

    let track_update = state.track.update(player.pos(), offscreen, &mut state.rng);
    if let Some(index) = track_update.milestone {
        events.push(GameEvent::MilestoneReached { index });
    }

    let powerup_update = state.powerups.update(
        player.travel(),
        player.pos(),
        player.size(),
        state.track.segments(),
        offscreen,
        lf,
        &mut state.rng,
    );
    if powerup_update.collected > 0 {
        events.push(GameEvent::PowerUpCollected {
            total: state.powerups.collected(),
        });
    }

    if game_over {
        events.push(state.finish_run());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GameConfig;
    use glam::Vec2;

    const FRAME_MS: f32 = 16.0;

    fn new_state(seed: u64) -> GameState {
        GameState::new(GameConfig::with_viewport(800.0, 600.0), None, seed)
    }

    fn toggle() -> TickInput {
        TickInput {
            toggle_move: true,
            ..Default::default()
        }
    }

    /// Run until the player leaves the track without steering
    fn run_to_game_over(state: &mut GameState) -> Vec<GameEvent> {
        let mut events = tick(state, &toggle(), FRAME_MS);
        for _ in 0..10_000 {
            if state.phase == GamePhase::GameOver {
                break;
            }
            events.extend(tick(state, &TickInput::default(), FRAME_MS));
        }
        events
    }

    #[test]
    fn test_ready_until_toggle() {
        let mut state = new_state(1);
        let start = state.player.pos();
        tick(&mut state, &TickInput::default(), FRAME_MS);
        assert_eq!(state.phase, GamePhase::Ready);
        assert_eq!(state.player.pos(), start);

        let events = tick(&mut state, &toggle(), FRAME_MS);
        assert_eq!(state.phase, GamePhase::Running);
        assert_eq!(events, vec![GameEvent::Started]);
        assert_eq!(state.player.pos(), start + Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_focus_loss_pauses() {
        let mut state = new_state(2);
        tick(&mut state, &toggle(), FRAME_MS);
        let unfocused = TickInput {
            focused: false,
            ..Default::default()
        };
        assert_eq!(tick(&mut state, &unfocused, FRAME_MS), vec![GameEvent::Paused]);
        let pos = state.player.pos();
        tick(&mut state, &unfocused, FRAME_MS);
        assert_eq!(state.phase, GamePhase::Paused);
        assert_eq!(state.player.pos(), pos);

        let events = tick(&mut state, &TickInput::default(), FRAME_MS);
        assert_eq!(events, vec![GameEvent::Resumed]);
        assert_eq!(state.phase, GamePhase::Running);
        assert!(state.player.pos().x > pos.x);
    }

    #[test]
    fn test_unfocused_before_start_keeps_updating() {
        let mut state = new_state(3);
        let unfocused = TickInput {
            focused: false,
            ..Default::default()
        };
        tick(&mut state, &unfocused, FRAME_MS);
        assert_eq!(state.phase, GamePhase::Ready);
        assert_eq!(state.time_ms, FRAME_MS as f64);
    }

    #[test]
    fn test_running_straight_ends_the_run() {
        let mut state = new_state(4);
        let events = run_to_game_over(&mut state);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(!state.player.is_moving());
        let over = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(over, 1);
        assert!(state.reveal.is_some());

        // Entities are frozen once the run is over
        let pos = state.player.pos();
        let events = tick(&mut state, &toggle(), FRAME_MS);
        assert!(events.is_empty());
        assert_eq!(state.player.pos(), pos);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut state = new_state(5);
        run_to_game_over(&mut state);
        let restart = TickInput {
            restart: true,
            ..Default::default()
        };
        assert_eq!(tick(&mut state, &restart, FRAME_MS), vec![GameEvent::Restarted]);
        assert_eq!(state.phase, GamePhase::Ready);
        assert_eq!(state.runs, 1);
        assert_eq!(state.player.pos(), state.track.start_position());
    }

    #[test]
    fn test_determinism() {
        let mut a = new_state(77);
        let mut b = new_state(77);
        let inputs = [toggle(), TickInput::default(), TickInput::default(), toggle()];
        for _ in 0..20 {
            for input in &inputs {
                assert_eq!(tick(&mut a, input, FRAME_MS), tick(&mut b, input, FRAME_MS));
            }
        }
        assert_eq!(a.player.pos(), b.player.pos());
        assert_eq!(a.track.segments(), b.track.segments());
        assert_eq!(a.phase, b.phase);
    }
}
