//! Customisation preview
//!
//! A `PreviewSession` drives a preview-mode player running in place while
//! the host's panel edits it. Every control the session wires up is
//! registered with a `ListenerHost` and released again when the session
//! closes, switches target or is dropped.

use glam::Vec2;
use rand::Rng;

use crate::loop_factor;
use crate::persistence::setups::SetupPreset;
use crate::sim::effects::{Effect, EffectParams, TrailKind};
use crate::sim::player::{PLAYER_SIZE_LIMIT, Player, PlayerMode, PlayerProps, PlayerShape};
use crate::sim::property::PropertyDescriptor;
use crate::sim::state::{PlayerView, TrailView};

pub const PLAYER_COLOR_KEY: &str = "playerColor";
pub const PLAYER_SIZE_KEY: &str = "playerSize";

/// Handle to one attached listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Slider,
    ResetButton,
    TrailRadio,
}

/// Whatever owns the panel's controls
pub trait ListenerHost {
    fn attach(&mut self, control: &str, kind: ControlKind) -> ListenerId;
    fn detach(&mut self, id: ListenerId);
}

impl<H: ListenerHost + ?Sized> ListenerHost for &mut H {
    fn attach(&mut self, control: &str, kind: ControlKind) -> ListenerId {
        (**self).attach(control, kind)
    }

    fn detach(&mut self, id: ListenerId) {
        (**self).detach(id)
    }
}

/// A property slider together with the value it opened with
#[derive(Debug, Clone)]
struct Control {
    descriptor: PropertyDescriptor,
    default: f32,
    listeners: [ListenerId; 2],
}

/// What the preview canvas draws
#[derive(Debug, Clone)]
pub struct PreviewView {
    /// Screen point the player is pinned to
    pub anchor: Vec2,
    /// Translation from world to screen
    pub offset: Vec2,
    pub player: PlayerView,
    pub trail: TrailView,
}

pub struct PreviewSession<H: ListenerHost> {
    host: H,
    player: Player,
    anchor: Vec2,
    player_controls: Vec<Control>,
    effect_controls: Vec<Control>,
    trail_radios: Vec<ListenerId>,
}

impl<H: ListenerHost> PreviewSession<H> {
    /// Preview `props` with `effect` (or the shape's default trail) pinned
    /// at 62.5% width, half height of `viewport`
    pub fn open(host: H, props: &PlayerProps, effect: Option<&EffectParams>, viewport: Vec2) -> Self {
        let mut session = Self {
            host,
            player: Player::preview(props, effect),
            anchor: Vec2::new(viewport.x * 0.625, viewport.y * 0.5),
            player_controls: Vec::new(),
            effect_controls: Vec::new(),
            trail_radios: Vec::new(),
        };
        session.attach_all();
        log::debug!(
            "Preview opened for {} with {}",
            props.player_type.as_str(),
            session.player.effect().kind().as_str()
        );
        session
    }

    /// Fresh preview of `shape` with its default look
    pub fn open_default(host: H, shape: PlayerShape, viewport: Vec2) -> Self {
        Self::open(host, &PlayerProps::defaults(shape, PlayerMode::Preview), None, viewport)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn listener_count(&self) -> usize {
        self.trail_radios.len() + (self.player_controls.len() + self.effect_controls.len()) * 2
    }

    fn player_descriptors(&self) -> Vec<PropertyDescriptor> {
        let size = self.player.size();
        vec![
            PropertyDescriptor::new(PLAYER_COLOR_KEY, "Player Color", 0.0, 360.0, 1.0, self.player.hue()),
            PropertyDescriptor::new(PLAYER_SIZE_KEY, "Player Size", size.min(PLAYER_SIZE_LIMIT), PLAYER_SIZE_LIMIT, 1.0, size),
        ]
    }

    fn attach_control(host: &mut H, descriptor: PropertyDescriptor) -> Control {
        let slider = host.attach(descriptor.key, ControlKind::Slider);
        let reset = host.attach(descriptor.key, ControlKind::ResetButton);
        Control {
            default: descriptor.value,
            descriptor,
            listeners: [slider, reset],
        }
    }

    fn attach_effect_controls(&mut self) {
        let host = &mut self.host;
        self.effect_controls = self
            .player
            .effect()
            .properties()
            .into_iter()
            .map(|d| Self::attach_control(host, d))
            .collect();
    }

    fn detach_effect_controls(&mut self) {
        for control in self.effect_controls.drain(..) {
            for id in control.listeners {
                self.host.detach(id);
            }
        }
    }

    fn attach_all(&mut self) {
        let descriptors = self.player_descriptors();
        let host = &mut self.host;
        self.player_controls = descriptors
            .into_iter()
            .map(|d| Self::attach_control(host, d))
            .collect();
        self.trail_radios = [TrailKind::Bubble, TrailKind::Fire, TrailKind::Golden]
            .iter()
            .map(|kind| self.host.attach(kind.as_str(), ControlKind::TrailRadio))
            .collect();
        self.attach_effect_controls();
    }

    fn detach_all(&mut self) {
        self.detach_effect_controls();
        for control in self.player_controls.drain(..) {
            for id in control.listeners {
                self.host.detach(id);
            }
        }
        for id in self.trail_radios.drain(..) {
            self.host.detach(id);
        }
    }

    /// Every editable property with its current value
    pub fn properties(&self) -> Vec<PropertyDescriptor> {
        self.player_controls
            .iter()
            .chain(&self.effect_controls)
            .map(|c| c.descriptor.clone())
            .collect()
    }

    fn control_mut(&mut self, key: &str) -> Option<&mut Control> {
        self.player_controls
            .iter_mut()
            .chain(self.effect_controls.iter_mut())
            .find(|c| c.descriptor.key == key)
    }

    fn apply(&mut self, key: &str, value: f32) -> bool {
        match key {
            PLAYER_COLOR_KEY => self.player.set_hue(value),
            PLAYER_SIZE_KEY => self.player.set_size(value),
            _ => return self.player.effect_mut().set_property(key, value),
        }
        true
    }

    /// Slider input. The value is clamped and snapped to the slider; the
    /// applied value is returned, `None` for unknown keys.
    pub fn set_property(&mut self, key: &str, value: f32) -> Option<f32> {
        let control = self.control_mut(key)?;
        let value = control.descriptor.normalize(value);
        control.descriptor.value = value;
        self.apply(key, value).then_some(value)
    }

    /// Reset button: back to the value the control opened with
    pub fn reset_property(&mut self, key: &str) -> Option<f32> {
        let control = self.control_mut(key)?;
        let value = control.default;
        control.descriptor.value = value;
        self.apply(key, value).then_some(value)
    }

    /// Trail radio: replace the effect with `kind`'s defaults
    pub fn switch_trail(&mut self, kind: TrailKind) {
        if self.player.effect().kind() == kind {
            return;
        }
        self.detach_effect_controls();
        let effect = Effect::new(&EffectParams::default_for(kind), &self.player.anchor());
        self.player.set_effect(effect);
        self.attach_effect_controls();
        log::debug!("Preview trail switched to {}", kind.as_str());
    }

    /// Preview another shape from scratch
    pub fn switch_shape(&mut self, shape: PlayerShape) {
        self.detach_all();
        self.player = Player::preview(&PlayerProps::defaults(shape, PlayerMode::Preview), None);
        self.attach_all();
    }

    pub fn update<R: Rng + ?Sized>(&mut self, delta_ms: f32, rng: &mut R) {
        let lf = loop_factor(delta_ms);
        self.player.advance(delta_ms, lf);
        self.player.update_effect(delta_ms, lf, rng);
    }

    /// Current look as a saveable setup
    pub fn capture(&self, name: impl Into<String>) -> SetupPreset {
        SetupPreset {
            player_props: self.player.props(),
            effect_props: self.player.effect().params(),
            setup_name: name.into(),
        }
    }

    pub fn view(&self) -> PreviewView {
        PreviewView {
            anchor: self.anchor,
            offset: self.anchor - self.player.pos(),
            player: PlayerView::of(&self.player),
            trail: TrailView::of(self.player.effect()),
        }
    }

    /// End the session, releasing every listener
    pub fn close(mut self) -> SetupPreset {
        let setup = self.capture("");
        self.detach_all();
        setup
    }
}

impl<H: ListenerHost> Drop for PreviewSession<H> {
    fn drop(&mut self) {
        self.detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::BTreeMap;

    /// Records live listeners
    #[derive(Default)]
    struct Panel {
        next: u64,
        live: BTreeMap<ListenerId, (String, ControlKind)>,
    }

    impl ListenerHost for Panel {
        fn attach(&mut self, control: &str, kind: ControlKind) -> ListenerId {
            self.next += 1;
            let id = ListenerId(self.next);
            self.live.insert(id, (control.to_string(), kind));
            id
        }

        fn detach(&mut self, id: ListenerId) {
            assert!(self.live.remove(&id).is_some(), "{:?} detached twice", id);
        }
    }

    fn viewport() -> Vec2 {
        Vec2::new(800.0, 400.0)
    }

    #[test]
    fn test_open_attaches_controls() {
        let mut panel = Panel::default();
        let session = PreviewSession::open_default(&mut panel, PlayerShape::Ball, viewport());
        // 2 player sliders, 4 bubble sliders, each with a reset, plus 3 radios
        assert_eq!(session.listener_count(), 15);
        assert_eq!(session.player().effect().kind(), TrailKind::Bubble);
        assert_eq!(session.player().size(), 30.0);
        drop(session);
        assert!(panel.live.is_empty());
    }

    #[test]
    fn test_set_and_reset_property() {
        let mut panel = Panel::default();
        let mut session = PreviewSession::open_default(&mut panel, PlayerShape::Ball, viewport());
        assert_eq!(session.set_property(PLAYER_COLOR_KEY, 400.0), Some(360.0));
        assert_eq!(session.player().hue(), 360.0);
        // Size can only grow from where it opened
        assert_eq!(session.set_property(PLAYER_SIZE_KEY, 10.0), Some(30.0));
        assert_eq!(session.set_property(PLAYER_SIZE_KEY, 44.6), Some(45.0));
        assert_eq!(session.player().body().len(), 20);

        assert_eq!(session.set_property("particleSize", 12.0), Some(12.0));
        assert_eq!(session.reset_property("particleSize"), Some(9.0));
        assert_eq!(session.reset_property(PLAYER_COLOR_KEY), Some(185.0));
        assert_eq!(session.set_property("trailWidth", 5.0), None);
    }

    #[test]
    fn test_switch_trail_rebinds_effect_controls() {
        let mut panel = Panel::default();
        let mut session = PreviewSession::open_default(&mut panel, PlayerShape::Ball, viewport());
        session.switch_trail(TrailKind::Fire);
        assert_eq!(session.player().effect().kind(), TrailKind::Fire);
        // Fire has 6 sliders
        assert_eq!(session.listener_count(), 2 * 2 + 6 * 2 + 3);
        assert!(session.properties().iter().any(|p| p.key == "lineResolution"));
        assert!(session.properties().iter().all(|p| p.key != "particleSize"));
        drop(session);
        assert!(panel.live.is_empty());
    }

    #[test]
    fn test_switch_shape_and_close() {
        let mut panel = Panel::default();
        let mut session = PreviewSession::open_default(&mut panel, PlayerShape::Ball, viewport());
        session.switch_shape(PlayerShape::Star);
        assert_eq!(session.player().shape(), PlayerShape::Star);
        assert_eq!(session.player().effect().kind(), TrailKind::Golden);
        let setup = session.close();
        assert_eq!(setup.player_props.player_type, PlayerShape::Star);
        assert!(panel.live.is_empty());
    }

    #[test]
    fn test_update_runs_in_place() {
        let mut panel = Panel::default();
        let mut rng = Pcg32::seed_from_u64(8);
        let mut session = PreviewSession::open_default(&mut panel, PlayerShape::Ball, viewport());
        for _ in 0..10 {
            session.update(16.0, &mut rng);
        }
        let view = session.view();
        assert_eq!(view.player.pos, Vec2::new(50.0, 0.0));
        assert_eq!(view.anchor, Vec2::new(500.0, 200.0));
        assert_eq!(view.offset + view.player.pos, view.anchor);
        assert!(!view.trail.particles.is_empty());
    }

    #[test]
    fn test_capture_round_trips_through_game() {
        let mut panel = Panel::default();
        let mut session = PreviewSession::open_default(&mut panel, PlayerShape::Ball, viewport());
        session.switch_trail(TrailKind::Golden);
        session.set_property("trailHue", 300.0);
        let setup = session.capture("purple");
        assert_eq!(setup.setup_name, "purple");
        assert_eq!(setup.effect_props.kind(), TrailKind::Golden);

        let json = serde_json::to_string(&setup).unwrap();
        let back: SetupPreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, setup);
    }
}
