//! Player trail effects
//!
//! Three trails share one interface through the `Effect` enum:
//! - Bubble: particles spawned in batches that drift, grow and fade
//! - Fire: tracer polyline resampled into short tapering strokes
//! - Golden: tracer polyline drawn as is
//!
//! Tracers record the player path on a timer into a bounded FIFO. When the
//! path bends, an extra corner point keeps every stroke axis-aligned.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::property::PropertyDescriptor;
use super::style::Hsl;
use crate::compound;

/// Bubble spawn interval
pub const BUBBLE_INTERVAL_MS: f32 = 50.0;
/// Tracer sampling interval
pub const TRACER_INTERVAL_MS: f32 = 30.0;

const PARTICLE_FRICTION: f32 = 0.98;
const FIRE_OFFSET_FACTOR: f32 = 0.25;
/// Smallest tracer buffer once quality scaling is applied
const MIN_TRACER_POINTS: usize = 2;

/// What an effect needs to know about the player each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectAnchor {
    pub pos: Vec2,
    pub speed: Vec2,
    pub size: f32,
}

/// Which canvas an effect draws on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectLayer {
    /// Under the player, on the game canvas
    Normal,
    /// Above everything, on the effects canvas
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrailKind {
    #[serde(rename = "bubbleTrail")]
    Bubble,
    #[serde(rename = "fireTrail")]
    Fire,
    #[serde(rename = "goldenTrail")]
    Golden,
}

impl TrailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrailKind::Bubble => "bubbleTrail",
            TrailKind::Fire => "fireTrail",
            TrailKind::Golden => "goldenTrail",
        }
    }

    /// Accepts both the stored name and the short radio value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bubbleTrail" | "bubble" => Some(TrailKind::Bubble),
            "fireTrail" | "fire" => Some(TrailKind::Fire),
            "goldenTrail" | "golden" => Some(TrailKind::Golden),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BubbleParams {
    pub trail_hue: f32,
    pub particle_size: f32,
    pub particle_count: u32,
    pub max_particles: u32,
}

impl Default for BubbleParams {
    fn default() -> Self {
        Self {
            trail_hue: 185.0,
            particle_size: 9.0,
            particle_count: 10,
            max_particles: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FireParams {
    pub trail_hue: f32,
    pub max_points: u32,
    pub trail_blurness: f32,
    pub trail_width: f32,
    /// Tail width as a fraction of `trail_width`, 0..=1
    pub min_trail_width: f32,
    pub line_resolution: f32,
}

impl Default for FireParams {
    fn default() -> Self {
        Self {
            trail_hue: 60.0,
            max_points: 20,
            trail_blurness: 2.0,
            trail_width: 12.0,
            min_trail_width: 0.3,
            line_resolution: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoldenParams {
    pub trail_hue: f32,
    pub max_points: u32,
    pub trail_blurness: f32,
    pub trail_width: f32,
}

impl Default for GoldenParams {
    fn default() -> Self {
        Self {
            trail_hue: 60.0,
            max_points: 15,
            trail_blurness: 0.0,
            trail_width: 15.0,
        }
    }
}

/// Persisted effect configuration (`effectProps` of a setup)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trailName")]
pub enum EffectParams {
    #[serde(rename = "bubbleTrail")]
    Bubble(BubbleParams),
    #[serde(rename = "fireTrail")]
    Fire(FireParams),
    #[serde(rename = "goldenTrail")]
    Golden(GoldenParams),
}

impl EffectParams {
    pub fn default_for(kind: TrailKind) -> Self {
        match kind {
            TrailKind::Bubble => EffectParams::Bubble(BubbleParams::default()),
            TrailKind::Fire => EffectParams::Fire(FireParams::default()),
            TrailKind::Golden => EffectParams::Golden(GoldenParams::default()),
        }
    }

    pub fn kind(&self) -> TrailKind {
        match self {
            EffectParams::Bubble(_) => TrailKind::Bubble,
            EffectParams::Fire(_) => TrailKind::Fire,
            EffectParams::Golden(_) => TrailKind::Golden,
        }
    }
}

/// A bubble
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub max_size: f32,
    pub growth: f32,
    pub color: Hsl,
}

impl Particle {
    fn spawn<R: Rng + ?Sized>(anchor: &EffectAnchor, size: f32, hue: f32, rng: &mut R) -> Self {
        let pos = anchor.pos
            + Vec2::new(
                (rng.random::<f32>() - 0.5) * anchor.size,
                (rng.random::<f32>() * 1.2 - 0.5) * anchor.size,
            );
        let vel = anchor.speed * 0.1
            + Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5);
        let saturation = rng.random_range(70..100) as f32;
        let lightness = rng.random_range(70..85) as f32;
        Self {
            pos,
            vel,
            size,
            max_size: size * 2.0,
            growth: rng.random::<f32>() * 0.01 + 1.015,
            color: Hsl::new(hue, saturation, lightness),
        }
    }

    /// Integrate one frame. Returns false once the particle is spent.
    fn update(&mut self, lf: f32) -> bool {
        self.vel *= compound(PARTICLE_FRICTION, lf);
        self.pos += self.vel * lf;
        self.size *= compound(self.growth, lf);
        self.size < self.max_size
    }

    pub fn alpha(&self) -> f32 {
        (1.0 - self.size / self.max_size).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct BubbleTrail {
    params: BubbleParams,
    particles: Vec<Particle>,
    timer: f32,
    particle_scale: f32,
}

impl BubbleTrail {
    pub fn new(params: BubbleParams) -> Self {
        Self {
            params,
            particles: Vec::new(),
            timer: 0.0,
            particle_scale: 1.0,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn particle_cap(&self) -> usize {
        (self.params.max_particles as f32 * self.particle_scale).round() as usize
    }

    fn update<R: Rng + ?Sized>(&mut self, anchor: &EffectAnchor, delta_ms: f32, lf: f32, rng: &mut R) {
        self.timer += delta_ms;
        let cap = self.particle_cap();
        if cap > 0 && self.particles.len() <= cap && self.timer >= BUBBLE_INTERVAL_MS {
            for _ in 0..self.params.particle_count {
                self.particles.push(Particle::spawn(
                    anchor,
                    self.params.particle_size,
                    self.params.trail_hue,
                    rng,
                ));
            }
            self.timer = 0.0;
        }
        self.particles.retain_mut(|p| p.update(lf));
    }
}

/// Bounded record of the player's path
#[derive(Debug, Clone)]
pub struct Tracer {
    points: VecDeque<Vec2>,
    timer: f32,
    max_points: u32,
    offset: f32,
    length_scale: f32,
}

impl Tracer {
    fn new(origin: Vec2, max_points: u32, offset: f32) -> Self {
        Self {
            points: VecDeque::from([origin]),
            timer: 0.0,
            max_points,
            offset,
            length_scale: 1.0,
        }
    }

    pub fn points(&self) -> &VecDeque<Vec2> {
        &self.points
    }

    pub fn capacity(&self) -> usize {
        ((self.max_points as f32 * self.length_scale).round() as usize).max(MIN_TRACER_POINTS)
    }

    fn update(&mut self, anchor: &EffectAnchor, delta_ms: f32) {
        self.timer += delta_ms;
        let cap = self.capacity();
        if self.points.len() <= cap && self.timer >= TRACER_INTERVAL_MS {
            self.add_point(anchor);
            self.timer = 0.0;
        }
        while self.points.len() > cap {
            self.points.pop_front();
        }
    }

    fn add_point(&mut self, anchor: &EffectAnchor) {
        let moving_x = anchor.speed.x > 0.0;
        let moving_y = anchor.speed.y > 0.0;
        let point = anchor.pos
            + Vec2::new(
                if moving_x { self.offset } else { 0.0 },
                if moving_y { self.offset } else { 0.0 },
            );

        if let Some(&prev) = self.points.back() {
            if prev.x != point.x && prev.y != point.y {
                self.points.push_back(Vec2::new(
                    if moving_x { prev.x } else { point.x },
                    if moving_y { prev.y } else { point.y },
                ));
            }
        }
        self.points.push_back(point);
    }
}

/// One stroke of a tracer trail
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailLine {
    pub p1: Vec2,
    pub p2: Vec2,
    pub width: f32,
}

/// Keep only the points where the path turns, plus both ends
pub fn simplify_path<'a, I>(points: I) -> Vec<Vec2>
where
    I: IntoIterator<Item = &'a Vec2>,
{
    let points: Vec<Vec2> = points.into_iter().copied().collect();
    let Some(&first) = points.first() else {
        return Vec::new();
    };

    let mut corner = first;
    let mut kept = vec![first];
    for i in 1..points.len() {
        let p = points[i];
        if p.x == corner.x || p.y == corner.y {
            continue;
        }
        corner = points[i - 1];
        kept.push(corner);
    }

    if let Some(&last) = points.last() {
        if kept.last() != Some(&last) {
            kept.push(last);
        }
    }
    kept
}

/// Points every `step` units along each axis-aligned leg of `path`
pub fn resample_path(path: &[Vec2], step: f32) -> Vec<Vec2> {
    let step = step.max(0.1);
    let mut samples = Vec::new();
    for leg in path.windows(2) {
        let (p1, p2) = (leg[0], leg[1]);
        let along_x = p1.x != p2.x;
        let length = if along_x { p2.x - p1.x } else { p2.y - p1.y };
        let count = (length / step).ceil() as i32;
        for i in 1..count {
            let d = step * i as f32;
            samples.push(if along_x {
                Vec2::new((p1.x + d).min(p2.x), p1.y)
            } else {
                Vec2::new(p1.x, (p1.y + d).min(p2.y))
            });
        }
    }
    samples
}

fn lines_between(points: &[Vec2], width: impl Fn(usize, usize) -> f32) -> Vec<TrailLine> {
    let n = points.len().saturating_sub(1);
    points
        .windows(2)
        .enumerate()
        .map(|(i, w)| TrailLine {
            p1: w[0],
            p2: w[1],
            width: width(i, n),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FireTrail {
    params: FireParams,
    tracer: Tracer,
    lines: Vec<TrailLine>,
}

impl FireTrail {
    pub fn new(params: FireParams, anchor: &EffectAnchor) -> Self {
        let tracer = Tracer::new(anchor.pos, params.max_points, anchor.size * FIRE_OFFSET_FACTOR);
        Self {
            params,
            tracer,
            lines: Vec::new(),
        }
    }

    /// Stroke width for line `i` of `n`: thin at the tail, full at the head
    pub fn line_width(&self, i: usize, n: usize) -> f32 {
        let FireParams {
            trail_width,
            min_trail_width,
            ..
        } = self.params;
        let t = (i + 1) as f32 / n.max(1) as f32;
        trail_width * (t * (1.0 - min_trail_width) + min_trail_width)
    }

    fn update(&mut self, anchor: &EffectAnchor, delta_ms: f32) {
        self.tracer.max_points = self.params.max_points;
        self.tracer.update(anchor, delta_ms);
        let path = simplify_path(self.tracer.points());
        let samples = resample_path(&path, self.params.line_resolution);
        self.lines = lines_between(&samples, |i, n| self.line_width(i, n));
    }
}

#[derive(Debug, Clone)]
pub struct GoldenTrail {
    params: GoldenParams,
    tracer: Tracer,
    lines: Vec<TrailLine>,
}

impl GoldenTrail {
    pub fn new(params: GoldenParams, anchor: &EffectAnchor) -> Self {
        let tracer = Tracer::new(anchor.pos, params.max_points, 0.0);
        Self {
            params,
            tracer,
            lines: Vec::new(),
        }
    }

    fn update(&mut self, anchor: &EffectAnchor, delta_ms: f32) {
        self.tracer.max_points = self.params.max_points;
        self.tracer.update(anchor, delta_ms);
        let path = simplify_path(self.tracer.points());
        let width = self.params.trail_width;
        self.lines = lines_between(&path, |_, _| width);
    }
}

/// The player's trail
#[derive(Debug, Clone)]
pub enum Effect {
    Bubble(BubbleTrail),
    Fire(FireTrail),
    Golden(GoldenTrail),
}

impl Effect {
    pub fn new(params: &EffectParams, anchor: &EffectAnchor) -> Self {
        match params {
            EffectParams::Bubble(p) => Effect::Bubble(BubbleTrail::new(p.clone())),
            EffectParams::Fire(p) => Effect::Fire(FireTrail::new(p.clone(), anchor)),
            EffectParams::Golden(p) => Effect::Golden(GoldenTrail::new(p.clone(), anchor)),
        }
    }

    pub fn kind(&self) -> TrailKind {
        match self {
            Effect::Bubble(_) => TrailKind::Bubble,
            Effect::Fire(_) => TrailKind::Fire,
            Effect::Golden(_) => TrailKind::Golden,
        }
    }

    pub fn layer(&self) -> EffectLayer {
        match self {
            Effect::Bubble(_) => EffectLayer::Overlay,
            Effect::Fire(_) | Effect::Golden(_) => EffectLayer::Normal,
        }
    }

    pub fn params(&self) -> EffectParams {
        match self {
            Effect::Bubble(t) => EffectParams::Bubble(t.params.clone()),
            Effect::Fire(t) => EffectParams::Fire(t.params.clone()),
            Effect::Golden(t) => EffectParams::Golden(t.params.clone()),
        }
    }

    pub fn hue(&self) -> f32 {
        match self {
            Effect::Bubble(t) => t.params.trail_hue,
            Effect::Fire(t) => t.params.trail_hue,
            Effect::Golden(t) => t.params.trail_hue,
        }
    }

    /// Canvas blur radius in pixels
    pub fn blur(&self) -> f32 {
        match self {
            Effect::Bubble(_) => 0.0,
            Effect::Fire(t) => t.params.trail_blurness,
            Effect::Golden(t) => t.params.trail_blurness,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        match self {
            Effect::Bubble(t) => t.particles(),
            _ => &[],
        }
    }

    pub fn trail_lines(&self) -> &[TrailLine] {
        match self {
            Effect::Bubble(_) => &[],
            Effect::Fire(t) => &t.lines,
            Effect::Golden(t) => &t.lines,
        }
    }

    pub fn tracer(&self) -> Option<&Tracer> {
        match self {
            Effect::Bubble(_) => None,
            Effect::Fire(t) => Some(&t.tracer),
            Effect::Golden(t) => Some(&t.tracer),
        }
    }

    /// Scale particle and trail caps (quality presets). Saved params are
    /// unaffected.
    pub fn set_quality(&mut self, particle_scale: f32, trail_scale: f32) {
        match self {
            Effect::Bubble(t) => t.particle_scale = particle_scale.max(0.0),
            Effect::Fire(t) => t.tracer.length_scale = trail_scale.max(0.0),
            Effect::Golden(t) => t.tracer.length_scale = trail_scale.max(0.0),
        }
    }

    pub fn update<R: Rng + ?Sized>(&mut self, anchor: &EffectAnchor, delta_ms: f32, lf: f32, rng: &mut R) {
        match self {
            Effect::Bubble(t) => t.update(anchor, delta_ms, lf, rng),
            Effect::Fire(t) => t.update(anchor, delta_ms),
            Effect::Golden(t) => t.update(anchor, delta_ms),
        }
    }

    /// Slider descriptors with current values
    pub fn properties(&self) -> Vec<PropertyDescriptor> {
        let hue = PropertyDescriptor::new("trailHue", "Trail Hue", 0.0, 360.0, 1.0, self.hue());
        match self {
            Effect::Bubble(t) => {
                let p = &t.params;
                vec![
                    hue,
                    PropertyDescriptor::new("maxParticles", "Max Particles", 10.0, 150.0, 2.0, p.max_particles as f32),
                    PropertyDescriptor::new("particleSize", "Particle Size", 1.0, 20.0, 1.0, p.particle_size),
                    PropertyDescriptor::new("particleCount", "Particle Generation", 1.0, 20.0, 1.0, p.particle_count as f32),
                ]
            }
            Effect::Fire(t) => {
                let p = &t.params;
                vec![
                    hue,
                    PropertyDescriptor::new("trailBlurness", "Trail Blurness", 0.0, 10.0, 0.5, p.trail_blurness),
                    PropertyDescriptor::new("trailWidth", "Trail Width", 5.0, 50.0, 1.0, p.trail_width),
                    PropertyDescriptor::new("minTrailWidth", "Trail's Tail Width", 0.0, 1.0, 0.1, p.min_trail_width),
                    PropertyDescriptor::new("lineResolution", "Trail Resolution", 1.0, 10.0, 0.1, p.line_resolution),
                    PropertyDescriptor::new("maxPoints", "Trail Length", 10.0, 50.0, 1.0, p.max_points as f32),
                ]
            }
            Effect::Golden(t) => {
                let p = &t.params;
                vec![
                    hue,
                    PropertyDescriptor::new("trailBlurness", "Trail Blurness", 0.0, 10.0, 0.5, p.trail_blurness),
                    PropertyDescriptor::new("trailWidth", "Trail Width", 5.0, 50.0, 1.0, p.trail_width),
                    PropertyDescriptor::new("maxPoints", "Trail Length", 10.0, 50.0, 1.0, p.max_points as f32),
                ]
            }
        }
    }

    /// Assign a property by key. Returns false for keys this trail lacks.
    pub fn set_property(&mut self, key: &str, value: f32) -> bool {
        let count = value.round().max(0.0) as u32;
        match self {
            Effect::Bubble(t) => match key {
                "trailHue" => t.params.trail_hue = value,
                "maxParticles" => t.params.max_particles = count,
                "particleSize" => t.params.particle_size = value,
                "particleCount" => t.params.particle_count = count,
                _ => return false,
            },
            Effect::Fire(t) => match key {
                "trailHue" => t.params.trail_hue = value,
                "trailBlurness" => t.params.trail_blurness = value,
                "trailWidth" => t.params.trail_width = value,
                "minTrailWidth" => t.params.min_trail_width = value,
                "lineResolution" => t.params.line_resolution = value,
                "maxPoints" => t.params.max_points = count,
                _ => return false,
            },
            Effect::Golden(t) => match key {
                "trailHue" => t.params.trail_hue = value,
                "trailBlurness" => t.params.trail_blurness = value,
                "trailWidth" => t.params.trail_width = value,
                "maxPoints" => t.params.max_points = count,
                _ => return false,
            },
        }
        true
    }
}
