//! Parallax background scrolled over a Worley noise bitmap
//!
//! The bitmap is twice the viewport height and is drawn twice, stacked, so a
//! scroll offset that wraps by the bitmap height never shows a seam.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::worley::{NoiseField, NoiseParams, Rgb};
use crate::consts::BACKGROUND_WIND_SPEED;

/// Background tuning on top of the default noise palette
pub const BACKGROUND_MAX_DISTANCE: f32 = 350.0;
pub const BACKGROUND_RATIO_POWER: f32 = 1.5;
/// Scroll speed scale per millisecond
const SCROLL_SCALE: f32 = 0.02;

/// Noise parameters for a background covering the given viewport
pub fn background_params(viewport_w: u32, viewport_h: u32) -> NoiseParams {
    NoiseParams {
        max_distance_for_ratio: BACKGROUND_MAX_DISTANCE,
        ratio_power: BACKGROUND_RATIO_POWER,
        ..NoiseParams::with_size(viewport_w, viewport_h * 2)
    }
}

/// Scrolling state plus the currently published bitmap
#[derive(Debug)]
pub struct Background {
    viewport_h: f32,
    total_h: f32,
    y: f32,
    wind_speed: f32,
    field: Option<NoiseField>,
}

impl Background {
    pub fn new(viewport_h: f32) -> Self {
        let total_h = viewport_h * 2.0;
        Self {
            viewport_h,
            total_h,
            y: viewport_h - total_h,
            wind_speed: BACKGROUND_WIND_SPEED,
            field: None,
        }
    }

    /// Advance the scroll. `player_speed` is added to the wind while the
    /// player is moving.
    pub fn update(&mut self, delta_ms: f32, player_speed: Option<f32>) {
        let speed = self.wind_speed + player_speed.unwrap_or(0.0);
        self.y += speed * delta_ms * SCROLL_SCALE;
        // Any number of whole bitmap heights, so one long frame lands in
        // (viewport - total, viewport] as well
        if self.y > self.viewport_h && self.total_h > 0.0 {
            self.y = self.viewport_h - (self.viewport_h - self.y).rem_euclid(self.total_h);
        }
    }

    /// Vertical draw offsets of the two stacked copies
    pub fn draw_offsets(&self) -> [f32; 2] {
        [self.y - self.total_h, self.y]
    }

    pub fn offset(&self) -> f32 {
        self.y
    }

    pub fn total_height(&self) -> f32 {
        self.total_h
    }

    pub fn field(&self) -> Option<&NoiseField> {
        self.field.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.field.is_some()
    }

    /// Replace the bitmap in one step
    pub fn publish(&mut self, field: NoiseField) {
        self.field = Some(field);
    }

    /// Recolour the published bitmap (distances are kept)
    pub fn set_colors(&mut self, start: Rgb, end: Rgb) {
        if let Some(field) = self.field.as_mut() {
            field.set_colors(start, end);
        }
    }

    /// Take a finished job result, if any
    pub fn poll(&mut self, job: &mut BackgroundJob) -> bool {
        match job.try_take() {
            Some(field) => {
                self.publish(field);
                true
            }
            None => false,
        }
    }
}

/// Noise generation running off the frame loop
///
/// On native targets the field is generated on a worker thread and handed
/// back over a channel. wasm has no threads here, so generation runs inside
/// `spawn` and the result is ready on the first poll.
#[derive(Debug)]
pub struct BackgroundJob {
    #[cfg(not(target_arch = "wasm32"))]
    rx: Option<std::sync::mpsc::Receiver<NoiseField>>,
    #[cfg(target_arch = "wasm32")]
    ready: Option<NoiseField>,
}

impl BackgroundJob {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn spawn(params: NoiseParams, seed: u64) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("background-noise".into())
            .spawn(move || {
                let mut rng = Pcg32::seed_from_u64(seed);
                let field = NoiseField::generate(params, &mut rng);
                // Receiver may be gone if the job was dropped
                let _ = tx.send(field);
            });
        match spawned {
            Ok(_) => Self { rx: Some(rx) },
            Err(e) => {
                log::warn!("Failed to spawn background thread: {}", e);
                Self { rx: None }
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn spawn(params: NoiseParams, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        Self {
            ready: Some(NoiseField::generate(params, &mut rng)),
        }
    }

    /// Finished field, at most once
    #[cfg(not(target_arch = "wasm32"))]
    pub fn try_take(&mut self) -> Option<NoiseField> {
        let field = self.rx.as_ref()?.try_recv().ok()?;
        self.rx = None;
        Some(field)
    }

    #[cfg(target_arch = "wasm32")]
    pub fn try_take(&mut self) -> Option<NoiseField> {
        self.ready.take()
    }

    /// Block until the field is ready
    #[cfg(not(target_arch = "wasm32"))]
    pub fn wait(mut self) -> Option<NoiseField> {
        self.rx.take()?.recv().ok()
    }

    #[cfg(target_arch = "wasm32")]
    pub fn wait(mut self) -> Option<NoiseField> {
        self.ready.take()
    }
}
