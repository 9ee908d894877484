//! Worley (cellular) noise field
//!
//! Seeds are scattered over the field, every pixel gets the squared distance
//! to its nearest seed, and distances are mapped through a power ramp onto a
//! two-colour gradient.
//!
//! Nearest-seed lookup does not query the quadtree per pixel. A candidate set
//! is fetched once per `k` pixels along a row (`k = floor(max_dist * 0.1)`)
//! and reused for the block, which is an approximation: a pixel can miss a
//! nearer seed outside the cached window. The background look depends on it.

use std::path::Path;

use glam::Vec2;
use image::ImageError;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::quadtree::{BoundaryRegion, QuadTree};
use crate::platform::now_ms;

/// Quadtree capacity used for seed lookup
pub const SEED_TREE_CAPACITY: usize = 7;

/// Seed density: `DENSITY_POINTS` seeds per `DENSITY_AREA` pixels
const DENSITY_POINTS: f32 = 40.0;
const DENSITY_AREA: f32 = 1_524_196.0;

/// Search window half height, relative to `max_distance_for_ratio`
const SEARCH_HEIGHT_FACTOR: f32 = 1.2;
/// Candidate block size, relative to `max_distance_for_ratio`
const BLOCK_FACTOR: f32 = 0.1;

/// An opaque RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub width: u32,
    pub height: u32,
    pub point_count: u32,
    pub max_distance_for_ratio: f32,
    pub ratio_power: f32,
    pub start_color: Rgb,
    pub end_color: Rgb,
}

impl NoiseParams {
    /// Parameters for a field of the given size with the default density and palette
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            point_count: default_point_count(width, height),
            max_distance_for_ratio: 200.0,
            ratio_power: 2.0,
            start_color: Rgb::new(0xaa, 0xa8, 0xd7),
            end_color: Rgb::new(0x7c, 0x7c, 0x9d),
        }
    }
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self::with_size(400, 400)
    }
}

/// Seed count that keeps the cell size constant across field sizes
pub fn default_point_count(width: u32, height: u32) -> u32 {
    (DENSITY_POINTS * height as f32 * width as f32 / DENSITY_AREA).floor() as u32
}

/// Generated Worley noise bitmap
#[derive(Debug, Clone)]
pub struct NoiseField {
    params: NoiseParams,
    seeds: Vec<Vec2>,
    /// Nearest-seed squared distance per pixel, row-major
    distances: Vec<f32>,
    /// RGBA8, row-major
    pixels: Vec<u8>,
}

impl NoiseField {
    /// Scatter random seeds and build the bitmap
    pub fn generate<R: Rng + ?Sized>(params: NoiseParams, rng: &mut R) -> Self {
        let seeds = scatter_seeds(params.width, params.height, params.point_count, rng);
        Self::from_seeds(params, seeds)
    }

    /// Build the bitmap for a fixed seed set (deterministic)
    pub fn from_seeds(params: NoiseParams, seeds: Vec<Vec2>) -> Self {
        let started = now_ms();
        let mut field = Self {
            params,
            seeds,
            distances: Vec::new(),
            pixels: Vec::new(),
        };
        field.compute_distances();
        field.regenerate_pixels();
        log::info!(
            "Worley field {}x{} ({} seeds) generated in {:.0} ms",
            field.params.width,
            field.params.height,
            field.seeds.len(),
            now_ms() - started
        );
        field
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    pub fn width(&self) -> u32 {
        self.params.width
    }

    pub fn height(&self) -> u32 {
        self.params.height
    }

    pub fn seeds(&self) -> &[Vec2] {
        &self.seeds
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// RGBA8 buffer, `width * height * 4` bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA of the pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.params.width || y >= self.params.height {
            return None;
        }
        let i = (y as usize * self.params.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Scatter a fresh seed set (e.g. after a point-count change) and rebuild
    pub fn respawn<R: Rng + ?Sized>(&mut self, point_count: u32, rng: &mut R) {
        self.params.point_count = point_count;
        self.seeds = scatter_seeds(self.params.width, self.params.height, point_count, rng);
        self.compute_distances();
        self.regenerate_pixels();
    }

    /// Change the colour ramp; distances are reused
    pub fn set_colors(&mut self, start: Rgb, end: Rgb) {
        self.params.start_color = start;
        self.params.end_color = end;
        self.regenerate_pixels();
    }

    /// Change the ramp exponent; distances are reused
    pub fn set_ratio_power(&mut self, ratio_power: f32) {
        self.params.ratio_power = ratio_power;
        self.regenerate_pixels();
    }

    /// Change the ramp distance. The candidate block size depends on it, so
    /// distances are recomputed too.
    pub fn set_max_distance_for_ratio(&mut self, max_distance: f32) {
        self.params.max_distance_for_ratio = max_distance;
        self.compute_distances();
        self.regenerate_pixels();
    }

    /// Map distances to RGBA through the colour ramp
    pub fn regenerate_pixels(&mut self) {
        let NoiseParams {
            max_distance_for_ratio,
            ratio_power,
            start_color,
            end_color,
            ..
        } = self.params;
        let max_sq = max_distance_for_ratio * max_distance_for_ratio;
        let no_seeds = self.seeds.is_empty();

        self.pixels.clear();
        self.pixels.reserve(self.distances.len() * 4);
        for &distance in &self.distances {
            let ratio = if no_seeds || max_sq <= 0.0 {
                1.0
            } else {
                (distance / max_sq).max(0.0).powf(ratio_power * 0.5)
            };
            self.pixels.extend_from_slice(&[
                lerp_channel(start_color.r, end_color.r, ratio),
                lerp_channel(start_color.g, end_color.g, ratio),
                lerp_channel(start_color.b, end_color.b, ratio),
                255,
            ]);
        }
    }

    /// Encode the bitmap as PNG
    pub fn write_png(&self, path: &Path) -> Result<(), ImageError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.params.width,
            self.params.height,
            image::ExtendedColorType::Rgba8,
        )
    }

    fn compute_distances(&mut self) {
        let width = self.params.width as usize;
        let height = self.params.height as usize;
        self.distances = vec![f32::MAX; width * height];
        if width == 0 || height == 0 || self.seeds.is_empty() {
            return;
        }

        let region = BoundaryRegion::from_size(width as f32, height as f32);
        let mut tree = QuadTree::new(region, SEED_TREE_CAPACITY);
        for seed in &self.seeds {
            if !tree.insert(*seed) {
                log::warn!("Seed {:?} outside {}x{} field, dropped", seed, width, height);
            }
        }

        let max_distance = self.params.max_distance_for_ratio;
        let block = ((max_distance * BLOCK_FACTOR).floor() as usize).max(1);
        let half_block = (block / 2) as f32;
        let mut search = BoundaryRegion {
            cx: (width as f32 * 0.5).floor(),
            cy: 0.0,
            hw: width as f32 * 0.5,
            hh: (max_distance * SEARCH_HEIGHT_FACTOR).max(1.0),
        };

        let mut candidates: Vec<Vec2> = Vec::new();
        // The window moves once per block on each axis, so rows inside a
        // block share its vertical placement.
        for j in 0..height {
            if j % block == 0 {
                search.cy = j as f32 + half_block;
            }
            let row = j * width;
            for i in 0..width {
                if i % block == 0 {
                    search.cx = i as f32 + half_block;
                    candidates = tree.query(&search);
                }
                let pixel = Vec2::new(i as f32, j as f32);
                self.distances[row + i] = candidates
                    .iter()
                    .map(|seed| seed.distance_squared(pixel))
                    .fold(f32::MAX, f32::min);
            }
        }
    }
}

fn scatter_seeds<R: Rng + ?Sized>(width: u32, height: u32, count: u32, rng: &mut R) -> Vec<Vec2> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    (0..count)
        .map(|_| {
            Vec2::new(
                rng.random_range(0..width) as f32,
                rng.random_range(0..height) as f32,
            )
        })
        .collect()
}

#[inline]
fn lerp_channel(start: u8, end: u8, ratio: f32) -> u8 {
    let value = (start as f32 + ratio * (end as f32 - start as f32)).floor();
    value.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn scenario_params() -> NoiseParams {
        NoiseParams {
            width: 10,
            height: 10,
            point_count: 1,
            max_distance_for_ratio: 10.0,
            ratio_power: 2.0,
            start_color: Rgb::new(0, 0, 0),
            end_color: Rgb::new(100, 100, 100),
        }
    }

    #[test]
    fn test_single_seed_scenario() {
        let field = NoiseField::from_seeds(scenario_params(), vec![Vec2::ZERO]);
        assert_eq!(field.pixels().len(), 10 * 10 * 4);
        assert_eq!(field.pixel(0, 0), Some([0, 0, 0, 255]));

        // Far corner sees the seed wrapped in from the left edge at (10, 0):
        // d = 1 + 81 = 82, ratio 0.82
        let corner = field.pixel(9, 9).unwrap();
        assert!((81..=82).contains(&corner[0]), "corner = {:?}", corner);
        assert_eq!(corner[0], corner[1]);
        assert_eq!(corner[1], corner[2]);
        assert_eq!(corner[3], 255);
    }

    #[test]
    fn test_distances_grow_away_from_seed() {
        let field = NoiseField::from_seeds(scenario_params(), vec![Vec2::ZERO]);
        let d = field.distances();
        assert_eq!(d[0], 0.0);
        assert_eq!(d[1], 1.0);
        assert_eq!(d[2], 4.0);
        assert_eq!(d[10], 1.0);
        assert_eq!(d[11], 2.0);
    }

    #[test]
    fn test_no_seeds_uses_end_color() {
        let mut params = scenario_params();
        params.point_count = 0;
        let field = NoiseField::from_seeds(params, Vec::new());
        assert!(field.pixels().chunks(4).all(|p| p == [100, 100, 100, 255]));
    }

    #[test]
    fn test_zero_max_distance_uses_end_color() {
        let mut params = scenario_params();
        params.max_distance_for_ratio = 0.0;
        let field = NoiseField::from_seeds(params, vec![Vec2::new(3.0, 3.0)]);
        assert!(field.pixels().chunks(4).all(|p| p == [100, 100, 100, 255]));
    }

    #[test]
    fn test_deterministic_for_fixed_seeds() {
        let params = NoiseParams {
            max_distance_for_ratio: 40.0,
            ratio_power: 1.5,
            ..NoiseParams::with_size(64, 48)
        };
        let mut rng = Pcg32::seed_from_u64(7);
        let a = NoiseField::generate(
            NoiseParams { point_count: 12, ..params.clone() },
            &mut rng,
        );
        let b = NoiseField::from_seeds(a.params().clone(), a.seeds().to_vec());
        assert_eq!(a.pixels(), b.pixels());

        let mut rng = Pcg32::seed_from_u64(7);
        let c = NoiseField::generate(
            NoiseParams { point_count: 12, ..params },
            &mut rng,
        );
        assert_eq!(a.seeds(), c.seeds());
        assert_eq!(a.pixels(), c.pixels());
    }

    fn block_params() -> NoiseParams {
        NoiseParams {
            width: 200,
            height: 300,
            point_count: 6,
            max_distance_for_ratio: 50.0,
            ratio_power: 2.0,
            start_color: Rgb::new(0, 0, 0),
            end_color: Rgb::new(255, 255, 255),
        }
    }

    /// Straight row-major walk: re-query when either coordinate starts a block
    fn block_walk_distances(params: &NoiseParams, seeds: &[Vec2]) -> Vec<f32> {
        let (w, h) = (params.width as usize, params.height as usize);
        let mut tree = QuadTree::new(BoundaryRegion::from_size(w as f32, h as f32), SEED_TREE_CAPACITY);
        for s in seeds {
            tree.insert(*s);
        }
        let block = ((params.max_distance_for_ratio * 0.1).floor() as usize).max(1);
        let half = (block / 2) as f32;
        let mut rect = BoundaryRegion {
            cx: (w as f32 * 0.5).floor(),
            cy: 0.0,
            hw: w as f32 * 0.5,
            hh: params.max_distance_for_ratio * 1.2,
        };
        let mut points = Vec::new();
        let mut out = Vec::with_capacity(w * h);
        for j in 0..h {
            if j % block == 0 {
                rect.cy = j as f32 + half;
                points = tree.query(&rect);
            }
            for i in 0..w {
                if i % block == 0 {
                    rect.cx = i as f32 + half;
                    points = tree.query(&rect);
                }
                let p = Vec2::new(i as f32, j as f32);
                out.push(points.iter().map(|s| s.distance_squared(p)).fold(f32::MAX, f32::min));
            }
        }
        out
    }

    #[test]
    fn test_block_cache_matches_block_walk() {
        let mut rng = Pcg32::seed_from_u64(11);
        let field = NoiseField::generate(block_params(), &mut rng);
        let expected = block_walk_distances(field.params(), field.seeds());
        let differing = field
            .distances()
            .iter()
            .zip(&expected)
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(differing, 0);
    }

    #[test]
    fn test_window_holds_still_inside_a_block() {
        let seeds = vec![
            Vec2::new(20.0, 10.0),
            Vec2::new(150.0, 43.0),
            Vec2::new(60.0, 150.0),
            Vec2::new(180.0, 200.0),
            Vec2::new(100.0, 290.0),
            Vec2::new(10.0, 260.0),
        ];
        let field = NoiseField::from_seeds(block_params(), seeds.clone());
        let at = |x: usize, y: usize| field.distances()[y * 200 + x];

        // Block rows 100..105 share a window reaching up to y = 42, so the
        // seed at y = 43 is still a candidate on row 104.
        assert_eq!(at(150, 104), 61.0 * 61.0);

        // Row 105 starts a new block whose window stops at y = 47. The exact
        // nearest seed is missed and the approximated distance is kept.
        let exact = seeds
            .iter()
            .map(|s| s.distance_squared(Vec2::new(150.0, 105.0)))
            .fold(f32::MAX, f32::min);
        assert_eq!(exact, 62.0 * 62.0);
        assert_eq!(at(150, 105), 90.0 * 90.0 + 45.0 * 45.0);
        assert_ne!(at(150, 105), exact);

        assert_eq!(field.distances(), block_walk_distances(field.params(), &seeds).as_slice());
    }

    #[test]
    fn test_seeds_within_field() {
        let mut rng = Pcg32::seed_from_u64(99);
        let field = NoiseField::generate(
            NoiseParams { point_count: 200, ..NoiseParams::with_size(30, 20) },
            &mut rng,
        );
        assert_eq!(field.seeds().len(), 200);
        assert!(field
            .seeds()
            .iter()
            .all(|s| s.x >= 0.0 && s.x < 30.0 && s.y >= 0.0 && s.y < 20.0));
    }

    #[test]
    fn test_recolor_reuses_distances() {
        let mut field = NoiseField::from_seeds(scenario_params(), vec![Vec2::ZERO]);
        let distances = field.distances().to_vec();
        field.set_colors(Rgb::new(200, 200, 200), Rgb::new(0, 0, 0));
        assert_eq!(field.distances(), distances.as_slice());
        assert_eq!(field.pixel(0, 0), Some([200, 200, 200, 255]));
    }

    #[test]
    fn test_overshoot_clamps() {
        // Distances past max_distance push the ratio above 1
        let mut params = scenario_params();
        params.max_distance_for_ratio = 2.0;
        params.start_color = Rgb::new(0, 0, 0);
        params.end_color = Rgb::new(200, 200, 200);
        let field = NoiseField::from_seeds(params, vec![Vec2::ZERO]);
        assert_eq!(field.pixel(5, 5).map(|p| p[0]), Some(255));
    }

    #[test]
    fn test_hex_round_trip() {
        let c = Rgb::from_hex("#aaa8d7").unwrap();
        assert_eq!(c, Rgb::new(0xaa, 0xa8, 0xd7));
        assert_eq!(c.to_hex(), "#aaa8d7");
        assert!(Rgb::from_hex("#12").is_none());
    }

    #[test]
    fn test_default_point_count() {
        assert_eq!(default_point_count(1920, 2160), 108);
        assert_eq!(default_point_count(0, 100), 0);
    }

    #[test]
    fn test_write_png() {
        let field = NoiseField::from_seeds(scenario_params(), vec![Vec2::new(4.0, 4.0)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.png");
        field.write_png(&path).unwrap();
        assert!(path.exists());
    }
}
