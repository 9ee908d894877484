//! Zig-zag track stream
//!
//! Segments alternate horizontal and vertical, each overlapping the previous
//! one by the player size so the path stays connected. The stream keeps a
//! fixed window of live segments: segments the player has left more than a
//! viewport behind are evicted and fresh ones are appended at the far end.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::style::GradientStyle;
use crate::consts::{MIN_TRACK_SEGMENTS, WORLD_UNITS_PER_DISTANCE};

/// Distance (in distance units) at which each milestone is reached
pub const MILESTONES: [u32; 5] = [200, 500, 1000, 1500, 2000];

/// Per-milestone segment styling, indexed by milestone index
const TRACK_HUES: [f32; 6] = [197.0, 344.0, 160.0, 35.0, 330.0, 180.0];
const BORDER_COLORS: [&str; 6] = [
    "skyblue",
    "crimson",
    "lightgreen",
    "hsl(30, 100%, 75%)",
    "hsl(330, 100%, 70%)",
    "hsl(175, 100%, 40%)",
];
const GRADIENTS: [GradientStyle; 6] = [
    GradientStyle::DarkToDarkest,
    GradientStyle::DarkToDarkest,
    GradientStyle::DarkToDarkest,
    GradientStyle::Dark35ToDarkest,
    GradientStyle::Dark35ToDarkest,
    GradientStyle::DarkToDarkest,
];

const DIFFICULTY: f32 = 2.0;
const MAX_DIFFICULTY: f32 = 3.0;

/// Index into the styling tables that a new stream starts at
const FIRST_MILESTONE_INDEX: usize = 1;

/// Number of milestones reached at `distance`
pub fn stars_earned(distance: u32) -> u32 {
    MILESTONES.iter().filter(|&&m| distance >= m).count() as u32
}

/// Live segment window for a viewport height
pub fn window_size(viewport_h: f32, track_width: f32) -> usize {
    let rows = (viewport_h / track_width).floor().max(0.0) as usize;
    (rows * 2).max(MIN_TRACK_SEGMENTS)
}

/// One straight piece of track, top-left anchored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSegment {
    /// Generation index, strictly increasing along the stream
    pub index: u64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub hue: f32,
    pub border: &'static str,
    pub gradient: GradientStyle,
}

impl TrackSegment {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Centre, e.g. for the radial gradient origin
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Inclusive containment after shrinking each side by `inset`
    pub fn contains_inset(&self, p: Vec2, inset: f32) -> bool {
        p.x >= self.x + inset
            && p.x <= self.right() - inset
            && p.y >= self.y + inset
            && p.y <= self.bottom() - inset
    }

    /// True once `player` has moved more than `offscreen` past this
    /// segment on either axis
    pub fn is_behind(&self, player: Vec2, offscreen: Vec2) -> bool {
        player.x - self.right() > offscreen.x || player.y - self.bottom() > offscreen.y
    }

    fn is_horizontal(&self) -> bool {
        self.index % 2 == 0
    }
}

/// What one `Track::update` call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackUpdate {
    pub evicted: usize,
    pub added: usize,
    /// Milestone index after the update, if it advanced
    pub milestone: Option<usize>,
}

/// Lazily generated track
#[derive(Debug, Clone)]
pub struct Track {
    width: f32,
    player_size: f32,
    max_segments: usize,
    segments: Vec<TrackSegment>,
    next_index: u64,
    cursor: Vec2,
    milestone_index: usize,
    check_milestones: bool,
    start_distance: f32,
}

impl Track {
    /// Build the initial window. Milestones are not checked until
    /// `set_start_distance` is called.
    pub fn new<R: Rng + ?Sized>(width: f32, player_size: f32, viewport_h: f32, rng: &mut R) -> Self {
        let mut track = Self {
            width,
            player_size,
            max_segments: window_size(viewport_h, width),
            segments: Vec::new(),
            next_index: 0,
            cursor: Vec2::ZERO,
            milestone_index: FIRST_MILESTONE_INDEX,
            check_milestones: false,
            start_distance: 0.0,
        };
        for _ in 0..track.max_segments {
            track.add_segment(rng);
        }
        log::debug!("Track generated with {} segments", track.segments.len());
        track
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn player_size(&self) -> f32 {
        self.player_size
    }

    pub fn max_segments(&self) -> usize {
        self.max_segments
    }

    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    pub fn milestone_index(&self) -> usize {
        self.milestone_index
    }

    /// Where the player starts: centred across the third segment
    pub fn start_position(&self) -> Vec2 {
        self.segments
            .get(2)
            .or(self.segments.last())
            .map_or(Vec2::ZERO, |seg| {
                Vec2::new(seg.x + self.width * 0.5, seg.y + self.width * 0.5)
            })
    }

    /// Travel origin for milestone checks; enables them
    pub fn set_start_distance(&mut self, start_distance: f32) {
        self.start_distance = start_distance;
        self.check_milestones = true;
    }

    /// Recompute the live window after a viewport change. The next update
    /// fills up to the new size.
    pub fn resize(&mut self, viewport_h: f32) {
        self.max_segments = window_size(viewport_h, self.width);
    }

    /// Evict segments the player has left behind, then refill the window
    pub fn update<R: Rng + ?Sized>(&mut self, player: Vec2, offscreen: Vec2, rng: &mut R) -> TrackUpdate {
        let before = self.segments.len();
        self.segments.retain(|s| !s.is_behind(player, offscreen));
        let evicted = before - self.segments.len();

        let milestone_before = self.milestone_index;
        let mut added = 0;
        while self.segments.len() < self.max_segments {
            self.add_segment(rng);
            added += 1;
        }

        let milestone = (self.milestone_index != milestone_before).then_some(self.milestone_index);
        if let Some(index) = milestone {
            log::info!("Milestone {} reached, track hue {}", index, TRACK_HUES[index]);
        }
        TrackUpdate {
            evicted,
            added,
            milestone,
        }
    }

    fn segment_length<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        self.width * (2.0 + rng.random::<f32>() * DIFFICULTY + (MAX_DIFFICULTY - DIFFICULTY))
    }

    fn add_segment<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let length = self.segment_length(rng);
        let style = self.milestone_index.min(TRACK_HUES.len() - 1);
        let mut segment = TrackSegment {
            index: self.next_index,
            x: self.cursor.x,
            y: self.cursor.y,
            width: self.width,
            height: self.width,
            hue: TRACK_HUES[style],
            border: BORDER_COLORS[style],
            gradient: GRADIENTS[style],
        };
        if segment.is_horizontal() {
            segment.width = length;
            self.cursor.x += length - self.player_size;
        } else {
            segment.height = length;
            self.cursor.y += length - self.player_size;
        }
        self.segments.push(segment);
        self.next_index += 1;

        if self.check_milestones
            && self.milestone_index < MILESTONES.len()
            && (self.cursor.x + self.cursor.y - self.start_distance) / WORLD_UNITS_PER_DISTANCE
                >= MILESTONES[self.milestone_index] as f32
        {
            self.milestone_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn track(viewport_h: f32, seed: u64) -> (Track, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let track = Track::new(150.0, 60.0, viewport_h, &mut rng);
        (track, rng)
    }

    fn assert_connected(segments: &[TrackSegment]) {
        for pair in segments.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert_eq!(b.index, a.index + 1);
            // Next segment starts inside the tail of the previous one
            if a.is_horizontal() {
                assert!((b.x - (a.right() - 60.0)).abs() < 1e-3);
                assert_eq!(b.y, a.y);
            } else {
                assert!((b.y - (a.bottom() - 60.0)).abs() < 1e-3);
                assert_eq!(b.x, a.x);
            }
        }
    }

    #[test]
    fn test_window_size() {
        assert_eq!(window_size(900.0, 150.0), 12);
        assert_eq!(window_size(200.0, 150.0), 4);
        assert_eq!(window_size(0.0, 150.0), 4);
    }

    #[test]
    fn test_initial_fill_alternates() {
        let (track, _) = track(900.0, 1);
        let segs = track.segments();
        assert_eq!(segs.len(), 12);
        assert_eq!((segs[0].x, segs[0].y), (0.0, 0.0));
        for s in segs {
            let len = if s.is_horizontal() { s.width } else { s.height };
            let across = if s.is_horizontal() { s.height } else { s.width };
            assert_eq!(across, 150.0);
            // width * (2 + U*2 + 1)
            assert!((450.0..=750.0).contains(&len), "len = {}", len);
        }
        assert_connected(segs);
        assert_eq!(track.milestone_index(), 1);
        assert_eq!(segs[0].hue, 344.0);
        assert_eq!(segs[0].border, "crimson");
    }

    #[test]
    fn test_start_position_on_third_segment() {
        let (track, _) = track(900.0, 2);
        let s = &track.segments()[2];
        assert_eq!(track.start_position(), Vec2::new(s.x + 75.0, s.y + 75.0));
    }

    #[test]
    fn test_eviction_and_refill() {
        let (mut track, mut rng) = track(600.0, 3);
        let offscreen = Vec2::new(800.0, 800.0);
        let first = track.segments()[0].clone();

        // Nothing is behind the start
        let update = track.update(track.start_position(), offscreen, &mut rng);
        assert_eq!(update, TrackUpdate::default());

        let far = Vec2::new(first.right() + 801.0, 0.0);
        let update = track.update(far, offscreen, &mut rng);
        assert!(update.evicted >= 1);
        assert_eq!(update.added, update.evicted);
        assert_eq!(track.segments().len(), track.max_segments());
        assert!(track.segments().iter().all(|s| s.index != first.index));
        assert_connected(track.segments());
    }

    #[test]
    fn test_milestones_advance_and_style_new_segments() {
        let (mut track, mut rng) = track(600.0, 4);
        track.set_start_distance(0.0);
        let offscreen = Vec2::new(1.0, 1.0);
        let mut reached = Vec::new();
        for _ in 0..200 {
            let last = track.segments().last().unwrap().clone();
            let update = track.update(Vec2::new(last.x, last.y), offscreen, &mut rng);
            reached.extend(update.milestone);
        }
        // Monotonic, one step at a time, capped at the milestone count
        assert!(reached.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(track.milestone_index(), MILESTONES.len());
        let newest = track.segments().last().unwrap();
        assert_eq!(newest.hue, 180.0);
        assert_eq!(newest.gradient, GradientStyle::DarkToDarkest);
    }

    #[test]
    fn test_stars_earned() {
        assert_eq!(stars_earned(0), 0);
        assert_eq!(stars_earned(199), 0);
        assert_eq!(stars_earned(200), 1);
        assert_eq!(stars_earned(1499), 3);
        assert_eq!(stars_earned(5000), 5);
    }

    #[test]
    fn test_resize_grows_window() {
        let (mut track, mut rng) = track(300.0, 5);
        assert_eq!(track.segments().len(), 4);
        track.resize(1200.0);
        let update = track.update(track.start_position(), Vec2::splat(1e6), &mut rng);
        assert_eq!(update.added, 12);
        assert_eq!(track.segments().len(), 16);
    }

    proptest! {
        #[test]
        fn prop_window_never_shrinks_and_evictions_stay_gone(
            seed in any::<u64>(),
            steps in prop::collection::vec((0.0f32..3000.0, 0.0f32..3000.0), 1..40),
        ) {
            let (mut track, mut rng) = track(750.0, seed);
            let offscreen = Vec2::new(400.0, 300.0);
            let mut evicted_below = 0u64;
            let mut pos = track.start_position();
            for (dx, dy) in steps {
                pos += Vec2::new(dx, dy);
                track.update(pos, offscreen, &mut rng);
                prop_assert!(track.segments().len() >= track.max_segments());
                let lowest = track.segments()[0].index;
                prop_assert!(lowest >= evicted_below);
                evicted_below = lowest;
                assert_connected(track.segments());
            }
        }
    }
}
