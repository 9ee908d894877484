//! Point quadtree with capacity-based subdivision
//!
//! Nodes keep the first `capacity` points they accept. Once full, a node
//! splits into four quadrants and routes every later point to a child; the
//! points it already holds stay where they are. Queries therefore check a
//! node's own list *and* recurse into its children.
//!
//! Range queries at the root optionally wrap: overflow past one edge of the
//! root region is folded back from the opposite edge, so the stored point set
//! behaves like a tile for queries near the boundary.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in center + half-extent form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRegion {
    pub cx: f32,
    pub cy: f32,
    /// Half width (> 0)
    pub hw: f32,
    /// Half height (> 0)
    pub hh: f32,
}

impl BoundaryRegion {
    pub fn new(cx: f32, cy: f32, hw: f32, hh: f32) -> Self {
        debug_assert!(hw > 0.0 && hh > 0.0, "region extents must be positive");
        Self { cx, cy, hw, hh }
    }

    /// Region covering `[0, width] x [0, height]`
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(width * 0.5, height * 0.5, width * 0.5, height * 0.5)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.cx - self.hw
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.cx + self.hw
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.cy - self.hh
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.cy + self.hh
    }

    /// Edge-inclusive containment
    pub fn contains(&self, p: Vec2) -> bool {
        self.left() <= p.x && self.right() >= p.x && self.top() <= p.y && self.bottom() >= p.y
    }

    /// Edge-inclusive overlap
    pub fn intersects(&self, other: &BoundaryRegion) -> bool {
        !(self.left() > other.right()
            || self.right() < other.left()
            || self.top() > other.bottom()
            || self.bottom() < other.top())
    }

    /// The four quadrants: top-left, top-right, bottom-left, bottom-right
    fn quadrants(&self) -> [BoundaryRegion; 4] {
        let hw = self.hw * 0.5;
        let hh = self.hh * 0.5;
        [
            BoundaryRegion::new(self.cx - hw, self.cy - hh, hw, hh),
            BoundaryRegion::new(self.cx + hw, self.cy - hh, hw, hh),
            BoundaryRegion::new(self.cx - hw, self.cy + hh, hw, hh),
            BoundaryRegion::new(self.cx + hw, self.cy + hh, hw, hh),
        ]
    }
}

/// A strip of the root region queried on behalf of an overflowing range,
/// plus the offset that maps its points back into the range's space.
struct WrapStrip {
    region: BoundaryRegion,
    shift: Vec2,
}

/// Quadtree node (the root is just a node)
#[derive(Debug, Clone)]
pub struct QuadTree {
    boundary: BoundaryRegion,
    capacity: usize,
    points: Vec<Vec2>,
    children: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
    pub fn new(boundary: BoundaryRegion, capacity: usize) -> Self {
        Self {
            boundary,
            capacity: capacity.max(1),
            points: Vec::with_capacity(capacity),
            children: None,
        }
    }

    pub fn boundary(&self) -> &BoundaryRegion {
        &self.boundary
    }

    pub fn is_divided(&self) -> bool {
        self.children.is_some()
    }

    /// Points held by this node itself (not its children)
    pub fn own_points(&self) -> &[Vec2] {
        &self.points
    }

    /// Child nodes, if this node has split
    pub fn children(&self) -> Option<&[QuadTree; 4]> {
        self.children.as_deref()
    }

    /// Total number of stored points
    pub fn len(&self) -> usize {
        self.points.len()
            + self
                .children
                .as_ref()
                .map_or(0, |c| c.iter().map(QuadTree::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored point, parents before children
    pub fn points(&self) -> Box<dyn Iterator<Item = Vec2> + '_> {
        let own = self.points.iter().copied();
        match &self.children {
            Some(children) => Box::new(own.chain(children.iter().flat_map(QuadTree::points))),
            None => Box::new(own),
        }
    }

    /// Depth of the deepest node (a lone root is depth 1)
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(QuadTree::depth).max().unwrap_or(0))
    }

    /// Insert a point. Returns `false` when the point lies outside this
    /// node's region; the region never grows to fit it.
    pub fn insert(&mut self, point: Vec2) -> bool {
        if !self.boundary.contains(point) {
            return false;
        }

        if self.children.is_none() && self.points.len() < self.capacity {
            self.points.push(point);
            return true;
        }

        let capacity = self.capacity;
        let boundary = self.boundary;
        let children = self.children.get_or_insert_with(|| {
            Box::new(boundary.quadrants().map(|q| QuadTree::new(q, capacity)))
        });

        children.iter_mut().any(|child| child.insert(point))
    }

    /// All stored points inside `range`, including points folded back from
    /// the opposite edge when `range` overflows the root region.
    pub fn query(&self, range: &BoundaryRegion) -> Vec<Vec2> {
        let mut found = Vec::new();
        if !self.boundary.intersects(range) {
            return found;
        }

        for strip in self.wrap_strips(range) {
            let mut wrapped = Vec::new();
            self.query_into(&strip.region, &mut wrapped);
            found.extend(wrapped.into_iter().map(|p| p + strip.shift));
        }

        self.query_into(range, &mut found);
        found
    }

    /// Plain range query: no wraparound, appends into `found`
    pub fn query_into(&self, range: &BoundaryRegion, found: &mut Vec<Vec2>) {
        if !self.boundary.intersects(range) {
            return;
        }

        found.extend(self.points.iter().copied().filter(|p| range.contains(*p)));

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_into(range, found);
            }
        }
    }

    /// At most one strip per axis: left overflow wins over right, top over bottom.
    fn wrap_strips(&self, range: &BoundaryRegion) -> Vec<WrapStrip> {
        let b = &self.boundary;
        let mut strips = Vec::with_capacity(2);

        if b.left() > range.left() {
            let hw = (b.left() - range.left()) * 0.5;
            strips.push(WrapStrip {
                region: BoundaryRegion::new(b.right() - hw, range.cy, hw, range.hh),
                shift: Vec2::new(-2.0 * b.hw, 0.0),
            });
        } else if b.right() < range.right() {
            let hw = (range.right() - b.right()) * 0.5;
            strips.push(WrapStrip {
                region: BoundaryRegion::new(b.left() + hw, range.cy, hw, range.hh),
                shift: Vec2::new(2.0 * b.hw, 0.0),
            });
        }

        if b.top() > range.top() {
            let hh = (b.top() - range.top()) * 0.5;
            strips.push(WrapStrip {
                region: BoundaryRegion::new(range.cx, b.bottom() - hh, range.hw, hh),
                shift: Vec2::new(0.0, -2.0 * b.hh),
            });
        } else if b.bottom() < range.bottom() {
            let hh = (range.bottom() - b.bottom()) * 0.5;
            strips.push(WrapStrip {
                region: BoundaryRegion::new(range.cx, b.top() + hh, range.hw, hh),
                shift: Vec2::new(0.0, 2.0 * b.hh),
            });
        }

        strips
    }
}
