//! Procedural background: spatial index, Worley noise, parallax scroller

pub mod background;
pub mod quadtree;
pub mod worley;

pub use background::{Background, BackgroundJob, background_params};
pub use quadtree::{BoundaryRegion, QuadTree};
pub use worley::{NoiseField, NoiseParams, Rgb};
