//! Colour and gradient styling shared by the track, trails and HUD

use serde::{Deserialize, Serialize};

/// HSL(A) colour as handed to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: f32,
    /// Percent, 0..=100
    pub saturation: f32,
    /// Percent, 0..=100
    pub lightness: f32,
    pub alpha: f32,
}

impl Hsl {
    pub const fn new(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
            alpha: 1.0,
        }
    }

    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Full-saturation shade of `hue`
    pub const fn shade(hue: f32, lightness: f32) -> Self {
        Self::new(hue, 100.0, lightness)
    }

    pub fn to_css(&self) -> String {
        if self.alpha >= 1.0 {
            format!("hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
        } else {
            format!(
                "hsla({}, {}%, {}%, {})",
                self.hue, self.saturation, self.lightness, self.alpha
            )
        }
    }
}

/// Radial gradient used to fill a track segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientStyle {
    /// 25% lightness at the centre fading to black
    DarkToDarkest,
    /// 35% lightness at the centre fading to black
    Dark35ToDarkest,
}

impl GradientStyle {
    /// Colour stops `(offset, colour)` for a segment of the given hue
    pub fn stops(&self, hue: f32) -> [(f32, Hsl); 2] {
        let inner = match self {
            GradientStyle::DarkToDarkest => 25.0,
            GradientStyle::Dark35ToDarkest => 35.0,
        };
        [(0.0, Hsl::shade(hue, inner)), (1.0, Hsl::shade(hue, 0.0))]
    }
}

/// Trail fade: opaque near the player, transparent at the tail
pub fn trail_fade(hue: f32) -> [(f32, Hsl); 2] {
    [
        (0.0, Hsl::shade(hue, 75.0)),
        (1.0, Hsl::shade(hue, 100.0).with_alpha(0.0)),
    ]
}

/// Glow used for the star player and the earned-star reveal
pub fn glow(hue: f32, outline: f32) -> [(f32, Hsl); 2] {
    [(0.0, Hsl::shade(hue, 100.0)), (outline, Hsl::shade(hue, 50.0))]
}
