//! Editable numeric properties exposed to the customisation panel

use serde::Serialize;

/// One slider: key, label, range and current value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub value: f32,
}

impl PropertyDescriptor {
    pub fn new(key: &'static str, label: &'static str, min: f32, max: f32, step: f32, value: f32) -> Self {
        Self {
            key,
            label,
            min,
            max,
            step,
            value,
        }
    }

    /// Clamp into range and snap to the slider step
    pub fn normalize(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        let snapped = self.min + ((clamped - self.min) / self.step).round() * self.step;
        // Snapping can overshoot max for ranges that are not a step multiple
        crate::round_off(snapped.min(self.max), 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clamps_and_snaps() {
        let p = PropertyDescriptor::new("trailBlurness", "Trail Blurness", 0.0, 10.0, 0.5, 2.0);
        assert_eq!(p.normalize(-3.0), 0.0);
        assert_eq!(p.normalize(12.0), 10.0);
        assert_eq!(p.normalize(2.7), 2.5);

        let r = PropertyDescriptor::new("lineResolution", "Trail Resolution", 1.0, 10.0, 0.1, 5.0);
        assert!((r.normalize(3.14) - 3.1).abs() < 1e-4);
    }
}
