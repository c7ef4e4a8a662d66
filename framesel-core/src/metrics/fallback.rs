//! Synthetic metrics for clips that could not be decoded.
//!
//! Scores are derived from the frame index and the run seed with a
//! splitmix64 mix, so a degraded clip still yields a spread of
//! candidates in every category and the same inputs always give the same
//! series. The values carry no meaning about the picture.

use super::FrameMetric;
use crate::clip::SelectionWindow;

/// Decorrelates the motion stream from the brightness stream.
const MOTION_STREAM: u64 = 0x6A09_E667_F3BC_C909;

/// One round of splitmix64.
pub fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Maps a 64-bit value to `[0, 1)`.
fn unit(value: u64) -> f64 {
    (value >> 11) as f64 / (1u64 << 53) as f64
}

/// Placeholder metrics for every sampled index of `window`.
pub fn synthetic_series(window: &SelectionWindow, step: u32, seed: u64) -> Vec<FrameMetric> {
    window
        .sample_indices(step)
        .map(|frame_index| FrameMetric {
            frame_index,
            brightness: unit(splitmix64(seed ^ frame_index)),
            motion: unit(splitmix64(seed ^ frame_index ^ MOTION_STREAM)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_is_deterministic() {
        let window = SelectionWindow { lead: 240, trail: 1240 };
        let a = synthetic_series(&window, 4, 2020220);
        let b = synthetic_series(&window, 4, 2020220);
        assert_eq!(a, b);
        assert_eq!(a.len(), 250);
        assert_eq!(a[0].frame_index, 240);
        assert!(a.iter().all(|m| (0.0..1.0).contains(&m.brightness) && (0.0..1.0).contains(&m.motion)));
    }

    #[test]
    fn test_seed_changes_series() {
        let window = SelectionWindow { lead: 0, trail: 400 };
        let a = synthetic_series(&window, 4, 1);
        let b = synthetic_series(&window, 4, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_series_is_spread() {
        let window = SelectionWindow { lead: 0, trail: 40_000 };
        let series = synthetic_series(&window, 4, 7);
        let mean = series.iter().map(|m| m.brightness).sum::<f64>() / series.len() as f64;
        assert!((0.45..0.55).contains(&mean), "mean {mean}");
    }
}
