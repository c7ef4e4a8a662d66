//! Feature maps and frame-to-frame differences for the motion series.
//!
//! Edge mode compares Prewitt gradient magnitudes, which ignores global
//! brightness drift (fades, exposure changes) and reacts to structure
//! changing. AbsDiff mode compares raw luma. Both produce a `u16` map so the
//! difference code is shared. Rows are filtered in parallel with rayon.

use rayon::prelude::*;

use crate::config::MotionMethod;
use crate::error::FrameSourceError;
use crate::external::LumaFrame;

/// Largest value `|gx| + |gy|` can take for 8-bit input.
pub const PREWITT_MAX: u16 = 3 * 255 * 2;

/// Per-pixel feature map of a frame, ready for differencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<u16>,
    /// Largest value any element can take.
    pub max_value: u16,
}

impl FeatureMap {
    pub fn from_frame(frame: &LumaFrame, method: MotionMethod) -> Self {
        match method {
            MotionMethod::Edge => Self {
                width: frame.width,
                height: frame.height,
                values: prewitt_magnitude(frame),
                max_value: PREWITT_MAX,
            },
            MotionMethod::AbsDiff => Self {
                width: frame.width,
                height: frame.height,
                values: frame.data.iter().map(|&v| u16::from(v)).collect(),
                max_value: 255,
            },
        }
    }

    /// Mean absolute difference to `other`, normalised to `[0, 1]`.
    ///
    /// `frame_index` only labels the error when the two maps disagree in size,
    /// which happens if the decoder changes resolution mid-stream.
    pub fn difference(&self, other: &FeatureMap, frame_index: u64) -> Result<f64, FrameSourceError> {
        if self.width != other.width || self.height != other.height {
            return Err(FrameSourceError::Decode {
                frame_index,
                reason: format!(
                    "frame size changed from {}x{} to {}x{}",
                    other.width, other.height, self.width, self.height
                ),
            });
        }
        if self.values.is_empty() {
            return Ok(0.0);
        }
        let total: u64 = self
            .values
            .par_iter()
            .zip(other.values.par_iter())
            .map(|(a, b)| u64::from(a.abs_diff(*b)))
            .sum();
        Ok(total as f64 / (self.values.len() as f64 * f64::from(self.max_value)))
    }
}

/// Prewitt gradient magnitude `|gx| + |gy|`. Border pixels are zero.
pub fn prewitt_magnitude(frame: &LumaFrame) -> Vec<u16> {
    let w = frame.width as usize;
    let h = frame.height as usize;
    let mut out = vec![0u16; w * h];
    if w < 3 || h < 3 {
        return out;
    }
    let px = |x: usize, y: usize| i32::from(frame.data[y * w + x]);

    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        if y == 0 || y == h - 1 {
            return;
        }
        for x in 1..w - 1 {
            let gx = (px(x + 1, y - 1) + px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + px(x, y - 1) + px(x + 1, y - 1));
            row[x] = (gx.unsigned_abs() + gy.unsigned_abs()) as u16;
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> LumaFrame {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        LumaFrame::new(0, width, height, data).unwrap()
    }

    #[test]
    fn test_prewitt_on_vertical_edge() {
        let f = frame(4, 3, |x, _| if x < 2 { 0 } else { 100 });
        let map = prewitt_magnitude(&f);
        // Row 1, columns 1 and 2 straddle the edge.
        assert_eq!(map[4 + 1], 300);
        assert_eq!(map[4 + 2], 300);
        // Borders stay zero.
        assert!(map[..4].iter().all(|&v| v == 0));
        assert_eq!(map[4], 0);
    }

    #[test]
    fn test_flat_frame_has_no_edges() {
        let f = frame(8, 8, |_, _| 77);
        assert!(prewitt_magnitude(&f).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_edge_difference_ignores_uniform_brightness_shift() {
        let a = frame(8, 8, |x, _| if x < 4 { 40 } else { 120 });
        let b = frame(8, 8, |x, _| if x < 4 { 60 } else { 140 });
        let ea = FeatureMap::from_frame(&a, MotionMethod::Edge);
        let eb = FeatureMap::from_frame(&b, MotionMethod::Edge);
        assert_eq!(ea.difference(&eb, 1).unwrap(), 0.0);

        let la = FeatureMap::from_frame(&a, MotionMethod::AbsDiff);
        let lb = FeatureMap::from_frame(&b, MotionMethod::AbsDiff);
        let d = la.difference(&lb, 1).unwrap();
        assert!((d - 20.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn test_difference_rejects_size_change() {
        let a = FeatureMap::from_frame(&frame(4, 4, |_, _| 0), MotionMethod::Edge);
        let b = FeatureMap::from_frame(&frame(8, 4, |_, _| 0), MotionMethod::Edge);
        assert!(matches!(
            b.difference(&a, 9),
            Err(FrameSourceError::Decode { frame_index: 9, .. })
        ));
    }
}
