//! Brightness of a luma frame.
//!
//! SDR frames are measured as display-referred luma directly. HDR (PQ)
//! frames are first mapped through a lookup table that linearises each code
//! value with the ST 2084 EOTF, normalises against reference white and
//! re-applies a display gamma, so that "dark" and "bright" mean the same
//! thing for both kinds of clip.

use crate::external::{DynamicRange, LumaFrame};

/// Diffuse white in nits (ITU-R BT.2408).
const REFERENCE_WHITE_NITS: f64 = 203.0;
const PQ_PEAK_NITS: f64 = 10_000.0;
const DISPLAY_GAMMA: f64 = 2.4;

// SMPTE ST 2084 constants.
const PQ_M1: f64 = 2610.0 / 16384.0;
const PQ_M2: f64 = 2523.0 / 4096.0 * 128.0;
const PQ_C1: f64 = 3424.0 / 4096.0;
const PQ_C2: f64 = 2413.0 / 4096.0 * 32.0;
const PQ_C3: f64 = 2392.0 / 4096.0 * 32.0;

/// PQ code value in `[0, 1]` to absolute luminance in nits.
pub fn pq_eotf(code: f64) -> f64 {
    let e = code.clamp(0.0, 1.0).powf(1.0 / PQ_M2);
    let numerator = (e - PQ_C1).max(0.0);
    let denominator = PQ_C2 - PQ_C3 * e;
    PQ_PEAK_NITS * (numerator / denominator).powf(1.0 / PQ_M1)
}

/// How 8-bit luma codes map to normalised brightness.
#[derive(Debug, Clone)]
pub enum BrightnessScale {
    /// `code / 255`.
    Display,
    /// Per-code table for PQ content.
    Pq(Box<[f64; 256]>),
}

impl BrightnessScale {
    pub fn for_range(range: DynamicRange) -> Self {
        match range {
            DynamicRange::Sdr => BrightnessScale::Display,
            DynamicRange::Hdr => BrightnessScale::Pq(Box::new(pq_table())),
        }
    }

    #[inline]
    pub fn value(&self, code: u8) -> f64 {
        match self {
            BrightnessScale::Display => f64::from(code) / 255.0,
            BrightnessScale::Pq(table) => table[usize::from(code)],
        }
    }

    /// Mean normalised brightness of a frame, in `[0, 1]`.
    pub fn mean(&self, frame: &LumaFrame) -> f64 {
        if frame.data.is_empty() {
            return 0.0;
        }
        let sum = match self {
            BrightnessScale::Display => frame.data.iter().map(|&c| u64::from(c)).sum::<u64>() as f64 / 255.0,
            BrightnessScale::Pq(_) => {
                let mut histogram = [0u64; 256];
                for &code in &frame.data {
                    histogram[usize::from(code)] += 1;
                }
                histogram
                    .iter()
                    .enumerate()
                    .map(|(code, &n)| n as f64 * self.value(code as u8))
                    .sum()
            }
        };
        sum / frame.pixel_count() as f64
    }
}

fn pq_table() -> [f64; 256] {
    let mut table = [0.0; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        let nits = pq_eotf(code as f64 / 255.0);
        let relative = (nits / REFERENCE_WHITE_NITS).min(1.0);
        *slot = relative.powf(1.0 / DISPLAY_GAMMA);
    }
    table
}
