// framesel-core/src/external/mocks.rs

// --- In-memory frame sources (for testing) ---

//! Frame sources that need no decoder.
//!
//! `SyntheticFrameSource` renders frames from a brightness curve plus a
//! checkerboard that shifts by half a cell at every scene boundary, so the
//! motion series has clear peaks. `FailingFrameSource` probes fine and then fails
//! on every frame. Both count how often decoding was started, which lets
//! tests prove that a cache hit skipped the metrics stage.

use std::cell::Cell;
use std::path::Path;

use super::{ClipProbe, DynamicRange, FrameRequest, FrameSource, FrameStream, LumaFrame};
use crate::clip::ClipDescriptor;
use crate::error::FrameSourceError;

/// Deterministic synthetic video.
pub struct SyntheticFrameSource {
    pub frame_count: u64,
    pub frame_rate: f64,
    pub width: u32,
    pub dynamic_range: DynamicRange,
    /// Frames per scene; the checkerboard shifts at each boundary.
    pub scene_length: u64,
    /// Frames at or past this index are never delivered.
    pub decodable: u64,
    brightness: Box<dyn Fn(u64) -> u8>,
    opened: Cell<usize>,
}

impl SyntheticFrameSource {
    /// A clip whose brightness ramps 16..=235 across its length.
    pub fn new(frame_count: u64, frame_rate: f64) -> Self {
        let span = frame_count.max(1);
        Self::with_brightness(frame_count, frame_rate, move |i| {
            (16 + (i.min(span) * 219) / span) as u8
        })
    }

    /// A clip with a caller-defined brightness per frame index.
    pub fn with_brightness(frame_count: u64, frame_rate: f64, brightness: impl Fn(u64) -> u8 + 'static) -> Self {
        Self {
            frame_count,
            frame_rate,
            width: 32,
            dynamic_range: DynamicRange::Sdr,
            scene_length: 500,
            decodable: frame_count,
            brightness: Box::new(brightness),
            opened: Cell::new(0),
        }
    }

    pub fn hdr(mut self) -> Self {
        self.dynamic_range = DynamicRange::Hdr;
        self
    }

    pub fn scene_length(mut self, frames: u64) -> Self {
        self.scene_length = frames.max(1);
        self
    }

    /// Makes the decoder run dry at `frames` while the probe still reports
    /// `frame_count`.
    pub fn decodable_frames(mut self, frames: u64) -> Self {
        self.decodable = frames;
        self
    }

    /// How many times `frames` was called.
    pub fn decode_calls(&self) -> usize {
        self.opened.get()
    }

    /// Renders one frame at `height` rows.
    pub fn render(&self, frame_index: u64, height: u32) -> LumaFrame {
        let width = self.width;
        let height = height.clamp(1, 64);
        let base = i32::from((self.brightness)(frame_index));
        let shift = (frame_index / self.scene_length) % 2 * 2;
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let cell = ((u64::from(x) + shift) / 4 + u64::from(y) / 4) % 2;
                let offset = if cell == 0 { -12 } else { 12 };
                (base + offset).clamp(0, 255) as u8
            })
            .collect();
        LumaFrame {
            frame_index,
            width,
            height,
            data,
        }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn probe(&self, _path: &Path) -> Result<ClipProbe, FrameSourceError> {
        Ok(ClipProbe {
            frame_rate: self.frame_rate,
            frame_count: self.frame_count,
        })
    }

    fn dynamic_range(&self, _clip: &ClipDescriptor) -> Result<DynamicRange, FrameSourceError> {
        Ok(self.dynamic_range)
    }

    fn frames<'a>(
        &'a self,
        _clip: &ClipDescriptor,
        request: &FrameRequest,
    ) -> Result<FrameStream<'a>, FrameSourceError> {
        self.opened.set(self.opened.get() + 1);
        let height = request.downscale_height;
        let decodable = self.decodable;
        Ok(Box::new(
            request
                .window
                .sample_indices(request.step)
                .take_while(move |&i| i < decodable)
                .map(move |i| Ok::<_, FrameSourceError>(self.render(i, height))),
        ))
    }
}

/// A source whose probe works but every frame fails to decode.
pub struct FailingFrameSource {
    pub frame_count: u64,
    pub frame_rate: f64,
    opened: Cell<usize>,
}

impl FailingFrameSource {
    pub fn new(frame_count: u64, frame_rate: f64) -> Self {
        Self {
            frame_count,
            frame_rate,
            opened: Cell::new(0),
        }
    }

    pub fn decode_calls(&self) -> usize {
        self.opened.get()
    }
}

impl FrameSource for FailingFrameSource {
    fn probe(&self, _path: &Path) -> Result<ClipProbe, FrameSourceError> {
        Ok(ClipProbe {
            frame_rate: self.frame_rate,
            frame_count: self.frame_count,
        })
    }

    fn dynamic_range(&self, clip: &ClipDescriptor) -> Result<DynamicRange, FrameSourceError> {
        Err(FrameSourceError::Probe {
            path: clip.path.clone(),
            reason: "unsupported codec".to_string(),
        })
    }

    fn frames<'a>(
        &'a self,
        _clip: &ClipDescriptor,
        request: &FrameRequest,
    ) -> Result<FrameStream<'a>, FrameSourceError> {
        self.opened.set(self.opened.get() + 1);
        Ok(Box::new(request.window.sample_indices(request.step).map(|i| {
            Err::<LumaFrame, _>(FrameSourceError::Decode {
                frame_index: i,
                reason: "unsupported codec".to_string(),
            })
        })))
    }
}
