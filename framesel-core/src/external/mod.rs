// ============================================================================
// framesel-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: The Frame-Source Collaborator
//
// This module encapsulates everything that touches decoders. The metrics
// stage only ever sees the `FrameSource` trait: it asks for a clip's probe
// data, its dynamic range, and a lazy stream of downscaled luma frames for a
// set of sampled indices. Failures come back as `FrameSourceError`, which the
// collector turns into fallback metrics instead of aborting the run.
//
// KEY COMPONENTS:
// - FrameSource: trait implemented by decoders (and test doubles)
// - FfmpegFrameSource: implementation using ffmpeg-sidecar and ffprobe
// - mocks: in-memory sources for tests and dry runs
//
// DESIGN PHILOSOPHY:
// Dependency injection: the orchestrator is generic over the source, so
// tests never need ffmpeg.

use std::path::Path;

use crate::clip::{ClipDescriptor, SelectionWindow};
use crate::error::FrameSourceError;

// ============================================================================
// SUBMODULES
// ============================================================================

/// ffmpeg/ffprobe backed frame source
pub mod ffmpeg_source;

/// In-memory frame sources for tests
pub mod mocks;

pub use ffmpeg_source::FfmpegFrameSource;

// ============================================================================
// DATA TYPES
// ============================================================================

/// Stream facts needed to capture a clip descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipProbe {
    pub frame_rate: f64,
    pub frame_count: u64,
}

/// Dynamic range signalled by a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynamicRange {
    #[default]
    Sdr,
    /// BT.2020 primaries with a PQ or HLG transfer at 10 bits or more.
    Hdr,
}

impl DynamicRange {
    pub fn is_hdr(&self) -> bool {
        matches!(self, DynamicRange::Hdr)
    }
}

/// Which frames to decode and how small to make them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    pub window: SelectionWindow,
    pub step: u32,
    pub downscale_height: u32,
}

/// One decoded, downscaled frame as 8-bit luma, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaFrame {
    pub frame_index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LumaFrame {
    /// Builds a frame, checking the buffer size against the dimensions.
    pub fn new(frame_index: u64, width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameSourceError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(FrameSourceError::Decode {
                frame_index,
                reason: format!(
                    "buffer holds {} bytes, {}x{} luma needs {}",
                    data.len(),
                    width,
                    height,
                    expected
                ),
            });
        }
        Ok(Self {
            frame_index,
            width,
            height,
            data,
        })
    }

    /// Converts packed RGB24 to luma with BT.709 weights.
    pub fn from_rgb24(frame_index: u64, width: u32, height: u32, rgb: &[u8]) -> Result<Self, FrameSourceError> {
        let luma = rgb
            .chunks_exact(3)
            .map(|px| {
                let weighted = 54 * u32::from(px[0]) + 183 * u32::from(px[1]) + 19 * u32::from(px[2]);
                ((weighted + 128) >> 8) as u8
            })
            .collect();
        Self::new(frame_index, width, height, luma)
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }
}

/// Lazy stream of frames; ends early on the first error.
pub type FrameStream<'a> = Box<dyn Iterator<Item = Result<LumaFrame, FrameSourceError>> + 'a>;

// ============================================================================
// FRAME SOURCE TRAIT
// ============================================================================

/// Something that can decode sampled frames of a clip.
///
/// Implementations deliver frames for exactly the indices of
/// `request.window.sample_indices(request.step)`, in ascending order. An
/// error, or a stream with no frames at all, puts the clip into degraded
/// mode; a stream that merely stops short keeps what it delivered.
pub trait FrameSource {
    /// Frame rate and frame count of the clip at `path`.
    fn probe(&self, path: &Path) -> Result<ClipProbe, FrameSourceError>;

    /// Whether the clip signals HDR.
    fn dynamic_range(&self, clip: &ClipDescriptor) -> Result<DynamicRange, FrameSourceError>;

    /// Starts decoding the requested frames.
    fn frames<'a>(
        &'a self,
        clip: &ClipDescriptor,
        request: &FrameRequest,
    ) -> Result<FrameStream<'a>, FrameSourceError>;
}
