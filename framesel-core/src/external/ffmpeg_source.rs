// ============================================================================
// framesel-core/src/external/ffmpeg_source.rs
// ============================================================================
//
// FFMPEG FRAME SOURCE: Sampled Frame Decoding via ffmpeg-sidecar
//
// Frame rate and count come from the `ffprobe` crate. Colour signalling is
// not part of its stream model, so HDR detection runs ffprobe directly and
// reads the few JSON fields it needs. Decoding runs a single ffmpeg process
// per clip: a `select` filter keeps only the sampled frame numbers,
// `showinfo` reports which source frame each output is, `scale` shrinks them
// to the analysis height, and the frames are streamed back as raw RGB24 and
// converted to luma as they arrive. Nothing is written to disk.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use ffprobe::{FfProbe, ffprobe};
use serde::Deserialize;

use super::{ClipProbe, DynamicRange, FrameRequest, FrameSource, FrameStream, LumaFrame};
use crate::clip::ClipDescriptor;
use crate::error::{CoreError, CoreResult, FrameSourceError, command_failed_error, command_start_error};
use crate::utils::parse_frame_rate;

/// Transfer characteristics that mark a stream as HDR (PQ and HLG).
const HDR_TRANSFERS: [&str; 2] = ["smpte2084", "arib-std-b67"];

/// Colour fields of the first video stream, as printed by `ffprobe -of json`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub(crate) struct ColorStream {
    color_transfer: Option<String>,
    color_primaries: Option<String>,
    bits_per_raw_sample: Option<String>,
    pix_fmt: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ColorProbeOutput {
    #[serde(default)]
    streams: Vec<ColorStream>,
}

impl ColorStream {
    fn bit_depth(&self) -> u32 {
        if let Some(bits) = self.bits_per_raw_sample.as_deref().and_then(|b| b.parse().ok()) {
            return bits;
        }
        // yuv420p10le, p010le, yuv444p12be, ...
        let pix_fmt = self.pix_fmt.as_deref().unwrap_or("");
        let base = pix_fmt.trim_end_matches("le").trim_end_matches("be");
        if ["10", "12", "16"].iter().any(|depth| base.ends_with(depth)) {
            10
        } else {
            8
        }
    }

    /// HDR needs BT.2020 primaries, a PQ or HLG transfer and at least 10 bits.
    pub(crate) fn dynamic_range(&self) -> DynamicRange {
        let primaries = self.color_primaries.as_deref().unwrap_or("");
        let transfer = self.color_transfer.as_deref().unwrap_or("");
        if primaries == "bt2020" && HDR_TRANSFERS.contains(&transfer) && self.bit_depth() >= 10 {
            DynamicRange::Hdr
        } else {
            DynamicRange::Sdr
        }
    }
}

/// Runs ffprobe for the colour fields of the first video stream.
fn probe_color(path: &Path) -> CoreResult<ColorStream> {
    let cmd_ffprobe = "ffprobe";
    let output = Command::new(cmd_ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=color_transfer,color_primaries,bits_per_raw_sample,pix_fmt",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| command_start_error(cmd_ffprobe, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(command_failed_error(cmd_ffprobe, output.status, stderr.trim()));
    }

    parse_color_probe(&String::from_utf8_lossy(&output.stdout))
}

pub(crate) fn parse_color_probe(json: &str) -> CoreResult<ColorStream> {
    let parsed: ColorProbeOutput =
        serde_json::from_str(json).map_err(|e| CoreError::FfprobeParse(format!("colour fields: {e}")))?;
    parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::FfprobeParse("no video stream in colour probe".to_string()))
}

/// Source frame number from a `showinfo` log line, which reads like
/// `[Parsed_showinfo_2 @ 0x..] n:   3 pts:    252 pts_time:252 ...`.
///
/// The filtergraph sets each frame's pts to its decode number, so `pts` is
/// the frame index.
pub(crate) fn showinfo_frame(line: &str) -> Option<u64> {
    if !line.contains("Parsed_showinfo") {
        return None;
    }
    let (_, rest) = line.split_once(" pts:")?;
    rest.split_whitespace().next()?.parse().ok()
}

/// Frame source backed by the ffmpeg and ffprobe binaries on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameSource;

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self
    }

    fn run_ffprobe(path: &Path) -> Result<FfProbe, FrameSourceError> {
        log::debug!("Running ffprobe on {}", path.display());
        ffprobe(path).map_err(|e| FrameSourceError::Probe {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        })
    }

    fn video_stream<'a>(probe: &'a FfProbe, path: &Path) -> Result<&'a ffprobe::Stream, FrameSourceError> {
        probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| FrameSourceError::Probe {
                path: path.to_path_buf(),
                reason: "no video stream".to_string(),
            })
    }
}

/// Builds the filtergraph that keeps sampled frames and downscales them.
pub(crate) fn sampling_filter(request: &FrameRequest) -> String {
    let lead = request.window.lead;
    let trail = request.window.trail;
    let step = request.step.max(1);
    format!(
        "setpts=N,select=gte(n\\,{lead})*lt(n\\,{trail})*not(mod(n-{lead}\\,{step})),showinfo,scale=-2:{height}:flags=area",
        height = request.downscale_height
    )
}

impl FrameSource for FfmpegFrameSource {
    fn probe(&self, path: &Path) -> Result<ClipProbe, FrameSourceError> {
        let metadata = Self::run_ffprobe(path)?;
        let stream = Self::video_stream(&metadata, path)?;

        let frame_rate = parse_frame_rate(&stream.avg_frame_rate)
            .or_else(|| parse_frame_rate(&stream.r_frame_rate))
            .ok_or_else(|| FrameSourceError::Probe {
                path: path.to_path_buf(),
                reason: format!(
                    "unusable frame rate (avg '{}', r '{}')",
                    stream.avg_frame_rate, stream.r_frame_rate
                ),
            })?;

        let from_nb_frames = stream
            .nb_frames
            .as_deref()
            .and_then(|f| f.parse::<u64>().ok())
            .filter(|&n| n > 0);
        let from_duration = metadata
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d * frame_rate).round() as u64);

        let frame_count = from_nb_frames.or(from_duration).ok_or_else(|| FrameSourceError::Probe {
            path: path.to_path_buf(),
            reason: "neither nb_frames nor duration available".to_string(),
        })?;

        Ok(ClipProbe {
            frame_rate,
            frame_count,
        })
    }

    fn dynamic_range(&self, clip: &ClipDescriptor) -> Result<DynamicRange, FrameSourceError> {
        let color = probe_color(&clip.path).map_err(|e| FrameSourceError::Probe {
            path: clip.path.clone(),
            reason: e.to_string(),
        })?;
        let range = color.dynamic_range();
        log::debug!("Dynamic range of {}: {:?} -> {:?}", clip.path.display(), color, range);
        Ok(range)
    }

    fn frames<'a>(
        &'a self,
        clip: &ClipDescriptor,
        request: &FrameRequest,
    ) -> Result<FrameStream<'a>, FrameSourceError> {
        let filter = sampling_filter(request);
        log::debug!("Decoding {} with filter {}", clip.path.display(), filter);

        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner();
        cmd.input(clip.path.to_string_lossy().as_ref());
        cmd.args(["-an", "-sn", "-dn"]);
        cmd.args(["-vf", filter.as_str()]);
        cmd.args(["-fps_mode", "passthrough"]);
        cmd.rawvideo();

        let mut child = cmd.spawn().map_err(|e| FrameSourceError::Spawn {
            path: clip.path.clone(),
            reason: command_start_error("ffmpeg", e).to_string(),
        })?;
        let events = child.iter().map_err(|e| FrameSourceError::Spawn {
            path: clip.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Box::new(SidecarFrames {
            child,
            events,
            indices: Box::new(request.window.sample_indices(request.step)),
            path: clip.path.clone(),
            labels: FrameLabels::default(),
            produced: 0,
            finished: false,
        }))
    }
}

/// Matches the index each output frame was labelled with against the source
/// frame `showinfo` reported for it. Stdout and stderr arrive independently,
/// so either side may run ahead.
#[derive(Debug, Default)]
pub(crate) struct FrameLabels {
    labelled: VecDeque<u64>,
    reported: VecDeque<u64>,
}

impl FrameLabels {
    /// Records a label; returns `(label, actual)` on the first disagreement.
    pub(crate) fn labelled(&mut self, index: u64) -> Option<(u64, u64)> {
        self.labelled.push_back(index);
        self.check()
    }

    pub(crate) fn reported(&mut self, index: u64) -> Option<(u64, u64)> {
        self.reported.push_back(index);
        self.check()
    }

    fn check(&mut self) -> Option<(u64, u64)> {
        while let (Some(label), Some(actual)) = (self.labelled.front().copied(), self.reported.front().copied()) {
            self.labelled.pop_front();
            self.reported.pop_front();
            if label != actual {
                return Some((label, actual));
            }
        }
        None
    }
}

/// Lazy frame stream over a running ffmpeg process.
///
/// Output frames are labelled with the next expected index and checked
/// against what `showinfo` reports.
struct SidecarFrames {
    child: FfmpegChild,
    events: FfmpegIterator,
    indices: Box<dyn Iterator<Item = u64>>,
    path: PathBuf,
    labels: FrameLabels,
    produced: u64,
    finished: bool,
}

impl SidecarFrames {
    fn fail(&mut self, reason: String) -> Option<Result<LumaFrame, FrameSourceError>> {
        self.finished = true;
        Some(Err(FrameSourceError::Decode {
            frame_index: self.indices.next().unwrap_or(u64::MAX),
            reason,
        }))
    }

    fn mismatch_error(&mut self, label: u64, actual: u64) -> Option<Result<LumaFrame, FrameSourceError>> {
        self.finished = true;
        Some(Err(FrameSourceError::Decode {
            frame_index: label,
            reason: format!("ffmpeg delivered source frame {actual} where {label} was expected"),
        }))
    }
}

impl Iterator for SidecarFrames {
    type Item = Result<LumaFrame, FrameSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let Some(frame_index) = self.indices.next() else {
                        // More output than requested indices; the rest is ignored.
                        self.finished = true;
                        return None;
                    };
                    if let Some((label, actual)) = self.labels.labelled(frame_index) {
                        return self.mismatch_error(label, actual);
                    }
                    self.produced += 1;
                    return Some(LumaFrame::from_rgb24(frame_index, frame.width, frame.height, &frame.data));
                }
                FfmpegEvent::Log(_, message) if message.contains("Parsed_showinfo") => {
                    let Some(actual) = showinfo_frame(&message) else {
                        continue;
                    };
                    if let Some((label, actual)) = self.labels.reported(actual) {
                        return self.mismatch_error(label, actual);
                    }
                }
                FfmpegEvent::Error(message) => return self.fail(message),
                FfmpegEvent::Log(LogLevel::Fatal, message) => return self.fail(message),
                FfmpegEvent::Log(LogLevel::Error, message) => {
                    log::debug!("ffmpeg ({}): {}", self.path.display(), message);
                }
                _ => {}
            }
        }

        self.finished = true;
        if self.produced == 0 {
            Some(Err(FrameSourceError::Exhausted(self.path.clone())))
        } else {
            None
        }
    }
}

impl Drop for SidecarFrames {
    fn drop(&mut self) {
        // Early drop (fallback, error) must not leave ffmpeg running.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::SelectionWindow;

    #[test]
    fn test_sampling_filter() {
        let request = FrameRequest {
            window: SelectionWindow { lead: 240, trail: 99_760 },
            step: 4,
            downscale_height: 480,
        };
        assert_eq!(
            sampling_filter(&request),
            "setpts=N,select=gte(n\\,240)*lt(n\\,99760)*not(mod(n-240\\,4)),showinfo,scale=-2:480:flags=area"
        );
    }

    #[test]
    fn test_showinfo_frame_number() {
        let line = "[Parsed_showinfo_2 @ 0x5581d6c0] [info] n:   3 pts:    252 pts_time:252 duration:1";
        assert_eq!(showinfo_frame(line), Some(252));
        assert_eq!(
            showinfo_frame("[Parsed_showinfo_2 @ 0x5581d6c0] [info]  color_range:tv color_space:bt709"),
            None
        );
        assert_eq!(showinfo_frame("[info] frame=  10 fps=0.0 q=-0.0 size=N/A"), None);
    }

    #[test]
    fn test_frame_labels_match_in_either_order() {
        let mut labels = FrameLabels::default();
        assert_eq!(labels.reported(240), None);
        assert_eq!(labels.labelled(240), None);
        assert_eq!(labels.labelled(244), None);
        assert_eq!(labels.labelled(248), None);
        assert_eq!(labels.reported(244), None);
        // ffmpeg skipped 248.
        assert_eq!(labels.reported(252), Some((248, 252)));
    }

    fn color(transfer: &str, primaries: &str, bits: Option<&str>, pix_fmt: &str) -> ColorStream {
        ColorStream {
            color_transfer: Some(transfer.to_string()),
            color_primaries: Some(primaries.to_string()),
            bits_per_raw_sample: bits.map(str::to_string),
            pix_fmt: Some(pix_fmt.to_string()),
        }
    }

    #[test]
    fn test_hdr_needs_primaries_transfer_and_depth() {
        assert_eq!(color("smpte2084", "bt2020", Some("10"), "yuv420p10le").dynamic_range(), DynamicRange::Hdr);
        assert_eq!(color("arib-std-b67", "bt2020", None, "yuv420p10le").dynamic_range(), DynamicRange::Hdr);
        // SDR BT.2020 is not HDR.
        assert_eq!(color("bt2020-10", "bt2020", Some("10"), "yuv420p10le").dynamic_range(), DynamicRange::Sdr);
        assert_eq!(color("smpte2084", "bt709", Some("10"), "yuv420p10le").dynamic_range(), DynamicRange::Sdr);
        assert_eq!(color("smpte2084", "bt2020", None, "yuv420p").dynamic_range(), DynamicRange::Sdr);
        assert_eq!(ColorStream::default().dynamic_range(), DynamicRange::Sdr);
    }

    #[test]
    fn test_parse_color_fields() {
        let json = r#"{
            "programs": [],
            "streams": [
                {
                    "pix_fmt": "yuv420p10le",
                    "bits_per_raw_sample": "10",
                    "color_transfer": "smpte2084",
                    "color_primaries": "bt2020"
                }
            ]
        }"#;
        let stream = parse_color_probe(json).unwrap();
        assert_eq!(stream.dynamic_range(), DynamicRange::Hdr);

        assert!(matches!(parse_color_probe(r#"{"streams": []}"#), Err(CoreError::FfprobeParse(_))));
        assert!(matches!(parse_color_probe("not json"), Err(CoreError::FfprobeParse(_))));
    }
}
