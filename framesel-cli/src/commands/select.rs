//! Implementation of the 'select' and 'fingerprint' subcommands.
//!
//! Both resolve the effective configuration (defaults, FRAMESEL_* env vars,
//! config file, then flags) and capture the clips through ffprobe. `select`
//! then hands everything to the orchestrator and prints the selection.

use crate::cli::{InputArgs, SelectArgs};
use crate::error::{CliErrorContext, CliResult};

use framesel_core::cache::fingerprint::fingerprint;
use framesel_core::{
    CacheEntry, CacheStore, ClipDescriptor, ClipRole, CoreError, FfmpegFrameSource, FrameSource,
    RunFlags, SelectionConfig, SelectionOrchestrator, SelectionResult, load_config_file,
};

use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};

/// Effective selection config for the given arguments.
pub fn resolve_config(args: &InputArgs) -> CliResult<SelectionConfig> {
    let mut config = SelectionConfig::from_env();
    if let Some(path) = &args.config {
        config = load_config_file(path, config)?;
    }
    if let Some(step) = args.step {
        config.step = step;
    }
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    if let Some(frames) = &args.user_frames {
        config.user_frames = frames.clone();
    }
    if let Some(seconds) = args.ignore_lead {
        config.ignore_lead_seconds = seconds;
    }
    if let Some(seconds) = args.ignore_trail {
        config.ignore_trail_seconds = seconds;
    }
    debug!("Effective selection config: {:?}", config);
    Ok(config)
}

/// Clip paths by role. At least one is required.
pub fn clip_paths(args: &InputArgs) -> CliResult<Vec<(ClipRole, &Path)>> {
    let paths: Vec<(ClipRole, &Path)> = [
        (ClipRole::Reference, args.reference.as_deref()),
        (ClipRole::Target, args.target.as_deref()),
    ]
    .into_iter()
    .filter_map(|(role, path)| path.map(|p| (role, p)))
    .collect();

    if paths.is_empty() {
        return Err(CoreError::Config(
            "at least one of --reference or --target is required".to_string(),
        ));
    }
    Ok(paths)
}

fn capture_clips<S: FrameSource + ?Sized>(
    source: &S,
    paths: &[(ClipRole, &Path)],
) -> CliResult<Vec<ClipDescriptor>> {
    paths
        .iter()
        .map(|(role, path)| ClipDescriptor::capture(*role, path, source))
        .collect()
}

/// Runs a selection and prints it.
pub fn run_select(args: &SelectArgs) -> CliResult<()> {
    let config = resolve_config(&args.input)?;
    let paths = clip_paths(&args.input)?;
    let flags = RunFlags {
        ignore_cache: args.ignore_cache,
        require_cache: args.require_cache,
        frame_list: args.frame_list.clone(),
    };
    flags.validate()?;

    // Nothing to reuse without a file; no need to probe the clips first.
    if flags.require_cache && !args.cache_file.is_file() {
        return Err(CoreError::FrozenCache(format!(
            "no cache file at {}; refusing to recompute",
            args.cache_file.display()
        )));
    }

    let source = FfmpegFrameSource::new();
    let clips = capture_clips(&source, &paths)?;
    let orchestrator = SelectionOrchestrator::new(&source, CacheStore::new(&args.cache_file));

    let start = Instant::now();
    let result = orchestrator.select(&clips, &config, &flags)?;
    info!(
        "Selection {} ready in {:.1}s ({} frames)",
        result.cache_key,
        start.elapsed().as_secs_f64(),
        result.selections.len()
    );

    if args.json {
        let json = serde_json::to_string_pretty(&CacheEntry::from_result(&result))
            .cli_context("Failed to render selection as JSON")?;
        println!("{json}");
    } else {
        print!("{}", format_table(&result));
    }
    Ok(())
}

/// Prints the cache key for the clips and options.
pub fn run_fingerprint(args: &InputArgs) -> CliResult<()> {
    let config = resolve_config(args)?;
    let paths = clip_paths(args)?;
    let source = FfmpegFrameSource::new();
    let clips = capture_clips(&source, &paths)?;
    println!("{}", fingerprint(&clips, &config)?);
    Ok(())
}

/// Plain-text table of the selection, one row per frame.
pub fn format_table(result: &SelectionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>8}  {:<12}  {:<6}  {:>6}  {:<4}  {}",
        "FRAME", "TIMECODE", "TYPE", "SCORE", "CLIP", "SOURCE"
    );
    for record in &result.selections {
        let score = record.score.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
        let _ = write!(
            out,
            "{:>8}  {:<12}  {:<6}  {:>6}  {:<4}  {}",
            record.frame_index,
            record.timecode.as_deref().unwrap_or("-"),
            record.category.as_str(),
            score,
            record.clip_role.as_str(),
            record.source_tag
        );
        if !record.notes.is_empty() {
            let _ = write!(out, "  ({})", record.notes);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "cache key: {}", result.cache_key);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use framesel_core::cache::CacheKey;
    use framesel_core::{SelectionCategory, SelectionRecord};
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_config_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("select.toml");
        std::fs::write(&path, "step = 8\nrng_seed = 1\ndiff_radius = 5\n")?;

        let args = InputArgs {
            config: Some(path),
            seed: Some(2_020_221),
            user_frames: Some(vec![7]),
            ..Default::default()
        };
        let config = resolve_config(&args)?;
        assert_eq!(config.step, 8);
        assert_eq!(config.diff_radius, 5);
        assert_eq!(config.rng_seed, 2_020_221);
        assert_eq!(config.user_frames, vec![7]);
        Ok(())
    }

    #[test]
    fn test_clip_paths() {
        assert!(matches!(clip_paths(&InputArgs::default()), Err(CoreError::Config(_))));

        let args = InputArgs {
            target: Some(PathBuf::from("enc.mkv")),
            reference: Some(PathBuf::from("src.mkv")),
            ..Default::default()
        };
        let paths = clip_paths(&args).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], (ClipRole::Reference, Path::new("src.mkv")));
        assert_eq!(paths[1], (ClipRole::Target, Path::new("enc.mkv")));
    }

    #[test]
    fn test_format_table() {
        let result = SelectionResult {
            cache_key: CacheKey::from_hex("ab"),
            clips: Vec::new(),
            config: SelectionConfig::default(),
            selections: vec![
                SelectionRecord {
                    frame_index: 480,
                    timecode: Some("00:00:20.000".to_string()),
                    category: SelectionCategory::Dark,
                    score: Some(0.0612),
                    source_tag: "select_v1.0".to_string(),
                    clip_role: ClipRole::Target,
                    notes: String::new(),
                },
                SelectionRecord {
                    frame_index: 9000,
                    timecode: None,
                    category: SelectionCategory::Random,
                    score: None,
                    source_tag: "select_v1.0+fallback".to_string(),
                    clip_role: ClipRole::Reference,
                    notes: "fallback metrics".to_string(),
                },
            ],
            metrics: Vec::new(),
        };

        let table = format_table(&result);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("   FRAME"));
        assert_eq!(lines[1], "     480  00:00:20.000  Dark     0.061  tgt   select_v1.0");
        assert!(lines[2].ends_with("select_v1.0+fallback  (fallback metrics)"));
        assert_eq!(lines[3], "cache key: sha256:ab");
    }
}
