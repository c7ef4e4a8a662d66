// ============================================================================
// framesel-core/src/selection/planner.rs
// ============================================================================
//
// SELECTION PLANNER: Metric Series to Categorized Frame Picks
//
// `plan` is a pure function: the same metrics and configuration always give
// the same records, in the same order. It never touches decoders or disk.
//
// CATEGORIES:
// - User: configured frames, verbatim, attributed to the primary clip
// - Dark / Bright: lowest / highest mean brightness below / above each
//   clip's cut (quantile of its own distribution, or a fixed value),
//   pooled across clips
// - Motion: local maxima of the smoothed motion series above the
//   scene-cut quantile, with neighbours of accepted picks suppressed
// - Random: seeded uniform draws over the concatenated windows
//
// DEDUPLICATION:
// Categories claim frames in configured priority order. A frame index taken
// by an earlier category is skipped by later ones, which backfill from their
// next-best candidate. Output is sorted by frame index.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ranking::{Candidate, Direction, local_maxima, quantile, rank};
use super::{FALLBACK_SUFFIX, SelectionCategory, SelectionMetric, SelectionRecord, SelectionResult};
use crate::cache::CacheKey;
use crate::clip::{ClipDescriptor, ClipRole, primary_clip};
use crate::config::{SelectionConfig, ThresholdMode};
use crate::metrics::ClipMetrics;
use crate::utils::format_timecode;

/// Random draws give up after this many attempts per requested pick.
const RANDOM_ATTEMPTS_PER_PICK: usize = 64;

/// A claimed frame before it is turned into a record.
#[derive(Debug, Clone, Copy)]
struct Pick {
    frame_index: u64,
    role: ClipRole,
    category: SelectionCategory,
    score: Option<f64>,
}

/// Frame indices already taken by a higher-priority category.
#[derive(Debug, Default)]
struct Claims {
    frames: BTreeSet<u64>,
    picks: Vec<Pick>,
}

impl Claims {
    fn claim(&mut self, pick: Pick) -> bool {
        if self.frames.insert(pick.frame_index) {
            self.picks.push(pick);
            true
        } else {
            false
        }
    }

    fn is_claimed(&self, frame_index: u64) -> bool {
        self.frames.contains(&frame_index)
    }
}

/// Turns per-clip metrics into a [`SelectionResult`].
///
/// `clips` and `metrics` may come in any order; both are processed in role
/// order so the outcome depends only on their content.
pub fn plan(
    cache_key: CacheKey,
    clips: &[ClipDescriptor],
    metrics: &[ClipMetrics],
    config: &SelectionConfig,
) -> SelectionResult {
    let mut clips = clips.to_vec();
    clips.sort_by_key(|c| c.role);
    let by_role: BTreeMap<ClipRole, &ClipMetrics> = metrics.iter().map(|m| (m.role, m)).collect();

    let mut claims = Claims::default();
    for &category in &config.priority {
        let before = claims.picks.len();
        match category {
            SelectionCategory::User => claim_user_frames(&clips, config, &mut claims),
            SelectionCategory::Dark => {
                let candidates = brightness_candidates(&by_role, config, Direction::Ascending);
                take_ranked(candidates, SelectionCategory::Dark, config.quotas.dark, &mut claims);
            }
            SelectionCategory::Bright => {
                let candidates = brightness_candidates(&by_role, config, Direction::Descending);
                take_ranked(candidates, SelectionCategory::Bright, config.quotas.bright, &mut claims);
            }
            SelectionCategory::Motion => take_motion(&by_role, config, &mut claims),
            SelectionCategory::Random => take_random(&by_role, config, &mut claims),
        }
        log::debug!("{} claimed {} frame(s)", category, claims.picks.len() - before);
    }

    let mut picks = claims.picks;
    picks.sort_by_key(|p| (p.frame_index, p.role));

    let mut selections = Vec::with_capacity(picks.len());
    let mut snapshot = Vec::with_capacity(picks.len());
    for pick in picks {
        let clip_metrics = by_role.get(&pick.role).copied();
        selections.push(to_record(&pick, &clips, clip_metrics, config));
        let nearest = clip_metrics.and_then(|m| m.nearest(pick.frame_index));
        snapshot.push(SelectionMetric {
            frame_index: pick.frame_index,
            brightness: nearest.map(|m| m.brightness),
            motion: nearest.map(|m| m.motion),
        });
    }

    log::info!(
        "Planned {} selection(s) across {} clip(s)",
        selections.len(),
        clips.len()
    );

    SelectionResult {
        cache_key,
        clips,
        config: config.clone(),
        selections,
        metrics: snapshot,
    }
}

fn to_record(
    pick: &Pick,
    clips: &[ClipDescriptor],
    metrics: Option<&ClipMetrics>,
    config: &SelectionConfig,
) -> SelectionRecord {
    let degraded = metrics.is_some_and(|m| m.degraded);
    let hdr = metrics.is_some_and(|m| m.dynamic_range.is_hdr());
    let frame_rate = clips
        .iter()
        .find(|c| c.role == pick.role)
        .map(|c| c.frame_rate)
        .unwrap_or(0.0);

    let mut notes = Vec::new();
    if hdr && matches!(pick.category, SelectionCategory::Dark | SelectionCategory::Bright) {
        notes.push("hdr");
    }
    if degraded {
        notes.push("fallback metrics");
    }

    SelectionRecord {
        frame_index: pick.frame_index,
        timecode: format_timecode(pick.frame_index, frame_rate),
        category: pick.category,
        score: pick.score,
        source_tag: if degraded {
            format!("{}{}", config.engine, FALLBACK_SUFFIX)
        } else {
            config.engine.clone()
        },
        clip_role: pick.role,
        notes: notes.join("; "),
    }
}

fn claim_user_frames(clips: &[ClipDescriptor], config: &SelectionConfig, claims: &mut Claims) {
    let Some(primary) = primary_clip(clips) else {
        return;
    };
    for &frame_index in &config.user_frames {
        if frame_index >= primary.frame_count {
            log::debug!(
                "User frame {} is beyond the {} frames of {}; skipped",
                frame_index,
                primary.frame_count,
                primary.role
            );
            continue;
        }
        claims.claim(Pick {
            frame_index,
            role: primary.role,
            category: SelectionCategory::User,
            score: None,
        });
    }
}

/// Per-clip brightness cut for the dark (ascending) or bright (descending) side.
fn brightness_cut(values: &[f64], config: &SelectionConfig, direction: Direction) -> Option<f64> {
    let threshold = match direction {
        Direction::Ascending => config.dark_threshold,
        Direction::Descending => config.bright_threshold,
    };
    match config.threshold_mode {
        ThresholdMode::Quantile => quantile(values, threshold),
        ThresholdMode::Fixed => Some(threshold),
    }
}

fn brightness_candidates(
    by_role: &BTreeMap<ClipRole, &ClipMetrics>,
    config: &SelectionConfig,
    direction: Direction,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (&role, metrics) in by_role {
        let values: Vec<f64> = metrics.samples.iter().map(|m| m.brightness).collect();
        let Some(cut) = brightness_cut(&values, config, direction) else {
            continue;
        };
        candidates.extend(
            metrics
                .samples
                .iter()
                .filter(|m| metrics.window.contains(m.frame_index))
                .filter(|m| match direction {
                    Direction::Ascending => m.brightness <= cut,
                    Direction::Descending => m.brightness >= cut,
                })
                .map(|m| Candidate {
                    frame_index: m.frame_index,
                    role,
                    score: m.brightness,
                }),
        );
    }
    rank(&mut candidates, direction);
    candidates
}

fn take_ranked(candidates: Vec<Candidate>, category: SelectionCategory, quota: usize, claims: &mut Claims) {
    let mut taken = 0;
    for candidate in candidates {
        if taken == quota {
            break;
        }
        let claimed = claims.claim(Pick {
            frame_index: candidate.frame_index,
            role: candidate.role,
            category,
            score: Some(candidate.score),
        });
        if claimed {
            taken += 1;
        }
    }
}

fn take_motion(by_role: &BTreeMap<ClipRole, &ClipMetrics>, config: &SelectionConfig, claims: &mut Claims) {
    let radius = config.diff_radius as usize;
    let mut candidates = Vec::new();
    for (&role, metrics) in by_role {
        let motion: Vec<f64> = metrics.samples.iter().map(|m| m.motion).collect();
        let Some(cut) = quantile(&motion, config.scenecut_quantile) else {
            continue;
        };
        candidates.extend(
            local_maxima(&motion, radius)
                .into_iter()
                .map(|i| &metrics.samples[i])
                .filter(|m| m.motion > 0.0 && m.motion >= cut)
                .filter(|m| metrics.window.contains(m.frame_index))
                .map(|m| Candidate {
                    frame_index: m.frame_index,
                    role,
                    score: m.motion,
                }),
        );
    }
    rank(&mut candidates, Direction::Descending);

    // Suppression distance in frames.
    let reach = u64::from(config.diff_radius) * u64::from(config.step);
    let mut accepted: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if accepted.len() == config.quotas.motion {
            break;
        }
        let suppressed = accepted
            .iter()
            .any(|a| a.role == candidate.role && a.frame_index.abs_diff(candidate.frame_index) <= reach);
        if suppressed || claims.is_claimed(candidate.frame_index) {
            continue;
        }
        claims.claim(Pick {
            frame_index: candidate.frame_index,
            role: candidate.role,
            category: SelectionCategory::Motion,
            score: Some(candidate.score),
        });
        accepted.push(candidate);
    }
}

fn take_random(by_role: &BTreeMap<ClipRole, &ClipMetrics>, config: &SelectionConfig, claims: &mut Claims) {
    let quota = config.quotas.random;
    let spans: Vec<(ClipRole, u64, u64)> = by_role
        .iter()
        .filter(|(_, m)| !m.window.is_empty())
        .map(|(&role, m)| (role, m.window.lead, m.window.len()))
        .collect();
    let total: u64 = spans.iter().map(|&(_, _, len)| len).sum();
    if quota == 0 || total == 0 {
        return;
    }

    let mut rng = StdRng::seed_from_u64(config.rng_seed);
    let mut taken = 0;
    for _ in 0..quota.saturating_add(1).saturating_mul(RANDOM_ATTEMPTS_PER_PICK) {
        if taken == quota {
            break;
        }
        let mut offset = rng.gen_range(0..total);
        for &(role, lead, len) in &spans {
            if offset < len {
                let claimed = claims.claim(Pick {
                    frame_index: lead + offset,
                    role,
                    category: SelectionCategory::Random,
                    score: None,
                });
                if claimed {
                    taken += 1;
                }
                break;
            }
            offset -= len;
        }
    }
    if taken < quota {
        log::debug!("Random picks stopped at {taken} of {quota}: window exhausted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::SelectionWindow;
    use crate::config::CategoryQuotas;
    use crate::external::DynamicRange;
    use crate::metrics::FrameMetric;
    use chrono::{DateTime, Utc};

    fn key() -> CacheKey {
        CacheKey::from_hex("00".repeat(32))
    }

    fn clip(role: ClipRole, frame_count: u64) -> ClipDescriptor {
        ClipDescriptor {
            role,
            path: format!("{role}.mkv").into(),
            byte_size: 1,
            modified_time: DateTime::<Utc>::UNIX_EPOCH,
            content_hash: None,
            frame_rate: 24.0,
            frame_count,
        }
    }

    /// Metrics over `[lead, trail)` at step 4 with caller-defined values.
    fn metrics(
        role: ClipRole,
        frame_count: u64,
        window: SelectionWindow,
        value: impl Fn(u64) -> (f64, f64),
    ) -> ClipMetrics {
        ClipMetrics {
            role,
            frame_rate: 24.0,
            frame_count,
            window,
            dynamic_range: DynamicRange::Sdr,
            degraded: false,
            samples: window
                .sample_indices(4)
                .map(|i| {
                    let (brightness, motion) = value(i);
                    FrameMetric { frame_index: i, brightness, motion }
                })
                .collect(),
        }
    }

    fn config(quotas: CategoryQuotas) -> SelectionConfig {
        SelectionConfig {
            quotas,
            ..Default::default()
        }
    }

    fn ramp_with_cuts(i: u64) -> (f64, f64) {
        let motion = if i % 400 == 0 { 1.0 } else { 0.0 };
        (i as f64 / 4000.0, motion)
    }

    #[test]
    fn test_dark_and_bright_follow_brightness() {
        let window = SelectionWindow { lead: 0, trail: 4000 };
        let m = metrics(ClipRole::Target, 4000, window, ramp_with_cuts);
        let cfg = config(CategoryQuotas { dark: 2, bright: 2, motion: 0, random: 0 });
        let result = plan(key(), &[clip(ClipRole::Target, 4000)], &[m], &cfg);

        let dark: Vec<u64> = result.by_category(SelectionCategory::Dark).map(|s| s.frame_index).collect();
        let bright: Vec<u64> = result.by_category(SelectionCategory::Bright).map(|s| s.frame_index).collect();
        assert_eq!(dark, vec![0, 4]);
        assert_eq!(bright, vec![3992, 3996]);
        assert_eq!(result.selections[0].score, Some(0.0));
        assert_eq!(result.selections[0].timecode.as_deref(), Some("00:00:00.000"));
        assert_eq!(result.metrics.len(), result.selections.len());
    }

    #[test]
    fn test_motion_suppresses_neighbours() {
        let window = SelectionWindow { lead: 0, trail: 4000 };
        // Two adjacent spikes at 800/804 and a lower one at 2000.
        let m = metrics(ClipRole::Target, 4000, window, |i| {
            let motion = match i {
                800 => 0.9,
                804 => 0.8,
                2000 => 0.5,
                _ => 0.0,
            };
            (0.5, motion)
        });
        let cfg = config(CategoryQuotas { dark: 0, bright: 0, motion: 2, random: 0 });
        let result = plan(key(), &[clip(ClipRole::Target, 4000)], &[m], &cfg);
        assert_eq!(result.frame_indices(), vec![800, 2000]);
        assert!(result.selections.iter().all(|s| s.category == SelectionCategory::Motion));
    }

    #[test]
    fn test_user_frames_win_and_skip_window() {
        let window = SelectionWindow { lead: 240, trail: 3760 };
        let m = metrics(ClipRole::Target, 4000, window, ramp_with_cuts);
        let mut cfg = config(CategoryQuotas { dark: 1, bright: 0, motion: 0, random: 0 });
        cfg.user_frames = vec![10, 240, 10];
        let result = plan(key(), &[clip(ClipRole::Target, 4000)], &[m], &cfg);

        assert_eq!(result.frame_indices(), vec![10, 240, 244]);
        assert_eq!(result.selections[0].category, SelectionCategory::User);
        assert_eq!(result.selections[0].score, None);
        assert_eq!(result.selections[1].category, SelectionCategory::User);
        // Dark backfilled past the claimed frame.
        assert_eq!(result.selections[2].category, SelectionCategory::Dark);
    }

    #[test]
    fn test_user_frames_go_to_target() {
        let window = SelectionWindow { lead: 0, trail: 400 };
        let clips = [clip(ClipRole::Target, 400), clip(ClipRole::Reference, 400)];
        let all = [
            metrics(ClipRole::Reference, 400, window, |_| (0.5, 0.0)),
            metrics(ClipRole::Target, 400, window, |_| (0.5, 0.0)),
        ];
        let mut cfg = config(CategoryQuotas { dark: 0, bright: 0, motion: 0, random: 0 });
        cfg.user_frames = vec![7];
        let result = plan(key(), &clips, &all, &cfg);
        assert_eq!(result.selections.len(), 1);
        assert_eq!(result.selections[0].clip_role, ClipRole::Target);
        assert_eq!(result.clips[0].role, ClipRole::Reference);
    }

    #[test]
    fn test_random_is_seeded_and_windowed() {
        let window = SelectionWindow { lead: 100, trail: 200 };
        let m = metrics(ClipRole::Target, 300, window, |_| (0.5, 0.0));
        let mut cfg = config(CategoryQuotas { dark: 0, bright: 0, motion: 0, random: 5 });
        let clips = [clip(ClipRole::Target, 300)];

        let a = plan(key(), &clips, std::slice::from_ref(&m), &cfg);
        let b = plan(key(), &clips, std::slice::from_ref(&m), &cfg);
        assert_eq!(a, b);
        assert_eq!(a.selections.len(), 5);
        assert!(a.selections.iter().all(|s| window.contains(s.frame_index)));

        cfg.rng_seed += 1;
        let c = plan(key(), &clips, std::slice::from_ref(&m), &cfg);
        assert_ne!(a.frame_indices(), c.frame_indices());
    }

    #[test]
    fn test_random_stops_when_window_is_exhausted() {
        let window = SelectionWindow { lead: 0, trail: 3 };
        let m = metrics(ClipRole::Target, 3, window, |_| (0.5, 0.0));
        let cfg = config(CategoryQuotas { dark: 0, bright: 0, motion: 0, random: 10 });
        let result = plan(key(), &[clip(ClipRole::Target, 3)], &[m], &cfg);
        assert_eq!(result.frame_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_window_yields_no_automatic_picks() {
        let window = SelectionWindow { lead: 50, trail: 50 };
        let m = metrics(ClipRole::Target, 100, window, |_| (0.5, 0.0));
        let mut cfg = SelectionConfig::default();
        cfg.user_frames = vec![99];
        let result = plan(key(), &[clip(ClipRole::Target, 100)], &[m], &cfg);
        assert_eq!(result.frame_indices(), vec![99]);
        assert_eq!(result.metrics[0].brightness, None);
    }

    #[test]
    fn test_degraded_and_hdr_tags() {
        let window = SelectionWindow { lead: 0, trail: 400 };
        let mut m = metrics(ClipRole::Target, 400, window, |i| (i as f64 / 400.0, 0.0));
        m.degraded = true;
        m.dynamic_range = DynamicRange::Hdr;
        let cfg = config(CategoryQuotas { dark: 1, bright: 0, motion: 0, random: 1 });
        let result = plan(key(), &[clip(ClipRole::Target, 400)], &[m], &cfg);

        assert!(result.is_degraded());
        assert!(result.selections.iter().all(|s| s.source_tag == "select_v1.0+fallback"));
        let dark = result.by_category(SelectionCategory::Dark).next().unwrap();
        assert_eq!(dark.notes, "hdr; fallback metrics");
        let random = result.by_category(SelectionCategory::Random).next().unwrap();
        assert_eq!(random.notes, "fallback metrics");
    }

    #[test]
    fn test_dark_candidates_pool_across_clips() {
        let window = SelectionWindow { lead: 0, trail: 40 };
        let clips = [clip(ClipRole::Reference, 40), clip(ClipRole::Target, 40)];
        let all = [
            metrics(ClipRole::Target, 40, window, |i| (if i == 8 { 0.0 } else { 0.5 }, 0.0)),
            metrics(ClipRole::Reference, 40, window, |i| (if i == 12 { 0.0 } else { 0.5 }, 0.0)),
        ];
        let mut cfg = config(CategoryQuotas { dark: 2, bright: 0, motion: 0, random: 0 });
        cfg.threshold_mode = ThresholdMode::Fixed;
        cfg.dark_threshold = 0.1;
        let result = plan(key(), &clips, &all, &cfg);
        let picked: Vec<(u64, ClipRole)> = result.selections.iter().map(|s| (s.frame_index, s.clip_role)).collect();
        assert_eq!(picked, vec![(8, ClipRole::Target), (12, ClipRole::Reference)]);
    }
}
