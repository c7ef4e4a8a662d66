//! Quantiles and candidate ordering shared by the planner's categories.

use std::cmp::Ordering;

use crate::clip::ClipRole;

/// Linear-interpolation quantile of `values` (`q` in `[0, 1]`).
///
/// Returns `None` for an empty slice. Non-finite values are ignored.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// A frame that qualifies for a scored category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub frame_index: u64,
    pub role: ClipRole,
    pub score: f64,
}

/// Which end of the score range ranks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Ascending,
    Descending,
}

/// Sorts best-first. Equal scores fall back to the lower frame index, then
/// to clip role, so the order is total and reproducible.
pub(crate) fn rank(candidates: &mut [Candidate], direction: Direction) {
    candidates.sort_by(|a, b| {
        let by_score = match direction {
            Direction::Ascending => a.score.total_cmp(&b.score),
            Direction::Descending => b.score.total_cmp(&a.score),
        };
        by_score
            .then(a.frame_index.cmp(&b.frame_index))
            .then(a.role.cmp(&b.role))
    });
}

/// Indices of samples that are local maxima of `scores` within `radius`
/// neighbours on each side. On a plateau only the earliest sample counts.
pub(crate) fn local_maxima(scores: &[f64], radius: usize) -> Vec<usize> {
    (0..scores.len())
        .filter(|&i| {
            let start = i.saturating_sub(radius);
            let end = (i + radius + 1).min(scores.len());
            (start..end).all(|j| match scores[j].total_cmp(&scores[i]) {
                Ordering::Greater => false,
                Ordering::Equal => j >= i,
                Ordering::Less => true,
            })
        })
        .collect()
}
