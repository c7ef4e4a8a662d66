//! Centered moving average for the motion series.

/// Smooths `values` with a centered moving average of `period` samples.
///
/// Near the ends the window is truncated to the samples that exist, so the
/// output has the same length as the input. A period of 0 or 1 returns the
/// input unchanged.
pub fn moving_average(values: &[f64], period: u32) -> Vec<f64> {
    let period = period as usize;
    if period <= 1 || values.len() < 2 {
        return values.to_vec();
    }
    let before = (period - 1) / 2;
    let after = period - 1 - before;

    // Each window is summed directly so equal neighbourhoods give bit-equal
    // averages; the planner relies on exact ties.
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(values.len());
            values[start..end].iter().sum::<f64>() / (end - start) as f64
        })
        .collect()
}
