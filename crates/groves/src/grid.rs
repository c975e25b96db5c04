//! Hyperparameter grid encoding.
//!
//! The (alpha, TiG) grid is addressed by integer indices. Alpha values follow
//! the descending sequence `0.5, 0.2, 0.1, 0.05, 0.02, 0.01, ...`
//! (`{5, 2, 1} × 10^-k`), TiG values are `round(sqrt(2^(i + 1)))`:
//! `1, 2, 3, 4, 6, 8, 11, 16, ...`.
//!
//! All functions are pure.

/// Tolerance absorbing floating rounding when comparing against grid alphas.
const ALPHA_EPS: f64 = 1e-15;

/// A cell of the hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridIndex {
    pub alpha_idx: usize,
    pub tig_idx: usize,
}

impl GridIndex {
    pub fn new(alpha_idx: usize, tig_idx: usize) -> Self {
        Self { alpha_idx, tig_idx }
    }

    /// Monotone complexity proxy `2^alpha_idx × tig_value(tig_idx)`.
    ///
    /// Used to prefer the simpler model when two cells perform equally.
    pub fn complexity(&self) -> f64 {
        2f64.powi(self.alpha_idx as i32) * tig_value(self.tig_idx) as f64
    }
}

/// Alpha value of the grid step `alpha_idx`.
pub fn alpha_value(alpha_idx: usize) -> f64 {
    let alpha = 0.1f64.powi((alpha_idx / 3 + 1) as i32);
    match alpha_idx % 3 {
        0 => alpha * 5.0,
        1 => alpha * 2.0,
        _ => alpha,
    }
}

/// TiG value of the grid step `tig_idx`.
pub fn tig_value(tig_idx: usize) -> usize {
    (2f64.powi(tig_idx as i32 + 1).sqrt() + 0.5) as usize
}

/// Number of alpha steps needed to reach `max(min_alpha, 1 / train_n)`.
///
/// The last step is the first canonical value that is `<=` the target, so the
/// grid always contains a step at "one training example" resolution.
pub fn alpha_count(min_alpha: f64, train_n: usize) -> usize {
    let example_share = 1.0 / train_n.max(1) as f64;
    let mut count = 0;
    while min_alpha < alpha_value(count) - ALPHA_EPS && example_share < alpha_value(count) - ALPHA_EPS {
        count += 1;
    }
    count + 1
}

/// Number of TiG steps with a value `<= max_tig`.
///
/// Equivalently the smallest index whose value exceeds `max_tig`.
pub fn tig_count(max_tig: usize) -> usize {
    let mut idx = 0;
    while tig_value(idx) <= max_tig {
        idx += 1;
    }
    idx
}

/// Snap `alpha` to the closest canonical value.
///
/// Returns 0 when the training set is so small that a single example already
/// outweighs the requested fraction, and for any non-positive `alpha`.
pub fn adjust_alpha(alpha: f64, train_n: usize) -> f64 {
    if alpha <= 0.0 || 1.0 / train_n.max(1) as f64 > alpha {
        return 0.0;
    }
    let mut idx = 0;
    while alpha_value(idx) > alpha {
        idx += 1;
    }
    if idx == 0 {
        return alpha_value(0);
    }
    // alpha lies in [alpha_value(idx), alpha_value(idx - 1)); compare on log scale,
    // ties round up to the coarser value
    let upper = alpha_value(idx - 1);
    let lower = alpha_value(idx);
    if (upper / alpha).ln() <= (alpha / lower).ln() {
        upper
    } else {
        lower
    }
}

/// Round `tig` down to the closest grid value. Values below 1 map to 1.
pub fn adjust_tig(tig: usize) -> usize {
    tig_value(tig_count(tig.max(1)) - 1)
}

/// Alpha value reported for `alpha_idx` on a grid that ends at `min_alpha`.
///
/// The last step stands for `min_alpha` itself, which may be 0.
pub fn grid_alpha(alpha_idx: usize, alpha_n: usize, min_alpha: f64) -> f64 {
    if alpha_idx + 1 < alpha_n {
        alpha_value(alpha_idx)
    } else {
        min_alpha
    }
}

/// Format an alpha value without floating noise (`0.05`, not `0.05000000000000001`).
pub fn format_alpha(alpha: f64) -> String {
    if alpha <= 0.0 {
        return "0".to_string();
    }
    let digits = (-alpha.log10()).ceil().max(0.0) as usize;
    // one extra digit for values like 0.25 that are not canonical
    let s = format!("{:.*}", digits + 1, alpha);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn tig_sequence() {
        let values: Vec<usize> = (0..8).map(tig_value).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 6, 8, 11, 16]);
    }

    #[test]
    fn alpha_sequence() {
        let expected = [0.5, 0.2, 0.1, 0.05, 0.02, 0.01, 0.005];
        for (idx, want) in expected.iter().enumerate() {
            assert_relative_eq!(alpha_value(idx), *want, max_relative = 1e-12);
        }
        for idx in 0..20 {
            assert!(alpha_value(idx + 1) < alpha_value(idx));
        }
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[case(5, 4)]
    #[case(10, 6)]
    #[case(11, 7)]
    #[case(15, 7)]
    #[case(16, 8)]
    fn tig_count_cases(#[case] max_tig: usize, #[case] count: usize) {
        assert_eq!(tig_count(max_tig), count);
    }

    #[test]
    fn tig_count_ten_boundary() {
        // 8 is the largest valid value <= 10, the next one (11) exceeds it
        assert_eq!(tig_count(10), 6);
        assert_eq!(tig_value(tig_count(10) - 1), 8);
        assert_eq!(tig_value(tig_count(10)), 11);
    }

    #[rstest]
    #[case(0.1, 1000, 3)]
    #[case(0.5, 1000, 1)]
    #[case(0.01, 1000, 6)]
    #[case(0.0, 1000, 9)]
    #[case(0.0, 10, 3)]
    #[case(0.07, 1000, 4)]
    fn alpha_count_cases(#[case] min_alpha: f64, #[case] train_n: usize, #[case] count: usize) {
        assert_eq!(alpha_count(min_alpha, train_n), count);
    }

    #[rstest]
    #[case(4, 4)]
    #[case(5, 4)]
    #[case(7, 6)]
    #[case(10, 8)]
    #[case(0, 1)]
    fn adjust_tig_rounds_down(#[case] tig: usize, #[case] adjusted: usize) {
        assert_eq!(adjust_tig(tig), adjusted);
    }

    #[test]
    fn adjust_alpha_small_dataset_is_zero() {
        assert_eq!(adjust_alpha(0.05, 10), 0.0);
        assert_eq!(adjust_alpha(0.0, 1000), 0.0);
    }

    #[test]
    fn adjust_alpha_snaps_to_nearest() {
        assert_eq!(adjust_alpha(0.9, 1000), alpha_value(0));
        assert_eq!(adjust_alpha(0.19, 1000), alpha_value(1));
        assert_eq!(adjust_alpha(0.12, 1000), alpha_value(2));
        assert_eq!(adjust_alpha(0.011, 1000), alpha_value(5));
    }

    #[test]
    fn grid_alpha_uses_min_alpha_for_last_step() {
        assert_eq!(grid_alpha(0, 3, 0.0), alpha_value(0));
        assert_eq!(grid_alpha(2, 3, 0.0), 0.0);
    }

    #[test]
    fn complexity_tie() {
        // (alpha 0, tig 4) and (alpha 1, tig 2) are equally complex
        assert_eq!(GridIndex::new(0, 3).complexity(), GridIndex::new(1, 1).complexity());
    }

    #[rstest]
    #[case(0.5, "0.5")]
    #[case(0.05, "0.05")]
    #[case(0.002, "0.002")]
    #[case(0.0, "0")]
    fn format_alpha_cases(#[case] alpha: f64, #[case] text: &str) {
        assert_eq!(format_alpha(alpha), text);
    }

    #[test]
    fn format_alpha_canonical_values_are_clean() {
        assert_eq!(format_alpha(alpha_value(3)), "0.05");
        assert_eq!(format_alpha(alpha_value(7)), "0.002");
    }

    proptest! {
        #[test]
        fn tig_round_trip(k in 0usize..40) {
            prop_assert_eq!(tig_count(tig_value(k)) - 1, k);
            prop_assert_eq!(tig_value(tig_count(tig_value(k)) - 1), tig_value(k));
        }

        #[test]
        fn tig_non_decreasing(k in 0usize..40) {
            prop_assert!(tig_value(k + 1) >= tig_value(k));
        }

        #[test]
        fn adjust_alpha_keeps_grid_values(k in 0usize..12) {
            let alpha = alpha_value(k);
            let train_n = (2.0 / alpha).ceil() as usize + 1;
            prop_assert_eq!(adjust_alpha(alpha, train_n), alpha);
        }

        #[test]
        fn alpha_count_reaches_target(min_alpha in 0.0f64..1.0, train_n in 1usize..100_000) {
            let count = alpha_count(min_alpha, train_n);
            let target = min_alpha.max(1.0 / train_n as f64);
            prop_assert!(alpha_value(count - 1) <= target + 1e-15);
            if count > 1 {
                prop_assert!(alpha_value(count - 2) > target - 1e-15);
            }
        }
    }
}
