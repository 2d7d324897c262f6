// SPDX-License-Identifier: Apache-2.0

use similar::TextDiff;

/// Character-level match ratio `2 * M / (len(a) + len(b))`, in `[0, 1]`,
/// where `M` counts the characters a character diff keeps unchanged. The
/// diff is not guaranteed minimal, so swapping the arguments may shift the
/// score slightly.
///
/// Two empty strings are identical (`1.0`); one empty string against a
/// non-empty one scores `0.0`.
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Rounds to four decimals for stable report output.
#[must_use]
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::{round4, similarity_ratio};
    use proptest::prelude::*;

    #[test]
    fn edge_cases() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
        assert_eq!(similarity_ratio("same", "same"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn near_strings_score_high() {
        let ratio = similarity_ratio("windows11pro", "windows11home");
        assert!(ratio > 0.6 && ratio < 0.9, "{ratio}");
        assert_eq!(round4(similarity_ratio("abcd", "abce")), 0.75);
    }

    #[test]
    fn long_inputs_are_compared_in_full() {
        let base = "x".repeat(600);
        let tail_differs = format!("{base}y");
        assert!(similarity_ratio(&base, &tail_differs) < 1.0);
        assert_eq!(similarity_ratio(&tail_differs, &tail_differs), 1.0);
    }

    proptest! {
        #[test]
        fn ratio_is_bounded_and_reflexive(a in "[a-z0-9]{0,24}", b in "[a-z0-9]{0,24}") {
            prop_assert!((0.0..=1.0).contains(&similarity_ratio(&a, &b)));
            prop_assert!((0.0..=1.0).contains(&similarity_ratio(&b, &a)));
            prop_assert_eq!(similarity_ratio(&a, &a), 1.0);
        }
    }
}
