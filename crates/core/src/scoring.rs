//! Score arithmetic shared by attempts and summaries.

/// Percentage of `correct` out of `total`, rounded half up.
///
/// Integer arithmetic avoids float tie-breaking surprises: `1/8` is 12.5%
/// and rounds to 13. Returns 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u128;
    let total = total as u128;
    // (100 * c / t) + 1/2, floored
    ((200 * correct + total) / (2 * total)) as u8
}

/// Whether `score` meets `passing_threshold` (both in percent).
#[must_use]
pub fn is_passing(score: u8, passing_threshold: u8) -> bool {
    score >= passing_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_percentages() {
        assert_eq!(score_percent(5, 5), 100);
        assert_eq!(score_percent(2, 5), 40);
        assert_eq!(score_percent(0, 5), 0);
    }

    #[test]
    fn rounds_half_up() {
        // 12.5 -> 13, 37.5 -> 38, 62.5 -> 63
        assert_eq!(score_percent(1, 8), 13);
        assert_eq!(score_percent(3, 8), 38);
        assert_eq!(score_percent(5, 8), 63);
        // 33.33 -> 33, 66.67 -> 67
        assert_eq!(score_percent(1, 3), 33);
        assert_eq!(score_percent(2, 3), 67);
    }

    #[test]
    fn empty_total_scores_zero() {
        assert_eq!(score_percent(0, 0), 0);
    }

    #[test]
    fn passing_is_inclusive() {
        assert!(is_passing(70, 70));
        assert!(!is_passing(69, 70));
        assert!(is_passing(0, 0));
    }
}
