//! Score aggregation over a set of analyses.

use crucible_types::Analysis;

/// Arithmetic mean of the scores that are present. Unscored analyses are
/// excluded from both numerator and denominator; an empty or fully unscored
/// set yields `0.0`.
pub fn aggregate_score(analyses: &[Analysis]) -> f64 {
    let scores: Vec<f64> = analyses.iter().filter_map(|a| a.score).collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scored(score: Option<f64>) -> Analysis {
        Analysis::new(Uuid::new_v4(), "technical", score, "n".into(), None)
    }

    #[test]
    fn empty_set_scores_zero() {
        assert_eq!(aggregate_score(&[]), 0.0);
    }

    #[test]
    fn all_unscored_scores_zero() {
        assert_eq!(aggregate_score(&[scored(None), scored(None)]), 0.0);
    }

    #[test]
    fn unscored_analyses_are_excluded_from_the_mean() {
        let analyses = [scored(Some(80.0)), scored(None), scored(Some(60.0))];
        assert_eq!(aggregate_score(&analyses), 70.0);
    }

    #[test]
    fn single_score_is_its_own_mean() {
        assert_eq!(aggregate_score(&[scored(Some(42.0))]), 42.0);
    }
}
