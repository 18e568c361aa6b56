//! Triple classification by score threshold.
//!
//! A triple is predicted true when its score is at least the threshold.

use kgrank_core::{LabelledTriple, Triple};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scoring::ScoringModel;

/// Best threshold found on a labelled set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub threshold: f32,
    pub accuracy: f64,
}

/// Scores split by label, each sorted ascending.
struct LabelledScores {
    positive: Vec<f32>,
    negative: Vec<f32>,
}

impl LabelledScores {
    /// Also returns the raw scores in sample order.
    fn new<M>(model: &M, samples: &[LabelledTriple]) -> Result<(Self, Vec<f32>)>
    where
        M: ScoringModel + ?Sized,
    {
        if samples.is_empty() {
            return Err(kgrank_core::Error::EmptyTripleSet("classification samples").into());
        }
        let triples: Vec<Triple> = samples.iter().map(|s| s.triple).collect();
        let scores = model.score_triples(&triples)?;
        if scores.len() != samples.len() {
            return Err(Error::ScoreLength {
                expected: samples.len(),
                got: scores.len(),
            });
        }

        let (mut positive, mut negative) = (Vec::new(), Vec::new());
        for (sample, &score) in samples.iter().zip(&scores) {
            if sample.label {
                positive.push(score);
            } else {
                negative.push(score);
            }
        }
        positive.sort_by(f32::total_cmp);
        negative.sort_by(f32::total_cmp);
        Ok((Self { positive, negative }, scores))
    }

    fn accuracy(&self, threshold: f32) -> f64 {
        let below = |sorted: &[f32]| sorted.partition_point(|&s| s < threshold);
        let true_positive = self.positive.len() - below(&self.positive);
        let true_negative = below(&self.negative);
        let total = self.positive.len() + self.negative.len();
        (true_positive + true_negative) as f64 / total as f64
    }
}

/// Threshold maximising accuracy on `samples`, chosen among their scores.
///
/// Ties go to the earliest sample.
pub fn find_threshold<M>(model: &M, samples: &[LabelledTriple]) -> Result<Threshold>
where
    M: ScoringModel + ?Sized,
{
    let (split, scores) = LabelledScores::new(model, samples)?;
    let mut best = Threshold {
        threshold: scores[0],
        accuracy: split.accuracy(scores[0]),
    };
    for &threshold in &scores[1..] {
        let accuracy = split.accuracy(threshold);
        if accuracy > best.accuracy {
            best = Threshold { threshold, accuracy };
        }
    }
    tracing::debug!(
        threshold = best.threshold,
        accuracy = best.accuracy,
        "found classification threshold"
    );
    Ok(best)
}

/// Fraction of positives scoring `>= threshold` plus negatives scoring below it.
pub fn accuracy<M>(model: &M, samples: &[LabelledTriple], threshold: f32) -> Result<f64>
where
    M: ScoringModel + ?Sized,
{
    let (split, _) = LabelledScores::new(model, samples)?;
    Ok(split.accuracy(threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgrank_core::CorruptionMode;

    fn sample(head: u32, label: bool) -> LabelledTriple {
        LabelledTriple {
            triple: Triple::new(head, 0, 0),
            label,
        }
    }

    /// Scores a triple by its head id.
    fn head_model(fixed: &Triple, candidates: &[u32], mode: CorruptionMode) -> Result<Vec<f32>> {
        Ok(candidates
            .iter()
            .map(|&c| mode.replace(fixed, c).head.0 as f32)
            .collect())
    }

    #[test]
    fn test_separable_threshold() {
        let samples = [sample(1, false), sample(5, true), sample(2, false), sample(7, true)];
        let best = find_threshold(&head_model, &samples).unwrap();
        assert_eq!(best.threshold, 5.0);
        assert_eq!(best.accuracy, 1.0);
    }

    #[test]
    fn test_accuracy_counts_both_sides() {
        let samples = [sample(1, true), sample(3, false), sample(4, true), sample(6, false)];
        // threshold 4: positives {4} pass, negatives {3} below -> 2/4
        assert_eq!(accuracy(&head_model, &samples, 4.0).unwrap(), 0.5);
        // threshold 0: both positives pass, no negative below -> 2/4
        assert_eq!(accuracy(&head_model, &samples, 0.0).unwrap(), 0.5);
        // threshold 10: both negatives below -> 2/4
        assert_eq!(accuracy(&head_model, &samples, 10.0).unwrap(), 0.5);
    }

    #[test]
    fn test_ties_keep_first_threshold() {
        // thresholds 2 and 4 both give 3/4
        let samples = [sample(2, true), sample(1, false), sample(4, true), sample(3, false)];
        let best = find_threshold(&head_model, &samples).unwrap();
        assert_eq!(best.threshold, 2.0);
        assert_eq!(best.accuracy, 0.75);
        let samples = [sample(2, false), sample(4, false)];
        let best = find_threshold(&head_model, &samples).unwrap();
        assert_eq!(best.threshold, 4.0);
        assert_eq!(best.accuracy, 0.5);
    }

    #[test]
    fn test_empty_samples() {
        assert!(find_threshold(&head_model, &[]).is_err());
        assert!(accuracy(&head_model, &[], 0.0).is_err());
    }
}
