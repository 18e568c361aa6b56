//! Filtered rank-based evaluation for link prediction.
//!
//! For a test triple `(h, r, t)`:
//! 1. **Tail prediction**: score every entity as the tail of `(h, r, ?)`
//! 2. **Head prediction**: score every entity as the head of `(?, r, t)`
//! 3. **Relation prediction** (optional): score every relation for `(h, ?, t)`
//!
//! Before ranking, every candidate that forms a *different* known-true triple
//! receives [`FILTER_BIAS`], so it can never outrank the answer. The answer's
//! own bias is zero.
//!
//! | Setting | Known triples | Use Case |
//! |---------|---------------|----------|
//! | Raw | [`PrefixIndex::empty`] | Pessimistic estimate |
//! | Filtered | train + valid + test | Standard benchmark |
//!
//! Ranks are 1-indexed positions in a stable descending sort of the biased
//! scores: ties keep candidate-id order.

use kgrank_core::{CorruptionMode, Dataset, PrefixIndex, Triple};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{EvalConfig, MAX_DECIMALS};
use crate::error::{Error, Result};
use crate::scoring::ScoringModel;

/// Added to the score of every known-true candidate other than the answer.
pub const FILTER_BIAS: f32 = -1.0e9;

/// Suffix appended to metric names of relation prediction.
pub const RELATION_SUFFIX: &str = "_relations";

/// Rank-based evaluation results, kept as running means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankMetrics {
    /// Mean Reciprocal Rank: E\[1/rank\]
    pub mrr: f64,
    /// Mean Rank: E\[rank\]
    pub mr: f64,
    /// Hits@1: P(rank = 1)
    pub hits_at_1: f64,
    /// Hits@3: P(rank <= 3)
    pub hits_at_3: f64,
    /// Hits@10: P(rank <= 10)
    pub hits_at_10: f64,
    /// Number of ranks folded in
    pub num_triples: usize,
}

impl RankMetrics {
    /// Compute metrics from a list of 1-indexed ranks.
    pub fn from_ranks(ranks: &[usize]) -> Self {
        let mut metrics = Self::default();
        for &rank in ranks {
            metrics.push(rank);
        }
        metrics
    }

    /// Fold one rank into the running means.
    pub fn push(&mut self, rank: usize) {
        self.num_triples += 1;
        let n = self.num_triples as f64;
        let rank_f = rank as f64;
        let hit = |k: usize| if rank <= k { 1.0 } else { 0.0 };

        self.mrr += (1.0 / rank_f - self.mrr) / n;
        self.mr += (rank_f - self.mr) / n;
        self.hits_at_1 += (hit(1) - self.hits_at_1) / n;
        self.hits_at_3 += (hit(3) - self.hits_at_3) / n;
        self.hits_at_10 += (hit(10) - self.hits_at_10) / n;
    }

    /// Merge metrics from multiple evaluation runs, weighted by their size.
    pub fn merge(metrics: &[Self]) -> Self {
        let total_triples: usize = metrics.iter().map(|m| m.num_triples).sum();
        if total_triples == 0 {
            return Self::default();
        }

        let total_f = total_triples as f64;
        let weighted = |f: fn(&Self) -> f64| {
            metrics
                .iter()
                .map(|m| f(m) * m.num_triples as f64)
                .sum::<f64>()
                / total_f
        };

        Self {
            mrr: weighted(|m| m.mrr),
            mr: weighted(|m| m.mr),
            hits_at_1: weighted(|m| m.hits_at_1),
            hits_at_3: weighted(|m| m.hits_at_3),
            hits_at_10: weighted(|m| m.hits_at_10),
            num_triples: total_triples,
        }
    }

    /// Format as summary string.
    pub fn summary(&self) -> String {
        format!(
            "MRR: {:.4} | MR: {:.1} | H@1: {:.3} | H@3: {:.3} | H@10: {:.3} (n={})",
            self.mrr, self.mr, self.hits_at_1, self.hits_at_3, self.hits_at_10, self.num_triples
        )
    }

    /// Metric name to value, rounded to `decimals` places (at most
    /// [`MAX_DECIMALS`]).
    ///
    /// Names are `MRR`, `MR`, `HITS@1`, `HITS@3` and `HITS@10`, each
    /// followed by `suffix`.
    pub fn report(&self, suffix: &str, decimals: u32) -> BTreeMap<String, f64> {
        [
            ("MRR", self.mrr),
            ("MR", self.mr),
            ("HITS@1", self.hits_at_1),
            ("HITS@3", self.hits_at_3),
            ("HITS@10", self.hits_at_10),
        ]
        .into_iter()
        .map(|(name, value)| (format!("{name}{suffix}"), round_to(value, decimals)))
        .collect()
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    // MAX_DECIMALS keeps the cast lossless and the scale finite.
    let scale = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    (value * scale).round() / scale
}

/// Indices of `scores` from best to worst; ties keep index order.
fn descending_order(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// 1-indexed position of `answer` after a stable descending sort of `scores`.
///
/// Fails with [`Error::RankInvariant`] unless `answer` occurs exactly once
/// in `candidates`.
pub fn rank_of(answer: u32, candidates: &[u32], scores: &[f32]) -> Result<usize> {
    if scores.len() != candidates.len() {
        return Err(Error::ScoreLength {
            expected: candidates.len(),
            got: scores.len(),
        });
    }
    let occurrences = candidates.iter().filter(|&&c| c == answer).count();
    if occurrences != 1 {
        return Err(Error::RankInvariant { answer, occurrences });
    }

    descending_order(scores)
        .iter()
        .position(|&i| candidates[i] == answer)
        .map(|position| position + 1)
        .ok_or(Error::RankInvariant { answer, occurrences: 0 })
}

/// Filtered link prediction evaluator.
///
/// Holds no mutable state: the same evaluator may rank many models, and
/// several evaluations may share one [`PrefixIndex`].
///
/// # Example
///
/// ```rust
/// use kgrank_core::{triples, CorruptionMode, Dataset, Triple};
/// use kgrank_kge::{Evaluator, Result};
///
/// let train = triples(&[(0, 0, 1), (1, 0, 2)]);
/// let dataset = Dataset::from_id_triples("toy", train, vec![], triples(&[(2, 0, 0)]))?;
/// let evaluator = Evaluator::for_dataset(&dataset);
///
/// // Predicts exactly the triples with t = h + 1 (mod 3).
/// let model = |fixed: &Triple, candidates: &[u32], mode: CorruptionMode| -> Result<Vec<f32>> {
///     let target = match mode {
///         CorruptionMode::TailBatch => (fixed.head.0 + 1) % 3,
///         _ => (fixed.tail.0 + 2) % 3,
///     };
///     Ok(candidates.iter().map(|&c| if c == target { 1.0 } else { 0.0 }).collect())
/// };
///
/// let metrics = evaluator.evaluate(&model, dataset.test())?;
/// assert_eq!(metrics.mrr, 1.0);
/// # Ok::<(), kgrank_kge::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    known: Arc<PrefixIndex>,
    n_entity: usize,
    n_relation: usize,
    config: EvalConfig,
}

impl Evaluator {
    /// Evaluator over id ranges `[0, n_entity)` and `[0, n_relation)`,
    /// filtering with `known`.
    pub fn new(known: Arc<PrefixIndex>, n_entity: usize, n_relation: usize) -> Self {
        Self {
            known,
            n_entity,
            n_relation,
            config: EvalConfig::default(),
        }
    }

    /// Evaluator filtering every true triple of `dataset`.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        Self::new(
            Arc::new(dataset.true_prefix_index()),
            dataset.n_entity(),
            dataset.n_relation(),
        )
    }

    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn known(&self) -> &PrefixIndex {
        &self.known
    }

    fn candidate_range(&self, mode: CorruptionMode) -> usize {
        if mode.corrupts_relation() {
            self.n_relation
        } else {
            self.n_entity
        }
    }

    /// Bias of every candidate id for the `mode` slot of `triple`.
    pub fn filter_bias(&self, triple: &Triple, mode: CorruptionMode) -> Vec<f32> {
        let mut bias = vec![0.0; self.candidate_range(mode)];
        let answer = mode.slot(triple);
        for id in self.known.known_completions(triple, mode) {
            if id != answer {
                if let Some(b) = bias.get_mut(id as usize) {
                    *b = FILTER_BIAS;
                }
            }
        }
        bias
    }

    /// Model scores of every candidate id for the `mode` slot of `triple`.
    fn score_all<M>(
        &self,
        model: &M,
        triple: &Triple,
        mode: CorruptionMode,
    ) -> Result<(Vec<u32>, Vec<f32>)>
    where
        M: ScoringModel + ?Sized,
    {
        triple.check_range(self.n_entity, self.n_relation)?;

        let range = u32::try_from(self.candidate_range(mode))
            .map_err(|_| Error::InvalidConfig("candidate range exceeds u32".into()))?;
        let candidates: Vec<u32> = (0..range).collect();
        let scores = model.score(triple, &candidates, mode)?;
        if scores.len() != candidates.len() {
            return Err(Error::ScoreLength {
                expected: candidates.len(),
                got: scores.len(),
            });
        }
        Ok((candidates, scores))
    }

    fn biased(&self, scores: &[f32], triple: &Triple, mode: CorruptionMode) -> Vec<f32> {
        scores
            .iter()
            .zip(self.filter_bias(triple, mode))
            .map(|(score, bias)| score + bias)
            .collect()
    }

    /// Filtered rank of the true `mode` slot of `triple`.
    pub fn rank<M>(&self, model: &M, triple: &Triple, mode: CorruptionMode) -> Result<usize>
    where
        M: ScoringModel + ?Sized,
    {
        let (candidates, scores) = self.score_all(model, triple, mode)?;
        rank_of(mode.slot(triple), &candidates, &self.biased(&scores, triple, mode))
    }

    /// Best `k` completions of the `mode` slot of `triple`, best first.
    ///
    /// Known completions other than the triple's own slot are pushed behind
    /// every unknown candidate, so the list favours new facts. Scores are the
    /// model's own, without the filter bias. Fewer than `k` entries come back
    /// when the candidate range is smaller.
    pub fn top_k<M>(
        &self,
        model: &M,
        triple: &Triple,
        mode: CorruptionMode,
        k: usize,
    ) -> Result<Vec<(u32, f32)>>
    where
        M: ScoringModel + ?Sized,
    {
        let (candidates, scores) = self.score_all(model, triple, mode)?;
        let biased = self.biased(&scores, triple, mode);
        Ok(descending_order(&biased)
            .into_iter()
            .take(k)
            .map(|i| (candidates[i], scores[i]))
            .collect())
    }

    /// Ranks of every triple in one direction, in input order.
    pub fn ranks<M>(
        &self,
        model: &M,
        triples: &[Triple],
        mode: CorruptionMode,
    ) -> Result<Vec<usize>>
    where
        M: ScoringModel + ?Sized,
    {
        if self.config.parallel {
            triples
                .par_iter()
                .map(|t| self.rank(model, t, mode))
                .collect()
        } else {
            triples.iter().map(|t| self.rank(model, t, mode)).collect()
        }
    }

    /// Metrics of a single corruption direction.
    pub fn evaluate_mode<M>(
        &self,
        model: &M,
        triples: &[Triple],
        mode: CorruptionMode,
    ) -> Result<RankMetrics>
    where
        M: ScoringModel + ?Sized,
    {
        if triples.is_empty() {
            return Err(kgrank_core::Error::EmptyTripleSet("evaluation triples").into());
        }
        let metrics = RankMetrics::from_ranks(&self.ranks(model, triples, mode)?);
        tracing::debug!(%mode, summary = %metrics.summary(), "evaluated direction");
        Ok(metrics)
    }

    /// Entity metrics: every triple is ranked as head and as tail, and both
    /// ranks feed one set of means.
    pub fn evaluate<M>(&self, model: &M, triples: &[Triple]) -> Result<RankMetrics>
    where
        M: ScoringModel + ?Sized,
    {
        let per_mode = CorruptionMode::ENTITY_MODES
            .iter()
            .map(|&mode| self.evaluate_mode(model, triples, mode))
            .collect::<Result<Vec<_>>>()?;
        let metrics = RankMetrics::merge(&per_mode);
        tracing::info!(summary = %metrics.summary(), "entity evaluation");
        Ok(metrics)
    }

    /// Relation metrics: every triple is ranked against all relations.
    pub fn evaluate_relations<M>(&self, model: &M, triples: &[Triple]) -> Result<RankMetrics>
    where
        M: ScoringModel + ?Sized,
    {
        let metrics = self.evaluate_mode(model, triples, CorruptionMode::RelationBatch)?;
        tracing::info!(summary = %metrics.summary(), "relation evaluation");
        Ok(metrics)
    }

    /// Entity metrics as a rounded report.
    pub fn report<M>(&self, model: &M, triples: &[Triple]) -> Result<BTreeMap<String, f64>>
    where
        M: ScoringModel + ?Sized,
    {
        self.config.validate()?;
        Ok(self.evaluate(model, triples)?.report("", self.config.decimals))
    }

    /// Relation metrics as a rounded report with `_relations` names.
    pub fn report_relations<M>(
        &self,
        model: &M,
        triples: &[Triple],
    ) -> Result<BTreeMap<String, f64>>
    where
        M: ScoringModel + ?Sized,
    {
        self.config.validate()?;
        Ok(self
            .evaluate_relations(model, triples)?
            .report(RELATION_SUFFIX, self.config.decimals))
    }
}
