//! Scoring models.
//!
//! Evaluation and classification only need one capability from a model:
//! score a list of candidate ids for the corrupted slot of a triple, higher
//! meaning more plausible. [`ScoringModel`] is that capability; closures
//! with the matching signature implement it directly.
//!
//! [`EmbeddingModel`] is a reference implementation over in-memory entity
//! and relation tables.
//!
//! | Function | Score | Entity dim | Relation dim |
//! |----------|-------|------------|--------------|
//! | TransE | `gamma - ‖h + r - t‖₁` | d | d |
//! | DistMult | `<h, r, t>` | d | d |
//! | ComplEx | `Re(<h, r, conj(t)>)` | 2d | 2d |
//! | RotatE | `gamma - Σ |h ∘ r - t|` | 2d | d (phases) |
//!
//! Complex embeddings are stored as split halves: the first `d` values are
//! the real parts, the last `d` the imaginary parts.

use kgrank_core::{CorruptionMode, Triple};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::{Error, Result};

/// Slack added to `gamma` when sizing the initial embedding range.
const EPSILON: f32 = 2.0;

/// Scores candidate completions of a triple.
pub trait ScoringModel: Send + Sync {
    /// One score per candidate, in the order given.
    ///
    /// `fixed` supplies the two slots that are not corrupted; its `mode`
    /// slot is ignored and each candidate id is substituted in turn.
    fn score(&self, fixed: &Triple, candidates: &[u32], mode: CorruptionMode) -> Result<Vec<f32>>;

    /// Score complete triples.
    fn score_triples(&self, triples: &[Triple]) -> Result<Vec<f32>> {
        triples
            .iter()
            .map(|t| {
                let scores = self.score(t, &[t.tail.0], CorruptionMode::TailBatch)?;
                match scores.as_slice() {
                    [s] => Ok(*s),
                    other => Err(Error::ScoreLength {
                        expected: 1,
                        got: other.len(),
                    }),
                }
            })
            .collect()
    }
}

impl<F> ScoringModel for F
where
    F: Fn(&Triple, &[u32], CorruptionMode) -> Result<Vec<f32>> + Send + Sync,
{
    fn score(&self, fixed: &Triple, candidates: &[u32], mode: CorruptionMode) -> Result<Vec<f32>> {
        self(fixed, candidates, mode)
    }
}

/// Common scoring functions for KGE models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringFunction {
    TransE,
    DistMult,
    ComplEx,
    RotatE,
}

impl ScoringFunction {
    pub fn entity_dim(self, hidden_dim: usize) -> usize {
        match self {
            Self::ComplEx | Self::RotatE => 2 * hidden_dim,
            Self::TransE | Self::DistMult => hidden_dim,
        }
    }

    pub fn relation_dim(self, hidden_dim: usize) -> usize {
        match self {
            Self::ComplEx => 2 * hidden_dim,
            Self::TransE | Self::DistMult | Self::RotatE => hidden_dim,
        }
    }
}

/// `(gamma + 2) / hidden_dim`, which must be finite and positive.
///
/// RotatE divides relation phases by this range, so an empty range would
/// turn every score into NaN.
fn embedding_range(gamma: f32, hidden_dim: usize) -> Result<f32> {
    if hidden_dim == 0 {
        return Err(Error::InvalidConfig("hidden_dim must be at least 1".into()));
    }
    let range = (gamma + EPSILON) / hidden_dim as f32;
    if !(range.is_finite() && range > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "gamma {gamma} gives an empty embedding range"
        )));
    }
    Ok(range)
}

/// Entity and relation tables scored by a [`ScoringFunction`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingModel {
    function: ScoringFunction,
    hidden_dim: usize,
    gamma: f32,
    embedding_range: f32,
    n_entity: usize,
    n_relation: usize,
    /// Row-major, `n_entity x entity_dim`.
    entities: Vec<f32>,
    /// Row-major, `n_relation x relation_dim`.
    relations: Vec<f32>,
}

impl EmbeddingModel {
    /// Tables drawn uniformly from `[-range, range]`, `range = (gamma + 2) / hidden_dim`.
    pub fn new(
        function: ScoringFunction,
        n_entity: usize,
        n_relation: usize,
        hidden_dim: usize,
        gamma: f32,
        seed: u64,
    ) -> Result<Self> {
        let embedding_range = embedding_range(gamma, hidden_dim)?;

        let mut rng = XorShiftRng::seed_from_u64(seed);
        let mut table = |rows: usize, dim: usize| -> Vec<f32> {
            (0..rows * dim)
                .map(|_| rng.gen_range(-embedding_range..=embedding_range))
                .collect()
        };
        let entities = table(n_entity, function.entity_dim(hidden_dim));
        let relations = table(n_relation, function.relation_dim(hidden_dim));

        tracing::debug!(
            ?function,
            n_entity,
            n_relation,
            hidden_dim,
            gamma,
            "initialised embedding model"
        );

        Ok(Self {
            function,
            hidden_dim,
            gamma,
            embedding_range,
            n_entity,
            n_relation,
            entities,
            relations,
        })
    }

    /// Model over explicit tables; every row must have the function's width.
    pub fn from_tables(
        function: ScoringFunction,
        hidden_dim: usize,
        gamma: f32,
        entities: &[Vec<f32>],
        relations: &[Vec<f32>],
    ) -> Result<Self> {
        let embedding_range = embedding_range(gamma, hidden_dim)?;
        let flatten = |rows: &[Vec<f32>], dim: usize, what: &str| -> Result<Vec<f32>> {
            let mut flat = Vec::with_capacity(rows.len() * dim);
            for (i, row) in rows.iter().enumerate() {
                if row.len() != dim {
                    return Err(Error::InvalidConfig(format!(
                        "{what} {i} has width {}, expected {dim}",
                        row.len()
                    )));
                }
                flat.extend_from_slice(row);
            }
            Ok(flat)
        };

        Ok(Self {
            function,
            hidden_dim,
            gamma,
            embedding_range,
            n_entity: entities.len(),
            n_relation: relations.len(),
            entities: flatten(entities, function.entity_dim(hidden_dim), "entity")?,
            relations: flatten(relations, function.relation_dim(hidden_dim), "relation")?,
        })
    }

    pub fn function(&self) -> ScoringFunction {
        self.function
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn n_entity(&self) -> usize {
        self.n_entity
    }

    pub fn n_relation(&self) -> usize {
        self.n_relation
    }

    pub fn entity(&self, id: u32) -> Option<&[f32]> {
        let dim = self.function.entity_dim(self.hidden_dim);
        let start = id as usize * dim;
        self.entities.get(start..start + dim)
    }

    pub fn relation(&self, id: u32) -> Option<&[f32]> {
        let dim = self.function.relation_dim(self.hidden_dim);
        let start = id as usize * dim;
        self.relations.get(start..start + dim)
    }

    /// Score of a single complete triple.
    pub fn score_triple(&self, triple: &Triple) -> Result<f32> {
        let out_of_range = || {
            Error::Core(kgrank_core::Error::InvalidTriple {
                triple: *triple,
                n_entity: self.n_entity,
                n_relation: self.n_relation,
            })
        };
        let h = self.entity(triple.head.0).ok_or_else(out_of_range)?;
        let r = self.relation(triple.relation.0).ok_or_else(out_of_range)?;
        let t = self.entity(triple.tail.0).ok_or_else(out_of_range)?;

        Ok(match self.function {
            ScoringFunction::TransE => self.gamma - transe_distance(h, r, t),
            ScoringFunction::DistMult => distmult(h, r, t),
            ScoringFunction::ComplEx => complex(h, r, t),
            ScoringFunction::RotatE => {
                self.gamma - rotate_distance(h, r, t, self.embedding_range / PI)
            }
        })
    }
}

impl ScoringModel for EmbeddingModel {
    fn score(&self, fixed: &Triple, candidates: &[u32], mode: CorruptionMode) -> Result<Vec<f32>> {
        candidates
            .iter()
            .map(|&id| self.score_triple(&mode.replace(fixed, id)))
            .collect()
    }

    fn score_triples(&self, triples: &[Triple]) -> Result<Vec<f32>> {
        triples.iter().map(|t| self.score_triple(t)).collect()
    }
}

fn transe_distance(h: &[f32], r: &[f32], t: &[f32]) -> f32 {
    h.iter()
        .zip(r)
        .zip(t)
        .map(|((h, r), t)| (h + r - t).abs())
        .sum()
}

fn distmult(h: &[f32], r: &[f32], t: &[f32]) -> f32 {
    h.iter().zip(r).zip(t).map(|((h, r), t)| h * r * t).sum()
}

fn complex(h: &[f32], r: &[f32], t: &[f32]) -> f32 {
    let (h_re, h_im) = h.split_at(h.len() / 2);
    let (r_re, r_im) = r.split_at(r.len() / 2);
    let (t_re, t_im) = t.split_at(t.len() / 2);

    let mut score = 0.0;
    for i in 0..h_re.len() {
        // (h * r) = x + yi; Re((x + yi) * conj(t)) = x t_re + y t_im
        let x = h_re[i] * r_re[i] - h_im[i] * r_im[i];
        let y = h_re[i] * r_im[i] + h_im[i] * r_re[i];
        score += x * t_re[i] + y * t_im[i];
    }
    score
}

/// Relation values are phases, scaled so the initial range maps onto `[-pi, pi]`.
fn rotate_distance(h: &[f32], phases: &[f32], t: &[f32], phase_scale: f32) -> f32 {
    let (h_re, h_im) = h.split_at(h.len() / 2);
    let (t_re, t_im) = t.split_at(t.len() / 2);

    let mut distance = 0.0;
    for i in 0..h_re.len() {
        let (r_im, r_re) = (phases[i] / phase_scale).sin_cos();
        let diff_re = h_re[i] * r_re - h_im[i] * r_im - t_re[i];
        let diff_im = h_re[i] * r_im + h_im[i] * r_re - t_im[i];
        distance += (diff_re * diff_re + diff_im * diff_im).sqrt();
    }
    distance
}
