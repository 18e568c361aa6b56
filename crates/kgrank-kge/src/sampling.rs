//! Negative sampling by uniform corruption.
//!
//! A negative for `(h, r, t)` under tail corruption is `(h, r, t')` with `t'`
//! drawn uniformly from `[0, n_entity)`; head and relation corruption work the
//! same way on the other slots.
//!
//! # Avoiding known triples
//!
//! A uniformly drawn `t'` may reproduce a true triple, which would then be
//! trained as a negative. With `avoid_known`, each slot is re-drawn while it
//! hits a completion listed in the [`PrefixIndex`], at most `max_retries`
//! times. If every draw collides the last one is kept: the sampler always
//! returns exactly `size` ids and never loops forever on dense prefixes.
//! Kept collisions are counted and logged as sampling-exhaustion warnings.

use kgrank_core::{CorruptionMode, PrefixIndex, Triple};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::sync::Arc;

use crate::config::DEFAULT_MAX_RETRIES;
use crate::error::{Error, Result};

/// Seed of worker `worker` derived from the stream's base seed.
pub fn worker_seed(seed: u64, worker: usize) -> u64 {
    seed ^ worker as u64
}

/// Uniform negative sampler with an exclusively owned generator.
///
/// Two samplers built with the same seed and worker index produce the same
/// candidates for the same sequence of calls.
#[derive(Debug, Clone)]
pub struct NegativeSampler {
    known: Arc<PrefixIndex>,
    n_entity: usize,
    n_relation: usize,
    rng: XorShiftRng,
    worker: usize,
    max_retries: usize,
    exhausted: u64,
}

impl NegativeSampler {
    /// Sampler for a single-worker setup.
    pub fn new(known: Arc<PrefixIndex>, n_entity: usize, n_relation: usize, seed: u64) -> Self {
        Self::for_worker(known, n_entity, n_relation, seed, 0)
    }

    /// Sampler owned by worker `worker`, seeded with `seed ^ worker`.
    pub fn for_worker(
        known: Arc<PrefixIndex>,
        n_entity: usize,
        n_relation: usize,
        seed: u64,
        worker: usize,
    ) -> Self {
        Self {
            known,
            n_entity,
            n_relation,
            rng: XorShiftRng::seed_from_u64(worker_seed(seed, worker)),
            worker,
            max_retries: DEFAULT_MAX_RETRIES,
            exhausted: 0,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Slots filled with a known completion after the retry bound was reached.
    pub fn exhaustion_count(&self) -> u64 {
        self.exhausted
    }

    fn range(&self, mode: CorruptionMode) -> usize {
        if mode.corrupts_relation() {
            self.n_relation
        } else {
            self.n_entity
        }
    }

    /// Draw `size` candidate ids for the `mode` slot of `positive`.
    pub fn sample(
        &mut self,
        positive: &Triple,
        mode: CorruptionMode,
        size: usize,
        avoid_known: bool,
    ) -> Result<Vec<u32>> {
        let range = self.range(mode);
        if range == 0 {
            return Err(Error::InvalidConfig(format!(
                "cannot draw {mode} candidates from an empty id range"
            )));
        }
        let range = u32::try_from(range)
            .map_err(|_| Error::InvalidConfig(format!("id range {range} exceeds u32")))?;

        let mut out = Vec::with_capacity(size);
        let mut exhausted_here = 0u64;
        for _ in 0..size {
            let mut id = self.rng.gen_range(0..range);
            if avoid_known {
                let mut retries = 0;
                while self.known.is_known_completion(positive, mode, id) {
                    if retries == self.max_retries {
                        exhausted_here += 1;
                        break;
                    }
                    id = self.rng.gen_range(0..range);
                    retries += 1;
                }
            }
            out.push(id);
        }

        if exhausted_here > 0 {
            self.exhausted += exhausted_here;
            tracing::warn!(
                worker = self.worker,
                %positive,
                %mode,
                kept = exhausted_here,
                max_retries = self.max_retries,
                "sampling exhaustion: kept negatives that reproduce known triples"
            );
        }
        Ok(out)
    }
}
