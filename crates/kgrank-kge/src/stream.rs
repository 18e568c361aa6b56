//! Unbounded training batch stream.
//!
//! A [`BatchStream`] multiplexes two sub-streams over the same training set,
//! one corrupting tails and one corrupting heads. Pulls strictly alternate:
//! odd pulls (1-indexed) yield a tail-batch, even pulls a head-batch.
//!
//! Each sub-stream walks an infinite concatenation of epochs. Epoch `e` is a
//! permutation of the training set seeded from the base seed, the mode and
//! `e` (the identity when shuffling is off). Batch `j` covers positions
//! `[j * batch_size, (j + 1) * batch_size)` of that sequence, so the end of
//! an epoch wraps into the next one and no batch is ever short.
//!
//! With `num_workers = W > 0`, batch `j` of a sub-stream is produced by
//! shard `j % W` on a background thread and the consumer reads the shards
//! round-robin. Positives are identical for any worker count; negatives
//! depend on the per-shard generator and are reproducible for a fixed seed
//! and worker count.

use kgrank_core::{CorruptionMode, Dataset, PrefixIndex, Triple, TripleIndex};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::sync::Arc;

use crate::config::StreamConfig;
use crate::error::Result;
use crate::prefetch::Prefetcher;
use crate::sampling::NegativeSampler;

/// One training batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Positive triples, `batch_size` of them.
    pub positives: Vec<Triple>,
    /// Candidate ids for the corrupted slot, one row per positive.
    pub negatives: Vec<Vec<u32>>,
    /// Subsampling weight of each positive.
    pub weights: Vec<f32>,
    pub mode: CorruptionMode,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.positives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positives.is_empty()
    }

    /// Negatives expanded into full triples, one row per positive.
    pub fn negative_triples(&self) -> Vec<Vec<Triple>> {
        self.positives
            .iter()
            .zip(&self.negatives)
            .map(|(positive, ids)| ids.iter().map(|&id| self.mode.replace(positive, id)).collect())
            .collect()
    }
}

/// Read-only data shared by every sub-stream and worker.
#[derive(Debug)]
struct TrainingData {
    triples: Arc<[Triple]>,
    weights: Arc<[f32]>,
    known: Arc<PrefixIndex>,
    n_entity: usize,
    n_relation: usize,
}

fn mode_salt(mode: CorruptionMode) -> u64 {
    match mode {
        CorruptionMode::HeadBatch => 1 << 56,
        CorruptionMode::TailBatch => 2 << 56,
        CorruptionMode::RelationBatch => 3 << 56,
    }
}

fn permutation_seed(seed: u64, mode: CorruptionMode, epoch: u64) -> u64 {
    seed ^ mode_salt(mode) ^ epoch.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// One shard of a single-mode sub-stream.
struct ModeStream {
    data: Arc<TrainingData>,
    mode: CorruptionMode,
    config: StreamConfig,
    sampler: NegativeSampler,
    /// Global index of the next batch this shard produces.
    next_batch: u64,
    stride: u64,
    order: Vec<usize>,
    order_epoch: Option<u64>,
}

impl ModeStream {
    fn new(
        data: Arc<TrainingData>,
        mode: CorruptionMode,
        config: &StreamConfig,
        worker: usize,
        shard: usize,
        shards: usize,
    ) -> Self {
        let sampler = NegativeSampler::for_worker(
            data.known.clone(),
            data.n_entity,
            data.n_relation,
            config.seed,
            worker,
        )
        .with_max_retries(config.max_retries);
        Self {
            data,
            mode,
            config: config.clone(),
            sampler,
            next_batch: shard as u64,
            stride: shards as u64,
            order: Vec::new(),
            order_epoch: None,
        }
    }

    fn ensure_epoch(&mut self, epoch: u64) {
        if self.order_epoch == Some(epoch) || (!self.config.shuffle && self.order_epoch.is_some()) {
            return;
        }
        self.order.clear();
        self.order.extend(0..self.data.triples.len());
        if self.config.shuffle {
            let seed = permutation_seed(self.config.seed, self.mode, epoch);
            self.order.shuffle(&mut XorShiftRng::seed_from_u64(seed));
        }
        self.order_epoch = Some(epoch);
    }

    fn produce(&mut self) -> Result<Batch> {
        let n = self.data.triples.len() as u64;
        let size = self.config.batch_size;
        let start = self.next_batch * size as u64;

        let mut positives = Vec::with_capacity(size);
        let mut weights = Vec::with_capacity(size);
        let mut negatives = Vec::with_capacity(size);
        for position in start..start + size as u64 {
            self.ensure_epoch(position / n);
            let index = self.order[(position % n) as usize];
            let positive = self.data.triples[index];
            negatives.push(self.sampler.sample(
                &positive,
                self.mode,
                self.config.negative_sample_size,
                self.config.avoid_known,
            )?);
            positives.push(positive);
            weights.push(self.data.weights[index]);
        }

        self.next_batch += self.stride;
        Ok(Batch {
            positives,
            negatives,
            weights,
            mode: self.mode,
        })
    }
}

enum Source {
    Inline(Box<ModeStream>),
    Workers {
        workers: Vec<Prefetcher<Batch>>,
        turn: usize,
    },
}

impl Source {
    fn spawn(
        data: &Arc<TrainingData>,
        mode: CorruptionMode,
        config: &StreamConfig,
        first_worker: usize,
    ) -> Result<Self> {
        if config.num_workers == 0 {
            return Ok(Self::Inline(Box::new(ModeStream::new(
                data.clone(),
                mode,
                config,
                first_worker,
                0,
                1,
            ))));
        }

        let shards = config.num_workers;
        let mut workers = Vec::with_capacity(shards);
        for shard in 0..shards {
            let worker = first_worker + shard;
            let mut stream = ModeStream::new(data.clone(), mode, config, worker, shard, shards);
            workers.push(Prefetcher::spawn(
                worker,
                mode,
                config.prefetch_capacity,
                move || stream.produce(),
            )?);
        }
        Ok(Self::Workers { workers, turn: 0 })
    }

    fn next(&mut self) -> Result<Batch> {
        match self {
            Self::Inline(stream) => stream.produce(),
            Self::Workers { workers, turn } => {
                let batch = workers[*turn].recv()?;
                *turn = (*turn + 1) % workers.len();
                Ok(batch)
            }
        }
    }
}

/// Alternating head/tail batch stream over a training set.
///
/// Dropping the stream stops and joins its prefetch workers.
///
/// # Example
///
/// ```rust
/// use kgrank_core::{triples, CorruptionMode, Dataset};
/// use kgrank_kge::{BatchStream, StreamConfig};
///
/// let train = triples(&[(0, 0, 1), (1, 0, 2), (2, 1, 0)]);
/// let dataset = Dataset::from_id_triples("toy", train, vec![], vec![])?;
/// let config = StreamConfig::default().with_batch_size(2).with_negative_sample_size(4);
/// let mut stream = BatchStream::from_dataset(&dataset, config)?;
///
/// let first = stream.next_batch()?;
/// assert_eq!(first.mode, CorruptionMode::TailBatch);
/// assert_eq!(first.len(), 2);
/// assert_eq!(stream.next_batch()?.mode, CorruptionMode::HeadBatch);
/// # Ok::<(), kgrank_kge::Error>(())
/// ```
pub struct BatchStream {
    tail: Source,
    head: Source,
    pulls: u64,
}

impl BatchStream {
    /// Stream over `train`, weighted by `index` and avoiding `known` triples.
    ///
    /// Tail shards use worker ids `0..W` and head shards `W..2W` (with
    /// `W = max(num_workers, 1)`), so no two generators share a seed.
    pub fn new(
        train: &[Triple],
        index: &TripleIndex,
        known: Arc<PrefixIndex>,
        config: StreamConfig,
    ) -> Result<Self> {
        config.validate()?;
        if train.is_empty() {
            return Err(kgrank_core::Error::EmptyTripleSet("training triples").into());
        }
        for triple in train {
            index.validate(triple)?;
        }
        let weights = index.subsampling_weights(train)?;

        let data = Arc::new(TrainingData {
            triples: train.into(),
            weights: weights.into(),
            known,
            n_entity: index.n_entity(),
            n_relation: index.n_relation(),
        });

        let shards = config.num_workers.max(1);
        let tail = Source::spawn(&data, CorruptionMode::TailBatch, &config, 0)?;
        let head = Source::spawn(&data, CorruptionMode::HeadBatch, &config, shards)?;

        tracing::debug!(
            triples = data.triples.len(),
            batch_size = config.batch_size,
            negative_sample_size = config.negative_sample_size,
            num_workers = config.num_workers,
            "built batch stream"
        );

        Ok(Self { tail, head, pulls: 0 })
    }

    /// Stream over a dataset's training split, avoiding train and excluded triples.
    pub fn from_dataset(dataset: &Dataset, config: StreamConfig) -> Result<Self> {
        let index = dataset.triple_index()?;
        let known = Arc::new(dataset.training_prefix_index());
        Self::new(dataset.train(), &index, known, config)
    }

    /// Batches pulled so far.
    pub fn pulls(&self) -> u64 {
        self.pulls
    }

    /// Mode of the batch the next pull returns.
    pub fn next_mode(&self) -> CorruptionMode {
        if self.pulls % 2 == 0 {
            CorruptionMode::TailBatch
        } else {
            CorruptionMode::HeadBatch
        }
    }

    /// Pull the next batch, blocking on its prefetch worker if needed.
    pub fn next_batch(&mut self) -> Result<Batch> {
        let batch = match self.next_mode() {
            CorruptionMode::TailBatch => self.tail.next()?,
            _ => self.head.next()?,
        };
        self.pulls += 1;
        Ok(batch)
    }
}

impl Iterator for BatchStream {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}

impl std::fmt::Debug for BatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchStream")
            .field("pulls", &self.pulls)
            .field("next_mode", &self.next_mode())
            .finish_non_exhaustive()
    }
}
