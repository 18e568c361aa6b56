// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

//! Training-side sampling and filtered evaluation for knowledge graph embeddings.
//!
//! ## Training: corrupted batches
//!
//! A KGE model learns by contrasting true triples with corrupted ones. For
//! `(h, r, t)` a *tail-batch* replaces `t` with random entities and a
//! *head-batch* replaces `h`:
//!
//! ```text
//!   (paris, capital_of, france)   positive
//!   (paris, capital_of, ?)  <- {japan, peru, ...}   tail-batch negatives
//!   (?, capital_of, france) <- {rome, lima, ...}    head-batch negatives
//! ```
//!
//! [`BatchStream`] yields these batches forever, strictly alternating
//! tail and head corruption, with each positive carrying its subsampling
//! weight `1 / sqrt(freq(h, r) + freq(r, t))` so that frequent prefixes do
//! not dominate the loss.
//!
//! ## Evaluation: filtered ranking
//!
//! [`Evaluator`] ranks the true answer of every test triple against all
//! entities (or all relations), ignoring candidates that complete the triple
//! into *another* known fact:
//!
//! | Metric | Range | Description |
//! |--------|-------|-------------|
//! | MRR | (0, 1] | Mean Reciprocal Rank: average of 1/rank |
//! | MR | [1, n] | Mean Rank |
//! | Hits@k | [0, 1] | Fraction with rank <= k, k in {1, 3, 10} |
//!
//! Models plug in through [`ScoringModel`]; [`EmbeddingModel`] is a
//! reference implementation over TransE, DistMult, ComplEx and RotatE.
//!
//! ## Usage
//!
//! ```rust
//! use kgrank_core::{triples, Dataset};
//! use kgrank_kge::{BatchStream, EmbeddingModel, Evaluator, ScoringFunction, StreamConfig};
//!
//! let train = triples(&[(0, 0, 1), (1, 0, 2), (2, 0, 3), (3, 1, 0)]);
//! let dataset = Dataset::from_id_triples("ring", train, vec![], triples(&[(0, 1, 2)]))?;
//!
//! let config = StreamConfig::default().with_batch_size(2).with_negative_sample_size(8);
//! let mut stream = BatchStream::from_dataset(&dataset, config)?;
//! let batch = stream.next_batch()?;
//! assert_eq!(batch.negatives[0].len(), 8);
//!
//! let model = EmbeddingModel::new(ScoringFunction::TransE, 4, 2, 16, 12.0, 42)?;
//! let metrics = Evaluator::for_dataset(&dataset).evaluate(&model, dataset.test())?;
//! assert_eq!(metrics.num_triples, 2);
//! # Ok::<(), kgrank_kge::Error>(())
//! ```
//!
//! ## References
//!
//! - Bordes et al. (2013). "Translating Embeddings for Modeling
//!   Multi-relational Data." NIPS.
//! - Sun et al. (2019). "RotatE: Knowledge Graph Embedding by
//!   Relational Rotation in Complex Space." ICLR.

pub mod classification;
mod config;
mod error;
pub mod evaluation;
mod prefetch;
mod sampling;
mod scoring;
mod stream;

pub use classification::{accuracy, find_threshold, Threshold};
pub use config::{EvalConfig, StreamConfig, DEFAULT_MAX_RETRIES, MAX_DECIMALS};
pub use error::{Error, Result};
pub use evaluation::{rank_of, Evaluator, RankMetrics, FILTER_BIAS, RELATION_SUFFIX};
pub use sampling::{worker_seed, NegativeSampler};
pub use scoring::{EmbeddingModel, ScoringFunction, ScoringModel};
pub use stream::{Batch, BatchStream};
