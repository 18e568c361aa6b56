//! `kgrank` is the triple sampling and filtered ranking layer for knowledge
//! graph embedding training.
//!
//! Design goal: keep model code out. Datasets and indices live in
//! [`core`], sampling, batch streams and evaluation in [`kge`]; any model
//! that can score candidate ids plugs in through [`ScoringModel`].
//!
//! ```rust
//! use kgrank::{triples, BatchStream, Dataset, Evaluator, StreamConfig};
//!
//! let dataset = Dataset::from_id_triples(
//!     "toy",
//!     triples(&[(0, 0, 1), (1, 0, 2), (2, 0, 0)]),
//!     vec![],
//!     triples(&[(0, 0, 2)]),
//! )?;
//! let config = StreamConfig::default().with_batch_size(2);
//! let mut stream = BatchStream::from_dataset(&dataset, config)?;
//! assert_eq!(stream.next_batch()?.len(), 2);
//!
//! let evaluator = Evaluator::for_dataset(&dataset);
//! assert_eq!(evaluator.known().len(), 4);
//! # Ok::<(), kgrank::Error>(())
//! ```

pub use kgrank_core as core;
pub use kgrank_kge as kge;

pub use kgrank_core::{
    triples, CorruptionMode, Dataset, EntityId, IdTable, LabelledTriple, NamedTriple, PrefixIndex,
    RelationId, Triple, TripleIndex,
};
pub use kgrank_kge::{
    Batch, BatchStream, EmbeddingModel, Error, EvalConfig, Evaluator, NegativeSampler, RankMetrics,
    Result, ScoringFunction, ScoringModel, StreamConfig,
};
