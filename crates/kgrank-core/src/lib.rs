// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

//! Core types for knowledge graph embedding datasets.
//!
//! Everything downstream (negative sampling, batch streams, filtered
//! evaluation) works on dense integer ids, built once per dataset and then
//! shared read-only:
//!
//! - [`Triple`] - an integer `(head, relation, tail)` fact
//! - [`IdTable`] - `name <-> id` tables defining `n_entity` and `n_relation`
//! - [`TripleIndex`] - id validation and training prefix frequencies
//! - [`PrefixIndex`] - known completions of `(h, r, ?)`, `(?, r, t)`, `(h, ?, t)`
//! - [`Dataset`] - train/valid/test splits, partitioning, file loading
//!
//! # Example
//!
//! ```rust
//! use kgrank_core::{triples, Dataset, IdTable};
//!
//! let entities = IdTable::from_labels(["paris", "france", "rome", "italy"]);
//! let relations = IdTable::from_labels(["capital_of"]);
//! let dataset = Dataset::new("capitals", triples(&[(0, 0, 1), (2, 0, 3)]), entities, relations)?;
//!
//! let index = dataset.triple_index()?;
//! assert_eq!(index.n_entity(), 4);
//!
//! let known = dataset.true_prefix_index();
//! assert!(known.contains(&dataset.train()[0]));
//! # Ok::<(), kgrank_core::Error>(())
//! ```

mod dataset;
mod error;
pub mod formats;
mod index;
mod prefix;
mod table;
mod triple;

pub use dataset::Dataset;
pub use error::{Error, Result};
pub use index::{TripleIndex, FREQUENCY_OFFSET};
pub use prefix::PrefixIndex;
pub use table::IdTable;
pub use triple::{
    triples, CorruptionMode, EntityId, LabelledTriple, NamedTriple, RelationId, Triple,
};
