//! Triple Index: id ranges and training prefix frequencies.
//!
//! The frequencies drive the subsampling weight used during training
//! (Sun et al. 2019, "RotatE"):
//!
//! ```text
//! w(h, r, t) = 1 / sqrt(freq(h, r) + freq(r, t))
//! ```
//!
//! where each prefix count is smoothed by [`FREQUENCY_OFFSET`] so a prefix
//! seen once contributes 4 rather than 1.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::table::IdTable;
use crate::triple::{EntityId, RelationId, Triple};

/// Added to every observed prefix count before computing weights.
pub const FREQUENCY_OFFSET: u32 = 3;

/// Immutable index over the training triples.
#[derive(Debug, Clone, PartialEq)]
pub struct TripleIndex {
    n_entity: usize,
    n_relation: usize,
    num_triples: usize,
    head_relation: HashMap<(EntityId, RelationId), u32>,
    relation_tail: HashMap<(RelationId, EntityId), u32>,
}

impl TripleIndex {
    /// Build from training triples and the id tables that define the id ranges.
    pub fn build<I, T>(triples: I, entities: &IdTable, relations: &IdTable) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Triple>,
    {
        Self::with_counts(triples, entities.len(), relations.len())
    }

    /// Build when only the table sizes are known.
    pub fn with_counts<I, T>(triples: I, n_entity: usize, n_relation: usize) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Triple>,
    {
        let mut index = Self {
            n_entity,
            n_relation,
            num_triples: 0,
            head_relation: HashMap::new(),
            relation_tail: HashMap::new(),
        };

        for triple in triples {
            let triple = triple.into();
            index.validate(&triple)?;
            *index
                .head_relation
                .entry((triple.head, triple.relation))
                .or_insert(0) += 1;
            *index
                .relation_tail
                .entry((triple.relation, triple.tail))
                .or_insert(0) += 1;
            index.num_triples += 1;
        }

        if index.num_triples == 0 {
            return Err(Error::EmptyTripleSet("training triples"));
        }

        tracing::debug!(
            n_entity,
            n_relation,
            triples = index.num_triples,
            head_relation_prefixes = index.head_relation.len(),
            relation_tail_prefixes = index.relation_tail.len(),
            "built triple index"
        );

        Ok(index)
    }

    /// Check that every id of `triple` lies inside the declared ranges.
    pub fn validate(&self, triple: &Triple) -> Result<()> {
        triple.check_range(self.n_entity, self.n_relation)
    }

    pub fn n_entity(&self) -> usize {
        self.n_entity
    }

    pub fn n_relation(&self) -> usize {
        self.n_relation
    }

    /// Number of training triples counted (duplicates included).
    pub fn num_triples(&self) -> usize {
        self.num_triples
    }

    /// Raw occurrences of `(head, relation)` in training.
    pub fn head_relation_count(&self, head: EntityId, relation: RelationId) -> u32 {
        self.head_relation.get(&(head, relation)).copied().unwrap_or(0)
    }

    /// Raw occurrences of `(relation, tail)` in training.
    pub fn relation_tail_count(&self, relation: RelationId, tail: EntityId) -> u32 {
        self.relation_tail.get(&(relation, tail)).copied().unwrap_or(0)
    }

    /// Subsampling weight of a training triple.
    ///
    /// Fails with [`Error::MissingFrequency`] if either prefix never occurred
    /// in training: a weight is only defined for the frozen training set.
    pub fn subsampling_weight(&self, triple: &Triple) -> Result<f32> {
        let hr = self
            .head_relation
            .get(&(triple.head, triple.relation))
            .ok_or(Error::MissingFrequency(*triple))?;
        let rt = self
            .relation_tail
            .get(&(triple.relation, triple.tail))
            .ok_or(Error::MissingFrequency(*triple))?;
        let freq = (hr + FREQUENCY_OFFSET) + (rt + FREQUENCY_OFFSET);
        Ok(1.0 / (freq as f32).sqrt())
    }

    /// Weights for a whole triple set, aligned with its order.
    pub fn subsampling_weights(&self, triples: &[Triple]) -> Result<Vec<f32>> {
        triples.iter().map(|t| self.subsampling_weight(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::triples;

    fn tables(n_entity: usize, n_relation: usize) -> (IdTable, IdTable) {
        (
            IdTable::from_labels((0..n_entity).map(|i| format!("e{i}"))),
            IdTable::from_labels((0..n_relation).map(|i| format!("r{i}"))),
        )
    }

    #[test]
    fn test_counts_come_from_tables() {
        let (e, r) = tables(10, 4);
        let index = TripleIndex::build(triples(&[(0, 0, 1)]), &e, &r).unwrap();
        // Entities 2..10 never occur but stay addressable.
        assert_eq!(index.n_entity(), 10);
        assert_eq!(index.n_relation(), 4);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let (e, r) = tables(3, 1);
        let err = TripleIndex::build(triples(&[(0, 0, 1), (0, 0, 3)]), &e, &r).unwrap_err();
        assert!(matches!(err, Error::InvalidTriple { n_entity: 3, .. }));

        let err = TripleIndex::build(triples(&[(0, 1, 1)]), &e, &r).unwrap_err();
        assert!(matches!(err, Error::InvalidTriple { n_relation: 1, .. }));
    }

    #[test]
    fn test_empty_training_set() {
        let (e, r) = tables(3, 1);
        let err = TripleIndex::build(Vec::<Triple>::new(), &e, &r).unwrap_err();
        assert!(matches!(err, Error::EmptyTripleSet(_)));
    }

    #[test]
    fn test_subsampling_weight_single_occurrence() {
        let index = TripleIndex::with_counts(triples(&[(1, 1, 2), (2, 2, 3)]), 5, 3).unwrap();
        let w = index.subsampling_weight(&Triple::new(1, 1, 2)).unwrap();
        // Each prefix seen once: (1 + 3) + (1 + 3) = 8.
        assert!((w - 1.0 / 8f32.sqrt()).abs() < 1e-6);
        assert!((w - 0.3536).abs() < 1e-4);
    }

    #[test]
    fn test_subsampling_weight_shared_prefix() {
        let index =
            TripleIndex::with_counts(triples(&[(0, 0, 1), (0, 0, 2), (3, 0, 2)]), 4, 1).unwrap();
        assert_eq!(index.head_relation_count(EntityId(0), RelationId(0)), 2);
        assert_eq!(index.relation_tail_count(RelationId(0), EntityId(2)), 2);
        let w = index.subsampling_weight(&Triple::new(0, 0, 2)).unwrap();
        assert!((w - 1.0 / 10f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_weight_for_unseen_prefix_fails() {
        let index = TripleIndex::with_counts(triples(&[(0, 0, 1)]), 4, 2).unwrap();
        assert!(matches!(
            index.subsampling_weight(&Triple::new(2, 1, 3)),
            Err(Error::MissingFrequency(_))
        ));
    }
}
