//! Prefix Index: which completions of a partial triple are known to be true.
//!
//! Filtered ranking (Bordes et al. 2013) must not penalise a model for
//! ranking *another* true answer above the test answer. For a test triple
//! `(h, r, t)` under tail corruption, every `t'` with `(h, r, t')` in the
//! true set is filtered; likewise for heads and relations.

use std::collections::{HashMap, HashSet};

use crate::triple::{CorruptionMode, EntityId, RelationId, Triple};

/// Read-only prefix -> completions mappings over a set of true triples.
///
/// Built once; there are no mutating accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixIndex {
    tails: HashMap<(EntityId, RelationId), HashSet<EntityId>>,
    heads: HashMap<(RelationId, EntityId), HashSet<EntityId>>,
    relations: HashMap<(EntityId, EntityId), HashSet<RelationId>>,
    len: usize,
}

impl PrefixIndex {
    /// Index with no true triples: evaluation against it yields raw metrics.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from any superset of true triples (duplicates are ignored).
    pub fn build<'a, I>(triples: I) -> Self
    where
        I: IntoIterator<Item = &'a Triple>,
    {
        let mut index = Self::default();
        for t in triples {
            let fresh = index
                .tails
                .entry((t.head, t.relation))
                .or_default()
                .insert(t.tail);
            index
                .heads
                .entry((t.relation, t.tail))
                .or_default()
                .insert(t.head);
            index
                .relations
                .entry((t.head, t.tail))
                .or_default()
                .insert(t.relation);
            if fresh {
                index.len += 1;
            }
        }
        tracing::debug!(
            distinct_triples = index.len,
            head_relation_prefixes = index.tails.len(),
            relation_tail_prefixes = index.heads.len(),
            "built prefix index"
        );
        index
    }

    /// Number of distinct true triples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `triple` is in the true set.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.tails
            .get(&(triple.head, triple.relation))
            .is_some_and(|tails| tails.contains(&triple.tail))
    }

    /// True tails of `(head, relation, ?)`.
    pub fn true_tails(&self, head: EntityId, relation: RelationId) -> Option<&HashSet<EntityId>> {
        self.tails.get(&(head, relation))
    }

    /// True heads of `(?, relation, tail)`.
    pub fn true_heads(&self, relation: RelationId, tail: EntityId) -> Option<&HashSet<EntityId>> {
        self.heads.get(&(relation, tail))
    }

    /// True relations of `(head, ?, tail)`.
    pub fn true_relations(&self, head: EntityId, tail: EntityId) -> Option<&HashSet<RelationId>> {
        self.relations.get(&(head, tail))
    }

    /// Whether replacing the `mode` slot of `triple` with `id` gives a true triple.
    pub fn is_known_completion(&self, triple: &Triple, mode: CorruptionMode, id: u32) -> bool {
        match mode {
            CorruptionMode::HeadBatch => self
                .true_heads(triple.relation, triple.tail)
                .is_some_and(|s| s.contains(&EntityId(id))),
            CorruptionMode::TailBatch => self
                .true_tails(triple.head, triple.relation)
                .is_some_and(|s| s.contains(&EntityId(id))),
            CorruptionMode::RelationBatch => self
                .true_relations(triple.head, triple.tail)
                .is_some_and(|s| s.contains(&RelationId(id))),
        }
    }

    /// Raw ids of every known completion of the fixed part of `triple`.
    pub fn known_completions(&self, triple: &Triple, mode: CorruptionMode) -> Vec<u32> {
        match mode {
            CorruptionMode::HeadBatch => self
                .true_heads(triple.relation, triple.tail)
                .map(|s| s.iter().map(|e| e.0).collect())
                .unwrap_or_default(),
            CorruptionMode::TailBatch => self
                .true_tails(triple.head, triple.relation)
                .map(|s| s.iter().map(|e| e.0).collect())
                .unwrap_or_default(),
            CorruptionMode::RelationBatch => self
                .true_relations(triple.head, triple.tail)
                .map(|s| s.iter().map(|r| r.0).collect())
                .unwrap_or_default(),
        }
    }
}

impl<'a> FromIterator<&'a Triple> for PrefixIndex {
    fn from_iter<I: IntoIterator<Item = &'a Triple>>(iter: I) -> Self {
        Self::build(iter)
    }
}
