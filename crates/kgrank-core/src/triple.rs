//! Integer-encoded triples and corruption modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Dense entity identifier in `[0, n_entity)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

/// Dense relation identifier in `[0, n_relation)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(pub u32);

impl EntityId {
    /// Position of this entity in embedding tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl RelationId {
    /// Position of this relation in embedding tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<u32> for RelationId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A (head, relation, tail) fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    /// Head entity.
    pub head: EntityId,
    /// Relation.
    pub relation: RelationId,
    /// Tail entity.
    pub tail: EntityId,
}

impl Triple {
    /// Create a triple from raw ids.
    pub fn new(head: u32, relation: u32, tail: u32) -> Self {
        Self {
            head: EntityId(head),
            relation: RelationId(relation),
            tail: EntityId(tail),
        }
    }

    /// Raw `(head, relation, tail)` ids.
    pub fn as_tuple(&self) -> (u32, u32, u32) {
        (self.head.0, self.relation.0, self.tail.0)
    }

    /// Fails with [`Error::InvalidTriple`] unless every id lies inside the
    /// ranges `[0, n_entity)` and `[0, n_relation)`.
    pub fn check_range(&self, n_entity: usize, n_relation: usize) -> Result<()> {
        let in_range = self.head.index() < n_entity
            && self.tail.index() < n_entity
            && self.relation.index() < n_relation;
        if in_range {
            Ok(())
        } else {
            Err(Error::InvalidTriple {
                triple: *self,
                n_entity,
                n_relation,
            })
        }
    }
}

impl From<(u32, u32, u32)> for Triple {
    fn from((h, r, t): (u32, u32, u32)) -> Self {
        Self::new(h, r, t)
    }
}

/// Convert raw `(head, relation, tail)` tuples.
pub fn triples(raw: &[(u32, u32, u32)]) -> Vec<Triple> {
    raw.iter().copied().map(Triple::from).collect()
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.head.0, self.relation.0, self.tail.0)
    }
}

/// A fact spelled with labels, before id tables exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamedTriple {
    pub head: String,
    pub relation: String,
    pub tail: String,
}

impl NamedTriple {
    pub fn new(
        head: impl Into<String>,
        relation: impl Into<String>,
        tail: impl Into<String>,
    ) -> Self {
        Self {
            head: head.into(),
            relation: relation.into(),
            tail: tail.into(),
        }
    }
}

impl fmt::Display for NamedTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.head, self.relation, self.tail)
    }
}

/// A triple with a binary truth label, used for triple classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelledTriple {
    pub triple: Triple,
    /// Whether the triple holds.
    pub label: bool,
}

/// Which slot of a triple is replaced by candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorruptionMode {
    /// Replace the head: `(?, r, t)`.
    #[serde(rename = "head-batch")]
    HeadBatch,
    /// Replace the tail: `(h, r, ?)`.
    #[serde(rename = "tail-batch")]
    TailBatch,
    /// Replace the relation: `(h, ?, t)`.
    #[serde(rename = "relation-batch")]
    RelationBatch,
}

impl CorruptionMode {
    /// The two entity-corrupting modes, in evaluation order.
    pub const ENTITY_MODES: [CorruptionMode; 2] = [Self::HeadBatch, Self::TailBatch];

    /// Raw id currently occupying the corrupted slot.
    pub fn slot(self, triple: &Triple) -> u32 {
        match self {
            Self::HeadBatch => triple.head.0,
            Self::TailBatch => triple.tail.0,
            Self::RelationBatch => triple.relation.0,
        }
    }

    /// Copy of `triple` with the corrupted slot set to `id`.
    pub fn replace(self, triple: &Triple, id: u32) -> Triple {
        let mut out = *triple;
        match self {
            Self::HeadBatch => out.head = EntityId(id),
            Self::TailBatch => out.tail = EntityId(id),
            Self::RelationBatch => out.relation = RelationId(id),
        }
        out
    }

    /// Whether candidates are relation ids rather than entity ids.
    pub fn corrupts_relation(self) -> bool {
        matches!(self, Self::RelationBatch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeadBatch => "head-batch",
            Self::TailBatch => "tail-batch",
            Self::RelationBatch => "relation-batch",
        }
    }
}

impl fmt::Display for CorruptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorruptionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "head-batch" => Ok(Self::HeadBatch),
            "tail-batch" => Ok(Self::TailBatch),
            "relation-batch" => Ok(Self::RelationBatch),
            other => Err(Error::InvalidConfig(format!("unknown corruption mode: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_slot() {
        let t = Triple::new(0, 1, 2);
        assert_eq!(CorruptionMode::HeadBatch.replace(&t, 7), Triple::new(7, 1, 2));
        assert_eq!(CorruptionMode::TailBatch.replace(&t, 7), Triple::new(0, 1, 7));
        assert_eq!(CorruptionMode::RelationBatch.replace(&t, 7), Triple::new(0, 7, 2));
        assert_eq!(CorruptionMode::RelationBatch.slot(&t), 1);
    }

    #[test]
    fn test_mode_names() {
        for mode in [
            CorruptionMode::HeadBatch,
            CorruptionMode::TailBatch,
            CorruptionMode::RelationBatch,
        ] {
            assert_eq!(mode.as_str().parse::<CorruptionMode>().unwrap(), mode);
        }
        assert!("sideways".parse::<CorruptionMode>().is_err());

        let json = serde_json::to_string(&CorruptionMode::TailBatch).unwrap();
        assert_eq!(json, "\"tail-batch\"");
    }
}
