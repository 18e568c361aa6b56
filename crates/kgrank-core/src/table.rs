//! Bidirectional name <-> id tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Dense `name <-> id` mapping for entities or relations.
///
/// Ids always cover `[0, len)` exactly once, so the table length is the
/// number of addressable items even when some never occur in a triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, u32>", into = "HashMap<String, u32>")]
pub struct IdTable {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl IdTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an explicit `name -> id` map.
    ///
    /// Fails unless the ids are exactly `0..map.len()`.
    pub fn from_map(map: HashMap<String, u32>) -> Result<Self> {
        let mut names: Vec<Option<String>> = vec![None; map.len()];
        for (name, &id) in &map {
            let slot = names.get_mut(id as usize).ok_or_else(|| {
                Error::MalformedTable(format!(
                    "id {id} for '{name}' is outside [0, {})",
                    map.len()
                ))
            })?;
            if let Some(previous) = slot.replace(name.clone()) {
                return Err(Error::MalformedTable(format!(
                    "id {id} assigned to both '{previous}' and '{name}'"
                )));
            }
        }
        // Map length equals the slot count, so a missing slot implies a duplicate above.
        let names = names.into_iter().flatten().collect();
        Ok(Self { names, ids: map })
    }

    /// Assign ids in first-seen order, skipping repeats.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for label in labels {
            table.get_or_insert(label);
        }
        table
    }

    /// Id of `name`, inserting it at the end if absent.
    pub fn get_or_insert(&mut self, name: impl Into<String>) -> u32 {
        let name = name.into();
        if let Some(&id) = self.ids.get(&name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.ids.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Id of `name`, or `UnknownLabel`.
    pub fn require(&self, name: &str) -> Result<u32> {
        self.id(name)
            .ok_or_else(|| Error::UnknownLabel(name.to_string()))
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(id, name)` pairs ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u32, n.as_str()))
    }

    /// Give `id` a new name, keeping the id stable.
    pub(crate) fn rename(&mut self, id: u32, new_name: String) -> Result<()> {
        let slot = self
            .names
            .get_mut(id as usize)
            .ok_or_else(|| Error::MalformedTable(format!("no entry with id {id}")))?;
        if self.ids.contains_key(&new_name) {
            return Err(Error::MalformedTable(format!(
                "name '{new_name}' already present"
            )));
        }
        let old = std::mem::replace(slot, new_name.clone());
        self.ids.remove(&old);
        self.ids.insert(new_name, id);
        Ok(())
    }
}

impl TryFrom<HashMap<String, u32>> for IdTable {
    type Error = Error;

    fn try_from(map: HashMap<String, u32>) -> Result<Self> {
        Self::from_map(map)
    }
}

impl From<IdTable> for HashMap<String, u32> {
    fn from(table: IdTable) -> Self {
        table.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_from_map_dense() {
        let table = IdTable::from_map(map(&[("e1", 1), ("e0", 0), ("e2", 2)])).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.id("e2"), Some(2));
        assert_eq!(table.name(0), Some("e0"));
        let order: Vec<_> = table.iter().map(|(_, n)| n).collect();
        assert_eq!(order, vec!["e0", "e1", "e2"]);
    }

    #[test]
    fn test_from_map_rejects_gaps_and_duplicates() {
        assert!(matches!(
            IdTable::from_map(map(&[("a", 0), ("b", 2)])),
            Err(Error::MalformedTable(_))
        ));
        assert!(matches!(
            IdTable::from_map(map(&[("a", 0), ("b", 0)])),
            Err(Error::MalformedTable(_))
        ));
    }

    #[test]
    fn test_from_labels_first_seen() {
        let table = IdTable::from_labels(["x", "y", "x", "z"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.id("z"), Some(2));
        assert!(matches!(table.require("w"), Err(Error::UnknownLabel(_))));
    }

    #[test]
    fn test_rename_keeps_id() {
        let mut table = IdTable::from_labels(["a", "b"]);
        table.rename(1, "b_0_2".into()).unwrap();
        assert_eq!(table.id("b_0_2"), Some(1));
        assert_eq!(table.id("b"), None);
        assert!(table.rename(0, "b_0_2".into()).is_err());
    }

    #[test]
    fn test_json_roundtrip_validates() {
        let table: IdTable = serde_json::from_str(r#"{"r0": 0, "r1": 1}"#).unwrap();
        assert_eq!(table.len(), 2);
        let bad: std::result::Result<IdTable, _> = serde_json::from_str(r#"{"r0": 3}"#);
        assert!(bad.is_err());
    }
}
