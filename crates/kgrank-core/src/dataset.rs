//! Datasets: train/valid/test splits plus the id tables that define them.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};
use crate::formats::{csv, json};
use crate::index::TripleIndex;
use crate::prefix::PrefixIndex;
use crate::table::IdTable;
use crate::triple::{LabelledTriple, NamedTriple, Triple};

/// A knowledge graph split into training, validation and test triples.
///
/// `excluded` holds training triples set aside by [`Dataset::partition`]:
/// they are not trained on, but still count as true when filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    train: Vec<Triple>,
    valid: Vec<Triple>,
    test: Vec<Triple>,
    excluded: Vec<Triple>,
    entities: IdTable,
    relations: IdTable,
    classification_valid: Vec<LabelledTriple>,
    classification_test: Vec<LabelledTriple>,
}

impl Dataset {
    /// Create a dataset from its training split.
    pub fn new(
        name: impl Into<String>,
        train: Vec<Triple>,
        entities: IdTable,
        relations: IdTable,
    ) -> Result<Self> {
        let dataset = Self {
            name: name.into(),
            train: Vec::new(),
            valid: Vec::new(),
            test: Vec::new(),
            excluded: Vec::new(),
            entities,
            relations,
            classification_valid: Vec::new(),
            classification_test: Vec::new(),
        };
        dataset.check_all(&train)?;
        Ok(Self { train, ..dataset })
    }

    /// Create a dataset from raw ids, naming each item after its id.
    ///
    /// Table sizes are `max id + 1` over all three splits.
    pub fn from_id_triples(
        name: impl Into<String>,
        train: Vec<Triple>,
        valid: Vec<Triple>,
        test: Vec<Triple>,
    ) -> Result<Self> {
        let all = || train.iter().chain(&valid).chain(&test);
        let n_entity = all()
            .map(|t| t.head.0.max(t.tail.0) as usize + 1)
            .max()
            .unwrap_or(0);
        let n_relation = all().map(|t| t.relation.index() + 1).max().unwrap_or(0);
        let entities = IdTable::from_labels((0..n_entity).map(|i| i.to_string()));
        let relations = IdTable::from_labels((0..n_relation).map(|i| i.to_string()));
        Self::new(name, train, entities, relations)?
            .with_valid(valid)?
            .with_test(test)
    }

    /// Create a dataset from labelled facts, such as those of
    /// [`csv::read_table_triples`].
    ///
    /// Entities and relations get ids in first-seen order.
    pub fn from_named_triples(name: impl Into<String>, train: &[NamedTriple]) -> Result<Self> {
        let mut entities = IdTable::new();
        let mut relations = IdTable::new();
        let encoded = train
            .iter()
            .map(|t| {
                let head = entities.get_or_insert(t.head.as_str());
                let relation = relations.get_or_insert(t.relation.as_str());
                let tail = entities.get_or_insert(t.tail.as_str());
                Triple::new(head, relation, tail)
            })
            .collect();
        Self::new(name, encoded, entities, relations)
    }

    /// Load `train.csv`, `valid.csv`, `test.csv`, `entities.json` and
    /// `relations.json` from `dir`, plus `classification_valid.csv` and
    /// `classification_test.csv` when present.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let open = |file: &str| -> Result<BufReader<File>> {
            Ok(BufReader::new(File::open(dir.join(file))?))
        };

        let entities = json::read_id_table(open("entities.json")?)?;
        let relations = json::read_id_table(open("relations.json")?)?;
        let train = csv::read_triples(open("train.csv")?, &entities, &relations)?;
        let valid = csv::read_triples(open("valid.csv")?, &entities, &relations)?;
        let test = csv::read_triples(open("test.csv")?, &entities, &relations)?;

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());

        let mut dataset = Self::new(name, train, entities, relations)?
            .with_valid(valid)?
            .with_test(test)?;

        let classification = |file: &str| -> Result<Vec<LabelledTriple>> {
            if dir.join(file).exists() {
                csv::read_labelled_triples(open(file)?, &dataset.entities, &dataset.relations)
            } else {
                Ok(Vec::new())
            }
        };
        let cv = classification("classification_valid.csv")?;
        let ct = classification("classification_test.csv")?;
        dataset.classification_valid = cv;
        dataset.classification_test = ct;

        tracing::debug!(dataset = %dataset.name, dir = %dir.display(), "loaded dataset");
        Ok(dataset)
    }

    pub fn with_valid(mut self, valid: Vec<Triple>) -> Result<Self> {
        self.check_all(&valid)?;
        self.valid = valid;
        Ok(self)
    }

    pub fn with_test(mut self, test: Vec<Triple>) -> Result<Self> {
        self.check_all(&test)?;
        self.test = test;
        Ok(self)
    }

    /// Attach labelled triples for threshold-based triple classification.
    pub fn with_classification(
        mut self,
        valid: Vec<LabelledTriple>,
        test: Vec<LabelledTriple>,
    ) -> Result<Self> {
        for sample in valid.iter().chain(&test) {
            self.check(&sample.triple)?;
        }
        self.classification_valid = valid;
        self.classification_test = test;
        Ok(self)
    }

    fn check(&self, triple: &Triple) -> Result<()> {
        triple.check_range(self.n_entity(), self.n_relation())
    }

    fn check_all(&self, triples: &[Triple]) -> Result<()> {
        triples.iter().try_for_each(|t| self.check(t))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn train(&self) -> &[Triple] {
        &self.train
    }

    pub fn valid(&self) -> &[Triple] {
        &self.valid
    }

    pub fn test(&self) -> &[Triple] {
        &self.test
    }

    pub fn excluded(&self) -> &[Triple] {
        &self.excluded
    }

    pub fn entities(&self) -> &IdTable {
        &self.entities
    }

    pub fn relations(&self) -> &IdTable {
        &self.relations
    }

    pub fn classification_valid(&self) -> &[LabelledTriple] {
        &self.classification_valid
    }

    pub fn classification_test(&self) -> &[LabelledTriple] {
        &self.classification_test
    }

    pub fn n_entity(&self) -> usize {
        self.entities.len()
    }

    pub fn n_relation(&self) -> usize {
        self.relations.len()
    }

    /// Training plus excluded triples: what negative sampling must avoid.
    pub fn train_triples(&self) -> impl Iterator<Item = &Triple> {
        self.train.iter().chain(&self.excluded)
    }

    /// Every triple known to hold: what filtered evaluation must ignore.
    pub fn true_triples(&self) -> impl Iterator<Item = &Triple> {
        self.train_triples().chain(&self.valid).chain(&self.test)
    }

    /// Frequency index over the (possibly partitioned) training split.
    pub fn triple_index(&self) -> Result<TripleIndex> {
        TripleIndex::build(self.train.iter().copied(), &self.entities, &self.relations)
    }

    /// Prefix index for collision avoidance during sampling.
    pub fn training_prefix_index(&self) -> PrefixIndex {
        PrefixIndex::build(self.train_triples())
    }

    /// Prefix index for filtered evaluation.
    pub fn true_prefix_index(&self) -> PrefixIndex {
        PrefixIndex::build(self.true_triples())
    }

    /// Keep only some parts of a seeded split of the training set.
    ///
    /// The training triples are shuffled with `seed` and cut into `n_part`
    /// contiguous parts, the first `len % n_part` of them one triple longer.
    /// Parts listed in `id_set` remain training data; the others move to
    /// [`Dataset::excluded`]. A fraction `1 - aligned_entities` of entities is
    /// renamed so that partitions of the same graph only share the rest.
    pub fn partition(
        &self,
        n_part: usize,
        id_set: &[usize],
        aligned_entities: f64,
        seed: u64,
    ) -> Result<Self> {
        if n_part == 0 {
            return Err(Error::InvalidConfig("n_part must be at least 1".into()));
        }
        if id_set.is_empty() {
            return Err(Error::InvalidConfig("id_set must select at least one part".into()));
        }
        if let Some(bad) = id_set.iter().find(|&&i| i >= n_part) {
            return Err(Error::InvalidConfig(format!(
                "part {bad} does not exist in a {n_part}-way split"
            )));
        }
        if !(0.0..=1.0).contains(&aligned_entities) {
            return Err(Error::InvalidConfig(format!(
                "aligned_entities must be in [0, 1], got {aligned_entities}"
            )));
        }

        let mut shuffled = self.train.clone();
        shuffled.shuffle(&mut XorShiftRng::seed_from_u64(seed));

        let base = shuffled.len() / n_part;
        let extra = shuffled.len() % n_part;
        let mut train = Vec::new();
        let mut excluded = self.excluded.clone();
        let mut start = 0;
        for part in 0..n_part {
            let end = start + base + usize::from(part < extra);
            let frame = &shuffled[start..end];
            if id_set.contains(&part) {
                train.extend_from_slice(frame);
            } else {
                excluded.extend_from_slice(frame);
            }
            start = end;
        }

        let mut entities = self.entities.clone();
        let n_corrupt = (entities.len() as f64 * (1.0 - aligned_entities)).round() as usize;
        let mut rng = XorShiftRng::seed_from_u64(seed);
        let suffix = format!("{id_set:?}_{n_part}");
        for id in rand::seq::index::sample(&mut rng, entities.len(), n_corrupt).into_iter() {
            let id = id as u32;
            let name = entities
                .name(id)
                .ok_or_else(|| Error::MalformedTable(format!("no entity with id {id}")))?;
            let renamed = format!("{name}_{suffix}");
            entities.rename(id, renamed)?;
        }

        let name = format!(
            "{}_{}_{}",
            self.name,
            suffix,
            (aligned_entities * 100.0).round() as u32
        );
        tracing::debug!(
            dataset = %name,
            train = train.len(),
            excluded = excluded.len(),
            renamed_entities = n_corrupt,
            "partitioned dataset"
        );

        Ok(Self {
            name,
            train,
            excluded,
            entities,
            ..self.clone()
        })
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} dataset", self.name)?;
        let mut rows = vec![
            ("Entities", self.n_entity()),
            ("Relations", self.n_relation()),
            ("Train triples", self.train.len()),
            ("Validation triples", self.valid.len()),
            ("Test triples", self.test.len()),
        ];
        if !self.excluded.is_empty() {
            rows.push(("Excluded triples", self.excluded.len()));
        }
        for (label, value) in rows {
            writeln!(f, "    {label:<20}{value:>8}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::triples;
    use std::collections::HashSet;

    fn toy() -> Dataset {
        let entities = IdTable::from_labels(["e0", "e1", "e2", "e3"]);
        let relations = IdTable::from_labels(["r0", "r1"]);
        Dataset::new(
            "toy",
            triples(&[(0, 0, 1), (0, 1, 1), (2, 0, 3), (2, 1, 3)]),
            entities,
            relations,
        )
        .unwrap()
        .with_valid(triples(&[(0, 0, 1), (2, 1, 3)]))
        .unwrap()
        .with_test(triples(&[(0, 0, 1), (2, 1, 3)]))
        .unwrap()
    }

    #[test]
    fn test_validation_on_every_split() {
        let err = toy().with_test(triples(&[(0, 2, 1)])).unwrap_err();
        assert!(matches!(err, Error::InvalidTriple { .. }));
    }

    #[test]
    fn test_from_id_triples_sizes() {
        let d = Dataset::from_id_triples(
            "ids",
            triples(&[(1, 1, 2), (2, 2, 3)]),
            vec![],
            triples(&[(1, 2, 2), (4, 3, 5)]),
        )
        .unwrap();
        assert_eq!(d.n_entity(), 6);
        assert_eq!(d.n_relation(), 4);
    }

    #[test]
    fn test_true_triples_cover_all_splits() {
        let d = toy();
        assert_eq!(d.true_triples().count(), 8);
        let index = d.true_prefix_index();
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_partition_keeps_excluded_true() {
        let d = toy();
        let p = d.partition(2, &[0], 1.0, 42).unwrap();
        assert_eq!(p.train().len(), 2);
        assert_eq!(p.excluded().len(), 2);

        let before: HashSet<_> = d.train().iter().collect();
        let after: HashSet<_> = p.train_triples().collect();
        assert_eq!(before, after);
        assert_eq!(p.true_prefix_index(), d.true_prefix_index());
        assert_eq!(p.name(), "toy_[0]_2_100");
    }

    #[test]
    fn test_partition_uneven_parts() {
        let train = triples(&[(0, 0, 1), (1, 0, 2), (2, 0, 3), (3, 0, 0), (0, 0, 2)]);
        let d = Dataset::from_id_triples("five", train, vec![], vec![]).unwrap();
        // 5 triples in 3 parts: sizes 2, 2, 1.
        assert_eq!(d.partition(3, &[0], 1.0, 7).unwrap().train().len(), 2);
        assert_eq!(d.partition(3, &[2], 1.0, 7).unwrap().train().len(), 1);
        assert_eq!(d.partition(3, &[1, 2], 1.0, 7).unwrap().train().len(), 3);
    }

    #[test]
    fn test_partition_is_seeded() {
        let d = toy();
        assert_eq!(d.partition(2, &[1], 1.0, 3).unwrap(), d.partition(2, &[1], 1.0, 3).unwrap());
    }

    #[test]
    fn test_partition_renames_unaligned_entities() {
        let d = toy();
        let p = d.partition(2, &[0, 1], 0.5, 42).unwrap();
        let renamed = p
            .entities()
            .iter()
            .filter(|(_, name)| name.ends_with("_[0, 1]_2"))
            .count();
        assert_eq!(renamed, 2);
        assert_eq!(p.n_entity(), d.n_entity());
        assert_eq!(p.name(), "toy_[0, 1]_2_50");
    }

    #[test]
    fn test_partition_rejects_bad_arguments() {
        let d = toy();
        assert!(d.partition(0, &[0], 1.0, 1).is_err());
        assert!(d.partition(2, &[], 1.0, 1).is_err());
        assert!(d.partition(2, &[2], 1.0, 1).is_err());
        assert!(d.partition(2, &[0], 1.5, 1).is_err());
    }

    #[test]
    fn test_from_named_triples() {
        let facts = [
            NamedTriple::new("user_1", "user_bank", "bank_QIWI"),
            NamedTriple::new("user_2", "user_bank", "bank_QIWI"),
            NamedTriple::new("bank_QIWI", "bank_country", "country_Russia"),
        ];
        let dataset = Dataset::from_named_triples("banks", &facts).unwrap();
        assert_eq!(dataset.n_entity(), 4);
        assert_eq!(dataset.n_relation(), 2);
        assert_eq!(dataset.train(), triples(&[(0, 0, 1), (2, 0, 1), (1, 1, 3)]).as_slice());
        assert_eq!(dataset.entities().name(3), Some("country_Russia"));
    }

    #[test]
    fn test_display_summary() {
        let text = toy().to_string();
        assert!(text.starts_with("toy dataset\n"));
        assert!(text.contains("Entities"));
        assert!(text.contains("Validation triples"));
        assert!(!text.contains("Excluded"));
    }
}
