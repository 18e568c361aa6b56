//! Loading datasets from a directory of CSV and JSON files.

use std::fs;

use kgrank_core::{formats, Dataset, Error, IdTable, Triple};

fn write_nations_like(dir: &std::path::Path) {
    fs::write(
        dir.join("entities.json"),
        r#"{"usa": 0, "uk": 1, "china": 2, "india": 3}"#,
    )
    .unwrap();
    fs::write(dir.join("relations.json"), r#"{"allied_with": 0, "trades_with": 1}"#).unwrap();
    fs::write(
        dir.join("train.csv"),
        "usa,allied_with,uk\nuk,allied_with,usa\nchina,trades_with,india\n",
    )
    .unwrap();
    fs::write(dir.join("valid.csv"), "usa,trades_with,china\n").unwrap();
    fs::write(dir.join("test.csv"), "india,trades_with,china\n").unwrap();
}

#[test]
fn test_load_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_nations_like(dir.path());

    let dataset = Dataset::from_dir(dir.path()).unwrap();
    assert_eq!(dataset.n_entity(), 4);
    assert_eq!(dataset.n_relation(), 2);
    assert_eq!(dataset.train().len(), 3);
    assert_eq!(dataset.valid(), &[Triple::new(0, 1, 2)]);
    assert_eq!(dataset.test(), &[Triple::new(3, 1, 2)]);
    assert!(dataset.classification_valid().is_empty());

    let index = dataset.triple_index().unwrap();
    assert_eq!(index.num_triples(), 3);
}

#[test]
fn test_load_classification_files() {
    let dir = tempfile::tempdir().unwrap();
    write_nations_like(dir.path());
    fs::write(
        dir.path().join("classification_valid.csv"),
        "usa,trades_with,china,1\nusa,trades_with,uk,0\n",
    )
    .unwrap();
    fs::write(dir.path().join("classification_test.csv"), "india,trades_with,china,1\n").unwrap();

    let dataset = Dataset::from_dir(dir.path()).unwrap();
    assert_eq!(dataset.classification_valid().len(), 2);
    assert!(!dataset.classification_valid()[1].label);
    assert_eq!(dataset.classification_test().len(), 1);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Dataset::from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_id_table_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.json");
    let table = IdTable::from_labels(["a", "b", "c"]);
    formats::json::write_id_table(&table, fs::File::create(&path).unwrap()).unwrap();
    let loaded = formats::json::read_id_table(fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(loaded, table);
}
