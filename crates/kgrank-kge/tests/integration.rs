//! End-to-end tests: dataset -> batch stream -> model -> evaluation.

use std::collections::HashSet;
use std::time::Duration;

use kgrank_core::{triples, CorruptionMode, Dataset, LabelledTriple, Triple};
use kgrank_kge::{
    find_threshold, BatchStream, EmbeddingModel, EvalConfig, Evaluator, Result, ScoringFunction,
    ScoringModel, StreamConfig,
};

/// Countries and capitals: entity `2k` is the capital of entity `2k + 1`.
fn capitals() -> Dataset {
    let train: Vec<Triple> = (0..8)
        .map(|k| Triple::new(2 * k, 0, 2 * k + 1))
        .chain((0..8).map(|k| Triple::new(2 * k + 1, 1, 2 * k)))
        .collect();
    Dataset::from_id_triples("capitals", train, triples(&[(16, 0, 17)]), triples(&[(18, 0, 19)]))
        .unwrap()
}

/// Oracle for [`capitals`]: relation 0 maps `2k -> 2k + 1`, relation 1 the reverse.
fn oracle(fixed: &Triple, candidates: &[u32], mode: CorruptionMode) -> Result<Vec<f32>> {
    let holds = |t: Triple| match t.relation.0 {
        0 => t.head.0 % 2 == 0 && t.tail.0 == t.head.0 + 1,
        _ => t.tail.0 % 2 == 0 && t.head.0 == t.tail.0 + 1,
    };
    Ok(candidates
        .iter()
        .map(|&c| if holds(mode.replace(fixed, c)) { 1.0 } else { 0.0 })
        .collect())
}

#[test]
fn test_oracle_scores_perfectly() {
    let dataset = capitals();
    let evaluator = Evaluator::for_dataset(&dataset);
    let metrics = evaluator.evaluate(&oracle, dataset.test()).unwrap();
    assert_eq!(metrics.num_triples, 2);
    assert_eq!(metrics.mrr, 1.0);
    assert_eq!(metrics.hits_at_1, 1.0);

    let report = evaluator.report(&oracle, dataset.test()).unwrap();
    assert_eq!(report["MRR"], 1.0);
    assert_eq!(report["MR"], 1.0);

    let relations = evaluator.report_relations(&oracle, dataset.test()).unwrap();
    assert_eq!(relations["HITS@1_relations"], 1.0);
}

#[test]
fn test_embedding_model_end_to_end() {
    let dataset = capitals();
    let mut stream = BatchStream::from_dataset(
        &dataset,
        StreamConfig::default().with_batch_size(5).with_negative_sample_size(6),
    )
    .unwrap();
    let model = EmbeddingModel::new(
        ScoringFunction::RotatE,
        dataset.n_entity(),
        dataset.n_relation(),
        8,
        6.0,
        1,
    )
    .unwrap();

    for _ in 0..6 {
        let batch = stream.next_batch().unwrap();
        let scores = model.score_triples(&batch.positives).unwrap();
        assert_eq!(scores.len(), 5);
        for row in batch.negative_triples() {
            assert_eq!(model.score_triples(&row).unwrap().len(), 6);
        }
    }

    let evaluator =
        Evaluator::for_dataset(&dataset).with_config(EvalConfig::default().with_decimals(2));
    let metrics = evaluator.evaluate(&model, dataset.valid()).unwrap();
    assert!(metrics.mrr > 0.0 && metrics.mrr <= 1.0);
    assert!(metrics.mr >= 1.0 && metrics.mr <= dataset.n_entity() as f64);
}

#[test]
fn test_negatives_avoid_training_triples() {
    let dataset = capitals();
    let known = dataset.training_prefix_index();
    let mut stream = BatchStream::from_dataset(
        &dataset,
        StreamConfig::default().with_batch_size(16).with_negative_sample_size(10),
    )
    .unwrap();
    for _ in 0..10 {
        let batch = stream.next_batch().unwrap();
        for row in batch.negative_triples() {
            // Each prefix has exactly one true completion out of 20 entities.
            assert!(row.iter().all(|t| !known.contains(t)));
        }
    }
}

#[test]
fn test_worker_streams_are_reproducible() {
    let dataset = capitals();
    let config = StreamConfig::default()
        .with_batch_size(4)
        .with_num_workers(2)
        .with_seed(5);
    let collect = |config: StreamConfig| -> Vec<_> {
        BatchStream::from_dataset(&dataset, config)
            .unwrap()
            .take(12)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    };
    assert_eq!(collect(config.clone()), collect(config));
}

#[test]
fn test_dropping_stream_stops_workers() {
    let dataset = capitals();
    let config = StreamConfig::default()
        .with_batch_size(2)
        .with_num_workers(3)
        .with_prefetch_capacity(1);
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let mut stream = BatchStream::from_dataset(&dataset, config).unwrap();
        stream.next_batch().unwrap();
        drop(stream);
        done_tx.send(()).unwrap();
    });
    done_rx
        .recv_timeout(Duration::from_secs(30))
        .expect("stream teardown hung");
}

#[test]
fn test_partitioned_dataset_still_filters_excluded() {
    let dataset = capitals().partition(2, &[0], 1.0, 3).unwrap();
    assert_eq!(dataset.train().len() + dataset.excluded().len(), 16);

    let excluded: HashSet<_> = dataset.excluded().iter().copied().collect();
    let mut stream = BatchStream::from_dataset(
        &dataset,
        StreamConfig::default().with_batch_size(8).with_negative_sample_size(10),
    )
    .unwrap();
    for _ in 0..4 {
        let batch = stream.next_batch().unwrap();
        assert!(batch.positives.iter().all(|p| !excluded.contains(p)));
        for row in batch.negative_triples() {
            assert!(row.iter().all(|t| !excluded.contains(t)));
        }
    }

    // Excluded triples still count as true for filtering.
    let known = Evaluator::for_dataset(&dataset);
    for t in dataset.excluded() {
        assert!(known.known().contains(t));
    }
}

#[test]
fn test_classification_with_oracle() {
    let samples = [
        LabelledTriple { triple: Triple::new(0, 0, 1), label: true },
        LabelledTriple { triple: Triple::new(0, 0, 3), label: false },
        LabelledTriple { triple: Triple::new(3, 1, 2), label: true },
        LabelledTriple { triple: Triple::new(2, 1, 3), label: false },
    ];
    let best = find_threshold(&oracle, &samples).unwrap();
    assert_eq!(best.threshold, 1.0);
    assert_eq!(best.accuracy, 1.0);
}

#[test]
fn test_stream_config_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.json");
    std::fs::write(&path, r#"{"batch_size": 3, "shuffle": false, "seed": 9}"#).unwrap();
    let config = StreamConfig::from_json_file(&path).unwrap();
    assert_eq!(config.batch_size, 3);
    assert!(!config.shuffle);
    assert_eq!(config.seed, 9);

    std::fs::write(&path, r#"{"batch_size": 0}"#).unwrap();
    assert!(StreamConfig::from_json_file(&path).is_err());
}
