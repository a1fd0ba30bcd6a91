//! Unit tests for task/split dispatch
//!
//! Builds small on-disk corpora (CSV manifests plus `.npy` arrays) and
//! checks what every task variant produces per split.

use ndarray::{Array1, Array2};
use ndarray_npy::write_npy;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use speechbench_core::data::{build_dataset, get_dataloader_by_name, Batch, BucketDataset, Split, Task};
use speechbench_core::{BenchError, DataConfig};

const CHANNELS: usize = 4;

/// Write a `(len, channels)` feature array whose values encode the row index
fn write_features(root: &Path, rel: &str, len: usize, channels: usize) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let array = Array2::from_shape_fn((len, channels), |(t, _)| (t + 1) as f32);
    write_npy(&path, &array).unwrap();
}

fn write_csv(root: &Path, split: &str, rows: &[(&str, usize, &str)]) {
    fs::create_dir_all(root).unwrap();
    let mut body = String::from("file_path,length,label\n");
    for (path, len, label) in rows {
        body.push_str(&format!("{},{},{}\n", path, len, label));
    }
    fs::write(root.join(format!("{}.csv", split)), body).unwrap();
}

/// Transcribed corpus with one train, dev and test split
fn asr_corpus() -> (TempDir, DataConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let train = [
        ("train/a.npy", 10, "5_6"),
        ("train/b.npy", 30, "5_6_7_8"),
        ("train/c.npy", 5, "9"),
        ("train/d.npy", 40, "2_3_4"),
        ("train/e.npy", 20, "2_2_2_2_2"),
    ];
    write_csv(root, "train", &train);
    write_csv(root, "dev", &[("dev/a.npy", 12, "3_4")]);
    write_csv(root, "test", &[("test/a.npy", 50, "3_4"), ("test/b.npy", 8, "5")]);

    for (path, len, _) in train {
        write_features(root, path, len, CHANNELS);
    }
    write_features(root, "dev/a.npy", 12, CHANNELS);
    write_features(root, "test/a.npy", 50, CHANNELS);
    write_features(root, "test/b.npy", 8, CHANNELS);

    let config = DataConfig::new(root)
        .batch_size(2)
        .dev_batch_size(2)
        .sets(&["train"], &["dev"], &["test"]);
    (dir, config)
}

fn all_lengths(dataset: &dyn BucketDataset) -> Vec<Vec<usize>> {
    (0..dataset.len())
        .map(|i| dataset.bucket_lengths(i).unwrap())
        .collect()
}

#[test]
fn test_asr_buckets_and_padding() {
    let (_dir, config) = asr_corpus();
    let dataset = build_dataset(Split::Train, Task::Asr, &config).unwrap();

    assert_eq!(all_lengths(dataset.as_ref()), vec![vec![40, 30], vec![20, 10], vec![5]]);
    assert_eq!(dataset.num_samples().unwrap(), 5);

    match dataset.get(0).unwrap() {
        Batch::Labeled { features, labels } => {
            assert_eq!(features.dim(), (2, 40, CHANNELS));
            // Second sample is zero-padded past its 30 frames
            assert_eq!(features[[1, 29, 0]], 30.0);
            assert_eq!(features[[1, 30, 0]], 0.0);
            assert_eq!(labels.dim(), (2, 4));
            assert_eq!(labels.row(0).to_vec(), vec![2, 3, 4, 0]);
            assert_eq!(labels.row(1).to_vec(), vec![5, 6, 7, 8]);
        }
        other => panic!("unexpected batch {:?}", other),
    }
}

#[test]
fn test_drop_policy_per_split() {
    let (_dir, config) = asr_corpus();
    let config = config.max_timestep(30).max_label_len(5);

    let train = build_dataset(Split::Train, Task::Asr, &config).unwrap();
    assert_eq!(all_lengths(train.as_ref()), vec![vec![10, 5]]);

    let test = build_dataset(Split::Test, Task::Asr, &config).unwrap();
    assert_eq!(all_lengths(test.as_ref()), vec![vec![50, 8]]);
}

#[test]
fn test_text_task_uses_labels_only() {
    let (_dir, config) = asr_corpus();
    // Frame limit is ignored for text
    let config = config.max_timestep(6);
    let dataset = build_dataset(Split::Text, Task::Text, &config).unwrap();

    assert_eq!(dataset.num_samples().unwrap(), 5);
    assert_eq!(all_lengths(dataset.as_ref()), vec![vec![5, 4], vec![3, 2], vec![1]]);

    match dataset.get(0).unwrap() {
        Batch::Labels(labels) => {
            assert_eq!(labels.dim(), (2, 5));
            assert_eq!(labels.row(1).to_vec(), vec![5, 6, 7, 8, 0]);
        }
        other => panic!("unexpected batch {:?}", other),
    }
}

#[test]
fn test_text_split_emits_labels_for_asr() {
    let (_dir, config) = asr_corpus();
    let dataset = build_dataset(Split::Text, Task::Asr, &config).unwrap();

    assert_eq!(dataset.task(), Task::Text);
    for i in 0..dataset.len() {
        assert!(matches!(dataset.get(i).unwrap(), Batch::Labels(_)));
    }
    assert_eq!(dataset.num_samples().unwrap(), 5);
}

#[test]
fn test_spec_task() {
    let (_dir, config) = asr_corpus();
    let config = config.run_mockingjay(true);
    let dataset = build_dataset(Split::Dev, Task::Spec, &config).unwrap();

    assert!(dataset.run_mockingjay());
    match dataset.get(0).unwrap() {
        Batch::Features(features) => assert_eq!(features.dim(), (1, 12, CHANNELS)),
        other => panic!("unexpected batch {:?}", other),
    }
}

#[test]
fn test_missing_feature_file() {
    let (dir, config) = asr_corpus();
    fs::remove_file(dir.path().join("train/d.npy")).unwrap();

    let dataset = build_dataset(Split::Train, Task::Spec, &config).unwrap();
    assert!(matches!(dataset.get(0), Err(BenchError::FeatureNotFound { .. })));
    // Other buckets are unaffected
    assert!(dataset.get(1).is_ok());
}

#[test]
fn test_duo_pairs_targets_by_path() {
    let (dir, config) = asr_corpus();
    let target = dir.path().join("linear");
    write_csv(&target, "dev", &[("dev/a.npy", 12, "")]);
    write_features(&target, "dev/a.npy", 12, 9);

    let config = config.target_path(&target);
    let dataset = build_dataset(Split::Dev, Task::Duo, &config).unwrap();
    assert!(dataset.run_mockingjay());

    match dataset.get(0).unwrap() {
        Batch::Duo { source, target } => {
            assert_eq!(source.dim(), (1, 12, CHANNELS));
            assert_eq!(target.dim(), (1, 12, 9));
        }
        other => panic!("unexpected batch {:?}", other),
    }
}

#[test]
fn test_duo_missing_target_entry() {
    let (dir, config) = asr_corpus();
    let target = dir.path().join("linear");
    write_csv(&target, "dev", &[("dev/other.npy", 12, "")]);

    let err = build_dataset(Split::Dev, Task::Duo, &config.target_path(&target)).unwrap_err();
    assert!(matches!(err, BenchError::ManifestInvalid { .. }));
}

/// Phone corpus: features under `root`, aligned labels under `phone_path`
fn phone_corpus() -> (TempDir, DataConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("mel");
    let phones = dir.path().join("phone");
    fs::create_dir_all(&phones).unwrap();

    let rows = [("train/u1.npy", 12, ""), ("train/u2.npy", 9, ""), ("train/u3.npy", 7, "")];
    write_csv(&root, "train", &rows);
    write_features(&root, "train/u1.npy", 12, CHANNELS);
    write_features(&root, "train/u2.npy", 9, CHANNELS);

    // u1 labels are shorter than its features, u2 labels longer
    fs::create_dir_all(phones.join("train")).unwrap();
    write_npy(phones.join("train/u1.npy"), &Array1::from(vec![1i64, 1, 2, 2, 2, 0, 0, 1])).unwrap();
    write_npy(phones.join("train/u2.npy"), &Array1::from(vec![2i64; 11])).unwrap();

    fs::write(phones.join("phone2idx.json"), r#"{"sil": 0, "aa": 1, "b": 2}"#).unwrap();
    fs::write(phones.join("unaligned.json"), r#"["train/u3.npy"]"#).unwrap();

    let config = DataConfig::new(&root)
        .batch_size(4)
        .sets(&["train"], &["train"], &["train"])
        .phone_path(&phones)
        .seed(11);
    (dir, config)
}

#[test]
fn test_phone_alignment() {
    let (_dir, config) = phone_corpus();
    let dataset = build_dataset(Split::Train, Task::Phone, &config).unwrap();

    assert_eq!(dataset.class_num(), Some(3));
    // Unaligned sample dropped
    assert_eq!(all_lengths(dataset.as_ref()), vec![vec![12, 9]]);

    match dataset.get(0).unwrap() {
        Batch::Labeled { features, labels } => {
            // Time axis follows the labels: 8 frames for u1, 11 for u2
            assert_eq!(features.dim(), (2, 11, CHANNELS));
            assert_eq!(labels.dim(), (2, 11));
            assert_eq!(features[[0, 7, 0]], 8.0);
            assert_eq!(features[[0, 8, 0]], 0.0);
            // u2 last frame replicated
            assert_eq!(features[[1, 8, 0]], 9.0);
            assert_eq!(features[[1, 10, 0]], 9.0);
            assert_eq!(labels[[0, 7]], 1);
        }
        other => panic!("unexpected batch {:?}", other),
    }
}

#[test]
fn test_phone_train_proportion_only_on_train() {
    let (_dir, config) = phone_corpus();
    let config = config.train_proportion(0.7);

    // Two of three rows are kept, then duplicated while the working set is tiny.
    // At most one of them is the unaligned row.
    let train = build_dataset(Split::Train, Task::Phone, &config).unwrap();
    assert!([16, 32].contains(&train.num_samples().unwrap()));

    let dev = build_dataset(Split::Dev, Task::Phone, &config).unwrap();
    assert_eq!(dev.num_samples().unwrap(), 2);
}

#[test]
fn test_sentiment_classes_broadcast() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("mosi");
    write_csv(&root, "train", &[("a.npy", 6, "2.6"), ("b.npy", 4, "-1.4"), ("c.npy", 3, "0.0")]);
    write_features(&root.join("train"), "a.npy", 6, CHANNELS);
    write_features(&root.join("train"), "b.npy", 4, CHANNELS);
    write_features(&root.join("train"), "c.npy", 3, CHANNELS);

    let config = DataConfig::default().batch_size(8).sentiment_path(&root);
    let dataset = build_dataset(Split::Train, Task::Sentiment, &config).unwrap();
    assert_eq!(dataset.class_num(), Some(7));

    match dataset.get(0).unwrap() {
        Batch::Labeled { features, labels } => {
            assert_eq!(features.dim(), (3, 6, CHANNELS));
            assert_eq!(labels.dim(), (3, 6));
            assert!(labels.row(0).iter().all(|&c| c == 5));
            assert!(labels.row(1).iter().all(|&c| c == 2));
            assert!(labels.row(2).iter().all(|&c| c == 3));
        }
        other => panic!("unexpected batch {:?}", other),
    }
}

/// Speaker corpus: speakers 103 and 200 in train, 300 and 103 in test
fn speaker_corpus() -> (TempDir, DataConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let train = [
        ("train-clean-100/103-1-0.npy", 30, ""),
        ("train-clean-100/200-1-0.npy", 20, ""),
        ("train-clean-100/103-2-0.npy", 10, ""),
    ];
    let test = [("test-clean/300-1-0.npy", 25, ""), ("test-clean/103-9-0.npy", 15, "")];
    write_csv(root, "train-clean-100", &train);
    write_csv(root, "test-clean", &test);
    for (path, len, _) in train.iter().chain(test.iter()) {
        write_features(root, path, *len, CHANNELS);
    }

    let config = DataConfig::new(root).batch_size(8).dev_batch_size(8);
    (dir, config)
}

#[test]
fn test_speaker_ids_agree_across_splits() {
    let (_dir, config) = speaker_corpus();

    let train = build_dataset(Split::Train, Task::Speaker, &config).unwrap();
    let test = build_dataset(Split::Test, Task::Speaker, &config).unwrap();
    assert_eq!(train.class_num(), Some(3));
    assert_eq!(test.class_num(), Some(3));

    let train_labels = match train.get(0).unwrap() {
        Batch::Utterance { labels, .. } => labels.to_vec(),
        other => panic!("unexpected batch {:?}", other),
    };
    let test_labels = match test.get(0).unwrap() {
        Batch::Utterance { labels, .. } => labels.to_vec(),
        other => panic!("unexpected batch {:?}", other),
    };

    // Train order: 103, 200, 103
    assert_eq!(train_labels[0], train_labels[2]);
    assert_ne!(train_labels[0], train_labels[1]);
    assert!(train_labels.iter().all(|&id| (0..3).contains(&id)));

    // Test order: 300, 103; ids differ between the two speakers
    assert_ne!(test_labels[0], test_labels[1]);
    assert!(test_labels.iter().all(|&id| (0..3).contains(&id)));
}

#[test]
fn test_speaker_filter_keeps_index() {
    let (_dir, config) = speaker_corpus();
    let config = config.max_timestep(25);

    let train = build_dataset(Split::Train, Task::Speaker, &config).unwrap();
    assert_eq!(all_lengths(train.as_ref()), vec![vec![20, 10]]);
    // Speakers of dropped rows still have classes
    assert_eq!(train.class_num(), Some(3));
}

#[test]
fn test_loader_by_name() {
    let (_dir, config) = asr_corpus();
    let mut loader = get_dataloader_by_name("dev", "asr", &config).unwrap();
    assert_eq!(loader.num_batches(), 1);

    let batches: Vec<Batch> = loader.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch_size(), 1);
    assert_eq!(batches[0].time_len(), 12);
}
