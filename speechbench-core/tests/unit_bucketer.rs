//! Unit tests for length-sorted bucketing
//!
//! Tests bucket sizes, long-sequence halving, and order preservation.

use speechbench_core::data::asr::Transcribed;
use speechbench_core::data::{BucketPolicy, LengthFilter, LengthTable, ManifestEntry};

fn table(lengths: &[usize]) -> LengthTable {
    LengthTable::from_entries(
        lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| ManifestEntry::new(format!("u{}.npy", i), len))
            .collect(),
    )
}

fn lengths(buckets: &[Vec<ManifestEntry>]) -> Vec<Vec<usize>> {
    buckets
        .iter()
        .map(|b| b.iter().map(|e| e.length).collect())
        .collect()
}

/// Pseudo-random lengths without pulling in an RNG
fn spread(n: usize, modulus: usize) -> Vec<usize> {
    (0..n).map(|i| (i * 7919 + 13) % modulus + 1).collect()
}

#[test]
fn test_five_utterances_bucket_size_two() {
    let buckets = BucketPolicy::new(2).bucketize(table(&[10, 30, 5, 40, 20]).into_entries());
    assert_eq!(lengths(&buckets), vec![vec![40, 30], vec![20, 10], vec![5]]);
}

#[test]
fn test_concatenation_preserves_sorted_order() {
    let entries = table(&spread(500, 1200)).into_entries();
    let expected: Vec<usize> = entries.iter().map(|e| e.length).collect();

    for bucket_size in [1, 2, 3, 6, 8, 32] {
        let buckets = BucketPolicy::new(bucket_size).bucketize(entries.clone());
        let flat: Vec<usize> = buckets.iter().flatten().map(|e| e.length).collect();
        assert_eq!(flat, expected, "bucket_size={}", bucket_size);
    }
}

#[test]
fn test_bucket_sizes() {
    let policy = BucketPolicy::new(6);
    let entries = table(&spread(301, 900)).into_entries();
    let sorted: Vec<usize> = entries.iter().map(|e| e.length).collect();
    let buckets = policy.bucketize(entries);

    // Every full group of six is halved iff its longest row exceeds the threshold
    let mut expected = Vec::new();
    for group in sorted.chunks(6) {
        if group.len() == 6 && group[0] > policy.half_batch_time {
            expected.push(group[..3].to_vec());
            expected.push(group[3..].to_vec());
        } else {
            expected.push(group.to_vec());
        }
    }

    assert_eq!(lengths(&buckets), expected);
    assert!(buckets.iter().all(|b| !b.is_empty() && b.len() <= 6));
    assert_eq!(buckets.last().map(|b| b.len()), Some(1));
}

#[test]
fn test_halved_buckets_come_in_pairs() {
    let buckets = BucketPolicy::new(4).bucketize(table(&[900, 800, 700, 600, 300, 200, 100, 50]).into_entries());
    assert_eq!(
        lengths(&buckets),
        vec![vec![900, 800], vec![700, 600], vec![300, 200, 100, 50]]
    );
}

#[test]
fn test_long_context_threshold() {
    let entries = table(&[900, 800, 700, 600]).into_entries();
    let policy = BucketPolicy::new(4).with_time_threshold(BucketPolicy::LONG_CONTEXT_HALF_BATCHSIZE_TIME);
    assert_eq!(policy.bucketize(entries).len(), 1);
}

#[test]
fn test_label_length_splits_transcriptions() {
    let items = vec![
        Transcribed {
            file_path: "a.npy".into(),
            length: 50,
            tokens: vec![7; 151],
        },
        Transcribed {
            file_path: "b.npy".into(),
            length: 40,
            tokens: vec![1, 2],
        },
    ];
    let buckets = BucketPolicy::new(2).bucketize(items);
    let sizes: Vec<usize> = buckets.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![1, 1]);
}

#[test]
fn test_feature_only_entries_ignore_labels() {
    let long_label = vec!["7"; 151].join("_");
    let entries = vec![
        ManifestEntry::new("a.npy", 50).with_label(long_label),
        ManifestEntry::new("b.npy", 40).with_label("1_2"),
    ];
    let buckets = BucketPolicy::new(2).bucketize(LengthTable::from_entries(entries).into_entries());
    assert_eq!(lengths(&buckets), vec![vec![50, 40]]);
}

#[test]
fn test_filter_then_bucket() {
    let mut table = table(&[10, 30, 5, 40, 20]);
    table.apply(&LengthFilter {
        max_timestep: 30,
        max_label_len: 0,
    });
    let buckets = BucketPolicy::new(2).bucketize(table.into_entries());
    assert_eq!(lengths(&buckets), vec![vec![20, 10], vec![5]]);
}

#[test]
fn test_empty_input() {
    let buckets = BucketPolicy::new(4).bucketize(Vec::<ManifestEntry>::new());
    assert!(buckets.is_empty());
}
