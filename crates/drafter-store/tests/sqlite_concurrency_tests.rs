//! Independent connections on one database file never share a sequence

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use drafter_core::codec::Snapshot;
use drafter_core::{AttributeMap, DraftStore, OperationType};
use drafter_store::SqliteRepository;

const WRITERS: usize = 4;
const APPENDS_PER_WRITER: usize = 10;

#[test]
fn test_concurrent_writers_get_unique_gapless_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    // Open sequentially so only one connection runs the migrations at a time
    let repos: Vec<Arc<SqliteRepository>> = (0..WRITERS)
        .map(|_| Arc::new(SqliteRepository::open(&path).unwrap()))
        .collect();

    let handles: Vec<_> = repos
        .iter()
        .enumerate()
        .map(|(writer, repo)| {
            let repo = Arc::clone(repo);
            thread::spawn(move || {
                (0..APPENDS_PER_WRITER)
                    .map(|i| {
                        let mut attributes = AttributeMap::new();
                        attributes.insert("writer".into(), writer.into());
                        attributes.insert("i".into(), i.into());
                        repo.append("shared", OperationType::Update, Snapshot::new("talkative", attributes))
                            .unwrap()
                            .sequence()
                    })
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut sequences = BTreeSet::new();
    for handle in handles {
        for sequence in handle.join().unwrap() {
            assert!(sequences.insert(sequence), "sequence {sequence} allocated twice");
        }
    }

    let total = (WRITERS * APPENDS_PER_WRITER) as u64;
    assert_eq!(sequences, (1..=total).collect());
    assert_eq!(repos[0].draft_count("shared").unwrap(), total);
}

#[test]
fn test_per_entity_sequences_are_independent() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());

    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|entity_id| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                for _ in 0..5 {
                    repo.append(
                        entity_id,
                        OperationType::Update,
                        Snapshot::new("talkative", AttributeMap::new()),
                    )
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for entity_id in ["a", "b", "c"] {
        let latest = repo.get_latest(entity_id).unwrap().unwrap();
        assert_eq!(latest.sequence(), 5);
    }
}
