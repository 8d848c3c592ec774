//! # bitacora-store
//!
//! `ChainStore` implementations for the bitácora hash chain.
//!
//! - [`InMemoryChainStore`]: process-local, `RwLock`-guarded
//! - [`FileChainStore`]: one JSON-lines file per chain, committed by
//!   temp-file-and-rename
//!
//! Both stores refuse an entry that does not extend their current tail, so
//! even a writer that bypasses `ChainBuilder` cannot fork a chain.
//! [`export_snapshot`] seals a chain into a `ChainSnapshot` for offline
//! verification.

pub mod file;
pub mod memory;
pub mod snapshot;
mod tail;

pub use file::FileChainStore;
pub use memory::InMemoryChainStore;
pub use snapshot::{export_snapshot, read_snapshot, verify_snapshot, write_snapshot};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use tempfile::tempdir;

    use bitacora_contracts::{
        chain::{ChainId, Digest},
        entry::LogEntry,
        error::BitacoraError,
        payload::{BitacoraRecord, EntryCategory, FieldValue},
        report::BreakReason,
    };
    use bitacora_core::{traits::ChainStore, ChainBuilder, ChainVerifier};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn chain(name: &str) -> ChainId {
        ChainId::new(name).unwrap()
    }

    fn record(description: &str) -> BitacoraRecord {
        BitacoraRecord::new("Ing. Salas", EntryCategory::Inspection, description)
    }

    fn fill(builder: &ChainBuilder, chain_id: &ChainId, n: usize) -> Vec<LogEntry> {
        (0..n)
            .map(|i| {
                builder
                    .append_record(chain_id, record(&format!("entrada {i}")))
                    .unwrap()
            })
            .collect()
    }

    // ── InMemoryChainStore ────────────────────────────────────────────────────

    #[test]
    fn memory_store_appends_and_loads_in_order() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        let written = fill(&builder, &id, 3);

        assert_eq!(store.load_chain(&id).unwrap(), written);
        assert_eq!(store.len(&id).unwrap(), 3);
        assert_eq!(store.tail(&id).unwrap(), written.last().cloned());
        assert!(store.contains_entry(&id, &written[1].id).unwrap());
    }

    /// An entry that does not extend the tail is refused, even though it is
    /// internally consistent.
    #[test]
    fn memory_store_refuses_entry_that_forks_the_chain() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        let written = fill(&builder, &id, 2);

        // Replay entry 1 as if a second writer had read the same tail.
        let err = store.persist_entry(&id, &written[1]).unwrap_err();
        assert!(matches!(err, BitacoraError::Persistence { .. }));

        // A first entry that does not link to genesis is also refused.
        let mut orphan = written[0].clone();
        orphan.previous_hash = Digest([3u8; 32]);
        let err = store.persist_entry(&chain("obra-2"), &orphan).unwrap_err();
        assert!(matches!(err, BitacoraError::Persistence { .. }));

        assert_eq!(store.len(&id).unwrap(), 2);
        assert!(store.chain_ids().unwrap() == vec![id]);
    }

    #[test]
    fn memory_store_lists_only_non_empty_chains() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        fill(&builder, &chain("torre-b"), 1);
        fill(&builder, &chain("torre-a"), 1);

        assert_eq!(
            store.chain_ids().unwrap(),
            vec![chain("torre-a"), chain("torre-b")]
        );
    }

    /// Concurrent appends through the builder land as one unbroken chain.
    #[test]
    fn memory_store_concurrent_appends_stay_linear() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = Arc::new(ChainBuilder::new(store.clone()));
        let id = chain("obra-hilos");

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let builder = Arc::clone(&builder);
                let id = id.clone();
                thread::spawn(move || {
                    (0..20)
                        .map(|i| {
                            builder
                                .append_record(&id, record(&format!("{t}-{i}")))
                                .unwrap()
                                .sequence_number
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for seq in h.join().unwrap() {
                assert!(seen.insert(seq), "sequence {seq} handed out twice");
            }
        }
        assert_eq!(seen.len(), 80);
        assert!(ChainVerifier::new().verify_chain(store.as_ref(), &id).unwrap().verified);
    }

    /// A verifier working on a snapshot does not see later appends.
    #[test]
    fn load_returns_a_snapshot() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        fill(&builder, &id, 2);

        let snapshot = store.load_chain(&id).unwrap();
        fill(&builder, &id, 1);

        let report = ChainVerifier::new().verify(&snapshot);
        assert!(report.verified);
        assert_eq!(report.entries_checked, 2);
    }

    // ── FileChainStore ────────────────────────────────────────────────────────

    #[test]
    fn file_store_appends_and_loads() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileChainStore::open(dir.path()).unwrap());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        let written = fill(&builder, &id, 3);

        let loaded = store.load_chain(&id).unwrap();
        assert_eq!(loaded, written);
        assert!(dir.path().join("obra-1.jsonl").exists());
        assert!(!dir.path().join("obra-1.jsonl.tmp").exists());
    }

    #[test]
    fn file_store_survives_restart() {
        let dir = tempdir().unwrap();
        let id = chain("obra-1");

        // first "session"
        let first = {
            let store = Arc::new(FileChainStore::open(dir.path()).unwrap());
            let builder = ChainBuilder::new(store);
            fill(&builder, &id, 2)
        };

        // "restart" - new store and builder continue the same chain
        let store = Arc::new(FileChainStore::open(dir.path()).unwrap());
        let builder = ChainBuilder::new(store.clone());
        let third = builder.append_record(&id, record("tras reinicio")).unwrap();

        assert_eq!(third.sequence_number, 2);
        assert_eq!(third.previous_hash, first[1].hash);
        assert!(ChainVerifier::new().verify_chain(store.as_ref(), &id).unwrap().verified);
    }

    #[test]
    fn file_store_refuses_forking_entry_and_keeps_file_intact() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileChainStore::open(dir.path()).unwrap());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        let written = fill(&builder, &id, 2);

        let before = std::fs::read(dir.path().join("obra-1.jsonl")).unwrap();
        assert!(store.persist_entry(&id, &written[0]).is_err());
        let after = std::fs::read(dir.path().join("obra-1.jsonl")).unwrap();
        assert_eq!(before, after);
    }

    /// Editing the file on disk is detected on the next verification.
    #[test]
    fn file_store_tampering_is_detected() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileChainStore::open(dir.path()).unwrap());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        fill(&builder, &id, 3);

        let path = dir.path().join("obra-1.jsonl");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("entrada 1"));
        std::fs::write(&path, contents.replace("entrada 1", "entrada 9")).unwrap();

        let report = ChainVerifier::new().verify_chain(store.as_ref(), &id).unwrap();
        assert!(!report.verified);
        assert_eq!(report.broken_at_sequence, Some(1));
        assert_eq!(report.reason, Some(BreakReason::HashMismatch));
    }

    #[test]
    fn file_store_reports_corrupt_lines_as_read_errors() {
        let dir = tempdir().unwrap();
        let store = FileChainStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("obra-1.jsonl"), "{not json}\n").unwrap();

        let err = store.load_chain(&chain("obra-1")).unwrap_err();
        match err {
            BitacoraError::StorageRead { reason, .. } => assert!(reason.contains("line 1")),
            other => panic!("expected StorageRead, got {:?}", other),
        }
    }

    #[test]
    fn file_store_lists_chain_files_only() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileChainStore::open(dir.path()).unwrap());
        let builder = ChainBuilder::new(store.clone());
        fill(&builder, &chain("torre-b"), 1);
        fill(&builder, &chain("torre-a"), 1);
        std::fs::write(dir.path().join("notas.txt"), "ignorar").unwrap();
        std::fs::write(dir.path().join("mal nombre.jsonl"), "").unwrap();

        assert_eq!(
            store.chain_ids().unwrap(),
            vec![chain("torre-a"), chain("torre-b")]
        );
    }

    // ── Snapshots ─────────────────────────────────────────────────────────────

    #[test]
    fn snapshot_round_trips_through_disk_and_verifies() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        let written = fill(&builder, &id, 3);

        let snapshot = export_snapshot(store.as_ref(), &id).unwrap();
        assert_eq!(snapshot.terminal_hash, Some(written[2].hash));

        let path = dir.path().join("obra-1.snapshot.json");
        write_snapshot(&snapshot, &path).unwrap();
        let restored = read_snapshot(&path).unwrap();

        assert_eq!(restored, snapshot);
        let report = ChainVerifier::new().verify(&restored.entries);
        assert!(report.verified);
        assert_eq!(report.terminal_hash, restored.terminal_hash);
    }

    #[test]
    fn snapshot_of_empty_chain_has_no_terminal_hash() {
        let store = InMemoryChainStore::new();
        let snapshot = export_snapshot(&store, &chain("vacia")).unwrap();
        assert!(snapshot.entries.is_empty());
        assert_eq!(snapshot.terminal_hash, None);
    }

    #[test]
    fn truncated_snapshot_is_reported_broken_at_its_missing_tail() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        fill(&builder, &id, 3);

        let mut snapshot = export_snapshot(store.as_ref(), &id).unwrap();
        snapshot.entries.pop();

        // What remains still chains correctly on its own.
        assert!(ChainVerifier::new().verify(&snapshot.entries).verified);

        let report = verify_snapshot(&ChainVerifier::new(), &snapshot);
        assert!(!report.verified);
        assert_eq!(report.broken_at_sequence, Some(2));
        assert_eq!(report.broken_entry_id, None);
        assert_eq!(report.reason, Some(BreakReason::LinkMismatch));
    }

    #[test]
    fn snapshot_extended_past_its_seal_is_broken_at_first_extra_entry() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        fill(&builder, &id, 2);
        let sealed = export_snapshot(store.as_ref(), &id).unwrap();

        let extra = builder.append_record(&id, record("entrada añadida")).unwrap();
        let mut snapshot = sealed.clone();
        snapshot.entries.push(extra.clone());

        let report = verify_snapshot(&ChainVerifier::new(), &snapshot);
        assert_eq!(report.broken_at_sequence, Some(2));
        assert_eq!(report.broken_entry_id, Some(extra.id));

        let intact = verify_snapshot(&ChainVerifier::new(), &sealed);
        assert!(intact.verified);
    }

    #[test]
    fn memory_store_refuses_entry_after_max_sequence_tail() {
        let store = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        let mut written = fill(&builder, &id, 1);
        written[0].sequence_number = u64::MAX;
        store.chains.write().unwrap().insert(id.clone(), written.clone());

        let mut next = written[0].clone();
        next.previous_hash = written[0].hash;
        let err = store.persist_entry(&id, &next).unwrap_err();
        assert!(matches!(err, BitacoraError::Persistence { .. }));
        assert_eq!(store.len(&id).unwrap(), 1);
    }

    #[test]
    fn memory_store_len_reports_poisoned_lock() {
        let store = Arc::new(InMemoryChainStore::new());
        let poisoner = Arc::clone(&store);
        let _ = thread::spawn(move || {
            let _guard = poisoner.chains.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(
            store.len(&chain("obra-1")),
            Err(BitacoraError::StorageRead { .. })
        ));
    }

    /// Absent fields survive storage and still hash the same.
    #[test]
    fn absent_fields_survive_file_round_trip() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileChainStore::open(dir.path()).unwrap());
        let builder = ChainBuilder::new(store.clone());
        let id = chain("obra-1");
        let entry = builder.append_record(&id, record("sin correccion")).unwrap();
        assert_eq!(entry.payload.get("corrects"), Some(&FieldValue::Absent));

        let loaded = store.load_chain(&id).unwrap();
        assert_eq!(loaded[0].payload.get("corrects"), Some(&FieldValue::Absent));
        assert!(ChainVerifier::new().verify(&loaded).verified);
    }
}
