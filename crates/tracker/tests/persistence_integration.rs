use std::sync::Arc;

use revisit_common::{CursorPosition, CursorRange, DocumentId, EphemeralState};
use revisit_tracker::{
    FlushOutcome, LocalFs, MemoryFs, PositionMap, StateStore, TrackerConfig, TrackerPaths,
};
use tempfile::tempdir;

fn selection(line: u32, ch: u32) -> Option<CursorRange> {
    Some(CursorRange::caret(CursorPosition::new(line, ch)))
}

#[test]
fn positions_survive_restart_on_local_disk() {
    let tmp = tempdir().expect("tempdir should be created");
    let paths = TrackerPaths::in_dir(tmp.path().join(".revisit"));
    let db_path = paths.db_path(&TrackerConfig::default());

    // First session: nothing on disk yet, record two documents.
    let store = StateStore::local(&db_path);
    let working = PositionMap::from_map(store.load());
    assert!(working.is_empty());
    working.insert(DocumentId::new("inbox/idea.md"), EphemeralState::new(selection(3, 7), Some(96.0)));
    working.insert(DocumentId::new("readme.md"), EphemeralState::new(None, Some(1200.5)));
    assert_eq!(store.flush(&working).unwrap(), FlushOutcome::Written { entries: 2 });
    drop(store);

    // Second session: a fresh store sees exactly the same map.
    let reopened = StateStore::new(LocalFs, &db_path);
    let loaded = reopened.load();
    assert_eq!(loaded, working.snapshot());
    assert_eq!(reopened.flush(&PositionMap::from_map(loaded)).unwrap(), FlushOutcome::Unchanged);
}

#[test]
fn corrupt_file_on_disk_starts_empty_and_is_replaced_on_next_change() {
    let tmp = tempdir().expect("tempdir should be created");
    let db_path = tmp.path().join("cursor-positions.json");
    std::fs::write(&db_path, "{\"a.md\": {\"cursor\": ").unwrap();

    let store = StateStore::local(&db_path);
    assert!(store.try_load().is_err());
    let working = PositionMap::from_map(store.load());
    assert!(working.is_empty());

    working.insert(DocumentId::new("a.md"), EphemeralState::new(selection(0, 1), Some(2.0)));
    store.flush(&working).unwrap();

    let text = std::fs::read_to_string(&db_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["a.md"]["scroll"], serde_json::json!(2.0));
}

#[test]
fn malformed_field_does_not_hide_the_other() {
    let fs = MemoryFs::new().with_file(
        "/db.json",
        r#"{"a.md":{"cursor":{"from":{"line":2,"ch":1},"to":{"line":2,"ch":4}},"scroll":"top"},
            "b.md":{"cursor":"nowhere","scroll":33}}"#,
    );
    let store = StateStore::new(fs, "/db.json");
    let loaded = store.load();

    let a = loaded[&DocumentId::new("a.md")];
    assert_eq!(a.cursor, Some(CursorRange::new(CursorPosition::new(2, 1), CursorPosition::new(2, 4))));
    assert_eq!(a.scroll, None);

    let b = loaded[&DocumentId::new("b.md")];
    assert_eq!(b.cursor, None);
    assert_eq!(b.scroll, Some(33.0));
}

#[test]
fn concurrent_flushes_write_consistent_bytes() {
    let fs = Arc::new(MemoryFs::new());
    let store = Arc::new(StateStore::new(Arc::clone(&fs), "/db.json"));
    let working = Arc::new(PositionMap::new());

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            let working = Arc::clone(&working);
            std::thread::spawn(move || {
                for line in 0..50u32 {
                    working.insert(
                        DocumentId::new(format!("doc-{i}.md")),
                        EphemeralState::new(selection(line, 0), Some(f64::from(line) + 1.0)),
                    );
                    store.flush(&working).expect("flush should succeed");
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    store.flush(&working).unwrap();

    let on_disk = fs.contents(std::path::Path::new("/db.json")).unwrap();
    let reloaded = StateStore::new(MemoryFs::new().with_file("/db.json", on_disk), "/db.json").load();
    assert_eq!(reloaded, working.snapshot());
    assert!(!store.is_dirty(&working));
}
