use kvdb::{json, DurabilityMode, ManagerConfig};

use crate::common::TestManager;

#[test]
fn data_survives_reopen_after_finalize() {
    let mut t = TestManager::new();
    t.manager.create_db("geo").unwrap();
    {
        let h = t.manager.get_kvdb_handler("geo", "decoderA").unwrap();
        h.set("10.0.0.1", json!({"country": "AR"})).unwrap();
    }
    t.manager.finalize().unwrap();

    t.reopen();
    assert_eq!(t.manager.list_dbs(false), vec!["geo"]);
    assert!(t.manager.list_dbs(true).is_empty());

    let h = t.manager.get_kvdb_handler("geo", "decoderA").unwrap();
    assert_eq!(h.get("10.0.0.1").unwrap(), Some(json!({"country": "AR"})));
}

#[test]
fn reference_counts_do_not_persist() {
    let mut t = TestManager::new();
    t.manager.create_db("geo").unwrap();
    let h = t.manager.get_kvdb_handler("geo", "decoderA").unwrap();
    t.manager.finalize().unwrap();
    std::mem::forget(h);

    t.reopen();
    assert_eq!(t.manager.db_ref_count("geo"), Some(0));
    t.manager.delete_db("geo").unwrap();
}

#[test]
fn always_mode_writes_through_without_flush() {
    let t = TestManager::always();
    assert_eq!(
        t.manager.config().durability_mode().unwrap(),
        DurabilityMode::Always
    );
    t.manager.create_db("geo").unwrap();
    let h = t.manager.get_kvdb_handler("geo", "s").unwrap();
    h.set("k", json!(42)).unwrap();

    let bytes = std::fs::read(t.dir.path().join("geo").join("data.kvdb")).unwrap();
    let entries = kvdb::kvdb_storage::data_file::decode(&bytes).unwrap();
    assert_eq!(entries.get("k"), Some(&json!(42)));
}

#[test]
fn config_persists_across_reopen() {
    let mut t = TestManager::always();
    t.reopen();
    assert_eq!(
        t.manager.config(),
        &ManagerConfig {
            durability: "always".to_string(),
            discover_existing: true,
        }
    );
}

#[test]
fn corrupt_data_file_fails_on_first_handler() {
    let mut t = TestManager::new();
    t.manager.create_db("geo").unwrap();
    t.manager.finalize().unwrap();

    t.reopen();
    std::fs::write(t.dir.path().join("geo").join("data.kvdb"), b"KVDB-not-really-a-file").unwrap();

    let err = t.manager.get_kvdb_handler("geo", "s").unwrap_err();
    assert!(matches!(err, kvdb::Error::Corruption(_)));
    // Still registered, still not loaded, nothing counted
    assert!(t.manager.exists_db("geo"));
    assert!(t.manager.list_dbs(true).is_empty());
    assert_eq!(t.manager.db_ref_count("geo"), Some(0));
}
