use kvdb::KvdbManager;

#[test]
fn release_during_shutdown_is_a_no_op() {
    let manager = KvdbManager::ephemeral();
    manager.create_db("geo").unwrap();
    let handler = manager.get_kvdb_handler("geo", "decoderA").unwrap();
    assert_eq!(manager.db_ref_count("geo"), Some(1));

    manager.finalize().unwrap();
    drop(handler);

    assert!(manager.manager_shutting_down());
    assert_eq!(manager.db_ref_count("geo"), Some(1));
    assert_eq!(manager.kvdb_scopes_info()["decoderA"]["geo"], 1);
}

#[test]
fn explicit_remove_during_shutdown_is_a_no_op() {
    let manager = KvdbManager::ephemeral();
    manager.create_db("geo").unwrap();
    let handler = manager.get_kvdb_handler("geo", "decoderA").unwrap();
    std::mem::forget(handler);

    manager.finalize().unwrap();
    manager.remove_kvdb_handler("geo", "decoderA");
    assert_eq!(manager.db_ref_count("geo"), Some(1));
}

#[test]
fn finalize_is_one_way_and_idempotent() {
    let manager = KvdbManager::ephemeral();
    assert!(!manager.manager_shutting_down());
    manager.finalize().unwrap();
    manager.finalize().unwrap();
    assert!(manager.manager_shutting_down());
}

#[test]
fn managers_can_be_recreated_repeatedly() {
    for _ in 0..5 {
        let manager = KvdbManager::ephemeral();
        manager.create_db("geo").unwrap();
        let handler = manager.get_kvdb_handler("geo", "decoderA").unwrap();
        manager.finalize().unwrap();
        drop(manager);
        drop(handler);
    }
}
