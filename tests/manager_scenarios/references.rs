use kvdb::{Error, KvdbManager};

use crate::common::TestManager;

#[test]
fn geo_decoder_scenario() {
    let t = TestManager::new();
    let manager = &t.manager;
    manager.create_db("geo").unwrap();

    let a = manager.get_kvdb_handler("geo", "decoderA").unwrap();
    assert_eq!(manager.db_ref_count("geo"), Some(1));

    let b = manager.get_kvdb_handler("geo", "decoderB").unwrap();
    assert_eq!(manager.db_ref_count("geo"), Some(2));

    match manager.delete_db("geo") {
        Err(Error::InUse { name, scopes }) => {
            assert_eq!(name, "geo");
            assert_eq!(scopes, vec!["decoderA", "decoderB"]);
        }
        other => panic!("expected InUse, got {:?}", other),
    }
    assert!(manager.exists_db("geo"));

    drop(a);
    drop(b);
    assert_eq!(manager.db_ref_count("geo"), Some(0));

    manager.delete_db("geo").unwrap();
    assert!(!manager.exists_db("geo"));
}

#[test]
fn k_acquires_j_releases_leave_k_minus_j() {
    let manager = KvdbManager::ephemeral();
    manager.create_db("geo").unwrap();

    let k = 7;
    let j = 4;
    let mut handlers: Vec<_> = (0..k)
        .map(|_| manager.get_kvdb_handler("geo", "rule1").unwrap())
        .collect();
    let _other = manager.get_kvdb_handler("geo", "rule2").unwrap();

    handlers.truncate(k - j);

    let scopes = manager.kvdb_scopes_info();
    assert_eq!(scopes["rule1"]["geo"], (k - j) as u32);
    assert_eq!(scopes["rule2"]["geo"], 1);

    let handlers_info = manager.kvdb_handlers_info();
    let sum: u32 = handlers_info["geo"].values().sum();
    assert_eq!(manager.db_ref_count("geo"), Some(sum));
    assert_eq!(sum, (k - j) as u32 + 1);
}

#[test]
fn handler_for_unknown_db_creates_no_edge() {
    let manager = KvdbManager::ephemeral();
    manager.create_db("geo").unwrap();

    let err = manager.get_kvdb_handler("nope", "decoderA").unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(manager.kvdb_scopes_info().is_empty());
    assert!(manager.kvdb_handlers_info()["geo"].is_empty());
}

#[test]
fn scope_disappears_with_its_last_edge() {
    let manager = KvdbManager::ephemeral();
    manager.create_db("geo").unwrap();
    manager.create_db("ips").unwrap();

    let g = manager.get_kvdb_handler("geo", "decoderA").unwrap();
    let i = manager.get_kvdb_handler("ips", "decoderA").unwrap();
    assert_eq!(manager.kvdb_scopes_info()["decoderA"].len(), 2);

    drop(g);
    assert_eq!(manager.kvdb_scopes_info()["decoderA"].len(), 1);
    drop(i);
    assert!(!manager.kvdb_scopes_info().contains_key("decoderA"));
}

#[test]
fn in_use_is_retryable_after_release() {
    let manager = KvdbManager::ephemeral();
    manager.create_db("geo").unwrap();
    let h = manager.get_kvdb_handler("geo", "decoderA").unwrap();

    let err = manager.delete_db("geo").unwrap_err();
    assert!(err.is_retryable());

    h.release();
    assert!(manager.delete_db("geo").is_ok());
}

#[test]
fn introspection_serializes_as_plain_maps() {
    let manager = KvdbManager::ephemeral();
    manager.create_db("geo").unwrap();
    let _h = manager.get_kvdb_handler("geo", "decoderA").unwrap();

    let json = serde_json::to_value(manager.kvdb_handlers_info()).unwrap();
    assert_eq!(json, kvdb::json!({"geo": {"decoderA": 1}}));
}
