use kvdb::{json, Error};

use crate::common::TestManager;

#[test]
fn bad_path_is_import_error_and_not_registered() {
    let t = TestManager::new();
    let err = t.manager.load_db_from_file("cdb1", "/bad/path").unwrap_err();
    assert!(matches!(err, Error::ImportError { .. }));
    assert!(!t.manager.exists_db("cdb1"));
    assert!(!t.dir.path().join("cdb1").exists());
}

#[test]
fn malformed_json_is_import_error() {
    let t = TestManager::new();
    let path = t.write_import("broken.json", r#"{"a": 1,"#);
    let err = t.manager.load_db_from_file("cdb1", &path).unwrap_err();
    assert!(matches!(err, Error::ImportError { .. }));
    assert!(!t.manager.exists_db("cdb1"));
}

#[test]
fn loaded_database_is_populated_and_loaded() {
    let t = TestManager::new();
    let path = t.write_import(
        "geo.json",
        r#"{"10.0.0.1": {"country": "AR"}, "10.0.0.2": {"country": "UY"}, "flag": true}"#,
    );
    t.manager.load_db_from_file("geo", &path).unwrap();

    assert!(t.manager.exists_db("geo"));
    assert_eq!(t.manager.list_dbs(true), vec!["geo"]);
    assert_eq!(t.manager.db_ref_count("geo"), Some(0));

    let h = t.manager.get_kvdb_handler("geo", "decoderA").unwrap();
    assert_eq!(h.get("10.0.0.2").unwrap(), Some(json!({"country": "UY"})));
    assert_eq!(h.get("flag").unwrap(), Some(json!(true)));
    assert_eq!(h.dump().unwrap().len(), 3);
}

#[test]
fn load_over_existing_name_is_already_exists() {
    let t = TestManager::new();
    let path = t.write_import("geo.json", r#"{"a": 1}"#);
    t.manager.create_db("geo").unwrap();

    let err = t.manager.load_db_from_file("geo", &path).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    let h = t.manager.get_kvdb_handler("geo", "s").unwrap();
    assert!(h.dump().unwrap().is_empty());
}

#[test]
fn imported_data_survives_restart() {
    let mut t = TestManager::new();
    let path = t.write_import("geo.json", r#"{"k": "v"}"#);
    t.manager.load_db_from_file("geo", &path).unwrap();

    t.reopen();
    let h = t.manager.get_kvdb_handler("geo", "s").unwrap();
    assert_eq!(h.get("k").unwrap(), Some(json!("v")));
}
