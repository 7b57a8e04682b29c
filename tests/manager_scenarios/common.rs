//! Shared helpers for manager scenario tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use kvdb::{KvdbManager, ManagerConfig};
use tempfile::TempDir;

/// Disk-backed manager plus the directory that keeps it alive
pub struct TestManager {
    pub manager: Arc<KvdbManager>,
    pub dir: TempDir,
}

impl TestManager {
    /// Fresh manager in a new temp directory
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let manager = KvdbManager::open(dir.path()).expect("open manager");
        Self { manager, dir }
    }

    /// Fresh manager writing every change through to disk
    pub fn always() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let cfg = ManagerConfig {
            durability: "always".to_string(),
            ..ManagerConfig::default()
        };
        let manager = KvdbManager::open_with_config(dir.path(), cfg).expect("open manager");
        Self { manager, dir }
    }

    /// Drop the current manager and open a new one over the same directory
    pub fn reopen(&mut self) {
        // Release the old manager before the directory is opened again
        self.manager = KvdbManager::ephemeral();
        self.manager = KvdbManager::open(self.dir.path()).expect("reopen manager");
    }

    /// Write a JSON import file into the temp directory
    pub fn write_import(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, content).expect("write import file");
        path
    }
}
