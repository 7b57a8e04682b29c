//! End-to-end manager scenarios
//!
//! Organized by concern:
//! - registry: create / exists / delete / list
//! - references: handler counting and the InUse guard
//! - import: loading databases from JSON files
//! - shutdown: frozen counts after finalize
//! - persistence: reopening a manager over the same directory
//! - concurrency: many threads acquiring and releasing

mod common;

mod concurrency;
mod import;
mod persistence;
mod references;
mod shutdown;
