//! Integration tests against real SQLite stores.
//!
//! Sections:
//! 1. Schema validation
//! 2. Version lineage
//! 3. Integrity audit
//! 4. End to end through the path-based API

pub mod integrity_tests;
pub mod version_history_tests;
