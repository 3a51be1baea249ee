//! Deterministic, pure logic for collection reconciliation.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod planner;
pub mod reporter;
pub mod types;
