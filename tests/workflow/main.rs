//! Workflow Integration Tests
//!
//! Drives build, run and provenance end to end through `Tric`.

#[path = "../common/mod.rs"]
mod common;

mod create;
mod provenance;
mod run;
