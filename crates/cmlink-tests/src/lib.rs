//! Integration tests for the cmlink crates.
//!
//! Everything here runs against the real Little CMS backend with real
//! profiles, end to end: compile, run, serialize, reload.
